//! Device identity types shared by discovery and transports

use std::fmt;

use serde::Serialize;

/// How the raw HID interface reaches the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransportType {
    /// Keyboard enumerated directly over USB
    HidWired,
    /// 2.4 GHz receiver forwarding raw HID to the keyboard
    HidReceiver,
    /// In-memory transport (tests, replay)
    Virtual,
}

impl TransportType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::HidWired => "usb",
            Self::HidReceiver => "2.4g",
            Self::Virtual => "virtual",
        }
    }
}

/// Identity of one raw HID interface
#[derive(Debug, Clone, Serialize)]
pub struct TransportDeviceInfo {
    pub vid: u16,
    pub pid: u16,
    pub transport_type: TransportType,
    /// hidraw path as reported by hidapi
    pub device_path: String,
    pub serial: Option<String>,
    pub product_name: Option<String>,
}

impl fmt::Display for TransportDeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X}:{:04X} [{}] {}",
            self.vid,
            self.pid,
            self.transport_type.label(),
            self.device_path
        )?;
        if let Some(name) = &self.product_name {
            write!(f, " {name}")?;
        }
        Ok(())
    }
}

/// Interface found by discovery, not yet opened
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredDevice {
    pub info: TransportDeviceInfo,
}
