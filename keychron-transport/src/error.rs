//! Transport error types

use thiserror::Error;

/// Errors raised below the command layer
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("No Keychron raw HID interface found")]
    NoDevice,

    #[error("No Keychron raw HID interface at {0}")]
    PathNotFound(String),

    #[error("Invalid device path {0:?}")]
    InvalidPath(String),

    #[error("Device disconnected")]
    Disconnected,

    /// No matching response after all retries
    #[error("Communication timeout")]
    Timeout,

    #[error("HID error: {0}")]
    Hid(String),

    /// Opening hidraw failed with EACCES; usually a missing udev rule
    #[error("Permission denied opening {0} (check udev rules for vendor 3434)")]
    PermissionDenied(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }

    fn from_hid(e: hidapi::HidError, path: Option<&str>) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EACCES") {
            TransportError::PermissionDenied(path.unwrap_or("hidraw").to_string())
        } else {
            TransportError::Hid(msg)
        }
    }

    /// Map a failure to open `path`
    pub(crate) fn open_failed(e: hidapi::HidError, path: &str) -> Self {
        Self::from_hid(e, Some(path))
    }
}

impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        Self::from_hid(e, None)
    }
}
