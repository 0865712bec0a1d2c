//! Device discovery for Keychron raw HID interfaces

use std::sync::Arc;

use async_trait::async_trait;
use hidapi::HidApi;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::hid_raw::HidRawTransport;
use crate::monitor::{PacketFilter, PacketMonitor};
use crate::protocol::device;
use crate::types::{DiscoveredDevice, TransportDeviceInfo, TransportType};
use crate::Transport;

/// Device discovery abstraction
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// List currently available devices
    async fn list_devices(&self) -> Result<Vec<DiscoveredDevice>, TransportError>;

    /// Open a specific device
    async fn open_device(
        &self,
        device: &DiscoveredDevice,
    ) -> Result<Arc<dyn Transport>, TransportError>;
}

/// HID discovery for raw HID interfaces
pub struct HidDiscovery {
    /// Wrap opened transports in a [`PacketMonitor`] with this filter
    monitor: Option<PacketFilter>,
}

impl Default for HidDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl HidDiscovery {
    /// Create a new HID discovery instance for Keychron devices
    pub fn new() -> Self {
        Self { monitor: None }
    }

    /// Log reports of opened transports that pass `filter`
    pub fn with_monitor(mut self, filter: Option<PacketFilter>) -> Self {
        self.monitor = filter;
        self
    }

    fn is_raw_hid_interface(device_info: &hidapi::DeviceInfo) -> bool {
        device_info.usage_page() == device::USAGE_PAGE && device_info.usage() == device::USAGE
    }

    /// Open the first discovered device, or the one at `path` if given
    pub async fn open_preferred(
        &self,
        path: Option<&str>,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        let devices = self.list_devices().await?;
        let chosen = match path {
            Some(p) => devices.iter().find(|d| d.info.device_path == p),
            None => devices.first(),
        };
        match (chosen, path) {
            (Some(dev), _) => self.open_device(dev).await,
            (None, Some(p)) => Err(TransportError::PathNotFound(p.to_string())),
            (None, None) => Err(TransportError::NoDevice),
        }
    }
}

#[async_trait]
impl DeviceDiscovery for HidDiscovery {
    async fn list_devices(&self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        let api = HidApi::new()?;
        let mut devices = Vec::new();

        for device_info in api.device_list() {
            let vid = device_info.vendor_id();
            let pid = device_info.product_id();

            if vid != device::VENDOR_ID || !Self::is_raw_hid_interface(device_info) {
                continue;
            }

            let transport_type = if device::is_receiver_pid(pid) {
                TransportType::HidReceiver
            } else {
                TransportType::HidWired
            };
            let path = device_info.path().to_string_lossy().to_string();

            debug!(
                "Found device: VID={:04X} PID={:04X} type={:?} path={}",
                vid, pid, transport_type, path
            );

            devices.push(DiscoveredDevice {
                info: TransportDeviceInfo {
                    vid,
                    pid,
                    transport_type,
                    device_path: path,
                    serial: device_info.serial_number().map(|s| s.to_string()),
                    product_name: device_info.product_string().map(|s| s.to_string()),
                },
            });
        }

        Ok(devices)
    }

    async fn open_device(
        &self,
        device: &DiscoveredDevice,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        let api = HidApi::new()?;
        let device_path = &device.info.device_path;
        let path = std::ffi::CString::new(device_path.as_str())
            .map_err(|_| TransportError::InvalidPath(device_path.clone()))?;
        let hid = api
            .open_path(&path)
            .map_err(|e| TransportError::open_failed(e, device_path))?;

        info!("Opened {}", device.info);

        let transport: Arc<dyn Transport> =
            Arc::new(HidRawTransport::new(hid, device.info.clone()));
        Ok(match self.monitor {
            Some(filter) => PacketMonitor::wrap_filtered(transport, filter),
            None => transport,
        })
    }
}
