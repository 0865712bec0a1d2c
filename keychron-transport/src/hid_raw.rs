//! Raw HID transport implementation (usage page 0xFF60)

use async_trait::async_trait;
use hidapi::HidDevice;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::TransportError;
use crate::protocol::{REPORT_ID, REPORT_SIZE};
use crate::types::TransportDeviceInfo;
use crate::Transport;

/// HID transport over the raw HID interface
///
/// Requests go out as output reports (report ID 0 + 32 bytes) and responses
/// come back as 32-byte input reports on the same interface.
pub struct HidRawTransport {
    device: Mutex<HidDevice>,
    info: TransportDeviceInfo,
}

impl HidRawTransport {
    /// Wrap an opened raw HID interface
    pub fn new(device: HidDevice, info: TransportDeviceInfo) -> Self {
        Self {
            device: Mutex::new(device),
            info,
        }
    }
}

#[async_trait]
impl Transport for HidRawTransport {
    async fn send_report(&self, report: &[u8]) -> Result<(), TransportError> {
        let mut buf = vec![0u8; REPORT_SIZE + 1];
        buf[0] = REPORT_ID;
        let len = report.len().min(REPORT_SIZE);
        buf[1..1 + len].copy_from_slice(&report[..len]);

        let device = self.device.lock();
        let written = device.write(&buf)?;
        if written == 0 {
            return Err(TransportError::Disconnected);
        }
        Ok(())
    }

    async fn read_report(&self, timeout_ms: u32) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; REPORT_SIZE];
        let device = self.device.lock();
        let n = device.read_timeout(&mut buf, timeout_ms as i32)?;
        if n == 0 {
            return Err(TransportError::Timeout);
        }
        buf.truncate(n);
        Ok(buf)
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    async fn is_connected(&self) -> bool {
        let device = self.device.lock();
        device.get_product_string().is_ok()
    }

    async fn close(&self) -> Result<(), TransportError> {
        // HidDevice drops automatically
        Ok(())
    }
}

impl Drop for HidRawTransport {
    fn drop(&mut self) {
        debug!("HidRawTransport dropped ({})", self.info.device_path);
    }
}
