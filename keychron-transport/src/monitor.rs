//! Packet monitor middleware
//!
//! Wraps any [`Transport`] and logs every outgoing and incoming report
//! through `tracing`, decoded to `GROUP/SUB` names with a hex dump.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::protocol::{cmd, command_name};
use crate::{Transport, TransportDeviceInfo, TransportError};

/// Which reports to log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketFilter {
    #[default]
    All,
    /// Only reports whose first byte matches
    Cmd(u8),
}

impl PacketFilter {
    fn accepts(&self, report: &[u8]) -> bool {
        match self {
            Self::All => true,
            Self::Cmd(c) => report.first() == Some(c),
        }
    }
}

impl FromStr for PacketFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            s => {
                let hex_str = s.strip_prefix("0x").unwrap_or(s);
                u8::from_str_radix(hex_str, 16)
                    .map(Self::Cmd)
                    .map_err(|e| format!("Invalid command byte: {}", e))
            }
        }
    }
}

/// Transport middleware that logs all reports
pub struct PacketMonitor {
    inner: Arc<dyn Transport>,
    filter: PacketFilter,
}

impl PacketMonitor {
    /// Wrap a transport, logging every report
    pub fn wrap(transport: Arc<dyn Transport>) -> Arc<dyn Transport> {
        Self::wrap_filtered(transport, PacketFilter::All)
    }

    /// Wrap a transport, logging only reports accepted by `filter`
    pub fn wrap_filtered(transport: Arc<dyn Transport>, filter: PacketFilter) -> Arc<dyn Transport> {
        Arc::new(Self {
            inner: transport,
            filter,
        })
    }
}

/// Decode a report header into a display name
pub fn describe(report: &[u8]) -> String {
    match report {
        [] => "<empty>".to_string(),
        [c, sub, ..] if cmd::is_group(*c) => command_name(*c, Some(*sub)),
        [c, ..] => command_name(*c, None),
    }
}

/// Format bytes as space-separated hex, dropping trailing zero padding
pub fn hex_dump(report: &[u8]) -> String {
    let end = report
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    report[..end]
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Transport for PacketMonitor {
    async fn send_report(&self, report: &[u8]) -> Result<(), TransportError> {
        if self.filter.accepts(report) {
            info!("TX {:<36} {}", describe(report), hex_dump(report));
        }
        self.inner.send_report(report).await
    }

    async fn read_report(&self, timeout_ms: u32) -> Result<Vec<u8>, TransportError> {
        let result = self.inner.read_report(timeout_ms).await;
        match &result {
            Ok(resp) if self.filter.accepts(resp) => {
                info!("RX {:<36} {}", describe(resp), hex_dump(resp));
            }
            Err(TransportError::Timeout) => info!("RX <timeout>"),
            _ => {}
        }
        result
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        self.inner.device_info()
    }

    async fn is_connected(&self) -> bool {
        self.inner.is_connected().await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.inner.close().await
    }
}
