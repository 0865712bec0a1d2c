//! Transport abstraction layer for Keychron keyboard communication
//!
//! This crate provides the report-level plumbing for talking to keyboards
//! that expose the Keychron vendor command set over raw HID:
//!
//! - Raw HID (32-byte output/input reports on usage page 0xFF60)
//! - Flow control (bounded retries, echo matching, one request in flight)
//! - Packet monitoring for debugging
//!
//! Everything above the single report exchange (feature negotiation,
//! pagination, bitfield codecs) lives in `keychron-keyboard`.

pub mod command;
pub mod error;
pub mod flow_control;
pub mod monitor;
pub mod protocol;
pub mod types;

mod discovery;
mod hid_raw;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use command::{CommandFrame, ParseError, ResponseShape};
pub use discovery::{DeviceDiscovery, HidDiscovery};
pub use error::TransportError;
pub use flow_control::FlowControlTransport;
pub use hid_raw::HidRawTransport;
pub use monitor::{PacketFilter, PacketMonitor};
pub use types::{DiscoveredDevice, TransportDeviceInfo, TransportType};

use async_trait::async_trait;

/// The core transport trait - all backends implement this
///
/// A transport only moves single fixed-size reports. Query semantics
/// (retries, echo matching, serialization) are layered on top by
/// [`FlowControlTransport`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one report
    ///
    /// # Arguments
    /// * `report` - Report payload (without report ID), at most
    ///   [`protocol::REPORT_SIZE`] bytes; shorter reports are zero-padded
    async fn send_report(&self, report: &[u8]) -> Result<(), TransportError>;

    /// Read one report
    ///
    /// Returns [`TransportError::Timeout`] if nothing arrives within
    /// `timeout_ms`.
    async fn read_report(&self, timeout_ms: u32) -> Result<Vec<u8>, TransportError>;

    /// Get device information
    fn device_info(&self) -> &TransportDeviceInfo;

    /// Check if transport is still connected
    async fn is_connected(&self) -> bool;

    /// Close the transport gracefully
    async fn close(&self) -> Result<(), TransportError>;
}
