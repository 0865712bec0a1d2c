//! Flow-control transport layer
//!
//! `FlowControlTransport` wraps a raw `Transport` (which only does send/read
//! of individual HID reports) and adds query semantics: bounded retries,
//! echo matching, and one request in flight at a time.
//!
//! ```text
//! [HidRawTransport / ScriptedTransport]  ← implements Transport (raw I/O)
//!                |
//!       [FlowControlTransport]           ← adds retries, echo matching
//!                |
//!         [KeychronClient]
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::command::CommandFrame;
use crate::error::TransportError;
use crate::protocol::timing;
use crate::types::TransportDeviceInfo;
use crate::Transport;

/// A transport wrapper that adds flow control on top of a raw `Transport`
pub struct FlowControlTransport {
    inner: Arc<dyn Transport>,
    retries: usize,
    read_timeout_ms: u32,
    /// Serializes command-response cycles; without it concurrent callers
    /// interleave their sends and reads and see each other's echoes.
    query_lock: tokio::sync::Mutex<()>,
}

impl FlowControlTransport {
    /// Create a new flow-control wrapper with default timing
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self::with_timing(inner, timing::QUERY_RETRIES, timing::READ_TIMEOUT_MS)
    }

    /// Create a wrapper with explicit retry count and per-read timeout
    pub fn with_timing(inner: Arc<dyn Transport>, retries: usize, read_timeout_ms: u32) -> Self {
        Self {
            inner,
            retries: retries.max(1),
            read_timeout_ms,
            query_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Default number of attempts per query
    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Send a request and wait for its echoed response
    pub async fn query(&self, frame: &CommandFrame) -> Result<Vec<u8>, TransportError> {
        self.query_with_retries(frame, self.retries).await
    }

    /// Send a request with an explicit attempt count
    ///
    /// A response is accepted when it echoes the command (and sub-command for
    /// grouped commands) or carries the unsupported sentinel. Timeouts and
    /// mismatched reports consume one attempt; any other transport error is
    /// returned immediately. Exhausting all attempts yields
    /// [`TransportError::Timeout`].
    pub async fn query_with_retries(
        &self,
        frame: &CommandFrame,
        retries: usize,
    ) -> Result<Vec<u8>, TransportError> {
        let report = frame.to_report();
        let _guard = self.query_lock.lock().await;

        for attempt in 0..retries.max(1) {
            self.inner.send_report(&report).await?;

            match self.inner.read_report(self.read_timeout_ms).await {
                Ok(resp) if frame.matches_echo(&resp) => return Ok(resp),
                Ok(resp) => {
                    debug!(
                        "Response mismatch for {}: got {:02X?} (attempt {})",
                        frame.name(),
                        &resp[..resp.len().min(3)],
                        attempt + 1
                    );
                }
                Err(TransportError::Timeout) => {
                    debug!("Timeout waiting for {} (attempt {})", frame.name(), attempt + 1);
                }
                Err(e) => return Err(e),
            }
        }

        Err(TransportError::Timeout)
    }
}

#[async_trait]
impl Transport for FlowControlTransport {
    async fn send_report(&self, report: &[u8]) -> Result<(), TransportError> {
        self.inner.send_report(report).await
    }

    async fn read_report(&self, timeout_ms: u32) -> Result<Vec<u8>, TransportError> {
        self.inner.read_report(timeout_ms).await
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
