//! Protocol client: one method per device operation
//!
//! `KeychronClient` owns the flow-controlled transport and turns typed
//! requests into validated response payloads. It holds no device state;
//! [`crate::Keyboard`] composes it with the state mirror.

use std::sync::Arc;

use keychron_transport::protocol::{cmd, misc};
use keychron_transport::{CommandFrame, FlowControlTransport, TransportError};
use tracing::{debug, info};

use crate::error::KeyboardError;
use crate::features::{FeatureMask, FeatureSet};

/// Stateless request/response client for the Keychron command set
#[derive(Clone)]
pub struct KeychronClient {
    transport: Arc<FlowControlTransport>,
}

impl KeychronClient {
    pub fn new(transport: Arc<FlowControlTransport>) -> Self {
        Self { transport }
    }

    /// Get the underlying transport
    pub fn transport(&self) -> &Arc<FlowControlTransport> {
        &self.transport
    }

    /// Send a request and return its validated payload
    ///
    /// `min_payload` is the number of bytes after the response header that
    /// the caller will read; shorter responses are reported as malformed.
    pub async fn execute(
        &self,
        frame: &CommandFrame,
        min_payload: usize,
    ) -> Result<Vec<u8>, KeyboardError> {
        self.execute_with_retries(frame, min_payload, self.transport.retries())
            .await
    }

    /// Like [`execute`](Self::execute) with an explicit attempt count
    pub async fn execute_with_retries(
        &self,
        frame: &CommandFrame,
        min_payload: usize,
        retries: usize,
    ) -> Result<Vec<u8>, KeyboardError> {
        let resp = self.transport.query_with_retries(frame, retries).await?;
        frame
            .parse_response(&resp, min_payload)
            .map(<[u8]>::to_vec)
            .map_err(|e| KeyboardError::from_parse(frame, e))
    }

    /// Send a request whose response carries nothing but a status
    pub async fn command(&self, frame: &CommandFrame) -> Result<(), KeyboardError> {
        self.execute(frame, 0).await.map(|_| ())
    }

    /// Identify the device and read both feature masks
    ///
    /// A device that never answers the first query, or answers it with the
    /// unsupported sentinel, does not speak the protocol; that yields an
    /// empty set rather than an error. Once the device has answered, any
    /// exhausted retry is a transport error.
    pub async fn negotiate(&self) -> Result<FeatureSet, KeyboardError> {
        let resp = match self
            .transport
            .query(&CommandFrame::new(cmd::GET_PROTOCOL_VERSION))
            .await
        {
            Ok(resp) => resp,
            Err(TransportError::Timeout) => {
                info!("No answer to protocol version query, protocol absent");
                return Ok(FeatureSet::absent());
            }
            Err(e) => return Err(e.into()),
        };
        if resp.first() == Some(&cmd::UNSUPPORTED) {
            info!("Protocol version query not recognized, protocol absent");
            return Ok(FeatureSet::absent());
        }
        let protocol_version = resp.get(1).copied().unwrap_or(0);
        debug!("Protocol version: {}", protocol_version);

        let resp = self
            .transport
            .query(&CommandFrame::new(cmd::GET_SUPPORT_FEATURE))
            .await?;
        if resp.first() == Some(&cmd::UNSUPPORTED) {
            info!("Feature mask query not recognized, no features");
            return Ok(FeatureSet::absent());
        }
        let primary = read_u16(&resp, 2);

        let resp = self
            .transport
            .query(&CommandFrame::new(cmd::GET_FIRMWARE_VERSION))
            .await?;
        let firmware_version = parse_firmware_version(&resp);

        let frame = CommandFrame::group(cmd::MISC_GROUP, misc::GET_PROTOCOL_VER);
        let resp = self.transport.query(&frame).await?;
        let (misc_version, misc_mask) = if resp.first() == Some(&cmd::MISC_GROUP) {
            (read_u16(&resp, 3), read_u16(&resp, 5))
        } else {
            (0, 0)
        };

        let features = FeatureSet::new(
            protocol_version,
            FeatureMask::new(primary, misc_mask),
            misc_version,
            firmware_version,
        );
        info!(
            "Features: primary=0x{:04X} misc=0x{:04X} firmware={} -> {:?}",
            primary,
            misc_mask,
            features.firmware_version.as_deref().unwrap_or("?"),
            features.iter().collect::<Vec<_>>()
        );
        Ok(features)
    }
}

/// Little-endian u16 at `offset`, zero when the response is too short
pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    match bytes.get(offset..offset + 2) {
        Some(b) => u16::from_le_bytes([b[0], b[1]]),
        None => 0,
    }
}

/// NUL-terminated text starting at byte 1
fn parse_firmware_version(resp: &[u8]) -> Option<String> {
    if resp.first() == Some(&cmd::UNSUPPORTED) || resp.len() < 2 {
        return None;
    }
    let text = &resp[1..];
    let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
    let version = String::from_utf8_lossy(&text[..end]).trim().to_string();
    (!version.is_empty()).then_some(version)
}
