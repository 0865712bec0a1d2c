//! Keyboard interface error types

use keychron_transport::protocol::command_name;
use keychron_transport::{CommandFrame, ParseError, TransportError};
use thiserror::Error;

use crate::features::Capability;

/// Errors from keyboard operations
#[derive(Error, Debug)]
pub enum KeyboardError {
    /// Transport layer error (device unreachable, retries exhausted)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Status byte reported failure
    #[error("Device rejected {} (status {status})", label(.command, .sub))]
    Rejected {
        command: u8,
        sub: Option<u8>,
        status: u8,
    },

    /// Response did not have the shape the command requires
    #[error("Malformed response to {}: {reason}", label(.command, .sub))]
    Malformed {
        command: u8,
        sub: Option<u8>,
        #[source]
        reason: ParseError,
    },

    /// Device answered with the "not recognized" sentinel
    #[error("Command not recognized by device: {}", label(.command, .sub))]
    Unsupported { command: u8, sub: Option<u8> },

    /// Feature not advertised by this device
    #[error("Feature not supported: {0}")]
    NotSupported(Capability),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

fn label(command: &u8, sub: &Option<u8>) -> String {
    command_name(*command, *sub)
}

impl KeyboardError {
    /// Map a response validation failure for `frame`
    pub fn from_parse(frame: &CommandFrame, err: ParseError) -> Self {
        match err {
            ParseError::Unsupported => Self::Unsupported {
                command: frame.command,
                sub: frame.sub,
            },
            ParseError::Failed { status } => Self::Rejected {
                command: frame.command,
                sub: frame.sub,
                status,
            },
            reason => Self::Malformed {
                command: frame.command,
                sub: frame.sub,
                reason,
            },
        }
    }

    /// The device answered but refused or garbled the request
    ///
    /// Rejections are an expected outcome of a write; only transport
    /// failures mean the device could not be reached.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Rejected { .. } | Self::Malformed { .. } | Self::Unsupported { .. }
        )
    }
}
