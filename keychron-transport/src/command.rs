//! Command frame builder and response validation
//!
//! Every request is `[cmd] [sub?] [payload...]`. Grouped commands (misc, RGB,
//! analog) echo both the command and the sub-command and most of them put a
//! status byte right after the echo. This module keeps those framing rules in
//! one place so the feature code only ever sees validated payload slices.

use std::fmt;

use crate::protocol::{self, cmd};

/// Layout of the response header for a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `[cmd] [payload...]`
    Plain,
    /// `[cmd] [sub] [payload...]`
    Grouped,
    /// `[cmd] [sub] [status] [payload...]`
    GroupedWithStatus,
}

impl ResponseShape {
    /// Number of header bytes before the payload
    pub const fn header_len(self) -> usize {
        match self {
            Self::Plain => 1,
            Self::Grouped => 2,
            Self::GroupedWithStatus => 3,
        }
    }
}

/// A request to the device: command byte, optional sub-command, payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    pub command: u8,
    pub sub: Option<u8>,
    pub payload: Vec<u8>,
    shape: ResponseShape,
}

impl CommandFrame {
    /// Top-level command without sub-command
    pub fn new(command: u8) -> Self {
        Self {
            command,
            sub: None,
            payload: Vec::new(),
            shape: ResponseShape::Plain,
        }
    }

    /// Grouped command; the response is expected to carry a status byte
    pub fn group(command: u8, sub: u8) -> Self {
        Self {
            command,
            sub: Some(sub),
            payload: Vec::new(),
            shape: ResponseShape::GroupedWithStatus,
        }
    }

    /// Append one payload byte
    pub fn arg(mut self, byte: u8) -> Self {
        self.payload.push(byte);
        self
    }

    /// Append payload bytes
    pub fn args(mut self, bytes: &[u8]) -> Self {
        self.payload.extend_from_slice(bytes);
        self
    }

    /// Append a little-endian u16
    pub fn arg_u16(mut self, value: u16) -> Self {
        self.payload.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// The response to this grouped command has no status byte
    pub fn without_status(mut self) -> Self {
        if self.sub.is_some() {
            self.shape = ResponseShape::Grouped;
        }
        self
    }

    /// Response header layout
    pub fn shape(&self) -> ResponseShape {
        self.shape
    }

    /// Human-readable name for logging
    pub fn name(&self) -> String {
        protocol::command_name(self.command, self.sub)
    }

    /// Serialize to a zero-padded report
    pub fn to_report(&self) -> Vec<u8> {
        protocol::build_report(self.command, self.sub, &self.payload)
    }

    /// Check if a response belongs to this request
    ///
    /// The unsupported sentinel is accepted as an answer to any request.
    pub fn matches_echo(&self, resp: &[u8]) -> bool {
        match resp.first() {
            Some(&cmd::UNSUPPORTED) => true,
            Some(&c) if c == self.command => match self.sub {
                Some(sub) => resp.get(1) == Some(&sub),
                None => true,
            },
            _ => false,
        }
    }

    /// Validate a response and return its payload
    ///
    /// `min_payload` is the number of payload bytes the caller will index.
    pub fn parse_response<'a>(
        &self,
        resp: &'a [u8],
        min_payload: usize,
    ) -> Result<&'a [u8], ParseError> {
        let first = *resp.first().ok_or(ParseError::TooShort {
            expected: 1,
            got: 0,
        })?;
        if first == cmd::UNSUPPORTED {
            return Err(ParseError::Unsupported);
        }
        if first != self.command {
            return Err(ParseError::CommandMismatch {
                expected: self.command,
                got: first,
            });
        }
        let header = self.shape.header_len();
        if resp.len() < header + min_payload {
            return Err(ParseError::TooShort {
                expected: header + min_payload,
                got: resp.len(),
            });
        }
        if let Some(sub) = self.sub {
            if resp[1] != sub {
                return Err(ParseError::SubCommandMismatch {
                    expected: sub,
                    got: resp[1],
                });
            }
        }
        if self.shape == ResponseShape::GroupedWithStatus && resp[2] != cmd::STATUS_SUCCESS {
            return Err(ParseError::Failed { status: resp[2] });
        }
        Ok(&resp[header..])
    }
}

/// Response validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Device answered with the 0xFF sentinel
    Unsupported,
    TooShort { expected: usize, got: usize },
    CommandMismatch { expected: u8, got: u8 },
    SubCommandMismatch { expected: u8, got: u8 },
    /// Status byte reported failure
    Failed { status: u8 },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "Command not recognized by device"),
            Self::TooShort { expected, got } => {
                write!(
                    f,
                    "Response too short: expected {} bytes, got {}",
                    expected, got
                )
            }
            Self::CommandMismatch { expected, got } => {
                write!(
                    f,
                    "Command mismatch: expected 0x{:02X}, got 0x{:02X}",
                    expected, got
                )
            }
            Self::SubCommandMismatch { expected, got } => {
                write!(
                    f,
                    "Sub-command mismatch: expected 0x{:02X}, got 0x{:02X}",
                    expected, got
                )
            }
            Self::Failed { status } => write!(f, "Device reported failure (status {})", status),
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{misc, REPORT_SIZE};

    #[test]
    fn test_group_frame_report() {
        let frame = CommandFrame::group(cmd::MISC_GROUP, misc::SNAP_CLICK_GET)
            .arg(4)
            .arg(8);
        let report = frame.to_report();
        assert_eq!(report.len(), REPORT_SIZE);
        assert_eq!(&report[..4], &[0xA7, 0x08, 4, 8]);
    }

    #[test]
    fn test_arg_u16_little_endian() {
        let frame = CommandFrame::group(cmd::MISC_GROUP, misc::WIRELESS_LPM_SET)
            .arg_u16(300)
            .arg_u16(0x1234);
        assert_eq!(frame.payload, vec![0x2C, 0x01, 0x34, 0x12]);
    }

    #[test]
    fn test_parse_success_payload() {
        let frame = CommandFrame::group(cmd::MISC_GROUP, misc::DEBOUNCE_GET);
        let resp = [0xA7, 0x05, 0x00, 0x00, 2, 5];
        let payload = frame.parse_response(&resp, 3).unwrap();
        assert_eq!(payload, &[0, 2, 5]);
    }

    #[test]
    fn test_parse_failed_status() {
        let frame = CommandFrame::group(cmd::MISC_GROUP, misc::DEBOUNCE_SET);
        let resp = [0xA7, 0x06, 0x01];
        assert_eq!(
            frame.parse_response(&resp, 0),
            Err(ParseError::Failed { status: 1 })
        );
    }

    #[test]
    fn test_parse_unsupported() {
        let frame = CommandFrame::new(cmd::GET_PROTOCOL_VERSION);
        assert_eq!(
            frame.parse_response(&[0xFF, 0, 0], 1),
            Err(ParseError::Unsupported)
        );
    }

    #[test]
    fn test_parse_too_short() {
        let frame = CommandFrame::group(cmd::RGB_GROUP, 0x05);
        let err = frame.parse_response(&[0xA8, 0x05, 0x00], 1).unwrap_err();
        assert_eq!(
            err,
            ParseError::TooShort {
                expected: 4,
                got: 3
            }
        );
    }

    #[test]
    fn test_without_status_skips_status_check() {
        let frame = CommandFrame::group(cmd::ANALOG_GROUP, 0x10).without_status();
        let resp = [0xA9, 0x10, 0x01, 0x03];
        assert_eq!(frame.parse_response(&resp, 2).unwrap(), &[0x01, 0x03]);
    }

    #[test]
    fn test_matches_echo() {
        let frame = CommandFrame::group(cmd::RGB_GROUP, 0x09);
        assert!(frame.matches_echo(&[0xA8, 0x09, 0]));
        assert!(!frame.matches_echo(&[0xA8, 0x0C, 0]));
        assert!(!frame.matches_echo(&[0xA7, 0x09, 0]));
        assert!(frame.matches_echo(&[0xFF, 0, 0]));
        assert!(!frame.matches_echo(&[]));
    }
}
