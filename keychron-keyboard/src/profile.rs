//! Analog profile layout
//!
//! A profile is read as one opaque byte run and split here:
//!
//! ```text
//! global (4) | per-key (rows * cols * 4) | OKMC (okmc_count * 20)
//!            | SOCD (socd_count * 5) | name (NUL-terminated, optional)
//! ```

use keychron_transport::protocol::{analog, cmd};
use keychron_transport::ParseError;
use serde::Serialize;

use crate::error::KeyboardError;
use crate::key_config::PackedKeyConfig;

/// Matrix dimensions supplied by the caller's layout definition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatrixSize {
    pub rows: u8,
    pub cols: u8,
}

impl MatrixSize {
    pub fn new(rows: u8, cols: u8) -> Self {
        Self { rows, cols }
    }

    pub fn key_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn contains(&self, row: u8, col: u8) -> bool {
        row < self.rows && col < self.cols
    }
}

/// Record counts that fix the section offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileLayout {
    pub matrix: MatrixSize,
    pub okmc_count: usize,
    pub socd_count: usize,
}

impl ProfileLayout {
    pub fn per_key_offset(&self) -> usize {
        PackedKeyConfig::SIZE
    }

    pub fn okmc_offset(&self) -> usize {
        self.per_key_offset() + self.matrix.key_count() * PackedKeyConfig::SIZE
    }

    pub fn socd_offset(&self) -> usize {
        self.okmc_offset() + self.okmc_count * analog::OKMC_RECORD_SIZE
    }

    pub fn name_offset(&self) -> usize {
        self.socd_offset() + self.socd_count * analog::SOCD_RECORD_SIZE
    }
}

/// SOCD pair of two matrix positions (analog group)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalogSocdPair {
    pub row1: u8,
    pub col1: u8,
    pub row2: u8,
    pub col2: u8,
    pub kind: u8,
}

impl AnalogSocdPair {
    fn decode(bytes: &[u8]) -> Self {
        Self {
            row1: bytes[0],
            col1: bytes[1],
            row2: bytes[2],
            col2: bytes[3],
            kind: bytes[4],
        }
    }
}

/// SOCD resolution policy for analog keyboards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum AnalogSocdType {
    Disabled = 0,
    DeeperTravel = 1,
    DeeperTravelSingle = 2,
    LastKeystroke = 3,
    Key1Priority = 4,
    Key2Priority = 5,
    Neutral = 6,
}

impl AnalogSocdType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Disabled),
            1 => Some(Self::DeeperTravel),
            2 => Some(Self::DeeperTravelSingle),
            3 => Some(Self::LastKeystroke),
            4 => Some(Self::Key1Priority),
            5 => Some(Self::Key2Priority),
            6 => Some(Self::Neutral),
            _ => None,
        }
    }
}

/// One decoded analog profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub global: PackedKeyConfig,
    /// Row-major, `rows * cols` entries
    pub keys: Vec<PackedKeyConfig>,
    /// Dynamic keystroke records, kept opaque
    pub okmc: Vec<Vec<u8>>,
    pub socd: Vec<AnalogSocdPair>,
    pub name: Option<String>,
    #[serde(skip)]
    matrix: MatrixSize,
}

impl Profile {
    /// Split raw profile bytes according to `layout`
    pub fn parse(bytes: &[u8], layout: &ProfileLayout) -> Result<Self, KeyboardError> {
        let required = layout.name_offset();
        if bytes.len() < required {
            return Err(KeyboardError::Malformed {
                command: cmd::ANALOG_GROUP,
                sub: Some(analog::GET_PROFILE_RAW),
                reason: ParseError::TooShort {
                    expected: required,
                    got: bytes.len(),
                },
            });
        }

        let config_at = |offset: usize| {
            PackedKeyConfig::decode([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };

        let keys = (0..layout.matrix.key_count())
            .map(|i| config_at(layout.per_key_offset() + i * PackedKeyConfig::SIZE))
            .collect();
        let okmc = bytes[layout.okmc_offset()..layout.socd_offset()]
            .chunks_exact(analog::OKMC_RECORD_SIZE)
            .map(<[u8]>::to_vec)
            .collect();
        let socd = bytes[layout.socd_offset()..layout.name_offset()]
            .chunks_exact(analog::SOCD_RECORD_SIZE)
            .map(AnalogSocdPair::decode)
            .collect();

        let tail = &bytes[layout.name_offset()..];
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        let name = String::from_utf8_lossy(&tail[..end]).trim().to_string();

        Ok(Self {
            global: config_at(0),
            keys,
            okmc,
            socd,
            name: (!name.is_empty()).then_some(name),
            matrix: layout.matrix,
        })
    }

    fn key_index(&self, row: u8, col: u8) -> Option<usize> {
        self.matrix
            .contains(row, col)
            .then(|| row as usize * self.matrix.cols as usize + col as usize)
    }

    /// Raw per-key record
    pub fn key(&self, row: u8, col: u8) -> Option<&PackedKeyConfig> {
        self.key_index(row, col).and_then(|i| self.keys.get(i))
    }

    /// Per-key record with inherited fields filled from the global
    pub fn resolved(&self, row: u8, col: u8) -> Option<PackedKeyConfig> {
        self.key(row, col).map(|k| k.resolve(&self.global))
    }

    pub fn key_mut(&mut self, row: u8, col: u8) -> Option<&mut PackedKeyConfig> {
        self.key_index(row, col).and_then(|i| self.keys.get_mut(i))
    }
}
