//! Packed per-key travel configuration
//!
//! Wire layout (4 bytes):
//!
//! ```text
//! byte 0: [7..2 actuation_point] [1..0 mode]
//! byte 1: [7..6 release low 2]   [5..0 sensitivity]
//! byte 2: [7..4 advance_mode]    [3..0 release high 4]
//! byte 3: advance_data (opaque)
//! ```
//!
//! Zero in mode, actuation, sensitivity or release means "use the profile
//! global". The codec itself is a pure bit-level round trip; substitution is
//! done by [`PackedKeyConfig::resolve`].

use serde::Serialize;

const MASK_2: u8 = 0x03;
const MASK_4: u8 = 0x0F;
const MASK_6: u8 = 0x3F;

/// One decoded per-key record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PackedKeyConfig {
    /// 2 bits
    pub mode: u8,
    /// 6 bits, 0.1 mm units
    pub actuation_point: u8,
    /// 6 bits, rapid trigger press sensitivity
    pub sensitivity: u8,
    /// 6 bits, rapid trigger release sensitivity
    pub release_sensitivity: u8,
    /// 4 bits
    pub advance_mode: u8,
    pub advance_data: u8,
}

impl PackedKeyConfig {
    pub const SIZE: usize = 4;

    /// Decode from wire bytes
    pub fn decode(bytes: [u8; 4]) -> Self {
        Self {
            mode: bytes[0] & MASK_2,
            actuation_point: bytes[0] >> 2,
            sensitivity: bytes[1] & MASK_6,
            release_sensitivity: (bytes[1] >> 6) | ((bytes[2] & MASK_4) << 2),
            advance_mode: bytes[2] >> 4,
            advance_data: bytes[3],
        }
    }

    /// Decode from the start of a slice
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 4] = bytes.get(..Self::SIZE)?.try_into().ok()?;
        Some(Self::decode(raw))
    }

    /// Encode to wire bytes; fields wider than their slot are truncated
    pub fn encode(&self) -> [u8; 4] {
        let release = self.release_sensitivity & MASK_6;
        [
            (self.mode & MASK_2) | ((self.actuation_point & MASK_6) << 2),
            (self.sensitivity & MASK_6) | ((release & MASK_2) << 6),
            (release >> 2) | ((self.advance_mode & MASK_4) << 4),
            self.advance_data,
        ]
    }

    /// Substitute inherited (zero) fields from the profile global
    pub fn resolve(&self, global: &PackedKeyConfig) -> Self {
        let pick = |own: u8, inherited: u8| if own == 0 { inherited } else { own };
        Self {
            mode: pick(self.mode, global.mode),
            actuation_point: pick(self.actuation_point, global.actuation_point),
            sensitivity: pick(self.sensitivity, global.sensitivity),
            release_sensitivity: pick(self.release_sensitivity, global.release_sensitivity),
            advance_mode: self.advance_mode,
            advance_data: self.advance_data,
        }
    }

    /// Every field fits its bit slot
    pub fn fits(&self) -> bool {
        self.mode <= MASK_2
            && self.actuation_point <= MASK_6
            && self.sensitivity <= MASK_6
            && self.release_sensitivity <= MASK_6
            && self.advance_mode <= MASK_4
    }
}

/// Key actuation mode as sent with `ANALOG/SET_TRAVEL`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum AnalogMode {
    Global = 0,
    Regular = 1,
    Rapid = 2,
    Dks = 3,
    Gamepad = 4,
    Toggle = 5,
}

impl AnalogMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Global),
            1 => Some(Self::Regular),
            2 => Some(Self::Rapid),
            3 => Some(Self::Dks),
            4 => Some(Self::Gamepad),
            5 => Some(Self::Toggle),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Global => "Global",
            Self::Regular => "Regular",
            Self::Rapid => "Rapid Trigger",
            Self::Dks => "Dynamic Keystroke",
            Self::Gamepad => "Gamepad",
            Self::Toggle => "Toggle",
        }
    }
}

/// Advance mode stored in the upper nibble of byte 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum AdvanceMode {
    Clear = 0,
    Okmc = 1,
    GameController = 2,
    Toggle = 3,
}

impl AdvanceMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Clear),
            1 => Some(Self::Okmc),
            2 => Some(Self::GameController),
            3 => Some(Self::Toggle),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_example() {
        let cfg = PackedKeyConfig::decode([0x84, 0x03, 0x00, 0x00]);
        assert_eq!(cfg.mode, 0);
        assert_eq!(cfg.actuation_point, 33);
        assert_eq!(cfg.sensitivity, 3);
        assert_eq!(cfg.release_sensitivity, 0);
    }

    #[test]
    fn test_resolve_example() {
        let key = PackedKeyConfig::decode([0x84, 0x03, 0x00, 0x00]);
        let global = PackedKeyConfig {
            mode: 1,
            actuation_point: 20,
            sensitivity: 5,
            release_sensitivity: 7,
            ..Default::default()
        };
        let resolved = key.resolve(&global);
        assert_eq!(resolved.mode, 1);
        assert_eq!(resolved.actuation_point, 33);
        assert_eq!(resolved.sensitivity, 3);
        assert_eq!(resolved.release_sensitivity, 7);
    }

    #[test]
    fn test_release_crosses_byte_boundary() {
        // low 2 bits in byte 1 bits 6-7, high 4 bits in byte 2 bits 0-3
        let cfg = PackedKeyConfig::decode([0x00, 0b1100_0000, 0b0000_1010, 0x00]);
        assert_eq!(cfg.release_sensitivity, 0b10_1011);
        assert_eq!(cfg.sensitivity, 0);
        assert_eq!(cfg.advance_mode, 0);

        let encoded = PackedKeyConfig {
            release_sensitivity: 0b10_1011,
            ..Default::default()
        }
        .encode();
        assert_eq!(encoded, [0x00, 0b1100_0000, 0b0000_1010, 0x00]);
    }

    #[test]
    fn test_round_trip_first_three_bytes() {
        for b0 in 0..=255u8 {
            for b1 in 0..=255u8 {
                for b2 in [0x00u8, 0x0F, 0xF0, 0xA5, 0xFF] {
                    let raw = [b0, b1, b2, b0 ^ b1];
                    assert_eq!(PackedKeyConfig::decode(raw).encode(), raw);
                }
            }
        }
    }

    #[test]
    fn test_round_trip_byte_two_and_three() {
        for b2 in 0..=255u8 {
            for b3 in 0..=255u8 {
                let raw = [0x5A, 0xC3, b2, b3];
                assert_eq!(PackedKeyConfig::decode(raw).encode(), raw);
            }
        }
    }

    #[test]
    fn test_encode_truncates_wide_fields() {
        let cfg = PackedKeyConfig {
            actuation_point: 0xFF,
            ..Default::default()
        };
        assert!(!cfg.fits());
        assert_eq!(cfg.encode()[0], 0xFC);
    }

    #[test]
    fn test_from_slice() {
        assert!(PackedKeyConfig::from_slice(&[1, 2, 3]).is_none());
        let cfg = PackedKeyConfig::from_slice(&[0x05, 0, 0, 9, 99]).unwrap();
        assert_eq!(cfg.mode, 1);
        assert_eq!(cfg.actuation_point, 1);
        assert_eq!(cfg.advance_data, 9);
    }

    #[test]
    fn test_analog_mode_values() {
        assert_eq!(AnalogMode::from_u8(2), Some(AnalogMode::Rapid));
        assert_eq!(AnalogMode::Toggle as u8, 5);
        assert_eq!(AnalogMode::from_u8(6), None);
        assert_eq!(AdvanceMode::from_u8(1), Some(AdvanceMode::Okmc));
    }
}
