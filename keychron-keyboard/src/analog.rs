//! Analog matrix (Hall Effect) command group

use keychron_transport::protocol::{analog, cmd, rgb, timing};
use keychron_transport::{CommandFrame, ParseError};
use serde::Serialize;
use std::mem::size_of;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::client::{read_u16, KeychronClient};
use crate::error::KeyboardError;
use crate::key_config::AnalogMode;
use crate::profile::AnalogSocdPair;
use crate::records::ProfileBytes;

/// Profile slot summary from `GET_PROFILES_INFO`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalogProfilesInfo {
    pub current_profile: u8,
    pub profile_count: u8,
    /// Raw profile size in bytes
    pub profile_size: u16,
    pub okmc_count: u8,
    pub socd_count: u8,
}

#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
struct ProfilesInfoWire {
    current_profile: u8,
    profile_count: u8,
    profile_size: [u8; 2],
    okmc_count: u8,
    socd_count: u8,
}

/// Which keys a travel update applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TravelTarget {
    /// Profile global (every key that inherits)
    WholeProfile,
    /// One 24-bit column mask per row, starting at row 0
    Rows(Vec<u32>),
}

impl TravelTarget {
    /// Rows addressable in one report after the 8-byte header
    pub const MAX_ROWS: usize = 8;

    /// Select single keys; columns past the 24-bit mask are rejected
    pub fn keys(positions: &[(u8, u8)]) -> Result<Self, KeyboardError> {
        if let Some(&(row, col)) = positions
            .iter()
            .find(|&&(_, col)| col as usize >= rgb::MAX_COLUMNS)
        {
            return Err(KeyboardError::InvalidParameter(format!(
                "key ({}, {}) exceeds {} columns",
                row,
                col,
                rgb::MAX_COLUMNS
            )));
        }
        let rows = positions
            .iter()
            .map(|&(row, _)| row as usize + 1)
            .max()
            .unwrap_or(0);
        let mut masks = vec![0u32; rows];
        for &(row, col) in positions {
            masks[row as usize] |= 1 << col;
        }
        Ok(Self::Rows(masks))
    }

    /// Iterate `(row, col)` pairs selected by a row-mask target
    pub fn positions(&self) -> Vec<(u8, u8)> {
        match self {
            Self::WholeProfile => Vec::new(),
            Self::Rows(masks) => masks
                .iter()
                .enumerate()
                .flat_map(|(row, &mask)| {
                    (0..rgb::MAX_COLUMNS as u8)
                        .filter(move |col| mask & (1 << col) != 0)
                        .map(move |col| (row as u8, col))
                })
                .collect(),
        }
    }
}

/// One `SET_TRAVEL` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TravelUpdate {
    pub profile: u8,
    pub mode: AnalogMode,
    /// 0.1 mm units
    pub actuation_point: u8,
    pub sensitivity: u8,
    pub release_sensitivity: u8,
    pub target: TravelTarget,
}

#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
struct SetTravelHeader {
    profile: u8,
    mode: u8,
    actuation_point: u8,
    sensitivity: u8,
    release_sensitivity: u8,
    entire: u8,
}

impl TravelUpdate {
    fn to_frame(&self) -> Result<CommandFrame, KeyboardError> {
        let header = SetTravelHeader {
            profile: self.profile,
            mode: self.mode as u8,
            actuation_point: self.actuation_point,
            sensitivity: self.sensitivity,
            release_sensitivity: self.release_sensitivity,
            entire: u8::from(self.target == TravelTarget::WholeProfile),
        };
        let frame = CommandFrame::group(cmd::ANALOG_GROUP, analog::SET_TRAVEL).args(header.as_bytes());

        match &self.target {
            TravelTarget::WholeProfile => Ok(frame.arg(0)),
            TravelTarget::Rows(masks) => {
                if masks.len() > TravelTarget::MAX_ROWS {
                    return Err(KeyboardError::InvalidParameter(format!(
                        "{} rows exceed the {} a travel update can address",
                        masks.len(),
                        TravelTarget::MAX_ROWS
                    )));
                }
                if let Some(mask) = masks.iter().find(|&&m| m >> rgb::MAX_COLUMNS != 0) {
                    return Err(KeyboardError::InvalidParameter(format!(
                        "column mask 0x{:X} exceeds {} columns",
                        mask,
                        rgb::MAX_COLUMNS
                    )));
                }
                Ok(masks
                    .iter()
                    .fold(frame, |f, mask| f.args(&mask.to_le_bytes()[..3])))
            }
        }
    }
}

/// Live travel sample of one key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RealtimeTravel {
    pub row: u8,
    pub col: u8,
    /// 0.1 mm units
    pub travel_mm10: u8,
    pub travel_raw: u8,
    pub value: u16,
    pub zero: u16,
    pub full: u16,
    pub state: u8,
}

impl RealtimeTravel {
    pub fn travel_mm(&self) -> f32 {
        self.travel_mm10 as f32 / 10.0
    }
}

#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
struct RealtimeTravelWire {
    row: u8,
    col: u8,
    travel_mm10: u8,
    travel_raw: u8,
    value: [u8; 2],
    zero: [u8; 2],
    full: [u8; 2],
    state: u8,
}

/// Calibration phase, both as a request and as the polled device state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum CalibrationState {
    #[default]
    Off,
    ZeroTravelPowerOn,
    ZeroTravelManual,
    FullTravelManual,
    SaveAndExit,
    Clear,
    /// Value not known to this driver
    Other(u8),
}

impl CalibrationState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Off,
            1 => Self::ZeroTravelPowerOn,
            2 => Self::ZeroTravelManual,
            3 => Self::FullTravelManual,
            4 => Self::SaveAndExit,
            5 => Self::Clear,
            other => Self::Other(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Off => 0,
            Self::ZeroTravelPowerOn => 1,
            Self::ZeroTravelManual => 2,
            Self::FullTravelManual => 3,
            Self::SaveAndExit => 4,
            Self::Clear => 5,
            Self::Other(v) => *v,
        }
    }
}

fn too_short(frame: &CommandFrame, expected: usize, got: usize) -> KeyboardError {
    KeyboardError::from_parse(frame, ParseError::TooShort { expected, got })
}

fn analog_frame(sub: u8) -> CommandFrame {
    CommandFrame::group(cmd::ANALOG_GROUP, sub)
}

impl KeychronClient {
    /// Analog sub-protocol version (u32 at bytes 2-5, no status byte)
    pub async fn analog_version(&self) -> Result<u32, KeyboardError> {
        let frame = analog_frame(analog::GET_VERSION).without_status();
        let payload = self.execute(&frame, 4).await?;
        Ok(u32::from_le_bytes([
            payload[0], payload[1], payload[2], payload[3],
        ]))
    }

    /// Profile count, current profile and raw layout counts (no status byte)
    pub async fn profiles_info(&self) -> Result<AnalogProfilesInfo, KeyboardError> {
        let frame = analog_frame(analog::GET_PROFILES_INFO).without_status();
        let payload = self.execute(&frame, 6).await?;
        let (wire, _) = ProfilesInfoWire::read_from_prefix(&payload)
            .map_err(|_| too_short(&frame, size_of::<ProfilesInfoWire>(), payload.len()))?;
        Ok(AnalogProfilesInfo {
            current_profile: wire.current_profile,
            profile_count: wire.profile_count,
            profile_size: u16::from_le_bytes(wire.profile_size),
            okmc_count: wire.okmc_count,
            socd_count: wire.socd_count,
        })
    }

    pub async fn select_profile(&self, profile: u8) -> Result<(), KeyboardError> {
        self.command(&analog_frame(analog::SELECT_PROFILE).arg(profile))
            .await
    }

    /// Read `size` raw bytes of a profile
    pub async fn read_profile(&self, profile: u8, size: usize) -> Result<Vec<u8>, KeyboardError> {
        self.read_records(&ProfileBytes { profile }, 0, size).await
    }

    pub async fn set_travel(&self, update: &TravelUpdate) -> Result<(), KeyboardError> {
        self.command(&update.to_frame()?).await
    }

    /// Write one SOCD pair slot of a profile
    pub async fn set_analog_socd(
        &self,
        profile: u8,
        index: u8,
        pair: AnalogSocdPair,
    ) -> Result<(), KeyboardError> {
        let frame = analog_frame(analog::SET_SOCD).args(&[
            profile, pair.row1, pair.col1, pair.row2, pair.col2, index, pair.kind,
        ]);
        self.command(&frame).await
    }

    /// Persist a profile to EEPROM
    pub async fn save_profile(&self, profile: u8) -> Result<(), KeyboardError> {
        self.command(&analog_frame(analog::SAVE_PROFILE).arg(profile))
            .await
    }

    /// Restore one profile to factory defaults
    pub async fn reset_profile(&self, profile: u8) -> Result<(), KeyboardError> {
        self.command(&analog_frame(analog::RESET_PROFILE).arg(profile))
            .await
    }

    pub async fn curve(&self) -> Result<[u16; analog::CURVE_POINTS], KeyboardError> {
        let payload = self
            .execute(&analog_frame(analog::GET_CURVE), analog::CURVE_POINTS * 2)
            .await?;
        let mut points = [0u16; analog::CURVE_POINTS];
        for (i, point) in points.iter_mut().enumerate() {
            *point = read_u16(&payload, i * 2);
        }
        Ok(points)
    }

    pub async fn set_curve(&self, points: [u16; analog::CURVE_POINTS]) -> Result<(), KeyboardError> {
        let frame = points
            .iter()
            .fold(analog_frame(analog::SET_CURVE), |f, &p| f.arg_u16(p));
        self.command(&frame).await
    }

    pub async fn game_controller_mode(&self) -> Result<u8, KeyboardError> {
        let payload = self
            .execute(&analog_frame(analog::GET_GAME_CONTROLLER_MODE), 1)
            .await?;
        Ok(payload[0])
    }

    pub async fn set_game_controller_mode(&self, mode: u8) -> Result<(), KeyboardError> {
        self.command(&analog_frame(analog::SET_GAME_CONTROLLER_MODE).arg(mode))
            .await
    }

    /// Single-shot live travel sample; one attempt only
    pub async fn realtime_travel(&self, row: u8, col: u8) -> Result<RealtimeTravel, KeyboardError> {
        let frame = analog_frame(analog::GET_REALTIME_TRAVEL).arg(row).arg(col);
        let payload = self
            .execute_with_retries(&frame, 11, timing::REALTIME_RETRIES)
            .await?;
        let (wire, _) = RealtimeTravelWire::read_from_prefix(&payload)
            .map_err(|_| too_short(&frame, size_of::<RealtimeTravelWire>(), payload.len()))?;
        Ok(RealtimeTravel {
            row: wire.row,
            col: wire.col,
            travel_mm10: wire.travel_mm10,
            travel_raw: wire.travel_raw,
            value: u16::from_le_bytes(wire.value),
            zero: u16::from_le_bytes(wire.zero),
            full: u16::from_le_bytes(wire.full),
            state: wire.state,
        })
    }

    /// Trigger a calibration phase; progress is observed by polling
    pub async fn start_calibration(&self, phase: CalibrationState) -> Result<(), KeyboardError> {
        self.command(&analog_frame(analog::CALIBRATE).arg(phase.as_u8()))
            .await
    }

    pub async fn calibration_state(&self) -> Result<CalibrationState, KeyboardError> {
        let payload = self
            .execute(&analog_frame(analog::GET_CALIBRATE_STATE), 1)
            .await?;
        Ok(CalibrationState::from_u8(payload[0]))
    }
}
