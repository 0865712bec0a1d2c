//! In-memory mirror of device state
//!
//! Built once per connection by [`crate::Keyboard::connect`]. Subsystems
//! whose capability is absent keep their defaults.

use std::collections::BTreeMap;

use keychron_transport::protocol::analog::CURVE_POINTS;
use serde::Serialize;

use crate::analog::{AnalogProfilesInfo, CalibrationState};
use crate::features::FeatureSet;
use crate::misc::{
    DebounceSettings, NkroState, ReportRateState, SnapClickPair, WirelessPowerSettings,
};
use crate::profile::{MatrixSize, Profile};
use crate::rgb::{EffectSlot, Hsv, IndicatorConfig, LedMatrixMap, MixedRgbInfo};

/// Misc group settings
#[derive(Debug, Clone, Default, Serialize)]
pub struct MiscState {
    pub debounce: DebounceSettings,
    pub nkro: NkroState,
    pub report_rate: ReportRateState,
    pub snap_clicks: Vec<SnapClickPair>,
    pub wireless_power: WirelessPowerSettings,
}

/// Per-key and mixed RGB settings
#[derive(Debug, Clone, Default, Serialize)]
pub struct RgbState {
    pub protocol_version: u16,
    pub led_count: u8,
    pub per_key_effect: u8,
    pub indicators: IndicatorConfig,
    /// Indexed by LED index
    pub colors: Vec<Hsv>,
    pub mixed: MixedRgbInfo,
    /// Region id per LED index
    pub regions: Vec<u8>,
    /// `effects[region][slot]`
    pub effects: Vec<Vec<EffectSlot>>,
    pub led_matrix: LedMatrixMap,
}

/// Analog matrix settings
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalogState {
    pub version: u32,
    pub info: AnalogProfilesInfo,
    pub curve: [u16; CURVE_POINTS],
    pub game_controller_mode: u8,
    pub calibration: CalibrationState,
    /// Profiles read so far, by slot
    pub profiles: BTreeMap<u8, Profile>,
}

impl AnalogState {
    pub fn current_profile(&self) -> Option<&Profile> {
        self.profiles.get(&self.info.current_profile)
    }
}

/// Everything mirrored for one connection
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceState {
    pub features: FeatureSet,
    pub matrix: MatrixSize,
    pub misc: MiscState,
    pub rgb: RgbState,
    pub analog: AnalogState,
}

impl DeviceState {
    /// Fresh mirror with defaults for every subsystem
    pub fn new(features: FeatureSet, matrix: MatrixSize) -> Self {
        Self {
            features,
            matrix,
            ..Default::default()
        }
    }
}
