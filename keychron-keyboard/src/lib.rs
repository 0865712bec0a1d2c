//! Keyboard interface for the Keychron vendor command set
//!
//! Layers, bottom-up:
//!
//! - [`KeychronClient`]: one async method per device operation, stateless
//! - [`records`]: paginated transfer of lists that exceed one report
//! - [`PackedKeyConfig`] / [`Profile`]: analog profile codecs
//! - [`Keyboard`]: negotiated capabilities plus the [`DeviceState`] mirror

pub mod analog;
pub mod error;
pub mod features;
pub mod key_config;
pub mod misc;
pub mod profile;
pub mod records;
pub mod rgb;
pub mod state;

mod client;
mod keyboard;

pub use analog::{AnalogProfilesInfo, CalibrationState, RealtimeTravel, TravelTarget, TravelUpdate};
pub use client::KeychronClient;
pub use error::KeyboardError;
pub use features::{Capability, FeatureMask, FeatureSet};
pub use key_config::{AdvanceMode, AnalogMode, PackedKeyConfig};
pub use keyboard::{Keyboard, KeyboardConfig};
pub use misc::{
    DebounceAlgorithm, DebounceSettings, NkroState, ReportRate, ReportRateState, SnapClickPair,
    SnapClickType, WirelessPowerSettings,
};
pub use profile::{AnalogSocdPair, AnalogSocdType, MatrixSize, Profile, ProfileLayout};
pub use records::RecordKind;
pub use rgb::{EffectSlot, Hsv, IndicatorConfig, LedMatrixMap, MixedRgbInfo, PerKeyRgbEffect};
pub use state::{AnalogState, DeviceState, MiscState, RgbState};

// Re-export transport types for convenience
pub use keychron_transport::{FlowControlTransport, Transport, TransportError};
