//! Capability negotiation results
//!
//! The device reports support through two independent 16-bit masks: the
//! primary mask (`GET_SUPPORT_FEATURE`) and the misc-group mask. Firmware
//! generations disagree about which mask carries a given capability, so a
//! capability is present when its bit is set in either one. Everything
//! downstream works with the normalized [`Capability`] set.

use std::collections::BTreeSet;
use std::fmt;

use keychron_transport::protocol::{feature, misc_feature};
use serde::Serialize;

/// A device capability, independent of which mask advertised it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Capability {
    DefaultLayer,
    Bluetooth,
    Wireless24G,
    AnalogMatrix,
    StateNotify,
    DynamicDebounce,
    SnapClick,
    KeychronRgb,
    QuickStart,
    Nkro,
    DfuInfo,
    Language,
    WirelessLowPower,
    ReportRate,
}

impl Capability {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::DefaultLayer => "default layer",
            Self::Bluetooth => "Bluetooth",
            Self::Wireless24G => "2.4 GHz",
            Self::AnalogMatrix => "analog matrix",
            Self::StateNotify => "state notify",
            Self::DynamicDebounce => "dynamic debounce",
            Self::SnapClick => "snap click",
            Self::KeychronRgb => "per-key RGB",
            Self::QuickStart => "quick start",
            Self::Nkro => "NKRO",
            Self::DfuInfo => "DFU info",
            Self::Language => "language",
            Self::WirelessLowPower => "wireless low power",
            Self::ReportRate => "report rate",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy)]
enum Tier {
    Primary,
    Misc,
}

/// Bit to capability mapping for both masks
///
/// One bit may grant several capabilities (a Bluetooth or 2.4 GHz radio
/// implies the wireless power settings exist).
const CAPABILITY_BITS: &[(Tier, u16, Capability)] = &[
    (Tier::Primary, feature::DEFAULT_LAYER, Capability::DefaultLayer),
    (Tier::Primary, feature::BLUETOOTH, Capability::Bluetooth),
    (Tier::Primary, feature::BLUETOOTH, Capability::WirelessLowPower),
    (Tier::Primary, feature::P24G, Capability::Wireless24G),
    (Tier::Primary, feature::P24G, Capability::WirelessLowPower),
    (Tier::Primary, feature::ANALOG_MATRIX, Capability::AnalogMatrix),
    (Tier::Primary, feature::STATE_NOTIFY, Capability::StateNotify),
    (Tier::Primary, feature::DYNAMIC_DEBOUNCE, Capability::DynamicDebounce),
    (Tier::Primary, feature::SNAP_CLICK, Capability::SnapClick),
    (Tier::Primary, feature::KEYCHRON_RGB, Capability::KeychronRgb),
    (Tier::Primary, feature::QUICK_START, Capability::QuickStart),
    (Tier::Primary, feature::NKRO, Capability::Nkro),
    (Tier::Misc, misc_feature::DFU_INFO, Capability::DfuInfo),
    (Tier::Misc, misc_feature::LANGUAGE, Capability::Language),
    (Tier::Misc, misc_feature::DEBOUNCE, Capability::DynamicDebounce),
    (Tier::Misc, misc_feature::SNAP_CLICK, Capability::SnapClick),
    (Tier::Misc, misc_feature::WIRELESS_LPM, Capability::WirelessLowPower),
    (Tier::Misc, misc_feature::REPORT_RATE, Capability::ReportRate),
    (Tier::Misc, misc_feature::QUICK_START, Capability::QuickStart),
    (Tier::Misc, misc_feature::NKRO, Capability::Nkro),
];

/// Raw two-tier feature mask as reported by the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeatureMask {
    pub primary: u16,
    pub misc: u16,
}

impl FeatureMask {
    pub fn new(primary: u16, misc: u16) -> Self {
        Self { primary, misc }
    }

    /// Normalize into capabilities (OR across both masks)
    pub fn capabilities(&self) -> BTreeSet<Capability> {
        CAPABILITY_BITS
            .iter()
            .filter(|(tier, bit, _)| {
                let mask = match tier {
                    Tier::Primary => self.primary,
                    Tier::Misc => self.misc,
                };
                mask & bit != 0
            })
            .map(|(_, _, cap)| *cap)
            .collect()
    }
}

/// Outcome of negotiation for one connection
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureSet {
    /// Device answered the protocol version query
    pub protocol_present: bool,
    pub protocol_version: u8,
    pub misc_protocol_version: u16,
    pub firmware_version: Option<String>,
    pub mask: FeatureMask,
    capabilities: BTreeSet<Capability>,
}

impl FeatureSet {
    /// Device does not speak the protocol
    pub fn absent() -> Self {
        Self::default()
    }

    /// Build from negotiated values
    pub fn new(
        protocol_version: u8,
        mask: FeatureMask,
        misc_protocol_version: u16,
        firmware_version: Option<String>,
    ) -> Self {
        Self {
            protocol_present: true,
            protocol_version,
            misc_protocol_version,
            firmware_version,
            capabilities: mask.capabilities(),
            mask,
        }
    }

    /// Check for a capability
    pub fn has(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }

    /// Iterate over supported capabilities in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.capabilities.iter().copied()
    }

    /// No capability advertised (includes protocol absent)
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_misc_only_bit_grants_capability() {
        let mask = FeatureMask::new(0, misc_feature::DEBOUNCE | misc_feature::NKRO);
        let set = FeatureSet::new(1, mask, 1, None);
        assert!(set.has(Capability::DynamicDebounce));
        assert!(set.has(Capability::Nkro));
        assert!(!set.has(Capability::SnapClick));
    }

    #[test]
    fn test_primary_only_bit_grants_capability() {
        let mask = FeatureMask::new(feature::SNAP_CLICK | feature::ANALOG_MATRIX, 0);
        let caps = mask.capabilities();
        assert!(caps.contains(&Capability::SnapClick));
        assert!(caps.contains(&Capability::AnalogMatrix));
        assert_eq!(caps.len(), 2);
    }

    #[test]
    fn test_radio_implies_wireless_power() {
        let caps = FeatureMask::new(feature::P24G, 0).capabilities();
        assert!(caps.contains(&Capability::Wireless24G));
        assert!(caps.contains(&Capability::WirelessLowPower));

        let caps = FeatureMask::new(0, misc_feature::WIRELESS_LPM).capabilities();
        assert!(caps.contains(&Capability::WirelessLowPower));
        assert!(!caps.contains(&Capability::Bluetooth));
    }

    #[test]
    fn test_report_rate_only_from_misc() {
        assert!(FeatureMask::new(0xFFFF, 0)
            .capabilities()
            .iter()
            .all(|c| *c != Capability::ReportRate));
        assert!(FeatureMask::new(0, misc_feature::REPORT_RATE)
            .capabilities()
            .contains(&Capability::ReportRate));
    }

    #[test]
    fn test_absent_is_empty() {
        let set = FeatureSet::absent();
        assert!(!set.protocol_present);
        assert!(set.is_empty());
        assert!(!set.has(Capability::KeychronRgb));
    }
}
