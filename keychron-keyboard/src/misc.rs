//! Misc command group: debounce, NKRO, report rate, snap click, wireless power

use keychron_transport::protocol::{cmd, misc};
use keychron_transport::CommandFrame;
use serde::Serialize;

use crate::client::{read_u16, KeychronClient};
use crate::error::KeyboardError;
use crate::records::SnapClicks;

/// Debounce algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum DebounceAlgorithm {
    SymDeferGlobal = 0,
    SymDeferPerRow = 1,
    SymDeferPerKey = 2,
    SymEagerPerRow = 3,
    SymEagerPerKey = 4,
    AsymEagerDeferPerKey = 5,
    None = 6,
}

impl DebounceAlgorithm {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::SymDeferGlobal),
            1 => Some(Self::SymDeferPerRow),
            2 => Some(Self::SymDeferPerKey),
            3 => Some(Self::SymEagerPerRow),
            4 => Some(Self::SymEagerPerKey),
            5 => Some(Self::AsymEagerDeferPerKey),
            6 => Some(Self::None),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SymDeferGlobal => "Symmetric Defer (Global)",
            Self::SymDeferPerRow => "Symmetric Defer (Per Row)",
            Self::SymDeferPerKey => "Symmetric Defer (Per Key)",
            Self::SymEagerPerRow => "Symmetric Eager (Per Row)",
            Self::SymEagerPerKey => "Symmetric Eager (Per Key)",
            Self::AsymEagerDeferPerKey => "Asymmetric Eager-Defer (Per Key)",
            Self::None => "None",
        }
    }
}

/// Debounce algorithm and time
///
/// The algorithm is kept raw so values from newer firmware survive a
/// round trip; see [`DebounceSettings::algorithm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DebounceSettings {
    pub algorithm_raw: u8,
    pub time_ms: u8,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            algorithm_raw: DebounceAlgorithm::SymDeferGlobal as u8,
            time_ms: 5,
        }
    }
}

impl DebounceSettings {
    pub fn new(algorithm: DebounceAlgorithm, time_ms: u8) -> Self {
        Self {
            algorithm_raw: algorithm as u8,
            time_ms,
        }
    }

    pub fn algorithm(&self) -> Option<DebounceAlgorithm> {
        DebounceAlgorithm::from_u8(self.algorithm_raw)
    }
}

/// NKRO flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NkroState {
    pub enabled: bool,
    pub supported: bool,
    pub adaptive: bool,
}

impl NkroState {
    pub fn from_flags(flags: u8) -> Self {
        Self {
            enabled: flags & 0x01 != 0,
            supported: flags & 0x02 != 0,
            adaptive: flags & 0x04 != 0,
        }
    }
}

/// USB report rate (wire value is a divider index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ReportRate {
    Hz8000 = 0,
    Hz4000 = 1,
    Hz2000 = 2,
    Hz1000 = 3,
    Hz500 = 4,
    Hz250 = 5,
    Hz125 = 6,
}

impl ReportRate {
    pub const ALL: [ReportRate; 7] = [
        Self::Hz8000,
        Self::Hz4000,
        Self::Hz2000,
        Self::Hz1000,
        Self::Hz500,
        Self::Hz250,
        Self::Hz125,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Get rate from Hz value
    pub fn from_hz(hz: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.hz() == hz)
    }

    pub fn hz(&self) -> u16 {
        8000 >> (*self as u8)
    }
}

/// Current report rate and the rates the device accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportRateState {
    pub rate_raw: u8,
    /// Bit `n` set when divider `n` is supported
    pub supported_mask: u8,
}

impl Default for ReportRateState {
    fn default() -> Self {
        Self {
            rate_raw: ReportRate::Hz1000 as u8,
            supported_mask: 0x7F,
        }
    }
}

impl ReportRateState {
    pub fn rate(&self) -> Option<ReportRate> {
        ReportRate::from_u8(self.rate_raw)
    }

    pub fn supports(&self, rate: ReportRate) -> bool {
        self.supported_mask & (1 << rate as u8) != 0
    }
}

/// Snap-click resolution policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum SnapClickType {
    Disabled = 0,
    Regular = 1,
    LastInput = 2,
    FirstKey = 3,
    SecondKey = 4,
    Neutral = 5,
}

impl SnapClickType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Disabled),
            1 => Some(Self::Regular),
            2 => Some(Self::LastInput),
            3 => Some(Self::FirstKey),
            4 => Some(Self::SecondKey),
            5 => Some(Self::Neutral),
            _ => None,
        }
    }
}

/// One snap-click pair: policy plus two keycodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapClickPair {
    pub kind: u8,
    pub key1: u8,
    pub key2: u8,
}

impl SnapClickPair {
    pub fn new(kind: SnapClickType, key1: u8, key2: u8) -> Self {
        Self {
            kind: kind as u8,
            key1,
            key2,
        }
    }
}

/// Wireless low-power timers in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WirelessPowerSettings {
    pub backlight_off_secs: u16,
    pub idle_sleep_secs: u16,
}

impl Default for WirelessPowerSettings {
    fn default() -> Self {
        Self {
            backlight_off_secs: 30,
            idle_sleep_secs: 300,
        }
    }
}

fn misc_frame(sub: u8) -> CommandFrame {
    CommandFrame::group(cmd::MISC_GROUP, sub)
}

impl KeychronClient {
    pub async fn get_debounce(&self) -> Result<DebounceSettings, KeyboardError> {
        // payload[0] is reserved (0 on QMK)
        let payload = self.execute(&misc_frame(misc::DEBOUNCE_GET), 3).await?;
        Ok(DebounceSettings {
            algorithm_raw: payload[1],
            time_ms: payload[2],
        })
    }

    pub async fn set_debounce(&self, settings: DebounceSettings) -> Result<(), KeyboardError> {
        let frame = misc_frame(misc::DEBOUNCE_SET)
            .arg(settings.algorithm_raw)
            .arg(settings.time_ms);
        self.command(&frame).await
    }

    pub async fn get_nkro(&self) -> Result<NkroState, KeyboardError> {
        let payload = self.execute(&misc_frame(misc::NKRO_GET), 1).await?;
        Ok(NkroState::from_flags(payload[0]))
    }

    pub async fn set_nkro(&self, enabled: bool) -> Result<(), KeyboardError> {
        self.command(&misc_frame(misc::NKRO_SET).arg(u8::from(enabled)))
            .await
    }

    pub async fn get_report_rate(&self) -> Result<ReportRateState, KeyboardError> {
        let payload = self.execute(&misc_frame(misc::REPORT_RATE_GET), 1).await?;
        Ok(ReportRateState {
            rate_raw: payload[0],
            supported_mask: payload.get(1).copied().unwrap_or(0x7F),
        })
    }

    pub async fn set_report_rate(&self, rate: ReportRate) -> Result<(), KeyboardError> {
        self.command(&misc_frame(misc::REPORT_RATE_SET).arg(rate as u8))
            .await
    }

    /// Number of snap-click slots
    pub async fn snap_click_count(&self) -> Result<u8, KeyboardError> {
        let payload = self
            .execute(&misc_frame(misc::SNAP_CLICK_GET_INFO), 1)
            .await?;
        Ok(payload[0])
    }

    pub async fn get_snap_clicks(
        &self,
        start: usize,
        count: usize,
    ) -> Result<Vec<SnapClickPair>, KeyboardError> {
        self.read_records(&SnapClicks, start, count).await
    }

    pub async fn set_snap_clicks(
        &self,
        start: usize,
        pairs: &[SnapClickPair],
    ) -> Result<(), KeyboardError> {
        self.write_records(&SnapClicks, start, pairs).await
    }

    /// Persist snap-click pairs to EEPROM
    pub async fn save_snap_click(&self) -> Result<(), KeyboardError> {
        self.command(&misc_frame(misc::SNAP_CLICK_SAVE)).await
    }

    pub async fn get_wireless_power(&self) -> Result<WirelessPowerSettings, KeyboardError> {
        let payload = self
            .execute(&misc_frame(misc::WIRELESS_LPM_GET), 4)
            .await?;
        Ok(WirelessPowerSettings {
            backlight_off_secs: read_u16(&payload, 0),
            idle_sleep_secs: read_u16(&payload, 2),
        })
    }

    pub async fn set_wireless_power(
        &self,
        settings: WirelessPowerSettings,
    ) -> Result<(), KeyboardError> {
        let frame = misc_frame(misc::WIRELESS_LPM_SET)
            .arg_u16(settings.backlight_off_secs)
            .arg_u16(settings.idle_sleep_secs);
        self.command(&frame).await
    }
}
