//! Client plus state mirror for one connection
//!
//! Writers return `Ok(true)` when the device accepted the request and
//! `Ok(false)` when it refused or garbled its answer. Transport failures
//! and arguments the wire format cannot carry are errors. An accepted
//! write updates the mirror to exactly what was sent.

use std::collections::btree_map::Entry;
use std::sync::Arc;

use keychron_transport::protocol::{analog, timing};
use keychron_transport::{FlowControlTransport, Transport};
use tracing::{debug, info, warn};

use crate::analog::{CalibrationState, RealtimeTravel, TravelTarget, TravelUpdate};
use crate::client::KeychronClient;
use crate::error::KeyboardError;
use crate::features::{Capability, FeatureSet};
use crate::key_config::PackedKeyConfig;
use crate::misc::{DebounceSettings, ReportRate, SnapClickPair, WirelessPowerSettings};
use crate::profile::{AnalogSocdPair, MatrixSize, Profile, ProfileLayout};
use crate::rgb::{EffectSlot, Hsv, IndicatorConfig, PerKeyRgbEffect};
use crate::state::DeviceState;

/// Connection parameters
#[derive(Debug, Clone, Copy)]
pub struct KeyboardConfig {
    /// Matrix size from the caller's layout definition
    pub matrix: MatrixSize,
    /// Attempts per query
    pub retries: usize,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            matrix: MatrixSize::default(),
            retries: timing::QUERY_RETRIES,
        }
    }
}

/// Map a rejection to `None`, keeping transport failures
fn tolerate<T>(what: &str, result: Result<T, KeyboardError>) -> Result<Option<T>, KeyboardError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_rejection() => {
            warn!("{}: {}", what, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn accepted(what: &str, result: Result<(), KeyboardError>) -> Result<bool, KeyboardError> {
    Ok(tolerate(what, result)?.is_some())
}

/// Overwrite `list[start..]` with `items`, growing it as needed
fn splice<T: Clone + Default>(list: &mut Vec<T>, start: usize, items: &[T]) {
    let end = start + items.len();
    if list.len() < end {
        list.resize(end, T::default());
    }
    list[start..end].clone_from_slice(items);
}

/// Mirror a travel update into a cached profile
///
/// Returns false when the update cannot be represented in the packed
/// per-key record (mode above 3 or a value above 63).
fn apply_travel(profile: &mut Profile, update: &TravelUpdate) -> bool {
    let applied = PackedKeyConfig {
        mode: update.mode as u8,
        actuation_point: update.actuation_point,
        sensitivity: update.sensitivity,
        release_sensitivity: update.release_sensitivity,
        ..Default::default()
    };
    if !applied.fits() {
        return false;
    }

    let set = |cfg: &mut PackedKeyConfig| {
        cfg.mode = applied.mode;
        cfg.actuation_point = applied.actuation_point;
        cfg.sensitivity = applied.sensitivity;
        cfg.release_sensitivity = applied.release_sensitivity;
    };
    match &update.target {
        TravelTarget::WholeProfile => set(&mut profile.global),
        target => {
            for (row, col) in target.positions() {
                if let Some(cfg) = profile.key_mut(row, col) {
                    set(cfg);
                }
            }
        }
    }
    true
}

/// A negotiated keyboard with its state mirror
pub struct Keyboard {
    client: KeychronClient,
    state: DeviceState,
}

impl Keyboard {
    /// Negotiate features and load every supported subsystem
    pub async fn connect(
        transport: Arc<dyn Transport>,
        config: KeyboardConfig,
    ) -> Result<Self, KeyboardError> {
        let transport = Arc::new(FlowControlTransport::with_timing(
            transport,
            config.retries,
            timing::READ_TIMEOUT_MS,
        ));
        let client = KeychronClient::new(transport);
        let features = client.negotiate().await?;

        let mut keyboard = Self {
            client,
            state: DeviceState::new(features, config.matrix),
        };
        keyboard.load().await?;
        Ok(keyboard)
    }

    async fn load(&mut self) -> Result<(), KeyboardError> {
        if !self.state.features.protocol_present {
            info!("Keychron protocol not present, nothing to load");
            return Ok(());
        }
        if self.has(Capability::DynamicDebounce) {
            self.reload_debounce().await?;
        }
        if self.has(Capability::Nkro) {
            self.reload_nkro().await?;
        }
        if self.has(Capability::ReportRate) {
            self.reload_report_rate().await?;
        }
        if self.has(Capability::SnapClick) {
            self.reload_snap_click().await?;
        }
        if self.has(Capability::WirelessLowPower) {
            self.reload_wireless().await?;
        }
        if self.has(Capability::KeychronRgb) {
            self.reload_rgb().await?;
        }
        if self.has(Capability::AnalogMatrix) {
            self.reload_analog().await?;
        }
        Ok(())
    }

    pub fn client(&self) -> &KeychronClient {
        &self.client
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn features(&self) -> &FeatureSet {
        &self.state.features
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.state.features.has(cap)
    }

    fn require(&self, cap: Capability) -> Result<(), KeyboardError> {
        if self.has(cap) {
            Ok(())
        } else {
            Err(KeyboardError::NotSupported(cap))
        }
    }

    // === Misc ===

    pub async fn reload_debounce(&mut self) -> Result<(), KeyboardError> {
        self.require(Capability::DynamicDebounce)?;
        if let Some(debounce) = tolerate("debounce", self.client.get_debounce().await)? {
            self.state.misc.debounce = debounce;
        }
        Ok(())
    }

    pub async fn reload_nkro(&mut self) -> Result<(), KeyboardError> {
        self.require(Capability::Nkro)?;
        if let Some(nkro) = tolerate("NKRO", self.client.get_nkro().await)? {
            self.state.misc.nkro = nkro;
        }
        Ok(())
    }

    pub async fn reload_report_rate(&mut self) -> Result<(), KeyboardError> {
        self.require(Capability::ReportRate)?;
        if let Some(rate) = tolerate("report rate", self.client.get_report_rate().await)? {
            self.state.misc.report_rate = rate;
        }
        Ok(())
    }

    pub async fn reload_snap_click(&mut self) -> Result<(), KeyboardError> {
        self.require(Capability::SnapClick)?;
        let Some(count) = tolerate("snap click info", self.client.snap_click_count().await)?
        else {
            return Ok(());
        };
        let pairs = self.client.get_snap_clicks(0, count as usize).await;
        if let Some(pairs) = tolerate("snap click pairs", pairs)? {
            debug!("Loaded {} snap click pairs", pairs.len());
            self.state.misc.snap_clicks = pairs;
        }
        Ok(())
    }

    pub async fn reload_wireless(&mut self) -> Result<(), KeyboardError> {
        self.require(Capability::WirelessLowPower)?;
        let settings = self.client.get_wireless_power().await;
        if let Some(settings) = tolerate("wireless power", settings)? {
            self.state.misc.wireless_power = settings;
        }
        Ok(())
    }

    pub async fn set_debounce(&mut self, settings: DebounceSettings) -> Result<bool, KeyboardError> {
        let ok = accepted("set debounce", self.client.set_debounce(settings).await)?;
        if ok {
            self.state.misc.debounce = settings;
        }
        Ok(ok)
    }

    pub async fn set_nkro(&mut self, enabled: bool) -> Result<bool, KeyboardError> {
        let ok = accepted("set NKRO", self.client.set_nkro(enabled).await)?;
        if ok {
            self.state.misc.nkro.enabled = enabled;
        }
        Ok(ok)
    }

    pub async fn set_report_rate(&mut self, rate: ReportRate) -> Result<bool, KeyboardError> {
        let ok = accepted("set report rate", self.client.set_report_rate(rate).await)?;
        if ok {
            self.state.misc.report_rate.rate_raw = rate as u8;
        }
        Ok(ok)
    }

    /// Write one snap-click slot
    pub async fn set_snap_click(
        &mut self,
        index: usize,
        pair: SnapClickPair,
    ) -> Result<bool, KeyboardError> {
        self.set_snap_clicks(index, &[pair]).await
    }

    pub async fn set_snap_clicks(
        &mut self,
        start: usize,
        pairs: &[SnapClickPair],
    ) -> Result<bool, KeyboardError> {
        let ok = accepted(
            "set snap clicks",
            self.client.set_snap_clicks(start, pairs).await,
        )?;
        if ok {
            splice(&mut self.state.misc.snap_clicks, start, pairs);
        }
        Ok(ok)
    }

    pub async fn save_snap_click(&mut self) -> Result<bool, KeyboardError> {
        accepted("save snap click", self.client.save_snap_click().await)
    }

    pub async fn set_wireless_power(
        &mut self,
        settings: WirelessPowerSettings,
    ) -> Result<bool, KeyboardError> {
        let ok = accepted(
            "set wireless power",
            self.client.set_wireless_power(settings).await,
        )?;
        if ok {
            self.state.misc.wireless_power = settings;
        }
        Ok(ok)
    }

    // === RGB ===

    pub async fn reload_rgb(&mut self) -> Result<(), KeyboardError> {
        self.require(Capability::KeychronRgb)?;
        let client = self.client.clone();
        let rgb = &mut self.state.rgb;

        if let Some(version) = tolerate("RGB version", client.rgb_protocol_version().await)? {
            rgb.protocol_version = version;
        }
        if let Some(count) = tolerate("LED count", client.led_count().await)? {
            rgb.led_count = count;
        }
        if let Some(effect) = tolerate("per-key effect", client.per_key_effect().await)? {
            rgb.per_key_effect = effect;
        }
        if let Some(indicators) = tolerate("indicators", client.indicator_config().await)? {
            rgb.indicators = indicators;
        }

        let led_count = rgb.led_count as usize;
        let colors = client.get_led_colors(0, led_count).await;
        if let Some(colors) = tolerate("LED colors", colors)? {
            rgb.colors = colors;
        }

        if let Some(mixed) = tolerate("mixed RGB info", client.mixed_rgb_info().await)? {
            rgb.mixed = mixed;
            if mixed.layers > 0 && led_count > 0 {
                let regions = client.get_regions(0, led_count).await;
                if let Some(regions) = tolerate("LED regions", regions)? {
                    rgb.regions = regions;
                }
            }
            let mut effects = Vec::with_capacity(mixed.layers as usize);
            for region in 0..mixed.layers {
                let slots = client
                    .get_region_effects(region, 0, mixed.effects_per_layer as usize)
                    .await;
                match tolerate("region effects", slots)? {
                    Some(slots) => effects.push(slots),
                    None => break,
                }
            }
            if effects.len() == mixed.layers as usize {
                rgb.effects = effects;
            }
        }

        if self.state.matrix.key_count() > 0 {
            let map = client.led_matrix(self.state.matrix).await;
            if let Some(map) = tolerate("LED matrix", map)? {
                self.state.rgb.led_matrix = map;
            }
        }

        debug!(
            "Loaded RGB: {} LEDs, {} regions",
            self.state.rgb.led_count, self.state.rgb.mixed.layers
        );
        Ok(())
    }

    pub async fn set_per_key_effect(
        &mut self,
        effect: PerKeyRgbEffect,
    ) -> Result<bool, KeyboardError> {
        let ok = accepted(
            "set per-key effect",
            self.client.set_per_key_effect(effect).await,
        )?;
        if ok {
            self.state.rgb.per_key_effect = effect as u8;
        }
        Ok(ok)
    }

    pub async fn set_led_color(&mut self, index: usize, color: Hsv) -> Result<bool, KeyboardError> {
        self.set_led_colors(index, &[color]).await
    }

    pub async fn set_led_colors(
        &mut self,
        start: usize,
        colors: &[Hsv],
    ) -> Result<bool, KeyboardError> {
        let ok = accepted(
            "set LED colors",
            self.client.set_led_colors(start, colors).await,
        )?;
        if ok {
            splice(&mut self.state.rgb.colors, start, colors);
        }
        Ok(ok)
    }

    pub async fn set_indicator_config(
        &mut self,
        config: IndicatorConfig,
    ) -> Result<bool, KeyboardError> {
        let ok = accepted(
            "set indicators",
            self.client.set_indicator_config(config).await,
        )?;
        if ok {
            self.state.rgb.indicators = config;
        }
        Ok(ok)
    }

    pub async fn save_rgb(&mut self) -> Result<bool, KeyboardError> {
        accepted("save RGB", self.client.save_rgb().await)
    }

    pub async fn set_regions(&mut self, start: usize, regions: &[u8]) -> Result<bool, KeyboardError> {
        let ok = accepted("set regions", self.client.set_regions(start, regions).await)?;
        if ok {
            splice(&mut self.state.rgb.regions, start, regions);
        }
        Ok(ok)
    }

    pub async fn set_region_effects(
        &mut self,
        region: u8,
        start: usize,
        effects: &[EffectSlot],
    ) -> Result<bool, KeyboardError> {
        let ok = accepted(
            "set region effects",
            self.client.set_region_effects(region, start, effects).await,
        )?;
        if ok {
            let lists = &mut self.state.rgb.effects;
            if lists.len() <= region as usize {
                lists.resize(region as usize + 1, Vec::new());
            }
            splice(&mut lists[region as usize], start, effects);
        }
        Ok(ok)
    }

    /// LED indices for the masked columns of `row`, `None` if refused
    pub async fn led_indices_for_row(
        &self,
        row: u8,
        col_mask: u32,
    ) -> Result<Option<Vec<u8>>, KeyboardError> {
        tolerate(
            "LED indices",
            self.client.led_indices_for_row(row, col_mask).await,
        )
    }

    // === Analog ===

    pub async fn reload_analog(&mut self) -> Result<(), KeyboardError> {
        self.require(Capability::AnalogMatrix)?;
        let client = self.client.clone();
        let analog = &mut self.state.analog;

        if let Some(version) = tolerate("analog version", client.analog_version().await)? {
            analog.version = version;
        }
        if let Some(curve) = tolerate("joystick curve", client.curve().await)? {
            analog.curve = curve;
        }
        let mode = client.game_controller_mode().await;
        if let Some(mode) = tolerate("game controller mode", mode)? {
            analog.game_controller_mode = mode;
        }
        let Some(info) = tolerate("profiles info", client.profiles_info().await)? else {
            return Ok(());
        };
        analog.info = info;
        analog.profiles.clear();

        if self.state.matrix.key_count() > 0 {
            let profile = self.load_profile(info.current_profile).await;
            tolerate("current profile", profile.map(|_| ()))?;
        }
        Ok(())
    }

    /// Read and parse one profile into the mirror
    pub async fn load_profile(&mut self, profile: u8) -> Result<&Profile, KeyboardError> {
        self.require(Capability::AnalogMatrix)?;
        let info = self.state.analog.info;
        let layout = ProfileLayout {
            matrix: self.state.matrix,
            okmc_count: info.okmc_count as usize,
            socd_count: info.socd_count as usize,
        };
        let size = (info.profile_size as usize).max(layout.name_offset());
        let bytes = self.client.read_profile(profile, size).await?;
        let parsed = Profile::parse(&bytes, &layout)?;
        debug!(
            "Loaded profile {} ({} bytes, name {:?})",
            profile,
            bytes.len(),
            parsed.name
        );
        Ok(match self.state.analog.profiles.entry(profile) {
            Entry::Occupied(mut slot) => {
                slot.insert(parsed);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(parsed),
        })
    }

    pub async fn select_profile(&mut self, profile: u8) -> Result<bool, KeyboardError> {
        let ok = accepted("select profile", self.client.select_profile(profile).await)?;
        if ok {
            self.state.analog.info.current_profile = profile;
        }
        Ok(ok)
    }

    pub async fn set_travel(&mut self, update: &TravelUpdate) -> Result<bool, KeyboardError> {
        let ok = accepted("set travel", self.client.set_travel(update).await)?;
        if ok {
            let profiles = &mut self.state.analog.profiles;
            if let Some(profile) = profiles.get_mut(&update.profile) {
                if !apply_travel(profile, update) {
                    debug!("Profile {} mirror is stale after travel update", update.profile);
                    profiles.remove(&update.profile);
                }
            }
        }
        Ok(ok)
    }

    pub async fn set_analog_socd(
        &mut self,
        profile: u8,
        index: u8,
        pair: AnalogSocdPair,
    ) -> Result<bool, KeyboardError> {
        let ok = accepted(
            "set analog SOCD",
            self.client.set_analog_socd(profile, index, pair).await,
        )?;
        if ok {
            if let Some(slot) = self
                .state
                .analog
                .profiles
                .get_mut(&profile)
                .and_then(|p| p.socd.get_mut(index as usize))
            {
                *slot = pair;
            }
        }
        Ok(ok)
    }

    pub async fn save_profile(&mut self, profile: u8) -> Result<bool, KeyboardError> {
        accepted("save profile", self.client.save_profile(profile).await)
    }

    /// Reset a profile to defaults; its mirror is dropped until reloaded
    pub async fn reset_profile(&mut self, profile: u8) -> Result<bool, KeyboardError> {
        let ok = accepted("reset profile", self.client.reset_profile(profile).await)?;
        if ok {
            self.state.analog.profiles.remove(&profile);
        }
        Ok(ok)
    }

    pub async fn set_curve(
        &mut self,
        points: [u16; analog::CURVE_POINTS],
    ) -> Result<bool, KeyboardError> {
        let ok = accepted("set curve", self.client.set_curve(points).await)?;
        if ok {
            self.state.analog.curve = points;
        }
        Ok(ok)
    }

    pub async fn set_game_controller_mode(&mut self, mode: u8) -> Result<bool, KeyboardError> {
        let ok = accepted(
            "set game controller mode",
            self.client.set_game_controller_mode(mode).await,
        )?;
        if ok {
            self.state.analog.game_controller_mode = mode;
        }
        Ok(ok)
    }

    pub async fn realtime_travel(
        &self,
        row: u8,
        col: u8,
    ) -> Result<Option<RealtimeTravel>, KeyboardError> {
        tolerate("realtime travel", self.client.realtime_travel(row, col).await)
    }

    pub async fn start_calibration(
        &mut self,
        phase: CalibrationState,
    ) -> Result<bool, KeyboardError> {
        let ok = accepted(
            "start calibration",
            self.client.start_calibration(phase).await,
        )?;
        if ok {
            self.state.analog.calibration = phase;
        }
        Ok(ok)
    }

    /// Poll calibration progress
    pub async fn calibration_state(&mut self) -> Result<Option<CalibrationState>, KeyboardError> {
        let state = tolerate("calibration state", self.client.calibration_state().await)?;
        if let Some(state) = state {
            self.state.analog.calibration = state;
        }
        Ok(state)
    }

    /// Effective travel settings of a key in the current profile
    pub fn resolved_key_config(&self, row: u8, col: u8) -> Option<PackedKeyConfig> {
        self.state.analog.current_profile()?.resolved(row, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_config::AnalogMode;

    fn profile() -> Profile {
        let layout = ProfileLayout {
            matrix: MatrixSize::new(2, 2),
            okmc_count: 0,
            socd_count: 0,
        };
        Profile::parse(&[0u8; 20], &layout).unwrap()
    }

    fn update(mode: AnalogMode, actuation_point: u8, target: TravelTarget) -> TravelUpdate {
        TravelUpdate {
            profile: 0,
            mode,
            actuation_point,
            sensitivity: 2,
            release_sensitivity: 3,
            target,
        }
    }

    #[test]
    fn test_splice_grows() {
        let mut list = vec![1u8, 2, 3];
        splice(&mut list, 2, &[9, 9]);
        assert_eq!(list, vec![1, 2, 9, 9]);
        splice(&mut list, 6, &[7]);
        assert_eq!(list, vec![1, 2, 9, 9, 0, 0, 7]);
    }

    #[test]
    fn test_apply_travel_whole_profile() {
        let mut p = profile();
        assert!(apply_travel(&mut p, &update(AnalogMode::Rapid, 20, TravelTarget::WholeProfile)));
        assert_eq!(p.global.mode, 2);
        assert_eq!(p.global.actuation_point, 20);
        assert_eq!(p.key(0, 0).unwrap().actuation_point, 0);
    }

    #[test]
    fn test_apply_travel_rows() {
        let mut p = profile();
        let target = TravelTarget::keys(&[(1, 0)]).unwrap();
        assert!(apply_travel(&mut p, &update(AnalogMode::Regular, 30, target)));
        assert_eq!(p.key(1, 0).unwrap().actuation_point, 30);
        assert_eq!(p.key(1, 0).unwrap().release_sensitivity, 3);
        assert_eq!(p.key(0, 1).unwrap().actuation_point, 0);
    }

    #[test]
    fn test_apply_travel_unrepresentable() {
        let mut p = profile();
        let before = p.clone();
        assert!(!apply_travel(&mut p, &update(AnalogMode::Gamepad, 20, TravelTarget::WholeProfile)));
        assert!(!apply_travel(&mut p, &update(AnalogMode::Regular, 64, TravelTarget::WholeProfile)));
        assert_eq!(p, before);
    }
}
