//! Per-key and mixed RGB command group

use keychron_transport::protocol::{cmd, rgb};
use keychron_transport::CommandFrame;
use serde::Serialize;
use tracing::debug;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::client::{read_u16, KeychronClient};
use crate::error::KeyboardError;
use crate::profile::MatrixSize;
use crate::records::{LedColors, RegionEffects, Regions};

/// HSV color, 8 bits per channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Hsv {
    pub hue: u8,
    pub saturation: u8,
    pub value: u8,
}

impl Hsv {
    pub const fn new(hue: u8, saturation: u8, value: u8) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }
}

/// Per-key RGB animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum PerKeyRgbEffect {
    Solid = 0,
    Breathing = 1,
    ReactiveSimple = 2,
    ReactiveMultiWide = 3,
    ReactiveSplash = 4,
}

impl PerKeyRgbEffect {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Solid),
            1 => Some(Self::Breathing),
            2 => Some(Self::ReactiveSimple),
            3 => Some(Self::ReactiveMultiWide),
            4 => Some(Self::ReactiveSplash),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Solid => "Solid",
            Self::Breathing => "Breathing",
            Self::ReactiveSimple => "Reactive Simple",
            Self::ReactiveMultiWide => "Reactive Multi Wide",
            Self::ReactiveSplash => "Reactive Splash",
        }
    }
}

/// OS indicator (caps/num/scroll lock) lighting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndicatorConfig {
    pub disable_mask: u8,
    pub color: Hsv,
}

/// Mixed RGB dimensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MixedRgbInfo {
    pub layers: u8,
    pub effects_per_layer: u8,
}

/// One entry of a region's effect playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectSlot {
    pub effect_id: u8,
    pub hue: u8,
    pub saturation: u8,
    pub speed: u8,
    pub duration_ms: u32,
}

impl Default for EffectSlot {
    fn default() -> Self {
        Self {
            effect_id: 0,
            hue: 0,
            saturation: 255,
            speed: 128,
            duration_ms: 5000,
        }
    }
}

/// Wire layout of an [`EffectSlot`]
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
struct EffectSlotWire {
    effect_id: u8,
    hue: u8,
    saturation: u8,
    speed: u8,
    duration_ms: [u8; 4],
}

impl EffectSlot {
    pub const WIRE_SIZE: usize = 8;

    /// Decode from at least [`Self::WIRE_SIZE`] bytes
    pub fn from_wire(bytes: &[u8]) -> Self {
        match EffectSlotWire::read_from_prefix(bytes) {
            Ok((wire, _)) => Self {
                effect_id: wire.effect_id,
                hue: wire.hue,
                saturation: wire.saturation,
                speed: wire.speed,
                duration_ms: u32::from_le_bytes(wire.duration_ms),
            },
            Err(_) => Self::default(),
        }
    }

    pub fn to_wire(&self) -> [u8; Self::WIRE_SIZE] {
        let wire = EffectSlotWire {
            effect_id: self.effect_id,
            hue: self.hue,
            saturation: self.saturation,
            speed: self.speed,
            duration_ms: self.duration_ms.to_le_bytes(),
        };
        let mut out = [0u8; Self::WIRE_SIZE];
        out.copy_from_slice(wire.as_bytes());
        out
    }
}

/// One matrix position that has an LED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedPosition {
    pub row: u8,
    pub col: u8,
    pub led: u8,
}

/// `(row, col)` to LED index; positions without an LED are absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedMatrixMap {
    positions: Vec<LedPosition>,
}

impl LedMatrixMap {
    /// Build from per-row index lists (as returned by `GET_LED_IDX`)
    pub fn from_rows(rows: &[Vec<u8>], cols: u8) -> Self {
        let positions = rows
            .iter()
            .enumerate()
            .flat_map(|(row, leds)| {
                leds.iter()
                    .take(cols as usize)
                    .enumerate()
                    .filter(|(_, &led)| led != rgb::NO_LED)
                    .map(move |(col, &led)| LedPosition {
                        row: row as u8,
                        col: col as u8,
                        led,
                    })
            })
            .collect();
        Self { positions }
    }

    pub fn led_at(&self, row: u8, col: u8) -> Option<u8> {
        self.positions
            .iter()
            .find(|p| p.row == row && p.col == col)
            .map(|p| p.led)
    }

    /// Matrix position of an LED
    pub fn position_of(&self, led: u8) -> Option<(u8, u8)> {
        self.positions
            .iter()
            .find(|p| p.led == led)
            .map(|p| (p.row, p.col))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LedPosition> {
        self.positions.iter()
    }
}

fn rgb_frame(sub: u8) -> CommandFrame {
    CommandFrame::group(cmd::RGB_GROUP, sub)
}

impl KeychronClient {
    /// RGB sub-protocol version (no status byte; version at bytes 3-4)
    pub async fn rgb_protocol_version(&self) -> Result<u16, KeyboardError> {
        let frame = rgb_frame(rgb::GET_PROTOCOL_VER).without_status();
        let payload = self.execute(&frame, 3).await?;
        Ok(read_u16(&payload, 1))
    }

    pub async fn led_count(&self) -> Result<u8, KeyboardError> {
        let payload = self.execute(&rgb_frame(rgb::GET_LED_COUNT), 1).await?;
        Ok(payload[0])
    }

    pub async fn per_key_effect(&self) -> Result<u8, KeyboardError> {
        let payload = self.execute(&rgb_frame(rgb::PER_KEY_GET_TYPE), 1).await?;
        Ok(payload[0])
    }

    pub async fn set_per_key_effect(&self, effect: PerKeyRgbEffect) -> Result<(), KeyboardError> {
        self.command(&rgb_frame(rgb::PER_KEY_SET_TYPE).arg(effect as u8))
            .await
    }

    pub async fn indicator_config(&self) -> Result<IndicatorConfig, KeyboardError> {
        let payload = self
            .execute(&rgb_frame(rgb::GET_INDICATORS_CONFIG), 4)
            .await?;
        Ok(IndicatorConfig {
            disable_mask: payload[0],
            color: Hsv::new(payload[1], payload[2], payload[3]),
        })
    }

    pub async fn set_indicator_config(&self, config: IndicatorConfig) -> Result<(), KeyboardError> {
        let frame = rgb_frame(rgb::SET_INDICATORS_CONFIG).args(&[
            config.disable_mask,
            config.color.hue,
            config.color.saturation,
            config.color.value,
        ]);
        self.command(&frame).await
    }

    pub async fn get_led_colors(&self, start: usize, count: usize) -> Result<Vec<Hsv>, KeyboardError> {
        self.read_records(&LedColors, start, count).await
    }

    pub async fn set_led_colors(&self, start: usize, colors: &[Hsv]) -> Result<(), KeyboardError> {
        self.write_records(&LedColors, start, colors).await
    }

    /// Persist RGB settings to EEPROM
    pub async fn save_rgb(&self) -> Result<(), KeyboardError> {
        self.command(&rgb_frame(rgb::SAVE)).await
    }

    pub async fn mixed_rgb_info(&self) -> Result<MixedRgbInfo, KeyboardError> {
        let payload = self.execute(&rgb_frame(rgb::MIXED_GET_INFO), 2).await?;
        Ok(MixedRgbInfo {
            layers: payload[0],
            effects_per_layer: payload[1],
        })
    }

    pub async fn get_regions(&self, start: usize, count: usize) -> Result<Vec<u8>, KeyboardError> {
        self.read_records(&Regions, start, count).await
    }

    pub async fn set_regions(&self, start: usize, regions: &[u8]) -> Result<(), KeyboardError> {
        self.write_records(&Regions, start, regions).await
    }

    pub async fn get_region_effects(
        &self,
        region: u8,
        start: usize,
        count: usize,
    ) -> Result<Vec<EffectSlot>, KeyboardError> {
        self.read_records(&RegionEffects { region }, start, count)
            .await
    }

    pub async fn set_region_effects(
        &self,
        region: u8,
        start: usize,
        effects: &[EffectSlot],
    ) -> Result<(), KeyboardError> {
        self.write_records(&RegionEffects { region }, start, effects)
            .await
    }

    /// LED indices of the masked columns of one matrix row
    ///
    /// Returns one entry per column (up to 24); `0xFF` means no LED.
    pub async fn led_indices_for_row(
        &self,
        row: u8,
        col_mask: u32,
    ) -> Result<Vec<u8>, KeyboardError> {
        if col_mask >> rgb::MAX_COLUMNS != 0 {
            return Err(KeyboardError::InvalidParameter(format!(
                "column mask 0x{:X} exceeds {} columns",
                col_mask,
                rgb::MAX_COLUMNS
            )));
        }
        let mask = col_mask.to_le_bytes();
        let frame = rgb_frame(rgb::GET_LED_IDX)
            .arg(row)
            .args(&mask[..3])
            .arg(0);
        let payload = self.execute(&frame, rgb::MAX_COLUMNS).await?;
        Ok(payload[..rgb::MAX_COLUMNS].to_vec())
    }

    /// Query every row of the matrix for its LED indices
    pub async fn led_matrix(&self, matrix: MatrixSize) -> Result<LedMatrixMap, KeyboardError> {
        let cols = matrix.cols.min(rgb::MAX_COLUMNS as u8);
        let col_mask = (1u32 << cols) - 1;
        let mut rows = Vec::with_capacity(matrix.rows as usize);
        for row in 0..matrix.rows {
            rows.push(self.led_indices_for_row(row, col_mask).await?);
        }
        let map = LedMatrixMap::from_rows(&rows, cols);
        debug!("LED matrix: {} positions with LEDs", map.len());
        Ok(map)
    }
}
