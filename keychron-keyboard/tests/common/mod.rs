//! Stateful keyboard simulator behind `ScriptedTransport`
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use keychron_keyboard::{Keyboard, KeyboardConfig, MatrixSize};
use keychron_transport::mock::ScriptedTransport;
use keychron_transport::protocol::{analog, cmd, feature, misc, misc_feature, rgb};
use parking_lot::Mutex;

pub const ROWS: u8 = 2;
pub const COLS: u8 = 4;
pub const LED_COUNT: usize = 20;
pub const SNAP_CLICK_COUNT: usize = 12;
pub const OKMC_COUNT: u8 = 1;
pub const SOCD_COUNT: u8 = 2;

/// Byte offset of the SOCD section in a simulated profile
pub fn socd_offset() -> usize {
    4 + ROWS as usize * COLS as usize * 4 + OKMC_COUNT as usize * analog::OKMC_RECORD_SIZE
}

/// Profile 0: global act 20 / sens 5 / release 4, key (1,2) act 33 / sens 3
fn profile_bytes(name: &str) -> Vec<u8> {
    let mut bytes = vec![0x50, 0x05, 0x01, 0x00];
    for i in 0..(ROWS as usize * COLS as usize) {
        if i == COLS as usize + 2 {
            bytes.extend_from_slice(&[0x84, 0x03, 0x00, 0x00]);
        } else {
            bytes.extend_from_slice(&[0, 0, 0, 0]);
        }
    }
    bytes.extend(std::iter::repeat(0xEE).take(OKMC_COUNT as usize * analog::OKMC_RECORD_SIZE));
    bytes.extend_from_slice(&[0, 0, 0, 1, 3]);
    bytes.extend_from_slice(&[0; 5]);
    bytes.extend_from_slice(name.as_bytes());
    bytes.push(0);
    bytes.resize(96, 0);
    bytes
}

#[derive(Debug, Clone)]
pub struct FakeKeyboard {
    /// Never answer anything
    pub silent: bool,
    /// Top-level commands ignored (no response)
    pub muted: HashSet<u8>,
    /// Top-level commands answered with the 0xFF sentinel
    pub unsupported: HashSet<u8>,
    /// Grouped commands answered with status 1
    pub rejected: HashSet<(u8, u8)>,
    /// Reject only the n-th (0-based) request of a grouped command
    pub reject_nth: Option<((u8, u8), usize)>,
    /// Requests seen per grouped command
    pub calls: HashMap<(u8, u8), usize>,

    pub protocol_version: u8,
    pub primary_mask: u16,
    pub misc_mask: u16,
    pub misc_version: u16,
    pub firmware: String,

    pub debounce: (u8, u8),
    pub nkro_flags: u8,
    pub report_rate: (u8, u8),
    pub snap_clicks: Vec<[u8; 3]>,
    pub wireless: (u16, u16),

    pub rgb_version: u16,
    pub per_key_effect: u8,
    pub indicators: [u8; 4],
    pub colors: Vec<[u8; 3]>,
    pub layers: u8,
    pub effects_per_layer: u8,
    pub regions: Vec<u8>,
    pub effects: Vec<Vec<[u8; 8]>>,
    /// LED index per (row, col)
    pub led_rows: Vec<Vec<u8>>,

    pub analog_version: u32,
    pub current_profile: u8,
    pub profiles: Vec<Vec<u8>>,
    pub curve: [u16; 4],
    pub game_controller_mode: u8,
    pub calibration: u8,
    pub last_travel: Option<Vec<u8>>,
}

impl FakeKeyboard {
    /// Every feature group present
    pub fn full() -> Self {
        Self {
            silent: false,
            muted: HashSet::new(),
            unsupported: HashSet::new(),
            rejected: HashSet::new(),
            reject_nth: None,
            calls: HashMap::new(),

            protocol_version: 2,
            primary_mask: feature::DEFAULT_LAYER
                | feature::P24G
                | feature::ANALOG_MATRIX
                | feature::DYNAMIC_DEBOUNCE
                | feature::SNAP_CLICK
                | feature::KEYCHRON_RGB
                | feature::NKRO,
            misc_mask: misc_feature::DEBOUNCE
                | misc_feature::SNAP_CLICK
                | misc_feature::REPORT_RATE
                | misc_feature::NKRO,
            misc_version: 3,
            firmware: "v1.2.0".into(),

            debounce: (4, 8),
            nkro_flags: 0b011,
            report_rate: (1, 0x3F),
            snap_clicks: (0..SNAP_CLICK_COUNT as u8).map(|i| [1, i, i + 1]).collect(),
            wireless: (60, 900),

            rgb_version: 0x0102,
            per_key_effect: 1,
            indicators: [0x02, 10, 255, 128],
            colors: (0..LED_COUNT as u8).map(|i| [i, 255, 200]).collect(),
            layers: 2,
            effects_per_layer: 4,
            regions: (0..LED_COUNT as u8).map(|i| i % 2).collect(),
            effects: (0..2u8)
                .map(|r| (0..4u8).map(|s| [s + 1, r, 255, 128, 0x88, 0x13, 0, 0]).collect())
                .collect(),
            led_rows: vec![vec![0, 1, 2, 3], vec![4, rgb::NO_LED, 5, 6]],

            analog_version: 0x0001_0003,
            current_profile: 0,
            profiles: vec![profile_bytes("Main"), profile_bytes("Alt")],
            curve: [100, 1200, 2600, 3900],
            game_controller_mode: 0,
            calibration: 0,
            last_travel: None,
        }
    }

    /// Answers the version query but advertises nothing
    pub fn bare() -> Self {
        Self {
            primary_mask: 0,
            misc_mask: 0,
            ..Self::full()
        }
    }

    pub fn profile_size(&self) -> u16 {
        self.profiles.first().map_or(0, Vec::len) as u16
    }

    /// Answer one request
    pub fn handle(&mut self, req: &[u8]) -> Option<Vec<u8>> {
        let (c, s) = (req[0], req[1]);
        if self.silent || self.muted.contains(&c) {
            return None;
        }
        if self.unsupported.contains(&c) {
            return Some(vec![cmd::UNSUPPORTED]);
        }
        match c {
            cmd::GET_PROTOCOL_VERSION => Some(vec![c, self.protocol_version]),
            cmd::GET_SUPPORT_FEATURE => {
                let mask = self.primary_mask.to_le_bytes();
                Some(vec![c, 0, mask[0], mask[1]])
            }
            cmd::GET_FIRMWARE_VERSION => {
                let mut resp = vec![c];
                resp.extend_from_slice(self.firmware.as_bytes());
                resp.push(0);
                Some(resp)
            }
            cmd::MISC_GROUP | cmd::RGB_GROUP | cmd::ANALOG_GROUP => {
                let n = self.calls.entry((c, s)).or_insert(0);
                let nth = *n;
                *n += 1;
                if self.rejected.contains(&(c, s)) || self.reject_nth == Some(((c, s), nth)) {
                    return Some(vec![c, s, cmd::STATUS_FAIL]);
                }
                let args = &req[2..];
                let body = match c {
                    cmd::MISC_GROUP => self.misc(s, args),
                    cmd::RGB_GROUP => self.rgb(s, args),
                    _ => self.analog(s, args),
                };
                match body {
                    Some(body) => {
                        let mut resp = vec![c, s];
                        resp.extend_from_slice(&body);
                        Some(resp)
                    }
                    None => Some(vec![cmd::UNSUPPORTED]),
                }
            }
            _ => Some(vec![cmd::UNSUPPORTED]),
        }
    }

    fn misc(&mut self, sub: u8, args: &[u8]) -> Option<Vec<u8>> {
        let (start, count) = (args[0] as usize, args[1] as usize);
        match sub {
            misc::GET_PROTOCOL_VER => {
                let v = self.misc_version.to_le_bytes();
                let m = self.misc_mask.to_le_bytes();
                ok(&[v[0], v[1], m[0], m[1]])
            }
            misc::DEBOUNCE_GET => ok(&[0, self.debounce.0, self.debounce.1]),
            misc::DEBOUNCE_SET => {
                self.debounce = (args[0], args[1]);
                ok(&[])
            }
            misc::NKRO_GET => ok(&[self.nkro_flags]),
            misc::NKRO_SET => {
                self.nkro_flags = (self.nkro_flags & !1) | (args[0] & 1);
                ok(&[])
            }
            misc::REPORT_RATE_GET => ok(&[self.report_rate.0, self.report_rate.1]),
            misc::REPORT_RATE_SET => {
                self.report_rate.0 = args[0];
                ok(&[])
            }
            misc::SNAP_CLICK_GET_INFO => ok(&[self.snap_clicks.len() as u8]),
            misc::SNAP_CLICK_GET => ok(&read_list(&self.snap_clicks, start, count).concat()),
            misc::SNAP_CLICK_SET => {
                write_list(&mut self.snap_clicks, start, &args[2..2 + count * 3]);
                ok(&[])
            }
            misc::SNAP_CLICK_SAVE => ok(&[]),
            misc::WIRELESS_LPM_GET => {
                let mut body = self.wireless.0.to_le_bytes().to_vec();
                body.extend_from_slice(&self.wireless.1.to_le_bytes());
                ok(&body)
            }
            misc::WIRELESS_LPM_SET => {
                self.wireless = (
                    u16::from_le_bytes([args[0], args[1]]),
                    u16::from_le_bytes([args[2], args[3]]),
                );
                ok(&[])
            }
            _ => None,
        }
    }

    fn rgb(&mut self, sub: u8, args: &[u8]) -> Option<Vec<u8>> {
        let (start, count) = (args[0] as usize, args[1] as usize);
        match sub {
            rgb::GET_PROTOCOL_VER => {
                let v = self.rgb_version.to_le_bytes();
                ok(&[v[0], v[1]])
            }
            rgb::SAVE => ok(&[]),
            rgb::GET_LED_COUNT => ok(&[self.colors.len() as u8]),
            rgb::PER_KEY_GET_TYPE => ok(&[self.per_key_effect]),
            rgb::PER_KEY_SET_TYPE => {
                self.per_key_effect = args[0];
                ok(&[])
            }
            rgb::GET_INDICATORS_CONFIG => ok(&self.indicators),
            rgb::SET_INDICATORS_CONFIG => {
                self.indicators.copy_from_slice(&args[..4]);
                ok(&[])
            }
            rgb::PER_KEY_GET_COLOR => ok(&read_list(&self.colors, start, count).concat()),
            rgb::PER_KEY_SET_COLOR => {
                write_list(&mut self.colors, start, &args[2..2 + count * 3]);
                ok(&[])
            }
            rgb::MIXED_GET_INFO => ok(&[self.layers, self.effects_per_layer]),
            rgb::MIXED_GET_REGIONS => {
                let regions: Vec<[u8; 1]> = self.regions.iter().map(|&r| [r]).collect();
                ok(&read_list(&regions, start, count).concat())
            }
            rgb::MIXED_SET_REGIONS => {
                let end = start + count;
                if self.regions.len() < end {
                    self.regions.resize(end, 0);
                }
                self.regions[start..end].copy_from_slice(&args[2..2 + count]);
                ok(&[])
            }
            rgb::MIXED_GET_EFFECT_LIST => {
                let (region, start, count) = (args[0] as usize, args[1] as usize, args[2] as usize);
                let slots = self.effects.get(region)?;
                ok(&read_list(slots, start, count).concat())
            }
            rgb::MIXED_SET_EFFECT_LIST => {
                let (region, start, count) = (args[0] as usize, args[1] as usize, args[2] as usize);
                let slots = self.effects.get_mut(region)?;
                write_list(slots, start, &args[3..3 + count * 8]);
                ok(&[])
            }
            rgb::GET_LED_IDX => {
                let row = args[0] as usize;
                let mask = u32::from_le_bytes([args[1], args[2], args[3], 0]);
                let leds: Vec<u8> = (0..rgb::MAX_COLUMNS)
                    .map(|col| {
                        let led = self.led_rows.get(row).and_then(|r| r.get(col));
                        match led {
                            Some(&led) if mask & (1 << col) != 0 => led,
                            _ => rgb::NO_LED,
                        }
                    })
                    .collect();
                ok(&leds)
            }
            _ => None,
        }
    }

    fn analog(&mut self, sub: u8, args: &[u8]) -> Option<Vec<u8>> {
        match sub {
            analog::GET_VERSION => Some(self.analog_version.to_le_bytes().to_vec()),
            analog::GET_PROFILES_INFO => {
                let size = self.profile_size().to_le_bytes();
                Some(vec![
                    self.current_profile,
                    self.profiles.len() as u8,
                    size[0],
                    size[1],
                    OKMC_COUNT,
                    SOCD_COUNT,
                ])
            }
            analog::SELECT_PROFILE => {
                if args[0] as usize >= self.profiles.len() {
                    return fail();
                }
                self.current_profile = args[0];
                ok(&[])
            }
            analog::GET_PROFILE_RAW => {
                let profile = self.profiles.get(args[0] as usize)?;
                let offset = u16::from_le_bytes([args[1], args[2]]) as usize;
                let count = args[3] as usize;
                let mut chunk: Vec<u8> = profile.iter().skip(offset).take(count).copied().collect();
                chunk.resize(count, 0);
                ok(&chunk)
            }
            analog::SET_TRAVEL => {
                self.last_travel = Some(args.to_vec());
                ok(&[])
            }
            analog::SET_SOCD => {
                let profile = self.profiles.get_mut(args[0] as usize)?;
                let at = socd_offset() + args[5] as usize * analog::SOCD_RECORD_SIZE;
                profile[at..at + 4].copy_from_slice(&args[1..5]);
                profile[at + 4] = args[6];
                ok(&[])
            }
            analog::RESET_PROFILE => {
                let profile = self.profiles.get_mut(args[0] as usize)?;
                *profile = profile_bytes("");
                ok(&[])
            }
            analog::SAVE_PROFILE => ok(&[]),
            analog::GET_CURVE => {
                let body: Vec<u8> = self.curve.iter().flat_map(|p| p.to_le_bytes()).collect();
                ok(&body)
            }
            analog::SET_CURVE => {
                for (i, point) in self.curve.iter_mut().enumerate() {
                    *point = u16::from_le_bytes([args[i * 2], args[i * 2 + 1]]);
                }
                ok(&[])
            }
            analog::GET_GAME_CONTROLLER_MODE => ok(&[self.game_controller_mode]),
            analog::SET_GAME_CONTROLLER_MODE => {
                self.game_controller_mode = args[0];
                ok(&[])
            }
            analog::GET_REALTIME_TRAVEL => {
                let mut body = vec![args[0], args[1], 15, 40];
                body.extend_from_slice(&1200u16.to_le_bytes());
                body.extend_from_slice(&100u16.to_le_bytes());
                body.extend_from_slice(&3000u16.to_le_bytes());
                body.push(1);
                ok(&body)
            }
            analog::CALIBRATE => {
                self.calibration = args[0];
                ok(&[])
            }
            analog::GET_CALIBRATE_STATE => ok(&[self.calibration]),
            _ => None,
        }
    }
}

fn ok(body: &[u8]) -> Option<Vec<u8>> {
    let mut resp = vec![cmd::STATUS_SUCCESS];
    resp.extend_from_slice(body);
    Some(resp)
}

fn fail() -> Option<Vec<u8>> {
    Some(vec![cmd::STATUS_FAIL])
}

fn read_list<const N: usize>(list: &[[u8; N]], start: usize, count: usize) -> Vec<[u8; N]> {
    (start..start + count)
        .map(|i| list.get(i).copied().unwrap_or([0; N]))
        .collect()
}

fn write_list<const N: usize>(list: &mut Vec<[u8; N]>, start: usize, bytes: &[u8]) {
    for (i, chunk) in bytes.chunks_exact(N).enumerate() {
        let record: [u8; N] = chunk.try_into().unwrap();
        match list.get_mut(start + i) {
            Some(slot) => *slot = record,
            None => list.push(record),
        }
    }
}

/// Wrap a simulator in a scripted transport
pub fn scripted(device: FakeKeyboard) -> (Arc<ScriptedTransport>, Arc<Mutex<FakeKeyboard>>) {
    let state = Arc::new(Mutex::new(device));
    let handler_state = Arc::clone(&state);
    let transport = Arc::new(ScriptedTransport::new(move |req| {
        handler_state.lock().handle(req)
    }));
    (transport, state)
}

pub fn config() -> KeyboardConfig {
    KeyboardConfig {
        matrix: MatrixSize::new(ROWS, COLS),
        ..Default::default()
    }
}

/// Connect to a simulator; panics on connection failure
pub async fn connect(
    device: FakeKeyboard,
) -> (Keyboard, Arc<ScriptedTransport>, Arc<Mutex<FakeKeyboard>>) {
    let (transport, state) = scripted(device);
    let keyboard = Keyboard::connect(transport.clone(), config())
        .await
        .expect("connect to simulator");
    (keyboard, transport, state)
}
