//! Protocol constants and utilities for Keychron keyboard communication

/// Raw HID report size (payload, excluding report ID)
pub const REPORT_SIZE: usize = 32;

/// Report ID prepended on write (raw HID uses the unnumbered report)
pub const REPORT_ID: u8 = 0x00;

/// Top-level command bytes (`data[0]`)
pub mod cmd {
    pub const GET_PROTOCOL_VERSION: u8 = 0xA0;
    pub const GET_FIRMWARE_VERSION: u8 = 0xA1;
    pub const GET_SUPPORT_FEATURE: u8 = 0xA2;
    pub const GET_DEFAULT_LAYER: u8 = 0xA3;
    /// Misc command group (debounce, NKRO, report rate, snap click, wireless)
    pub const MISC_GROUP: u8 = 0xA7;
    /// Per-key / mixed RGB command group
    pub const RGB_GROUP: u8 = 0xA8;
    /// Analog matrix (Hall Effect) command group
    pub const ANALOG_GROUP: u8 = 0xA9;
    pub const WIRELESS_DFU: u8 = 0xAA;
    pub const FACTORY_TEST: u8 = 0xAB;

    /// Leading response byte for "command not recognized"
    pub const UNSUPPORTED: u8 = 0xFF;

    /// Response status byte values
    pub const STATUS_SUCCESS: u8 = 0x00;
    pub const STATUS_FAIL: u8 = 0x01;

    /// Check whether a command byte selects a sub-command group
    pub fn is_group(cmd: u8) -> bool {
        matches!(cmd, MISC_GROUP | RGB_GROUP | ANALOG_GROUP)
    }

    /// Get human-readable name for command byte
    pub fn name(cmd: u8) -> &'static str {
        match cmd {
            GET_PROTOCOL_VERSION => "GET_PROTOCOL_VERSION",
            GET_FIRMWARE_VERSION => "GET_FIRMWARE_VERSION",
            GET_SUPPORT_FEATURE => "GET_SUPPORT_FEATURE",
            GET_DEFAULT_LAYER => "GET_DEFAULT_LAYER",
            MISC_GROUP => "MISC",
            RGB_GROUP => "RGB",
            ANALOG_GROUP => "ANALOG",
            WIRELESS_DFU => "WIRELESS_DFU",
            FACTORY_TEST => "FACTORY_TEST",
            UNSUPPORTED => "UNSUPPORTED",
            _ => "UNKNOWN",
        }
    }
}

/// Misc group sub-commands (`data[1]` when `data[0] == MISC_GROUP`)
pub mod misc {
    pub const GET_PROTOCOL_VER: u8 = 0x01;
    pub const DFU_INFO_GET: u8 = 0x02;
    pub const LANGUAGE_GET: u8 = 0x03;
    pub const LANGUAGE_SET: u8 = 0x04;
    pub const DEBOUNCE_GET: u8 = 0x05;
    pub const DEBOUNCE_SET: u8 = 0x06;
    pub const SNAP_CLICK_GET_INFO: u8 = 0x07;
    pub const SNAP_CLICK_GET: u8 = 0x08;
    pub const SNAP_CLICK_SET: u8 = 0x09;
    pub const SNAP_CLICK_SAVE: u8 = 0x0A;
    pub const WIRELESS_LPM_GET: u8 = 0x0B;
    pub const WIRELESS_LPM_SET: u8 = 0x0C;
    pub const REPORT_RATE_GET: u8 = 0x0D;
    pub const REPORT_RATE_SET: u8 = 0x0E;
    pub const DIP_SWITCH_GET: u8 = 0x0F;
    pub const DIP_SWITCH_SET: u8 = 0x10;
    pub const FACTORY_RESET: u8 = 0x11;
    pub const NKRO_GET: u8 = 0x12;
    pub const NKRO_SET: u8 = 0x13;

    /// Get human-readable name for misc sub-command
    pub fn name(sub: u8) -> &'static str {
        match sub {
            GET_PROTOCOL_VER => "GET_PROTOCOL_VER",
            DFU_INFO_GET => "DFU_INFO_GET",
            LANGUAGE_GET => "LANGUAGE_GET",
            LANGUAGE_SET => "LANGUAGE_SET",
            DEBOUNCE_GET => "DEBOUNCE_GET",
            DEBOUNCE_SET => "DEBOUNCE_SET",
            SNAP_CLICK_GET_INFO => "SNAP_CLICK_GET_INFO",
            SNAP_CLICK_GET => "SNAP_CLICK_GET",
            SNAP_CLICK_SET => "SNAP_CLICK_SET",
            SNAP_CLICK_SAVE => "SNAP_CLICK_SAVE",
            WIRELESS_LPM_GET => "WIRELESS_LPM_GET",
            WIRELESS_LPM_SET => "WIRELESS_LPM_SET",
            REPORT_RATE_GET => "REPORT_RATE_GET",
            REPORT_RATE_SET => "REPORT_RATE_SET",
            DIP_SWITCH_GET => "DIP_SWITCH_GET",
            DIP_SWITCH_SET => "DIP_SWITCH_SET",
            FACTORY_RESET => "FACTORY_RESET",
            NKRO_GET => "NKRO_GET",
            NKRO_SET => "NKRO_SET",
            _ => "UNKNOWN",
        }
    }
}

/// RGB group sub-commands (`data[1]` when `data[0] == RGB_GROUP`)
pub mod rgb {
    pub const GET_PROTOCOL_VER: u8 = 0x01;
    pub const SAVE: u8 = 0x02;
    pub const GET_INDICATORS_CONFIG: u8 = 0x03;
    pub const SET_INDICATORS_CONFIG: u8 = 0x04;
    pub const GET_LED_COUNT: u8 = 0x05;
    pub const GET_LED_IDX: u8 = 0x06;
    pub const PER_KEY_GET_TYPE: u8 = 0x07;
    pub const PER_KEY_SET_TYPE: u8 = 0x08;
    pub const PER_KEY_GET_COLOR: u8 = 0x09;
    pub const PER_KEY_SET_COLOR: u8 = 0x0A;
    pub const MIXED_GET_INFO: u8 = 0x0B;
    pub const MIXED_GET_REGIONS: u8 = 0x0C;
    pub const MIXED_SET_REGIONS: u8 = 0x0D;
    pub const MIXED_GET_EFFECT_LIST: u8 = 0x0E;
    pub const MIXED_SET_EFFECT_LIST: u8 = 0x0F;

    /// Columns covered by one GET_LED_IDX row query (24-bit column mask)
    pub const MAX_COLUMNS: usize = 24;
    /// LED index value meaning "no LED at this position"
    pub const NO_LED: u8 = 0xFF;

    /// Get human-readable name for RGB sub-command
    pub fn name(sub: u8) -> &'static str {
        match sub {
            GET_PROTOCOL_VER => "GET_PROTOCOL_VER",
            SAVE => "SAVE",
            GET_INDICATORS_CONFIG => "GET_INDICATORS_CONFIG",
            SET_INDICATORS_CONFIG => "SET_INDICATORS_CONFIG",
            GET_LED_COUNT => "GET_LED_COUNT",
            GET_LED_IDX => "GET_LED_IDX",
            PER_KEY_GET_TYPE => "PER_KEY_GET_TYPE",
            PER_KEY_SET_TYPE => "PER_KEY_SET_TYPE",
            PER_KEY_GET_COLOR => "PER_KEY_GET_COLOR",
            PER_KEY_SET_COLOR => "PER_KEY_SET_COLOR",
            MIXED_GET_INFO => "MIXED_GET_INFO",
            MIXED_GET_REGIONS => "MIXED_GET_REGIONS",
            MIXED_SET_REGIONS => "MIXED_SET_REGIONS",
            MIXED_GET_EFFECT_LIST => "MIXED_GET_EFFECT_LIST",
            MIXED_SET_EFFECT_LIST => "MIXED_SET_EFFECT_LIST",
            _ => "UNKNOWN",
        }
    }
}

/// Analog matrix sub-commands (`data[1]` when `data[0] == ANALOG_GROUP`)
pub mod analog {
    pub const GET_VERSION: u8 = 0x01;
    pub const GET_PROFILES_INFO: u8 = 0x10;
    pub const SELECT_PROFILE: u8 = 0x11;
    pub const GET_PROFILE_RAW: u8 = 0x12;
    pub const SET_PROFILE_NAME: u8 = 0x13;
    pub const SET_TRAVEL: u8 = 0x14;
    pub const SET_ADVANCE_MODE: u8 = 0x15;
    pub const SET_SOCD: u8 = 0x16;
    pub const RESET_PROFILE: u8 = 0x1E;
    pub const SAVE_PROFILE: u8 = 0x1F;
    pub const GET_CURVE: u8 = 0x20;
    pub const SET_CURVE: u8 = 0x21;
    pub const GET_GAME_CONTROLLER_MODE: u8 = 0x22;
    pub const SET_GAME_CONTROLLER_MODE: u8 = 0x23;
    pub const GET_REALTIME_TRAVEL: u8 = 0x30;
    pub const CALIBRATE: u8 = 0x40;
    pub const GET_CALIBRATE_STATE: u8 = 0x41;
    pub const GET_CALIBRATED_VALUE: u8 = 0x42;

    /// Size of one packed per-key travel record
    pub const KEY_CONFIG_SIZE: usize = 4;
    /// Size of one OKMC (dynamic keystroke) record in the raw profile
    pub const OKMC_RECORD_SIZE: usize = 20;
    /// Size of one SOCD pair record in the raw profile
    pub const SOCD_RECORD_SIZE: usize = 5;
    /// Number of joystick curve points
    pub const CURVE_POINTS: usize = 4;

    /// Get human-readable name for analog sub-command
    pub fn name(sub: u8) -> &'static str {
        match sub {
            GET_VERSION => "GET_VERSION",
            GET_PROFILES_INFO => "GET_PROFILES_INFO",
            SELECT_PROFILE => "SELECT_PROFILE",
            GET_PROFILE_RAW => "GET_PROFILE_RAW",
            SET_PROFILE_NAME => "SET_PROFILE_NAME",
            SET_TRAVEL => "SET_TRAVEL",
            SET_ADVANCE_MODE => "SET_ADVANCE_MODE",
            SET_SOCD => "SET_SOCD",
            RESET_PROFILE => "RESET_PROFILE",
            SAVE_PROFILE => "SAVE_PROFILE",
            GET_CURVE => "GET_CURVE",
            SET_CURVE => "SET_CURVE",
            GET_GAME_CONTROLLER_MODE => "GET_GAME_CONTROLLER_MODE",
            SET_GAME_CONTROLLER_MODE => "SET_GAME_CONTROLLER_MODE",
            GET_REALTIME_TRAVEL => "GET_REALTIME_TRAVEL",
            CALIBRATE => "CALIBRATE",
            GET_CALIBRATE_STATE => "GET_CALIBRATE_STATE",
            GET_CALIBRATED_VALUE => "GET_CALIBRATED_VALUE",
            _ => "UNKNOWN",
        }
    }
}

/// Primary feature mask bits (bytes 2-3 of GET_SUPPORT_FEATURE)
pub mod feature {
    pub const DEFAULT_LAYER: u16 = 0x0001;
    pub const BLUETOOTH: u16 = 0x0002;
    pub const P24G: u16 = 0x0004;
    pub const ANALOG_MATRIX: u16 = 0x0008;
    pub const STATE_NOTIFY: u16 = 0x0010;
    pub const DYNAMIC_DEBOUNCE: u16 = 0x0020;
    pub const SNAP_CLICK: u16 = 0x0040;
    pub const KEYCHRON_RGB: u16 = 0x0080;
    pub const QUICK_START: u16 = 0x0100;
    pub const NKRO: u16 = 0x0200;
}

/// Misc feature mask bits (bytes 5-6 of MISC GET_PROTOCOL_VER)
pub mod misc_feature {
    pub const DFU_INFO: u16 = 0x0001;
    pub const LANGUAGE: u16 = 0x0002;
    pub const DEBOUNCE: u16 = 0x0004;
    pub const SNAP_CLICK: u16 = 0x0008;
    pub const WIRELESS_LPM: u16 = 0x0010;
    pub const REPORT_RATE: u16 = 0x0020;
    pub const QUICK_START: u16 = 0x0040;
    pub const NKRO: u16 = 0x0080;
}

/// Communication timing constants
pub mod timing {
    /// Number of attempts for query operations
    pub const QUERY_RETRIES: usize = 3;
    /// Attempts for latency-sensitive single-shot reads (live travel)
    pub const REALTIME_RETRIES: usize = 1;
    /// Time to wait for one response report (ms)
    pub const READ_TIMEOUT_MS: u32 = 500;
}

/// Device identification constants
pub mod device {
    /// Keychron vendor ID
    pub const VENDOR_ID: u16 = 0x3434;
    /// Raw HID usage page (QMK/VIA convention)
    pub const USAGE_PAGE: u16 = 0xFF60;
    /// Raw HID usage
    pub const USAGE: u16 = 0x61;

    /// Known 2.4GHz receiver PIDs (Keychron Link)
    pub const RECEIVER_PIDS: &[u16] = &[0xD030, 0xD031];

    /// Check if a PID indicates a wireless receiver
    pub fn is_receiver_pid(pid: u16) -> bool {
        RECEIVER_PIDS.contains(&pid)
    }
}

/// Get a `GROUP/SUB` style name for logging
pub fn command_name(cmd: u8, sub: Option<u8>) -> String {
    match (cmd, sub) {
        (cmd::MISC_GROUP, Some(s)) => format!("MISC/{}", misc::name(s)),
        (cmd::RGB_GROUP, Some(s)) => format!("RGB/{}", rgb::name(s)),
        (cmd::ANALOG_GROUP, Some(s)) => format!("ANALOG/{}", analog::name(s)),
        (c, _) => cmd::name(c).to_string(),
    }
}

/// Build a zero-padded report buffer
///
/// Format: `[cmd] [sub?] [payload...] [0...]`, [`REPORT_SIZE`] bytes.
/// Payload beyond the report size is truncated.
pub fn build_report(cmd: u8, sub: Option<u8>, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; REPORT_SIZE];
    buf[0] = cmd;
    let mut offset = 1;
    if let Some(sub) = sub {
        buf[1] = sub;
        offset = 2;
    }
    let len = std::cmp::min(payload.len(), REPORT_SIZE - offset);
    buf[offset..offset + len].copy_from_slice(&payload[..len]);
    buf
}
