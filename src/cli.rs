// CLI definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use keychron_keyboard::{AnalogMode, CalibrationState, PerKeyRgbEffect};
use keychron_transport::PacketFilter;

#[derive(Parser)]
#[command(name = "kc_driver")]
#[command(author, version, about = "Keychron raw HID configuration tool")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable transport monitoring (logs all reports in hex)
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Monitor filter: "all" or a command byte such as 0xA9
    #[arg(long, global = true, default_value = "all")]
    pub filter: PacketFilter,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Key matrix rows of the connected model
    #[arg(long, global = true, default_value_t = 6)]
    pub rows: u8,

    /// Key matrix columns of the connected model
    #[arg(long, global = true, default_value_t = 21)]
    pub cols: u8,

    /// hidraw device path (default: first Keychron raw HID interface)
    #[arg(long, global = true, value_name = "PATH")]
    pub device: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // === Query Commands ===
    /// List Keychron raw HID interfaces
    #[command(visible_alias = "ls")]
    List,

    /// Show protocol versions, firmware and supported features
    #[command(visible_aliases = ["features", "f"])]
    Info,

    /// Dump the complete device state
    #[command(visible_alias = "a")]
    All,

    /// Show debounce, NKRO, report rate and wireless settings
    #[command(visible_alias = "m")]
    Misc,

    /// Show snap-click pairs
    #[command(visible_alias = "sc")]
    SnapClick,

    /// Show RGB state (effect, indicators, colors, regions)
    Rgb,

    /// Show LED indices of one matrix row
    LedRow {
        row: u8,
        /// 24-bit column mask (hex with 0x prefix or decimal)
        #[arg(default_value = "0xFFFFFF", value_parser = parse_u32)]
        mask: u32,
    },

    /// Show analog profile info, curve and the current profile
    #[command(visible_alias = "an")]
    Analog,

    /// Show effective travel settings of one key
    Key { row: u8, col: u8 },

    /// Read live key travel
    Travel {
        row: u8,
        col: u8,
        /// Number of samples
        #[arg(short, long, default_value_t = 1)]
        count: u32,
        /// Delay between samples in milliseconds
        #[arg(short, long, default_value_t = 100)]
        interval: u64,
    },

    /// Show calibration progress
    CalibrationState,

    // === Misc Set Commands ===
    /// Set debounce algorithm and time
    SetDebounce {
        /// Algorithm (0-6)
        #[arg(value_parser = clap::value_parser!(u8).range(0..7))]
        algorithm: u8,
        /// Debounce time in milliseconds
        ms: u8,
    },

    /// Enable or disable NKRO
    SetNkro {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },

    /// Set USB report rate (125-8000 Hz)
    SetRate { hz: u16 },

    /// Set one snap-click pair
    SetSnapClick {
        index: usize,
        /// Policy (0 disabled .. 5 neutral)
        kind: u8,
        key1: u8,
        key2: u8,
        /// Persist to EEPROM afterwards
        #[arg(long)]
        save: bool,
    },

    /// Set wireless backlight-off and sleep timers (seconds)
    SetWireless { backlight_off: u16, idle_sleep: u16 },

    // === RGB Set Commands ===
    /// Set per-key RGB effect
    SetEffect {
        #[arg(value_enum)]
        effect: EffectArg,
    },

    /// Set the color of one LED
    SetColor {
        index: usize,
        hue: u8,
        saturation: u8,
        value: u8,
    },

    /// Set the color of every LED
    Fill { hue: u8, saturation: u8, value: u8 },

    /// Set indicator disable mask and color
    SetIndicators {
        mask: u8,
        hue: u8,
        saturation: u8,
        value: u8,
    },

    /// Assign LEDs to a mixed-RGB region
    SetRegions {
        start: usize,
        #[arg(required = true)]
        regions: Vec<u8>,
    },

    /// Set one effect slot of a mixed-RGB region
    SetRegionEffect {
        region: u8,
        slot: usize,
        effect: u8,
        hue: u8,
        saturation: u8,
        speed: u8,
        duration_ms: u32,
    },

    /// Persist RGB settings to EEPROM
    SaveRgb,

    // === Analog Set Commands ===
    /// Make a profile current
    SelectProfile { profile: u8 },

    /// Set travel for a whole profile or for selected keys
    SetTravel {
        profile: u8,
        #[arg(value_enum)]
        mode: ModeArg,
        /// Actuation point (0.1 mm)
        actuation: u8,
        /// Rapid trigger press sensitivity
        #[arg(default_value_t = 0)]
        sensitivity: u8,
        /// Rapid trigger release sensitivity
        #[arg(default_value_t = 0)]
        release: u8,
        /// Key as ROW:COL (repeatable); whole profile when omitted
        #[arg(long = "key", value_parser = parse_position)]
        keys: Vec<(u8, u8)>,
    },

    /// Set one analog SOCD pair
    SetSocd {
        profile: u8,
        index: u8,
        row1: u8,
        col1: u8,
        row2: u8,
        col2: u8,
        /// Policy (0 disabled .. 6 neutral)
        kind: u8,
    },

    /// Persist a profile to EEPROM
    SaveProfile { profile: u8 },

    /// Reset a profile to defaults
    ResetProfile { profile: u8 },

    /// Set the four joystick curve points
    SetCurve {
        #[arg(num_args = 4, required = true)]
        points: Vec<u16>,
    },

    /// Set game controller mode
    SetGameMode { mode: u8 },

    /// Start a calibration phase
    Calibrate {
        #[arg(value_enum)]
        phase: PhaseArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EffectArg {
    Solid,
    Breathing,
    Reactive,
    ReactiveWide,
    Splash,
}

impl From<EffectArg> for PerKeyRgbEffect {
    fn from(arg: EffectArg) -> Self {
        match arg {
            EffectArg::Solid => Self::Solid,
            EffectArg::Breathing => Self::Breathing,
            EffectArg::Reactive => Self::ReactiveSimple,
            EffectArg::ReactiveWide => Self::ReactiveMultiWide,
            EffectArg::Splash => Self::ReactiveSplash,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Global,
    Regular,
    Rapid,
    Dks,
    Gamepad,
    Toggle,
}

impl From<ModeArg> for AnalogMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Global => Self::Global,
            ModeArg::Regular => Self::Regular,
            ModeArg::Rapid => Self::Rapid,
            ModeArg::Dks => Self::Dks,
            ModeArg::Gamepad => Self::Gamepad,
            ModeArg::Toggle => Self::Toggle,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PhaseArg {
    Off,
    ZeroPowerOn,
    Zero,
    Full,
    Save,
    Clear,
}

impl From<PhaseArg> for CalibrationState {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Off => Self::Off,
            PhaseArg::ZeroPowerOn => Self::ZeroTravelPowerOn,
            PhaseArg::Zero => Self::ZeroTravelManual,
            PhaseArg::Full => Self::FullTravelManual,
            PhaseArg::Save => Self::SaveAndExit,
            PhaseArg::Clear => Self::Clear,
        }
    }
}

fn parse_u32(s: &str) -> Result<u32, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).map_err(|e| e.to_string()),
        None => s.parse().map_err(|e: std::num::ParseIntError| e.to_string()),
    }
}

fn parse_position(s: &str) -> Result<(u8, u8), String> {
    let (row, col) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ROW:COL, got '{s}'"))?;
    let row = row.trim().parse().map_err(|_| format!("bad row '{row}'"))?;
    let col = col.trim().parse().map_err(|_| format!("bad column '{col}'"))?;
    Ok((row, col))
}
