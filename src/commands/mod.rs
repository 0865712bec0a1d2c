//! Command handlers for the CLI application.
//!
//! This module organizes command handlers by category:
//! - `query`: Read-only commands (list, info, misc, rgb, analog, etc.)
//! - `set`: Misc and RGB setting commands
//! - `triggers`: Analog commands (profiles, travel, SOCD, curve, calibration)

pub mod query;
pub mod set;
pub mod triggers;

use anyhow::{bail, Context as _};
use keychron_keyboard::{Keyboard, KeyboardConfig, MatrixSize};
use keychron_transport::{DeviceDiscovery, HidDiscovery, PacketFilter};
use serde::Serialize;
use tracing::debug;

use crate::cli::Cli;

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Connection options shared by every command
pub struct Context {
    pub device: Option<String>,
    pub monitor: Option<PacketFilter>,
    pub matrix: MatrixSize,
    pub json: bool,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            device: cli.device.clone(),
            monitor: cli.monitor.then_some(cli.filter),
            matrix: MatrixSize::new(cli.rows, cli.cols),
            json: cli.json,
        }
    }

    fn discovery(&self) -> HidDiscovery {
        HidDiscovery::new().with_monitor(self.monitor)
    }

    /// Open the device, negotiate and load its state
    pub async fn open(&self) -> anyhow::Result<Keyboard> {
        let transport = self
            .discovery()
            .open_preferred(self.device.as_deref())
            .await
            .context("Failed to open keyboard")?;
        let config = KeyboardConfig {
            matrix: self.matrix,
            ..Default::default()
        };
        let keyboard = Keyboard::connect(transport, config).await?;
        let features = keyboard.features();
        if !features.protocol_present {
            bail!("Device does not answer the Keychron protocol");
        }
        debug!(
            "Connected: protocol v{}, {} capabilities",
            features.protocol_version,
            features.iter().count()
        );
        Ok(keyboard)
    }

    /// Print `value` as JSON, or run `text` for the human-readable form
    pub fn print<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) -> CommandResult {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text(value);
        }
        Ok(())
    }
}

/// Report a writer outcome
pub fn report(accepted: bool, what: &str) -> CommandResult {
    if accepted {
        println!("{what}: OK");
        Ok(())
    } else {
        bail!("Device rejected {what}")
    }
}

/// List raw HID interfaces without opening them
pub async fn list(ctx: &Context) -> CommandResult {
    let devices = ctx.discovery().list_devices().await?;
    ctx.print(&devices, |devices| {
        if devices.is_empty() {
            println!("No Keychron raw HID interface found");
        }
        for dev in devices {
            println!("{}", dev.info);
        }
    })
}
