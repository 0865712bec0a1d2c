//! Keychron Keyboard Driver CLI
//!
//! A command-line interface for configuring Keychron keyboards over raw HID.

use clap::Parser;
use keychron_keyboard::{AnalogSocdPair, EffectSlot, Hsv, IndicatorConfig, SnapClickPair};
use tracing_subscriber::EnvFilter;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;
use commands::{query, set, triggers, Context};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let ctx = Context::from_cli(&cli);

    match cli.command {
        None | Some(Commands::Info) => query::info(&ctx).await?,

        // === Query Commands ===
        Some(Commands::List) => commands::list(&ctx).await?,
        Some(Commands::All) => query::all(&ctx).await?,
        Some(Commands::Misc) => query::misc(&ctx).await?,
        Some(Commands::SnapClick) => query::snap_click(&ctx).await?,
        Some(Commands::Rgb) => query::rgb(&ctx).await?,
        Some(Commands::LedRow { row, mask }) => query::led_row(&ctx, row, mask).await?,
        Some(Commands::Analog) => query::analog(&ctx).await?,
        Some(Commands::Key { row, col }) => query::key(&ctx, row, col).await?,
        Some(Commands::Travel {
            row,
            col,
            count,
            interval,
        }) => query::travel(&ctx, row, col, count, interval).await?,
        Some(Commands::CalibrationState) => query::calibration_state(&ctx).await?,

        // === Misc Set Commands ===
        Some(Commands::SetDebounce { algorithm, ms }) => {
            set::set_debounce(&ctx, algorithm, ms).await?
        }
        Some(Commands::SetNkro { enabled }) => set::set_nkro(&ctx, enabled).await?,
        Some(Commands::SetRate { hz }) => set::set_rate(&ctx, hz).await?,
        Some(Commands::SetSnapClick {
            index,
            kind,
            key1,
            key2,
            save,
        }) => {
            let pair = SnapClickPair { kind, key1, key2 };
            set::set_snap_click(&ctx, index, pair, save).await?
        }
        Some(Commands::SetWireless {
            backlight_off,
            idle_sleep,
        }) => set::set_wireless(&ctx, backlight_off, idle_sleep).await?,

        // === RGB Set Commands ===
        Some(Commands::SetEffect { effect }) => set::set_effect(&ctx, effect.into()).await?,
        Some(Commands::SetColor {
            index,
            hue,
            saturation,
            value,
        }) => set::set_color(&ctx, index, Hsv::new(hue, saturation, value)).await?,
        Some(Commands::Fill {
            hue,
            saturation,
            value,
        }) => set::fill(&ctx, Hsv::new(hue, saturation, value)).await?,
        Some(Commands::SetIndicators {
            mask,
            hue,
            saturation,
            value,
        }) => {
            let config = IndicatorConfig {
                disable_mask: mask,
                color: Hsv::new(hue, saturation, value),
            };
            set::set_indicators(&ctx, config).await?
        }
        Some(Commands::SetRegions { start, regions }) => {
            set::set_regions(&ctx, start, &regions).await?
        }
        Some(Commands::SetRegionEffect {
            region,
            slot,
            effect,
            hue,
            saturation,
            speed,
            duration_ms,
        }) => {
            let effect = EffectSlot {
                effect_id: effect,
                hue,
                saturation,
                speed,
                duration_ms,
            };
            set::set_region_effect(&ctx, region, slot, effect).await?
        }
        Some(Commands::SaveRgb) => set::save_rgb(&ctx).await?,

        // === Analog Set Commands ===
        Some(Commands::SelectProfile { profile }) => {
            triggers::select_profile(&ctx, profile).await?
        }
        Some(Commands::SetTravel {
            profile,
            mode,
            actuation,
            sensitivity,
            release,
            keys,
        }) => {
            triggers::set_travel(
                &ctx,
                profile,
                mode.into(),
                actuation,
                sensitivity,
                release,
                &keys,
            )
            .await?
        }
        Some(Commands::SetSocd {
            profile,
            index,
            row1,
            col1,
            row2,
            col2,
            kind,
        }) => {
            let pair = AnalogSocdPair {
                row1,
                col1,
                row2,
                col2,
                kind,
            };
            triggers::set_socd(&ctx, profile, index, pair).await?
        }
        Some(Commands::SaveProfile { profile }) => triggers::save_profile(&ctx, profile).await?,
        Some(Commands::ResetProfile { profile }) => {
            triggers::reset_profile(&ctx, profile).await?
        }
        Some(Commands::SetCurve { points }) => triggers::set_curve(&ctx, &points).await?,
        Some(Commands::SetGameMode { mode }) => triggers::set_game_mode(&ctx, mode).await?,
        Some(Commands::Calibrate { phase }) => triggers::calibrate(&ctx, phase.into()).await?,
    }

    Ok(())
}
