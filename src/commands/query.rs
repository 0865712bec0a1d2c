//! Query (read-only) command handlers.

use std::time::Duration;

use keychron_keyboard::{AnalogMode, DebounceAlgorithm, PerKeyRgbEffect, SnapClickType, Transport};

use super::{CommandResult, Context};

/// Show negotiated protocol info and capabilities
pub async fn info(ctx: &Context) -> CommandResult {
    let keyboard = ctx.open().await?;
    let info = keyboard.client().transport().device_info().clone();
    ctx.print(keyboard.features(), |features| {
        println!("Device:    {info}");
        println!(
            "Firmware:  {}",
            features.firmware_version.as_deref().unwrap_or("unknown")
        );
        println!("Protocol:  v{}", features.protocol_version);
        println!("Misc:      v{}", features.misc_protocol_version);
        println!(
            "Masks:     primary=0x{:04X} misc=0x{:04X}",
            features.mask.primary, features.mask.misc
        );
        println!("Features:");
        for cap in features.iter() {
            println!("  - {cap}");
        }
    })
}

/// Dump the complete state mirror
pub async fn all(ctx: &Context) -> CommandResult {
    let keyboard = ctx.open().await?;
    ctx.print(keyboard.state(), |state| println!("{state:#?}"))
}

/// Show misc group settings
pub async fn misc(ctx: &Context) -> CommandResult {
    let keyboard = ctx.open().await?;
    ctx.print(&keyboard.state().misc, |misc| {
        let algorithm = misc
            .debounce
            .algorithm()
            .map_or("unknown", |a: DebounceAlgorithm| a.name());
        println!(
            "Debounce:     {} ms ({}, {})",
            misc.debounce.time_ms, algorithm, misc.debounce.algorithm_raw
        );
        println!(
            "NKRO:         {} (supported: {}, adaptive: {})",
            if misc.nkro.enabled { "on" } else { "off" },
            misc.nkro.supported,
            misc.nkro.adaptive
        );
        match misc.report_rate.rate() {
            Some(rate) => println!("Report rate:  {} Hz", rate.hz()),
            None => println!("Report rate:  unknown ({})", misc.report_rate.rate_raw),
        }
        println!(
            "Wireless:     backlight off {} s, sleep {} s",
            misc.wireless_power.backlight_off_secs, misc.wireless_power.idle_sleep_secs
        );
    })
}

/// Show snap-click pairs
pub async fn snap_click(ctx: &Context) -> CommandResult {
    let keyboard = ctx.open().await?;
    ctx.print(&keyboard.state().misc.snap_clicks, |pairs| {
        println!("Snap click pairs: {}", pairs.len());
        for (i, pair) in pairs.iter().enumerate() {
            let kind = SnapClickType::from_u8(pair.kind)
                .map(|k| format!("{k:?}"))
                .unwrap_or_else(|| format!("type {}", pair.kind));
            println!(
                "  {i:2}: {kind:<10} 0x{:02X} / 0x{:02X}",
                pair.key1, pair.key2
            );
        }
    })
}

/// Show RGB state
pub async fn rgb(ctx: &Context) -> CommandResult {
    let keyboard = ctx.open().await?;
    ctx.print(&keyboard.state().rgb, |rgb| {
        let effect = PerKeyRgbEffect::from_u8(rgb.per_key_effect).map_or("unknown", |e| e.name());
        println!("RGB protocol: v{:04X}", rgb.protocol_version);
        println!("LEDs:         {}", rgb.led_count);
        println!("Effect:       {effect}");
        println!(
            "Indicators:   mask 0x{:02X} HSV({}, {}, {})",
            rgb.indicators.disable_mask,
            rgb.indicators.color.hue,
            rgb.indicators.color.saturation,
            rgb.indicators.color.value
        );
        for (i, color) in rgb.colors.iter().enumerate() {
            let region = rgb.regions.get(i).copied().unwrap_or(0);
            let position = rgb
                .led_matrix
                .position_of(i as u8)
                .map(|(r, c)| format!("{r},{c}"))
                .unwrap_or_else(|| "-".into());
            println!(
                "  LED {i:3} @ {position:>5}: HSV({:3}, {:3}, {:3}) region {region}",
                color.hue, color.saturation, color.value
            );
        }
        for (region, slots) in rgb.effects.iter().enumerate() {
            println!("Region {region}:");
            for (slot, effect) in slots.iter().enumerate() {
                println!(
                    "  {slot}: effect {} hue {} sat {} speed {} for {} ms",
                    effect.effect_id, effect.hue, effect.saturation, effect.speed, effect.duration_ms
                );
            }
        }
    })
}

/// Show LED indices of one matrix row
pub async fn led_row(ctx: &Context, row: u8, mask: u32) -> CommandResult {
    let keyboard = ctx.open().await?;
    match keyboard.led_indices_for_row(row, mask).await? {
        Some(leds) => ctx.print(&leds, |leds| {
            for (col, led) in leds.iter().enumerate() {
                if mask & (1 << col) == 0 {
                    continue;
                }
                match *led {
                    0xFF => println!("  {row},{col}: -"),
                    led => println!("  {row},{col}: {led}"),
                }
            }
        }),
        None => anyhow::bail!("Device rejected LED index query"),
    }
}

/// Show analog settings and the current profile
pub async fn analog(ctx: &Context) -> CommandResult {
    let keyboard = ctx.open().await?;
    ctx.print(&keyboard.state().analog, |analog| {
        let info = &analog.info;
        println!("Analog:     v{:08X}", analog.version);
        println!(
            "Profiles:   {} (current {}), {} bytes each",
            info.profile_count, info.current_profile, info.profile_size
        );
        println!("Curve:      {:?}", analog.curve);
        println!("Game mode:  {}", analog.game_controller_mode);
        let Some(profile) = analog.current_profile() else {
            println!("Current profile not loaded");
            return;
        };
        let mode = AnalogMode::from_u8(profile.global.mode).map_or("unknown", |m| m.name());
        println!(
            "Profile {}: {}",
            info.current_profile,
            profile.name.as_deref().unwrap_or("(unnamed)")
        );
        println!(
            "  Global:   {mode}, actuation {:.1} mm, press {} release {}",
            profile.global.actuation_point as f32 / 10.0,
            profile.global.sensitivity,
            profile.global.release_sensitivity
        );
        let overrides = profile.keys.iter().filter(|k| **k != Default::default()).count();
        println!("  Per-key overrides: {overrides}");
        println!("  OKMC records: {}", profile.okmc.len());
        for (i, pair) in profile.socd.iter().enumerate() {
            println!(
                "  SOCD {i}: ({},{}) / ({},{}) type {}",
                pair.row1, pair.col1, pair.row2, pair.col2, pair.kind
            );
        }
    })
}

/// Show resolved travel settings of one key
pub async fn key(ctx: &Context, row: u8, col: u8) -> CommandResult {
    let keyboard = ctx.open().await?;
    let Some(config) = keyboard.resolved_key_config(row, col) else {
        anyhow::bail!("No travel settings for key {row},{col}");
    };
    ctx.print(&config, |config| {
        let mode = AnalogMode::from_u8(config.mode).map_or("unknown", |m| m.name());
        println!("Key {row},{col}:");
        println!("  Mode:      {mode}");
        println!("  Actuation: {:.1} mm", config.actuation_point as f32 / 10.0);
        println!("  Press:     {}", config.sensitivity);
        println!("  Release:   {}", config.release_sensitivity);
        println!("  Advance:   {} ({})", config.advance_mode, config.advance_data);
    })
}

/// Sample live travel of one key
pub async fn travel(ctx: &Context, row: u8, col: u8, count: u32, interval: u64) -> CommandResult {
    let keyboard = ctx.open().await?;
    for i in 0..count {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(interval)).await;
        }
        match keyboard.realtime_travel(row, col).await? {
            Some(sample) => ctx.print(&sample, |s| {
                println!(
                    "{row},{col}: {:.1} mm raw {} value {} (zero {}, full {}) state {}",
                    s.travel_mm(),
                    s.travel_raw,
                    s.value,
                    s.zero,
                    s.full,
                    s.state
                );
            })?,
            None => eprintln!("{row},{col}: no sample"),
        }
    }
    Ok(())
}

/// Poll calibration progress once
pub async fn calibration_state(ctx: &Context) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    match keyboard.calibration_state().await? {
        Some(state) => ctx.print(&state, |state| println!("Calibration: {state:?}")),
        None => anyhow::bail!("Device rejected calibration state query"),
    }
}
