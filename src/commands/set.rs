//! Set (write) command handlers for the misc and RGB groups.

use anyhow::anyhow;
use keychron_keyboard::{
    DebounceSettings, EffectSlot, Hsv, IndicatorConfig, PerKeyRgbEffect, ReportRate,
    SnapClickPair, WirelessPowerSettings,
};

use super::{report, CommandResult, Context};

/// Set debounce algorithm and time
pub async fn set_debounce(ctx: &Context, algorithm: u8, ms: u8) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    let settings = DebounceSettings {
        algorithm_raw: algorithm,
        time_ms: ms,
    };
    report(keyboard.set_debounce(settings).await?, "debounce")
}

/// Enable or disable NKRO
pub async fn set_nkro(ctx: &Context, enabled: bool) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(keyboard.set_nkro(enabled).await?, "NKRO")
}

/// Set report rate
pub async fn set_rate(ctx: &Context, hz: u16) -> CommandResult {
    let rate = ReportRate::from_hz(hz).ok_or_else(|| {
        anyhow!("Invalid report rate '{hz}'. Valid rates: 125, 250, 500, 1000, 2000, 4000, 8000")
    })?;
    let mut keyboard = ctx.open().await?;
    if !keyboard.state().misc.report_rate.supports(rate) {
        eprintln!("Warning: device does not list {hz} Hz as supported");
    }
    report(keyboard.set_report_rate(rate).await?, "report rate")
}

/// Set one snap-click pair, optionally persisting it
pub async fn set_snap_click(
    ctx: &Context,
    index: usize,
    pair: SnapClickPair,
    save: bool,
) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(keyboard.set_snap_click(index, pair).await?, "snap click")?;
    if save {
        report(keyboard.save_snap_click().await?, "snap click save")?;
    }
    Ok(())
}

/// Set wireless power timers
pub async fn set_wireless(ctx: &Context, backlight_off: u16, idle_sleep: u16) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    let settings = WirelessPowerSettings {
        backlight_off_secs: backlight_off,
        idle_sleep_secs: idle_sleep,
    };
    report(keyboard.set_wireless_power(settings).await?, "wireless power")
}

/// Set per-key RGB effect
pub async fn set_effect(ctx: &Context, effect: PerKeyRgbEffect) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(keyboard.set_per_key_effect(effect).await?, effect.name())
}

/// Set one LED color
pub async fn set_color(ctx: &Context, index: usize, color: Hsv) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(keyboard.set_led_color(index, color).await?, "LED color")
}

/// Set every LED to one color
pub async fn fill(ctx: &Context, color: Hsv) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    let colors = vec![color; keyboard.state().rgb.led_count as usize];
    report(keyboard.set_led_colors(0, &colors).await?, "LED colors")
}

/// Set indicator mask and color
pub async fn set_indicators(ctx: &Context, config: IndicatorConfig) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(keyboard.set_indicator_config(config).await?, "indicators")
}

/// Assign LEDs to regions
pub async fn set_regions(ctx: &Context, start: usize, regions: &[u8]) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(keyboard.set_regions(start, regions).await?, "regions")
}

/// Set one region effect slot
pub async fn set_region_effect(
    ctx: &Context,
    region: u8,
    slot: usize,
    effect: EffectSlot,
) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(
        keyboard.set_region_effects(region, slot, &[effect]).await?,
        "region effect",
    )
}

/// Persist RGB settings
pub async fn save_rgb(ctx: &Context) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(keyboard.save_rgb().await?, "RGB save")
}
