//! Analog command handlers (profiles, travel, SOCD, joystick, calibration).

use keychron_keyboard::{AnalogMode, AnalogSocdPair, CalibrationState, TravelTarget, TravelUpdate};

use super::{report, CommandResult, Context};

/// Make a profile current
pub async fn select_profile(ctx: &Context, profile: u8) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(keyboard.select_profile(profile).await?, "profile select")
}

/// Set travel for a profile or a set of keys
pub async fn set_travel(
    ctx: &Context,
    profile: u8,
    mode: AnalogMode,
    actuation: u8,
    sensitivity: u8,
    release: u8,
    keys: &[(u8, u8)],
) -> CommandResult {
    let target = if keys.is_empty() {
        TravelTarget::WholeProfile
    } else {
        TravelTarget::keys(keys)?
    };
    let update = TravelUpdate {
        profile,
        mode,
        actuation_point: actuation,
        sensitivity,
        release_sensitivity: release,
        target,
    };
    let mut keyboard = ctx.open().await?;
    report(keyboard.set_travel(&update).await?, "travel")
}

/// Set one analog SOCD pair
pub async fn set_socd(ctx: &Context, profile: u8, index: u8, pair: AnalogSocdPair) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(
        keyboard.set_analog_socd(profile, index, pair).await?,
        "SOCD pair",
    )
}

/// Persist a profile
pub async fn save_profile(ctx: &Context, profile: u8) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(keyboard.save_profile(profile).await?, "profile save")
}

/// Reset a profile to defaults
pub async fn reset_profile(ctx: &Context, profile: u8) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(keyboard.reset_profile(profile).await?, "profile reset")
}

/// Set joystick curve
pub async fn set_curve(ctx: &Context, points: &[u16]) -> CommandResult {
    let points: [u16; 4] = points
        .try_into()
        .map_err(|_| anyhow::anyhow!("Expected 4 curve points, got {}", points.len()))?;
    let mut keyboard = ctx.open().await?;
    report(keyboard.set_curve(points).await?, "curve")
}

/// Set game controller mode
pub async fn set_game_mode(ctx: &Context, mode: u8) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(
        keyboard.set_game_controller_mode(mode).await?,
        "game controller mode",
    )
}

/// Start a calibration phase
pub async fn calibrate(ctx: &Context, phase: CalibrationState) -> CommandResult {
    let mut keyboard = ctx.open().await?;
    report(keyboard.start_calibration(phase).await?, "calibration")?;
    match phase {
        CalibrationState::ZeroTravelManual => {
            println!("Keep all keys released, then run `calibrate full`")
        }
        CalibrationState::FullTravelManual => {
            println!("Press every key fully, then run `calibrate save`")
        }
        _ => {}
    }
    Ok(())
}
