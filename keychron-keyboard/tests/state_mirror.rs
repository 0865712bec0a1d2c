//! Readers, writers and the state mirror against the simulator

mod common;

use std::collections::HashSet;

use common::{connect, FakeKeyboard, COLS, LED_COUNT, SNAP_CLICK_COUNT};
use keychron_keyboard::{
    AnalogMode, AnalogSocdPair, CalibrationState, DebounceAlgorithm, DebounceSettings,
    EffectSlot, Hsv, KeyboardError, ReportRate, SnapClickPair, TravelTarget, TravelUpdate,
};
use keychron_transport::protocol::{analog, cmd, misc, rgb};
use keychron_transport::TransportError;

fn count_sent(sent: &[Vec<u8>], command: u8, sub: u8) -> usize {
    sent.iter()
        .filter(|r| r[0] == command && r[1] == sub)
        .count()
}

fn travel(mode: AnalogMode, target: TravelTarget) -> TravelUpdate {
    TravelUpdate {
        profile: 0,
        mode,
        actuation_point: 25,
        sensitivity: 2,
        release_sensitivity: 6,
        target,
    }
}

#[tokio::test]
async fn connect_loads_every_subsystem() {
    let (keyboard, _, _) = connect(FakeKeyboard::full()).await;
    let state = keyboard.state();

    assert_eq!(state.misc.debounce.algorithm(), Some(DebounceAlgorithm::SymEagerPerKey));
    assert_eq!(state.misc.debounce.time_ms, 8);
    assert_eq!(state.misc.report_rate.rate(), Some(ReportRate::Hz4000));
    assert_eq!(state.misc.report_rate.supported_mask, 0x3F);
    assert_eq!(state.misc.snap_clicks.len(), SNAP_CLICK_COUNT);
    assert_eq!(
        state.misc.snap_clicks[5],
        SnapClickPair {
            kind: 1,
            key1: 5,
            key2: 6
        }
    );
    assert_eq!(state.misc.wireless_power.idle_sleep_secs, 900);

    assert_eq!(state.rgb.protocol_version, 0x0102);
    assert_eq!(state.rgb.led_count as usize, LED_COUNT);
    assert_eq!(state.rgb.colors.len(), LED_COUNT);
    assert_eq!(state.rgb.colors[7], Hsv::new(7, 255, 200));
    assert_eq!(state.rgb.indicators.color, Hsv::new(10, 255, 128));
    assert_eq!(state.rgb.regions.len(), LED_COUNT);
    assert_eq!(state.rgb.effects.len(), 2);
    assert_eq!(state.rgb.effects[1][2].effect_id, 3);
    assert_eq!(state.rgb.effects[1][2].duration_ms, 5000);
    assert_eq!(state.rgb.led_matrix.len(), 7);
    assert_eq!(state.rgb.led_matrix.led_at(1, 1), None);
    assert_eq!(state.rgb.led_matrix.position_of(6), Some((1, 3)));

    assert_eq!(state.analog.version, 0x0001_0003);
    assert_eq!(state.analog.info.profile_count, 2);
    assert_eq!(state.analog.info.profile_size, 96);
    assert_eq!(state.analog.curve, [100, 1200, 2600, 3900]);
    let profile = state.analog.current_profile().expect("current profile loaded");
    assert_eq!(profile.name.as_deref(), Some("Main"));
    assert_eq!(profile.keys.len(), common::ROWS as usize * COLS as usize);
    assert_eq!(profile.socd.len(), 2);
    assert_eq!(profile.socd[0].col2, 1);
}

#[tokio::test]
async fn resolved_key_config_inherits_global() {
    let (keyboard, _, _) = connect(FakeKeyboard::full()).await;

    let key = keyboard.resolved_key_config(1, 2).unwrap();
    assert_eq!(key.mode, 0);
    assert_eq!(key.actuation_point, 33);
    assert_eq!(key.sensitivity, 3);
    assert_eq!(key.release_sensitivity, 4);

    let plain = keyboard.resolved_key_config(0, 0).unwrap();
    assert_eq!(plain.actuation_point, 20);
    assert_eq!(plain.sensitivity, 5);
    assert!(keyboard.resolved_key_config(2, 0).is_none());
}

#[tokio::test]
async fn paginated_reads_use_minimal_round_trips() {
    let (mut keyboard, transport, _) = connect(FakeKeyboard::full()).await;
    transport.clear_sent();

    keyboard.reload_rgb().await.unwrap();
    keyboard.reload_snap_click().await.unwrap();
    let profile = keyboard.load_profile(1).await.unwrap();
    assert_eq!(profile.name.as_deref(), Some("Alt"));

    let sent = transport.sent();
    assert_eq!(count_sent(&sent, cmd::RGB_GROUP, rgb::PER_KEY_GET_COLOR), 3);
    assert_eq!(count_sent(&sent, cmd::RGB_GROUP, rgb::MIXED_GET_REGIONS), 1);
    assert_eq!(count_sent(&sent, cmd::RGB_GROUP, rgb::MIXED_GET_EFFECT_LIST), 4);
    assert_eq!(count_sent(&sent, cmd::MISC_GROUP, misc::SNAP_CLICK_GET), 2);
    assert_eq!(count_sent(&sent, cmd::ANALOG_GROUP, analog::GET_PROFILE_RAW), 4);
    assert_eq!(count_sent(&sent, cmd::RGB_GROUP, rgb::GET_LED_IDX), 2);
}

#[tokio::test]
async fn zero_layers_skip_region_reads() {
    let device = FakeKeyboard {
        layers: 0,
        ..FakeKeyboard::full()
    };
    let (keyboard, transport, _) = connect(device).await;
    let state = keyboard.state();

    assert_eq!(state.rgb.mixed.layers, 0);
    assert!(state.rgb.regions.is_empty());
    assert!(state.rgb.effects.is_empty());
    let sent = transport.sent();
    assert_eq!(count_sent(&sent, cmd::RGB_GROUP, rgb::MIXED_GET_REGIONS), 0);
    assert_eq!(count_sent(&sent, cmd::RGB_GROUP, rgb::MIXED_GET_EFFECT_LIST), 0);
}

#[tokio::test]
async fn rejected_reader_keeps_defaults() {
    let device = FakeKeyboard {
        rejected: HashSet::from([(cmd::MISC_GROUP, misc::DEBOUNCE_GET)]),
        ..FakeKeyboard::full()
    };
    let (keyboard, _, _) = connect(device).await;
    let state = keyboard.state();

    assert_eq!(state.misc.debounce, DebounceSettings::default());
    assert!(state.misc.nkro.enabled);
    assert_eq!(state.rgb.colors.len(), LED_COUNT);
}

#[tokio::test]
async fn failed_page_discards_partial_read() {
    let device = FakeKeyboard {
        reject_nth: Some(((cmd::RGB_GROUP, rgb::PER_KEY_GET_COLOR), 1)),
        ..FakeKeyboard::full()
    };
    let (keyboard, _, _) = connect(device).await;
    let state = keyboard.state();

    assert!(state.rgb.colors.is_empty());
    assert_eq!(state.rgb.led_count as usize, LED_COUNT);
    assert_eq!(state.rgb.regions.len(), LED_COUNT);
}

#[tokio::test]
async fn accepted_write_updates_mirror() {
    let (mut keyboard, transport, device) = connect(FakeKeyboard::full()).await;

    let settings = DebounceSettings::new(DebounceAlgorithm::SymDeferPerKey, 9);
    assert!(keyboard.set_debounce(settings).await.unwrap());
    assert_eq!(keyboard.state().misc.debounce, settings);
    assert_eq!(device.lock().debounce, (2, 9));
    let last = transport.sent().pop().unwrap();
    assert_eq!(&last[..4], &[0xA7, 0x06, 2, 9]);

    assert!(keyboard.set_report_rate(ReportRate::Hz500).await.unwrap());
    assert_eq!(keyboard.state().misc.report_rate.rate(), Some(ReportRate::Hz500));

    let pair = SnapClickPair {
        kind: 3,
        key1: 0x04,
        key2: 0x07,
    };
    assert!(keyboard.set_snap_click(10, pair).await.unwrap());
    assert_eq!(keyboard.state().misc.snap_clicks[10], pair);
    assert_eq!(device.lock().snap_clicks[10], [3, 0x04, 0x07]);
    assert!(keyboard.save_snap_click().await.unwrap());
}

#[tokio::test]
async fn rejected_write_leaves_mirror() {
    let device = FakeKeyboard {
        rejected: HashSet::from([(cmd::MISC_GROUP, misc::NKRO_SET)]),
        ..FakeKeyboard::full()
    };
    let (mut keyboard, _, _) = connect(device).await;

    assert!(!keyboard.set_nkro(false).await.unwrap());
    assert!(keyboard.state().misc.nkro.enabled);
}

#[tokio::test]
async fn failed_page_write_leaves_mirror() {
    let device = FakeKeyboard {
        reject_nth: Some(((cmd::RGB_GROUP, rgb::PER_KEY_SET_COLOR), 1)),
        ..FakeKeyboard::full()
    };
    let (mut keyboard, transport, _) = connect(device).await;
    let before = keyboard.state().rgb.colors.clone();

    let colors = vec![Hsv::new(0, 0, 255); LED_COUNT];
    transport.clear_sent();
    assert!(!keyboard.set_led_colors(0, &colors).await.unwrap());
    assert_eq!(keyboard.state().rgb.colors, before);
    // aborted after the rejected second page
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn rgb_writers() {
    let (mut keyboard, _, device) = connect(FakeKeyboard::full()).await;

    assert!(keyboard.set_led_color(3, Hsv::new(85, 255, 255)).await.unwrap());
    assert_eq!(keyboard.state().rgb.colors[3], Hsv::new(85, 255, 255));
    assert_eq!(device.lock().colors[3], [85, 255, 255]);

    assert!(keyboard.set_regions(18, &[1, 1]).await.unwrap());
    assert_eq!(&keyboard.state().rgb.regions[18..], &[1, 1]);

    let slot = EffectSlot {
        effect_id: 9,
        duration_ms: 1500,
        ..Default::default()
    };
    assert!(keyboard.set_region_effects(1, 3, &[slot]).await.unwrap());
    assert_eq!(keyboard.state().rgb.effects[1][3], slot);
    assert_eq!(device.lock().effects[1][3], slot.to_wire());

    let leds = keyboard.led_indices_for_row(1, 0b1111).await.unwrap().unwrap();
    assert_eq!(&leds[..4], &[4, rgb::NO_LED, 5, 6]);
    assert!(leds[4..].iter().all(|&l| l == rgb::NO_LED));
    assert!(keyboard.save_rgb().await.unwrap());
}

#[tokio::test]
async fn transport_failure_is_an_error() {
    let (mut keyboard, transport, _) = connect(FakeKeyboard::full()).await;
    transport.disconnect();

    let err = keyboard.set_nkro(false).await.unwrap_err();
    assert!(matches!(
        err,
        KeyboardError::Transport(TransportError::Disconnected)
    ));
    assert!(keyboard.state().misc.nkro.enabled);
}

#[tokio::test]
async fn travel_updates_profile_mirror() {
    let (mut keyboard, transport, device) = connect(FakeKeyboard::full()).await;

    let whole = travel(AnalogMode::Rapid, TravelTarget::WholeProfile);
    assert!(keyboard.set_travel(&whole).await.unwrap());
    assert_eq!(
        device.lock().last_travel.as_deref().map(|a| &a[..7]),
        Some(&[0, 2, 25, 2, 6, 1, 0][..])
    );
    let global = keyboard.state().analog.current_profile().unwrap().global;
    assert_eq!(global.mode, 2);
    assert_eq!(global.actuation_point, 25);

    let keys = travel(AnalogMode::Regular, TravelTarget::keys(&[(0, 1)]).unwrap());
    assert!(keyboard.set_travel(&keys).await.unwrap());
    let last = transport.sent().pop().unwrap();
    assert_eq!(&last[..11], &[0xA9, 0x14, 0, 1, 25, 2, 6, 0, 0b10, 0, 0]);
    let key = keyboard.resolved_key_config(0, 1).unwrap();
    assert_eq!(key.mode, 1);
    assert_eq!(key.release_sensitivity, 6);
}

#[tokio::test]
async fn unrepresentable_travel_marks_profile_stale() {
    let (mut keyboard, _, _) = connect(FakeKeyboard::full()).await;

    let gamepad = travel(AnalogMode::Gamepad, TravelTarget::WholeProfile);
    assert!(keyboard.set_travel(&gamepad).await.unwrap());
    assert!(keyboard.state().analog.current_profile().is_none());

    keyboard.load_profile(0).await.unwrap();
    assert!(keyboard.resolved_key_config(1, 2).is_some());
}

#[tokio::test]
async fn too_many_rows_is_invalid() {
    let (mut keyboard, transport, _) = connect(FakeKeyboard::full()).await;
    transport.clear_sent();

    let wide = travel(AnalogMode::Regular, TravelTarget::Rows(vec![1; 9]));
    let err = keyboard.set_travel(&wide).await.unwrap_err();
    assert!(matches!(err, KeyboardError::InvalidParameter(_)));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn profile_transitions() {
    let (mut keyboard, _, device) = connect(FakeKeyboard::full()).await;

    let pair = AnalogSocdPair {
        row1: 0,
        col1: 0,
        row2: 0,
        col2: 3,
        kind: 6,
    };
    assert!(keyboard.set_analog_socd(0, 1, pair).await.unwrap());
    assert_eq!(keyboard.state().analog.current_profile().unwrap().socd[1], pair);
    let at = common::socd_offset() + analog::SOCD_RECORD_SIZE;
    assert_eq!(&device.lock().profiles[0][at..at + 5], &[0, 0, 0, 3, 6]);

    assert!(keyboard.save_profile(0).await.unwrap());
    assert!(keyboard.reset_profile(0).await.unwrap());
    assert!(keyboard.state().analog.profiles.is_empty());

    assert!(keyboard.select_profile(1).await.unwrap());
    assert_eq!(keyboard.state().analog.info.current_profile, 1);
    assert!(keyboard.resolved_key_config(0, 0).is_none());
    assert!(!keyboard.select_profile(7).await.unwrap());
    assert_eq!(keyboard.state().analog.info.current_profile, 1);
}

#[tokio::test]
async fn joystick_and_live_travel() {
    let (mut keyboard, transport, device) = connect(FakeKeyboard::full()).await;

    assert!(keyboard.set_curve([0, 1000, 2000, 4000]).await.unwrap());
    assert_eq!(device.lock().curve, [0, 1000, 2000, 4000]);
    assert_eq!(keyboard.state().analog.curve, [0, 1000, 2000, 4000]);

    assert!(keyboard.set_game_controller_mode(2).await.unwrap());
    assert_eq!(keyboard.state().analog.game_controller_mode, 2);

    transport.clear_sent();
    let sample = keyboard.realtime_travel(1, 2).await.unwrap().unwrap();
    assert_eq!((sample.row, sample.col), (1, 2));
    assert!((sample.travel_mm() - 1.5).abs() < f32::EPSILON);
    assert_eq!(sample.value, 1200);
    assert_eq!(sample.full, 3000);
    assert_eq!(&transport.sent()[0][..4], &[0xA9, 0x30, 1, 2]);
}

#[tokio::test]
async fn calibration_is_polled() {
    let (mut keyboard, _, _) = connect(FakeKeyboard::full()).await;

    assert!(keyboard
        .start_calibration(CalibrationState::ZeroTravelManual)
        .await
        .unwrap());
    let state = keyboard.calibration_state().await.unwrap();
    assert_eq!(state, Some(CalibrationState::ZeroTravelManual));

    assert!(keyboard
        .start_calibration(CalibrationState::SaveAndExit)
        .await
        .unwrap());
    assert_eq!(
        keyboard.state().analog.calibration,
        CalibrationState::SaveAndExit
    );
}
