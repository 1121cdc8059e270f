mod common;

use std::collections::BTreeMap;

use common::{bindings, config, with_bindings, Harness};
use facegaze_core::{
    key_code, FacialGesture, GestureInfo, HostEvent, KeyCombination, KeyEventType, MacroName,
    MediapipeGesture, Modifiers, MouseButton, MouseEventType, PrecisionConfig, ScreenPoint,
};

const JAW: FacialGesture = FacialGesture::JawOpen;
const BROW: FacialGesture = FacialGesture::BrowInnerUp;

fn presses(h: &mut Harness) -> Vec<(MouseEventType, i32, i32)> {
    h.host()
        .mouse_events()
        .iter()
        .filter(|e| e.event_type != MouseEventType::Move)
        .map(|e| (e.event_type, e.x, e.y))
        .collect()
}

#[test]
fn click_happens_at_cursor() {
    let mut h = Harness::new(with_bindings(config(), &[(JAW, MacroName::MouseClickLeft)]));
    h.face(0.1, 0.2);
    h.face(0.11, 0.21);
    h.gesture(MediapipeGesture::JawOpen);

    assert_eq!(
        presses(&mut h),
        vec![
            (MouseEventType::Press, 360, 560),
            (MouseEventType::Release, 360, 560)
        ]
    );
    assert_eq!(
        h.host().latest_bubble(),
        Some("Left-click the mouse (Open your mouth wide)")
    );
}

#[test]
fn click_uses_physical_mouse_location() {
    let mut cfg = with_bindings(config(), &[(BROW, MacroName::MouseClickRight)]);
    cfg.cursor_control_enabled = false;
    let mut h = Harness::new(cfg);
    let now = h.now();
    h.fg.on_user_mouse_moved(ScreenPoint::new(30, 40), now);
    h.gesture(MediapipeGesture::BrowInnerUp);

    let events = h.host().mouse_events();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|e| e.button == Some(MouseButton::Right) && (e.x, e.y) == (30, 40)));
}

#[test]
fn gestures_do_not_repeat_too_soon() {
    let mut h = Harness::new(with_bindings(config(), &[(JAW, MacroName::MouseClickLeft)]));
    h.face(0.1, 0.2);
    for _ in 0..5 {
        h.gesture(MediapipeGesture::JawOpen);
    }
    assert_eq!(presses(&mut h).len(), 2);

    h.advance(1000);
    h.gesture(MediapipeGesture::JawOpen);
    assert_eq!(presses(&mut h).len(), 4);
}

#[test]
fn minimum_duration_gates_dispatch() {
    let mut cfg = with_bindings(config(), &[(JAW, MacroName::MouseClickLeft)]);
    cfg.timing.min_duration_ms = 30_000.0;
    let mut h = Harness::new(cfg);
    h.face(0.1, 0.2);
    for _ in 0..10 {
        h.gesture(MediapipeGesture::JawOpen);
    }
    assert!(presses(&mut h).is_empty());
    assert!(h.fg.handler().timer().start_time(JAW).is_some());

    h.relax();
    assert!(h.fg.handler().timer().start_time(JAW).is_none());
}

#[test]
fn held_key_is_released_once() {
    let mut h = Harness::new(with_bindings(config(), &[(JAW, MacroName::KeyPressSpace)]));
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::JawOpen);
    h.fg.repeat_held_keys();
    h.advance(2000);
    h.gesture(MediapipeGesture::JawOpen);
    h.relax();
    h.relax();

    let keys = h.host().key_events();
    let summary: Vec<(KeyEventType, bool)> =
        keys.iter().map(|k| (k.event_type, k.repeat)).collect();
    assert_eq!(
        summary,
        vec![
            (KeyEventType::KeyDown, false),
            (KeyEventType::KeyDown, true),
            (KeyEventType::KeyUp, false),
        ]
    );
    assert!(keys.iter().all(|k| k.key_code == key_code::SPACE));
    assert_eq!(h.host().count(|e| *e == HostEvent::ResetBubble), 1);
}

#[test]
fn stop_completes_held_key() {
    let mut h = Harness::new(with_bindings(config(), &[(JAW, MacroName::KeyPressDown)]));
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::JawOpen);
    let now = h.now();
    h.fg.stop(now);
    h.gesture(MediapipeGesture::JawOpen);

    let kinds: Vec<KeyEventType> = h.host().key_events().iter().map(|k| k.event_type).collect();
    assert_eq!(kinds, vec![KeyEventType::KeyDown, KeyEventType::KeyUp]);
}

#[test]
fn custom_key_combination_is_sent_with_modifiers() {
    let mut cfg = with_bindings(config(), &[(JAW, MacroName::CustomKeyCombination)]);
    cfg.bindings.gestures_to_key_combos.insert(
        JAW,
        KeyCombination {
            key: 67,
            key_display: "c".to_string(),
            modifiers: Modifiers::ctrl(),
        },
    );
    let mut h = Harness::new(cfg);
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::JawOpen);
    h.relax();

    let keys = h.host().key_events();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().all(|k| k.key_code == 67 && k.modifiers.ctrl));
    assert_eq!(
        h.host().latest_bubble(),
        Some("Custom key combination: ctrl + c (Open your mouth wide)")
    );
}

#[test]
fn missing_key_combination_drops_dispatch() {
    let mut h = Harness::new(with_bindings(
        config(),
        &[(JAW, MacroName::CustomKeyCombination)],
    ));
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::JawOpen);
    assert!(h.host().key_events().is_empty());
    assert_eq!(h.host().latest_bubble(), None);
}

#[test]
fn broken_binding_does_not_leave_key_held() {
    let mut cfg = with_bindings(
        config(),
        &[
            (JAW, MacroName::KeyPressSpace),
            (BROW, MacroName::CustomKeyCombination),
        ],
    );
    cfg.timing.repeat_delay_ms = 0.0;
    let mut h = Harness::new(cfg);
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::JawOpen);
    for _ in 0..5 {
        h.gestures(&[
            (MediapipeGesture::JawOpen, 0.0),
            (MediapipeGesture::BrowInnerUp, 0.9),
        ]);
    }

    let kinds: Vec<KeyEventType> = h.host().key_events().iter().map(|k| k.event_type).collect();
    assert_eq!(kinds, vec![KeyEventType::KeyDown, KeyEventType::KeyUp]);
    assert_eq!(h.fg.handler().pending_macros().count(), 0);
}

#[test]
fn oscillation_near_threshold_releases_once() {
    let mut cfg = with_bindings(config(), &[(JAW, MacroName::KeyPressSpace)]);
    cfg.timing.min_duration_ms = 100.0;
    let mut h = Harness::new(cfg);
    h.face(0.1, 0.2);
    for _ in 0..4 {
        h.gestures(&[(MediapipeGesture::JawOpen, 0.61)]);
    }
    for score in [0.59, 0.61, 0.59, 0.61, 0.59] {
        h.gestures(&[(MediapipeGesture::JawOpen, score)]);
        if score < 0.6 {
            assert!(h.fg.handler().timer().start_time(JAW).is_none());
        }
    }

    let kinds: Vec<KeyEventType> = h.host().key_events().iter().map(|k| k.event_type).collect();
    assert_eq!(kinds, vec![KeyEventType::KeyDown, KeyEventType::KeyUp]);
}

#[test]
fn long_click_toggles_and_drags() {
    let mut h = Harness::new(with_bindings(
        config(),
        &[(JAW, MacroName::MouseLongClickLeft)],
    ));
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::JawOpen);
    assert!(h.fg.mouse().is_long_click_active());
    assert_eq!(h.host().latest_bubble(), Some("Start drag and drop (Open your mouth wide)"));

    h.face(0.11, 0.21);
    let moves: Vec<_> = h
        .host()
        .mouse_events()
        .into_iter()
        .filter(|e| e.event_type == MouseEventType::Move)
        .collect();
    let last_move = moves.last().copied().unwrap();
    assert_eq!(last_move.button, Some(MouseButton::Left));
    assert_eq!((last_move.x, last_move.y), (360, 560));

    h.advance(1000);
    h.gesture(MediapipeGesture::JawOpen);
    assert!(!h.fg.mouse().is_long_click_active());
    assert_eq!(
        presses(&mut h),
        vec![
            (MouseEventType::Press, 600, 400),
            (MouseEventType::Release, 360, 560)
        ]
    );
    assert!(h.host().events().contains(&HostEvent::DragMode { enabled: false }));
}

#[test]
fn physical_move_during_long_click_drags() {
    let mut h = Harness::new(with_bindings(
        config(),
        &[(JAW, MacroName::MouseLongClickLeft)],
    ));
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::JawOpen);
    h.host().clear();
    let now = h.now();
    h.fg.on_user_mouse_moved(ScreenPoint::new(100, 120), now);

    let events = h.host().mouse_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, MouseEventType::Move);
    assert_eq!(events[0].button, Some(MouseButton::Left));
}

#[test]
fn long_click_blocks_other_actions() {
    let mut h = Harness::new(with_bindings(
        config(),
        &[
            (JAW, MacroName::MouseLongClickLeft),
            (BROW, MacroName::MouseClickRight),
        ],
    ));
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::JawOpen);
    h.gesture(MediapipeGesture::BrowInnerUp);
    assert!(presses(&mut h)
        .iter()
        .all(|(kind, _, _)| *kind == MouseEventType::Press));
    assert_eq!(presses(&mut h).len(), 1);
}

#[test]
fn removing_long_click_binding_releases() {
    let mut h = Harness::new(with_bindings(
        config(),
        &[(JAW, MacroName::MouseLongClickLeft)],
    ));
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::JawOpen);
    assert!(h.fg.mouse().is_long_click_active());

    h.fg.set_gestures_to_macros(BTreeMap::new());
    assert!(!h.fg.mouse().is_long_click_active());
    assert_eq!(
        presses(&mut h),
        vec![
            (MouseEventType::Press, 600, 400),
            (MouseEventType::Release, 600, 400)
        ]
    );
}

#[test]
fn scroll_mode_blocks_clicks_and_exits() {
    let mut h = Harness::new(with_bindings(
        config(),
        &[
            (BROW, MacroName::ToggleScrollMode),
            (JAW, MacroName::MouseClickLeft),
        ],
    ));
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::BrowInnerUp);
    assert!(h.fg.mouse().is_scroll_mode_active());
    assert_eq!(h.host().latest_bubble(), Some("Enter scroll mode (Raise eyebrows)"));

    h.gesture(MediapipeGesture::JawOpen);
    assert!(presses(&mut h).is_empty());

    h.face(0.11, 0.21);
    assert!(h.host().count(|e| matches!(e, HostEvent::Scroll { .. })) >= 1);

    h.advance(1000);
    h.gesture(MediapipeGesture::BrowInnerUp);
    assert!(!h.fg.mouse().is_scroll_mode_active());
    assert_eq!(h.fg.mouse().cursor_location(), Some(ScreenPoint::new(600, 400)));
}

#[test]
fn removing_scroll_binding_exits_scroll_mode() {
    let mut h = Harness::new(with_bindings(config(), &[(BROW, MacroName::ToggleScrollMode)]));
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::BrowInnerUp);
    assert!(h.fg.mouse().is_scroll_mode_active());

    h.fg.set_gestures_to_macros(bindings(&[(JAW, MacroName::MouseClickLeft)]));
    assert!(!h.fg.mouse().is_scroll_mode_active());
}

#[test]
fn pause_blocks_everything_but_resume() {
    let mut h = Harness::new(with_bindings(
        config(),
        &[
            (BROW, MacroName::ToggleFacegaze),
            (JAW, MacroName::MouseClickLeft),
        ],
    ));
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::BrowInnerUp);
    assert!(h.fg.handler().is_paused());
    assert!(h.fg.mouse().is_paused());
    assert_eq!(h.host().latest_bubble(), Some("Pause face control (Raise eyebrows)"));

    // Still held: the preserved timestamp stops an immediate resume.
    h.gesture(MediapipeGesture::BrowInnerUp);
    assert!(h.fg.handler().is_paused());

    h.gesture(MediapipeGesture::JawOpen);
    h.face(0.11, 0.21);
    assert!(presses(&mut h).is_empty());
    assert_eq!(h.fg.mouse().cursor_location(), Some(ScreenPoint::new(600, 400)));

    h.advance(1000);
    h.gesture(MediapipeGesture::BrowInnerUp);
    assert!(!h.fg.handler().is_paused());
    assert_eq!(h.host().latest_bubble(), Some("Resume face control (Raise eyebrows)"));
}

#[test]
fn pause_preserves_last_recognized_time() {
    let mut h = Harness::new(with_bindings(config(), &[(BROW, MacroName::ToggleFacegaze)]));
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::BrowInnerUp);
    let recognized = h.fg.handler().timer().last_recognized(BROW);
    assert_eq!(recognized, Some(h.now()));
}

#[test]
fn dictation_only_allows_dictation_toggle() {
    let mut h = Harness::new(with_bindings(
        config(),
        &[
            (BROW, MacroName::ToggleDictation),
            (JAW, MacroName::MouseClickLeft),
        ],
    ));
    h.host().dictation_active = true;
    h.face(0.1, 0.2);
    h.gestures(&[
        (MediapipeGesture::BrowInnerUp, 0.9),
        (MediapipeGesture::JawOpen, 0.9),
    ]);
    assert!(presses(&mut h).is_empty());
    assert_eq!(h.host().count(|e| *e == HostEvent::ToggleDictation), 1);
    assert_eq!(h.host().latest_bubble(), Some("Stop dictation (Raise eyebrows)"));
}

#[test]
fn precision_click_slows_then_clicks() {
    let mut cfg = with_bindings(config(), &[(JAW, MacroName::MouseClickLeft)]);
    cfg.precision = PrecisionConfig {
        enabled: true,
        speed_factor: 50.0,
    };
    let mut h = Harness::new(cfg);
    h.face(0.1, 0.2);
    h.face(0.11, 0.21);

    h.gesture(MediapipeGesture::JawOpen);
    assert!(h.fg.mouse().is_precision_active());
    assert!(presses(&mut h).is_empty());
    assert_eq!(
        h.host().latest_bubble(),
        Some("Start precision click (Open your mouth wide)")
    );

    h.face(0.12, 0.22);
    assert_eq!(h.cursor(), Some(ScreenPoint::new(240, 640)));

    h.advance(1000);
    h.gesture(MediapipeGesture::JawOpen);
    assert!(!h.fg.mouse().is_precision_active());
    assert_eq!(
        presses(&mut h),
        vec![
            (MouseEventType::Press, 240, 640),
            (MouseEventType::Release, 240, 640)
        ]
    );
    assert_eq!(
        h.host().latest_bubble(),
        Some("Left-click the mouse (Open your mouth wide)")
    );
}

#[test]
fn scroll_toggle_cancels_precision() {
    let mut cfg = with_bindings(
        config(),
        &[
            (JAW, MacroName::MouseClickLeft),
            (BROW, MacroName::ToggleScrollMode),
        ],
    );
    cfg.precision.enabled = true;
    let mut h = Harness::new(cfg);
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::JawOpen);
    assert!(h.fg.mouse().is_precision_active());

    h.gesture(MediapipeGesture::BrowInnerUp);
    assert!(!h.fg.mouse().is_precision_active());
    assert!(h.fg.mouse().is_scroll_mode_active());
    assert!(presses(&mut h).is_empty());
}

#[test]
fn disabling_actions_releases_everything() {
    let mut cfg = with_bindings(
        config(),
        &[
            (JAW, MacroName::KeyPressUp),
            (BROW, MacroName::ToggleScrollMode),
        ],
    );
    cfg.precision.enabled = true;
    let mut h = Harness::new(cfg);
    h.face(0.1, 0.2);
    h.gestures(&[
        (MediapipeGesture::BrowInnerUp, 0.9),
        (MediapipeGesture::JawOpen, 0.9),
    ]);
    assert!(h.fg.mouse().is_scroll_mode_active());

    let now = h.now();
    h.fg.set_actions_enabled(false, now);
    assert!(!h.fg.mouse().is_scroll_mode_active());
    let kinds: Vec<KeyEventType> = h.host().key_events().iter().map(|k| k.event_type).collect();
    assert_eq!(kinds, vec![KeyEventType::KeyDown, KeyEventType::KeyUp]);

    h.gesture(MediapipeGesture::BrowInnerUp);
    assert!(!h.fg.mouse().is_scroll_mode_active());
}

#[test]
fn disabling_cursor_control_ends_precision() {
    let mut cfg = with_bindings(config(), &[(JAW, MacroName::MouseClickLeft)]);
    cfg.precision.enabled = true;
    let mut h = Harness::new(cfg);
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::JawOpen);
    assert!(h.fg.mouse().is_precision_active());

    h.fg.set_cursor_control_enabled(false);
    assert!(!h.fg.mouse().is_precision_active());
}

#[test]
fn reset_cursor_centers() {
    let mut h = Harness::new(with_bindings(config(), &[(JAW, MacroName::ResetCursor)]));
    h.face(0.1, 0.2);
    h.face(0.11, 0.21);
    h.gesture(MediapipeGesture::JawOpen);
    assert_eq!(h.fg.mouse().cursor_location(), Some(ScreenPoint::new(600, 400)));
}

#[test]
fn virtual_keyboard_and_settings() {
    let mut h = Harness::new(with_bindings(
        config(),
        &[
            (JAW, MacroName::ToggleVirtualKeyboard),
            (BROW, MacroName::OpenFacegazeSettings),
        ],
    ));
    h.face(0.1, 0.2);
    h.gestures(&[
        (MediapipeGesture::JawOpen, 0.9),
        (MediapipeGesture::BrowInnerUp, 0.9),
    ]);
    assert!(h
        .host()
        .events()
        .contains(&HostEvent::VirtualKeyboardVisible { visible: true }));
    assert_eq!(h.host().count(|e| *e == HostEvent::OpenSettings), 1);
    assert_eq!(
        h.host().latest_bubble(),
        Some(concat!(
            "Open face control settings (Raise eyebrows), ",
            "Show or hide the virtual keyboard (Open your mouth wide)"
        ))
    );
}

#[test]
fn gesture_info_is_sent_only_when_requested() {
    let mut h = Harness::new(with_bindings(
        config(),
        &[
            (BROW, MacroName::MouseClickRight),
            (JAW, MacroName::MouseClickLeft),
        ],
    ));
    h.face(0.1, 0.2);
    h.gestures(&[
        (MediapipeGesture::BrowInnerUp, 0.3),
        (MediapipeGesture::JawOpen, 0.9),
    ]);
    assert_eq!(h.host().count(|e| matches!(e, HostEvent::GestureInfo { .. })), 0);

    h.fg.toggle_gesture_info_for_settings(true);
    h.gestures(&[
        (MediapipeGesture::BrowInnerUp, 0.3),
        (MediapipeGesture::JawOpen, 0.9),
    ]);
    let info = h.host().events().iter().find_map(|e| match e {
        HostEvent::GestureInfo { info } => Some(info.clone()),
        _ => None,
    });
    assert_eq!(
        info,
        Some(vec![
            GestureInfo {
                gesture: BROW,
                confidence: 30
            },
            GestureInfo {
                gesture: JAW,
                confidence: 90
            },
        ])
    );
}

#[test]
fn screenshot_and_overview_keys() {
    let mut h = Harness::new(with_bindings(
        config(),
        &[
            (JAW, MacroName::KeyPressScreenshot),
            (BROW, MacroName::KeyPressToggleOverview),
        ],
    ));
    h.face(0.1, 0.2);
    h.gestures(&[
        (MediapipeGesture::JawOpen, 0.9),
        (MediapipeGesture::BrowInnerUp, 0.9),
    ]);
    let downs = h.host().key_events();
    assert_eq!(downs.len(), 2);
    assert!(downs
        .iter()
        .all(|k| k.key_code == key_code::MEDIA_LAUNCH_APP1));
    assert_eq!(downs.iter().filter(|k| k.modifiers.ctrl).count(), 1);
}
