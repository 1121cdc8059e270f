mod common;

use common::{config, with_bindings, Harness};
use facegaze_core::{
    FacialGesture, FrameResult, HostEvent, MacroName, MediapipeGesture, MouseEventType,
    PreferenceSnapshot, ScreenBounds, ScreenPoint, TransformMatrix,
};

#[test]
fn cursor_moves_only_on_tick() {
    let mut h = Harness::new(config());
    h.face(0.1, 0.2);
    h.advance(50);
    let now = h.now();
    h.fg
        .process_frame(&FrameResult::default().with_face_at(0.2, 0.4), now);
    assert_eq!(h.cursor(), Some(ScreenPoint::new(600, 400)));

    h.fg.tick(now);
    let moved = h.cursor().unwrap();
    assert_ne!(moved.x, 600);
    assert_ne!(moved.y, 400);
}

#[test]
fn head_motion_is_relative_not_absolute() {
    let mut h = Harness::new(config());
    h.face(0.6, 0.7);
    h.face(0.61, 0.71);
    assert_eq!(h.cursor(), Some(ScreenPoint::new(360, 560)));
    h.face(0.6, 0.7);
    assert_eq!(h.cursor(), Some(ScreenPoint::new(600, 400)));
}

#[test]
fn larger_moves_scale_linearly() {
    let mut h = Harness::new(config());
    h.face(0.1, 0.2);
    h.face(0.12, 0.22);
    assert_eq!(h.cursor(), Some(ScreenPoint::new(120, 720)));
}

#[test]
fn cursor_control_can_be_switched_on_and_off() {
    let mut cfg = config();
    cfg.cursor_control_enabled = false;
    let mut h = Harness::new(cfg);
    h.face(0.1, 0.2);
    h.face(0.11, 0.21);
    assert_eq!(h.cursor(), None);

    h.fg.set_cursor_control_enabled(true);
    h.face(0.11, 0.21);
    assert_eq!(h.cursor(), Some(ScreenPoint::new(600, 400)));
    h.face(0.12, 0.22);
    assert_eq!(h.cursor(), Some(ScreenPoint::new(360, 560)));

    h.fg.set_cursor_control_enabled(false);
    h.face(0.13, 0.23);
    assert_eq!(h.cursor(), Some(ScreenPoint::new(360, 560)));
    assert_eq!(
        h.host()
            .count(|e| matches!(e, HostEvent::CursorPosition { .. })),
        2
    );
}

#[test]
fn invalid_frame_is_reported_and_ignored() {
    let mut h = Harness::new(config());
    h.face(0.1, 0.2);
    h.host().clear();
    h.process(FrameResult::default());
    assert_eq!(h.host().events()[0], HostEvent::FaceNotDetected);
    // The loop keeps using the last good location.
    assert_eq!(h.cursor(), Some(ScreenPoint::new(600, 400)));
}

#[test]
fn preference_push_updates_speeds() {
    let mut h = Harness::new(config());
    let prefs: PreferenceSnapshot = serde_json::from_str(
        r#"{"speed_up": 1, "speed_down": 1, "speed_left": 1, "speed_right": 1, "unknown": 3}"#,
    )
    .unwrap();
    let now = h.now();
    h.fg.on_preferences_changed(&prefs, now).unwrap();
    assert_eq!(h.fg.config().motion.buffer_size, 1);

    h.face(0.1, 0.2);
    h.face(0.1 + 3.0 / 1200.0, 0.2 + 3.0 / 800.0);
    assert_eq!(h.cursor(), Some(ScreenPoint::new(597, 403)));
}

#[test]
fn invalid_preference_is_rejected() {
    let mut h = Harness::new(config());
    let prefs = PreferenceSnapshot {
        buffer_size: Some(0),
        ..Default::default()
    };
    let now = h.now();
    assert!(h.fg.on_preferences_changed(&prefs, now).is_err());
    assert_eq!(h.fg.config().motion.buffer_size, 1);
}

#[test]
fn physical_mouse_updates_location_without_cursor_control() {
    let mut cfg = config();
    cfg.cursor_control_enabled = false;
    let mut h = Harness::new(cfg);
    let now = h.now();
    h.fg.on_user_mouse_moved(ScreenPoint::new(30, 40), now);
    assert_eq!(h.fg.mouse().cursor_location(), Some(ScreenPoint::new(30, 40)));
    assert!(h.host().mouse_events().is_empty());
}

#[test]
fn screen_bounds_seed_cursor_at_center() {
    let mut cfg = config();
    cfg.screen_bounds = None;
    cfg.initial_cursor = None;
    let mut h = Harness::new(cfg);
    h.face(0.1, 0.2);
    assert_eq!(h.cursor(), None);

    h.fg.set_screen_bounds(ScreenBounds::new(0, 0, 1000, 600)).unwrap();
    h.face(0.1, 0.2);
    assert_eq!(h.cursor(), Some(ScreenPoint::new(500, 300)));
}

#[test]
fn negative_screen_bounds_are_refused() {
    let mut h = Harness::new(config());
    assert!(h.fg.set_screen_bounds(ScreenBounds::new(0, 0, -1, 600)).is_err());
    assert!(h.fg.set_screen_bounds(ScreenBounds::new(0, 0, 1000, -5)).is_err());
    h.face(0.1, 0.2);
    h.face(0.11, 0.21);
    assert_eq!(h.cursor(), Some(ScreenPoint::new(360, 560)));
}

#[test]
fn rotation_contributes_to_position() {
    let mut cfg = config();
    cfg.motion.landmark_weights.forehead = 0.0;
    cfg.motion.landmark_weights.rotation = 1.0;
    let mut h = Harness::new(cfg);

    // Yaw of 0.1 rad around the vertical axis.
    let (s, c) = (0.1f64.sin(), 0.1f64.cos());
    let turned = TransformMatrix([
        c, 0.0, s, 0.0, 0.0, 1.0, 0.0, 0.0, -s, 0.0, c, 0.0, 0.0, 0.0, 0.0, 1.0,
    ]);
    let identity = TransformMatrix([
        1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
    ]);
    h.process(
        FrameResult::default()
            .with_face_at(0.5, 0.5)
            .with_transform(identity),
    );
    h.process(
        FrameResult::default()
            .with_face_at(0.5, 0.5)
            .with_transform(turned),
    );
    let cursor = h.cursor().unwrap();
    assert_ne!(cursor.x, 600);
    assert_eq!(cursor.y, 400);
}

#[test]
fn stop_leaves_nothing_held() {
    let cfg = with_bindings(
        config(),
        &[(FacialGesture::JawOpen, MacroName::MouseLongClickLeft)],
    );
    let mut h = Harness::new(cfg);
    h.face(0.1, 0.2);
    h.gesture(MediapipeGesture::JawOpen);
    assert!(h.fg.mouse().is_long_click_active());

    let now = h.now();
    h.fg.stop(now);
    let events: Vec<MouseEventType> = h
        .host()
        .mouse_events()
        .iter()
        .map(|e| e.event_type)
        .filter(|t| *t != MouseEventType::Move)
        .collect();
    assert_eq!(events, vec![MouseEventType::Press, MouseEventType::Release]);
    assert!(!h.fg.mouse().is_long_click_active());
    assert_eq!(h.fg.loop_handle(), None);
}
