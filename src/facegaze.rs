// Orchestrator: routes frames to the cursor engine and the gesture handler,
// runs the resulting macros against the host and applies preference changes.
// See DESIGN.md: Orchestrator

use std::collections::BTreeMap;

use tracing::{error, info, warn};

use crate::config::{FaceGazeConfig, MotionConfig, PrecisionConfig, PreferenceSnapshot};
use crate::error::FaceGazeError;
use crate::gesture_handler::GestureHandler;
use crate::host::FaceGazeHost;
use crate::macros::{Macro, MacroTarget, ModeState};
use crate::mouse_controller::{LoopHandle, MouseController};
use crate::types::{
    AccessibilityNode, FacialGesture, FrameResult, KeyCombination, MacroName, ScreenBounds,
    ScreenPoint, SyntheticKeyEvent, SyntheticMouseEvent, Timestamp,
};

pub struct FaceGaze<H: FaceGazeHost> {
    config: FaceGazeConfig,
    mouse: MouseController,
    handler: GestureHandler,
    host: H,
    loop_handle: Option<LoopHandle>,
}

impl<H: FaceGazeHost> FaceGaze<H> {
    pub fn new(config: FaceGazeConfig, host: H) -> Result<Self, FaceGazeError> {
        config.validate()?;
        let mut mouse = MouseController::new(config.motion.clone(), config.precision);
        if let Some(bounds) = config.screen_bounds {
            mouse.set_screen_bounds(bounds);
        }
        let initial = config
            .initial_cursor
            .or_else(|| config.screen_bounds.map(|b| b.center()));
        if let Some(point) = initial {
            mouse.set_cursor_location(point);
        }
        let mut handler = GestureHandler::new(config.bindings.clone(), config.timing);

        let loop_handle = config.cursor_control_enabled.then(|| mouse.start());
        if config.actions_enabled {
            handler.start();
        }
        info!(
            cursor_control = config.cursor_control_enabled,
            actions = config.actions_enabled,
            "face control started"
        );
        Ok(FaceGaze {
            config,
            mouse,
            handler,
            host,
            loop_handle,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn mouse(&self) -> &MouseController {
        &self.mouse
    }

    pub fn mouse_mut(&mut self) -> &mut MouseController {
        &mut self.mouse
    }

    pub fn handler(&self) -> &GestureHandler {
        &self.handler
    }

    pub fn config(&self) -> &FaceGazeConfig {
        &self.config
    }

    pub fn loop_handle(&self) -> Option<LoopHandle> {
        self.loop_handle
    }

    pub fn mode_state(&self) -> ModeState {
        ModeState {
            scroll_active: self.mouse.is_scroll_mode_active(),
            long_click_active: self.mouse.is_long_click_active(),
            precision_enabled: self.mouse.precision_enabled(),
            precision_active: self.mouse.is_precision_active(),
            dictation_active: self.host.is_dictation_active(),
        }
    }

    /// Handle one landmarker result. Cursor motion happens on the next tick.
    pub fn process_frame(&mut self, frame: &FrameResult, now: Timestamp) {
        if !frame.is_valid() {
            self.host.on_face_not_detected();
            return;
        }
        if self.config.cursor_control_enabled {
            self.mouse.on_face_landmarker_result(frame);
        }
        if !self.config.actions_enabled {
            return;
        }

        let state = self.mode_state();
        let detection = self.handler.detect_macros(frame, now, &state);
        for err in &detection.errors {
            error!(error = %err, "skipping gesture binding");
        }
        if let Some(info) = detection.gesture_info {
            self.host.send_gesture_info(info);
        }
        for m in &detection.macros {
            self.run_macro(m, now);
        }
        if !detection.display_text.is_empty() {
            self.host.show_bubble(&detection.display_text);
        }
        for m in &detection.completed {
            self.run_macro(m, now);
        }
        if detection.reset_bubble {
            self.host.reset_bubble();
        }
    }

    /// Fixed-rate control loop entry point.
    pub fn tick(&mut self, now: Timestamp) {
        if let Some(handle) = self.loop_handle {
            self.mouse.tick(handle, now, &mut self.host);
        }
    }

    pub fn on_user_mouse_moved(&mut self, point: ScreenPoint, now: Timestamp) {
        self.mouse.on_user_mouse_moved(point, now, &mut self.host);
    }

    /// Re-send key-down for every key still held by a gesture.
    pub fn repeat_held_keys(&mut self) {
        let repeats: Vec<SyntheticKeyEvent> = self
            .handler
            .pending_macros()
            .filter_map(Macro::repeat_event)
            .collect();
        for event in repeats {
            self.host.send_key_event(event);
        }
    }

    pub fn set_screen_bounds(&mut self, bounds: ScreenBounds) -> Result<(), FaceGazeError> {
        bounds.validate()?;
        self.config.screen_bounds = Some(bounds);
        self.mouse.set_screen_bounds(bounds);
        if self.mouse.cursor_location().is_none() {
            self.mouse.set_cursor_location(bounds.center());
        }
        Ok(())
    }

    pub fn set_cursor_control_enabled(&mut self, enabled: bool) {
        if enabled == self.config.cursor_control_enabled {
            return;
        }
        self.config.cursor_control_enabled = enabled;
        if enabled {
            self.loop_handle = Some(self.mouse.start());
        } else {
            self.mouse.stop(&mut self.host);
            self.loop_handle = None;
        }
        info!(enabled, "cursor control toggled");
    }

    /// Disabling actions releases held keys and leaves every toggled mode.
    pub fn set_actions_enabled(&mut self, enabled: bool, now: Timestamp) {
        if enabled == self.config.actions_enabled {
            return;
        }
        self.config.actions_enabled = enabled;
        if enabled {
            self.handler.start();
        } else {
            let completions = self.handler.stop();
            for m in &completions {
                self.run_macro(m, now);
            }
            if self.mouse.is_scroll_mode_active() {
                self.mouse.toggle_scroll_mode(&mut self.host);
            }
            if self.mouse.is_long_click_active() {
                self.mouse.toggle_long_click(&mut self.host);
            }
            self.mouse.set_precision_active(false, &mut self.host);
        }
        info!(enabled, "gesture actions toggled");
    }

    pub fn toggle_gesture_info_for_settings(&mut self, enabled: bool) {
        self.handler.toggle_gesture_info_for_settings(enabled);
    }

    /// Replace bindings and leave any mode whose toggle gesture disappeared.
    pub fn set_gestures_to_macros(&mut self, map: BTreeMap<FacialGesture, MacroName>) {
        self.config.bindings.gestures_to_macros = map.clone();
        self.handler.gestures_to_macros_changed(map);
        let bindings = self.handler.bindings();
        let drop_scroll =
            self.mouse.is_scroll_mode_active() && !bindings.is_bound(MacroName::ToggleScrollMode);
        let drop_long_click = self.mouse.is_long_click_active()
            && !bindings.is_bound(MacroName::MouseLongClickLeft);
        if drop_scroll {
            info!("scroll binding removed, leaving scroll mode");
            self.mouse.toggle_scroll_mode(&mut self.host);
        }
        if drop_long_click {
            info!("long click binding removed, releasing");
            self.mouse.toggle_long_click(&mut self.host);
        }
    }

    pub fn set_gestures_to_confidences(&mut self, map: BTreeMap<FacialGesture, f64>) {
        self.config.bindings.gestures_to_confidences = map.clone();
        self.handler.gestures_to_confidences_changed(map);
    }

    pub fn set_gestures_to_key_combos(&mut self, map: BTreeMap<FacialGesture, KeyCombination>) {
        self.config.bindings.gestures_to_key_combos = map.clone();
        self.handler.gestures_to_key_combos_changed(map);
    }

    pub fn set_motion_config(&mut self, motion: MotionConfig) -> Result<(), FaceGazeError> {
        motion.validate()?;
        self.config.motion = motion.clone();
        self.mouse.set_motion_config(motion);
        Ok(())
    }

    pub fn set_precision_config(
        &mut self,
        precision: PrecisionConfig,
    ) -> Result<(), FaceGazeError> {
        precision.validate()?;
        self.config.precision = precision;
        self.mouse.set_precision_config(precision, &mut self.host);
        Ok(())
    }

    /// Apply a preference push. Missing keys leave the current value untouched.
    pub fn on_preferences_changed(
        &mut self,
        prefs: &PreferenceSnapshot,
        now: Timestamp,
    ) -> Result<(), FaceGazeError> {
        if prefs.touches_motion() {
            let mut motion = self.config.motion.clone();
            prefs.apply_motion(&mut motion);
            self.set_motion_config(motion)?;
        }
        if prefs.precision_enabled.is_some() || prefs.precision_speed_factor.is_some() {
            let mut precision = self.config.precision;
            prefs.apply_precision(&mut precision);
            self.set_precision_config(precision)?;
        }
        if let Some(map) = &prefs.gestures_to_confidences {
            self.set_gestures_to_confidences(map.clone());
        }
        if let Some(combos) = prefs.parsed_key_combos() {
            self.set_gestures_to_key_combos(combos);
        }
        if let Some(map) = &prefs.gestures_to_macros {
            self.set_gestures_to_macros(map.clone());
        }
        if let Some(enabled) = prefs.cursor_control_enabled {
            self.set_cursor_control_enabled(enabled);
        }
        if let Some(enabled) = prefs.actions_enabled {
            self.set_actions_enabled(enabled, now);
        }
        Ok(())
    }

    /// Stop everything, leaving no key or button held.
    pub fn stop(&mut self, now: Timestamp) {
        let completions = self.handler.stop();
        for m in &completions {
            self.run_macro(m, now);
        }
        self.mouse.stop(&mut self.host);
        self.loop_handle = None;
        info!("face control stopped");
    }

    fn run_macro(&mut self, m: &Macro, now: Timestamp) {
        let mut actuator = Actuator {
            mouse: &mut self.mouse,
            handler: &mut self.handler,
            host: &mut self.host,
            now,
        };
        if let Err(err) = m.check_context(&actuator) {
            warn!(error = %err, "macro skipped");
            return;
        }
        if let Err(err) = m.run(&mut actuator) {
            warn!(error = %err, "macro failed");
        }
    }
}

/// Borrows the orchestrator's parts so a macro can act on all of them at once.
struct Actuator<'a, H: FaceGazeHost> {
    mouse: &'a mut MouseController,
    handler: &'a mut GestureHandler,
    host: &'a mut H,
    now: Timestamp,
}

impl<H: FaceGazeHost> MacroTarget for Actuator<'_, H> {
    fn cursor_location(&self) -> Option<ScreenPoint> {
        self.mouse.cursor_location()
    }

    fn send_mouse_event(&mut self, event: SyntheticMouseEvent) {
        self.host.send_mouse_event(event);
    }

    fn send_key_event(&mut self, event: SyntheticKeyEvent) {
        self.host.send_key_event(event);
    }

    fn toggle_long_click(&mut self) {
        self.mouse.toggle_long_click(&mut *self.host);
    }

    fn toggle_scroll_mode(&mut self) {
        self.mouse.toggle_scroll_mode(&mut *self.host);
    }

    fn precision_enabled(&self) -> bool {
        self.mouse.precision_enabled()
    }

    fn set_precision_active(&mut self, active: bool) {
        self.mouse.set_precision_active(active, &mut *self.host);
    }

    fn reset_cursor(&mut self) {
        self.mouse.reset_location(&mut *self.host);
    }

    fn toggle_dictation(&mut self) {
        self.host.toggle_dictation();
    }

    fn open_settings(&mut self) {
        self.host.open_settings();
    }

    fn find_virtual_keyboard(&self) -> Option<AccessibilityNode> {
        self.host.find_virtual_keyboard()
    }

    fn set_virtual_keyboard_visible(&mut self, visible: bool) {
        self.host.set_virtual_keyboard_visible(visible);
    }

    fn toggle_paused(&mut self, gesture: Option<FacialGesture>) {
        if self.handler.is_paused() {
            self.mouse.resume();
        } else {
            self.mouse.pause();
        }
        for m in self.handler.toggle_paused(gesture) {
            if let Err(err) = m.run(self) {
                warn!(error = %err, "completing held macro failed");
            }
        }
        info!(
            paused = self.handler.is_paused(),
            at_ms = self.now.as_millis(),
            "face control pause toggled"
        );
    }
}
