// facegaze_core: FaceGaze Rust/WASM engine
// Head-driven cursor control and facial gesture actions. The host is plumbing:
// it feeds frames, ticks and preferences in and performs the returned input events.

mod config;
mod error;
mod facegaze;
mod gesture_detector;
mod gesture_handler;
mod gesture_timer;
mod host;
mod macros;
mod mouse_controller;
mod scroll_mode;
mod types;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use config::{
    BindingConfig, FaceGazeConfig, GestureTimingConfig, LandmarkWeights, MotionConfig,
    PrecisionConfig, PreferenceSnapshot,
};
pub use error::FaceGazeError;
pub use facegaze::FaceGaze;
pub use gesture_detector::{gesture_confidence, Detection, GestureDetector};
pub use gesture_handler::{GestureHandler, MacroDetection};
pub use gesture_timer::GestureTimer;
pub use host::{FaceGazeHost, HostEvent, InputSink, RecordingHost};
pub use macros::{Macro, MacroKind, MacroPhase, MacroTarget, ModeState};
pub use mouse_controller::{acceleration, smoothing_kernel, LoopHandle, MouseController};
pub use scroll_mode::ScrollModeController;
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Mode flags reported back to the host.
#[derive(Debug, Serialize)]
struct EngineState {
    cursor: Option<ScreenPoint>,
    paused: bool,
    cursor_control_enabled: bool,
    actions_enabled: bool,
    scroll_mode_active: bool,
    long_click_active: bool,
    precision_active: bool,
}

/// FaceGaze engine exposed to JavaScript.
/// Every call returns the JSON array of host events it produced.
#[wasm_bindgen]
pub struct FaceGazeEngine {
    inner: FaceGaze<RecordingHost>,
}

#[wasm_bindgen]
impl FaceGazeEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<FaceGazeEngine, JsValue> {
        let config: FaceGazeConfig = serde_json::from_str(config_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
        let inner = FaceGaze::new(config, RecordingHost::new())
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(FaceGazeEngine { inner })
    }

    /// Feed one face landmarker result.
    pub fn process_frame(
        &mut self,
        frame_json: &str,
        timestamp_us: u64,
    ) -> Result<String, JsValue> {
        let frame: FrameResult = serde_json::from_str(frame_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid frame: {}", e)))?;
        self.inner
            .process_frame(&frame, Timestamp::from_micros(timestamp_us));
        self.drain()
    }

    /// Run one control-loop iteration. Call every ~16ms.
    pub fn tick(&mut self, timestamp_us: u64) -> Result<String, JsValue> {
        self.inner.tick(Timestamp::from_micros(timestamp_us));
        self.drain()
    }

    pub fn on_user_mouse_moved(
        &mut self,
        x: i32,
        y: i32,
        timestamp_us: u64,
    ) -> Result<String, JsValue> {
        self.inner.on_user_mouse_moved(
            ScreenPoint::new(x, y),
            Timestamp::from_micros(timestamp_us),
        );
        self.drain()
    }

    pub fn repeat_held_keys(&mut self) -> Result<String, JsValue> {
        self.inner.repeat_held_keys();
        self.drain()
    }

    pub fn set_screen_bounds(
        &mut self,
        left: i32,
        top: i32,
        width: i32,
        height: i32,
    ) -> Result<(), JsValue> {
        self.inner
            .set_screen_bounds(ScreenBounds::new(left, top, width, height))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Apply a preference snapshot. Missing keys are left unchanged.
    pub fn on_preferences_changed(
        &mut self,
        prefs_json: &str,
        timestamp_us: u64,
    ) -> Result<String, JsValue> {
        let prefs: PreferenceSnapshot = serde_json::from_str(prefs_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid preferences: {}", e)))?;
        self.inner
            .on_preferences_changed(&prefs, Timestamp::from_micros(timestamp_us))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.drain()
    }

    pub fn toggle_gesture_info_for_settings(&mut self, enabled: bool) {
        self.inner.toggle_gesture_info_for_settings(enabled);
    }

    pub fn set_dictation_active(&mut self, active: bool) {
        self.inner.host_mut().dictation_active = active;
    }

    /// Latest accessibility lookup for the virtual keyboard, or "null" if absent.
    pub fn set_virtual_keyboard(&mut self, node_json: &str) -> Result<(), JsValue> {
        let node: Option<AccessibilityNode> = serde_json::from_str(node_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid node: {}", e)))?;
        self.inner.host_mut().virtual_keyboard = node;
        Ok(())
    }

    pub fn stop(&mut self, timestamp_us: u64) -> Result<String, JsValue> {
        self.inner.stop(Timestamp::from_micros(timestamp_us));
        self.drain()
    }

    /// Returns JSON with the cursor location and mode flags.
    pub fn get_state(&self) -> Result<String, JsValue> {
        let mouse = self.inner.mouse();
        let state = EngineState {
            cursor: mouse.cursor_location(),
            paused: self.inner.handler().is_paused(),
            cursor_control_enabled: self.inner.config().cursor_control_enabled,
            actions_enabled: self.inner.config().actions_enabled,
            scroll_mode_active: mouse.is_scroll_mode_active(),
            long_click_active: mouse.is_long_click_active(),
            precision_active: mouse.is_precision_active(),
        };
        serde_json::to_string(&state)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

impl FaceGazeEngine {
    fn drain(&mut self) -> Result<String, JsValue> {
        let events = self.inner.host_mut().drain();
        serde_json::to_string(&events)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}
