// Serde configuration. Every field has a default so a partial JSON config works.
// Preference snapshots are partial updates: a missing key means "no change".
// See DESIGN.md: Configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::FaceGazeError;
use crate::types::{FacialGesture, KeyCombination, MacroName, ScreenBounds, ScreenPoint};

/// Maximum value of the velocity threshold preference; the factor is `pref / max`.
pub const VELOCITY_THRESHOLD_PREF_MAX: f64 = 20.0;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceGazeConfig {
    #[serde(default = "default_true")]
    pub cursor_control_enabled: bool,
    #[serde(default = "default_true")]
    pub actions_enabled: bool,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub timing: GestureTimingConfig,
    #[serde(default)]
    pub bindings: BindingConfig,
    #[serde(default)]
    pub precision: PrecisionConfig,
    #[serde(default)]
    pub screen_bounds: Option<ScreenBounds>,
    #[serde(default)]
    pub initial_cursor: Option<ScreenPoint>,
}

impl Default for FaceGazeConfig {
    fn default() -> Self {
        FaceGazeConfig {
            cursor_control_enabled: true,
            actions_enabled: true,
            motion: MotionConfig::default(),
            timing: GestureTimingConfig::default(),
            bindings: BindingConfig::default(),
            precision: PrecisionConfig::default(),
            screen_bounds: None,
            initial_cursor: None,
        }
    }
}

impl FaceGazeConfig {
    pub fn validate(&self) -> Result<(), FaceGazeError> {
        self.motion.validate()?;
        self.bindings.validate()?;
        if let Some(bounds) = &self.screen_bounds {
            bounds.validate()?;
        }
        self.precision.validate()
    }
}

/// Cursor motion tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    #[serde(default = "default_speed")]
    pub speed_up: f64,
    #[serde(default = "default_speed")]
    pub speed_down: f64,
    #[serde(default = "default_speed")]
    pub speed_left: f64,
    #[serde(default = "default_speed")]
    pub speed_right: f64,
    /// Number of landmark samples smoothed together. 1 disables smoothing.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_true")]
    pub acceleration_enabled: bool,
    #[serde(default = "default_true")]
    pub velocity_threshold_enabled: bool,
    /// 0..=20, mapped onto a factor of the average speed.
    #[serde(default = "default_velocity_threshold_pref")]
    pub velocity_threshold_pref: f64,
    #[serde(default)]
    pub landmark_weights: LandmarkWeights,
}

fn default_speed() -> f64 {
    10.0
}

fn default_buffer_size() -> usize {
    7
}

fn default_velocity_threshold_pref() -> f64 {
    9.0
}

fn default_true() -> bool {
    true
}

impl Default for MotionConfig {
    fn default() -> Self {
        MotionConfig {
            speed_up: default_speed(),
            speed_down: default_speed(),
            speed_left: default_speed(),
            speed_right: default_speed(),
            buffer_size: default_buffer_size(),
            acceleration_enabled: true,
            velocity_threshold_enabled: true,
            velocity_threshold_pref: default_velocity_threshold_pref(),
            landmark_weights: LandmarkWeights::default(),
        }
    }
}

impl MotionConfig {
    pub fn average_speed(&self) -> f64 {
        (self.speed_up + self.speed_down + self.speed_left + self.speed_right) / 4.0
    }

    /// Per-tick velocity below which movement is dropped, in pixels.
    pub fn velocity_threshold(&self) -> f64 {
        let factor = self.velocity_threshold_pref / VELOCITY_THRESHOLD_PREF_MAX;
        self.average_speed() * factor
    }

    pub fn validate(&self) -> Result<(), FaceGazeError> {
        if self.buffer_size == 0 {
            return Err(FaceGazeError::InvalidConfig(
                "buffer_size must be at least 1".to_string(),
            ));
        }
        let speeds = [
            self.speed_up,
            self.speed_down,
            self.speed_left,
            self.speed_right,
        ];
        if speeds.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(FaceGazeError::InvalidConfig(
                "speeds must be finite and non-negative".to_string(),
            ));
        }
        if !(0.0..=VELOCITY_THRESHOLD_PREF_MAX).contains(&self.velocity_threshold_pref) {
            return Err(FaceGazeError::InvalidConfig(format!(
                "velocity_threshold_pref must be within 0..={}",
                VELOCITY_THRESHOLD_PREF_MAX
            )));
        }
        Ok(())
    }
}

/// Weight of each tracked landmark in the averaged face position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkWeights {
    #[serde(default = "default_forehead_weight")]
    pub forehead: f64,
    #[serde(default = "default_forehead_top_weight")]
    pub forehead_top: f64,
    #[serde(default = "default_nose_tip_weight")]
    pub nose_tip: f64,
    #[serde(default = "default_temple_weight")]
    pub left_temple: f64,
    #[serde(default = "default_temple_weight")]
    pub right_temple: f64,
    #[serde(default = "default_rotation_weight")]
    pub rotation: f64,
}

fn default_forehead_weight() -> f64 {
    0.1275
}

fn default_forehead_top_weight() -> f64 {
    0.0738
}

fn default_nose_tip_weight() -> f64 {
    0.3355
}

fn default_temple_weight() -> f64 {
    0.0336
}

fn default_rotation_weight() -> f64 {
    0.3960
}

impl Default for LandmarkWeights {
    fn default() -> Self {
        LandmarkWeights {
            forehead: default_forehead_weight(),
            forehead_top: default_forehead_top_weight(),
            nose_tip: default_nose_tip_weight(),
            left_temple: default_temple_weight(),
            right_temple: default_temple_weight(),
            rotation: default_rotation_weight(),
        }
    }
}

impl LandmarkWeights {
    /// Track only the forehead point.
    pub fn forehead_only() -> Self {
        LandmarkWeights {
            forehead: 1.0,
            forehead_top: 0.0,
            nose_tip: 0.0,
            left_temple: 0.0,
            right_temple: 0.0,
            rotation: 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.forehead
            + self.forehead_top
            + self.nose_tip
            + self.left_temple
            + self.right_temple
            + self.rotation
    }
}

/// Gesture hold and repeat policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GestureTimingConfig {
    #[serde(default = "default_min_duration_ms")]
    pub min_duration_ms: f64,
    #[serde(default = "default_repeat_delay_ms")]
    pub repeat_delay_ms: f64,
    #[serde(default = "default_true")]
    pub use_duration_gate: bool,
}

fn default_min_duration_ms() -> f64 {
    150.0
}

fn default_repeat_delay_ms() -> f64 {
    1000.0
}

impl Default for GestureTimingConfig {
    fn default() -> Self {
        GestureTimingConfig {
            min_duration_ms: default_min_duration_ms(),
            repeat_delay_ms: default_repeat_delay_ms(),
            use_duration_gate: true,
        }
    }
}

/// User bindings from gestures to actions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindingConfig {
    #[serde(default)]
    pub gestures_to_macros: BTreeMap<FacialGesture, MacroName>,
    /// Confidence thresholds in [0, 1].
    #[serde(default)]
    pub gestures_to_confidences: BTreeMap<FacialGesture, f64>,
    #[serde(default)]
    pub gestures_to_key_combos: BTreeMap<FacialGesture, KeyCombination>,
}

impl BindingConfig {
    pub fn validate(&self) -> Result<(), FaceGazeError> {
        for (gesture, confidence) in &self.gestures_to_confidences {
            if !(0.0..=1.0).contains(confidence) {
                return Err(FaceGazeError::InvalidConfig(format!(
                    "confidence for {:?} must be within [0, 1], got {}",
                    gesture, confidence
                )));
            }
        }
        if self
            .gestures_to_macros
            .values()
            .any(|name| *name == MacroName::TogglePrecisionClick)
        {
            return Err(FaceGazeError::InvalidConfig(
                "TOGGLE_PRECISION_CLICK cannot be bound to a gesture".to_string(),
            ));
        }
        Ok(())
    }

    /// First gesture bound to `name`, in gesture order.
    pub fn gesture_for(&self, name: MacroName) -> Option<FacialGesture> {
        self.gestures_to_macros
            .iter()
            .find(|(_, bound)| **bound == name)
            .map(|(gesture, _)| *gesture)
    }

    pub fn is_bound(&self, name: MacroName) -> bool {
        self.gesture_for(name).is_some()
    }
}

/// Precision click: slow the cursor before clicking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PrecisionConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Percent reduction of cursor speed while precision is active.
    #[serde(default = "default_precision_speed_factor")]
    pub speed_factor: f64,
}

fn default_precision_speed_factor() -> f64 {
    50.0
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        PrecisionConfig {
            enabled: false,
            speed_factor: default_precision_speed_factor(),
        }
    }
}

impl PrecisionConfig {
    pub fn speed_multiplier(&self) -> f64 {
        (100.0 - self.speed_factor) / 100.0
    }

    pub fn validate(&self) -> Result<(), FaceGazeError> {
        if !(0.0..=100.0).contains(&self.speed_factor) {
            return Err(FaceGazeError::InvalidConfig(
                "precision speed_factor must be within 0..=100".to_string(),
            ));
        }
        Ok(())
    }
}

/// Full preference snapshot pushed by the preference store. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceSnapshot {
    #[serde(default)]
    pub cursor_control_enabled: Option<bool>,
    #[serde(default)]
    pub actions_enabled: Option<bool>,
    #[serde(default)]
    pub speed_up: Option<f64>,
    #[serde(default)]
    pub speed_down: Option<f64>,
    #[serde(default)]
    pub speed_left: Option<f64>,
    #[serde(default)]
    pub speed_right: Option<f64>,
    #[serde(default)]
    pub buffer_size: Option<usize>,
    #[serde(default)]
    pub acceleration_enabled: Option<bool>,
    #[serde(default)]
    pub velocity_threshold_enabled: Option<bool>,
    #[serde(default)]
    pub velocity_threshold_pref: Option<f64>,
    #[serde(default)]
    pub precision_enabled: Option<bool>,
    #[serde(default)]
    pub precision_speed_factor: Option<f64>,
    #[serde(default)]
    pub gestures_to_macros: Option<BTreeMap<FacialGesture, MacroName>>,
    #[serde(default)]
    pub gestures_to_confidences: Option<BTreeMap<FacialGesture, f64>>,
    /// Key combinations as stored: one JSON string per gesture.
    #[serde(default)]
    pub gestures_to_key_combos: Option<BTreeMap<FacialGesture, String>>,
}

impl PreferenceSnapshot {
    /// Whether any motion tunable is present.
    pub fn touches_motion(&self) -> bool {
        self.speed_up.is_some()
            || self.speed_down.is_some()
            || self.speed_left.is_some()
            || self.speed_right.is_some()
            || self.buffer_size.is_some()
            || self.acceleration_enabled.is_some()
            || self.velocity_threshold_enabled.is_some()
            || self.velocity_threshold_pref.is_some()
    }

    /// Overlay the present motion fields onto `motion`.
    pub fn apply_motion(&self, motion: &mut MotionConfig) {
        if let Some(v) = self.speed_up {
            motion.speed_up = v;
        }
        if let Some(v) = self.speed_down {
            motion.speed_down = v;
        }
        if let Some(v) = self.speed_left {
            motion.speed_left = v;
        }
        if let Some(v) = self.speed_right {
            motion.speed_right = v;
        }
        if let Some(v) = self.buffer_size {
            motion.buffer_size = v;
        }
        if let Some(v) = self.acceleration_enabled {
            motion.acceleration_enabled = v;
        }
        if let Some(v) = self.velocity_threshold_enabled {
            motion.velocity_threshold_enabled = v;
        }
        if let Some(v) = self.velocity_threshold_pref {
            motion.velocity_threshold_pref = v;
        }
    }

    pub fn apply_precision(&self, precision: &mut PrecisionConfig) {
        if let Some(v) = self.precision_enabled {
            precision.enabled = v;
        }
        if let Some(v) = self.precision_speed_factor {
            precision.speed_factor = v;
        }
    }

    /// Parse stored key combinations. Malformed entries are logged and skipped.
    pub fn parsed_key_combos(&self) -> Option<BTreeMap<FacialGesture, KeyCombination>> {
        let raw = self.gestures_to_key_combos.as_ref()?;
        let mut combos = BTreeMap::new();
        for (gesture, json) in raw {
            match serde_json::from_str::<KeyCombination>(json) {
                Ok(combo) => {
                    combos.insert(*gesture, combo);
                }
                Err(err) => {
                    warn!(?gesture, error = %err, "skipping malformed key combination");
                }
            }
        }
        Some(combos)
    }
}
