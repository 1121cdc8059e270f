// Turns per-frame gesture detections into macros.
// Applies hold duration, repeat delay, mode exclusivity and precision-click wrapping,
// and keeps the table of held macros waiting for their gesture to be released.
// See DESIGN.md: Gesture dispatch

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::config::{BindingConfig, GestureTimingConfig};
use crate::error::FaceGazeError;
use crate::gesture_detector::GestureDetector;
use crate::gesture_timer::GestureTimer;
use crate::macros::{Macro, ModeState};
use crate::types::{FacialGesture, FrameResult, GestureInfo, KeyCombination, MacroName, Timestamp};

/// Everything one frame produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroDetection {
    /// Macros to run now, in dispatch order.
    pub macros: Vec<Macro>,
    /// End halves of held macros whose gesture was released this frame.
    pub completed: Vec<Macro>,
    /// Bubble text for `macros`, comma-joined. Empty when nothing is shown.
    pub display_text: String,
    pub reset_bubble: bool,
    pub gesture_info: Option<Vec<GestureInfo>>,
    /// Bindings that could not be turned into a macro this frame.
    pub errors: Vec<FaceGazeError>,
}

pub struct GestureHandler {
    detector: GestureDetector,
    timer: GestureTimer,
    bindings: BindingConfig,
    /// Held macros keyed by the gesture that started them.
    pending: BTreeMap<FacialGesture, Macro>,
    previous_gestures: BTreeSet<FacialGesture>,
    paused: bool,
    running: bool,
}

impl GestureHandler {
    pub fn new(bindings: BindingConfig, timing: GestureTimingConfig) -> Self {
        GestureHandler {
            detector: GestureDetector::new(),
            timer: GestureTimer::new(timing),
            bindings,
            pending: BTreeMap::new(),
            previous_gestures: BTreeSet::new(),
            paused: false,
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop dispatching. Returns the completions of every held macro; the caller
    /// must run them so no key is left down.
    pub fn stop(&mut self) -> Vec<Macro> {
        self.running = false;
        self.timer.reset_all();
        self.previous_gestures.clear();
        std::mem::take(&mut self.pending)
            .into_values()
            .map(|m| m.completion())
            .collect()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Flip the paused state across a stop/start cycle. The toggling gesture keeps
    /// its last-recognized time so a held gesture doesn't immediately toggle back.
    pub fn toggle_paused(&mut self, gesture: Option<FacialGesture>) -> Vec<Macro> {
        let last = gesture.and_then(|g| self.timer.last_recognized(g));
        self.paused = !self.paused;
        debug!(paused = self.paused, "gesture handler restarting");
        let completions = self.stop();
        self.start();
        if let Some(g) = gesture {
            self.timer.set_last_recognized(g, last);
        }
        completions
    }

    pub fn timer(&self) -> &GestureTimer {
        &self.timer
    }

    pub fn bindings(&self) -> &BindingConfig {
        &self.bindings
    }

    pub fn pending_macros(&self) -> impl Iterator<Item = &Macro> {
        self.pending.values()
    }

    pub fn toggle_gesture_info_for_settings(&mut self, enabled: bool) {
        self.detector.toggle_gesture_info_for_settings(enabled);
    }

    pub fn set_timing(&mut self, timing: GestureTimingConfig) {
        self.timer.set_config(timing);
    }

    pub fn gestures_to_macros_changed(&mut self, map: BTreeMap<FacialGesture, MacroName>) {
        self.bindings.gestures_to_macros = map;
    }

    pub fn gestures_to_confidences_changed(&mut self, map: BTreeMap<FacialGesture, f64>) {
        self.bindings.gestures_to_confidences = map;
    }

    pub fn gestures_to_key_combos_changed(
        &mut self,
        map: BTreeMap<FacialGesture, KeyCombination>,
    ) {
        self.bindings.gestures_to_key_combos = map;
    }

    pub fn gesture_for_pause(&self) -> Option<FacialGesture> {
        self.bindings.gesture_for(MacroName::ToggleFacegaze)
    }

    pub fn gesture_for_scroll(&self) -> Option<FacialGesture> {
        self.bindings.gesture_for(MacroName::ToggleScrollMode)
    }

    pub fn gesture_for_long_click(&self) -> Option<FacialGesture> {
        self.bindings.gesture_for(MacroName::MouseLongClickLeft)
    }

    pub fn gesture_for_dictation(&self) -> Option<FacialGesture> {
        self.bindings.gesture_for(MacroName::ToggleDictation)
    }

    /// First gesture bound to a click that precision mode intercepts.
    pub fn gesture_for_precision(&self) -> Option<FacialGesture> {
        self.bindings
            .gestures_to_macros
            .iter()
            .find(|(_, name)| name.is_instant_click())
            .map(|(gesture, _)| *gesture)
    }

    pub fn macro_from_name(
        &self,
        name: MacroName,
        gesture: FacialGesture,
        state: &ModeState,
    ) -> Result<Macro, FaceGazeError> {
        Macro::from_name(
            name,
            gesture,
            state,
            self.paused,
            self.bindings.gestures_to_key_combos.get(&gesture),
        )
    }

    /// Process one frame. A binding that cannot be built is reported in `errors`;
    /// the other macros and the release pass still run.
    pub fn detect_macros(
        &mut self,
        frame: &FrameResult,
        now: Timestamp,
        state: &ModeState,
    ) -> MacroDetection {
        if !self.running {
            return MacroDetection::default();
        }
        let detection = self
            .detector
            .detect(frame, &self.bindings.gestures_to_confidences);

        // Later gestures bound to the same macro overwrite earlier ones in place.
        let mut resolved: Vec<(MacroName, FacialGesture)> = Vec::new();
        for gesture in &detection.gestures {
            let gesture = *gesture;
            self.timer.mark(gesture, now);
            if !self.timer.is_duration_valid(gesture, now) {
                continue;
            }
            if !self.timer.is_repeat_delay_valid(gesture, now) {
                debug!(?gesture, "gesture throttled by repeat delay");
                continue;
            }
            if self.pending.contains_key(&gesture) {
                continue;
            }
            let Some(name) = self.bindings.gestures_to_macros.get(&gesture).copied() else {
                continue;
            };
            self.timer.set_last_recognized(gesture, Some(now));
            match resolved.iter_mut().find(|(existing, _)| *existing == name) {
                Some(entry) => entry.1 = gesture,
                None => resolved.push((name, gesture)),
            }
        }

        let mut result = MacroDetection {
            gesture_info: detection.gesture_info,
            ..Default::default()
        };
        let mut texts = Vec::new();
        for (name, gesture) in resolved {
            let m = match self.macro_from_name(name, gesture, state) {
                Ok(m) => m,
                Err(err) => {
                    result.errors.push(err);
                    continue;
                }
            };
            if !self.is_macro_allowed(name, state) {
                debug!(macro_name = ?name, ?gesture, "macro not allowed in current mode");
                continue;
            }
            for m in Self::wrap_precision(m, gesture, state) {
                if let Some(text) = m.display_text() {
                    texts.push(format!("{} ({})", text, gesture.description()));
                }
                if m.triggers_at_start_and_end() {
                    self.pending.insert(gesture, m.clone());
                }
                result.macros.push(m);
            }
        }
        result.display_text = texts.join(", ");

        let current: BTreeSet<FacialGesture> = detection.gestures.into_iter().collect();
        for released in self.previous_gestures.difference(&current) {
            self.timer.reset_timer(*released);
            if let Some(held) = self.pending.remove(released) {
                result.completed.push(held.completion());
                result.reset_bubble = true;
            }
        }
        self.previous_gestures = current;

        result
    }

    /// Mode exclusivity, checked in priority order.
    pub fn is_macro_allowed(&self, name: MacroName, state: &ModeState) -> bool {
        if state.dictation_active {
            return name == MacroName::ToggleDictation;
        }
        if state.scroll_active {
            return name == MacroName::ToggleScrollMode;
        }
        if self.paused {
            return name == MacroName::ToggleFacegaze;
        }
        if state.long_click_active {
            return name == MacroName::MouseLongClickLeft;
        }
        true
    }

    /// With precision enabled, the first click enters precision mode instead of
    /// clicking, and the next action runs and leaves precision mode.
    fn wrap_precision(m: Macro, gesture: FacialGesture, state: &ModeState) -> Vec<Macro> {
        if !state.precision_enabled {
            return vec![m];
        }
        if state.precision_active {
            return vec![m, Macro::toggle_precision(Some(gesture), false)];
        }
        if m.name().is_instant_click() {
            return vec![Macro::toggle_precision(Some(gesture), true)];
        }
        vec![m]
    }
}
