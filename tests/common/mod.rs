// Shared harness for driving FaceGaze with a recording host.

#![allow(dead_code)]

use std::collections::BTreeMap;

use facegaze_core::{
    FaceGaze, FaceGazeConfig, FacialGesture, FrameResult, GestureTimingConfig, LandmarkWeights,
    MacroName, MediapipeGesture, MotionConfig, RecordingHost, ScreenBounds, ScreenPoint,
    Timestamp,
};

/// Speeds of 20, no smoothing, acceleration or threshold, forehead tracking only,
/// and gestures that fire on the first frame.
pub fn config() -> FaceGazeConfig {
    FaceGazeConfig {
        motion: MotionConfig {
            speed_up: 20.0,
            speed_down: 20.0,
            speed_left: 20.0,
            speed_right: 20.0,
            buffer_size: 1,
            acceleration_enabled: false,
            velocity_threshold_enabled: false,
            landmark_weights: LandmarkWeights::forehead_only(),
            ..Default::default()
        },
        timing: GestureTimingConfig {
            min_duration_ms: -1.0,
            repeat_delay_ms: 1000.0,
            use_duration_gate: true,
        },
        screen_bounds: Some(ScreenBounds::new(0, 0, 1200, 800)),
        initial_cursor: Some(ScreenPoint::new(600, 400)),
        ..Default::default()
    }
}

pub fn with_bindings(
    mut config: FaceGazeConfig,
    bindings: &[(FacialGesture, MacroName)],
) -> FaceGazeConfig {
    for (gesture, name) in bindings {
        config.bindings.gestures_to_macros.insert(*gesture, *name);
        config.bindings.gestures_to_confidences.insert(*gesture, 0.6);
    }
    config
}

pub struct Harness {
    pub fg: FaceGaze<RecordingHost>,
    pub now_ms: u64,
    face: (f64, f64),
}

impl Harness {
    pub fn new(config: FaceGazeConfig) -> Self {
        Harness {
            fg: FaceGaze::new(config, RecordingHost::new()).unwrap(),
            now_ms: 1000,
            face: (0.1, 0.2),
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now_ms)
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    pub fn host(&mut self) -> &mut RecordingHost {
        self.fg.host_mut()
    }

    /// Process a frame 50ms after the last one, then run the control loop once.
    pub fn process(&mut self, frame: FrameResult) {
        self.advance(50);
        let now = self.now();
        self.fg.process_frame(&frame, now);
        self.fg.tick(now);
    }

    /// Move the face and hold no gestures.
    pub fn face(&mut self, x: f64, y: f64) {
        self.face = (x, y);
        self.process(FrameResult::default().with_face_at(x, y));
    }

    /// Keep the face where it is and show these gesture scores.
    pub fn gestures(&mut self, scores: &[(MediapipeGesture, f64)]) {
        let mut frame = FrameResult::default().with_face_at(self.face.0, self.face.1);
        for (gesture, score) in scores {
            frame = frame.with_gesture(*gesture, *score);
        }
        self.process(frame);
    }

    pub fn gesture(&mut self, gesture: MediapipeGesture) {
        self.gestures(&[(gesture, 0.9)]);
    }

    /// A frame with the face present and every gesture relaxed.
    pub fn relax(&mut self) {
        self.gestures(&[
            (MediapipeGesture::JawOpen, 0.0),
            (MediapipeGesture::BrowInnerUp, 0.0),
        ]);
    }

    pub fn cursor(&mut self) -> Option<ScreenPoint> {
        self.host().latest_cursor_position()
    }
}

pub fn bindings(entries: &[(FacialGesture, MacroName)]) -> BTreeMap<FacialGesture, MacroName> {
    entries.iter().copied().collect()
}
