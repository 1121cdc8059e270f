// Cursor motion engine. Frames update the latest face location; a fixed-rate loop
// smooths, scales, accelerates and gates that signal into cursor moves.
// Also owns the long-click, scroll and precision sub-modes.
// See DESIGN.md: Cursor motion

use std::collections::VecDeque;
use std::f64::consts::{E, PI};

use tracing::{debug, info, warn};

use crate::config::{LandmarkWeights, MotionConfig, PrecisionConfig};
use crate::host::InputSink;
use crate::scroll_mode::ScrollModeController;
use crate::types::{
    FaceLandmark, FrameResult, MouseButton, MouseEventType, NormalizedCoord, ScreenBounds,
    ScreenPoint, SyntheticMouseEvent, Timestamp, TransformMatrix,
};

/// Nominal control-loop period.
pub const TICK_INTERVAL_MS: u64 = 16;

/// Synthetic moves are held back this long after a physical mouse move.
pub const USER_MOVE_GRACE_MS: f64 = 500.0;

const ACCELERATION_SCALE: f64 = 1.2;
const SIGMOID_STEEPNESS: f64 = 0.3;
const SIGMOID_MIDPOINT: f64 = 5.0;

/// Identifies one run of the control loop. Ticks carrying a stale handle are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopHandle {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Point {
    x: f64,
    y: f64,
}

pub struct MouseController {
    motion: MotionConfig,
    precision: PrecisionConfig,
    kernel: Vec<f64>,
    velocity_threshold: f64,
    bounds: Option<ScreenBounds>,
    cursor: Option<ScreenPoint>,
    landmark: Option<Point>,
    buffer: VecDeque<Point>,
    previous_smoothed: Option<Point>,
    last_user_move: Option<Timestamp>,
    paused: bool,
    long_click_active: bool,
    precision_active: bool,
    scroll: ScrollModeController,
    generation: u64,
    active_loop: Option<u64>,
}

impl MouseController {
    pub fn new(motion: MotionConfig, precision: PrecisionConfig) -> Self {
        let kernel = smoothing_kernel(motion.buffer_size);
        let velocity_threshold = motion.velocity_threshold();
        MouseController {
            motion,
            precision,
            kernel,
            velocity_threshold,
            bounds: None,
            cursor: None,
            landmark: None,
            buffer: VecDeque::new(),
            previous_smoothed: None,
            last_user_move: None,
            paused: false,
            long_click_active: false,
            precision_active: false,
            scroll: ScrollModeController::new(),
            generation: 0,
            active_loop: None,
        }
    }

    pub fn set_screen_bounds(&mut self, bounds: ScreenBounds) {
        self.bounds = Some(bounds);
    }

    pub fn screen_bounds(&self) -> Option<ScreenBounds> {
        self.bounds
    }

    pub fn set_cursor_location(&mut self, point: ScreenPoint) {
        self.cursor = Some(point);
    }

    pub fn cursor_location(&self) -> Option<ScreenPoint> {
        self.cursor
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_running(&self) -> bool {
        self.active_loop.is_some()
    }

    pub fn is_long_click_active(&self) -> bool {
        self.long_click_active
    }

    pub fn is_scroll_mode_active(&self) -> bool {
        self.scroll.is_active()
    }

    pub fn is_precision_active(&self) -> bool {
        self.precision_active
    }

    pub fn precision_enabled(&self) -> bool {
        self.precision.enabled
    }

    pub fn velocity_threshold(&self) -> f64 {
        self.velocity_threshold
    }

    /// Override the computed threshold until the next motion config change.
    pub fn set_velocity_threshold(&mut self, threshold: f64) {
        self.velocity_threshold = threshold;
    }

    pub fn motion_config(&self) -> &MotionConfig {
        &self.motion
    }

    /// Replace the motion config, recomputing the kernel and threshold.
    pub fn set_motion_config(&mut self, motion: MotionConfig) {
        if motion.buffer_size != self.motion.buffer_size {
            self.kernel = smoothing_kernel(motion.buffer_size);
            while self.buffer.len() > motion.buffer_size {
                self.buffer.pop_front();
            }
        }
        self.velocity_threshold = motion.velocity_threshold();
        self.motion = motion;
    }

    pub fn set_precision_config(&mut self, precision: PrecisionConfig, sink: &mut dyn InputSink) {
        if !precision.enabled && self.precision_active {
            self.set_precision_active(false, sink);
        }
        self.precision = precision;
    }

    /// Begin a new control loop. Any previous handle stops ticking.
    pub fn start(&mut self) -> LoopHandle {
        self.generation += 1;
        self.active_loop = Some(self.generation);
        self.clear_buffers();
        LoopHandle {
            generation: self.generation,
        }
    }

    /// Cancel the loop and release every held input.
    pub fn stop(&mut self, sink: &mut dyn InputSink) {
        if self.long_click_active {
            self.toggle_long_click(sink);
        }
        if self.precision_active {
            self.set_precision_active(false, sink);
        }
        self.active_loop = None;
        self.clear_buffers();
    }

    /// Stop moving the cursor but keep its location.
    pub fn pause(&mut self) {
        self.paused = true;
        self.clear_buffers();
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.clear_buffers();
    }

    fn clear_buffers(&mut self) {
        self.buffer.clear();
        self.landmark = None;
        self.previous_smoothed = None;
    }

    /// Record the face location from a frame. Does not move the cursor.
    pub fn on_face_landmarker_result(&mut self, frame: &FrameResult) {
        if self.paused || frame.face_landmarks.is_empty() {
            return;
        }
        let Some(bounds) = self.bounds else {
            return;
        };
        let face = weighted_face_location(frame, &self.motion.landmark_weights);

        // The camera image is not mirrored; mirror x so the cursor follows the head.
        let x = bounds.width as f64 - face.x * bounds.width as f64 + bounds.left as f64;
        let y = face.y * bounds.height as f64 + bounds.top as f64;
        self.landmark = Some(Point {
            x: x.round(),
            y: y.round(),
        });
    }

    /// One control-loop iteration.
    pub fn tick(&mut self, handle: LoopHandle, now: Timestamp, sink: &mut dyn InputSink) {
        if self.active_loop != Some(handle.generation) || self.paused {
            return;
        }
        let (Some(landmark), Some(cursor), Some(bounds)) = (self.landmark, self.cursor, self.bounds)
        else {
            return;
        };

        self.push_sample(landmark);
        let smoothed = self.smoothed();
        let previous = self.previous_smoothed.unwrap_or(smoothed);
        self.previous_smoothed = Some(smoothed);

        let mut velocity = self.scale_velocity(Point {
            x: smoothed.x - previous.x,
            y: smoothed.y - previous.y,
        });

        if self.motion.velocity_threshold_enabled
            && !self.scroll.is_active()
            && !self.precision_active
        {
            let threshold = self.velocity_threshold;
            if velocity.x.abs() <= threshold && velocity.y.abs() <= threshold {
                debug!(vx = velocity.x, vy = velocity.y, "tick below velocity threshold");
                return;
            }
            velocity.x = remove_dead_zone(velocity.x, threshold);
            velocity.y = remove_dead_zone(velocity.y, threshold);
        }

        let next = bounds.clamp(cursor.x as f64 + velocity.x, cursor.y as f64 + velocity.y);

        if self.scroll.is_active() {
            self.cursor = Some(next);
            self.scroll.update(next, now, sink);
            return;
        }

        if let Some(last) = self.last_user_move {
            if now.millis_since(last) <= USER_MOVE_GRACE_MS {
                return;
            }
        }
        self.cursor = Some(next);
        sink.set_cursor_position(next);
        if self.long_click_active {
            sink.send_mouse_event(SyntheticMouseEvent::new(
                MouseEventType::Move,
                Some(MouseButton::Left),
                next,
            ));
        }
    }

    fn push_sample(&mut self, sample: Point) {
        let size = self.motion.buffer_size.max(1);
        self.buffer.push_back(sample);
        while self.buffer.len() < size {
            self.buffer.push_back(sample);
        }
        while self.buffer.len() > size {
            self.buffer.pop_front();
        }
    }

    fn smoothed(&self) -> Point {
        self.buffer
            .iter()
            .zip(&self.kernel)
            .fold(Point::default(), |acc, (p, w)| Point {
                x: acc.x + p.x * w,
                y: acc.y + p.y * w,
            })
    }

    fn scale_velocity(&self, velocity: Point) -> Point {
        let precision = if self.precision_active {
            self.precision.speed_multiplier()
        } else {
            1.0
        };
        let speed_x = if velocity.x > 0.0 {
            self.motion.speed_right
        } else {
            self.motion.speed_left
        };
        let speed_y = if velocity.y > 0.0 {
            self.motion.speed_down
        } else {
            self.motion.speed_up
        };
        let mut scaled = Point {
            x: velocity.x * speed_x * precision,
            y: velocity.y * speed_y * precision,
        };
        if self.motion.acceleration_enabled {
            scaled.x *= acceleration(scaled.x);
            scaled.y *= acceleration(scaled.y);
        }
        scaled
    }

    /// Move the cursor to the center of the screen.
    pub fn reset_location(&mut self, sink: &mut dyn InputSink) {
        if self.paused || self.scroll.is_active() {
            return;
        }
        let Some(bounds) = self.bounds else {
            return;
        };
        let center = bounds.center();
        self.cursor = Some(center);
        sink.set_cursor_position(center);
    }

    /// Press (and hold) or release the left button at the cursor.
    pub fn toggle_long_click(&mut self, sink: &mut dyn InputSink) {
        let Some(at) = self.cursor else {
            debug!("long click ignored, no cursor location");
            return;
        };
        self.long_click_active = !self.long_click_active;
        if self.long_click_active {
            sink.send_mouse_event(SyntheticMouseEvent::new(
                MouseEventType::Press,
                Some(MouseButton::Left),
                at,
            ));
            sink.set_drag_mode(true);
        } else {
            sink.send_mouse_event(SyntheticMouseEvent::new(
                MouseEventType::Release,
                Some(MouseButton::Left),
                at,
            ));
            sink.set_drag_mode(false);
            sink.reset_bubble();
        }
        info!(active = self.long_click_active, x = at.x, y = at.y, "long click toggled");
    }

    /// Enter scroll mode at the cursor, or leave it and return the cursor to the origin.
    pub fn toggle_scroll_mode(&mut self, sink: &mut dyn InputSink) {
        if let Some(origin) = self.scroll.stop() {
            self.cursor = Some(origin);
            sink.set_cursor_position(origin);
            return;
        }
        let (Some(cursor), Some(bounds)) = (self.cursor, self.bounds) else {
            debug!("scroll mode ignored, no cursor location");
            return;
        };
        if self.precision_active {
            self.set_precision_active(false, sink);
        }
        self.scroll.start(cursor, bounds);
    }

    pub fn toggle_precision(&mut self, sink: &mut dyn InputSink) {
        let active = !self.precision_active;
        self.set_precision_active(active, sink);
    }

    /// No-op unless precision click is enabled in preferences.
    pub fn set_precision_active(&mut self, active: bool, sink: &mut dyn InputSink) {
        if active == self.precision_active || (active && !self.precision.enabled) {
            return;
        }
        self.precision_active = active;
        info!(active, "precision click toggled");
        if !active {
            sink.reset_bubble();
        }
    }

    /// A physical mouse or trackpad moved the pointer.
    pub fn on_user_mouse_moved(
        &mut self,
        point: ScreenPoint,
        now: Timestamp,
        sink: &mut dyn InputSink,
    ) {
        self.cursor = Some(point);
        self.last_user_move = Some(now);
        if self.scroll.is_active() {
            self.scroll.update(point, now, sink);
        }
        if self.long_click_active {
            sink.send_mouse_event(SyntheticMouseEvent::new(
                MouseEventType::Move,
                Some(MouseButton::Left),
                point,
            ));
        }
    }
}

/// Exponential smoothing weights, oldest sample first, summing to 1.
pub fn smoothing_kernel(size: usize) -> Vec<f64> {
    let n = size.max(1);
    let raw: Vec<f64> = (1..=n)
        .map(|i| {
            let step = i as f64 / n as f64;
            0.92 * ((E * step).exp() - 1.0) / (E.exp() - 1.0) + 0.08
        })
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Gain applied to an already speed-scaled velocity component.
pub fn acceleration(velocity: f64) -> f64 {
    let sigmoid = 1.0 / (1.0 + (-SIGMOID_STEEPNESS * (velocity.abs() - SIGMOID_MIDPOINT)).exp());
    ACCELERATION_SCALE * sigmoid
}

fn remove_dead_zone(velocity: f64, threshold: f64) -> f64 {
    velocity.signum() * (velocity.abs() - threshold).max(0.0)
}

/// Weighted face location in normalized camera coordinates.
/// Missing landmarks contribute nothing; weights are not renormalized.
fn weighted_face_location(frame: &FrameResult, weights: &LandmarkWeights) -> NormalizedCoord {
    let mut sum = NormalizedCoord::default();
    let mut add = |point: NormalizedCoord, weight: f64| {
        sum.x += point.x * weight;
        sum.y += point.y * weight;
    };
    for landmark in FaceLandmark::ALL {
        let weight = match landmark {
            FaceLandmark::Forehead => weights.forehead,
            FaceLandmark::ForeheadTop => weights.forehead_top,
            FaceLandmark::NoseTip => weights.nose_tip,
            FaceLandmark::LeftTemple => weights.left_temple,
            FaceLandmark::RightTemple => weights.right_temple,
        };
        if let Some(point) = frame.landmark(landmark) {
            add(point, weight);
        }
    }
    if let Some(point) = frame.transform().and_then(rotation_location) {
        add(point, weights.rotation);
    }
    sum
}

/// Map head rotation to a pseudo landmark. `None` for a degenerate matrix.
fn rotation_location(matrix: &TransformMatrix) -> Option<NormalizedCoord> {
    let row_scale = |row: usize| {
        (0..3)
            .map(|col| matrix.at(row, col).powi(2))
            .sum::<f64>()
            .sqrt()
    };
    let scale = [row_scale(0), row_scale(1), row_scale(2)];
    if scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
        warn!("facial transformation matrix has a zero-length row, skipping rotation");
        return None;
    }
    let r = |row: usize, col: usize| matrix.at(row, col) / scale[row];

    if r(2, 0).abs() >= 1.0 {
        warn!(m20 = r(2, 0), "gimbal lock in facial transformation matrix, skipping rotation");
        return None;
    }
    let x_rotation = -r(2, 0).asin();
    let cos_x = x_rotation.cos();
    let y_rotation = (r(2, 1) / cos_x).atan2(r(2, 2) / cos_x);

    Some(NormalizedCoord::new(
        0.5 - x_rotation / (2.0 * PI),
        0.5 - y_rotation / (2.0 * PI),
    ))
}
