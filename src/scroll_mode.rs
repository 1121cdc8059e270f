// Scroll mode: cursor motion drives scrolling around a fixed origin.
// See DESIGN.md: Scroll mode

use tracing::{debug, info};

use crate::host::InputSink;
use crate::types::{ScreenBounds, ScreenPoint, ScrollDirection, Timestamp};

/// Fraction of the smaller screen dimension treated as a dead zone around the origin.
pub const SCROLL_DEAD_ZONE_FRACTION: f64 = 0.03;

/// Minimum spacing between scroll requests.
pub const SCROLL_INTERVAL_MS: f64 = 100.0;

#[derive(Debug, Clone, Default)]
pub struct ScrollModeController {
    origin: Option<ScreenPoint>,
    dead_zone: f64,
    last_scroll: Option<Timestamp>,
}

impl ScrollModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.origin.is_some()
    }

    pub fn start(&mut self, origin: ScreenPoint, bounds: ScreenBounds) {
        self.origin = Some(origin);
        self.dead_zone = bounds.width.min(bounds.height) as f64 * SCROLL_DEAD_ZONE_FRACTION;
        self.last_scroll = None;
        info!(x = origin.x, y = origin.y, "scroll mode entered");
    }

    /// Leave scroll mode, returning the origin the cursor should go back to.
    pub fn stop(&mut self) -> Option<ScreenPoint> {
        self.last_scroll = None;
        let origin = self.origin.take();
        if origin.is_some() {
            info!("scroll mode exited");
        }
        origin
    }

    /// Scroll toward `point` if it is outside the dead zone and the rate limit allows.
    pub fn update(&mut self, point: ScreenPoint, now: Timestamp, sink: &mut dyn InputSink) {
        let Some(origin) = self.origin else {
            return;
        };
        let Some(direction) = self.direction(origin, point) else {
            return;
        };
        if let Some(last) = self.last_scroll {
            if now.millis_since(last) < SCROLL_INTERVAL_MS {
                debug!(?direction, "scroll rate limited");
                return;
            }
        }
        self.last_scroll = Some(now);
        sink.scroll_at(origin, direction);
    }

    fn direction(&self, origin: ScreenPoint, point: ScreenPoint) -> Option<ScrollDirection> {
        let dx = (point.x - origin.x) as f64;
        let dy = (point.y - origin.y) as f64;
        if dx.abs().max(dy.abs()) <= self.dead_zone {
            return None;
        }
        Some(if dx.abs() > dy.abs() {
            if dx > 0.0 {
                ScrollDirection::Right
            } else {
                ScrollDirection::Left
            }
        } else if dy > 0.0 {
            ScrollDirection::Down
        } else {
            ScrollDirection::Up
        })
    }
}
