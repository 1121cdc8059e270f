// Per-gesture timing ledger: when a gesture started being held and when it last fired.
// See DESIGN.md: Gesture timing

use std::collections::BTreeMap;

use crate::config::GestureTimingConfig;
use crate::types::{FacialGesture, Timestamp};

/// Tracks hold duration and repeat delay for each gesture.
#[derive(Debug, Clone)]
pub struct GestureTimer {
    start_times: BTreeMap<FacialGesture, Timestamp>,
    last_recognized: BTreeMap<FacialGesture, Timestamp>,
    config: GestureTimingConfig,
}

impl GestureTimer {
    pub fn new(config: GestureTimingConfig) -> Self {
        GestureTimer {
            start_times: BTreeMap::new(),
            last_recognized: BTreeMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &GestureTimingConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GestureTimingConfig) {
        self.config = config;
    }

    /// Record the start of a hold. No-op while the gesture is continuously held.
    pub fn mark(&mut self, gesture: FacialGesture, now: Timestamp) {
        self.start_times.entry(gesture).or_insert(now);
    }

    /// A gesture read in the same instant it started is never valid.
    pub fn is_duration_valid(&self, gesture: FacialGesture, now: Timestamp) -> bool {
        if !self.config.use_duration_gate {
            return true;
        }
        match self.start_times.get(&gesture) {
            Some(start) => now.millis_since(*start) > self.config.min_duration_ms,
            None => false,
        }
    }

    pub fn is_repeat_delay_valid(&self, gesture: FacialGesture, now: Timestamp) -> bool {
        match self.last_recognized.get(&gesture) {
            Some(last) => now.millis_since(*last) >= self.config.repeat_delay_ms,
            None => true,
        }
    }

    pub fn set_last_recognized(&mut self, gesture: FacialGesture, at: Option<Timestamp>) {
        match at {
            Some(ts) => {
                self.last_recognized.insert(gesture, ts);
            }
            None => {
                self.last_recognized.remove(&gesture);
            }
        }
    }

    pub fn last_recognized(&self, gesture: FacialGesture) -> Option<Timestamp> {
        self.last_recognized.get(&gesture).copied()
    }

    pub fn start_time(&self, gesture: FacialGesture) -> Option<Timestamp> {
        self.start_times.get(&gesture).copied()
    }

    /// Clear only the hold start; the repeat delay still applies.
    pub fn reset_timer(&mut self, gesture: FacialGesture) {
        self.start_times.remove(&gesture);
    }

    pub fn reset_all(&mut self) {
        self.start_times.clear();
        self.last_recognized.clear();
    }
}
