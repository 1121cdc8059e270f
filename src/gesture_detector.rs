// Maps raw blend-shape scores to the facial gestures recognized this frame.
// See DESIGN.md: Gesture detection

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{FacialGesture, FrameResult, GestureInfo, MediapipeGesture};

/// A one-sided squint is ambiguous when the other eye is this closed.
pub const SQUINT_EXCLUSION_CONFIDENCE: f64 = 0.4;

/// Output of one detection pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    /// Gestures at or above their threshold, in gesture order.
    pub gestures: Vec<FacialGesture>,
    /// Present only while the settings page asked for live confidences.
    pub gesture_info: Option<Vec<GestureInfo>>,
}

#[derive(Debug, Clone, Default)]
pub struct GestureDetector {
    send_gesture_info: bool,
}

impl GestureDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_gesture_info_for_settings(&mut self, enabled: bool) {
        self.send_gesture_info = enabled;
    }

    /// Detect the configured gestures in `frame`. Gestures with no threshold are ignored.
    pub fn detect(
        &self,
        frame: &FrameResult,
        confidences: &BTreeMap<FacialGesture, f64>,
    ) -> Detection {
        let mut gestures = Vec::new();
        let mut info = Vec::new();

        for (gesture, threshold) in confidences {
            let Some(confidence) = gesture_confidence(frame, *gesture) else {
                continue;
            };
            if self.send_gesture_info {
                info.push(GestureInfo {
                    gesture: *gesture,
                    confidence: (confidence * 100.0).round().clamp(0.0, 100.0) as u8,
                });
            }
            if confidence < *threshold {
                continue;
            }
            if is_excluded(frame, *gesture) {
                debug!(?gesture, "one-sided squint rejected, other eye also closing");
                continue;
            }
            gestures.push(*gesture);
        }

        Detection {
            gestures,
            gesture_info: self.send_gesture_info.then_some(info),
        }
    }
}

/// Combined confidence for a gesture. `None` when a backing channel is missing.
///
/// Brows-down fires on either brow. The other two-channel gestures need both sides.
pub fn gesture_confidence(frame: &FrameResult, gesture: FacialGesture) -> Option<f64> {
    let mut scores = gesture
        .channels()
        .iter()
        .map(|channel| frame.confidence(*channel));
    let first = scores.next()??;
    scores.try_fold(first, |acc, score| {
        let score = score?;
        Some(match gesture {
            FacialGesture::BrowsDown => acc.max(score),
            _ => acc.min(score),
        })
    })
}

fn is_excluded(frame: &FrameResult, gesture: FacialGesture) -> bool {
    let competing: &[MediapipeGesture] = match gesture {
        FacialGesture::EyeSquintLeft => &[
            MediapipeGesture::EyeSquintRight,
            MediapipeGesture::EyeBlinkLeft,
            MediapipeGesture::EyeBlinkRight,
        ],
        FacialGesture::EyeSquintRight => &[
            MediapipeGesture::EyeSquintLeft,
            MediapipeGesture::EyeBlinkLeft,
            MediapipeGesture::EyeBlinkRight,
        ],
        _ => return false,
    };
    competing.iter().any(|channel| {
        frame
            .confidence(*channel)
            .map_or(false, |score| score >= SQUINT_EXCLUSION_CONFIDENCE)
    })
}
