// Host capability seams. The engine never injects input itself; it asks the host.
// RecordingHost buffers every request so the wasm facade can return them as one batch.
// See DESIGN.md: Host interfaces

use serde::{Deserialize, Serialize};

use crate::types::{
    AccessibilityNode, GestureInfo, ScreenPoint, ScrollDirection, SyntheticKeyEvent,
    SyntheticMouseEvent,
};

/// Synthetic input sink used by the cursor engine.
pub trait InputSink {
    fn send_mouse_event(&mut self, event: SyntheticMouseEvent);
    fn send_key_event(&mut self, event: SyntheticKeyEvent);
    fn set_cursor_position(&mut self, point: ScreenPoint);
    fn scroll_at(&mut self, point: ScreenPoint, direction: ScrollDirection);
    /// Toggle the drag event rewriter used while a long click is held.
    fn set_drag_mode(&mut self, enabled: bool);
    fn reset_bubble(&mut self);
}

/// Everything else the orchestrator and macros need from the platform.
pub trait FaceGazeHost: InputSink {
    fn is_dictation_active(&self) -> bool;
    fn toggle_dictation(&mut self);
    fn open_settings(&mut self);
    fn find_virtual_keyboard(&self) -> Option<AccessibilityNode>;
    fn set_virtual_keyboard_visible(&mut self, visible: bool);
    fn show_bubble(&mut self, text: &str);
    fn send_gesture_info(&mut self, info: Vec<GestureInfo>);
    fn on_face_not_detected(&mut self);
}

/// One recorded host request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    Mouse { event: SyntheticMouseEvent },
    Key { event: SyntheticKeyEvent },
    CursorPosition { point: ScreenPoint },
    Scroll { point: ScreenPoint, direction: ScrollDirection },
    DragMode { enabled: bool },
    ResetBubble,
    ToggleDictation,
    OpenSettings,
    VirtualKeyboardVisible { visible: bool },
    Bubble { text: String },
    GestureInfo { info: Vec<GestureInfo> },
    FaceNotDetected,
}

/// Host that records requests instead of performing them.
/// Platform state it cannot observe (dictation, virtual keyboard) is set by the caller.
#[derive(Debug, Default)]
pub struct RecordingHost {
    events: Vec<HostEvent>,
    pub dictation_active: bool,
    pub virtual_keyboard: Option<AccessibilityNode>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn mouse_events(&self) -> Vec<SyntheticMouseEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HostEvent::Mouse { event } => Some(*event),
                _ => None,
            })
            .collect()
    }

    pub fn key_events(&self) -> Vec<SyntheticKeyEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HostEvent::Key { event } => Some(*event),
                _ => None,
            })
            .collect()
    }

    pub fn latest_cursor_position(&self) -> Option<ScreenPoint> {
        self.events.iter().rev().find_map(|e| match e {
            HostEvent::CursorPosition { point } => Some(*point),
            _ => None,
        })
    }

    pub fn latest_bubble(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|e| match e {
            HostEvent::Bubble { text } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn count(&self, pred: impl Fn(&HostEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl InputSink for RecordingHost {
    fn send_mouse_event(&mut self, event: SyntheticMouseEvent) {
        self.events.push(HostEvent::Mouse { event });
    }

    fn send_key_event(&mut self, event: SyntheticKeyEvent) {
        self.events.push(HostEvent::Key { event });
    }

    fn set_cursor_position(&mut self, point: ScreenPoint) {
        self.events.push(HostEvent::CursorPosition { point });
    }

    fn scroll_at(&mut self, point: ScreenPoint, direction: ScrollDirection) {
        self.events.push(HostEvent::Scroll { point, direction });
    }

    fn set_drag_mode(&mut self, enabled: bool) {
        self.events.push(HostEvent::DragMode { enabled });
    }

    fn reset_bubble(&mut self) {
        self.events.push(HostEvent::ResetBubble);
    }
}

impl FaceGazeHost for RecordingHost {
    fn is_dictation_active(&self) -> bool {
        self.dictation_active
    }

    fn toggle_dictation(&mut self) {
        self.dictation_active = !self.dictation_active;
        self.events.push(HostEvent::ToggleDictation);
    }

    fn open_settings(&mut self) {
        self.events.push(HostEvent::OpenSettings);
    }

    fn find_virtual_keyboard(&self) -> Option<AccessibilityNode> {
        self.virtual_keyboard
    }

    fn set_virtual_keyboard_visible(&mut self, visible: bool) {
        self.events
            .push(HostEvent::VirtualKeyboardVisible { visible });
    }

    fn show_bubble(&mut self, text: &str) {
        self.events.push(HostEvent::Bubble {
            text: text.to_string(),
        });
    }

    fn send_gesture_info(&mut self, info: Vec<GestureInfo>) {
        self.events.push(HostEvent::GestureInfo { info });
    }

    fn on_face_not_detected(&mut self) {
        self.events.push(HostEvent::FaceNotDetected);
    }
}
