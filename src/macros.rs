// Macros: the actions a gesture can trigger.
// A closed enum over action kinds. Each macro knows its context check, how to run,
// whether it is held (started on recognition, completed on release) and its display text.
// See DESIGN.md: Macros

use tracing::debug;

use crate::error::FaceGazeError;
use crate::types::{
    key_code, AccessibilityNode, FacialGesture, KeyCombination, KeyEventType, MacroName,
    Modifiers, MouseButton, MouseEventType, ScreenPoint, SyntheticKeyEvent, SyntheticMouseEvent,
};

/// What a macro acts on. Implemented by the orchestrator over the mouse controller,
/// gesture handler and host; tests implement it with a fake.
pub trait MacroTarget {
    fn cursor_location(&self) -> Option<ScreenPoint>;
    fn send_mouse_event(&mut self, event: SyntheticMouseEvent);
    fn send_key_event(&mut self, event: SyntheticKeyEvent);
    fn toggle_long_click(&mut self);
    fn toggle_scroll_mode(&mut self);
    fn precision_enabled(&self) -> bool;
    fn set_precision_active(&mut self, active: bool);
    fn reset_cursor(&mut self);
    fn toggle_dictation(&mut self);
    fn open_settings(&mut self);
    fn find_virtual_keyboard(&self) -> Option<AccessibilityNode>;
    fn set_virtual_keyboard_visible(&mut self, visible: bool);
    fn toggle_paused(&mut self, gesture: Option<FacialGesture>);
}

/// Snapshot of the mode flags a macro's direction and permission depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeState {
    pub scroll_active: bool,
    pub long_click_active: bool,
    pub precision_enabled: bool,
    pub precision_active: bool,
    pub dictation_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroPhase {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroKind {
    ToggleDictation { starting: bool },
    MouseClick { button: MouseButton, clicks: u8 },
    LongClick { starting: bool },
    ResetCursor,
    KeyPress { combo: KeyCombination, custom: bool },
    OpenSettings,
    TogglePause { pausing: bool },
    ToggleScrollMode { entering: bool },
    ToggleVirtualKeyboard,
    TogglePrecision { entering: bool },
}

/// A runnable action bound to the gesture that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    name: MacroName,
    gesture: Option<FacialGesture>,
    kind: MacroKind,
    phase: MacroPhase,
}

impl Macro {
    pub fn new(name: MacroName, gesture: Option<FacialGesture>, kind: MacroKind) -> Self {
        Macro {
            name,
            gesture,
            kind,
            phase: MacroPhase::Start,
        }
    }

    /// Build the macro for `name`.
    ///
    /// Toggle directions are fixed from `state` and `paused` at construction, so the
    /// display text matches what running it will do. Fails only when a custom key
    /// combination is bound without a configured combination.
    pub fn from_name(
        name: MacroName,
        gesture: FacialGesture,
        state: &ModeState,
        paused: bool,
        key_combo: Option<&KeyCombination>,
    ) -> Result<Macro, FaceGazeError> {
        let fixed_key = |key: u32, modifiers: Modifiers| MacroKind::KeyPress {
            combo: KeyCombination {
                key,
                key_display: String::new(),
                modifiers,
            },
            custom: false,
        };
        let kind = match name {
            MacroName::ToggleDictation => MacroKind::ToggleDictation {
                starting: !state.dictation_active,
            },
            MacroName::MouseClickLeft => MacroKind::MouseClick {
                button: MouseButton::Left,
                clicks: 1,
            },
            MacroName::MouseClickRight => MacroKind::MouseClick {
                button: MouseButton::Right,
                clicks: 1,
            },
            MacroName::MouseClickLeftDouble => MacroKind::MouseClick {
                button: MouseButton::Left,
                clicks: 2,
            },
            MacroName::MouseClickLeftTriple => MacroKind::MouseClick {
                button: MouseButton::Left,
                clicks: 3,
            },
            MacroName::MouseLongClickLeft => MacroKind::LongClick {
                starting: !state.long_click_active,
            },
            MacroName::ResetCursor => MacroKind::ResetCursor,
            MacroName::KeyPressSpace => fixed_key(key_code::SPACE, Modifiers::default()),
            MacroName::KeyPressUp => fixed_key(key_code::UP, Modifiers::default()),
            MacroName::KeyPressDown => fixed_key(key_code::DOWN, Modifiers::default()),
            MacroName::KeyPressLeft => fixed_key(key_code::LEFT, Modifiers::default()),
            MacroName::KeyPressRight => fixed_key(key_code::RIGHT, Modifiers::default()),
            MacroName::KeyPressToggleOverview => {
                fixed_key(key_code::MEDIA_LAUNCH_APP1, Modifiers::default())
            }
            MacroName::KeyPressMediaPlayPause => {
                fixed_key(key_code::MEDIA_PLAY_PAUSE, Modifiers::default())
            }
            MacroName::KeyPressScreenshot => {
                fixed_key(key_code::MEDIA_LAUNCH_APP1, Modifiers::ctrl())
            }
            MacroName::OpenFacegazeSettings => MacroKind::OpenSettings,
            MacroName::ToggleFacegaze => MacroKind::TogglePause { pausing: !paused },
            MacroName::ToggleScrollMode => MacroKind::ToggleScrollMode {
                entering: !state.scroll_active,
            },
            MacroName::ToggleVirtualKeyboard => MacroKind::ToggleVirtualKeyboard,
            MacroName::CustomKeyCombination => match key_combo {
                Some(combo) => MacroKind::KeyPress {
                    combo: combo.clone(),
                    custom: true,
                },
                None => return Err(FaceGazeError::MissingKeyCombination { gesture }),
            },
            MacroName::TogglePrecisionClick => MacroKind::TogglePrecision {
                entering: !state.precision_active,
            },
        };
        Ok(Macro::new(name, Some(gesture), kind))
    }

    pub fn toggle_precision(gesture: Option<FacialGesture>, entering: bool) -> Self {
        Macro::new(
            MacroName::TogglePrecisionClick,
            gesture,
            MacroKind::TogglePrecision { entering },
        )
    }

    pub fn name(&self) -> MacroName {
        self.name
    }

    pub fn gesture(&self) -> Option<FacialGesture> {
        self.gesture
    }

    pub fn phase(&self) -> MacroPhase {
        self.phase
    }

    /// Held macros start on recognition and complete when the gesture is released.
    pub fn triggers_at_start_and_end(&self) -> bool {
        matches!(self.kind, MacroKind::KeyPress { .. })
    }

    /// The end half of a held macro.
    pub fn completion(&self) -> Macro {
        Macro {
            phase: MacroPhase::End,
            ..self.clone()
        }
    }

    /// Auto-repeat event while a key is held.
    pub fn repeat_event(&self) -> Option<SyntheticKeyEvent> {
        match (&self.kind, self.phase) {
            (MacroKind::KeyPress { combo, .. }, MacroPhase::Start) => Some(SyntheticKeyEvent {
                event_type: KeyEventType::KeyDown,
                key_code: combo.key,
                modifiers: combo.modifiers,
                repeat: true,
            }),
            _ => None,
        }
    }

    pub fn check_context(&self, target: &dyn MacroTarget) -> Result<(), FaceGazeError> {
        let fail = |reason: &str| -> Result<(), FaceGazeError> {
            Err(FaceGazeError::ContextCheckFailed {
                macro_name: self.name,
                reason: reason.to_string(),
            })
        };
        match self.kind {
            MacroKind::MouseClick { .. } | MacroKind::LongClick { .. }
                if target.cursor_location().is_none() =>
            {
                fail("no cursor location")
            }
            MacroKind::TogglePrecision { entering: true } if !target.precision_enabled() => {
                fail("precision click is disabled")
            }
            _ => Ok(()),
        }
    }

    pub fn run(&self, target: &mut dyn MacroTarget) -> Result<(), FaceGazeError> {
        debug!(macro_name = ?self.name, phase = ?self.phase, "running macro");
        match &self.kind {
            MacroKind::ToggleDictation { .. } => target.toggle_dictation(),
            MacroKind::MouseClick { button, clicks } => {
                let at = target.cursor_location().ok_or_else(|| FaceGazeError::MacroFailed {
                    macro_name: self.name,
                    reason: "no cursor location".to_string(),
                })?;
                for count in 1..=*clicks {
                    for event_type in [MouseEventType::Press, MouseEventType::Release] {
                        target.send_mouse_event(
                            SyntheticMouseEvent::new(event_type, Some(*button), at)
                                .with_click_count(count),
                        );
                    }
                }
            }
            MacroKind::LongClick { .. } => target.toggle_long_click(),
            MacroKind::ResetCursor => target.reset_cursor(),
            MacroKind::KeyPress { combo, .. } => {
                let event_type = match self.phase {
                    MacroPhase::Start => KeyEventType::KeyDown,
                    MacroPhase::End => KeyEventType::KeyUp,
                };
                target.send_key_event(SyntheticKeyEvent {
                    event_type,
                    key_code: combo.key,
                    modifiers: combo.modifiers,
                    repeat: false,
                });
            }
            MacroKind::OpenSettings => target.open_settings(),
            MacroKind::TogglePause { .. } => target.toggle_paused(self.gesture),
            MacroKind::ToggleScrollMode { .. } => target.toggle_scroll_mode(),
            MacroKind::ToggleVirtualKeyboard => {
                let visible = target
                    .find_virtual_keyboard()
                    .map_or(false, |node| node.is_visible());
                target.set_virtual_keyboard_visible(!visible);
            }
            MacroKind::TogglePrecision { entering } => target.set_precision_active(*entering),
        }
        Ok(())
    }

    /// Text for the action bubble. `None` for actions the user shouldn't see.
    pub fn display_text(&self) -> Option<String> {
        let text = match &self.kind {
            MacroKind::ToggleDictation { starting: true } => "Start dictation",
            MacroKind::ToggleDictation { starting: false } => "Stop dictation",
            MacroKind::MouseClick {
                button: MouseButton::Right,
                ..
            } => "Right-click the mouse",
            MacroKind::MouseClick { clicks: 2, .. } => "Double-click the mouse",
            MacroKind::MouseClick { clicks: 3, .. } => "Triple-click the mouse",
            MacroKind::MouseClick { .. } => "Left-click the mouse",
            MacroKind::LongClick { starting: true } => "Start drag and drop",
            MacroKind::LongClick { starting: false } => "End drag and drop",
            MacroKind::ResetCursor => "Reset cursor to center",
            MacroKind::KeyPress { combo, custom: true } => {
                return Some(format!("Custom key combination: {}", combo.display()));
            }
            MacroKind::KeyPress { .. } => key_press_text(self.name),
            MacroKind::OpenSettings => "Open face control settings",
            MacroKind::TogglePause { pausing: true } => "Pause face control",
            MacroKind::TogglePause { pausing: false } => "Resume face control",
            MacroKind::ToggleScrollMode { entering: true } => "Enter scroll mode",
            MacroKind::ToggleScrollMode { entering: false } => "Exit scroll mode",
            MacroKind::ToggleVirtualKeyboard => "Show or hide the virtual keyboard",
            MacroKind::TogglePrecision { entering: true } => "Start precision click",
            MacroKind::TogglePrecision { entering: false } => return None,
        };
        Some(text.to_string())
    }
}

fn key_press_text(name: MacroName) -> &'static str {
    match name {
        MacroName::KeyPressSpace => "Press space key",
        MacroName::KeyPressUp => "Press up arrow key",
        MacroName::KeyPressDown => "Press down arrow key",
        MacroName::KeyPressLeft => "Press left arrow key",
        MacroName::KeyPressRight => "Press right arrow key",
        MacroName::KeyPressToggleOverview => "Open overview of windows",
        MacroName::KeyPressMediaPlayPause => "Play or pause media",
        MacroName::KeyPressScreenshot => "Take screenshot",
        _ => "Press key",
    }
}
