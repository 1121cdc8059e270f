// Strong typing over strings. Newtypes for timestamps, screen pixels and gesture names.
// See DESIGN.md: Data model

use serde::{Deserialize, Serialize};

use crate::error::FaceGazeError;

/// Timestamp in microseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }

    pub fn from_millis(ms: u64) -> Self {
        Timestamp(ms * 1000)
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Signed milliseconds elapsed since `earlier`. Negative if `earlier` is in the future.
    pub fn millis_since(&self, earlier: Timestamp) -> f64 {
        (self.0 as f64 - earlier.0 as f64) / 1000.0
    }
}

/// Normalized coordinate (0.0 to 1.0, relative to the camera frame).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NormalizedCoord {
    pub x: f64,
    pub y: f64,
}

impl NormalizedCoord {
    pub fn new(x: f64, y: f64) -> Self {
        NormalizedCoord { x, y }
    }

    pub fn center() -> Self {
        NormalizedCoord { x: 0.5, y: 0.5 }
    }
}

/// Absolute on-screen position in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        ScreenPoint { x, y }
    }
}

/// Bounds of the primary display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScreenBounds {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenBounds {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        ScreenBounds {
            left,
            top,
            width,
            height,
        }
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.left + self.width / 2, self.top + self.height / 2)
    }

    /// Clamp a point into the bounds. Right and bottom edges are inclusive.
    /// A negative extent collapses onto the left or top edge.
    pub fn clamp(&self, x: f64, y: f64) -> ScreenPoint {
        let max_x = (self.left + self.width.max(0)) as f64;
        let max_y = (self.top + self.height.max(0)) as f64;
        ScreenPoint::new(
            x.max(self.left as f64).min(max_x).round() as i32,
            y.max(self.top as f64).min(max_y).round() as i32,
        )
    }

    pub fn validate(&self) -> Result<(), FaceGazeError> {
        if self.width < 0 || self.height < 0 {
            return Err(FaceGazeError::InvalidConfig(format!(
                "screen bounds must have a non-negative size, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Raw blend-shape channel reported by the face landmarker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediapipeGesture {
    BrowDownLeft,
    BrowDownRight,
    BrowInnerUp,
    EyeBlinkLeft,
    EyeBlinkRight,
    EyeLookDownLeft,
    EyeLookDownRight,
    EyeLookInLeft,
    EyeLookInRight,
    EyeLookOutLeft,
    EyeLookOutRight,
    EyeLookUpLeft,
    EyeLookUpRight,
    EyeSquintLeft,
    EyeSquintRight,
    JawLeft,
    JawOpen,
    JawRight,
    MouthFunnel,
    MouthLeft,
    MouthPucker,
    MouthRight,
    MouthSmileLeft,
    MouthSmileRight,
    MouthUpperUpLeft,
    MouthUpperUpRight,
}

impl MediapipeGesture {
    /// Category name as emitted by the landmarker's blend-shape output.
    pub fn category_name(&self) -> &'static str {
        match self {
            Self::BrowDownLeft => "browDownLeft",
            Self::BrowDownRight => "browDownRight",
            Self::BrowInnerUp => "browInnerUp",
            Self::EyeBlinkLeft => "eyeBlinkLeft",
            Self::EyeBlinkRight => "eyeBlinkRight",
            Self::EyeLookDownLeft => "eyeLookDownLeft",
            Self::EyeLookDownRight => "eyeLookDownRight",
            Self::EyeLookInLeft => "eyeLookInLeft",
            Self::EyeLookInRight => "eyeLookInRight",
            Self::EyeLookOutLeft => "eyeLookOutLeft",
            Self::EyeLookOutRight => "eyeLookOutRight",
            Self::EyeLookUpLeft => "eyeLookUpLeft",
            Self::EyeLookUpRight => "eyeLookUpRight",
            Self::EyeSquintLeft => "eyeSquintLeft",
            Self::EyeSquintRight => "eyeSquintRight",
            Self::JawLeft => "jawLeft",
            Self::JawOpen => "jawOpen",
            Self::JawRight => "jawRight",
            Self::MouthFunnel => "mouthFunnel",
            Self::MouthLeft => "mouthLeft",
            Self::MouthPucker => "mouthPucker",
            Self::MouthRight => "mouthRight",
            Self::MouthSmileLeft => "mouthSmileLeft",
            Self::MouthSmileRight => "mouthSmileRight",
            Self::MouthUpperUpLeft => "mouthUpperUpLeft",
            Self::MouthUpperUpRight => "mouthUpperUpRight",
        }
    }
}

/// User-facing facial gesture that can be bound to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FacialGesture {
    BrowInnerUp,
    BrowsDown,
    EyeSquintLeft,
    EyeSquintRight,
    EyesBlink,
    EyesLookDown,
    EyesLookLeft,
    EyesLookRight,
    EyesLookUp,
    JawLeft,
    JawOpen,
    JawRight,
    MouthFunnel,
    MouthLeft,
    MouthPucker,
    MouthRight,
    MouthSmile,
    MouthUpperUp,
}

impl FacialGesture {
    pub const ALL: [FacialGesture; 18] = [
        Self::BrowInnerUp,
        Self::BrowsDown,
        Self::EyeSquintLeft,
        Self::EyeSquintRight,
        Self::EyesBlink,
        Self::EyesLookDown,
        Self::EyesLookLeft,
        Self::EyesLookRight,
        Self::EyesLookUp,
        Self::JawLeft,
        Self::JawOpen,
        Self::JawRight,
        Self::MouthFunnel,
        Self::MouthLeft,
        Self::MouthPucker,
        Self::MouthRight,
        Self::MouthSmile,
        Self::MouthUpperUp,
    ];

    /// Raw channels backing this gesture.
    pub fn channels(&self) -> &'static [MediapipeGesture] {
        use MediapipeGesture as M;
        match self {
            Self::BrowInnerUp => &[M::BrowInnerUp],
            Self::BrowsDown => &[M::BrowDownLeft, M::BrowDownRight],
            Self::EyeSquintLeft => &[M::EyeSquintLeft],
            Self::EyeSquintRight => &[M::EyeSquintRight],
            Self::EyesBlink => &[M::EyeBlinkLeft, M::EyeBlinkRight],
            Self::EyesLookDown => &[M::EyeLookDownLeft, M::EyeLookDownRight],
            Self::EyesLookLeft => &[M::EyeLookOutLeft, M::EyeLookInRight],
            Self::EyesLookRight => &[M::EyeLookInLeft, M::EyeLookOutRight],
            Self::EyesLookUp => &[M::EyeLookUpLeft, M::EyeLookUpRight],
            Self::JawLeft => &[M::JawLeft],
            Self::JawOpen => &[M::JawOpen],
            Self::JawRight => &[M::JawRight],
            Self::MouthFunnel => &[M::MouthFunnel],
            Self::MouthLeft => &[M::MouthLeft],
            Self::MouthPucker => &[M::MouthPucker],
            Self::MouthRight => &[M::MouthRight],
            Self::MouthSmile => &[M::MouthSmileLeft, M::MouthSmileRight],
            Self::MouthUpperUp => &[M::MouthUpperUpLeft, M::MouthUpperUpRight],
        }
    }

    /// Text shown to the user for this gesture.
    pub fn description(&self) -> &'static str {
        match self {
            Self::BrowInnerUp => "Raise eyebrows",
            Self::BrowsDown => "Lower eyebrows",
            Self::EyeSquintLeft => "Squint left eye",
            Self::EyeSquintRight => "Squint right eye",
            Self::EyesBlink => "Blink both eyes",
            Self::EyesLookDown => "Look down",
            Self::EyesLookLeft => "Look left",
            Self::EyesLookRight => "Look right",
            Self::EyesLookUp => "Look up",
            Self::JawLeft => "Shift jaw left",
            Self::JawOpen => "Open your mouth wide",
            Self::JawRight => "Shift jaw right",
            Self::MouthFunnel => "Make an O shape with your mouth",
            Self::MouthLeft => "Pull mouth left",
            Self::MouthPucker => "Pucker your lips",
            Self::MouthRight => "Pull mouth right",
            Self::MouthSmile => "Smile",
            Self::MouthUpperUp => "Wrinkle your nose",
        }
    }
}

/// Action a gesture can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MacroName {
    ToggleDictation,
    MouseClickLeft,
    MouseClickRight,
    MouseLongClickLeft,
    MouseClickLeftDouble,
    MouseClickLeftTriple,
    ResetCursor,
    KeyPressSpace,
    KeyPressUp,
    KeyPressDown,
    KeyPressLeft,
    KeyPressRight,
    KeyPressToggleOverview,
    KeyPressMediaPlayPause,
    KeyPressScreenshot,
    OpenFacegazeSettings,
    ToggleFacegaze,
    ToggleScrollMode,
    ToggleVirtualKeyboard,
    CustomKeyCombination,
    /// Internal: produced by the precision-click wrapper, never bound directly.
    TogglePrecisionClick,
}

impl MacroName {
    /// Single-shot clicks that precision mode intercepts.
    pub fn is_instant_click(&self) -> bool {
        matches!(
            self,
            Self::MouseClickLeft
                | Self::MouseClickRight
                | Self::MouseClickLeftDouble
                | Self::MouseClickLeftTriple
        )
    }
}

/// Well-known landmark indices in the face mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceLandmark {
    Forehead,
    ForeheadTop,
    NoseTip,
    LeftTemple,
    RightTemple,
}

impl FaceLandmark {
    pub const ALL: [FaceLandmark; 5] = [
        Self::Forehead,
        Self::ForeheadTop,
        Self::NoseTip,
        Self::LeftTemple,
        Self::RightTemple,
    ];

    pub fn index(&self) -> usize {
        match self {
            Self::Forehead => 8,
            Self::ForeheadTop => 10,
            Self::NoseTip => 4,
            Self::LeftTemple => 162,
            Self::RightTemple => 389,
        }
    }
}

/// Number of points in a full face mesh.
pub const FACE_MESH_POINTS: usize = 478;

/// One blend-shape score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlendshapeScore {
    pub category_name: String,
    pub score: f64,
}

/// 4x4 homogeneous facial transformation, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformMatrix(pub [f64; 16]);

impl TransformMatrix {
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.0[row * 4 + col]
    }
}

/// Per-frame output of the face landmarker. Transient: one per detection tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameResult {
    #[serde(default)]
    pub face_landmarks: Vec<Vec<NormalizedCoord>>,
    #[serde(default)]
    pub face_blendshapes: Vec<BlendshapeScore>,
    #[serde(default)]
    pub facial_transformation_matrixes: Vec<TransformMatrix>,
}

impl FrameResult {
    /// A frame with no landmarks, blend shapes or matrices means no face was seen.
    pub fn is_valid(&self) -> bool {
        !self.face_landmarks.is_empty()
            || !self.face_blendshapes.is_empty()
            || !self.facial_transformation_matrixes.is_empty()
    }

    pub fn confidence(&self, gesture: MediapipeGesture) -> Option<f64> {
        let name = gesture.category_name();
        self.face_blendshapes
            .iter()
            .find(|c| c.category_name == name)
            .map(|c| c.score)
    }

    pub fn landmark(&self, landmark: FaceLandmark) -> Option<NormalizedCoord> {
        self.face_landmarks
            .first()
            .and_then(|points| points.get(landmark.index()))
            .copied()
    }

    pub fn transform(&self) -> Option<&TransformMatrix> {
        self.facial_transformation_matrixes.first()
    }

    pub fn with_gesture(mut self, gesture: MediapipeGesture, score: f64) -> Self {
        self.face_blendshapes.push(BlendshapeScore {
            category_name: gesture.category_name().to_string(),
            score,
        });
        self
    }

    /// Place every mesh point at the same normalized location.
    pub fn with_face_at(mut self, x: f64, y: f64) -> Self {
        self.face_landmarks = vec![vec![NormalizedCoord::new(x, y); FACE_MESH_POINTS]];
        self
    }

    pub fn with_transform(mut self, matrix: TransformMatrix) -> Self {
        self.facial_transformation_matrixes.push(matrix);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseEventType {
    Press,
    Release,
    Move,
}

/// Synthetic pointer event handed to the input sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticMouseEvent {
    pub event_type: MouseEventType,
    pub button: Option<MouseButton>,
    pub x: i32,
    pub y: i32,
    pub click_count: u8,
}

impl SyntheticMouseEvent {
    pub fn new(event_type: MouseEventType, button: Option<MouseButton>, at: ScreenPoint) -> Self {
        SyntheticMouseEvent {
            event_type,
            button,
            x: at.x,
            y: at.y,
            click_count: 1,
        }
    }

    pub fn with_click_count(mut self, click_count: u8) -> Self {
        self.click_count = click_count;
        self
    }
}

/// Virtual key codes used by the fixed key-press macros.
pub mod key_code {
    pub const SPACE: u32 = 32;
    pub const LEFT: u32 = 37;
    pub const UP: u32 = 38;
    pub const RIGHT: u32 = 39;
    pub const DOWN: u32 = 40;
    pub const MEDIA_PLAY_PAUSE: u32 = 179;
    /// Overview key on ChromeOS keyboards.
    pub const MEDIA_LAUNCH_APP1: u32 = 182;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Modifiers {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub search: bool,
}

impl Modifiers {
    pub fn ctrl() -> Self {
        Modifiers {
            ctrl: true,
            ..Default::default()
        }
    }

    fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.ctrl {
            names.push("ctrl");
        }
        if self.alt {
            names.push("alt");
        }
        if self.shift {
            names.push("shift");
        }
        if self.search {
            names.push("search");
        }
        names
    }
}

/// A key plus modifiers, as stored for custom key-combination bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCombination {
    pub key: u32,
    #[serde(default)]
    pub key_display: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl KeyCombination {
    /// e.g. "ctrl + c".
    pub fn display(&self) -> String {
        let mut parts: Vec<&str> = self.modifiers.names();
        parts.push(self.key_display.as_str());
        parts.join(" + ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEventType {
    KeyDown,
    KeyUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticKeyEvent {
    pub event_type: KeyEventType,
    pub key_code: u32,
    pub modifiers: Modifiers,
    pub repeat: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Per-gesture confidence reported to the settings page, as a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureInfo {
    pub gesture: FacialGesture,
    pub confidence: u8,
}

/// Result of an accessibility-tree lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AccessibilityNode {
    #[serde(default)]
    pub offscreen: bool,
    #[serde(default)]
    pub invisible: bool,
    #[serde(default)]
    pub bounds: Option<ScreenBounds>,
}

impl AccessibilityNode {
    pub fn is_visible(&self) -> bool {
        !self.offscreen && !self.invisible && self.bounds.map_or(false, |b| b.has_area())
    }
}
