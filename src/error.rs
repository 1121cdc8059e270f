// Typed errors with thiserror. Surface meaningful messages to JS.
// See DESIGN.md: Error handling

use thiserror::Error;

use crate::types::{FacialGesture, MacroName};

/// FaceGaze error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FaceGazeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A custom key combination macro was requested for a gesture with no
    /// configured combination. Bindings and key combinations are out of sync.
    #[error("No key combination configured for gesture {gesture:?}")]
    MissingKeyCombination { gesture: FacialGesture },

    #[error("Macro {macro_name:?} cannot run in the current context: {reason}")]
    ContextCheckFailed {
        macro_name: MacroName,
        reason: String,
    },

    #[error("Macro {macro_name:?} failed: {reason}")]
    MacroFailed {
        macro_name: MacroName,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FaceGazeError {
    fn from(err: serde_json::Error) -> Self {
        FaceGazeError::Serialization(err.to_string())
    }
}
