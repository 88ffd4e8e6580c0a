//! Error taxonomy for configuration and for a turn.
//!
//! Nothing below the session controller recovers from these; the controller
//! turns any of them into the `Error` state plus a stored message.

use crate::habitat::HabitatIntegrityError;
use thiserror::Error;

/// Session configuration could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown capability profile: {0}")]
    UnknownProfile(String),
}

/// A generation service was unreachable or reported a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("narrative generation failed: {0}")]
    Narrative(String),

    #[error("image generation failed: {0}")]
    Image(String),
}

/// A reply arrived but is structurally unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("reply is not a valid scene: {message}")]
    Parse { message: String, raw: String },

    #[error("scene reply is malformed: {reason}")]
    Invalid { reason: String, raw: String },

    #[error("habitat integrity violated: {0}")]
    Habitat(#[from] HabitatIntegrityError),
}

impl FormatError {
    /// The offending reply text, kept for diagnostics.
    pub fn raw(&self) -> Option<&str> {
        match self {
            FormatError::Parse { raw, .. } | FormatError::Invalid { raw, .. } => Some(raw),
            FormatError::Habitat(_) => None,
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>, raw: &str) -> Self {
        FormatError::Invalid {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

/// Why a turn did not produce a scene.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

impl From<HabitatIntegrityError> for SceneError {
    fn from(err: HabitatIntegrityError) -> Self {
        SceneError::Format(FormatError::Habitat(err))
    }
}
