use thiserror::Error;

use crate::io::progress::JobState;

/// Central error type for the audio-cleanup-core crate.
#[derive(Debug, Error)]
pub enum CleanupError {
    // Generic fallback (wraps anyhow)
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Failed to encode audio: {0}")]
    Encode(String),

    #[error("{step} failed: {reason}")]
    Transform { step: &'static str, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid cleanup options: {0}")]
    Options(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CleanupError {
    pub(crate) fn transform(step: &'static str, reason: impl Into<String>) -> Self {
        CleanupError::Transform {
            step,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CleanupError {
    fn from(e: serde_json::Error) -> Self {
        CleanupError::Options(e.to_string())
    }
}

impl From<hound::Error> for CleanupError {
    fn from(e: hound::Error) -> Self {
        CleanupError::Encode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CleanupError>;

/// Rejected job state transitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("Job already finished in state {0:?}")]
    AlreadyTerminal(JobState),

    #[error("Invalid job transition {from:?} -> {to:?}")]
    InvalidTransition { from: JobState, to: JobState },

    #[error("Progress went backwards: {from} -> {to}")]
    ProgressRegressed { from: u8, to: u8 },
}
