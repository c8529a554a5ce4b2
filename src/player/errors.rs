use std::time::Duration;
use thiserror::Error;

use crate::resolver::ResolutionError;

/// Failure to bring a backend to its first ready signal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachError {
    #[error("Attach failed: {0}")]
    Failed(String),

    #[error("Attach timed out after {0:?}")]
    Timeout(Duration),

    /// Neither the adaptive engine nor the element can play the manifest
    #[error("Adaptive streaming is not supported by this surface")]
    Unsupported,
}

/// Everything that can end a playback attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Attach(#[from] AttachError),

    /// Failure after the backend reported ready
    #[error("Playback failed: {0}")]
    Fatal(String),
}

impl PlaybackError {
    /// Short reason recorded against the provider
    pub fn reason(&self) -> String {
        match self {
            PlaybackError::Resolution(err) => err.reason(),
            PlaybackError::Attach(AttachError::Timeout(_)) => "timeout".to_string(),
            PlaybackError::Attach(err) => err.to_string(),
            PlaybackError::Fatal(msg) => msg.clone(),
        }
    }
}

/// Misuse of the session API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No playback session is active")]
    NoActiveSession,

    #[error("All providers are exhausted; start the session again")]
    Exhausted,

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Content id must not be empty")]
    EmptyContentId,

    #[error("Quality selection requires an adaptive stream")]
    QualityUnavailable,

    #[error("Quality level {0} does not exist")]
    InvalidQualityLevel(usize),
}
