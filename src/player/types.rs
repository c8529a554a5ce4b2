// Common types used by the playback session
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{BackendKind, ProviderName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    Idle,
    Resolving,
    Attaching,
    Playing,
    /// Attach failed before the first frame; same provider is tried again
    SoftError,
    /// Provider given up on; failover follows immediately
    HardError,
    /// Every provider failed during the current pass. Only `start` leaves it.
    Exhausted,
}

impl PlaybackState {
    /// States the session passes through without waiting on the caller
    pub fn is_transient(&self) -> bool {
        matches!(self, PlaybackState::SoftError | PlaybackState::HardError)
    }

    /// Work is in flight towards a playing stream
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            PlaybackState::Resolving
                | PlaybackState::Attaching
                | PlaybackState::SoftError
                | PlaybackState::HardError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Resolving => "resolving",
            PlaybackState::Attaching => "attaching",
            PlaybackState::Playing => "playing",
            PlaybackState::SoftError => "soft-error",
            PlaybackState::HardError => "hard-error",
            PlaybackState::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const DEBUG_URL_LIMIT: usize = 100;

/// Snapshot for the debug overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub provider: Option<ProviderName>,
    /// Current stream URL, shortened for display
    pub url: Option<String>,
    pub backend: Option<BackendKind>,
    pub state: PlaybackState,
    pub retry_count: u32,
    pub generation: u64,
}

impl DebugInfo {
    pub fn truncate_url(url: &str) -> String {
        if url.chars().count() <= DEBUG_URL_LIMIT {
            url.to_string()
        } else {
            let head: String = url.chars().take(DEBUG_URL_LIMIT).collect();
            format!("{}...", head)
        }
    }
}

impl fmt::Display for DebugInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Provider: {} | Type: {} | State: {} | Retries: {} | URL: {}",
            self.provider
                .as_ref()
                .map(|p| p.as_str())
                .unwrap_or("-"),
            self.backend.map(|b| b.label()).unwrap_or("-"),
            self.state,
            self.retry_count,
            self.url.as_deref().unwrap_or("-"),
        )
    }
}
