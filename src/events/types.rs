use serde::{Deserialize, Serialize};

use crate::models::{BackendKind, ProviderFailure, ProviderName, QualityEntry, SessionId};
use crate::player::PlaybackState;

/// Event emitted by a playback session towards the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerEvent {
    pub id: String,
    pub event_type: EventType,
    pub payload: EventPayload,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub session_id: SessionId,
    /// Session generation that produced the event
    pub generation: u64,
}

impl PlayerEvent {
    pub fn new(session_id: SessionId, generation: u64, payload: EventPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: payload.event_type(),
            payload,
            timestamp: chrono::Utc::now(),
            session_id,
            generation,
        }
    }
}

/// Event types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventType {
    StateChanged,
    Ready,
    FatalError,
    QualityLevelsChanged,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::StateChanged => "playback.state_changed",
            EventType::Ready => "playback.ready",
            EventType::FatalError => "playback.fatal_error",
            EventType::QualityLevelsChanged => "playback.quality_levels_changed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum EventPayload {
    /// Every transition, including the transient error states.
    /// Drives loading indicators in the UI.
    StateChanged {
        state: PlaybackState,
        provider: Option<ProviderName>,
        retry_count: u32,
    },
    /// `onReady`: the presentation surface now shows the stream
    Ready {
        provider: ProviderName,
        backend: BackendKind,
    },
    /// `onFatalError`: published once, when every provider is exhausted
    FatalError {
        reason: String,
        failures: Vec<ProviderFailure>,
    },
    /// `onQualityLevelsChanged`: rebuilt on every manifest load
    QualityLevelsChanged { levels: Vec<QualityEntry> },
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::StateChanged { .. } => EventType::StateChanged,
            EventPayload::Ready { .. } => EventType::Ready,
            EventPayload::FatalError { .. } => EventType::FatalError,
            EventPayload::QualityLevelsChanged { .. } => EventType::QualityLevelsChanged,
        }
    }
}
