use super::types::{EventType, PlayerEvent};
use crate::config::Config;
use crate::models::SessionId;
use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Event subscriber handle
pub struct EventSubscriber {
    receiver: broadcast::Receiver<PlayerEvent>,
    filter: Option<EventFilter>,
}

impl EventSubscriber {
    /// Create a new subscriber with an optional filter
    pub fn new(receiver: broadcast::Receiver<PlayerEvent>, filter: Option<EventFilter>) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next event matching the filter
    pub async fn recv(&mut self) -> Result<PlayerEvent> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Try to receive without blocking
    pub fn try_recv(&mut self) -> Result<Option<PlayerEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Ok(Some(event));
                    }
                    // Continue to next event
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Everything currently queued for this subscriber
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.try_recv() {
            events.push(event);
        }
        events
    }

    fn accepts(&self, event: &PlayerEvent) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter.matches(event))
    }
}

/// Event filter for selective subscription
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    event_types: Option<Vec<EventType>>,
    sessions: Option<Vec<SessionId>>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types(mut self, types: Vec<EventType>) -> Self {
        self.event_types = Some(types);
        self
    }

    pub fn with_sessions(mut self, sessions: Vec<SessionId>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn matches(&self, event: &PlayerEvent) -> bool {
        if let Some(ref types) = self.event_types
            && !types.contains(&event.event_type)
        {
            return false;
        }

        if let Some(ref sessions) = self.sessions
            && !sessions.contains(&event.session_id)
        {
            return false;
        }

        true
    }
}

/// Broadcasts player events to the presentation layer.
///
/// Publishing never blocks and never fails; with no subscribers the event is
/// only kept in the bounded history.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
    inner: Arc<Mutex<BusState>>,
    max_history_size: usize,
}

#[derive(Debug, Default)]
struct BusState {
    history: VecDeque<PlayerEvent>,
    stats: EventBusStats,
}

#[derive(Debug, Clone, Default)]
pub struct EventBusStats {
    pub total_events: u64,
    pub events_by_type: HashMap<String, u64>,
    pub subscriber_count: usize,
    pub dropped_events: u64,
}

impl EventBus {
    /// Create a new event bus with specified buffer capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));

        Self {
            sender,
            inner: Arc::new(Mutex::new(BusState::default())),
            max_history_size: 100, // Keep last 100 events for debugging
        }
    }

    /// Bus sized by `playback.event_capacity`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.playback.event_capacity)
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: PlayerEvent) {
        trace!(
            "Publishing event: {} (session {}, generation {})",
            event.event_type.as_str(),
            event.session_id,
            event.generation
        );

        let delivered = self.sender.send(event.clone()).is_ok();

        if let Ok(mut inner) = self.inner.lock() {
            inner.stats.total_events += 1;
            *inner
                .stats
                .events_by_type
                .entry(event.event_type.as_str().to_string())
                .or_insert(0) += 1;
            if !delivered {
                // No subscribers is normal, don't log
                inner.stats.dropped_events += 1;
            }

            inner.history.push_back(event);
            while inner.history.len() > self.max_history_size {
                inner.history.pop_front();
            }
        }
    }

    /// Subscribe to all events
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber::new(self.sender.subscribe(), None)
    }

    /// Subscribe with a filter
    pub fn subscribe_filtered(&self, filter: EventFilter) -> EventSubscriber {
        EventSubscriber::new(self.sender.subscribe(), Some(filter))
    }

    /// Subscribe to specific event types
    pub fn subscribe_to_types(&self, types: Vec<EventType>) -> EventSubscriber {
        let filter = EventFilter::new().with_types(types);
        self.subscribe_filtered(filter)
    }

    /// Get current subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get event bus statistics
    pub fn stats(&self) -> EventBusStats {
        let mut stats = self
            .inner
            .lock()
            .map(|inner| inner.stats.clone())
            .unwrap_or_default();
        stats.subscriber_count = self.subscriber_count();
        stats
    }

    /// Get event history for debugging
    pub fn history(&self) -> Vec<PlayerEvent> {
        self.inner
            .lock()
            .map(|inner| inner.history.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
