use std::fmt;
use tokio::sync::mpsc;

use super::traits::{EngineEvent, FrameEvent, VideoEvent};
use crate::models::StreamDescriptor;
use crate::resolver::ResolutionError;

/// Asynchronous completion tagged with the session generation that caused it.
///
/// The session drops envelopes whose generation is no longer current, so a
/// late resolve or a callback from a detached backend cannot touch state.
#[derive(Debug)]
pub struct Envelope {
    pub(crate) generation: u64,
    pub(crate) signal: Signal,
}

impl Envelope {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
pub(crate) enum Signal {
    Resolved(Result<StreamDescriptor, ResolutionError>),
    Backend(BackendEvent),
}

/// Callback raised by whatever currently holds the presentation surface
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Engine(EngineEvent),
    Video(VideoEvent),
    Frame(FrameEvent),
    /// The embed load budget ran out
    EmbedTimeout,
}

/// Write end handed to presentation-surface callbacks.
///
/// Bound to the generation of the attach that created it; emitting after the
/// session moved on is harmless.
pub struct EventSink<T> {
    generation: u64,
    tx: mpsc::UnboundedSender<Envelope>,
    wrap: fn(T) -> BackendEvent,
}

impl<T> EventSink<T> {
    /// Returns false once the session is gone
    pub fn emit(&self, event: T) -> bool {
        self.tx
            .send(Envelope {
                generation: self.generation,
                signal: Signal::Backend((self.wrap)(event)),
            })
            .is_ok()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<T> Clone for EventSink<T> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            tx: self.tx.clone(),
            wrap: self.wrap,
        }
    }
}

impl<T> fmt::Debug for EventSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Generation-stamped sender used for one playback attempt
#[derive(Debug, Clone)]
pub(crate) struct Dispatcher {
    generation: u64,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Dispatcher {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { generation, tx }
    }

    pub(crate) fn sink<T>(&self, wrap: fn(T) -> BackendEvent) -> EventSink<T> {
        EventSink {
            generation: self.generation,
            tx: self.tx.clone(),
            wrap,
        }
    }

    pub(crate) fn send(&self, signal: Signal) -> bool {
        self.tx
            .send(Envelope {
                generation: self.generation,
                signal,
            })
            .is_ok()
    }
}
