// Adaptive playback resolver with multi-provider failover.
// The probe binary in src/main.rs uses the same modules.

pub mod config;
pub mod events;
pub mod models;
pub mod player;
pub mod resolver;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use events::{EventBus, EventPayload, EventType, PlayerEvent};
pub use models::{BackendKind, ContentId, ProviderName, StreamDescriptor};
pub use player::{
    PlaybackSession, PlaybackState, PresentationSurface, SessionController, SessionHandle,
    SessionSettings,
};
pub use resolver::{HttpStreamResolver, ResolutionError, StreamResolver, classify};
