pub mod adapter;
pub mod adaptive;
pub mod controller;
pub mod embed;
pub mod errors;
pub mod progressive;
pub mod session;
pub mod signal;
pub mod traits;
pub mod types;


pub use adapter::{Adapter, AdapterEvent, AttachFailure};
pub use controller::{SessionCommand, SessionController, SessionHandle};
pub use embed::EmbedProxy;
pub use errors::{AttachError, PlaybackError, SessionError};
pub use session::{PlaybackSession, SessionSettings};
pub use signal::{BackendEvent, Envelope, EventSink};
pub use traits::{
    AdaptiveEngine, AdaptiveEngineFactory, EmbedFrame, EngineErrorKind, EngineEvent, EngineLevel,
    FrameEvent, PresentationSurface, VideoElement, VideoEvent,
};
pub use types::{DebugInfo, PlaybackState};
