use std::sync::Arc;

use super::errors::AttachError;
use super::signal::EventSink;
use crate::config::AdaptiveConfig;

/// Callbacks raised by the native video element
#[derive(Debug, Clone, PartialEq)]
pub enum VideoEvent {
    CanPlay,
    Error(String),
}

/// Callbacks raised by the sandboxed embed frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    Loaded,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Network,
    Media,
    Other,
}

/// Callbacks raised by the adaptive-bitrate engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Manifest loaded; `AdaptiveEngine::levels` is now populated
    ManifestParsed,
    Error {
        kind: EngineErrorKind,
        fatal: bool,
        details: String,
    },
}

/// One variant as the engine reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineLevel {
    pub height: Option<u32>,
    pub bitrate: Option<u64>,
}

/// Native playback element of the presentation surface
pub trait VideoElement: Send {
    fn set_source(&mut self, url: &str);
    fn clear_source(&mut self);
    fn set_visible(&mut self, visible: bool);
    /// Whether the element plays HLS manifests without an engine
    fn can_play_native_hls(&self) -> bool {
        false
    }
    fn bind_events(&mut self, sink: EventSink<VideoEvent>);
    fn unbind_events(&mut self);
}

/// Sandboxed frame used for delegated embeds
pub trait EmbedFrame: Send {
    fn load(&mut self, url: &str, sink: EventSink<FrameEvent>);
    /// Blank the frame and drop its callbacks
    fn unload(&mut self);
    fn set_visible(&mut self, visible: bool);
}

/// Adaptive-bitrate decode engine bound to the video element
pub trait AdaptiveEngine: Send {
    fn load_source(
        &mut self,
        url: &str,
        video: &mut dyn VideoElement,
        sink: EventSink<EngineEvent>,
    ) -> Result<(), AttachError>;
    fn start_load(&mut self);
    fn recover_media_error(&mut self);
    fn levels(&self) -> Vec<EngineLevel>;
    /// `None` hands level choice back to the engine
    fn set_current_level(&mut self, level: Option<usize>);
    /// Release the engine and detach it from the element
    fn destroy(&mut self);
}

pub trait AdaptiveEngineFactory: Send + Sync {
    fn is_supported(&self) -> bool;
    fn create(&self, config: &AdaptiveConfig) -> Box<dyn AdaptiveEngine>;
}

/// Everything a backend needs to show a stream.
///
/// Exactly one value exists per session and it is moved into the attached
/// adapter, so two backends can never hold it at once.
pub struct PresentationSurface {
    pub video: Box<dyn VideoElement>,
    pub frame: Box<dyn EmbedFrame>,
    pub engines: Arc<dyn AdaptiveEngineFactory>,
}

impl PresentationSurface {
    pub fn new(
        video: Box<dyn VideoElement>,
        frame: Box<dyn EmbedFrame>,
        engines: Arc<dyn AdaptiveEngineFactory>,
    ) -> Self {
        Self {
            video,
            frame,
            engines,
        }
    }

    pub fn hide_all(&mut self) {
        self.video.set_visible(false);
        self.frame.set_visible(false);
    }
}
