use mirrorplay::config::AdaptiveConfig;
use mirrorplay::player::{
    AdaptiveEngine, AdaptiveEngineFactory, AttachError, EmbedFrame, EngineEvent, EngineLevel,
    EventSink, FrameEvent, PresentationSurface, VideoElement, VideoEvent,
};
use std::sync::{Arc, Mutex};

/// Sinks and calls captured from the session under test
#[derive(Default)]
pub struct Recorded {
    pub video_sink: Option<EventSink<VideoEvent>>,
    pub frame_sink: Option<EventSink<FrameEvent>>,
    pub engine_sink: Option<EventSink<EngineEvent>>,
    pub video_source: Option<String>,
    pub frame_url: Option<String>,
    pub levels: Vec<EngineLevel>,
    pub engines_alive: usize,
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub recorded: Arc<Mutex<Recorded>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_levels(heights: &[u32]) -> Self {
        let surface = Self::new();
        surface.recorded.lock().unwrap().levels = heights
            .iter()
            .map(|height| EngineLevel {
                height: Some(*height),
                bitrate: None,
            })
            .collect();
        surface
    }

    pub fn surface(&self) -> PresentationSurface {
        PresentationSurface::new(
            Box::new(Video(self.recorded.clone())),
            Box::new(Frame(self.recorded.clone())),
            Arc::new(Engines(self.recorded.clone())),
        )
    }

    pub fn manifest_parsed(&self) -> bool {
        let sink = self.recorded.lock().unwrap().engine_sink.clone();
        sink.is_some_and(|sink| sink.emit(EngineEvent::ManifestParsed))
    }

    pub fn can_play(&self) -> bool {
        let sink = self.recorded.lock().unwrap().video_sink.clone();
        sink.is_some_and(|sink| sink.emit(VideoEvent::CanPlay))
    }

    pub fn frame_loaded(&self) -> bool {
        let sink = self.recorded.lock().unwrap().frame_sink.clone();
        sink.is_some_and(|sink| sink.emit(FrameEvent::Loaded))
    }

    pub fn frame_url(&self) -> Option<String> {
        self.recorded.lock().unwrap().frame_url.clone()
    }

    pub fn engines_alive(&self) -> usize {
        self.recorded.lock().unwrap().engines_alive
    }
}

struct Video(Arc<Mutex<Recorded>>);

impl VideoElement for Video {
    fn set_source(&mut self, url: &str) {
        self.0.lock().unwrap().video_source = Some(url.to_string());
    }

    fn clear_source(&mut self) {
        self.0.lock().unwrap().video_source = None;
    }

    fn set_visible(&mut self, _visible: bool) {}

    fn bind_events(&mut self, sink: EventSink<VideoEvent>) {
        self.0.lock().unwrap().video_sink = Some(sink);
    }

    fn unbind_events(&mut self) {
        self.0.lock().unwrap().video_sink = None;
    }
}

struct Frame(Arc<Mutex<Recorded>>);

impl EmbedFrame for Frame {
    fn load(&mut self, url: &str, sink: EventSink<FrameEvent>) {
        let mut recorded = self.0.lock().unwrap();
        recorded.frame_url = Some(url.to_string());
        recorded.frame_sink = Some(sink);
    }

    fn unload(&mut self) {
        let mut recorded = self.0.lock().unwrap();
        recorded.frame_url = None;
        recorded.frame_sink = None;
    }

    fn set_visible(&mut self, _visible: bool) {}
}

struct Engines(Arc<Mutex<Recorded>>);

impl AdaptiveEngineFactory for Engines {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(&self, _config: &AdaptiveConfig) -> Box<dyn AdaptiveEngine> {
        self.0.lock().unwrap().engines_alive += 1;
        Box::new(Engine(self.0.clone()))
    }
}

struct Engine(Arc<Mutex<Recorded>>);

impl AdaptiveEngine for Engine {
    fn load_source(
        &mut self,
        _url: &str,
        _video: &mut dyn VideoElement,
        sink: EventSink<EngineEvent>,
    ) -> Result<(), AttachError> {
        self.0.lock().unwrap().engine_sink = Some(sink);
        Ok(())
    }

    fn start_load(&mut self) {}

    fn recover_media_error(&mut self) {}

    fn levels(&self) -> Vec<EngineLevel> {
        self.0.lock().unwrap().levels.clone()
    }

    fn set_current_level(&mut self, _level: Option<usize>) {}

    fn destroy(&mut self) {
        let mut recorded = self.0.lock().unwrap();
        recorded.engines_alive -= 1;
        recorded.engine_sink = None;
    }
}
