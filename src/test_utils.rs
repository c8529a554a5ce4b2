#![cfg(test)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::config::AdaptiveConfig;
use crate::events::{EventPayload, EventSubscriber, PlayerEvent};
use crate::models::{ContentId, ProviderName, StreamDescriptor};
use crate::player::errors::AttachError;
use crate::player::signal::Envelope;
use crate::player::traits::{
    AdaptiveEngine, AdaptiveEngineFactory, EmbedFrame, EngineEvent, EngineLevel, FrameEvent,
    PresentationSurface, VideoElement, VideoEvent,
};
use crate::player::{EventSink, PlaybackSession, PlaybackState, SessionSettings};
use crate::resolver::{ResolutionError, StreamResolver};

type ResolveResult = Result<StreamDescriptor, ResolutionError>;

/// Resolver answering from per-provider scripts.
///
/// Responses are consumed in order and the last one repeats forever.
/// Providers without a script fail with a provider error.
#[derive(Default)]
pub struct MockResolver {
    scripts: Mutex<HashMap<String, VecDeque<ResolveResult>>>,
    calls: Mutex<Vec<(ContentId, ProviderName)>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl MockResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, provider: &str, responses: Vec<ResolveResult>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(provider.to_string(), responses.into());
    }

    pub fn succeed(&self, provider: &str, url: &str) {
        self.script(provider, vec![Ok(StreamDescriptor::new(url))]);
    }

    pub fn fail(&self, provider: &str, message: &str) {
        self.script(
            provider,
            vec![Err(ResolutionError::Provider(message.to_string()))],
        );
    }

    /// Hold the next resolve until the returned sender fires or is dropped
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn calls(&self) -> Vec<(ContentId, ProviderName)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn providers_called(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|(_, provider)| provider.to_string())
            .collect()
    }

    fn next_response(&self, provider: &ProviderName) -> ResolveResult {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(provider.as_str()) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or(Err(ResolutionError::NoPlayableStream)),
            None => Err(ResolutionError::Provider(format!(
                "{} is not scripted",
                provider
            ))),
        }
    }
}

#[async_trait]
impl StreamResolver for MockResolver {
    async fn resolve(
        &self,
        content_id: &ContentId,
        provider: &ProviderName,
    ) -> Result<StreamDescriptor, ResolutionError> {
        self.calls
            .lock()
            .unwrap()
            .push((content_id.clone(), provider.clone()));

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        self.next_response(provider)
    }
}

/// Everything the mock surface has been asked to do
#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub video_source: Option<String>,
    pub video_visible: bool,
    pub video_sink: Option<EventSink<VideoEvent>>,
    pub frame_url: Option<String>,
    pub frame_visible: bool,
    pub frame_sink: Option<EventSink<FrameEvent>>,
    pub engine_sink: Option<EventSink<EngineEvent>>,
    pub engine_supported: bool,
    pub native_hls: bool,
    pub engine_levels: Vec<EngineLevel>,
    pub engine_load_error: Option<AttachError>,
    pub engine_config: Option<AdaptiveConfig>,
    pub engines_created: usize,
    pub engines_destroyed: usize,
    pub engine_calls: Vec<String>,
    pub frame_loads: Vec<String>,
}

impl SurfaceLog {
    pub fn engines_alive(&self) -> usize {
        self.engines_created - self.engines_destroyed
    }

    /// Backends currently bound to the surface
    pub fn live_attachments(&self) -> usize {
        usize::from(self.video_sink.is_some()) + usize::from(self.frame_sink.is_some())
    }
}

pub type SharedLog = Arc<Mutex<SurfaceLog>>;

struct MockVideo(SharedLog);

impl VideoElement for MockVideo {
    fn set_source(&mut self, url: &str) {
        self.0.lock().unwrap().video_source = Some(url.to_string());
    }

    fn clear_source(&mut self) {
        self.0.lock().unwrap().video_source = None;
    }

    fn set_visible(&mut self, visible: bool) {
        self.0.lock().unwrap().video_visible = visible;
    }

    fn can_play_native_hls(&self) -> bool {
        self.0.lock().unwrap().native_hls
    }

    fn bind_events(&mut self, sink: EventSink<VideoEvent>) {
        self.0.lock().unwrap().video_sink = Some(sink);
    }

    fn unbind_events(&mut self) {
        self.0.lock().unwrap().video_sink = None;
    }
}

struct MockFrame(SharedLog);

impl EmbedFrame for MockFrame {
    fn load(&mut self, url: &str, sink: EventSink<FrameEvent>) {
        let mut log = self.0.lock().unwrap();
        log.frame_url = Some(url.to_string());
        log.frame_loads.push(url.to_string());
        log.frame_sink = Some(sink);
    }

    fn unload(&mut self) {
        let mut log = self.0.lock().unwrap();
        log.frame_url = None;
        log.frame_sink = None;
    }

    fn set_visible(&mut self, visible: bool) {
        self.0.lock().unwrap().frame_visible = visible;
    }
}

struct MockEngineFactory(SharedLog);

impl AdaptiveEngineFactory for MockEngineFactory {
    fn is_supported(&self) -> bool {
        self.0.lock().unwrap().engine_supported
    }

    fn create(&self, config: &AdaptiveConfig) -> Box<dyn AdaptiveEngine> {
        let mut log = self.0.lock().unwrap();
        log.engines_created += 1;
        log.engine_config = Some(config.clone());
        Box::new(MockEngine {
            log: self.0.clone(),
            destroyed: false,
        })
    }
}

struct MockEngine {
    log: SharedLog,
    destroyed: bool,
}

impl AdaptiveEngine for MockEngine {
    fn load_source(
        &mut self,
        url: &str,
        video: &mut dyn VideoElement,
        sink: EventSink<EngineEvent>,
    ) -> Result<(), AttachError> {
        let mut log = self.log.lock().unwrap();
        if let Some(error) = log.engine_load_error.clone() {
            return Err(error);
        }
        log.engine_calls.push(format!("load_source {}", url));
        log.engine_sink = Some(sink);
        drop(log);

        // The engine feeds the element through a media source
        video.set_source("blob:media-source");
        Ok(())
    }

    fn start_load(&mut self) {
        self.log
            .lock()
            .unwrap()
            .engine_calls
            .push("start_load".to_string());
    }

    fn recover_media_error(&mut self) {
        self.log
            .lock()
            .unwrap()
            .engine_calls
            .push("recover_media_error".to_string());
    }

    fn levels(&self) -> Vec<EngineLevel> {
        self.log.lock().unwrap().engine_levels.clone()
    }

    fn set_current_level(&mut self, level: Option<usize>) {
        self.log
            .lock()
            .unwrap()
            .engine_calls
            .push(format!("set_current_level {:?}", level));
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        let mut log = self.log.lock().unwrap();
        log.engines_destroyed += 1;
        log.engine_sink = None;
    }
}

/// Presentation surface recording into a shared log
#[derive(Clone)]
pub struct MockSurface {
    pub log: SharedLog,
}

impl MockSurface {
    pub fn new() -> Self {
        let log = SurfaceLog {
            engine_supported: true,
            ..SurfaceLog::default()
        };
        Self {
            log: Arc::new(Mutex::new(log)),
        }
    }

    pub fn surface(&self) -> PresentationSurface {
        PresentationSurface::new(
            Box::new(MockVideo(self.log.clone())),
            Box::new(MockFrame(self.log.clone())),
            Arc::new(MockEngineFactory(self.log.clone())),
        )
    }

    pub fn configure(&self, f: impl FnOnce(&mut SurfaceLog)) {
        f(&mut self.log.lock().unwrap());
    }

    pub fn inspect<T>(&self, f: impl FnOnce(&SurfaceLog) -> T) -> T {
        f(&self.log.lock().unwrap())
    }

    pub fn emit_video(&self, event: VideoEvent) -> bool {
        let sink = self.log.lock().unwrap().video_sink.clone();
        sink.is_some_and(|sink| sink.emit(event))
    }

    pub fn emit_frame(&self, event: FrameEvent) -> bool {
        let sink = self.log.lock().unwrap().frame_sink.clone();
        sink.is_some_and(|sink| sink.emit(event))
    }

    pub fn emit_engine(&self, event: EngineEvent) -> bool {
        let sink = self.log.lock().unwrap().engine_sink.clone();
        sink.is_some_and(|sink| sink.emit(event))
    }
}

/// A session wired to mocks, driven by hand
pub struct Harness {
    pub session: PlaybackSession,
    pub signals: mpsc::UnboundedReceiver<Envelope>,
    pub resolver: Arc<MockResolver>,
    pub surface: MockSurface,
    pub events: EventSubscriber,
}

impl Harness {
    pub fn new(providers: &[&str]) -> Self {
        let settings = SessionSettings::new(providers.iter().map(|p| ProviderName::new(*p)).collect())
            .unwrap();
        Self::with_settings(settings)
    }

    pub fn with_settings(settings: SessionSettings) -> Self {
        let resolver = MockResolver::new();
        let surface = MockSurface::new();
        let bus = crate::events::EventBus::new(1024);
        let events = bus.subscribe();
        let (session, signals) =
            PlaybackSession::new(settings, resolver.clone(), surface.surface(), bus);

        Self {
            session,
            signals,
            resolver,
            surface,
            events,
        }
    }

    pub fn start(&mut self, content_id: &str) {
        self.session.start(ContentId::new(content_id)).unwrap();
    }

    /// Deliver pending completions until the session goes quiet
    pub async fn settle(&mut self) {
        while let Ok(Some(envelope)) =
            tokio::time::timeout(Duration::from_millis(20), self.signals.recv()).await
        {
            self.session.handle_signal(envelope);
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.session.state()
    }

    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        self.events.drain()
    }

    /// State transitions published since the last drain
    pub fn drain_states(&mut self) -> Vec<PlaybackState> {
        self.drain_events()
            .into_iter()
            .filter_map(|event| match event.payload {
                EventPayload::StateChanged { state, .. } => Some(state),
                _ => None,
            })
            .collect()
    }
}
