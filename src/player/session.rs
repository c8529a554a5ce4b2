use anyhow::{Result, bail};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, info, trace, warn};

use super::adapter::{Adapter, AdapterEvent, AttachContext};
use super::embed::EmbedProxy;
use super::errors::{PlaybackError, SessionError};
use super::signal::{BackendEvent, Dispatcher, Envelope, Signal};
use super::traits::PresentationSurface;
use super::types::{DebugInfo, PlaybackState};
use crate::config::{AdaptiveConfig, Config, ResolverConfig};
use crate::events::{EventBus, EventPayload, PlayerEvent};
use crate::models::{
    BackendKind, ContentId, ProviderFailure, ProviderName, QualityEntry, QualitySelection,
    SessionId, StreamDescriptor,
};
use crate::resolver::{ResolutionError, StreamResolver, classify};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(15);

/// Fixed per-session policy
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Failover order, never empty
    pub providers: Vec<ProviderName>,
    pub max_retries: u32,
    pub embed_timeout: Duration,
    pub adaptive: AdaptiveConfig,
    pub proxy: EmbedProxy,
}

impl SessionSettings {
    pub fn new(providers: Vec<ProviderName>) -> Result<Self> {
        if providers.is_empty() {
            bail!("A playback session needs at least one provider");
        }
        let mut seen = HashSet::new();
        for provider in &providers {
            if provider.is_blank() {
                bail!("Provider names must not be empty");
            }
            if !seen.insert(provider.as_str().to_lowercase()) {
                bail!("Provider '{}' listed more than once", provider);
            }
        }

        Ok(Self {
            providers,
            max_retries: DEFAULT_MAX_RETRIES,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
            adaptive: AdaptiveConfig::default(),
            proxy: EmbedProxy::from_config(&ResolverConfig::default()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let providers = config
            .playback
            .providers
            .iter()
            .map(|p| ProviderName::new(p.trim()))
            .collect();

        Ok(Self::new(providers)?
            .with_max_retries(config.playback.max_retries)
            .with_embed_timeout(config.playback.embed_timeout())
            .with_adaptive(config.adaptive.clone())
            .with_proxy(EmbedProxy::from_config(&config.resolver)))
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    pub fn with_adaptive(mut self, adaptive: AdaptiveConfig) -> Self {
        self.adaptive = adaptive;
        self
    }

    pub fn with_proxy(mut self, proxy: EmbedProxy) -> Self {
        self.proxy = proxy;
        self
    }
}

/// One playback session: picks a provider, attaches the matching backend and
/// fails over until something plays or every provider has failed.
///
/// All state changes happen through `&mut self`, driven by the public
/// operations and by [`PlaybackSession::handle_signal`] for asynchronous
/// completions. Completions are stamped with the generation current when the
/// work was started; the generation moves on every attempt and every stop, so
/// anything older is discarded on arrival.
///
/// Exhaustion is tracked with a per-pass failure counter rather than by
/// comparing the provider pointer with its starting point. A pass begins on
/// `start`, on `switch_provider` and whenever a provider reaches `Playing`;
/// once as many providers have hard-failed within the pass as there are
/// providers, the session is `Exhausted`.
pub struct PlaybackSession {
    id: SessionId,
    settings: SessionSettings,
    resolver: Arc<dyn StreamResolver>,
    events: EventBus,
    signals: mpsc::UnboundedSender<Envelope>,

    // Held here while nothing is attached, inside the adapter otherwise
    surface: Option<PresentationSurface>,
    adapter: Option<Adapter>,
    in_flight: Option<AbortOnDropHandle<()>>,

    state: PlaybackState,
    content_id: Option<ContentId>,
    provider_index: usize,
    retry_count: u32,
    generation: u64,
    failures_in_pass: usize,
    pass_failures: Vec<ProviderFailure>,
    last_url: Option<String>,
    active_backend: Option<BackendKind>,
}

impl PlaybackSession {
    pub fn new(
        settings: SessionSettings,
        resolver: Arc<dyn StreamResolver>,
        surface: PresentationSurface,
        events: EventBus,
    ) -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (signals, receiver) = mpsc::unbounded_channel();

        let session = Self {
            id: SessionId::new(),
            settings,
            resolver,
            events,
            signals,
            surface: Some(surface),
            adapter: None,
            in_flight: None,
            state: PlaybackState::Idle,
            content_id: None,
            provider_index: 0,
            retry_count: 0,
            generation: 0,
            failures_in_pass: 0,
            pass_failures: Vec::new(),
            last_url: None,
            active_backend: None,
        };

        (session, receiver)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn provider_index(&self) -> usize {
        self.provider_index
    }

    pub fn content_id(&self) -> Option<&ContentId> {
        self.content_id.as_ref()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Provider the session is on, `None` before `start`
    pub fn current_provider(&self) -> Option<&ProviderName> {
        self.content_id
            .as_ref()
            .map(|_| &self.settings.providers[self.provider_index])
    }

    pub fn active_backend(&self) -> Option<BackendKind> {
        self.active_backend
    }

    /// Failures recorded in the current exhaustion pass
    pub fn failures(&self) -> &[ProviderFailure] {
        &self.pass_failures
    }

    /// 0 or 1
    pub fn attached_adapter_count(&self) -> usize {
        usize::from(self.adapter.is_some())
    }

    /// Begin playback of `content_id` from the first provider
    pub fn start(&mut self, content_id: ContentId) -> Result<(), SessionError> {
        if content_id.is_blank() {
            return Err(SessionError::EmptyContentId);
        }

        info!("Session {}: starting playback of {}", self.id, content_id);

        self.content_id = Some(content_id);
        self.provider_index = 0;
        self.retry_count = 0;
        self.reset_pass();
        self.begin_resolve();
        Ok(())
    }

    /// Jump to a named provider and try it from scratch. Not available once
    /// the session is `Exhausted`; only `start` leaves that state.
    pub fn switch_provider(&mut self, provider: &ProviderName) -> Result<(), SessionError> {
        let index = self
            .settings
            .providers
            .iter()
            .position(|p| p.as_str().eq_ignore_ascii_case(provider.as_str()))
            .ok_or_else(|| SessionError::UnknownProvider(provider.to_string()))?;

        if self.state == PlaybackState::Exhausted {
            return Err(SessionError::Exhausted);
        }
        if self.content_id.is_none() {
            return Err(SessionError::NoActiveSession);
        }

        info!("Session {}: switching to provider {}", self.id, provider);

        self.provider_index = index;
        self.retry_count = 0;
        self.reset_pass();
        self.begin_resolve();
        Ok(())
    }

    /// Try the current provider again; fails over once its budget is spent
    pub fn retry(&mut self) -> Result<(), SessionError> {
        if self.state == PlaybackState::Exhausted {
            return Err(SessionError::Exhausted);
        }
        if self.content_id.is_none() {
            return Err(SessionError::NoActiveSession);
        }

        if self.retry_count < self.settings.max_retries {
            self.retry_count += 1;
            info!(
                "Session {}: manual retry {}/{}",
                self.id, self.retry_count, self.settings.max_retries
            );
            self.begin_resolve();
        } else {
            self.hard_error(PlaybackError::Fatal("retry budget spent".to_string()));
        }
        Ok(())
    }

    /// Cancel everything and go back to `Idle`. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        self.teardown();
        if let Some(surface) = self.surface.as_mut() {
            surface.hide_all();
        }

        self.content_id = None;
        self.provider_index = 0;
        self.retry_count = 0;
        self.reset_pass();

        if self.state != PlaybackState::Idle {
            info!("Session {}: destroyed", self.id);
            self.transition(PlaybackState::Idle);
        }
    }

    pub fn quality_levels(&self) -> Vec<QualityEntry> {
        self.adapter
            .as_ref()
            .map(Adapter::quality_levels)
            .unwrap_or_default()
    }

    pub fn select_quality(&mut self, selection: QualitySelection) -> Result<(), SessionError> {
        match self.adapter.as_mut() {
            Some(adapter) => adapter.select_quality(selection),
            None => Err(SessionError::NoActiveSession),
        }
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            provider: self.current_provider().cloned(),
            url: self.last_url.as_deref().map(DebugInfo::truncate_url),
            backend: self.active_backend,
            state: self.state,
            retry_count: self.retry_count,
            generation: self.generation,
        }
    }

    /// Feed an asynchronous completion back into the state machine
    pub fn handle_signal(&mut self, envelope: Envelope) {
        if envelope.generation != self.generation {
            trace!(
                "Session {}: dropping stale signal (generation {} != {})",
                self.id, envelope.generation, self.generation
            );
            return;
        }

        match envelope.signal {
            Signal::Resolved(result) => self.on_resolved(result),
            Signal::Backend(event) => self.on_backend_event(event),
        }
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.generation, self.signals.clone())
    }

    fn reset_pass(&mut self) {
        self.failures_in_pass = 0;
        self.pass_failures.clear();
    }

    /// Invalidate outstanding work and release the surface
    fn teardown(&mut self) {
        self.generation += 1;
        self.in_flight = None;

        if let Some(adapter) = self.adapter.take() {
            debug!("Session {}: detaching {} backend", self.id, adapter.kind());
            self.surface = Some(adapter.detach());
        }

        self.active_backend = None;
        self.last_url = None;
    }

    fn transition(&mut self, state: PlaybackState) {
        debug!(
            "Session {}: {} -> {} (provider {}, retry {})",
            self.id,
            self.state,
            state,
            self.provider_index,
            self.retry_count
        );
        self.state = state;
        self.publish(EventPayload::StateChanged {
            state,
            provider: self.current_provider().cloned(),
            retry_count: self.retry_count,
        });
    }

    fn publish(&self, payload: EventPayload) {
        self.events
            .publish(PlayerEvent::new(self.id, self.generation, payload));
    }

    fn begin_resolve(&mut self) {
        self.teardown();

        let Some(content_id) = self.content_id.clone() else {
            return;
        };
        let provider = self.settings.providers[self.provider_index].clone();

        self.transition(PlaybackState::Resolving);
        debug!(
            "Session {}: resolving {} via {} (generation {})",
            self.id, content_id, provider, self.generation
        );

        let dispatcher = self.dispatcher();
        let resolver = self.resolver.clone();
        self.in_flight = Some(AbortOnDropHandle::new(tokio::spawn(async move {
            let result = resolver.resolve(&content_id, &provider).await;
            dispatcher.send(Signal::Resolved(result));
        })));
    }

    fn on_resolved(&mut self, result: Result<StreamDescriptor, ResolutionError>) {
        self.in_flight = None;
        if self.state != PlaybackState::Resolving {
            return;
        }

        let descriptor = match result {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!("Session {}: resolution failed: {}", self.id, err);
                self.hard_error(err.into());
                return;
            }
        };

        let kind = classify(&descriptor);
        info!(
            "Session {}: resolved {} stream {}",
            self.id,
            kind,
            DebugInfo::truncate_url(&descriptor.url)
        );

        self.last_url = Some(descriptor.url.clone());
        self.active_backend = Some(kind);
        self.transition(PlaybackState::Attaching);

        let Some(surface) = self.surface.take() else {
            self.hard_error(PlaybackError::Fatal(
                "presentation surface unavailable".to_string(),
            ));
            return;
        };

        let dispatcher = self.dispatcher();
        let ctx = AttachContext {
            adaptive: &self.settings.adaptive,
            embed_timeout: self.settings.embed_timeout,
            proxy: &self.settings.proxy,
        };

        match Adapter::attach(kind, &descriptor.url, surface, &ctx, &dispatcher) {
            Ok(adapter) => self.adapter = Some(adapter),
            Err(failure) => {
                self.surface = Some(failure.surface);
                self.on_adapter_fatal(failure.error.into());
            }
        }
    }

    fn on_backend_event(&mut self, event: BackendEvent) {
        let Some(adapter) = self.adapter.as_mut() else {
            trace!("Session {}: no backend attached for {:?}", self.id, event);
            return;
        };

        for output in adapter.handle(event) {
            match output {
                AdapterEvent::Ready => self.on_ready(),
                AdapterEvent::QualityLevelsChanged(levels) => {
                    self.publish(EventPayload::QualityLevelsChanged { levels });
                }
                AdapterEvent::Fatal(err) => {
                    self.on_adapter_fatal(err);
                    // The adapter that produced the rest is gone
                    break;
                }
            }
        }
    }

    fn on_ready(&mut self) {
        if self.state != PlaybackState::Attaching {
            return;
        }

        let Some(provider) = self.current_provider().cloned() else {
            return;
        };
        let backend = self
            .active_backend
            .unwrap_or(BackendKind::DelegatedEmbed);

        info!(
            "Session {}: playing {} stream from {}",
            self.id, backend, provider
        );

        self.transition(PlaybackState::Playing);
        self.reset_pass();
        self.publish(EventPayload::Ready { provider, backend });
    }

    fn on_adapter_fatal(&mut self, err: PlaybackError) {
        match self.state {
            PlaybackState::Attaching if self.retry_count < self.settings.max_retries => {
                self.soft_error(err)
            }
            PlaybackState::Attaching | PlaybackState::Playing => self.hard_error(err),
            other => trace!(
                "Session {}: ignoring backend failure in state {}: {}",
                self.id, other, err
            ),
        }
    }

    fn soft_error(&mut self, err: PlaybackError) {
        warn!(
            "Session {}: attach failed on {} ({}), retrying",
            self.id,
            self.settings.providers[self.provider_index],
            err
        );
        self.transition(PlaybackState::SoftError);
        self.retry_count += 1;
        self.begin_resolve();
    }

    fn hard_error(&mut self, err: PlaybackError) {
        self.teardown();

        let provider = self.settings.providers[self.provider_index].clone();
        warn!("Session {}: giving up on {}: {}", self.id, provider, err);

        self.transition(PlaybackState::HardError);
        self.pass_failures.push(ProviderFailure {
            provider,
            reason: err.reason(),
        });
        self.failures_in_pass += 1;

        let provider_count = self.settings.providers.len();
        if self.failures_in_pass >= provider_count {
            self.exhaust();
            return;
        }

        self.provider_index = (self.provider_index + 1) % provider_count;
        self.retry_count = 0;
        self.begin_resolve();
    }

    fn exhaust(&mut self) {
        let summary = self
            .pass_failures
            .iter()
            .map(ProviderFailure::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let reason = format!(
            "All {} providers failed: {}",
            self.settings.providers.len(),
            summary
        );

        warn!("Session {}: {}", self.id, reason);

        self.transition(PlaybackState::Exhausted);
        self.publish(EventPayload::FatalError {
            reason,
            failures: self.pass_failures.clone(),
        });
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
