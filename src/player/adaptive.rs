use tracing::{debug, info, trace, warn};

use super::adapter::{AdapterEvent, AttachFailure};
use super::errors::{AttachError, PlaybackError, SessionError};
use super::signal::{BackendEvent, Dispatcher};
use super::traits::{AdaptiveEngine, EngineErrorKind, EngineEvent, PresentationSurface, VideoEvent};
use crate::config::AdaptiveConfig;
use crate::models::{QualityEntry, QualityLevel, QualitySelection};

/// Plays HLS manifests through the adaptive engine, or straight through the
/// video element when the platform decodes HLS itself.
pub struct AdaptiveAdapter {
    surface: PresentationSurface,
    /// `None` on the native path
    engine: Option<Box<dyn AdaptiveEngine>>,
    url: String,
    ready: bool,
    network_recovered: bool,
    media_recovered: bool,
    levels: Vec<QualityLevel>,
    selection: QualitySelection,
}

impl AdaptiveAdapter {
    pub(crate) fn attach(
        url: &str,
        mut surface: PresentationSurface,
        config: &AdaptiveConfig,
        dispatcher: &Dispatcher,
    ) -> Result<Self, AttachFailure> {
        surface.hide_all();

        let engine = if surface.engines.is_supported() {
            let mut engine = surface.engines.create(config);
            surface.video.bind_events(dispatcher.sink(BackendEvent::Video));

            if let Err(error) = engine.load_source(
                url,
                surface.video.as_mut(),
                dispatcher.sink(BackendEvent::Engine),
            ) {
                warn!("Adaptive engine rejected {}: {}", url, error);
                engine.destroy();
                surface.video.unbind_events();
                return Err(AttachFailure { error, surface });
            }

            debug!("Adaptive engine loading manifest {}", url);
            Some(engine)
        } else if surface.video.can_play_native_hls() {
            info!("Adaptive engine unavailable, using native HLS playback");
            surface.video.bind_events(dispatcher.sink(BackendEvent::Video));
            surface.video.set_source(url);
            None
        } else {
            return Err(AttachFailure {
                error: AttachError::Unsupported,
                surface,
            });
        };

        Ok(Self {
            surface,
            engine,
            url: url.to_string(),
            ready: false,
            network_recovered: false,
            media_recovered: false,
            levels: Vec::new(),
            selection: QualitySelection::Auto,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_native(&self) -> bool {
        self.engine.is_none()
    }

    pub fn selection(&self) -> QualitySelection {
        self.selection
    }

    pub(crate) fn handle(&mut self, event: BackendEvent) -> Vec<AdapterEvent> {
        match event {
            BackendEvent::Engine(EngineEvent::ManifestParsed) => self.on_manifest_parsed(),
            BackendEvent::Engine(EngineEvent::Error {
                kind,
                fatal,
                details,
            }) => self.on_engine_error(kind, fatal, details),
            BackendEvent::Video(VideoEvent::CanPlay) => {
                // The engine path reports readiness through the manifest
                if self.engine.is_none() && !self.ready {
                    self.mark_ready();
                    vec![AdapterEvent::Ready]
                } else {
                    Vec::new()
                }
            }
            BackendEvent::Video(VideoEvent::Error(details)) => {
                vec![AdapterEvent::Fatal(self.failure(details))]
            }
            other => {
                trace!("Adaptive adapter ignoring {:?}", other);
                Vec::new()
            }
        }
    }

    fn on_manifest_parsed(&mut self) -> Vec<AdapterEvent> {
        let Some(engine) = self.engine.as_ref() else {
            return Vec::new();
        };

        self.levels = engine
            .levels()
            .into_iter()
            .enumerate()
            .map(|(index, level)| QualityLevel {
                index,
                height: level.height,
            })
            .collect();

        debug!("Manifest parsed with {} quality levels", self.levels.len());

        let mut events = Vec::with_capacity(2);
        if !self.ready {
            self.mark_ready();
            events.push(AdapterEvent::Ready);
        }
        events.push(AdapterEvent::QualityLevelsChanged(self.quality_levels()));
        events
    }

    fn on_engine_error(
        &mut self,
        kind: EngineErrorKind,
        fatal: bool,
        details: String,
    ) -> Vec<AdapterEvent> {
        if !fatal {
            trace!("Non-fatal engine error ignored: {}", details);
            return Vec::new();
        }

        let Some(engine) = self.engine.as_mut() else {
            return vec![AdapterEvent::Fatal(self.failure(details))];
        };

        // One in-place recovery per error kind per attach
        match kind {
            EngineErrorKind::Network if !self.network_recovered => {
                warn!("Fatal network error, trying to recover: {}", details);
                self.network_recovered = true;
                engine.start_load();
                Vec::new()
            }
            EngineErrorKind::Media if !self.media_recovered => {
                warn!("Fatal media error, trying to recover: {}", details);
                self.media_recovered = true;
                engine.recover_media_error();
                Vec::new()
            }
            _ => vec![AdapterEvent::Fatal(self.failure(details))],
        }
    }

    fn mark_ready(&mut self) {
        self.ready = true;
        self.surface.video.set_visible(true);
    }

    fn failure(&self, details: String) -> PlaybackError {
        if self.ready {
            PlaybackError::Fatal(details)
        } else {
            AttachError::Failed(details).into()
        }
    }

    /// Auto first, then levels from tallest to shortest; unknown heights last
    pub fn quality_levels(&self) -> Vec<QualityEntry> {
        let mut levels = self.levels.clone();
        levels.sort_by(|a, b| match (a.height, b.height) {
            (Some(a_height), Some(b_height)) => b_height.cmp(&a_height),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.index.cmp(&b.index),
        });

        std::iter::once(QualityEntry::Auto)
            .chain(levels.into_iter().map(QualityEntry::Level))
            .collect()
    }

    pub fn select_quality(&mut self, selection: QualitySelection) -> Result<(), SessionError> {
        let Some(engine) = self.engine.as_mut() else {
            return Err(SessionError::QualityUnavailable);
        };

        match selection {
            QualitySelection::Auto => engine.set_current_level(None),
            QualitySelection::Level(index) => {
                if !self.levels.iter().any(|level| level.index == index) {
                    return Err(SessionError::InvalidQualityLevel(index));
                }
                engine.set_current_level(Some(index));
            }
        }

        debug!("Quality selection changed to {:?}", selection);
        self.selection = selection;
        Ok(())
    }

    pub(crate) fn detach(mut self) -> PresentationSurface {
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
        }
        self.surface.video.unbind_events();
        self.surface.video.clear_source();
        self.surface.video.set_visible(false);
        self.surface
    }
}
