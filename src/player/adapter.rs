use std::time::Duration;
use tracing::info;

use super::adaptive::AdaptiveAdapter;
use super::embed::{EmbedAdapter, EmbedProxy};
use super::errors::{AttachError, PlaybackError, SessionError};
use super::progressive::ProgressiveAdapter;
use super::signal::{BackendEvent, Dispatcher};
use super::traits::PresentationSurface;
use crate::config::AdaptiveConfig;
use crate::models::{BackendKind, QualityEntry, QualitySelection};

/// What an adapter reports back to the session after handling a callback
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    Ready,
    QualityLevelsChanged(Vec<QualityEntry>),
    Fatal(PlaybackError),
}

/// Attach refused synchronously; the surface comes back untouched
pub struct AttachFailure {
    pub error: AttachError,
    pub surface: PresentationSurface,
}

pub(crate) struct AttachContext<'a> {
    pub adaptive: &'a AdaptiveConfig,
    pub embed_timeout: Duration,
    pub proxy: &'a EmbedProxy,
}

/// The backend currently holding the presentation surface
pub enum Adapter {
    Adaptive(AdaptiveAdapter),
    Progressive(ProgressiveAdapter),
    Embed(EmbedAdapter),
}

impl Adapter {
    pub(crate) fn attach(
        kind: BackendKind,
        url: &str,
        surface: PresentationSurface,
        ctx: &AttachContext<'_>,
        dispatcher: &Dispatcher,
    ) -> Result<Self, AttachFailure> {
        match kind.effective() {
            BackendKind::AdaptiveBitrate => {
                info!("Attaching adaptive backend");
                AdaptiveAdapter::attach(url, surface, ctx.adaptive, dispatcher)
                    .map(Adapter::Adaptive)
            }
            BackendKind::ProgressiveFile => {
                info!("Attaching progressive backend");
                Ok(Adapter::Progressive(ProgressiveAdapter::attach(
                    url, surface, dispatcher,
                )))
            }
            BackendKind::DelegatedEmbed | BackendKind::Unknown => {
                info!("Attaching embed backend");
                Ok(Adapter::Embed(EmbedAdapter::attach(
                    url,
                    surface,
                    ctx.embed_timeout,
                    ctx.proxy,
                    dispatcher,
                )))
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Adapter::Adaptive(_) => BackendKind::AdaptiveBitrate,
            Adapter::Progressive(_) => BackendKind::ProgressiveFile,
            Adapter::Embed(_) => BackendKind::DelegatedEmbed,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Adapter::Adaptive(a) => a.url(),
            Adapter::Progressive(a) => a.url(),
            Adapter::Embed(a) => a.url(),
        }
    }

    pub fn is_ready(&self) -> bool {
        match self {
            Adapter::Adaptive(a) => a.is_ready(),
            Adapter::Progressive(a) => a.is_ready(),
            Adapter::Embed(a) => a.is_ready(),
        }
    }

    pub(crate) fn handle(&mut self, event: BackendEvent) -> Vec<AdapterEvent> {
        match self {
            Adapter::Adaptive(a) => a.handle(event),
            Adapter::Progressive(a) => a.handle(event),
            Adapter::Embed(a) => a.handle(event),
        }
    }

    /// Empty unless the stream is adaptive
    pub fn quality_levels(&self) -> Vec<QualityEntry> {
        match self {
            Adapter::Adaptive(a) => a.quality_levels(),
            _ => Vec::new(),
        }
    }

    pub fn select_quality(&mut self, selection: QualitySelection) -> Result<(), SessionError> {
        match self {
            Adapter::Adaptive(a) => a.select_quality(selection),
            _ => Err(SessionError::QualityUnavailable),
        }
    }

    /// Tear the backend down and hand the surface back
    pub(crate) fn detach(self) -> PresentationSurface {
        match self {
            Adapter::Adaptive(a) => a.detach(),
            Adapter::Progressive(a) => a.detach(),
            Adapter::Embed(a) => a.detach(),
        }
    }
}
