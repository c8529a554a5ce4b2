use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use std::time::Duration;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, trace, warn};

use super::adapter::AdapterEvent;
use super::errors::AttachError;
use super::signal::{BackendEvent, Dispatcher, Signal};
use super::traits::{FrameEvent, PresentationSurface};
use crate::config::ResolverConfig;

/// Routes third-party embed pages through the resolver's same-origin proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedProxy {
    endpoint: String,
}

impl EmbedProxy {
    pub fn new(base_url: &str, path: &str) -> Self {
        Self {
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), path),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(&config.base_url, &config.proxy_path)
    }

    pub fn wrap(&self, url: &str) -> String {
        if url.starts_with(&self.endpoint) {
            return url.to_string();
        }
        format!(
            "{}?url={}",
            self.endpoint,
            utf8_percent_encode(url, NON_ALPHANUMERIC)
        )
    }
}

/// Third-party page in the sandboxed frame.
///
/// Only load, load error and the load budget are observable. Once loaded the
/// page gives no further signal, so failures inside it go unnoticed.
pub struct EmbedAdapter {
    surface: PresentationSurface,
    url: String,
    budget: Duration,
    ready: bool,
    timer: Option<AbortOnDropHandle<()>>,
}

impl EmbedAdapter {
    pub(crate) fn attach(
        url: &str,
        mut surface: PresentationSurface,
        budget: Duration,
        proxy: &EmbedProxy,
        dispatcher: &Dispatcher,
    ) -> Self {
        let proxied = proxy.wrap(url);
        surface.hide_all();
        surface
            .frame
            .load(&proxied, dispatcher.sink(BackendEvent::Frame));
        debug!("Embed frame loading {} (budget {:?})", proxied, budget);

        let timer_dispatcher = dispatcher.clone();
        let timer = AbortOnDropHandle::new(tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            timer_dispatcher.send(Signal::Backend(BackendEvent::EmbedTimeout));
        }));

        Self {
            surface,
            url: proxied,
            budget,
            ready: false,
            timer: Some(timer),
        }
    }

    /// Proxied URL the frame was pointed at
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub(crate) fn handle(&mut self, event: BackendEvent) -> Vec<AdapterEvent> {
        if self.ready {
            trace!("Embed loaded, ignoring {:?}", event);
            return Vec::new();
        }

        match event {
            BackendEvent::Frame(FrameEvent::Loaded) => {
                self.timer = None;
                self.ready = true;
                self.surface.frame.set_visible(true);
                vec![AdapterEvent::Ready]
            }
            BackendEvent::Frame(FrameEvent::Error(details)) => {
                self.timer = None;
                vec![AdapterEvent::Fatal(AttachError::Failed(details).into())]
            }
            BackendEvent::EmbedTimeout => {
                self.timer = None;
                warn!("Embed did not load within {:?}", self.budget);
                vec![AdapterEvent::Fatal(AttachError::Timeout(self.budget).into())]
            }
            other => {
                trace!("Embed adapter ignoring {:?}", other);
                Vec::new()
            }
        }
    }

    pub(crate) fn detach(mut self) -> PresentationSurface {
        self.timer = None;
        self.surface.frame.unload();
        self.surface.frame.set_visible(false);
        self.surface
    }
}
