use tracing::{debug, trace};

use super::adapter::AdapterEvent;
use super::errors::{AttachError, PlaybackError};
use super::signal::{BackendEvent, Dispatcher};
use super::traits::{PresentationSurface, VideoEvent};

/// Direct media file on the native video element. No recovery of its own.
pub struct ProgressiveAdapter {
    surface: PresentationSurface,
    url: String,
    ready: bool,
}

impl ProgressiveAdapter {
    pub(crate) fn attach(
        url: &str,
        mut surface: PresentationSurface,
        dispatcher: &Dispatcher,
    ) -> Self {
        surface.hide_all();
        surface.video.bind_events(dispatcher.sink(BackendEvent::Video));
        surface.video.set_source(url);
        debug!("Progressive source set: {}", url);

        Self {
            surface,
            url: url.to_string(),
            ready: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub(crate) fn handle(&mut self, event: BackendEvent) -> Vec<AdapterEvent> {
        match event {
            BackendEvent::Video(VideoEvent::CanPlay) if !self.ready => {
                self.ready = true;
                self.surface.video.set_visible(true);
                vec![AdapterEvent::Ready]
            }
            BackendEvent::Video(VideoEvent::Error(details)) => {
                let error = if self.ready {
                    PlaybackError::Fatal(details)
                } else {
                    AttachError::Failed(details).into()
                };
                vec![AdapterEvent::Fatal(error)]
            }
            other => {
                trace!("Progressive adapter ignoring {:?}", other);
                Vec::new()
            }
        }
    }

    pub(crate) fn detach(mut self) -> PresentationSurface {
        self.surface.video.unbind_events();
        self.surface.video.clear_source();
        self.surface.video.set_visible(false);
        self.surface
    }
}
