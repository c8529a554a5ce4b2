use anyhow::{Result, anyhow};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::errors::SessionError;
use super::session::{PlaybackSession, SessionSettings};
use super::signal::Envelope;
use super::traits::PresentationSurface;
use super::types::{DebugInfo, PlaybackState};
use crate::events::{EventBus, EventFilter, EventSubscriber};
use crate::models::{ContentId, ProviderName, QualityEntry, QualitySelection, SessionId};
use crate::resolver::StreamResolver;

/// Commands that can be sent to the session controller
#[derive(Debug)]
pub enum SessionCommand {
    /// Start playback of a content id from the first provider
    Start {
        content_id: ContentId,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Jump to a named provider
    SwitchProvider {
        provider: ProviderName,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Retry the current provider
    Retry {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Stop and release the surface
    Destroy { respond_to: oneshot::Sender<()> },
    GetState {
        respond_to: oneshot::Sender<PlaybackState>,
    },
    GetDebugInfo {
        respond_to: oneshot::Sender<DebugInfo>,
    },
    GetQualityLevels {
        respond_to: oneshot::Sender<Vec<QualityEntry>>,
    },
    SelectQuality {
        selection: QualitySelection,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
}

/// Controller that owns the session and serializes commands with
/// asynchronous completions on one task
pub struct SessionController {
    session: PlaybackSession,
    receiver: mpsc::UnboundedReceiver<SessionCommand>,
    signals: mpsc::UnboundedReceiver<Envelope>,
}

impl SessionController {
    pub fn new(
        settings: SessionSettings,
        resolver: Arc<dyn StreamResolver>,
        surface: PresentationSurface,
        events: EventBus,
    ) -> (SessionHandle, SessionController) {
        let (session, signals) = PlaybackSession::new(settings, resolver, surface, events.clone());
        let (sender, receiver) = mpsc::unbounded_channel();

        let handle = SessionHandle {
            sender,
            session_id: session.id(),
            events,
        };
        let controller = SessionController {
            session,
            receiver,
            signals,
        };

        (handle, controller)
    }

    /// Run the controller on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the controller event loop until every handle is dropped
    pub async fn run(mut self) {
        debug!("SessionController {} event loop started", self.session.id());

        loop {
            tokio::select! {
                command = self.receiver.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(envelope) = self.signals.recv() => {
                    self.session.handle_signal(envelope);
                }
            }
        }

        self.session.destroy();
        debug!("SessionController {} event loop ended", self.session.id());
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start {
                content_id,
                respond_to,
            } => {
                trace!("Starting session for {}", content_id);
                let _ = respond_to.send(self.session.start(content_id));
            }
            SessionCommand::SwitchProvider {
                provider,
                respond_to,
            } => {
                trace!("Switching provider to {}", provider);
                let _ = respond_to.send(self.session.switch_provider(&provider));
            }
            SessionCommand::Retry { respond_to } => {
                let _ = respond_to.send(self.session.retry());
            }
            SessionCommand::Destroy { respond_to } => {
                self.session.destroy();
                let _ = respond_to.send(());
            }
            SessionCommand::GetState { respond_to } => {
                let _ = respond_to.send(self.session.state());
            }
            SessionCommand::GetDebugInfo { respond_to } => {
                let _ = respond_to.send(self.session.debug_info());
            }
            SessionCommand::GetQualityLevels { respond_to } => {
                let _ = respond_to.send(self.session.quality_levels());
            }
            SessionCommand::SelectQuality {
                selection,
                respond_to,
            } => {
                let _ = respond_to.send(self.session.select_quality(selection));
            }
        }
    }
}

/// Handle for communicating with a session controller
#[derive(Clone, Debug)]
pub struct SessionHandle {
    sender: mpsc::UnboundedSender<SessionCommand>,
    session_id: SessionId,
    events: EventBus,
}

impl SessionHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Events of this session only
    pub fn subscribe(&self) -> EventSubscriber {
        self.events
            .subscribe_filtered(EventFilter::new().with_sessions(vec![self.session_id]))
    }

    pub async fn start(&self, content_id: impl Into<ContentId>) -> Result<()> {
        let content_id = content_id.into();
        Ok(self
            .request(|respond_to| SessionCommand::Start {
                content_id,
                respond_to,
            })
            .await??)
    }

    pub async fn switch_provider(&self, provider: impl Into<ProviderName>) -> Result<()> {
        let provider = provider.into();
        Ok(self
            .request(|respond_to| SessionCommand::SwitchProvider {
                provider,
                respond_to,
            })
            .await??)
    }

    pub async fn retry(&self) -> Result<()> {
        Ok(self
            .request(|respond_to| SessionCommand::Retry { respond_to })
            .await??)
    }

    pub async fn destroy(&self) -> Result<()> {
        self.request(|respond_to| SessionCommand::Destroy { respond_to })
            .await
    }

    pub async fn state(&self) -> Result<PlaybackState> {
        self.request(|respond_to| SessionCommand::GetState { respond_to })
            .await
    }

    pub async fn debug_info(&self) -> Result<DebugInfo> {
        self.request(|respond_to| SessionCommand::GetDebugInfo { respond_to })
            .await
    }

    pub async fn quality_levels(&self) -> Result<Vec<QualityEntry>> {
        self.request(|respond_to| SessionCommand::GetQualityLevels { respond_to })
            .await
    }

    pub async fn select_quality(&self, selection: QualitySelection) -> Result<()> {
        Ok(self
            .request(|respond_to| SessionCommand::SelectQuality {
                selection,
                respond_to,
            })
            .await??)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(command(respond_to))
            .map_err(|_| anyhow!("Session controller disconnected"))?;
        response
            .await
            .map_err(|_| anyhow!("Failed to receive response from session controller"))
    }
}
