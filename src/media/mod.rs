#[cfg(windows)]
mod win32;

#[cfg(windows)]
pub use win32::{MediaKeyTransport, SessionTransport};

use crate::error::IslandError;
use crate::events::CommandEvent;
use crate::settings::{MediaBackendKind, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    PlayPause,
    Next,
    Previous,
}

impl MediaAction {
    pub fn from_command(command: CommandEvent) -> Option<Self> {
        match command {
            CommandEvent::MediaPlayPause => Some(MediaAction::PlayPause),
            CommandEvent::MediaNext => Some(MediaAction::Next),
            CommandEvent::MediaPrevious => Some(MediaAction::Previous),
            CommandEvent::ToggleVisibility | CommandEvent::FireTestNotification => None,
        }
    }
}

pub trait MediaTransport: Send {
    /// Send one transport command. A missing session is reported as
    /// [`IslandError::MediaSessionAbsent`].
    fn send(&mut self, action: MediaAction) -> anyhow::Result<()>;
}

/// Transport for targets without a media session API.
#[derive(Debug, Default)]
pub struct NoMediaSession;

impl MediaTransport for NoMediaSession {
    fn send(&mut self, _action: MediaAction) -> anyhow::Result<()> {
        Err(IslandError::MediaSessionAbsent.into())
    }
}

pub fn transport_for(kind: MediaBackendKind) -> Box<dyn MediaTransport> {
    #[cfg(windows)]
    {
        match kind {
            MediaBackendKind::Session => Box::new(SessionTransport),
            MediaBackendKind::Keys => Box::new(MediaKeyTransport),
        }
    }
    #[cfg(not(windows))]
    {
        let _ = kind;
        Box::new(NoMediaSession)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOutcome {
    Sent,
    NoSession,
    Failed,
    Disabled,
    /// The command is not a media command.
    NotMedia,
}

pub struct MediaBridge {
    transport: Box<dyn MediaTransport>,
    enabled: bool,
}

impl MediaBridge {
    pub fn new(transport: Box<dyn MediaTransport>, enabled: bool) -> Self {
        Self { transport, enabled }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            transport_for(settings.media_backend),
            settings.music_controls_enabled,
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Forward a media command. Failures are logged and swallowed; nothing
    /// is retried.
    pub fn dispatch(&mut self, command: CommandEvent) -> MediaOutcome {
        let Some(action) = MediaAction::from_command(command) else {
            return MediaOutcome::NotMedia;
        };
        if !self.enabled {
            tracing::debug!(%command, "music controls disabled");
            return MediaOutcome::Disabled;
        }
        match self.transport.send(action) {
            Ok(()) => {
                tracing::debug!(?action, "media command sent");
                MediaOutcome::Sent
            }
            Err(err) => match err.downcast_ref::<IslandError>() {
                Some(IslandError::MediaSessionAbsent) => {
                    tracing::debug!(?action, "no active media session");
                    MediaOutcome::NoSession
                }
                _ => {
                    tracing::debug!(?action, error = %format!("{err:#}"), "media command failed");
                    MediaOutcome::Failed
                }
            },
        }
    }
}
