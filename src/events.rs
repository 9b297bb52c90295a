use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Instant;

/// Longest prefix of each field that takes part in the dedup key.
const DEDUP_FIELD_LIMIT: usize = 128;
const DEDUP_SEPARATOR: char = '\u{1f}';

/// A notification as delivered by the OS, normalised for the state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRecord {
    pub source_app: String,
    pub title: String,
    pub body: String,
    /// Monotonic arrival time, used for every window computation.
    pub received_at: Instant,
    /// Wall-clock time the OS reports for the notification, if any.
    pub posted_at: Option<DateTime<Utc>>,
    pub dedup_key: String,
}

impl NotificationRecord {
    pub fn new(
        source_app: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        received_at: Instant,
    ) -> Self {
        let source_app = source_app.into();
        let title = title.into();
        let body = body.into();
        let dedup_key = dedup_key(&source_app, &title, &body);
        Self {
            source_app,
            title,
            body,
            received_at,
            posted_at: None,
            dedup_key,
        }
    }

    pub fn with_posted_at(mut self, posted_at: DateTime<Utc>) -> Self {
        self.posted_at = Some(posted_at);
        self
    }

    /// Record shown by the test-fire hotkey. Built locally, no OS involvement.
    pub fn test(received_at: Instant) -> Self {
        Self::new(
            "Dynamic Island",
            "Test notification",
            "Notifications will appear here.",
            received_at,
        )
    }
}

fn normalize_field(field: &str) -> String {
    field
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .take(DEDUP_FIELD_LIMIT)
        .collect()
}

/// Identity of a notification: the normalised `(app, title, body)` triple.
///
/// Whitespace runs collapse to one space, case is folded and each field is
/// truncated, so back-ends that re-deliver the same toast with cosmetic
/// differences still map to the same key.
pub fn dedup_key(source_app: &str, title: &str, body: &str) -> String {
    let mut key = normalize_field(source_app);
    key.push(DEDUP_SEPARATOR);
    key.push_str(&normalize_field(title));
    key.push(DEDUP_SEPARATOR);
    key.push_str(&normalize_field(body));
    key
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandEvent {
    ToggleVisibility,
    FireTestNotification,
    MediaPlayPause,
    MediaNext,
    MediaPrevious,
}

impl fmt::Display for CommandEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandEvent::ToggleVisibility => "toggle-visibility",
            CommandEvent::FireTestNotification => "fire-test-notification",
            CommandEvent::MediaPlayPause => "media-play-pause",
            CommandEvent::MediaNext => "media-next",
            CommandEvent::MediaPrevious => "media-previous",
        };
        f.write_str(name)
    }
}

/// Gestures reported back by the presentation surface.
///
/// Pointer coordinates are in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    DragStart { x: f32, y: f32 },
    /// Pointer movement since the previous `DragStart`/`DragMove`.
    DragMove { dx: f32, dy: f32 },
    DragEnd,
    DismissClicked,
    HoverEnter,
    HoverLeave,
    QuitRequested,
}

/// Everything that travels through the event queue.
#[derive(Debug, Clone, PartialEq)]
pub enum IslandEvent {
    Notification(NotificationRecord),
    Command(CommandEvent),
    Surface(SurfaceEvent),
}

impl From<NotificationRecord> for IslandEvent {
    fn from(record: NotificationRecord) -> Self {
        IslandEvent::Notification(record)
    }
}

impl From<CommandEvent> for IslandEvent {
    fn from(command: CommandEvent) -> Self {
        IslandEvent::Command(command)
    }
}

impl From<SurfaceEvent> for IslandEvent {
    fn from(event: SurfaceEvent) -> Self {
        IslandEvent::Surface(event)
    }
}
