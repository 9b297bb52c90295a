use thiserror::Error;

/// Failure taxonomy of the overlay core.
///
/// None of these are fatal. They are logged where they happen and the
/// affected feature keeps running in a degraded mode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IslandError {
    /// The OS refused or could not provide notification access. Retried with backoff.
    #[error("notification subscription unavailable: {0}")]
    SubscriptionUnavailable(String),
    /// Another process already owns the key combination.
    #[error("hotkey '{combo}' is already registered by another process")]
    HotkeyConflict { combo: String },
    #[error("global hotkeys are not supported on this platform ('{combo}')")]
    HotkeysUnsupported { combo: String },
    #[error("invalid hotkey: '{0}'")]
    InvalidHotkey(String),
    /// No media player currently exposes a session.
    #[error("no active media session")]
    MediaSessionAbsent,
    #[error("event queue overflow, {dropped} events dropped so far")]
    QueueOverflow { dropped: u64 },
    #[error("event queue closed")]
    QueueClosed,
}
