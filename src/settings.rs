use crate::error::IslandError;
use crate::hotkey::{parse_hotkey, Hotkey};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const SETTINGS_FILE: &str = "settings.json";

/// What happens to notifications that arrive while the panel is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HiddenPolicy {
    /// Keep the latest one and show it on the next un-hide.
    Buffer,
    /// Discard it.
    Drop,
    /// Un-hide immediately and show it.
    Reveal,
}

impl Default for HiddenPolicy {
    fn default() -> Self {
        HiddenPolicy::Buffer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackendKind {
    /// Talk to the active media session through the system transport controls.
    Session,
    /// Synthesise media keys.
    Keys,
}

impl Default for MediaBackendKind {
    fn default() -> Self {
        MediaBackendKind::Session
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional file the log is written to in addition to stdout.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_toggle_hotkey")]
    pub toggle_hotkey: Option<String>,
    #[serde(default = "default_test_hotkey")]
    pub test_hotkey: Option<String>,
    #[serde(default)]
    pub media_play_pause_hotkey: Option<String>,
    #[serde(default)]
    pub media_next_hotkey: Option<String>,
    #[serde(default)]
    pub media_previous_hotkey: Option<String>,
    /// How long an expanded notification stays on screen.
    #[serde(default = "default_collapse_delay")]
    pub collapse_delay_ms: u64,
    /// Window in which two notifications with the same identity count as one.
    #[serde(default = "default_dedup_window")]
    pub dedup_window_ms: u64,
    /// While a notification is on screen, a copy of it arriving within this
    /// window of the original is discarded without resetting the countdown.
    #[serde(default = "default_suppression_window")]
    pub suppression_window_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Start with the panel hidden instead of collapsed.
    #[serde(default)]
    pub start_hidden: bool,
    #[serde(default)]
    pub hidden_policy: HiddenPolicy,
    /// Interval between polls of the notification listener.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_backoff_initial")]
    pub backoff_initial_ms: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
    /// A hotkey firing again within this interval is treated as key repeat.
    #[serde(default = "default_repeat_guard")]
    pub repeat_guard_ms: u64,
    #[serde(default)]
    pub media_backend: MediaBackendKind,
    #[serde(default = "default_music_controls")]
    pub music_controls_enabled: bool,
    #[serde(default = "default_collapsed_size")]
    pub collapsed_size: (f32, f32),
    #[serde(default = "default_expanded_size")]
    pub expanded_size: (f32, f32),
    /// Distance between the top of the screen and the panel.
    #[serde(default = "default_top_margin")]
    pub top_margin: f32,
    /// Position used to park the window off-screen while hidden.
    #[serde(default = "default_offscreen_pos")]
    pub offscreen_pos: (f32, f32),
}

fn default_toggle_hotkey() -> Option<String> {
    Some("Ctrl+1".into())
}

fn default_test_hotkey() -> Option<String> {
    Some("Ctrl+3".into())
}

fn default_collapse_delay() -> u64 {
    4000
}

fn default_dedup_window() -> u64 {
    300
}

fn default_suppression_window() -> u64 {
    4000
}

fn default_queue_capacity() -> usize {
    64
}

fn default_poll_interval() -> u64 {
    250
}

fn default_backoff_initial() -> u64 {
    500
}

fn default_backoff_max() -> u64 {
    30_000
}

fn default_repeat_guard() -> u64 {
    150
}

fn default_music_controls() -> bool {
    true
}

fn default_collapsed_size() -> (f32, f32) {
    (220.0, 38.0)
}

fn default_expanded_size() -> (f32, f32) {
    (650.0, 90.0)
}

fn default_top_margin() -> f32 {
    12.0
}

fn default_offscreen_pos() -> (f32, f32) {
    (2000.0, 2000.0)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            toggle_hotkey: default_toggle_hotkey(),
            test_hotkey: default_test_hotkey(),
            media_play_pause_hotkey: None,
            media_next_hotkey: None,
            media_previous_hotkey: None,
            collapse_delay_ms: default_collapse_delay(),
            dedup_window_ms: default_dedup_window(),
            suppression_window_ms: default_suppression_window(),
            queue_capacity: default_queue_capacity(),
            start_hidden: false,
            hidden_policy: HiddenPolicy::default(),
            poll_interval_ms: default_poll_interval(),
            backoff_initial_ms: default_backoff_initial(),
            backoff_max_ms: default_backoff_max(),
            repeat_guard_ms: default_repeat_guard(),
            media_backend: MediaBackendKind::default(),
            music_controls_enabled: default_music_controls(),
            collapsed_size: default_collapsed_size(),
            expanded_size: default_expanded_size(),
            top_margin: default_top_margin(),
            offscreen_pos: default_offscreen_pos(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Default location of the settings file: the per-user config directory,
    /// or the working directory when none is known.
    pub fn default_path() -> PathBuf {
        dirs_next::config_dir()
            .map(|dir| dir.join("dynamic_island").join(SETTINGS_FILE))
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE))
    }

    pub fn collapse_delay(&self) -> Duration {
        Duration::from_millis(self.collapse_delay_ms.max(250))
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    pub fn suppression_window(&self) -> Duration {
        Duration::from_millis(self.suppression_window_ms)
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    pub fn backoff_initial(&self) -> Duration {
        Duration::from_millis(self.backoff_initial_ms.max(10))
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms.max(self.backoff_initial_ms).max(10))
    }

    pub fn repeat_guard(&self) -> Duration {
        Duration::from_millis(self.repeat_guard_ms)
    }

    fn parse_optional(field: &str, value: &Option<String>) -> Option<Hotkey> {
        let text = value.as_deref()?;
        match parse_hotkey(text) {
            Some(k) => Some(k),
            None => {
                let error = IslandError::InvalidHotkey(text.to_string());
                tracing::warn!(field, %error, "binding disabled");
                None
            }
        }
    }

    pub fn toggle_hotkey(&self) -> Option<Hotkey> {
        Self::parse_optional("toggle_hotkey", &self.toggle_hotkey)
    }

    pub fn test_hotkey(&self) -> Option<Hotkey> {
        Self::parse_optional("test_hotkey", &self.test_hotkey)
    }

    pub fn media_play_pause_hotkey(&self) -> Option<Hotkey> {
        Self::parse_optional("media_play_pause_hotkey", &self.media_play_pause_hotkey)
    }

    pub fn media_next_hotkey(&self) -> Option<Hotkey> {
        Self::parse_optional("media_next_hotkey", &self.media_next_hotkey)
    }

    pub fn media_previous_hotkey(&self) -> Option<Hotkey> {
        Self::parse_optional("media_previous_hotkey", &self.media_previous_hotkey)
    }
}
