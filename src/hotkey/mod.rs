#[cfg(windows)]
mod win32;

#[cfg(windows)]
pub use win32::RegisteredHotkeys;

use crate::error::IslandError;
use crate::events::CommandEvent;
use crate::queue::EventSender;
use crate::settings::Settings;
use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Letter(char),
    Digit(u8),
    F(u8),
    Space,
    Tab,
    Return,
    Escape,
    Delete,
    Backspace,
    Home,
    End,
    PageUp,
    PageDown,
    LeftArrow,
    RightArrow,
    UpArrow,
    DownArrow,
}

impl Key {
    /// Win32 virtual-key code.
    pub fn virtual_key(self) -> u32 {
        match self {
            Key::Letter(c) => c.to_ascii_uppercase() as u32,
            Key::Digit(d) => 0x30 + d as u32,
            Key::F(n) => 0x6F + n as u32,
            Key::Space => 0x20,
            Key::Tab => 0x09,
            Key::Return => 0x0D,
            Key::Escape => 0x1B,
            Key::Delete => 0x2E,
            Key::Backspace => 0x08,
            Key::Home => 0x24,
            Key::End => 0x23,
            Key::PageUp => 0x21,
            Key::PageDown => 0x22,
            Key::LeftArrow => 0x25,
            Key::UpArrow => 0x26,
            Key::RightArrow => 0x27,
            Key::DownArrow => 0x28,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Letter(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Key::Digit(d) => write!(f, "{d}"),
            Key::F(n) => write!(f, "F{n}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub win: bool,
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        if self.alt {
            f.write_str("Alt+")?;
        }
        if self.win {
            f.write_str("Win+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// Parse a hotkey string like "Ctrl+Shift+Space" into a [`Hotkey`].
pub fn parse_hotkey(s: &str) -> Option<Hotkey> {
    let mut ctrl = false;
    let mut shift = false;
    let mut alt = false;
    let mut win = false;
    let mut key: Option<Key> = None;

    for part in s.split('+') {
        let upper = part.trim().to_ascii_uppercase();
        match upper.as_str() {
            "CTRL" | "CONTROL" => ctrl = true,
            "SHIFT" => shift = true,
            "ALT" => alt = true,
            "WIN" | "SUPER" | "META" => win = true,
            "" => {}
            _ => {
                // A second non-modifier key is not a valid combination.
                if key.is_some() {
                    return None;
                }
                key = Some(parse_key(&upper)?);
            }
        }
    }

    key.map(|key| Hotkey {
        key,
        ctrl,
        shift,
        alt,
        win,
    })
}

fn parse_key(upper: &str) -> Option<Key> {
    match upper {
        "SPACE" => Some(Key::Space),
        "TAB" => Some(Key::Tab),
        "ENTER" | "RETURN" => Some(Key::Return),
        "ESC" | "ESCAPE" => Some(Key::Escape),
        "DELETE" | "DEL" => Some(Key::Delete),
        "BACKSPACE" => Some(Key::Backspace),
        "HOME" => Some(Key::Home),
        "END" => Some(Key::End),
        "PAGEUP" => Some(Key::PageUp),
        "PAGEDOWN" => Some(Key::PageDown),
        "LEFT" | "LEFTARROW" => Some(Key::LeftArrow),
        "RIGHT" | "RIGHTARROW" => Some(Key::RightArrow),
        "UP" | "UPARROW" => Some(Key::UpArrow),
        "DOWN" | "DOWNARROW" => Some(Key::DownArrow),
        _ if upper.len() > 1 && upper.starts_with('F') => match upper[1..].parse::<u8>() {
            Ok(n @ 1..=24) => Some(Key::F(n)),
            _ => None,
        },
        _ => {
            let mut chars = upper.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            if let Some(d) = c.to_digit(10) {
                Some(Key::Digit(d as u8))
            } else if c.is_ascii_alphabetic() {
                Some(Key::Letter(c))
            } else {
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub hotkey: Hotkey,
    pub command: CommandEvent,
}

/// Bindings described by the settings; invalid strings are skipped.
pub fn bindings_from_settings(settings: &Settings) -> Vec<HotkeyBinding> {
    [
        (settings.toggle_hotkey(), CommandEvent::ToggleVisibility),
        (settings.test_hotkey(), CommandEvent::FireTestNotification),
        (settings.media_play_pause_hotkey(), CommandEvent::MediaPlayPause),
        (settings.media_next_hotkey(), CommandEvent::MediaNext),
        (settings.media_previous_hotkey(), CommandEvent::MediaPrevious),
    ]
    .into_iter()
    .filter_map(|(hotkey, command)| hotkey.map(|hotkey| HotkeyBinding { hotkey, command }))
    .collect()
}

pub trait HotkeyBackend: Send {
    /// Register the combinations. Entry `i` of the result is the outcome for
    /// `hotkeys[i]`; presses of a registered combination are reported as its
    /// index on `fired`.
    fn install(&mut self, hotkeys: &[Hotkey], fired: Sender<usize>) -> Vec<Result<(), IslandError>>;
    fn uninstall(&mut self);
    fn is_installed(&self) -> bool;
}

/// Backend for targets without global hotkey support.
#[derive(Debug, Default)]
pub struct UnsupportedHotkeys;

impl HotkeyBackend for UnsupportedHotkeys {
    fn install(&mut self, hotkeys: &[Hotkey], _fired: Sender<usize>) -> Vec<Result<(), IslandError>> {
        hotkeys
            .iter()
            .map(|hk| Err(IslandError::HotkeysUnsupported { combo: hk.to_string() }))
            .collect()
    }

    fn uninstall(&mut self) {}

    fn is_installed(&self) -> bool {
        false
    }
}

pub fn default_backend() -> Box<dyn HotkeyBackend> {
    #[cfg(windows)]
    {
        Box::new(RegisteredHotkeys::default())
    }
    #[cfg(not(windows))]
    {
        Box::new(UnsupportedHotkeys)
    }
}

/// Drops presses of the same binding that follow too closely, so held keys
/// produce one command even if the backend reports auto-repeat.
#[derive(Debug)]
pub struct RepeatGuard {
    interval: Duration,
    last: Vec<Option<Instant>>,
}

impl RepeatGuard {
    pub fn new(interval: Duration, bindings: usize) -> Self {
        Self {
            interval,
            last: vec![None; bindings],
        }
    }

    pub fn accept(&mut self, index: usize, now: Instant) -> bool {
        let Some(slot) = self.last.get_mut(index) else {
            return false;
        };
        let repeat = slot
            .map(|prev| now.saturating_duration_since(prev) < self.interval)
            .unwrap_or(false);
        *slot = Some(now);
        !repeat
    }
}

struct WorkerHandle {
    stop_tx: Sender<()>,
    join: JoinHandle<()>,
}

pub struct HotkeyRouter {
    bindings: Vec<HotkeyBinding>,
    backend: Box<dyn HotkeyBackend>,
    repeat_guard: Duration,
    unavailable: Vec<IslandError>,
    worker: Option<WorkerHandle>,
}

impl HotkeyRouter {
    pub fn new(bindings: Vec<HotkeyBinding>, backend: Box<dyn HotkeyBackend>, repeat_guard: Duration) -> Self {
        Self {
            bindings,
            backend,
            repeat_guard,
            unavailable: Vec::new(),
            worker: None,
        }
    }

    pub fn from_settings(settings: &Settings, backend: Box<dyn HotkeyBackend>) -> Self {
        Self::new(bindings_from_settings(settings), backend, settings.repeat_guard())
    }

    pub fn bindings(&self) -> &[HotkeyBinding] {
        &self.bindings
    }

    /// Failures from the last `start`, one per binding that is not active.
    pub fn unavailable(&self) -> &[IslandError] {
        &self.unavailable
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Register the bindings and start routing presses into `tx`.
    ///
    /// Never fails: a binding that cannot be registered is logged once and
    /// left out. Returns the number of active bindings.
    pub fn start(&mut self, tx: EventSender) -> usize {
        if self.worker.is_some() {
            return self.bindings.len() - self.unavailable.len();
        }

        let (fired_tx, fired_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();
        let hotkeys: Vec<Hotkey> = self.bindings.iter().map(|b| b.hotkey).collect();
        let results = self.backend.install(&hotkeys, fired_tx);

        self.unavailable.clear();
        for (binding, result) in self.bindings.iter().zip(results) {
            match result {
                Ok(()) => tracing::info!(hotkey = %binding.hotkey, command = %binding.command, "registered hotkey"),
                Err(err) => {
                    tracing::warn!(error = %err, command = %binding.command, "hotkey unavailable");
                    self.unavailable.push(err);
                }
            }
        }

        let commands: Vec<CommandEvent> = self.bindings.iter().map(|b| b.command).collect();
        let guard = RepeatGuard::new(self.repeat_guard, commands.len());
        let join = thread::Builder::new()
            .name("hotkey-router".into())
            .spawn(move || route_loop(commands, guard, fired_rx, stop_rx, tx));
        match join {
            Ok(join) => self.worker = Some(WorkerHandle { stop_tx, join }),
            Err(err) => {
                tracing::error!(?err, "failed to spawn hotkey router");
                self.backend.uninstall();
            }
        }
        self.bindings.len() - self.unavailable.len()
    }

    pub fn stop(&mut self) {
        if self.backend.is_installed() {
            self.backend.uninstall();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.join();
        }
    }
}

impl Drop for HotkeyRouter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn route_loop(
    commands: Vec<CommandEvent>,
    mut guard: RepeatGuard,
    fired_rx: Receiver<usize>,
    stop_rx: Receiver<()>,
    tx: EventSender,
) {
    loop {
        if stop_rx.try_recv().is_ok() {
            break;
        }
        match fired_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(index) => {
                let Some(&command) = commands.get(index) else {
                    continue;
                };
                if !guard.accept(index, Instant::now()) {
                    tracing::debug!(%command, "hotkey repeat ignored");
                    continue;
                }
                tracing::debug!(%command, "hotkey fired");
                if tx.push(command).is_err() {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // Backend gone; wait for stop so `stop` can still join us.
                let _ = stop_rx.recv();
                break;
            }
        }
    }
}
