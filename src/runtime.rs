use crate::error::IslandError;
use crate::hotkey::{self, HotkeyBackend, HotkeyRouter};
use crate::island::{Flow, IslandConfig, IslandStateMachine, PresentationSurface};
use crate::media::{self, MediaBridge, MediaTransport};
use crate::notification::{self, NotificationBackend, NotificationSource, SourceConfig};
use crate::queue::{EventQueue, EventSender};
use crate::settings::Settings;
use std::time::{Duration, Instant};

/// Longest the headless loop sleeps without checking the clock.
const IDLE_WAIT: Duration = Duration::from_millis(500);

pub struct IslandRuntime {
    queue: EventQueue,
    machine: IslandStateMachine,
    source: NotificationSource,
    hotkeys: HotkeyRouter,
    started: bool,
}

impl IslandRuntime {
    /// Runtime using the platform backends.
    pub fn new(settings: &Settings) -> Self {
        Self::with_backends(
            settings,
            notification::default_backend(),
            hotkey::default_backend(),
            media::transport_for(settings.media_backend),
        )
    }

    pub fn with_backends(
        settings: &Settings,
        notifications: Box<dyn NotificationBackend>,
        hotkeys: Box<dyn HotkeyBackend>,
        transport: Box<dyn MediaTransport>,
    ) -> Self {
        let bridge = MediaBridge::new(transport, settings.music_controls_enabled);
        Self {
            queue: EventQueue::new(settings.queue_capacity()),
            machine: IslandStateMachine::new(IslandConfig::from(settings), bridge),
            source: NotificationSource::new(SourceConfig::from(settings), notifications),
            hotkeys: HotkeyRouter::from_settings(settings, hotkeys),
            started: false,
        }
    }

    pub fn sender(&self) -> EventSender {
        self.queue.sender()
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn machine(&self) -> &IslandStateMachine {
        &self.machine
    }

    pub fn hotkeys(&self) -> &HotkeyRouter {
        &self.hotkeys
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Bring the surface into its initial state and start the producers.
    pub fn start(&mut self, surface: &mut dyn PresentationSurface) {
        if self.started {
            return;
        }
        self.machine.start(surface);
        self.source.start(self.queue.sender());
        let active = self.hotkeys.start(self.queue.sender());
        tracing::info!(
            hotkeys = active,
            unavailable = self.hotkeys.unavailable().len(),
            capacity = self.queue.capacity(),
            "island runtime started"
        );
        self.started = true;
    }

    /// Process everything queued so far, then fire a due countdown.
    pub fn pump(&mut self, surface: &mut dyn PresentationSurface, now: Instant) -> Flow {
        while let Some(event) = self.queue.try_recv() {
            if self.machine.handle(event, surface, now) == Flow::Quit {
                return Flow::Quit;
            }
        }
        self.machine.tick(surface, now);
        Flow::Continue
    }

    /// How long the consumer may sleep before the countdown needs a tick.
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        self.machine
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Block on the queue until a quit request or until the queue is closed.
    pub fn run(&mut self, surface: &mut dyn PresentationSurface) {
        self.start(surface);
        loop {
            let wait = self.next_wakeup(Instant::now()).unwrap_or(IDLE_WAIT).min(IDLE_WAIT);
            match self.queue.recv_timeout(wait) {
                Ok(Some(event)) => {
                    if self.machine.handle(event, surface, Instant::now()) == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => self.machine.tick(surface, Instant::now()),
                Err(IslandError::QueueClosed) => break,
                Err(err) => {
                    tracing::error!(error = %err, "event queue failure");
                    break;
                }
            }
        }
        self.shutdown();
    }

    /// Stop the producers and close the queue. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.started {
            return;
        }
        self.queue.close();
        self.hotkeys.stop();
        self.source.stop();
        self.started = false;
        tracing::info!(dropped = self.queue.dropped(), "island runtime stopped");
    }
}

impl Drop for IslandRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
