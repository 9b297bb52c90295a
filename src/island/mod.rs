mod drag;
mod timer;

pub use drag::DragSession;
pub use timer::CollapseTimer;

use crate::events::{CommandEvent, IslandEvent, NotificationRecord, SurfaceEvent};
use crate::media::MediaBridge;
use crate::settings::{HiddenPolicy, Settings};
use std::time::{Duration, Instant};

/// Screen width assumed when the surface cannot report one.
const FALLBACK_SCREEN_WIDTH: f32 = 1920.0;

/// The rendered overlay. Implementations only draw; they never decide.
pub trait PresentationSurface {
    fn show(&mut self);
    fn hide(&mut self);
    fn expand(&mut self, content: &NotificationRecord);
    fn collapse(&mut self);
    /// Place the panel's top-centre anchor at `(x, y)` in screen coordinates.
    fn move_to(&mut self, x: f32, y: f32);
    /// Size of the screen hosting the panel, when known.
    fn screen_size(&self) -> Option<(f32, f32)> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMode {
    Hidden,
    Collapsed,
    Expanded,
}

/// Whether the consumer loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Visibility, content and countdown of the panel.
///
/// `expanded_content` is set exactly when the mode is `Expanded`, and the
/// countdown is only armed while expanded.
#[derive(Debug, Clone)]
pub struct PanelState {
    mode: PanelMode,
    expanded_content: Option<NotificationRecord>,
    timer: CollapseTimer,
}

impl PanelState {
    fn new(mode: PanelMode, collapse_delay: Duration) -> Self {
        Self {
            mode,
            expanded_content: None,
            timer: CollapseTimer::new(collapse_delay),
        }
    }

    pub fn mode(&self) -> PanelMode {
        self.mode
    }

    pub fn expanded_content(&self) -> Option<&NotificationRecord> {
        self.expanded_content.as_ref()
    }

    /// Deadline of the running countdown. `None` when idle or paused.
    pub fn pending_collapse_at(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn timer(&self) -> &CollapseTimer {
        &self.timer
    }

    fn expand(&mut self, content: NotificationRecord, now: Instant, paused: bool) {
        self.mode = PanelMode::Expanded;
        self.expanded_content = Some(content);
        self.timer.arm(now, paused);
    }

    fn collapse(&mut self) {
        self.mode = PanelMode::Collapsed;
        self.expanded_content = None;
        self.timer.cancel();
    }

    fn hide(&mut self) {
        self.mode = PanelMode::Hidden;
        self.expanded_content = None;
        self.timer.cancel();
    }
}

#[derive(Debug, Clone)]
pub struct IslandConfig {
    pub collapse_delay: Duration,
    pub suppression_window: Duration,
    pub hidden_policy: HiddenPolicy,
    pub start_hidden: bool,
    pub top_margin: f32,
}

impl Default for IslandConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for IslandConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            collapse_delay: settings.collapse_delay(),
            suppression_window: settings.suppression_window(),
            hidden_policy: settings.hidden_policy,
            start_hidden: settings.start_hidden,
            top_margin: settings.top_margin,
        }
    }
}

/// The only code allowed to change what the panel shows. Runs on the
/// consumer thread and takes one event at a time; every transition is a
/// synchronous function of the state, the event and the current instant.
pub struct IslandStateMachine {
    config: IslandConfig,
    panel: PanelState,
    drag: Option<DragSession>,
    hovering: bool,
    /// Notification that arrived while hidden, shown on the next un-hide.
    buffered: Option<NotificationRecord>,
    position: (f32, f32),
    bridge: MediaBridge,
    /// Key and arrival time of the last record put on screen. Outlives the
    /// expansion so a late re-delivery cannot bring it back.
    last_shown: Option<(String, Instant)>,
    suppressed: u64,
}

impl IslandStateMachine {
    pub fn new(config: IslandConfig, bridge: MediaBridge) -> Self {
        let mode = if config.start_hidden {
            PanelMode::Hidden
        } else {
            PanelMode::Collapsed
        };
        let panel = PanelState::new(mode, config.collapse_delay);
        let position = (FALLBACK_SCREEN_WIDTH / 2.0, config.top_margin);
        Self {
            config,
            panel,
            drag: None,
            hovering: false,
            buffered: None,
            position,
            bridge,
            last_shown: None,
            suppressed: 0,
        }
    }

    pub fn config(&self) -> &IslandConfig {
        &self.config
    }

    pub fn mode(&self) -> PanelMode {
        self.panel.mode
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    pub fn buffered(&self) -> Option<&NotificationRecord> {
        self.buffered.as_ref()
    }

    pub fn position(&self) -> (f32, f32) {
        self.position
    }

    /// Re-deliveries of a recently shown notification that were discarded.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Earliest instant at which [`tick`](Self::tick) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.panel.pending_collapse_at()
    }

    /// Put the surface into the initial state.
    pub fn start(&mut self, surface: &mut dyn PresentationSurface) {
        match self.panel.mode {
            PanelMode::Hidden => surface.hide(),
            PanelMode::Collapsed | PanelMode::Expanded => {
                self.move_to_default(surface);
                surface.collapse();
                surface.show();
            }
        }
        tracing::debug!(mode = ?self.panel.mode, "island started");
    }

    /// Fire the collapse countdown if it is due.
    pub fn tick(&mut self, surface: &mut dyn PresentationSurface, now: Instant) {
        if self.panel.mode == PanelMode::Expanded && self.panel.timer.fire_if_due(now) {
            tracing::debug!("collapse timer fired");
            self.panel.collapse();
            surface.collapse();
        }
    }

    pub fn handle(
        &mut self,
        event: IslandEvent,
        surface: &mut dyn PresentationSurface,
        now: Instant,
    ) -> Flow {
        // A countdown that expired before this event was dequeued fires first.
        self.tick(surface, now);
        match event {
            IslandEvent::Notification(record) => self.on_notification(record, surface, now),
            IslandEvent::Command(command) => self.on_command(command, surface, now),
            IslandEvent::Surface(event) => return self.on_surface(event, surface, now),
        }
        Flow::Continue
    }

    fn holds_countdown(&self) -> bool {
        self.drag.is_some() || self.hovering
    }

    fn default_position(&self, surface: &dyn PresentationSurface) -> (f32, f32) {
        let width = surface
            .screen_size()
            .map(|(w, _)| w)
            .unwrap_or(FALLBACK_SCREEN_WIDTH);
        (width / 2.0, self.config.top_margin)
    }

    fn move_to_default(&mut self, surface: &mut dyn PresentationSurface) {
        self.position = self.default_position(surface);
        surface.move_to(self.position.0, self.position.1);
    }

    fn is_recent_duplicate(&self, record: &NotificationRecord) -> bool {
        self.last_shown.as_ref().is_some_and(|(key, shown_at)| {
            *key == record.dedup_key
                && record.received_at.saturating_duration_since(*shown_at)
                    < self.config.suppression_window
        })
    }

    fn show_record(&mut self, record: NotificationRecord, surface: &mut dyn PresentationSurface, now: Instant) {
        tracing::debug!(app = %record.source_app, title = %record.title, "expanding panel");
        surface.expand(&record);
        self.last_shown = Some((record.dedup_key.clone(), record.received_at));
        let paused = self.holds_countdown();
        self.panel.expand(record, now, paused);
    }

    fn on_notification(
        &mut self,
        record: NotificationRecord,
        surface: &mut dyn PresentationSurface,
        now: Instant,
    ) {
        // Checked in every mode: the panel may have collapsed or been
        // dismissed since the original was shown.
        if self.is_recent_duplicate(&record) {
            self.suppressed += 1;
            tracing::debug!(app = %record.source_app, "duplicate of shown notification discarded");
            return;
        }
        match self.panel.mode {
            PanelMode::Hidden => match self.config.hidden_policy {
                HiddenPolicy::Buffer => {
                    tracing::debug!(app = %record.source_app, "panel hidden; notification buffered");
                    self.buffered = Some(record);
                }
                HiddenPolicy::Drop => {
                    tracing::debug!(app = %record.source_app, "panel hidden; notification dropped");
                }
                HiddenPolicy::Reveal => {
                    self.reveal(surface, now);
                    self.show_record(record, surface, now);
                }
            },
            PanelMode::Collapsed | PanelMode::Expanded => self.show_record(record, surface, now),
        }
    }

    fn on_command(&mut self, command: CommandEvent, surface: &mut dyn PresentationSurface, now: Instant) {
        match command {
            CommandEvent::ToggleVisibility => match self.panel.mode {
                PanelMode::Hidden => self.reveal(surface, now),
                PanelMode::Collapsed | PanelMode::Expanded => self.conceal(surface),
            },
            // While hidden the test record follows the hidden-state policy like
            // any other notification: with the default policy it is buffered
            // and appears on the next un-hide.
            CommandEvent::FireTestNotification => {
                self.on_notification(NotificationRecord::test(now), surface, now)
            }
            CommandEvent::MediaPlayPause | CommandEvent::MediaNext | CommandEvent::MediaPrevious => {
                self.bridge.dispatch(command);
            }
        }
    }

    fn on_surface(&mut self, event: SurfaceEvent, surface: &mut dyn PresentationSurface, now: Instant) -> Flow {
        if self.panel.mode == PanelMode::Hidden && event != SurfaceEvent::QuitRequested {
            tracing::debug!(?event, "gesture ignored while hidden");
            return Flow::Continue;
        }
        match event {
            SurfaceEvent::DragStart { x, y } => {
                if self.drag.is_none() {
                    self.panel.timer.pause(now);
                }
                self.drag = Some(DragSession::begin((x, y), self.position));
            }
            SurfaceEvent::DragMove { dx, dy } => {
                if let Some(drag) = self.drag.as_mut() {
                    self.position = drag.apply_delta(dx, dy);
                    surface.move_to(self.position.0, self.position.1);
                }
            }
            SurfaceEvent::DragEnd => {
                if let Some(mut drag) = self.drag.take() {
                    drag.end();
                    if !self.hovering {
                        self.panel.timer.resume(now);
                    }
                }
            }
            SurfaceEvent::DismissClicked => {
                if self.panel.mode == PanelMode::Expanded {
                    self.drag = None;
                    self.panel.collapse();
                    surface.collapse();
                }
            }
            SurfaceEvent::HoverEnter => {
                if !self.hovering {
                    self.hovering = true;
                    if self.drag.is_none() {
                        self.panel.timer.pause(now);
                    }
                }
            }
            SurfaceEvent::HoverLeave => {
                if self.hovering {
                    self.hovering = false;
                    if self.drag.is_none() {
                        self.panel.timer.resume(now);
                    }
                }
            }
            SurfaceEvent::QuitRequested => {
                if self.panel.mode != PanelMode::Hidden {
                    self.conceal(surface);
                }
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    /// Visible → Hidden. Cancels the countdown and any drag.
    fn conceal(&mut self, surface: &mut dyn PresentationSurface) {
        self.drag = None;
        self.hovering = false;
        self.panel.hide();
        surface.hide();
        tracing::debug!("panel hidden");
    }

    /// Hidden → Collapsed, or Expanded when a notification was buffered.
    fn reveal(&mut self, surface: &mut dyn PresentationSurface, now: Instant) {
        self.move_to_default(surface);
        self.panel.collapse();
        surface.show();
        match self.buffered.take() {
            Some(record) => self.show_record(record, surface, now),
            None => surface.collapse(),
        }
        tracing::debug!(mode = ?self.panel.mode, "panel shown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::NoMediaSession;

    #[derive(Default)]
    struct Sink {
        calls: Vec<String>,
    }

    impl PresentationSurface for Sink {
        fn show(&mut self) {
            self.calls.push("show".into());
        }
        fn hide(&mut self) {
            self.calls.push("hide".into());
        }
        fn expand(&mut self, content: &NotificationRecord) {
            self.calls.push(format!("expand:{}", content.title));
        }
        fn collapse(&mut self) {
            self.calls.push("collapse".into());
        }
        fn move_to(&mut self, x: f32, y: f32) {
            self.calls.push(format!("move:{x},{y}"));
        }
        fn screen_size(&self) -> Option<(f32, f32)> {
            Some((1000.0, 800.0))
        }
    }

    fn machine() -> IslandStateMachine {
        IslandStateMachine::new(
            IslandConfig::default(),
            MediaBridge::new(Box::new(NoMediaSession), true),
        )
    }

    #[test]
    fn start_places_panel_at_top_centre() {
        let mut sm = machine();
        let mut sink = Sink::default();
        sm.start(&mut sink);
        assert_eq!(sink.calls, vec!["move:500,12", "collapse", "show"]);
        assert_eq!(sm.position(), (500.0, 12.0));
    }

    #[test]
    fn content_is_set_only_while_expanded() {
        let t0 = Instant::now();
        let mut sm = machine();
        let mut sink = Sink::default();
        sm.handle(CommandEvent::FireTestNotification.into(), &mut sink, t0);
        assert_eq!(sm.mode(), PanelMode::Expanded);
        assert!(sm.panel().expanded_content().is_some());
        sm.handle(SurfaceEvent::DismissClicked.into(), &mut sink, t0);
        assert_eq!(sm.mode(), PanelMode::Collapsed);
        assert!(sm.panel().expanded_content().is_none());
        assert!(!sm.panel().timer().is_armed());
    }

    #[test]
    fn hover_and_drag_share_one_pause() {
        let t0 = Instant::now();
        let s = Duration::from_secs(1);
        let mut sm = machine();
        let mut sink = Sink::default();
        sm.handle(CommandEvent::FireTestNotification.into(), &mut sink, t0);
        sm.handle(SurfaceEvent::HoverEnter.into(), &mut sink, t0 + s);
        sm.handle(SurfaceEvent::DragStart { x: 0.0, y: 0.0 }.into(), &mut sink, t0 + 2 * s);
        sm.handle(SurfaceEvent::HoverLeave.into(), &mut sink, t0 + 3 * s);
        assert_eq!(sm.next_deadline(), None);
        sm.handle(SurfaceEvent::DragEnd.into(), &mut sink, t0 + 10 * s);
        assert_eq!(sm.next_deadline(), Some(t0 + 13 * s));
    }
}
