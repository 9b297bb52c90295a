use crate::events::NotificationRecord;
use crate::island::PresentationSurface;
use crate::settings::Settings;
use eframe::egui;

/// The subset of [`egui::Context`] the surface needs. Tests substitute a
/// recorder for it.
pub trait ViewportCtx {
    fn send_viewport_cmd(&self, cmd: egui::ViewportCommand);
    fn request_repaint(&self);
    fn monitor_size(&self) -> Option<egui::Vec2> {
        None
    }
}

impl ViewportCtx for egui::Context {
    fn send_viewport_cmd(&self, cmd: egui::ViewportCommand) {
        egui::Context::send_viewport_cmd(self, cmd);
    }

    fn request_repaint(&self) {
        egui::Context::request_repaint(self);
    }

    fn monitor_size(&self) -> Option<egui::Vec2> {
        self.input(|i| i.viewport().monitor_size)
    }
}

/// Drives the native window from the state machine's calls.
///
/// Hiding parks the window at an off-screen position instead of making it
/// invisible so that egui keeps delivering frames while hidden.
pub struct EguiSurface<C: ViewportCtx> {
    ctx: C,
    collapsed_size: egui::Vec2,
    expanded_size: egui::Vec2,
    offscreen_pos: egui::Pos2,
    anchor: egui::Pos2,
    size: egui::Vec2,
    parked: bool,
    content: Option<NotificationRecord>,
}

impl<C: ViewportCtx> EguiSurface<C> {
    pub fn new(ctx: C, settings: &Settings) -> Self {
        let collapsed_size = egui::vec2(settings.collapsed_size.0, settings.collapsed_size.1);
        Self {
            ctx,
            collapsed_size,
            expanded_size: egui::vec2(settings.expanded_size.0, settings.expanded_size.1),
            offscreen_pos: egui::pos2(settings.offscreen_pos.0, settings.offscreen_pos.1),
            anchor: egui::pos2(0.0, settings.top_margin),
            size: collapsed_size,
            parked: false,
            content: None,
        }
    }

    pub fn ctx(&self) -> &C {
        &self.ctx
    }

    /// Notification currently rendered in the expanded panel.
    pub fn content(&self) -> Option<&NotificationRecord> {
        self.content.as_ref()
    }

    pub fn is_parked(&self) -> bool {
        self.parked
    }

    pub fn size(&self) -> egui::Vec2 {
        self.size
    }

    /// Top-left corner of the window for the current anchor and size.
    pub fn outer_position(&self) -> egui::Pos2 {
        egui::pos2(self.anchor.x - self.size.x / 2.0, self.anchor.y)
    }

    fn place(&self) {
        if !self.parked {
            self.ctx
                .send_viewport_cmd(egui::ViewportCommand::OuterPosition(self.outer_position()));
        }
    }

    fn resize(&mut self, size: egui::Vec2) {
        self.size = size;
        self.ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(size));
        // Keep the panel centred on its anchor as the width changes.
        self.place();
        self.ctx.request_repaint();
    }
}

impl<C: ViewportCtx> PresentationSurface for EguiSurface<C> {
    fn show(&mut self) {
        self.parked = false;
        self.place();
        self.ctx.send_viewport_cmd(egui::ViewportCommand::Visible(true));
        self.ctx.request_repaint();
        tracing::debug!(x = self.anchor.x, y = self.anchor.y, "surface shown");
    }

    fn hide(&mut self) {
        self.parked = true;
        self.ctx
            .send_viewport_cmd(egui::ViewportCommand::OuterPosition(self.offscreen_pos));
        self.ctx.send_viewport_cmd(egui::ViewportCommand::Visible(true));
        self.ctx.request_repaint();
        tracing::debug!("surface parked off-screen");
    }

    fn expand(&mut self, content: &NotificationRecord) {
        self.content = Some(content.clone());
        self.resize(self.expanded_size);
    }

    fn collapse(&mut self) {
        self.content = None;
        self.resize(self.collapsed_size);
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.anchor = egui::pos2(x, y);
        self.place();
    }

    fn screen_size(&self) -> Option<(f32, f32)> {
        self.ctx.monitor_size().map(|size| (size.x, size.y))
    }
}
