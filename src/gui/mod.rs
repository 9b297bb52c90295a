mod surface;

pub use surface::{EguiSurface, ViewportCtx};

use crate::events::{CommandEvent, IslandEvent, NotificationRecord, SurfaceEvent};
use crate::island::{Flow, PanelMode};
use crate::queue::EventSender;
use crate::runtime::IslandRuntime;
use crate::settings::Settings;
use eframe::egui;
use std::time::Instant;

const PANEL_ROUNDING: f32 = 18.0;

/// Translates pointer input into surface events and renders the panel.
///
/// Gestures are never applied to the window directly. They go through the
/// event queue like every other input and only the state machine moves or
/// resizes the panel.
pub struct IslandApp {
    runtime: IslandRuntime,
    surface: EguiSurface<egui::Context>,
    sender: EventSender,
    music_controls: bool,
    hovering: bool,
    drag_pointer: Option<egui::Pos2>,
    quitting: bool,
}

impl IslandApp {
    pub fn new(cc: &eframe::CreationContext<'_>, mut runtime: IslandRuntime, settings: &Settings) -> Self {
        let repaint = cc.egui_ctx.clone();
        runtime.queue().set_on_push(move || repaint.request_repaint());
        let mut surface = EguiSurface::new(cc.egui_ctx.clone(), settings);
        runtime.start(&mut surface);
        let sender = runtime.sender();
        Self {
            runtime,
            surface,
            sender,
            music_controls: settings.music_controls_enabled,
            hovering: false,
            drag_pointer: None,
            quitting: false,
        }
    }

    fn push(&self, event: impl Into<IslandEvent>) {
        if let Err(err) = self.sender.push(event) {
            tracing::debug!(error = %err, "ui event not queued");
        }
    }

    /// Pointer position in screen coordinates.
    fn global_pointer(ctx: &egui::Context, local: egui::Pos2) -> egui::Pos2 {
        let origin = ctx
            .input(|i| i.viewport().outer_rect)
            .map(|rect| rect.min)
            .unwrap_or(egui::Pos2::ZERO);
        origin + local.to_vec2()
    }

    fn track_hover(&mut self, ctx: &egui::Context) {
        let inside = ctx.input(|i| i.pointer.has_pointer());
        if inside != self.hovering {
            self.hovering = inside;
            self.push(if inside {
                SurfaceEvent::HoverEnter
            } else {
                SurfaceEvent::HoverLeave
            });
        }
    }

    fn track_drag(&mut self, ctx: &egui::Context, response: &egui::Response) {
        if response.drag_started() {
            if let Some(local) = response.interact_pointer_pos() {
                let pointer = Self::global_pointer(ctx, local);
                self.drag_pointer = Some(pointer);
                self.push(SurfaceEvent::DragStart {
                    x: pointer.x,
                    y: pointer.y,
                });
            }
        } else if response.dragged() {
            if let (Some(last), Some(local)) = (self.drag_pointer, response.interact_pointer_pos()) {
                let pointer = Self::global_pointer(ctx, local);
                let delta = pointer - last;
                if delta != egui::Vec2::ZERO {
                    self.drag_pointer = Some(pointer);
                    self.push(SurfaceEvent::DragMove {
                        dx: delta.x,
                        dy: delta.y,
                    });
                }
            }
        }
        if response.drag_stopped() && self.drag_pointer.take().is_some() {
            self.push(SurfaceEvent::DragEnd);
        }
    }

    fn expanded_ui(&self, ui: &mut egui::Ui, record: &NotificationRecord) {
        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.label(egui::RichText::new(&record.source_app).small().weak());
                ui.label(egui::RichText::new(&record.title).strong());
                if !record.body.is_empty() {
                    ui.label(record.body.as_str());
                }
            });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::TOP), |ui| {
                if ui.small_button("x").on_hover_text("Dismiss").clicked() {
                    self.push(SurfaceEvent::DismissClicked);
                }
            });
        });
    }

    fn collapsed_ui(&self, ui: &mut egui::Ui) {
        ui.horizontal_centered(|ui| {
            if self.music_controls {
                if ui.small_button("<<").on_hover_text("Previous").clicked() {
                    self.push(CommandEvent::MediaPrevious);
                }
                if ui.small_button("||").on_hover_text("Play / pause").clicked() {
                    self.push(CommandEvent::MediaPlayPause);
                }
                if ui.small_button(">>").on_hover_text("Next").clicked() {
                    self.push(CommandEvent::MediaNext);
                }
            }
        });
    }

    fn panel_ui(&mut self, ctx: &egui::Context) {
        let content = self.surface.content().cloned();
        let frame = egui::Frame::none()
            .fill(egui::Color32::from_black_alpha(235))
            .rounding(PANEL_ROUNDING)
            .inner_margin(egui::Margin::symmetric(14.0, 6.0));
        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            let rect = ui.max_rect();
            let response = ui.interact(rect, ui.id().with("island_drag"), egui::Sense::click_and_drag());
            self.track_drag(ctx, &response);
            response.context_menu(|ui| {
                if ui.button("Quit").clicked() {
                    self.push(SurfaceEvent::QuitRequested);
                    ui.close_menu();
                }
            });
            match content.as_ref() {
                Some(record) => self.expanded_ui(ui, record),
                None => self.collapsed_ui(ui),
            }
        });
    }
}

impl eframe::App for IslandApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) && !self.quitting {
            self.push(SurfaceEvent::QuitRequested);
        }
        if self.runtime.machine().mode() != PanelMode::Hidden {
            self.track_hover(ctx);
        } else {
            self.hovering = false;
        }
        self.panel_ui(ctx);

        let now = Instant::now();
        if self.runtime.pump(&mut self.surface, now) == Flow::Quit && !self.quitting {
            self.quitting = true;
            self.runtime.shutdown();
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }
        if let Some(wait) = self.runtime.next_wakeup(now) {
            ctx.request_repaint_after(wait);
        }
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::TRANSPARENT.to_array()
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.runtime.shutdown();
    }
}
