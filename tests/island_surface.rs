use dynamic_island::events::{CommandEvent, NotificationRecord, SurfaceEvent};
use dynamic_island::gui::EguiSurface;
use dynamic_island::island::{IslandConfig, IslandStateMachine, PresentationSurface};
use dynamic_island::media::{MediaBridge, NoMediaSession};
use dynamic_island::settings::Settings;
use eframe::egui::{self, ViewportCommand};
use std::time::Instant;

use mock_ctx::MockCtx;

fn outer_positions(cmds: &[ViewportCommand]) -> Vec<egui::Pos2> {
    cmds.iter()
        .filter_map(|c| match c {
            ViewportCommand::OuterPosition(pos) => Some(*pos),
            _ => None,
        })
        .collect()
}

#[test]
fn hide_parks_window_offscreen_but_visible() {
    let ctx = MockCtx::default();
    let mut surface = EguiSurface::new(ctx.clone(), &Settings::default());
    surface.hide();

    let cmds = ctx.take();
    assert_eq!(cmds.len(), 2);
    match cmds[0] {
        ViewportCommand::OuterPosition(pos) => assert_eq!((pos.x, pos.y), (2000.0, 2000.0)),
        _ => panic!("unexpected command"),
    }
    match cmds[1] {
        ViewportCommand::Visible(v) => assert!(v),
        _ => panic!("unexpected command"),
    }
    assert!(surface.is_parked());
}

#[test]
fn moves_while_parked_wait_for_show() {
    let ctx = MockCtx::default();
    let mut surface = EguiSurface::new(ctx.clone(), &Settings::default());
    surface.hide();
    ctx.take();

    surface.move_to(500.0, 12.0);
    assert!(outer_positions(&ctx.take()).is_empty());
    surface.show();
    // Collapsed width is 220, so the window starts 110 left of the anchor.
    assert_eq!(outer_positions(&ctx.take()), vec![egui::pos2(390.0, 12.0)]);
}

#[test]
fn expanding_resizes_and_stays_centred() {
    let ctx = MockCtx::default();
    let mut surface = EguiSurface::new(ctx.clone(), &Settings::default());
    surface.move_to(960.0, 12.0);
    ctx.take();

    let record = NotificationRecord::new("WhatsApp", "Alice", "Hi", Instant::now());
    surface.expand(&record);
    let cmds = ctx.take();
    assert!(matches!(cmds[0], ViewportCommand::InnerSize(size) if size == egui::vec2(650.0, 90.0)));
    assert_eq!(outer_positions(&cmds), vec![egui::pos2(635.0, 12.0)]);
    assert_eq!(surface.content().unwrap().title, "Alice");

    surface.collapse();
    let cmds = ctx.take();
    assert!(matches!(cmds[0], ViewportCommand::InnerSize(size) if size == egui::vec2(220.0, 38.0)));
    assert!(surface.content().is_none());
    assert!(*ctx.repaints.lock().unwrap() >= 2);
}

#[test]
fn state_machine_centres_panel_on_reported_monitor() {
    let ctx = MockCtx::with_monitor(2560.0, 1440.0);
    let mut surface = EguiSurface::new(ctx.clone(), &Settings::default());
    let mut sm = IslandStateMachine::new(
        IslandConfig::default(),
        MediaBridge::new(Box::new(NoMediaSession), true),
    );
    sm.start(&mut surface);
    assert_eq!(outer_positions(&ctx.take()).first(), Some(&egui::pos2(1170.0, 12.0)));

    let t0 = Instant::now();
    sm.handle(SurfaceEvent::DragStart { x: 1280.0, y: 20.0 }.into(), &mut surface, t0);
    sm.handle(SurfaceEvent::DragMove { dx: 40.0, dy: 10.0 }.into(), &mut surface, t0);
    sm.handle(SurfaceEvent::DragEnd.into(), &mut surface, t0);
    assert_eq!(outer_positions(&ctx.take()), vec![egui::pos2(1210.0, 22.0)]);

    sm.handle(CommandEvent::ToggleVisibility.into(), &mut surface, t0);
    assert!(surface.is_parked());
}
