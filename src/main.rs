use dynamic_island::gui::IslandApp;
use dynamic_island::logging;
use dynamic_island::runtime::IslandRuntime;
use dynamic_island::settings::Settings;

use eframe::egui;

fn main() -> anyhow::Result<()> {
    let settings_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| Settings::default_path().to_string_lossy().into_owned());
    let settings = Settings::load(&settings_path)?;
    logging::init(settings.debug_logging, settings.log_file.clone());
    tracing::info!(path = %settings_path, "settings loaded");

    let runtime = IslandRuntime::new(&settings);
    let (width, height) = settings.collapsed_size;
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Dynamic Island")
            .with_inner_size([width, height])
            .with_decorations(false)
            .with_transparent(true)
            .with_resizable(false)
            .with_taskbar(false)
            .with_always_on_top(),
        ..Default::default()
    };

    eframe::run_native(
        "Dynamic Island",
        native_options,
        Box::new(move |cc| Box::new(IslandApp::new(cc, runtime, &settings))),
    )
    .map_err(|e| anyhow::anyhow!("failed to start the overlay window: {e}"))
}
