mod domain;
mod infrastructure;
mod presentation;

use domain::settings::ConfigService;
use eframe::egui;
use presentation::app::TrackerApp;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    let config_service = ConfigService::new()?;

    let _logging_guard = infrastructure::logging::init_logger(&config_service.get().log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting Beat Buddy Tracker");
    info!("Using config file {}", config_service.path().display());
    if !config_service.path().exists() {
        if let Err(e) = config_service.save() {
            warn!("Could not write default config: {}", e);
        }
    }

    let config = config_service.get().clone().validated();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 680.0])
            .with_min_inner_size([560.0, 420.0])
            .with_title("Beat Buddy Tracker"),
        ..Default::default()
    };

    eframe::run_native(
        "Beat Buddy Tracker",
        options,
        Box::new(move |cc| Ok(Box::new(TrackerApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {}", e))
}
