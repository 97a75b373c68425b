mod app;
mod color;
mod state;
mod ui;

use std::sync::Arc;

use app::GunsButterApp;
use eframe::egui;
use guns_butter::config::Config;
use guns_butter::source::worldbank::WorldBankClient;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Ignoring config: {e:#}");
            Config::default()
        }
    };

    let source = match WorldBankClient::new(config.api.clone()) {
        Ok(client) => client,
        Err(e) => {
            log::error!("Cannot build HTTP client: {e}");
            std::process::exit(1);
        }
    };
    let label = config.api.base_url.clone();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Guns and Butter Index",
        options,
        Box::new(move |cc| {
            let state = AppState::new(config, Arc::new(source), label);
            Ok(Box::new(GunsButterApp::new(&cc.egui_ctx, state)))
        }),
    )
}
