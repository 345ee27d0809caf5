mod backend_bridge;
mod controller;
mod ui;

use crossbeam_channel::bounded;
use eframe::egui;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = session_core::config::load_settings();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::spawn_backend_thread(settings.clone(), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("ATM Desktop")
            .with_inner_size([480.0, 640.0])
            .with_min_inner_size([400.0, 520.0]),
        ..Default::default()
    };
    eframe::run_native(
        "ATM Desktop",
        options,
        Box::new(|_cc| Ok(Box::new(ui::app::AtmApp::new(settings, cmd_tx, ui_rx)))),
    )
}
