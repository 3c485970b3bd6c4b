#![deny(missing_docs)]
#![deny(warnings)]

//! Entry point for the egui-based Runboard UI.
#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]
use eframe::egui;
use runboard::egui_app::ui::{DashboardApp, MIN_VIEWPORT_SIZE};
use runboard::logging;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let viewport = egui::ViewportBuilder::default()
        .with_min_inner_size(MIN_VIEWPORT_SIZE)
        .with_inner_size(egui::Vec2::new(1080.0, 720.0));
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Runboard",
        native_options,
        Box::new(|_cc| Ok(Box::new(DashboardApp::new()))),
    )?;
    Ok(())
}
