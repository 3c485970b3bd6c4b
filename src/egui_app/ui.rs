//! egui renderer for the dashboard.

use std::time::{Duration, Instant};

use eframe::egui::{self, Color32};

use crate::wandb::RunState;

use super::controller::DashboardController;

mod connection_panel;
mod detail_panel;
mod runs_panel;

/// Minimum window size; three panels need some room.
pub const MIN_VIEWPORT_SIZE: egui::Vec2 = egui::Vec2::new(760.0, 480.0);

/// How often the UI repaints while idle so poll timers keep firing.
const IDLE_REPAINT: Duration = Duration::from_millis(500);

/// Renders the egui UI using the shared controller state.
pub struct DashboardApp {
    controller: DashboardController,
    visuals_set: bool,
}

impl DashboardApp {
    /// Create the app, loading persisted configuration.
    pub fn new() -> Self {
        Self {
            controller: DashboardController::new(),
            visuals_set: false,
        }
    }

    fn apply_visuals(&mut self, ctx: &egui::Context) {
        if self.visuals_set {
            return;
        }
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = Color32::from_rgb(12, 12, 12);
        visuals.panel_fill = Color32::from_rgb(16, 16, 16);
        ctx.set_visuals(visuals);
        self.visuals_set = true;
    }
}

impl Default for DashboardApp {
    fn default() -> Self {
        Self::new()
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_visuals(ctx);
        self.controller.tick(Instant::now());
        self.render_connection_panel(ctx);
        self.render_runs_panel(ctx);
        self.render_detail_panel(ctx);
        ctx.request_repaint_after(IDLE_REPAINT);
    }
}

/// Badge color for a run state, mirroring the severity palette used across
/// the panels.
fn state_color(state: RunState) -> Color32 {
    match state {
        RunState::Running => Color32::from_rgb(103, 232, 249),
        RunState::Finished => Color32::from_rgb(110, 231, 183),
        RunState::Failed | RunState::Crashed => Color32::from_rgb(253, 164, 175),
        RunState::Other => Color32::from_rgb(163, 163, 163),
    }
}

/// Rose tone shared by error banners.
fn error_color() -> Color32 {
    Color32::from_rgb(253, 164, 175)
}

/// Muted tone for secondary text.
fn dim_color() -> Color32 {
    Color32::from_rgb(163, 163, 163)
}
