//! Run detail panel: header, progress, stat grid, notes, history keys.

use eframe::egui::{self, ProgressBar, RichText};

use crate::metrics::{self, MetricSnapshot};
use crate::sync::SyncPhase;
use crate::wandb::RunDetail;

use super::DashboardApp;
use super::{dim_color, error_color, state_color};

impl DashboardApp {
    pub(super) fn render_detail_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.controller.detail.selection().is_none() {
                ui.add_space(12.0);
                ui.label(
                    RichText::new("Select a run to view details.").color(dim_color()),
                );
                return;
            }

            if self.controller.detail.phase() == SyncPhase::Loading {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(RichText::new("Updating").color(dim_color()).small());
                });
            }
            if let Some(error) = self.controller.detail.error() {
                ui.label(RichText::new(error).color(error_color()));
                ui.add_space(4.0);
            }

            let Some(detail) = self.controller.detail.detail() else {
                // Selected but nothing fetched yet; header falls back to the
                // selection's name.
                if let Some(selection) = self.controller.detail.selection() {
                    ui.heading(&selection.name);
                }
                return;
            };
            render_detail(ui, detail);
        });
    }
}

fn render_detail(ui: &mut egui::Ui, detail: &RunDetail) {
    ui.horizontal(|ui| {
        ui.heading(detail.title());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(
                RichText::new(detail.state.label()).color(state_color(detail.state)),
            );
        });
    });
    let tags_line = if detail.tags.is_empty() {
        "No tags".to_string()
    } else {
        detail.tags.join(" · ")
    };
    ui.label(RichText::new(tags_line).color(dim_color()).small());
    ui.add_space(8.0);

    let snapshot = metrics::normalize(&detail.summary_metrics);
    if let Some(progress) = snapshot.progress {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Progress").color(dim_color()).small());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    RichText::new(format!(
                        "{} / {} ({}%)",
                        metrics::format_count(Some(progress.current)),
                        metrics::format_count(Some(progress.total)),
                        progress.percent
                    ))
                    .small(),
                );
            });
        });
        ui.add(ProgressBar::new(progress.percent as f32 / 100.0));
        ui.add_space(8.0);
    }

    render_stat_grid(ui, &snapshot);

    if let Some(notes) = detail.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        ui.add_space(8.0);
        ui.label(RichText::new("Notes").color(dim_color()).small());
        ui.label(notes);
    }
    if !detail.history_keys.is_empty() {
        ui.add_space(8.0);
        ui.label(RichText::new("History metrics").color(dim_color()).small());
        ui.label(RichText::new(detail.history_keys.join(", ")).small());
    }
}

fn render_stat_grid(ui: &mut egui::Ui, snapshot: &MetricSnapshot) {
    egui::Grid::new("run_stats")
        .num_columns(2)
        .spacing([32.0, 4.0])
        .show(ui, |ui| {
            stat_row(ui, "Train Loss", metrics::format_fixed4(snapshot.train_loss));
            stat_row(ui, "Eval Loss", metrics::format_fixed4(snapshot.eval_loss));
            stat_row(ui, "Accuracy", metrics::format_fixed4(snapshot.accuracy));
            stat_row(
                ui,
                "Learning Rate",
                metrics::format_exponential(snapshot.learning_rate),
            );
            stat_row(ui, "Step", metrics::format_count(snapshot.step));
            stat_row(ui, "Throughput", metrics::format_fixed2(snapshot.throughput));
        });
}

fn stat_row(ui: &mut egui::Ui, label: &str, value: String) {
    ui.label(RichText::new(label).color(dim_color()).small());
    ui.label(value);
    ui.end_row();
}
