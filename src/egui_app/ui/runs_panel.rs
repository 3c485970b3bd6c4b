//! Run list panel: search box, refresh, and selectable run rows.

use std::time::Instant;

use eframe::egui::{self, Color32, ProgressBar, RichText, TextEdit};

use crate::metrics::{self, Progress};
use crate::sync::SyncPhase;
use crate::wandb::{RunState, RunSummary};

use super::DashboardApp;
use super::{dim_color, error_color, state_color};

/// Flattened per-row view of a run, computed before rendering so selection
/// can mutate the controller afterwards.
struct RunRow {
    id: String,
    name: String,
    title: String,
    subtitle: String,
    state: RunState,
    loss: String,
    accuracy: String,
    step: String,
    progress: Option<Progress>,
    selected: bool,
}

impl RunRow {
    fn from_run(run: &RunSummary, selected_id: Option<&str>) -> Self {
        let snapshot = metrics::normalize(&run.summary_metrics);
        let subtitle = match run.sweep_name.as_deref() {
            Some(sweep) => format!("Sweep: {sweep}"),
            None => run.tags.join(", "),
        };
        Self {
            id: run.id.clone(),
            name: run.name.clone(),
            title: run.title().to_string(),
            subtitle,
            state: run.state,
            loss: metrics::format_fixed4(snapshot.loss),
            accuracy: metrics::format_fixed4(snapshot.accuracy),
            step: metrics::format_count(snapshot.step),
            progress: snapshot.progress,
            selected: selected_id == Some(run.id.as_str()),
        }
    }
}

impl DashboardApp {
    pub(super) fn render_runs_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("runs_panel")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                let mut refresh_clicked = false;
                ui.horizontal(|ui| {
                    ui.add(
                        TextEdit::singleline(&mut self.controller.ui.search_query)
                            .hint_text("Search runs by name, tag, or sweep")
                            .desired_width(ui.available_width() - 80.0),
                    );
                    let loading = self.controller.list.phase() == SyncPhase::Loading;
                    refresh_clicked = ui
                        .add_enabled(!loading, egui::Button::new("Refresh"))
                        .clicked();
                    if loading {
                        ui.spinner();
                    }
                });
                if refresh_clicked {
                    self.controller.refresh_runs(Instant::now());
                }
                ui.add_space(4.0);

                if !self.controller.settings.connection.is_configured() {
                    ui.label(
                        RichText::new("Enter API key, entity, and project to view runs.")
                            .color(dim_color()),
                    );
                    return;
                }
                if let Some(error) = self.controller.list.error() {
                    ui.label(RichText::new(error).color(error_color()));
                    ui.add_space(4.0);
                }

                let rows: Vec<RunRow> = self
                    .controller
                    .list
                    .filtered(&self.controller.ui.search_query)
                    .into_iter()
                    .map(|run| {
                        RunRow::from_run(run, self.controller.ui.selected_run_id.as_deref())
                    })
                    .collect();

                if rows.is_empty() && self.controller.list.phase() == SyncPhase::Ready {
                    ui.label(RichText::new("No runs found.").color(dim_color()));
                    return;
                }

                let mut clicked: Option<(String, String)> = None;
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        for row in &rows {
                            if render_run_row(ui, row) {
                                clicked = Some((row.id.clone(), row.name.clone()));
                            }
                            ui.add_space(4.0);
                        }
                    });
                if let Some((id, name)) = clicked {
                    self.controller.select_run(id, name, Instant::now());
                }
            });
    }
}

/// Render one run row; returns true when the row was clicked.
fn render_run_row(ui: &mut egui::Ui, row: &RunRow) -> bool {
    let mut clicked = false;
    let fill = if row.selected {
        Color32::from_rgb(6, 46, 36)
    } else {
        Color32::from_rgb(23, 23, 23)
    };
    egui::Frame::group(ui.style()).fill(fill).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            let title = ui.selectable_label(
                row.selected,
                RichText::new(&row.title).strong(),
            );
            clicked |= title.clicked();
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    RichText::new(row.state.label())
                        .color(state_color(row.state))
                        .small(),
                );
            });
        });
        if !row.subtitle.is_empty() {
            ui.label(RichText::new(&row.subtitle).color(dim_color()).small());
        }
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("Loss {}", row.loss)).small());
            ui.label(RichText::new(format!("Acc {}", row.accuracy)).small());
            ui.label(RichText::new(format!("Step {}", row.step)).small());
        });
        if let Some(progress) = row.progress {
            ui.add(
                ProgressBar::new(progress.percent as f32 / 100.0)
                    .desired_height(6.0),
            );
        }
    });
    clicked
}
