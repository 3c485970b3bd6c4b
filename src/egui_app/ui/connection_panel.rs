//! Connection panel: credentials, project coordinates, and the test button.

use eframe::egui::{self, RichText, TextEdit};

use crate::egui_app::state::TestPhase;

use super::DashboardApp;
use super::{dim_color, error_color, state_color};
use crate::wandb::RunState;

impl DashboardApp {
    pub(super) fn render_connection_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("connection_panel").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.heading("Runboard");
                ui.label(RichText::new("training run monitor").color(dim_color()));
            });
            ui.add_space(4.0);

            let mut edited = false;
            ui.horizontal(|ui| {
                ui.label("API key");
                let key_edit = TextEdit::singleline(
                    &mut self.controller.settings.connection.api_key,
                )
                .password(!self.controller.ui.show_api_key)
                .hint_text("wandb_api_key")
                .desired_width(180.0);
                edited |= ui.add(key_edit).changed();
                let toggle_label = if self.controller.ui.show_api_key {
                    "Hide"
                } else {
                    "Show"
                };
                if ui.button(toggle_label).clicked() {
                    self.controller.ui.show_api_key = !self.controller.ui.show_api_key;
                }

                ui.separator();
                ui.label("Entity");
                edited |= ui
                    .add(
                        TextEdit::singleline(&mut self.controller.settings.connection.entity)
                            .hint_text("my-org")
                            .desired_width(120.0),
                    )
                    .changed();
                ui.label("Project");
                edited |= ui
                    .add(
                        TextEdit::singleline(&mut self.controller.settings.connection.project)
                            .hint_text("my-project")
                            .desired_width(120.0),
                    )
                    .changed();

                ui.separator();
                let can_test = self.controller.settings.connection.is_configured()
                    && self.controller.ui.test.phase != TestPhase::Checking;
                if ui
                    .add_enabled(can_test, egui::Button::new("Test"))
                    .clicked()
                {
                    self.controller.test_connection();
                }
                if ui.button("Get API Key").clicked() {
                    self.controller.open_api_key_page();
                }
            });
            if edited {
                self.controller.connection_edited();
            }

            ui.add_space(2.0);
            self.render_test_status(ui);
            ui.add_space(4.0);
        });
    }

    fn render_test_status(&self, ui: &mut egui::Ui) {
        let test = &self.controller.ui.test;
        let (color, text) = match test.phase {
            TestPhase::Idle => {
                if self.controller.settings.connection.is_configured() {
                    (dim_color(), "Not connected".to_string())
                } else {
                    (
                        dim_color(),
                        "Enter API key, entity, and project to connect.".to_string(),
                    )
                }
            }
            TestPhase::Checking => (state_color(RunState::Running), test.message.clone()),
            TestPhase::Ok => (state_color(RunState::Finished), test.message.clone()),
            TestPhase::Error => (error_color(), test.message.clone()),
        };
        ui.label(RichText::new(text).color(color).small());
    }
}
