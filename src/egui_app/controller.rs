//! Bridges the synchronizers and persisted settings to the egui UI.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::Instant;

use crate::settings::{self, AppSettings};
use crate::sync::{RunDetailSync, RunListSync, SelectedRun};
use crate::wandb::{self, ProjectInfo, TransportError};

use super::state::{TestPhase, UiState};

/// Where users create an API key.
pub const AUTHORIZE_URL: &str = "https://wandb.ai/authorize";

struct TestOutcome {
    generation: u64,
    result: Result<ProjectInfo, TransportError>,
}

/// Owns all dashboard state and reacts to UI events.
pub struct DashboardController {
    pub settings: AppSettings,
    pub list: RunListSync,
    pub detail: RunDetailSync,
    pub ui: UiState,
    test_generation: u64,
    test_in_progress: bool,
    test_tx: Sender<TestOutcome>,
    test_rx: Receiver<TestOutcome>,
}

impl DashboardController {
    /// Load persisted settings and configure both synchronizers from them.
    pub fn new() -> Self {
        let settings = settings::load_or_default();
        let mut list = RunListSync::new();
        let mut detail = RunDetailSync::new();
        list.set_connection(settings.connection.clone());
        detail.set_connection(settings.connection.clone());
        let (test_tx, test_rx) = channel();
        Self {
            settings,
            list,
            detail,
            ui: UiState::default(),
            test_generation: 0,
            test_in_progress: false,
            test_tx,
            test_rx,
        }
    }

    /// Advance both synchronizers and drain any finished connection test.
    pub fn tick(&mut self, now: Instant) {
        self.drain_test_outcomes();
        self.list.tick(now);
        self.detail.tick(now);
    }

    /// Adopt edited connection inputs: persist them and rekey both
    /// synchronizers. Any in-flight test result becomes stale.
    pub fn connection_edited(&mut self) {
        self.settings.connection.api_key =
            self.settings.connection.api_key.trim().to_string();
        if let Err(err) = settings::save(&self.settings) {
            tracing::warn!("Failed to persist settings: {err}");
        }
        self.list.set_connection(self.settings.connection.clone());
        self.detail.set_connection(self.settings.connection.clone());
        self.test_generation = self.test_generation.wrapping_add(1);
        self.test_in_progress = false;
        self.ui.test = Default::default();
    }

    /// Select a run from the list and start following its detail record.
    pub fn select_run(&mut self, id: String, name: String, now: Instant) {
        self.ui.selected_run_id = Some(id.clone());
        self.detail.select(Some(SelectedRun { id, name }), now);
    }

    /// Manual list refresh from the UI.
    pub fn refresh_runs(&mut self, now: Instant) {
        self.list.refresh(now);
    }

    /// Validate the configured project on a background thread.
    pub fn test_connection(&mut self) {
        if self.test_in_progress || !self.settings.connection.is_configured() {
            return;
        }
        self.test_in_progress = true;
        self.test_generation = self.test_generation.wrapping_add(1);
        self.ui.test.phase = TestPhase::Checking;
        self.ui.test.message = "Testing connection...".to_string();
        let connection = self.settings.connection.clone();
        let generation = self.test_generation;
        let tx = self.test_tx.clone();
        thread::spawn(move || {
            let result = wandb::validate_project(&connection);
            let _ = tx.send(TestOutcome { generation, result });
        });
    }

    /// Open the API key authorization page in the default browser.
    pub fn open_api_key_page(&mut self) {
        if let Err(err) = open::that(AUTHORIZE_URL) {
            tracing::warn!("Could not open {AUTHORIZE_URL}: {err}");
            self.ui.test.phase = TestPhase::Error;
            self.ui.test.message = format!("Could not open browser: {err}");
        }
    }

    fn drain_test_outcomes(&mut self) {
        while let Ok(outcome) = self.test_rx.try_recv() {
            if outcome.generation != self.test_generation {
                tracing::debug!("Discarding connection test for stale settings");
                continue;
            }
            self.test_in_progress = false;
            match outcome.result {
                Ok(project) => {
                    self.ui.test.phase = TestPhase::Ok;
                    self.ui.test.message =
                        format!("Connected to {}/{}", project.entity_name, project.name);
                }
                Err(err) => {
                    tracing::warn!("Connection test failed: {err}");
                    self.ui.test.phase = TestPhase::Error;
                    self.ui.test.message = err.to_string();
                }
            }
        }
    }
}

impl Default for DashboardController {
    fn default() -> Self {
        Self::new()
    }
}
