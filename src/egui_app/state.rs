//! Shared state types for the egui UI.

/// Outcome of the one-shot connection test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestPhase {
    #[default]
    Idle,
    Checking,
    Ok,
    Error,
}

/// Status of the connection panel's Test button.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTestState {
    pub phase: TestPhase,
    pub message: String,
}

/// Top-level UI model consumed by the egui renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Whether the API key input renders as plain text.
    pub show_api_key: bool,
    /// Live text of the run list filter box.
    pub search_query: String,
    /// Run selected in the list, by stable id. Never auto-cleared by a list
    /// refresh; the detail synchronizer reports a vanished run on its own.
    pub selected_run_id: Option<String>,
    pub test: ConnectionTestState,
}
