//! Library exports for reuse in integration tests.
/// Application directory helpers.
pub mod app_dirs;
/// Shared egui UI modules.
pub mod egui_app;
mod http_client;
/// Tracing setup.
pub mod logging;
/// Summary-metric normalization and display formatting.
pub mod metrics;
/// Durable connection settings.
pub mod settings;
/// Polling synchronizers for run list and run detail.
pub mod sync;
/// W&B GraphQL client: transport, queries, and models.
pub mod wandb;
