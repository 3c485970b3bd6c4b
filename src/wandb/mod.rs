//! Client for the W&B GraphQL API: transport, query wrappers, and models.

pub mod models;
pub mod queries;
pub mod transport;

pub use models::{RunDetail, RunState, RunSummary, RunUser};
pub use queries::{ProjectInfo, RUN_PAGE_SIZE, fetch_run_detail, fetch_runs, validate_project};
pub use transport::{GRAPHQL_ENDPOINT, TransportError, execute};
