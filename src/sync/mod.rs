//! Polling synchronizers that keep the local run view current.
//!
//! Each synchronizer is a small state machine owned by the UI thread.
//! Fetches run on background threads and report over an mpsc channel; the
//! owner drains the channel in `tick`. A monotonic generation counter is
//! captured when a fetch is issued and compared when its result arrives, so
//! responses issued under a stale configuration or selection are discarded
//! instead of applied.

use std::time::Duration;

pub mod run_detail;
pub mod run_list;

pub use run_detail::RunDetailSync;
pub use run_list::RunListSync;

/// Fixed period on which each synchronizer re-fetches its data. Also the
/// sole retry mechanism after a failure.
pub const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Lifecycle phase of a synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Not configured, or nothing to do.
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The last fetch succeeded.
    Ready,
    /// The last fetch failed; previously loaded data stays visible.
    Error,
}

/// Identity of the run the detail synchronizer follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedRun {
    pub id: String,
    pub name: String,
}
