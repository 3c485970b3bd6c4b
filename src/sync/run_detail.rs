//! Synchronizer for the selected run's detail record.
//!
//! Selection can change while a fetch is in flight. Every issued fetch
//! captures the generation current at issue time; a bump of the generation
//! (new selection, cleared selection, changed configuration) makes the old
//! response dead on arrival. This also covers reselecting a run with the
//! same name after navigating away, which a name comparison would miss.

use std::sync::{
    Arc,
    mpsc::{Receiver, Sender, channel},
};
use std::thread;
use std::time::Instant;

use super::{POLL_INTERVAL, SelectedRun, SyncPhase};
use crate::settings::ConnectionSettings;
use crate::wandb::{self, RunDetail, TransportError};

/// Injected fetch collaborator; the default issues the run-detail query.
pub type DetailFetchFn =
    dyn Fn(&ConnectionSettings, &str) -> Result<RunDetail, TransportError> + Send + Sync;

struct DetailOutcome {
    generation: u64,
    result: Result<RunDetail, TransportError>,
}

/// Polls the detail record for the currently selected run.
pub struct RunDetailSync {
    fetch: Arc<DetailFetchFn>,
    connection: ConnectionSettings,
    selection: Option<SelectedRun>,
    detail: Option<RunDetail>,
    phase: SyncPhase,
    error: Option<String>,
    generation: u64,
    last_poll: Option<Instant>,
    outcome_tx: Sender<DetailOutcome>,
    outcome_rx: Receiver<DetailOutcome>,
}

impl RunDetailSync {
    /// Build a synchronizer that fetches through the real API.
    pub fn new() -> Self {
        Self::with_fetch(Arc::new(|connection: &ConnectionSettings, name: &str| {
            wandb::fetch_run_detail(connection, name)
        }))
    }

    /// Build a synchronizer with an injected fetch function.
    pub fn with_fetch(fetch: Arc<DetailFetchFn>) -> Self {
        let (outcome_tx, outcome_rx) = channel();
        Self {
            fetch,
            connection: ConnectionSettings::default(),
            selection: None,
            detail: None,
            phase: SyncPhase::Idle,
            error: None,
            generation: 0,
            last_poll: None,
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn selection(&self) -> Option<&SelectedRun> {
        self.selection.as_ref()
    }

    /// Detail record from the last successful fetch for the current
    /// selection.
    pub fn detail(&self) -> Option<&RunDetail> {
        self.detail.as_ref()
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Message from the last failed fetch, shown alongside any stale detail.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Adopt a new connection configuration, keeping the selection.
    ///
    /// The previously displayed detail belongs to the old configuration and
    /// is cleared; the current selection is refetched on the next tick.
    pub fn set_connection(&mut self, connection: ConnectionSettings) {
        if connection == self.connection {
            return;
        }
        self.connection = connection;
        self.generation = self.generation.wrapping_add(1);
        self.detail = None;
        self.error = None;
        self.phase = SyncPhase::Idle;
        self.last_poll = None;
    }

    /// Change the followed run.
    ///
    /// Any in-flight fetch and the running timer for the previous selection
    /// are invalidated by the generation bump; the previous detail is
    /// cleared. A non-null selection fetches immediately and re-arms the
    /// timer.
    pub fn select(&mut self, selection: Option<SelectedRun>, now: Instant) {
        if selection == self.selection {
            return;
        }
        self.selection = selection;
        self.generation = self.generation.wrapping_add(1);
        self.detail = None;
        self.error = None;
        self.phase = SyncPhase::Idle;
        self.last_poll = None;
        if self.selection.is_some() && self.connection.is_configured() {
            self.spawn_fetch(now);
        }
    }

    /// Drain finished fetches and start a new one when the interval elapsed.
    pub fn tick(&mut self, now: Instant) {
        self.drain_outcomes();
        if self.selection.is_none() || !self.connection.is_configured() {
            return;
        }
        let due = self
            .last_poll
            .is_none_or(|last| now.duration_since(last) >= POLL_INTERVAL);
        if due {
            self.spawn_fetch(now);
        }
    }

    fn spawn_fetch(&mut self, now: Instant) {
        let Some(selection) = self.selection.clone() else {
            return;
        };
        self.phase = SyncPhase::Loading;
        self.last_poll = Some(now);
        let fetch = Arc::clone(&self.fetch);
        let connection = self.connection.clone();
        let generation = self.generation;
        let tx = self.outcome_tx.clone();
        thread::spawn(move || {
            let result = fetch(&connection, &selection.name);
            let _ = tx.send(DetailOutcome { generation, result });
        });
    }

    fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.apply(outcome);
        }
    }

    fn apply(&mut self, outcome: DetailOutcome) {
        if outcome.generation != self.generation {
            tracing::debug!("Discarding run detail response for a stale selection");
            return;
        }
        match outcome.result {
            Ok(detail) => {
                self.detail = Some(detail);
                self.phase = SyncPhase::Ready;
                self.error = None;
            }
            Err(err) => {
                tracing::warn!("Run detail fetch failed: {err}");
                self.phase = SyncPhase::Error;
                self.error = Some(err.to_string());
            }
        }
    }

    #[cfg(test)]
    fn pump(&mut self, timeout: std::time::Duration) -> bool {
        let outcome = self.outcome_rx.recv_timeout(timeout);
        match outcome {
            Ok(outcome) => {
                self.apply(outcome);
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wandb::RunState;
    use serde_json::Map;
    use std::time::Duration;

    fn detail(name: &str) -> RunDetail {
        RunDetail {
            id: format!("id-{name}"),
            name: name.to_string(),
            display_name: None,
            state: RunState::Running,
            created_at: None,
            finished_at: None,
            tags: Vec::new(),
            notes: None,
            summary_metrics: Map::new(),
            history_keys: Vec::new(),
        }
    }

    fn selected(name: &str) -> SelectedRun {
        SelectedRun {
            id: format!("id-{name}"),
            name: name.to_string(),
        }
    }

    fn configured() -> ConnectionSettings {
        ConnectionSettings {
            api_key: "key".into(),
            entity: "acme".into(),
            project: "demo".into(),
        }
    }

    fn echo_sync() -> RunDetailSync {
        RunDetailSync::with_fetch(Arc::new(|_cfg: &ConnectionSettings, name: &str| {
            Ok(detail(name))
        }))
    }

    #[test]
    fn no_selection_means_no_network_activity() {
        let mut sync = RunDetailSync::with_fetch(Arc::new(|_, _| {
            panic!("fetch must not be called without a selection")
        }));
        sync.set_connection(configured());
        sync.tick(Instant::now());
        assert_eq!(sync.phase(), SyncPhase::Idle);
        assert!(sync.detail().is_none());
    }

    #[test]
    fn selection_fetches_immediately() {
        let mut sync = echo_sync();
        sync.set_connection(configured());
        sync.select(Some(selected("a")), Instant::now());
        assert_eq!(sync.phase(), SyncPhase::Loading);
        assert!(sync.pump(Duration::from_secs(2)));
        assert_eq!(sync.phase(), SyncPhase::Ready);
        assert_eq!(sync.detail().unwrap().name, "a");
    }

    #[test]
    fn stale_response_is_not_applied_to_new_selection() {
        let mut sync = echo_sync();
        sync.set_connection(configured());
        let now = Instant::now();
        sync.select(Some(selected("a")), now);
        let stale_generation = sync.generation;
        // Selection changes before "a"'s response is applied.
        sync.select(Some(selected("b")), now);
        sync.apply(DetailOutcome {
            generation: stale_generation,
            result: Ok(detail("a")),
        });
        assert!(
            sync.detail().is_none() || sync.detail().unwrap().name == "b",
            "detail for \"a\" must never be displayed for selection \"b\""
        );
        // "b"'s own fetches still land.
        while sync.pump(Duration::from_millis(500)) {}
        if let Some(current) = sync.detail() {
            assert_eq!(current.name, "b");
        }
    }

    #[test]
    fn reselecting_the_same_name_invalidates_older_fetches() {
        let mut sync = echo_sync();
        sync.set_connection(configured());
        let now = Instant::now();
        sync.select(Some(selected("a")), now);
        let first_generation = sync.generation;
        sync.select(None, now);
        sync.select(Some(selected("a")), now);
        assert_ne!(sync.generation, first_generation);
        sync.apply(DetailOutcome {
            generation: first_generation,
            result: Ok(detail("a")),
        });
        // The stale outcome must not flip the phase to Ready.
        assert_eq!(sync.phase(), SyncPhase::Loading);
    }

    #[test]
    fn clearing_selection_clears_detail_and_stops_polling() {
        let mut sync = echo_sync();
        sync.set_connection(configured());
        let now = Instant::now();
        sync.select(Some(selected("a")), now);
        assert!(sync.pump(Duration::from_secs(2)));
        sync.select(None, now);
        assert!(sync.detail().is_none());
        assert_eq!(sync.phase(), SyncPhase::Idle);
        sync.tick(now + Duration::from_secs(60));
        assert_eq!(sync.phase(), SyncPhase::Idle);
    }

    #[test]
    fn failure_keeps_last_good_detail_and_surfaces_error() {
        let attempts = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let mut sync = RunDetailSync::with_fetch(Arc::new(
            move |_cfg: &ConnectionSettings, name: &str| {
                if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                    Ok(detail(name))
                } else {
                    Err(TransportError::NotFound)
                }
            },
        ));
        sync.set_connection(configured());
        let start = Instant::now();
        sync.select(Some(selected("a")), start);
        assert!(sync.pump(Duration::from_secs(2)));
        assert_eq!(sync.phase(), SyncPhase::Ready);

        sync.tick(start + POLL_INTERVAL);
        assert!(sync.pump(Duration::from_secs(2)));
        assert_eq!(sync.phase(), SyncPhase::Error);
        assert!(sync.error().is_some());
        assert_eq!(
            sync.detail().unwrap().name,
            "a",
            "last good detail stays visible alongside the error"
        );
    }

    #[test]
    fn configuration_change_clears_detail_but_keeps_selection() {
        let mut sync = echo_sync();
        sync.set_connection(configured());
        let now = Instant::now();
        sync.select(Some(selected("a")), now);
        assert!(sync.pump(Duration::from_secs(2)));
        let mut other = configured();
        other.project = "other".into();
        sync.set_connection(other);
        assert!(sync.detail().is_none());
        assert_eq!(sync.selection().unwrap().name, "a");
        sync.tick(now + Duration::from_millis(1));
        assert_eq!(sync.phase(), SyncPhase::Loading);
    }
}
