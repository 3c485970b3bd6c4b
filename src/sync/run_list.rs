//! Synchronizer for the project's run collection.

use std::sync::{
    Arc,
    mpsc::{Receiver, Sender, channel},
};
use std::thread;
use std::time::Instant;

use super::{POLL_INTERVAL, SyncPhase};
use crate::settings::ConnectionSettings;
use crate::wandb::{self, RunSummary, TransportError};

/// Injected fetch collaborator; the default issues the run-list query.
pub type ListFetchFn =
    dyn Fn(&ConnectionSettings) -> Result<Vec<RunSummary>, TransportError> + Send + Sync;

struct ListOutcome {
    generation: u64,
    result: Result<Vec<RunSummary>, TransportError>,
}

/// Polls the run list for the configured (entity, project) on a fixed
/// interval and replaces the local collection atomically on success.
pub struct RunListSync {
    fetch: Arc<ListFetchFn>,
    connection: ConnectionSettings,
    runs: Vec<RunSummary>,
    phase: SyncPhase,
    error: Option<String>,
    generation: u64,
    last_poll: Option<Instant>,
    outcome_tx: Sender<ListOutcome>,
    outcome_rx: Receiver<ListOutcome>,
}

impl RunListSync {
    /// Build a synchronizer that fetches through the real API.
    pub fn new() -> Self {
        Self::with_fetch(Arc::new(wandb::fetch_runs))
    }

    /// Build a synchronizer with an injected fetch function.
    pub fn with_fetch(fetch: Arc<ListFetchFn>) -> Self {
        let (outcome_tx, outcome_rx) = channel();
        Self {
            fetch,
            connection: ConnectionSettings::default(),
            runs: Vec::new(),
            phase: SyncPhase::Idle,
            error: None,
            generation: 0,
            last_poll: None,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Currently loaded runs (last successful fetch).
    pub fn runs(&self) -> &[RunSummary] {
        &self.runs
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Message from the last failed fetch, if the synchronizer is in error.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Look up a run by its stable id.
    pub fn run_by_id(&self, id: &str) -> Option<&RunSummary> {
        self.runs.iter().find(|run| run.id == id)
    }

    /// Adopt a new connection configuration.
    ///
    /// A changed configuration discards the previous collection immediately
    /// (no flash of stale data from a different project) and restarts the
    /// poll timer; in-flight responses for the old configuration are
    /// dropped by generation mismatch.
    pub fn set_connection(&mut self, connection: ConnectionSettings) {
        if connection == self.connection {
            return;
        }
        self.connection = connection;
        self.generation = self.generation.wrapping_add(1);
        self.runs.clear();
        self.error = None;
        self.phase = SyncPhase::Idle;
        self.last_poll = None;
    }

    /// Manual refresh; shares the timer-driven code path.
    pub fn refresh(&mut self, now: Instant) {
        if self.connection.is_configured() {
            self.spawn_fetch(now);
        }
    }

    /// Drain finished fetches and start a new one when the interval elapsed.
    pub fn tick(&mut self, now: Instant) {
        self.drain_outcomes();
        if !self.connection.is_configured() {
            return;
        }
        let due = self
            .last_poll
            .is_none_or(|last| now.duration_since(last) >= POLL_INTERVAL);
        if due {
            self.spawn_fetch(now);
        }
    }

    /// Case-insensitive substring filter over name, display name, sweep
    /// name, and tags. Purely local; never touches the network.
    pub fn filtered(&self, query: &str) -> Vec<&RunSummary> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.runs.iter().collect();
        }
        self.runs
            .iter()
            .filter(|run| matches_query(run, &needle))
            .collect()
    }

    fn spawn_fetch(&mut self, now: Instant) {
        self.phase = SyncPhase::Loading;
        self.last_poll = Some(now);
        let fetch = Arc::clone(&self.fetch);
        let connection = self.connection.clone();
        let generation = self.generation;
        let tx = self.outcome_tx.clone();
        thread::spawn(move || {
            let result = fetch(&connection);
            let _ = tx.send(ListOutcome { generation, result });
        });
    }

    fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.apply(outcome);
        }
    }

    fn apply(&mut self, outcome: ListOutcome) {
        if outcome.generation != self.generation {
            tracing::debug!("Discarding run list response for a stale configuration");
            return;
        }
        match outcome.result {
            Ok(runs) => {
                tracing::debug!("Run list refreshed with {} runs", runs.len());
                self.runs = runs;
                self.phase = SyncPhase::Ready;
                self.error = None;
            }
            Err(err) => {
                tracing::warn!("Run list fetch failed: {err}");
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

fn matches_query(run: &RunSummary, needle: &str) -> bool {
    let mut haystacks = Vec::with_capacity(3 + run.tags.len());
    haystacks.push(run.name.as_str());
    if let Some(display_name) = run.display_name.as_deref() {
        haystacks.push(display_name);
    }
    if let Some(sweep_name) = run.sweep_name.as_deref() {
        haystacks.push(sweep_name);
    }
    haystacks.extend(run.tags.iter().map(String::as_str));
    haystacks
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wandb::RunState;
    use serde_json::Map;
    use std::time::Duration;

    fn run(id: &str, name: &str, sweep: Option<&str>, tags: &[&str]) -> RunSummary {
        RunSummary {
            id: id.to_string(),
            name: name.to_string(),
            display_name: None,
            state: RunState::Running,
            created_at: None,
            finished_at: None,
            user: None,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            sweep_name: sweep.map(|s| s.to_string()),
            summary_metrics: Map::new(),
        }
    }

    fn configured() -> ConnectionSettings {
        ConnectionSettings {
            api_key: "key".into(),
            entity: "acme".into(),
            project: "demo".into(),
        }
    }

    fn sync_returning(
        result: Result<Vec<RunSummary>, TransportError>,
    ) -> RunListSync {
        let result = std::sync::Mutex::new(Some(result));
        RunListSync::with_fetch(Arc::new(move |_cfg: &ConnectionSettings| {
            result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(Vec::new()))
        }))
    }

    #[test]
    fn filter_matches_sweep_name_case_insensitively() {
        let mut sync = RunListSync::with_fetch(Arc::new(|_| Ok(Vec::new())));
        sync.runs = vec![
            run("1", "r1", Some("sweepA"), &[]),
            run("2", "r2", None, &["x"]),
        ];
        let hits = sync.filtered("sweepa");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "r1");
    }

    #[test]
    fn filter_matches_tags_and_names() {
        let mut sync = RunListSync::with_fetch(Arc::new(|_| Ok(Vec::new())));
        sync.runs = vec![
            run("1", "warm-dawn", None, &["baseline"]),
            run("2", "brisk-sun", None, &[]),
        ];
        assert_eq!(sync.filtered("BASE").len(), 1);
        assert_eq!(sync.filtered("sun").len(), 1);
        assert_eq!(sync.filtered("").len(), 2);
        assert!(sync.filtered("absent").is_empty());
    }

    #[test]
    fn unconfigured_sync_never_fetches() {
        let mut sync = RunListSync::with_fetch(Arc::new(|_| {
            panic!("fetch must not be called while unconfigured")
        }));
        sync.tick(Instant::now());
        sync.refresh(Instant::now());
        assert_eq!(sync.phase(), SyncPhase::Idle);
    }

    #[test]
    fn successful_fetch_replaces_collection_and_clears_error() {
        let mut sync = sync_returning(Ok(vec![run("1", "r1", None, &[])]));
        sync.set_connection(configured());
        sync.error = Some("old failure".into());
        sync.tick(Instant::now());
        assert_eq!(sync.phase(), SyncPhase::Loading);
        assert!(sync.pump(Duration::from_secs(2)));
        assert_eq!(sync.phase(), SyncPhase::Ready);
        assert_eq!(sync.runs().len(), 1);
        assert!(sync.error().is_none());
    }

    #[test]
    fn failed_fetch_keeps_last_good_collection() {
        let mut sync = sync_returning(Err(TransportError::Http { status: 500 }));
        sync.set_connection(configured());
        sync.runs = vec![run("1", "r1", None, &[])];
        sync.tick(Instant::now());
        assert!(sync.pump(Duration::from_secs(2)));
        assert_eq!(sync.phase(), SyncPhase::Error);
        assert_eq!(sync.runs().len(), 1, "stale data beats empty");
        assert_eq!(sync.error(), Some("HTTP 500"));
    }

    #[test]
    fn configuration_change_discards_collection_immediately() {
        let mut sync = RunListSync::with_fetch(Arc::new(|_| Ok(Vec::new())));
        sync.set_connection(configured());
        sync.runs = vec![run("1", "r1", None, &[])];
        let mut other = configured();
        other.project = "other".into();
        sync.set_connection(other);
        assert!(sync.runs().is_empty());
        assert_eq!(sync.phase(), SyncPhase::Idle);
        assert!(sync.last_poll.is_none());
    }

    #[test]
    fn response_for_previous_configuration_is_discarded() {
        let mut sync = RunListSync::with_fetch(Arc::new(|_| Ok(Vec::new())));
        sync.set_connection(configured());
        let stale_generation = sync.generation;
        let mut other = configured();
        other.project = "other".into();
        sync.set_connection(other);
        sync.apply(ListOutcome {
            generation: stale_generation,
            result: Ok(vec![run("1", "r1", None, &[])]),
        });
        assert!(sync.runs().is_empty(), "stale response must not land");
    }

    #[test]
    fn poll_is_due_only_after_interval() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut sync = RunListSync::with_fetch(Arc::new(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Vec::new())
        }));
        sync.set_connection(configured());
        let start = Instant::now();
        sync.tick(start);
        sync.tick(start + Duration::from_secs(1));
        sync.tick(start + Duration::from_secs(14));
        sync.tick(start + Duration::from_secs(15));

        let deadline = Instant::now() + Duration::from_secs(5);
        while calls.load(std::sync::atomic::Ordering::SeqCst) < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(
            calls.load(std::sync::atomic::Ordering::SeqCst),
            2,
            "only the first tick and the one past the interval may fetch"
        );
    }
}
