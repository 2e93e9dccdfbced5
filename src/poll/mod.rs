//! Periodic telemetry polling.
//!
//! Every tick spawns one fetch on its own worker thread, so a slow endpoint
//! never delays the schedule and fetches may overlap. Finished fetches come
//! back over a channel to the scheduler thread, which owns the [`TickGate`]:
//! a result is applied only if its tick is newer than the last applied one,
//! so an older response can never overwrite a newer view.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analytics::logger::{PollJournal, PollLogEntry, PollOutcome};
use crate::telemetry::{Snapshot, SnapshotSource};

/// Upper bound on how long the scheduler sleeps before rechecking `stop`.
const STOP_CHECK: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Tick gate
// ---------------------------------------------------------------------------

/// Monotonic tick counter with last-applied tracking.
#[derive(Debug, Default)]
pub struct TickGate {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl TickGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next tick id. Ids start at 1 and strictly increase.
    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Accept `tick` if it is newer than every tick accepted so far.
    pub fn accept(&self, tick: u64) -> bool {
        self.applied.fetch_max(tick, Ordering::SeqCst) < tick
    }

    pub fn last_applied(&self) -> u64 {
        self.applied.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Latest view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ViewState {
    /// Nothing has completed yet.
    #[default]
    Waiting,
    Ready(Snapshot),
    /// The newest completed fetch failed; carries the error chain.
    Failed(String),
}

/// What the renderers read. Replaced wholesale on every accepted result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatestView {
    pub tick: u64,
    pub fetched_at: Option<DateTime<Utc>>,
    pub state: ViewState,
}

impl LatestView {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match &self.state {
            ViewState::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            ViewState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Shared handle to the latest view.
pub type SharedView = Arc<Mutex<LatestView>>;

/// Lock the view even if a renderer panicked while holding it.
pub fn lock_view(shared: &SharedView) -> MutexGuard<'_, LatestView> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Applying results
// ---------------------------------------------------------------------------

/// A finished fetch, as delivered to the scheduler.
#[derive(Debug)]
pub struct Completed {
    pub tick: u64,
    pub latency: Duration,
    pub result: anyhow::Result<Snapshot>,
}

/// Run one fetch and time it.
pub fn fetch_tick(source: &dyn SnapshotSource, tick: u64) -> Completed {
    let started = Instant::now();
    let result = source.fetch();
    Completed {
        tick,
        latency: started.elapsed(),
        result,
    }
}

/// Apply a finished fetch through the gate and journal its outcome.
///
/// Returns the outcome that was journaled.
pub fn apply(
    gate: &TickGate,
    shared: &SharedView,
    journal: &PollJournal,
    done: Completed,
) -> PollOutcome {
    let latency_ms = u64::try_from(done.latency.as_millis()).unwrap_or(u64::MAX);
    let error = done.result.as_ref().err().map(|e| format!("{e:#}"));

    let outcome = if !gate.accept(done.tick) {
        PollOutcome::Stale
    } else {
        let (state, outcome) = match done.result {
            Ok(snapshot) => (ViewState::Ready(snapshot), PollOutcome::Applied),
            Err(_) => (
                ViewState::Failed(error.clone().unwrap_or_default()),
                PollOutcome::Error,
            ),
        };
        *lock_view(shared) = LatestView {
            tick: done.tick,
            fetched_at: Some(Utc::now()),
            state,
        };
        outcome
    };

    journal.record(&PollLogEntry::now(done.tick, outcome, latency_ms, error));
    outcome
}

/// Single synchronous fetch, for `watch --once` and `health`.
pub fn fetch_once(source: &dyn SnapshotSource, journal: &PollJournal) -> LatestView {
    let gate = TickGate::new();
    let shared = SharedView::default();
    let done = fetch_tick(source, gate.issue());
    apply(&gate, &shared, journal, done);
    let view = lock_view(&shared).clone();
    view
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Background polling loop. Stops when dropped.
pub struct Poller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Start polling `source` every `interval`, publishing into `shared`.
    pub fn spawn(
        source: Arc<dyn SnapshotSource>,
        interval: Duration,
        shared: SharedView,
        journal: PollJournal,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let gate = TickGate::new();
            let (tx, rx) = mpsc::channel::<Completed>();
            let mut next_tick = Instant::now();

            while !stop_flag.load(Ordering::Relaxed) {
                let now = Instant::now();
                if now >= next_tick {
                    spawn_fetch(Arc::clone(&source), gate.issue(), tx.clone());
                    next_tick = now + interval;
                }

                let wait = next_tick.saturating_duration_since(Instant::now()).min(STOP_CHECK);
                match rx.recv_timeout(wait) {
                    Ok(done) => {
                        apply(&gate, &shared, &journal, done);
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop the scheduler and wait for it. In-flight fetches finish on their
    /// own threads and their results are discarded.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_fetch(source: Arc<dyn SnapshotSource>, tick: u64, tx: Sender<Completed>) {
    thread::spawn(move || {
        // The scheduler may be gone by now.
        let _ = tx.send(fetch_tick(source.as_ref(), tick));
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    struct FixedSource {
        fail: bool,
    }

    impl SnapshotSource for FixedSource {
        fn fetch(&self) -> anyhow::Result<Snapshot> {
            if self.fail {
                bail!("connection refused");
            }
            Ok(Snapshot::default())
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    fn completed(tick: u64, ok: bool) -> Completed {
        Completed {
            tick,
            latency: Duration::from_millis(5),
            result: if ok {
                Ok(Snapshot::default())
            } else {
                Err(anyhow::anyhow!("timed out"))
            },
        }
    }

    #[test]
    fn gate_issues_increasing_ticks() {
        let gate = TickGate::new();
        assert_eq!(gate.issue(), 1);
        assert_eq!(gate.issue(), 2);
        assert_eq!(gate.last_applied(), 0);
    }

    #[test]
    fn gate_rejects_older_and_repeated_ticks() {
        let gate = TickGate::new();
        assert!(gate.accept(2));
        assert!(!gate.accept(1));
        assert!(!gate.accept(2));
        assert!(gate.accept(3));
        assert_eq!(gate.last_applied(), 3);
    }

    #[test]
    fn late_result_does_not_overwrite_newer_view() {
        let gate = TickGate::new();
        let shared = SharedView::default();
        let journal = PollJournal::disabled();

        assert_eq!(apply(&gate, &shared, &journal, completed(2, true)), PollOutcome::Applied);
        assert_eq!(apply(&gate, &shared, &journal, completed(1, false)), PollOutcome::Stale);

        let view = lock_view(&shared);
        assert_eq!(view.tick, 2);
        assert!(view.snapshot().is_some());
    }

    #[test]
    fn failure_after_success_replaces_view() {
        let gate = TickGate::new();
        let shared = SharedView::default();
        let journal = PollJournal::disabled();

        apply(&gate, &shared, &journal, completed(1, true));
        assert_eq!(apply(&gate, &shared, &journal, completed(2, false)), PollOutcome::Error);

        let view = lock_view(&shared);
        assert!(view.snapshot().is_none());
        assert_eq!(view.error(), Some("timed out"));
    }

    #[test]
    fn fetch_once_reports_both_states() {
        let journal = PollJournal::disabled();
        let ok = fetch_once(&FixedSource { fail: false }, &journal);
        assert_eq!(ok.tick, 1);
        assert!(ok.fetched_at.is_some());
        assert!(ok.snapshot().is_some());

        let failed = fetch_once(&FixedSource { fail: true }, &journal);
        assert_eq!(failed.error(), Some("connection refused"));
    }

    #[test]
    fn poller_publishes_first_result() {
        let shared = SharedView::default();
        let poller = Poller::spawn(
            Arc::new(FixedSource { fail: false }),
            Duration::from_millis(20),
            Arc::clone(&shared),
            PollJournal::disabled(),
        );

        let deadline = Instant::now() + Duration::from_secs(5);
        while lock_view(&shared).snapshot().is_none() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        poller.stop();

        assert!(lock_view(&shared).tick >= 1);
        assert!(lock_view(&shared).snapshot().is_some());
    }
}
