use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use xstat::analytics::logger::{PollJournal, PollOutcome};
use xstat::poll::{Poller, SharedView, lock_view};
use xstat::telemetry::{Snapshot, SnapshotSource, VersionInfo};

/// First call is slow, every later call answers at once.
struct SlowFirstSource {
    calls: AtomicU64,
}

impl SnapshotSource for SlowFirstSource {
    fn fetch(&self) -> anyhow::Result<Snapshot> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let version = if call == 0 {
            thread::sleep(Duration::from_millis(400));
            "slow"
        } else {
            "fast"
        };
        Ok(Snapshot {
            version: Some(VersionInfo {
                version: version.to_string(),
                version_statement: Vec::new(),
            }),
            ..Snapshot::default()
        })
    }

    fn describe(&self) -> String {
        "slow-first".to_string()
    }
}

fn temp_journal(name: &str) -> PollJournal {
    let path = std::env::temp_dir()
        .join(format!("xstat-it-{}-{name}", std::process::id()))
        .join("poll-log.jsonl");
    let _ = std::fs::remove_file(&path);
    PollJournal::at(path)
}

#[test]
fn late_first_fetch_is_discarded() {
    let shared = SharedView::default();
    let journal = temp_journal("stale");
    let poller = Poller::spawn(
        Arc::new(SlowFirstSource {
            calls: AtomicU64::new(0),
        }),
        Duration::from_millis(50),
        Arc::clone(&shared),
        journal.clone(),
    );

    // Wait until the slow first fetch has come back and been judged.
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline
        && !journal
            .read_all()
            .iter()
            .any(|e| e.tick == 1)
    {
        thread::sleep(Duration::from_millis(20));
    }
    poller.stop();

    let entries = journal.read_all();
    let first = entries.iter().find(|e| e.tick == 1).unwrap();
    assert_eq!(first.outcome, PollOutcome::Stale);
    assert!(entries.iter().any(|e| e.outcome == PollOutcome::Applied));

    let view = lock_view(&shared);
    assert!(view.tick > 1);
    assert_eq!(
        view.snapshot().and_then(|s| s.version.as_ref()).map(|v| v.version.as_str()),
        Some("fast")
    );
}

#[test]
fn applied_ticks_only_increase() {
    let shared = SharedView::default();
    let journal = temp_journal("monotonic");
    let poller = Poller::spawn(
        Arc::new(SlowFirstSource {
            calls: AtomicU64::new(1),
        }),
        Duration::from_millis(20),
        Arc::clone(&shared),
        journal.clone(),
    );
    thread::sleep(Duration::from_millis(300));
    poller.stop();

    let applied: Vec<u64> = journal
        .read_all()
        .iter()
        .filter(|e| e.outcome == PollOutcome::Applied)
        .map(|e| e.tick)
        .collect();
    assert!(!applied.is_empty());
    assert!(applied.windows(2).all(|w| w[0] < w[1]));
}
