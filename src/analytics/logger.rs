use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::expand_home;
use crate::config::schema::LoggingConfig;

// ---------------------------------------------------------------------------
// Poll log entry (JSONL)
// ---------------------------------------------------------------------------

/// What happened to one completed telemetry fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    /// The snapshot replaced the view.
    Applied,
    /// A newer tick had already been applied; the result was dropped.
    Stale,
    /// The fetch or JSON parse failed.
    Error,
}

impl std::fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Stale => write!(f, "stale"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single entry in the poll journal (`~/.xstat/poll-log.jsonl`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollLogEntry {
    pub timestamp: String,
    pub tick: u64,
    pub outcome: PollOutcome,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl PollLogEntry {
    pub fn now(tick: u64, outcome: PollOutcome, latency_ms: u64, error: Option<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            tick,
            outcome,
            latency_ms,
            error,
        }
    }
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// Append-only JSONL journal. A disabled journal drops every entry.
#[derive(Debug, Clone)]
pub struct PollJournal {
    path: Option<PathBuf>,
}

impl PollJournal {
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            path: config.enabled.then(|| expand_home(&config.path)),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append an entry. Best-effort: write failures are ignored.
    pub fn record(&self, entry: &PollLogEntry) {
        if let Some(path) = &self.path {
            let _ = append_log_entry(path, entry);
        }
    }

    /// Read all entries, silently skipping malformed lines.
    pub fn read_all(&self) -> Vec<PollLogEntry> {
        let Some(path) = &self.path else {
            return Vec::new();
        };

        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str::<PollLogEntry>(&line).ok())
            .collect()
    }

    /// Read entries from the last `days` days; `None` means all of them.
    pub fn read_since_days(&self, days: Option<u32>) -> Vec<PollLogEntry> {
        let entries = self.read_all();

        let Some(days) = days else {
            return entries;
        };

        let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days))).to_rfc3339();
        entries
            .into_iter()
            .filter(|e| e.timestamp >= cutoff)
            .collect()
    }
}

fn append_log_entry(path: &Path, entry: &PollLogEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}
