//! Poll journal reporter: aggregate fetch reliability and latency.
//!
//! Reads the JSONL poll journal and provides:
//! - **Summary**: outcome distribution, latency, most recent error
//! - **Daily**: per-day poll counts, errors and average latency

use std::collections::HashMap;

use crate::analytics::logger::{PollJournal, PollLogEntry, PollOutcome};

// ---------------------------------------------------------------------------
// Aggregated stats
// ---------------------------------------------------------------------------

/// Summary statistics for `xstat stats`.
#[derive(Debug, Default)]
pub struct PollStats {
    pub total_polls: usize,
    pub outcomes: OutcomeDistribution,
    /// Mean latency of fetches that returned a snapshot (applied or stale).
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
    /// `(timestamp, message)` of the most recent error.
    pub last_error: Option<(String, String)>,
    pub daily: Vec<DailyEntry>,
}

/// Distribution across poll outcomes.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct OutcomeDistribution {
    pub applied: usize,
    pub stale: usize,
    pub error: usize,
}

impl OutcomeDistribution {
    pub fn total(&self) -> usize {
        self.applied + self.stale + self.error
    }

    /// Percentage for a given count, 0.0 if there is nothing to compare.
    pub fn pct(&self, count: usize) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (count as f64 / total as f64) * 100.0
        }
    }
}

/// One day of poll activity.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyEntry {
    pub date: String,
    pub polls: usize,
    pub errors: usize,
    pub avg_latency_ms: f64,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Compute stats from the journal, optionally limited to the last `days`.
pub fn compute_stats(journal: &PollJournal, days: Option<u32>) -> PollStats {
    build_stats(&journal.read_since_days(days))
}

pub fn build_stats(entries: &[PollLogEntry]) -> PollStats {
    if entries.is_empty() {
        return PollStats::default();
    }

    let mut outcomes = OutcomeDistribution::default();
    for entry in entries {
        match entry.outcome {
            PollOutcome::Applied => outcomes.applied += 1,
            PollOutcome::Stale => outcomes.stale += 1,
            PollOutcome::Error => outcomes.error += 1,
        }
    }

    let successful: Vec<u64> = entries
        .iter()
        .filter(|e| e.outcome != PollOutcome::Error)
        .map(|e| e.latency_ms)
        .collect();
    let avg_latency_ms = mean(&successful);
    let max_latency_ms = successful.iter().copied().max().unwrap_or(0);

    let last_error = entries
        .iter()
        .filter(|e| e.outcome == PollOutcome::Error)
        .max_by(|a, b| a.timestamp.cmp(&b.timestamp))
        .map(|e| {
            (
                e.timestamp.clone(),
                e.error.clone().unwrap_or_else(|| "unknown error".to_string()),
            )
        });

    PollStats {
        total_polls: entries.len(),
        outcomes,
        avg_latency_ms,
        max_latency_ms,
        last_error,
        daily: compute_daily(entries),
    }
}

fn compute_daily(entries: &[PollLogEntry]) -> Vec<DailyEntry> {
    let mut daily: HashMap<String, Vec<&PollLogEntry>> = HashMap::new();
    for entry in entries {
        // RFC 3339 timestamps start with YYYY-MM-DD
        let date = entry.timestamp.get(..10).unwrap_or("unknown").to_string();
        daily.entry(date).or_default().push(entry);
    }

    let mut result: Vec<DailyEntry> = daily
        .into_iter()
        .map(|(date, group)| {
            let latencies: Vec<u64> = group
                .iter()
                .filter(|e| e.outcome != PollOutcome::Error)
                .map(|e| e.latency_ms)
                .collect();
            DailyEntry {
                date,
                polls: group.len(),
                errors: group
                    .iter()
                    .filter(|e| e.outcome == PollOutcome::Error)
                    .count(),
                avg_latency_ms: mean(&latencies),
            }
        })
        .collect();

    result.sort_by(|a, b| a.date.cmp(&b.date));
    result
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<u64>() as f64 / values.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: &str, tick: u64, outcome: PollOutcome, latency_ms: u64) -> PollLogEntry {
        PollLogEntry {
            timestamp: ts.to_string(),
            tick,
            outcome,
            latency_ms,
            error: (outcome == PollOutcome::Error).then(|| format!("failure at tick {tick}")),
        }
    }

    fn sample_entries() -> Vec<PollLogEntry> {
        vec![
            entry("2026-01-14T10:00:00+00:00", 1, PollOutcome::Applied, 10),
            entry("2026-01-14T10:00:05+00:00", 2, PollOutcome::Error, 3000),
            entry("2026-01-15T10:00:00+00:00", 3, PollOutcome::Applied, 30),
            entry("2026-01-15T10:00:05+00:00", 4, PollOutcome::Stale, 50),
            entry("2026-01-15T10:00:10+00:00", 5, PollOutcome::Error, 3000),
        ]
    }

    #[test]
    fn outcome_distribution() {
        let stats = build_stats(&sample_entries());
        assert_eq!(stats.total_polls, 5);
        assert_eq!(
            stats.outcomes,
            OutcomeDistribution {
                applied: 2,
                stale: 1,
                error: 2
            }
        );
        assert!((stats.outcomes.pct(2) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn latency_ignores_errors() {
        let stats = build_stats(&sample_entries());
        assert!((stats.avg_latency_ms - 30.0).abs() < f64::EPSILON);
        assert_eq!(stats.max_latency_ms, 50);
    }

    #[test]
    fn last_error_is_most_recent() {
        let stats = build_stats(&sample_entries());
        let (ts, message) = stats.last_error.unwrap();
        assert_eq!(ts, "2026-01-15T10:00:10+00:00");
        assert_eq!(message, "failure at tick 5");
    }

    #[test]
    fn daily_grouping_is_sorted() {
        let stats = build_stats(&sample_entries());
        assert_eq!(stats.daily.len(), 2);
        assert_eq!(stats.daily[0].date, "2026-01-14");
        assert_eq!(stats.daily[0].errors, 1);
        assert_eq!(stats.daily[1].polls, 3);
        assert!((stats.daily[1].avg_latency_ms - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_entries() {
        let stats = build_stats(&[]);
        assert_eq!(stats.total_polls, 0);
        assert_eq!(stats.outcomes.pct(0), 0.0);
        assert!(stats.last_error.is_none());
    }
}
