//! Poll journal: one JSONL line per completed telemetry fetch, plus the
//! aggregation behind `xstat stats`.

pub mod logger;
pub mod reporter;
