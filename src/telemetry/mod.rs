//! Telemetry snapshot published by the core's metrics endpoint.
//!
//! The endpoint serves Go expvar JSON at `/debug/vars`. Every top-level
//! section is optional (statistics and observatory are opt-in in the core),
//! and unknown keys are ignored. Maps are ordered by key so that rendering
//! is deterministic.

pub mod client;

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use client::TelemetryClient;

/// Anything that can produce a fresh snapshot.
pub trait SnapshotSource: Send + Sync {
    fn fetch(&self) -> Result<Snapshot>;

    /// Human-readable location, used in hints.
    fn describe(&self) -> String;
}

/// One parsed `/debug/vars` body. Replaced wholesale on every poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub version: Option<VersionInfo>,
    pub core: Option<CoreInfo>,
    pub random_tls_fingerprint: Option<TlsFingerprint>,
    pub memstats: Option<MemStats>,
    pub observatory: Option<BTreeMap<String, ProbeResult>>,
    pub stats: Option<Stats>,
    pub dns: Option<BTreeMap<String, DnsCache>>,
    pub fake_dns: Option<Vec<FakeDnsPool>>,
}

impl Snapshot {
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// First line of the core's version banner.
    pub fn version_statement(&self) -> Option<&str> {
        self.version
            .as_ref()?
            .version_statement
            .first()
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionInfo {
    pub version: String,
    pub version_statement: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreInfo {
    pub system: SystemInfo,
    pub runtime: RuntimeInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemInfo {
    pub numcpu: u32,
    pub aesgcm: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeInfo {
    /// Seconds since the core started.
    pub uptime: u64,
    pub numgos: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsFingerprint {
    pub client: String,
    pub version: String,
}

/// Subset of Go's `runtime.MemStats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct MemStats {
    pub alloc: u64,
    pub heap_sys: u64,
    pub stack_sys: u64,
    #[serde(rename = "NumGC")]
    pub num_gc: u64,
    #[serde(rename = "NumForcedGC")]
    pub num_forced_gc: u64,
}

/// Observatory probe result for one outbound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeResult {
    pub alive: bool,
    /// Round-trip delay in milliseconds.
    pub delay: u64,
    /// Unix seconds of the last successful probe.
    pub last_seen_time: i64,
    /// Unix seconds of the last probe attempt.
    pub last_try_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub outbound: Option<BTreeMap<String, Traffic>>,
    pub inbound: Option<BTreeMap<String, Traffic>>,
    /// Balancer name → picked outbound tag → pick count.
    pub balancer: Option<BTreeMap<String, BTreeMap<String, u64>>>,
    pub dns: Option<BTreeMap<String, DnsServerStats>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Traffic {
    pub downlink: u64,
    pub uplink: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsServerStats {
    pub cache_size: u64,
    pub cache_alloc: u64,
    pub cache_cleanup: u64,
    pub cache_expire: u64,
    pub cache_flush: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub query_success: u64,
    pub query_empty: u64,
    pub query_failure: u64,
    pub query_timeout: u64,
}

impl DnsServerStats {
    /// Counters in display order, paired with their column titles.
    pub fn columns(&self) -> [(&'static str, u64); 11] {
        [
            ("Cache size", self.cache_size),
            ("Cache alloc", self.cache_alloc),
            ("Cache cleanup", self.cache_cleanup),
            ("Cache expire", self.cache_expire),
            ("Cache flush", self.cache_flush),
            ("Cache hits", self.cache_hits),
            ("Cache misses", self.cache_misses),
            ("Query success", self.query_success),
            ("Query empty", self.query_empty),
            ("Query failure", self.query_failure),
            ("Query timeout", self.query_timeout),
        ]
    }
}

/// Cache contents of one DNS server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsCache {
    pub cache: BTreeMap<String, DnsCacheEntry>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsCacheEntry {
    #[serde(rename = "A")]
    pub a: Option<Vec<String>>,
    #[serde(rename = "A_expire")]
    pub a_expire: i64,
    #[serde(rename = "AAAA")]
    pub aaaa: Option<Vec<String>>,
    #[serde(rename = "AAAA_expire")]
    pub aaaa_expire: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FakeDnsPool {
    pub pool: String,
    pub size: u64,
    pub cap: u64,
    pub query_key: u64,
    pub query_value: u64,
    pub items: Vec<FakeDnsItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FakeDnsItem {
    pub key: String,
    pub value: String,
}
