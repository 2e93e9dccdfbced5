//! Dashboard view model.
//!
//! [`build`] turns the latest poll result into titled tables grouped by tab.
//! Every cell is a [`Description`], so telemetry tags are decoded through
//! the describers and both the terminal and the web page render the same
//! model. The builder takes `now` explicitly and never reads the clock.

pub mod format;
pub mod terminal;

use serde::Serialize;

use crate::describe::{Badge, Description, describe_chain, describe_inbound, describe_outbound_tag};
use crate::poll::{LatestView, ViewState};
use crate::store::ConfigStore;
use crate::telemetry::{DnsCache, FakeDnsPool, Snapshot};

use format::{clamped_delta, floor_pct, format_bytes, format_duration, seconds_ago};

pub const METRICS_DISABLED: &str =
    "Xray metrics server not enabled. Enable Xray metrics server to see details.";
pub const COLLECTING: &str = "Collecting data...";
pub const NO_VERSION: &str =
    "Show some statistics of Xray. If nothing here, enable statistics and / or observatory for Xray.";

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    Observatory,
    Outbounds,
    Inbounds,
    Dns,
    FakeDns,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Observatory,
        Tab::Outbounds,
        Tab::Inbounds,
        Tab::Dns,
        Tab::FakeDns,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Observatory => "observatory",
            Self::Outbounds => "outbounds",
            Self::Inbounds => "inbounds",
            Self::Dns => "dns",
            Self::FakeDns => "fake_dns",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Observatory => "Observatory",
            Self::Outbounds => "Outbounds",
            Self::Inbounds => "Inbounds",
            Self::Dns => "DNS",
            Self::FakeDns => "FakeDNS",
        }
    }

    /// Accepts the id or the title, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|tab| tab.id() == raw || tab.title().to_ascii_lowercase() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    MetricsDisabled,
    Waiting,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub tab: Tab,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Empty for key/value tables.
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Description>>,
}

impl Table {
    fn new(tab: Tab, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tab,
            title: title.into(),
            description: Some(description.into()),
            headers: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn headers(mut self, headers: &[&str]) -> Self {
        self.headers = headers.iter().map(|h| (*h).to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub status: Status,
    /// Version banner, or a notice/hint when there is nothing to show.
    pub headline: String,
    pub tables: Vec<Table>,
}

impl Dashboard {
    pub fn tables_in(&self, tab: Tab) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(move |t| t.tab == tab)
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build the dashboard for the current view.
///
/// `endpoint` is shown in the hint when the last fetch failed; `now` is a
/// unix timestamp in seconds.
pub fn build(view: &LatestView, store: &ConfigStore, endpoint: &str, now: i64) -> Dashboard {
    if !store.metrics_enabled() {
        return Dashboard {
            status: Status::MetricsDisabled,
            headline: METRICS_DISABLED.to_string(),
            tables: Vec::new(),
        };
    }

    match &view.state {
        ViewState::Waiting => Dashboard {
            status: Status::Waiting,
            headline: COLLECTING.to_string(),
            tables: Vec::new(),
        },
        ViewState::Failed(error) => Dashboard {
            status: Status::Failed,
            headline: failure_hint(error, endpoint),
            tables: Vec::new(),
        },
        ViewState::Ready(snapshot) => Dashboard {
            status: Status::Ready,
            headline: snapshot.version_statement().unwrap_or(NO_VERSION).to_string(),
            tables: build_tables(snapshot, store, now),
        },
    }
}

pub fn failure_hint(error: &str, endpoint: &str) -> String {
    format!(
        "Failed to collect data ({error}); check that the metrics endpoint at {endpoint} is reachable."
    )
}

/// All tables for a snapshot, in tab order. Absent sections yield nothing.
pub fn build_tables(snapshot: &Snapshot, store: &ConfigStore, now: i64) -> Vec<Table> {
    let mut tables = Vec::new();
    tables.extend(core_table(snapshot));
    tables.extend(observatory_table(snapshot, store, now));
    tables.extend(outbound_table(snapshot, store));
    tables.extend(balancer_table(snapshot, store));
    tables.extend(inbound_table(snapshot, store));
    tables.extend(dns_server_table(snapshot));
    tables.extend(dns_cache_tables(snapshot, now));
    tables.extend(fake_dns_tables(snapshot));
    tables
}

fn core_table(snapshot: &Snapshot) -> Option<Table> {
    let core = snapshot.core.as_ref()?;
    let mut table = Table::new(
        Tab::Observatory,
        "Core Information",
        "Basic information about system and Xray runtime.",
    );

    let mut row = |key: &str, value: String| {
        table
            .rows
            .push(vec![Description::text(key), Description::text(value)]);
    };

    if let Some(version) = &snapshot.version {
        let build = snapshot
            .version_statement()
            .and_then(|s| s.split(' ').nth(5))
            .unwrap_or("unknown");
        row("Version", format!("{} ({build})", version.version));
    }
    row("Total CPU Cores", core.system.numcpu.to_string());
    row(
        "Hardware AES-GCM acceleration",
        if core.system.aesgcm {
            "Supported"
        } else {
            "Not supported"
        }
        .to_string(),
    );
    if let Some(fp) = &snapshot.random_tls_fingerprint {
        row("Random TLS Fingerprint", format!("{} {}", fp.client, fp.version));
    }
    row("Uptime", format_duration(core.runtime.uptime));
    row("Goroutines", core.runtime.numgos.to_string());
    if let Some(mem) = &snapshot.memstats {
        row(
            "Memory Stats",
            format!(
                "Alloc: {}; HeapSys: {}; StackSys: {}; GC: {} ({} Forced)",
                format_bytes(mem.alloc),
                format_bytes(mem.heap_sys),
                format_bytes(mem.stack_sys),
                mem.num_gc,
                mem.num_forced_gc,
            ),
        );
    }

    Some(table)
}

fn observatory_table(snapshot: &Snapshot, store: &ConfigStore, now: i64) -> Option<Table> {
    let observatory = snapshot.observatory.as_ref()?;
    let mut table = Table::new(
        Tab::Observatory,
        "Outbound Observatory",
        "Availability of outbound servers are probed every few seconds.",
    )
    .headers(&["Tag", "Latency", "Last seen", "Last check"]);

    for (tag, probe) in observatory {
        let latency = if probe.alive {
            format!("{} ms", probe.delay)
        } else {
            "unreachable".to_string()
        };
        table.rows.push(vec![
            describe_chain(store, tag),
            Description::text(latency),
            Description::text(seconds_ago(now, probe.last_seen_time)),
            Description::text(seconds_ago(now, probe.last_try_time)),
        ]);
    }
    Some(table)
}

fn outbound_table(snapshot: &Snapshot, store: &ConfigStore) -> Option<Table> {
    let outbound = snapshot.stats.as_ref()?.outbound.as_ref()?;
    let mut table = Table::new(
        Tab::Outbounds,
        "Outbound Statistics",
        "Data transferred for outbounds since Xray start.",
    )
    .headers(&["Tag", "Downlink", "Uplink"]);

    for (tag, traffic) in outbound {
        table.rows.push(vec![
            describe_chain(store, tag),
            Description::text(format_bytes(traffic.downlink)),
            Description::text(format_bytes(traffic.uplink)),
        ]);
    }
    Some(table)
}

fn balancer_table(snapshot: &Snapshot, store: &ConfigStore) -> Option<Table> {
    let balancers = snapshot.stats.as_ref()?.balancer.as_ref()?;
    let mut table = Table::new(
        Tab::Outbounds,
        "Balancer Statistics",
        "Outbound picks by balancers.",
    )
    .headers(&["Balancer", "Outbound picks"]);

    for (name, picks) in balancers {
        let sum = picks.values().fold(0u64, |acc, n| acc.saturating_add(*n));
        let mut cell = Description::new();
        for (tag, count) in picks {
            cell.push(Badge::value(format!(
                "{}: {count} ({}%)",
                describe_outbound_tag(store, tag),
                floor_pct(*count, sum)
            )));
        }
        table.rows.push(vec![Description::text(name.as_str()), cell]);
    }
    Some(table)
}

fn inbound_table(snapshot: &Snapshot, store: &ConfigStore) -> Option<Table> {
    let inbound = snapshot.stats.as_ref()?.inbound.as_ref()?;
    let mut table = Table::new(
        Tab::Inbounds,
        "Inbound Statistics",
        "Data transferred for inbounds since Xray start.",
    )
    .headers(&["Tag", "Downlink", "Uplink"]);

    for (tag, traffic) in inbound {
        table.rows.push(vec![
            describe_inbound(store, tag),
            Description::text(format_bytes(traffic.downlink)),
            Description::text(format_bytes(traffic.uplink)),
        ]);
    }
    Some(table)
}

fn dns_server_table(snapshot: &Snapshot) -> Option<Table> {
    let servers = snapshot.stats.as_ref()?.dns.as_ref()?;
    let mut table = Table::new(
        Tab::Dns,
        "DNS Server and Cache Information",
        "Xray Local DNS server statistics (queries and cache details).",
    );

    let mut headers = vec!["Server".to_string()];
    headers.extend(
        crate::telemetry::DnsServerStats::default()
            .columns()
            .iter()
            .map(|(title, _)| (*title).to_string()),
    );
    table.headers = headers;

    for (server, counters) in servers {
        let mut row = vec![Description::text(server.as_str())];
        row.extend(
            counters
                .columns()
                .iter()
                .map(|(_, n)| Description::text(n.to_string())),
        );
        table.rows.push(row);
    }
    Some(table)
}

/// Cache tables belong to the DNS server section and only appear with it.
fn dns_cache_tables(snapshot: &Snapshot, now: i64) -> Vec<Table> {
    let has_server_stats = snapshot.stats.as_ref().is_some_and(|s| s.dns.is_some());
    let Some(caches) = snapshot.dns.as_ref().filter(|_| has_server_stats) else {
        return Vec::new();
    };
    caches
        .iter()
        .map(|(server, cache)| dns_cache_table(server, cache, now))
        .collect()
}

fn dns_cache_table(server: &str, cache: &DnsCache, now: i64) -> Table {
    let last_error = cache.last_error.as_deref().unwrap_or("");
    let mut table = Table::new(
        Tab::Dns,
        server,
        format!("Last query failure reason: {last_error}"),
    )
    .headers(&["Domain Name", "Values IPv4", "Values IPv6"]);

    for (domain, entry) in &cache.cache {
        table.rows.push(vec![
            Description::text(domain.as_str()),
            dns_records(entry.a.as_deref().unwrap_or_default(), entry.a_expire, now),
            dns_records(entry.aaaa.as_deref().unwrap_or_default(), entry.aaaa_expire, now),
        ]);
    }
    table
}

/// Cached records of one family with their remaining TTL.
pub fn dns_records(records: &[String], expire: i64, now: i64) -> Description {
    let ttl = Badge::named("ttl", format!("{}s", clamped_delta(expire, now)));
    match records {
        [] => Description::text("empty or expired"),
        [only] => Description::text(only.as_str()).with(ttl),
        [first, ..] => Description::text(format!("{first}, ..."))
            .with(
                Badge::value(format!("+{}", records.len() - 1)).with_tooltip(format!(
                    "{} in cache\n{}",
                    records.len(),
                    records.join("\n")
                )),
            )
            .with(ttl),
    }
}

fn fake_dns_tables(snapshot: &Snapshot) -> Vec<Table> {
    snapshot
        .fake_dns
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(fake_dns_table)
        .collect()
}

fn fake_dns_table(pool: &FakeDnsPool) -> Table {
    let mut table = Table::new(
        Tab::FakeDns,
        format!("FakeDNS Pool: {}", pool.pool),
        format!(
            "Pool usage: {} / {}; {} domain to fake IP lookups, {} fake IP to domain lookups",
            pool.size, pool.cap, pool.query_key, pool.query_value
        ),
    )
    .headers(&["Domain", "Value"]);

    for item in &pool.items {
        table.rows.push(vec![
            Description::text(item.key.as_str()),
            Description::text(item.value.as_str()),
        ]);
    }
    table
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
