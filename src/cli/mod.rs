//! CLI command implementations for xstat.
//!
//! Provides subcommand handlers for:
//! - `xstat watch`: live dashboard in the terminal
//! - `xstat describe <tag>`: decode one routing identifier
//! - `xstat web`: browser dashboard with a background poller
//! - `xstat health`: check config, store, metrics endpoint and journal
//! - `xstat stats`: poll journal summary
//! - `xstat config show|init|set|reset`: configuration management

use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::analytics::logger::PollJournal;
use crate::analytics::reporter::{self, PollStats};
use crate::config::{self, XstatConfig};
use crate::dashboard::{self, Tab, terminal};
use crate::describe::{describe_chain, describe_inbound};
use crate::poll::{self, LatestView, Poller, SharedView, lock_view};
use crate::store::ConfigStore;
use crate::telemetry::{SnapshotSource, TelemetryClient};
use crate::web::{self, WebState};

/// Output format for analytics commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Load the router's config store named by `general.store_path`.
fn load_store(cfg: &XstatConfig) -> Result<ConfigStore> {
    ConfigStore::load(&config::expand_home(&cfg.general.store_path))
}

// ---------------------------------------------------------------------------
// xstat watch
// ---------------------------------------------------------------------------

/// Poll the metrics endpoint and redraw the dashboard in place.
pub fn run_watch(interval_secs: Option<u64>, once: bool, tab: Option<&str>) -> Result<()> {
    let cfg = config::load();
    let store = load_store(&cfg)?;
    let client = TelemetryClient::from_config(&cfg.telemetry, &store);
    let journal = PollJournal::from_config(&cfg.logging);

    let tab = match tab {
        Some(raw) => Some(Tab::parse(raw).with_context(|| {
            format!("unknown tab '{raw}' (expected observatory, outbounds, inbounds, dns or fake_dns)")
        })?),
        None => None,
    };

    if once || !store.metrics_enabled() {
        let view = if store.metrics_enabled() {
            poll::fetch_once(&client, &journal)
        } else {
            LatestView::default()
        };
        print!("{}", render_view(&view, &store, &client, tab));
        return Ok(());
    }

    let interval = Duration::from_secs(interval_secs.unwrap_or(cfg.general.refresh_interval_secs).max(1));
    let shared = SharedView::default();
    let endpoint = client.url().to_string();
    let _poller = Poller::spawn(Arc::new(client.clone()), interval, Arc::clone(&shared), journal);

    loop {
        let view = lock_view(&shared).clone();
        let frame = render_view(&view, &store, &client, tab);
        let mut stdout = std::io::stdout().lock();
        // Clear screen and home the cursor
        write!(stdout, "\x1b[2J\x1b[H{frame}")?;
        writeln!(
            stdout,
            "\n{}",
            format!("Polling {endpoint} every {}s. Press Ctrl+C to stop.", interval.as_secs()).dimmed()
        )?;
        stdout.flush()?;
        drop(stdout);
        thread::sleep(Duration::from_secs(1));
    }
}

fn render_view(
    view: &LatestView,
    store: &ConfigStore,
    client: &TelemetryClient,
    tab: Option<Tab>,
) -> String {
    let board = dashboard::build(view, store, &client.describe(), chrono::Utc::now().timestamp());
    terminal::render(&board, tab)
}

// ---------------------------------------------------------------------------
// xstat describe
// ---------------------------------------------------------------------------

/// Decode one outbound chain (or inbound tag) against the config store.
pub fn run_describe(tag: &str, inbound: bool, json: bool) -> Result<()> {
    let cfg = config::load();
    let store = load_store(&cfg)?;
    let description = if inbound {
        describe_inbound(&store, tag)
    } else {
        describe_chain(&store, tag)
    };

    if json {
        let value = serde_json::json!({
            "tag": tag,
            "inbound": inbound,
            "text": description.to_string(),
            "fragments": description,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{description}");
    for badge in description.badges() {
        if let Some(tooltip) = &badge.tooltip {
            println!("  {} {}", badge.to_string().cyan(), tooltip.replace('\n', "; ").dimmed());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// xstat web
// ---------------------------------------------------------------------------

/// Serve the browser dashboard, polling in the background.
pub fn run_web(addr: Option<&str>) -> Result<()> {
    let cfg = config::load();
    let store = Arc::new(load_store(&cfg)?);
    let client = TelemetryClient::from_config(&cfg.telemetry, &store);
    let journal = PollJournal::from_config(&cfg.logging);
    let interval = Duration::from_secs(cfg.general.refresh_interval_secs.max(1));
    let shared = SharedView::default();

    let _poller = store.metrics_enabled().then(|| {
        Poller::spawn(
            Arc::new(client.clone()),
            interval,
            Arc::clone(&shared),
            journal.clone(),
        )
    });

    let state = WebState {
        store,
        shared,
        journal,
        endpoint: client.url().to_string(),
        refresh_secs: interval.as_secs(),
    };
    web::serve(addr.unwrap_or(&cfg.web.addr), &state)
}

// ---------------------------------------------------------------------------
// xstat stats
// ---------------------------------------------------------------------------

/// Show poll journal statistics.
pub fn run_stats(format: OutputFormat, days: Option<u32>) -> Result<()> {
    let cfg = config::load();
    let journal = PollJournal::from_config(&cfg.logging);
    let stats = reporter::compute_stats(&journal, days);

    if stats.total_polls == 0 {
        println!(
            "{}",
            "No data yet. Run `xstat watch` or `xstat web` to record polls.".yellow()
        );
        return Ok(());
    }

    match format {
        OutputFormat::Json => print_stats_json(&stats)?,
        OutputFormat::Csv => print_stats_csv(&stats),
        OutputFormat::Table => print_stats_table(&stats),
    }

    Ok(())
}

fn print_stats_table(stats: &PollStats) {
    println!("{}", "xstat Poll Report".bold().cyan());
    println!("{}", "=".repeat(60));
    println!();

    let dist = &stats.outcomes;
    println!("  {} {}", "Total polls:   ".bold(), format_number(stats.total_polls));
    println!(
        "  {} {} ({:.0}%)  Stale: {} ({:.0}%)  Errors: {} ({:.0}%)",
        "Applied:       ".bold(),
        dist.applied,
        dist.pct(dist.applied),
        dist.stale,
        dist.pct(dist.stale),
        dist.error,
        dist.pct(dist.error),
    );
    println!(
        "  {} {:.1}ms avg, {}ms max",
        "Latency:       ".bold(),
        stats.avg_latency_ms,
        stats.max_latency_ms
    );
    if let Some((ts, message)) = &stats.last_error {
        println!(
            "  {} {} {}",
            "Last error:    ".bold(),
            ts.get(..19).unwrap_or(ts).dimmed(),
            truncate(message, 60).red()
        );
    }
    println!();

    if !stats.daily.is_empty() {
        println!("{}", "Daily".bold().cyan());
        println!("  {:<12} {:>8} {:>8} {:>12}", "Date", "Polls", "Errors", "Avg latency");
        println!("  {}", "-".repeat(44));
        for (i, day) in stats.daily.iter().enumerate() {
            let line = format!(
                "  {:<12} {:>8} {:>8} {:>10.1}ms",
                day.date,
                format_number(day.polls),
                format_number(day.errors),
                day.avg_latency_ms,
            );
            if i % 2 == 0 {
                println!("{}", line);
            } else {
                println!("{}", line.dimmed());
            }
        }
    }
}

fn print_stats_json(stats: &PollStats) -> Result<()> {
    let value = serde_json::json!({
        "total_polls": stats.total_polls,
        "outcomes": {
            "applied": stats.outcomes.applied,
            "stale": stats.outcomes.stale,
            "error": stats.outcomes.error,
        },
        "avg_latency_ms": stats.avg_latency_ms,
        "max_latency_ms": stats.max_latency_ms,
        "last_error": stats.last_error.as_ref().map(|(ts, message)| serde_json::json!({
            "timestamp": ts,
            "message": message,
        })),
        "daily": stats.daily.iter().map(|d| serde_json::json!({
            "date": d.date,
            "polls": d.polls,
            "errors": d.errors,
            "avg_latency_ms": d.avg_latency_ms,
        })).collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_stats_csv(stats: &PollStats) {
    println!("date,polls,errors,avg_latency_ms");
    for d in &stats.daily {
        println!("{},{},{},{:.1}", d.date, d.polls, d.errors, d.avg_latency_ms);
    }
}

// ---------------------------------------------------------------------------
// xstat health
// ---------------------------------------------------------------------------

/// Check config files, the config store, the metrics endpoint and the journal.
pub fn run_health() -> Result<()> {
    println!("{}", "xstat Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    // 0. Config file status
    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let cfg = config::load();
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.xstat/config.toml found"
        } else {
            "not found (run `xstat config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".xstat.toml found"
        } else {
            "none (optional)"
        },
    );

    // 1. Config store
    let store = match load_store(&cfg) {
        Ok(store) => {
            print_health_item(
                "Config store",
                true,
                &format!(
                    "{} ({} sections)",
                    cfg.general.store_path,
                    store.sections().len()
                ),
            );
            store
        }
        Err(e) => {
            print_health_item("Config store", false, &format!("{e:#}"));
            ConfigStore::default()
        }
    };

    // 2. Metrics server
    let enabled = store.metrics_enabled();
    print_health_item(
        "Metrics server",
        enabled,
        if enabled {
            "enabled"
        } else {
            "disabled (set general.metrics_server_enable to 1)"
        },
    );

    // 3. Endpoint
    let client = TelemetryClient::from_config(&cfg.telemetry, &store);
    match client.fetch() {
        Ok(snapshot) => {
            print_health_item(
                "Metrics endpoint",
                true,
                &format!("reachable at {}", client.url()),
            );
            print_health_item(
                "Core version",
                snapshot.version.is_some(),
                snapshot.version_statement().unwrap_or("not reported"),
            );
        }
        Err(e) => print_health_item(
            "Metrics endpoint",
            false,
            &dashboard::failure_hint(&format!("{e:#}"), client.url()),
        ),
    }

    // 4. Poll journal
    let journal = PollJournal::from_config(&cfg.logging);
    match journal.path() {
        Some(path) if path.exists() => print_health_item(
            "Poll journal",
            true,
            &format!("{} entries", format_number(journal.read_all().len())),
        ),
        Some(_) => print_health_item("Poll journal", true, "no log file yet"),
        None => print_health_item("Poll journal", false, "disabled"),
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<25} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// xstat config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective xstat Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    // Show source info
    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    if global_exists {
        println!("  {} {}", "✓".green(), "~/.xstat/config.toml".dimmed());
    } else {
        println!(
            "  {} {}",
            "·".dimmed(),
            "~/.xstat/config.toml (not found)".dimmed()
        );
    }
    if project_exists {
        println!("  {} {}", "✓".green(), ".xstat.toml".dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), ".xstat.toml (not found)".dimmed());
    }
    println!(
        "  {} {}",
        "·".dimmed(),
        "XSTAT_* environment variables".dimmed()
    );

    Ok(())
}

/// Initialize a default config file at `~/.xstat/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Edit the file to point xstat at your router's store and metrics port.".dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Format a number with comma separators for readability.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hell…");
        assert_eq!(truncate("déjà vu", 4), "déj…");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("csv")), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::from_str_opt(Some("unknown")),
            OutputFormat::Table
        );
    }
}
