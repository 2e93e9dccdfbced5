/// Configuration schema and defaults for the xstat dashboard.
///
/// Defines the TOML-serializable configuration structure with the sections
/// `[general]`, `[telemetry]`, `[web]` and `[logging]`.
///
/// This is the dashboard's own configuration. The router's UCI package (the
/// config store that telemetry tags are resolved against) lives elsewhere;
/// `general.store_path` points at it.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level xstat configuration.
///
/// Maps directly to `~/.xstat/config.toml` and `.xstat.toml`. All sections
/// and fields are optional; missing values fall back to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XstatConfig {
    pub general: GeneralConfig,
    pub telemetry: TelemetryConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [general]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Path to the router's UCI package (file form or `uci show` export).
    pub store_path: String,
    /// Seconds between telemetry polls.
    pub refresh_interval_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            store_path: "/etc/config/xray_core".to_string(),
            refresh_interval_secs: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// [telemetry]
// ---------------------------------------------------------------------------

/// Where the core's metrics endpoint lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub host: String,
    /// Overrides `general.metrics_server_port` from the store when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub path: String,
    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
            path: "/debug/vars".to_string(),
            timeout_ms: 3000,
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address of `xstat web`.
    pub addr: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Poll journal settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether poll outcomes are journaled.
    pub enabled: bool,
    /// Journal file. `~` is expanded to the home directory.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.xstat/poll-log.jsonl".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl XstatConfig {
    /// Default config file content written by `xstat config init`.
    pub fn default_toml() -> String {
        r#"# xstat configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (XSTAT_*)
#   2. Project config (.xstat.toml in current directory)
#   3. User global config (~/.xstat/config.toml)
#   4. Built-in defaults

[general]
store_path = "/etc/config/xray_core"   # UCI file, or a saved `uci show xray_core`
refresh_interval_secs = 5

[telemetry]
host = "127.0.0.1"
# port = 18888                          # Default: general.metrics_server_port from the store
path = "/debug/vars"
timeout_ms = 3000

[web]
addr = "127.0.0.1:9747"

[logging]
enabled = true
path = "~/.xstat/poll-log.jsonl"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
