/// Configuration system for xstat.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::XstatConfig::default()`]
/// 2. **User global config**: `~/.xstat/config.toml`
/// 3. **Project local config**: `.xstat.toml` in the current working directory
/// 4. **Environment variables**: `XSTAT_*` overrides (highest precedence)
///
/// Later layers replace earlier ones. Malformed files are ignored so a bad
/// edit never stops the dashboard from starting.
///
/// # Usage
///
/// ```rust,ignore
/// use xstat::config;
///
/// let cfg = config::load();
/// let interval = cfg.general.refresh_interval_secs;
/// ```
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::XstatConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved xstat configuration.
pub fn load() -> XstatConfig {
    let mut config = XstatConfig::default();

    if let Some(global) = load_toml_file(global_config_path()) {
        config = global;
    }

    if let Some(project) = load_toml_file(project_config_path()) {
        config = project;
    }

    apply_env_overrides(&mut config);

    config
}

/// Load a TOML config file from the given path (if it exists and parses).
fn load_toml_file(path: Option<PathBuf>) -> Option<XstatConfig> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    toml::from_str(&content).ok()
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.xstat/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".xstat").join("config.toml"))
}

/// Path to the project local config: `.xstat.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".xstat.toml"))
}

pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `XSTAT_STORE`: path to the router's UCI package
/// - `XSTAT_INTERVAL_SECS`: poll interval
/// - `XSTAT_TELEMETRY_HOST` / `XSTAT_TELEMETRY_PORT`: metrics endpoint
/// - `XSTAT_WEB_ADDR`: `xstat web` listen address
/// - `XSTAT_LOGGING`: poll journal on/off (`1`/`true`/`yes`/`on`)
fn apply_env_overrides(config: &mut XstatConfig) {
    if let Ok(val) = std::env::var("XSTAT_STORE")
        && !val.is_empty()
    {
        config.general.store_path = val;
    }
    if let Ok(val) = std::env::var("XSTAT_INTERVAL_SECS")
        && let Ok(secs) = val.parse::<u64>()
        && secs > 0
    {
        config.general.refresh_interval_secs = secs;
    }
    if let Ok(val) = std::env::var("XSTAT_TELEMETRY_HOST")
        && !val.is_empty()
    {
        config.telemetry.host = val;
    }
    if let Ok(val) = std::env::var("XSTAT_TELEMETRY_PORT")
        && let Ok(port) = val.parse::<u16>()
    {
        config.telemetry.port = Some(port);
    }
    if let Ok(val) = std::env::var("XSTAT_WEB_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }
    if let Ok(val) = std::env::var("XSTAT_LOGGING") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.xstat/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.xstat/ directory")?;
    }

    fs::write(&path, XstatConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single dotted key (e.g. `telemetry.port`) in the global config file.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&XstatConfig::default())
            .context("failed to serialize default config")?
    };

    let updated = apply_config_value(&content, key, value)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, updated).context("failed to write config file")?;

    Ok(())
}

/// Apply a dotted-key update to TOML text and check the result still loads.
fn apply_config_value(content: &str, key: &str, value: &str) -> Result<String> {
    let mut root: toml::Value =
        toml::from_str(content).context("failed to parse config as TOML value")?;

    set_toml_value(&mut root, key, value)?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    toml::from_str::<XstatConfig>(&output)
        .with_context(|| format!("invalid value for '{key}': {value}"))?;

    Ok(output)
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// The existing value's type decides how `raw_value` is parsed. New keys
/// (such as the optional `telemetry.port`) are stored as an integer or
/// boolean when the text parses as one, else as a string.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    for &part in sections {
        let table = current
            .as_table_mut()
            .with_context(|| format!("expected table above '{key}'"))?;
        current = table
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table at '{key}'"))?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::String(_)) => toml::Value::String(raw_value.to_string()),
        Some(_) => anyhow::bail!("'{key}' is not a scalar setting"),
        None => {
            if let Ok(n) = raw_value.parse::<i64>() {
                toml::Value::Integer(n)
            } else if let Ok(b) = raw_value.parse::<bool>() {
                toml::Value::Boolean(b)
            } else {
                toml::Value::String(raw_value.to_string())
            }
        }
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("yes"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn set_toml_value_updates_string() {
        let mut root: toml::Value = toml::from_str("[web]\naddr = \"127.0.0.1:9747\"\n").unwrap();
        set_toml_value(&mut root, "web.addr", "0.0.0.0:80").unwrap();
        assert_eq!(root["web"]["addr"].as_str(), Some("0.0.0.0:80"));
    }

    #[test]
    fn set_toml_value_updates_bool_and_integer() {
        let mut root: toml::Value =
            toml::from_str("[logging]\nenabled = true\n[general]\nrefresh_interval_secs = 5\n")
                .unwrap();
        set_toml_value(&mut root, "logging.enabled", "off").unwrap();
        set_toml_value(&mut root, "general.refresh_interval_secs", "10").unwrap();
        assert_eq!(root["logging"]["enabled"].as_bool(), Some(false));
        assert_eq!(root["general"]["refresh_interval_secs"].as_integer(), Some(10));
    }

    #[test]
    fn set_toml_value_rejects_bad_integer() {
        let mut root: toml::Value = toml::from_str("[general]\nrefresh_interval_secs = 5\n").unwrap();
        assert!(set_toml_value(&mut root, "general.refresh_interval_secs", "soon").is_err());
    }

    #[test]
    fn new_optional_key_is_typed() {
        let defaults = toml::to_string_pretty(&XstatConfig::default()).unwrap();
        let updated = apply_config_value(&defaults, "telemetry.port", "28888").unwrap();
        let config: XstatConfig = toml::from_str(&updated).unwrap();
        assert_eq!(config.telemetry.port, Some(28888));
    }

    #[test]
    fn updates_that_break_the_schema_are_rejected() {
        let defaults = toml::to_string_pretty(&XstatConfig::default()).unwrap();
        assert!(apply_config_value(&defaults, "telemetry.port", "99999").is_err());
    }

    #[test]
    fn expand_home_only_touches_tilde_prefix() {
        assert_eq!(expand_home("/etc/config/xray_core"), PathBuf::from("/etc/config/xray_core"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/.xstat/x"), home.join(".xstat/x"));
        }
    }

    #[test]
    fn show_effective_config_returns_toml() {
        let toml_str = show_effective_config().unwrap();
        let _: XstatConfig = toml::from_str(&toml_str).unwrap();
    }
}
