//! Config Resolver and its backing store.
//!
//! The store is the router's declarative UCI package (`xray_core` on
//! OpenWrt). It is loaded once per process and only ever read: the dashboard
//! resolves short section names found in telemetry tags into [`ConfigRecord`]s
//! and reads listener ports from the `general` section.
//!
//! Lookups never fail. A missing, empty or unknown key resolves to
//! [`ConfigRecord::Unknown`], which the describers render as `direct`.

pub mod record;
pub mod uci;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub use record::ConfigRecord;
pub use uci::Section;

/// Default port of the core's metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 18888;

/// Read-only, parsed UCI package.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    sections: Vec<Section>,
    by_name: HashMap<String, usize>,
}

impl ConfigStore {
    /// Build a store from already-parsed sections. Later duplicates win.
    ///
    /// Sections are also reachable by the UCI extended syntax
    /// `@<type>[<index>]`, unless a real section carries that name.
    pub fn from_sections(sections: Vec<Section>) -> Self {
        let mut by_name: HashMap<String, usize> = sections
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.name.clone(), idx))
            .collect();

        let mut per_kind: HashMap<&str, usize> = HashMap::new();
        for (idx, section) in sections.iter().enumerate() {
            let nth = per_kind.entry(section.kind.as_str()).or_insert(0);
            by_name
                .entry(format!("@{}[{nth}]", section.kind))
                .or_insert(idx);
            *nth += 1;
        }

        Self { sections, by_name }
    }

    /// Parse UCI text (file or `uci show` form).
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self::from_sections(uci::parse(text)?))
    }

    /// Load and parse a UCI file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config store {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("failed to parse config store {}", path.display()))
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.by_name.get(name).map(|&idx| &self.sections[idx])
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Resolve a section name into a typed record.
    pub fn resolve(&self, key: Option<&str>) -> ConfigRecord {
        match key.filter(|k| !k.is_empty()).and_then(|k| self.section(k)) {
            Some(section) => ConfigRecord::from_section(section),
            None => ConfigRecord::Unknown,
        }
    }

    /// Option from the first `general` section.
    pub fn general(&self, option: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.kind == "general")
            .and_then(|s| s.get(option))
    }

    /// Port from the `general` section, or `default` if absent or malformed.
    pub fn general_port(&self, option: &str, default: u16) -> u16 {
        self.general(option)
            .and_then(|v| v.trim().parse().ok())
            .filter(|&port: &u16| port != 0)
            .unwrap_or(default)
    }

    pub fn metrics_enabled(&self) -> bool {
        self.general("metrics_server_enable") == Some("1")
    }

    pub fn metrics_port(&self) -> u16 {
        self.general_port("metrics_server_port", DEFAULT_METRICS_PORT)
    }
}
