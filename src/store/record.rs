//! Typed records resolved from store sections.

use serde::Serialize;

use super::uci::Section;

/// Structured view of one store section, keyed by section name.
///
/// Only the section types the dashboard knows how to describe get a variant;
/// everything else (and anything missing a required option) is `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfigRecord {
    /// Outbound server (`servers` section).
    Server {
        transport: String,
        server: String,
        server_port: String,
        alias: Option<String>,
    },
    /// Additional listener (`extra_inbound` section).
    Listener {
        protocol: String,
        addr: String,
        port: String,
    },
    /// Manual transparent-proxy redirect (`manual_tproxy` section).
    ManualRedirect {
        source_addr: String,
        source_port: String,
        dest_addr: Option<String>,
        dest_port: String,
    },
    /// Fake-DNS domain pool (`fakedns` section).
    FakeDnsPool { domains: Vec<String> },
    Unknown,
}

impl ConfigRecord {
    pub fn from_section(section: &Section) -> Self {
        let record = match section.kind.as_str() {
            "servers" => server(section),
            "extra_inbound" => listener(section),
            "manual_tproxy" => manual_redirect(section),
            "fakedns" => Some(ConfigRecord::FakeDnsPool {
                domains: section
                    .get_list("fake_dns_domain_names")
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            }),
            _ => None,
        };
        record.unwrap_or(ConfigRecord::Unknown)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ConfigRecord::Unknown)
    }
}

fn server(section: &Section) -> Option<ConfigRecord> {
    Some(ConfigRecord::Server {
        transport: section.get("transport")?.to_string(),
        server: section.get("server")?.to_string(),
        server_port: section.get("server_port")?.to_string(),
        alias: non_empty(section.get("alias")),
    })
}

fn listener(section: &Section) -> Option<ConfigRecord> {
    Some(ConfigRecord::Listener {
        protocol: section.get("inbound_type")?.to_string(),
        addr: section.get("inbound_addr")?.to_string(),
        port: section.get("inbound_port")?.to_string(),
    })
}

fn manual_redirect(section: &Section) -> Option<ConfigRecord> {
    Some(ConfigRecord::ManualRedirect {
        source_addr: section.get("source_addr")?.to_string(),
        source_port: section.get("source_port")?.to_string(),
        dest_addr: non_empty(section.get("dest_addr")),
        dest_port: section.get("dest_port").unwrap_or_default().to_string(),
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_requires_address_fields() {
        let mut section = Section::new("servers", "cfg000001");
        section.set_option("transport", "vless");
        section.set_option("server", "example.org");
        assert_eq!(ConfigRecord::from_section(&section), ConfigRecord::Unknown);

        section.set_option("server_port", "443");
        section.set_option("alias", "");
        assert_eq!(
            ConfigRecord::from_section(&section),
            ConfigRecord::Server {
                transport: "vless".into(),
                server: "example.org".into(),
                server_port: "443".into(),
                alias: None,
            }
        );
    }

    #[test]
    fn manual_redirect_destination_is_optional() {
        let mut section = Section::new("manual_tproxy", "cfg000002");
        section.set_option("source_addr", "10.0.0.1");
        section.set_option("source_port", "80");
        section.set_option("dest_port", "8080");
        let ConfigRecord::ManualRedirect { dest_addr, .. } = ConfigRecord::from_section(&section)
        else {
            panic!("expected manual redirect");
        };
        assert_eq!(dest_addr, None);
    }

    #[test]
    fn unrelated_section_types_are_unknown() {
        let section = Section::new("general", "@general[0]");
        assert!(ConfigRecord::from_section(&section).is_unknown());
    }
}
