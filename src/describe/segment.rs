//! Segment decoder: one stage token or config key to a display label.

use crate::store::{ConfigRecord, ConfigStore, DEFAULT_METRICS_PORT};

use super::fragment::{Badge, Description};
use super::stage::{CompositeIdentifier, Family, Stage, StageKind, Transport};

/// Fallback description for anything that does not resolve.
pub const DIRECT: &str = "direct";

/// Shown when a manual redirect has no fixed destination address.
pub const SNIFFING: &str = "{sniffing}";

// ---------------------------------------------------------------------------
// Outbounds
// ---------------------------------------------------------------------------

/// Describe the store record behind `key`, or `direct`.
pub fn describe_outbound(store: &ConfigStore, key: Option<&str>) -> String {
    describe_record(&store.resolve(key))
}

/// Describe the outbound a full identifier ends in.
///
/// Balancer statistics name their picks by composite identifier; the final
/// stage's key is the section that configures the chosen server.
pub fn describe_outbound_tag(store: &ConfigStore, tag: &str) -> String {
    let id = CompositeIdentifier::parse(tag);
    describe_outbound(store, id.last().key)
}

pub fn describe_record(record: &ConfigRecord) -> String {
    match record {
        ConfigRecord::Server {
            transport,
            server,
            server_port,
            alias,
        } => match alias {
            Some(alias) => alias.clone(),
            None => format!("{transport},{}:{server_port}", bracket_ipv6(server)),
        },
        ConfigRecord::Listener {
            protocol,
            addr,
            port,
        } => format!("{protocol}://{addr}:{port}"),
        ConfigRecord::ManualRedirect {
            source_addr,
            source_port,
            dest_addr,
            dest_port,
        } => format!(
            "{source_addr}:{source_port} -> {}:{dest_port}",
            dest_addr.as_deref().unwrap_or(SNIFFING)
        ),
        ConfigRecord::FakeDnsPool { domains } => {
            let mut out = format!("{} domains", domains.len());
            for domain in domains {
                out.push('\n');
                out.push_str(domain);
            }
            out
        }
        ConfigRecord::Unknown => DIRECT.to_string(),
    }
}

/// IPv6 literals contain a colon and need brackets before `:port`.
fn bracket_ipv6(addr: &str) -> String {
    if addr.contains(':') {
        format!("[{addr}]")
    } else {
        addr.to_string()
    }
}

// ---------------------------------------------------------------------------
// Inbounds
// ---------------------------------------------------------------------------

/// Describe an inbound tag: the tag itself plus a `listen` badge when the
/// listener can be identified. Unknown tags come back unchanged.
pub fn describe_inbound(store: &ConfigStore, tag: &str) -> Description {
    let stage = Stage::parse(tag);
    let listen = builtin_listener(store, &stage).or_else(|| match store.resolve(stage.key) {
        record @ ConfigRecord::Listener { .. } => Some(describe_record(&record)),
        _ => None,
    });

    let description = Description::text(tag);
    match listen {
        Some(url) => description.with(Badge::named("listen", url)),
        None => description,
    }
}

/// Listen URL of a built-in listener, with ports from the `general` section.
fn builtin_listener(store: &ConfigStore, stage: &Stage<'_>) -> Option<String> {
    let url = match &stage.kind {
        StageKind::HttpsInbound => "https://0.0.0.0:443".to_string(),
        StageKind::HttpInbound => {
            format!("http://0.0.0.0:{}", store.general_port("http_port", 1081))
        }
        StageKind::SocksInbound => {
            format!("socks5://0.0.0.0:{}", store.general_port("socks_port", 1080))
        }
        StageKind::Tproxy { transport, family } => {
            let option = format!("tproxy_port_{}_{}", transport.as_str(), family.as_str());
            let port = store.general_port(&option, default_tproxy_port(*transport, *family));
            format!("tproxy_{}://{}:{port}", transport.as_str(), family.any_addr())
        }
        StageKind::Metrics => format!(
            "http://0.0.0.0:{}",
            store.general_port("metrics_server_port", DEFAULT_METRICS_PORT)
        ),
        StageKind::Api => "grpc://127.0.0.1:8080".to_string(),
        StageKind::DnsServerInbound => format!("dns://0.0.0.0:{}", stage.key.unwrap_or_default()),
        _ => return None,
    };
    Some(url)
}

fn default_tproxy_port(transport: Transport, family: Family) -> u16 {
    match (transport, family) {
        (Transport::Tcp, Family::V4) => 1082,
        (Transport::Tcp, Family::V6) => 1083,
        (Transport::Udp, Family::V4) => 1084,
        (Transport::Udp, Family::V6) => 1085,
        (Transport::Tcp, Family::F4) => 1086,
        (Transport::Tcp, Family::F6) => 1087,
        (Transport::Udp, Family::F4) => 1088,
        (Transport::Udp, Family::F6) => 1089,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ConfigStore {
        ConfigStore::parse(
            r#"
config general
	option socks_port '7890'
	option tproxy_port_udp_f6 '2089'

config servers 'srv4'
	option transport 'vless'
	option server '198.51.100.7'
	option server_port '443'

config servers 'srv6'
	option transport 'trojan'
	option server '2001:db8::1'
	option server_port '8443'

config servers 'aliased'
	option transport 'vless'
	option server '198.51.100.8'
	option server_port '443'
	option alias 'tokyo-1'

config extra_inbound 'ext'
	option inbound_type 'http'
	option inbound_addr '192.168.1.1'
	option inbound_port '3128'

config manual_tproxy 'redir'
	option source_addr '10.0.0.2'
	option source_port '53'
	option dest_port '5353'
"#,
        )
        .unwrap()
    }

    #[test]
    fn server_descriptions() {
        let store = store();
        assert_eq!(describe_outbound(&store, Some("srv4")), "vless,198.51.100.7:443");
        assert_eq!(describe_outbound(&store, Some("srv6")), "trojan,[2001:db8::1]:8443");
        assert_eq!(describe_outbound(&store, Some("aliased")), "tokyo-1");
    }

    #[test]
    fn listener_and_redirect_descriptions() {
        let store = store();
        assert_eq!(describe_outbound(&store, Some("ext")), "http://192.168.1.1:3128");
        assert_eq!(
            describe_outbound(&store, Some("redir")),
            "10.0.0.2:53 -> {sniffing}:5353"
        );
    }

    #[test]
    fn unresolved_is_direct() {
        let store = store();
        assert_eq!(describe_outbound(&store, Some("xyz123")), DIRECT);
        assert_eq!(describe_outbound(&store, None), DIRECT);
        assert_eq!(describe_outbound(&store, Some("")), DIRECT);
    }

    #[test]
    fn outbound_tag_uses_last_stage_key() {
        let store = store();
        assert_eq!(
            describe_outbound_tag(&store, "balancer_outbound:bal@tcp_outbound:srv4"),
            "vless,198.51.100.7:443"
        );
        assert_eq!(describe_outbound_tag(&store, "tcp_outbound"), DIRECT);
    }

    #[test]
    fn builtin_inbounds_use_configured_or_default_ports() {
        let store = store();
        assert_eq!(
            describe_inbound(&store, "socks_inbound").to_string(),
            "socks_inbound { listen: socks5://0.0.0.0:7890 }"
        );
        assert_eq!(
            describe_inbound(&store, "http_inbound").to_string(),
            "http_inbound { listen: http://0.0.0.0:1081 }"
        );
        assert_eq!(
            describe_inbound(&store, "tproxy_tcp_inbound_v6").to_string(),
            "tproxy_tcp_inbound_v6 { listen: tproxy_tcp://[::]:1083 }"
        );
        assert_eq!(
            describe_inbound(&store, "tproxy_udp_inbound_f6").to_string(),
            "tproxy_udp_inbound_f6 { listen: tproxy_udp://[::]:2089 }"
        );
        assert_eq!(
            describe_inbound(&store, "tproxy_udp_inbound_f4").to_string(),
            "tproxy_udp_inbound_f4 { listen: tproxy_udp://0.0.0.0:1088 }"
        );
        assert_eq!(
            describe_inbound(&store, "metrics").to_string(),
            "metrics { listen: http://0.0.0.0:18888 }"
        );
        assert_eq!(
            describe_inbound(&store, "api").to_string(),
            "api { listen: grpc://127.0.0.1:8080 }"
        );
        assert_eq!(
            describe_inbound(&store, "dns_server_inbound:5300").to_string(),
            "dns_server_inbound:5300 { listen: dns://0.0.0.0:5300 }"
        );
    }

    #[test]
    fn extra_inbound_resolves_through_store() {
        let store = store();
        assert_eq!(
            describe_inbound(&store, "extra_inbound:ext").to_string(),
            "extra_inbound:ext { listen: http://192.168.1.1:3128 }"
        );
    }

    #[test]
    fn unknown_inbound_is_returned_unchanged() {
        let store = store();
        let desc = describe_inbound(&store, "mystery:srv4");
        assert_eq!(desc.len(), 1);
        assert_eq!(desc.to_string(), "mystery:srv4");
    }

    #[test]
    fn fake_dns_listing() {
        let record = ConfigRecord::FakeDnsPool {
            domains: vec!["a.com".into(), "b.com".into(), "c.com".into()],
        };
        assert_eq!(describe_record(&record), "3 domains\na.com\nb.com\nc.com");
    }
}
