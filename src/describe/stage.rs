//! Composite identifier grammar.
//!
//! ```text
//! identifier := stage ( '@' stage )*
//! stage      := kind ( ':' key ( ':' extra )? )?
//! ```
//!
//! Telemetry names inbounds, outbounds and observatory targets with these
//! identifiers. The `kind` is a routing stage type; `key` is the name of the
//! store section that configures it.

use std::fmt;

/// Separator between stages.
pub const CHAIN_SEPARATOR: char = '@';
/// Separator between fields inside a stage.
pub const FIELD_SEPARATOR: char = ':';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// Address family of a transparent-proxy listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
    F4,
    F6,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V4 => "v4",
            Self::V6 => "v6",
            Self::F4 => "f4",
            Self::F6 => "f6",
        }
    }

    /// Wildcard bind address for this family.
    pub fn any_addr(self) -> &'static str {
        match self {
            Self::V4 | Self::F4 => "0.0.0.0",
            Self::V6 | Self::F6 => "[::]",
        }
    }
}

/// Every routing stage type the dashboard knows, plus a catch-all.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StageKind {
    HttpsInbound,
    HttpInbound,
    SocksInbound,
    Tproxy { transport: Transport, family: Family },
    Metrics,
    Api,
    DnsServerInbound,
    ExtraInbound,
    ForceForward,
    BalancerOutbound,
    FakeDns(Transport),
    ManualTproxy,
    TcpOutbound,
    UdpOutbound,
    Other(String),
}

const TPROXY_KINDS: [(&str, Transport, Family); 8] = [
    ("tproxy_tcp_inbound_v4", Transport::Tcp, Family::V4),
    ("tproxy_udp_inbound_v4", Transport::Udp, Family::V4),
    ("tproxy_tcp_inbound_v6", Transport::Tcp, Family::V6),
    ("tproxy_udp_inbound_v6", Transport::Udp, Family::V6),
    ("tproxy_tcp_inbound_f4", Transport::Tcp, Family::F4),
    ("tproxy_udp_inbound_f4", Transport::Udp, Family::F4),
    ("tproxy_tcp_inbound_f6", Transport::Tcp, Family::F6),
    ("tproxy_udp_inbound_f6", Transport::Udp, Family::F6),
];

impl StageKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "https_inbound" => Self::HttpsInbound,
            "http_inbound" => Self::HttpInbound,
            "socks_inbound" => Self::SocksInbound,
            "metrics" => Self::Metrics,
            "api" => Self::Api,
            "dns_server_inbound" => Self::DnsServerInbound,
            "extra_inbound" => Self::ExtraInbound,
            "force_forward" => Self::ForceForward,
            "balancer_outbound" => Self::BalancerOutbound,
            "fake_dns_tcp" => Self::FakeDns(Transport::Tcp),
            "fake_dns_udp" => Self::FakeDns(Transport::Udp),
            "manual_tproxy" => Self::ManualTproxy,
            "tcp_outbound" => Self::TcpOutbound,
            "udp_outbound" => Self::UdpOutbound,
            other => TPROXY_KINDS
                .iter()
                .find(|(name, _, _)| *name == other)
                .map(|&(_, transport, family)| Self::Tproxy { transport, family })
                .unwrap_or_else(|| Self::Other(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::HttpsInbound => "https_inbound",
            Self::HttpInbound => "http_inbound",
            Self::SocksInbound => "socks_inbound",
            Self::Tproxy { transport, family } => TPROXY_KINDS
                .iter()
                .find(|(_, t, f)| t == transport && f == family)
                .map(|(name, _, _)| *name)
                .unwrap_or("tproxy"),
            Self::Metrics => "metrics",
            Self::Api => "api",
            Self::DnsServerInbound => "dns_server_inbound",
            Self::ExtraInbound => "extra_inbound",
            Self::ForceForward => "force_forward",
            Self::BalancerOutbound => "balancer_outbound",
            Self::FakeDns(Transport::Tcp) => "fake_dns_tcp",
            Self::FakeDns(Transport::Udp) => "fake_dns_udp",
            Self::ManualTproxy => "manual_tproxy",
            Self::TcpOutbound => "tcp_outbound",
            Self::UdpOutbound => "udp_outbound",
            Self::Other(raw) => raw,
        }
    }

    /// `tcp_outbound` / `udp_outbound` carry the transport of the final hop.
    pub fn outbound_transport(&self) -> Option<Transport> {
        match self {
            Self::TcpOutbound => Some(Transport::Tcp),
            Self::UdpOutbound => Some(Transport::Udp),
            _ => None,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hop of a composite identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage<'a> {
    /// The stage exactly as it appeared in the identifier.
    pub raw: &'a str,
    pub kind: StageKind,
    pub key: Option<&'a str>,
    pub extra: Option<&'a str>,
    /// Number of `:`-separated fields in `raw`.
    pub field_count: usize,
}

impl<'a> Stage<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let mut fields = raw.split(FIELD_SEPARATOR);
        let kind = StageKind::parse(fields.next().unwrap_or(""));
        let key = fields.next();
        let extra = fields.next();
        Self {
            raw,
            kind,
            key,
            extra,
            field_count: raw.split(FIELD_SEPARATOR).count(),
        }
    }

    /// True when the stage is a bare type with no key field at all.
    pub fn is_bare(&self) -> bool {
        self.field_count == 1
    }
}

/// Parsed `stage@stage@...` identifier. Always has at least one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeIdentifier<'a> {
    stages: Vec<Stage<'a>>,
}

impl<'a> CompositeIdentifier<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            stages: raw.split(CHAIN_SEPARATOR).map(Stage::parse).collect(),
        }
    }

    pub fn stages(&self) -> &[Stage<'a>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Never true; `split` always yields at least one stage.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn first(&self) -> &Stage<'a> {
        &self.stages[0]
    }

    pub fn last(&self) -> &Stage<'a> {
        &self.stages[self.stages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_their_names() {
        for name in [
            "https_inbound",
            "socks_inbound",
            "tproxy_udp_inbound_f6",
            "dns_server_inbound",
            "fake_dns_udp",
            "balancer_outbound",
            "udp_outbound",
            "something_new",
        ] {
            assert_eq!(StageKind::parse(name).as_str(), name);
        }
    }

    #[test]
    fn tproxy_kinds_carry_transport_and_family() {
        assert_eq!(
            StageKind::parse("tproxy_udp_inbound_v6"),
            StageKind::Tproxy {
                transport: Transport::Udp,
                family: Family::V6
            }
        );
    }

    #[test]
    fn stage_fields() {
        let stage = Stage::parse("dns_server_inbound:5353");
        assert_eq!(stage.kind, StageKind::DnsServerInbound);
        assert_eq!(stage.key, Some("5353"));
        assert_eq!(stage.extra, None);
        assert!(!stage.is_bare());

        let stage = Stage::parse("socks_inbound");
        assert!(stage.is_bare());
        assert_eq!(stage.key, None);

        let stage = Stage::parse("extra_inbound:cfg000001:tcp");
        assert_eq!(stage.extra, Some("tcp"));
        assert_eq!(stage.field_count, 3);
    }

    #[test]
    fn identifier_keeps_empty_trailing_stage() {
        let id = CompositeIdentifier::parse("tcp_outbound:abc@");
        assert_eq!(id.len(), 2);
        assert_eq!(id.last().kind, StageKind::Other(String::new()));
        assert_eq!(id.first().key, Some("abc"));
    }
}
