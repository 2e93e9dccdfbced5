//! Chain composer: a full composite identifier to display fragments.
//!
//! Only the anchor stages get full detail. The first stage is the entry point
//! (its key names the server the chain ends up at), the last stage is the
//! final hop, and everything between is summarised or elided. Which stages
//! elide depends on how long the chain is:
//!
//! | stage kind          | first position        | middle position            |
//! |---------------------|-----------------------|----------------------------|
//! | `extra_inbound`     | shown if < 3 stages   | shown if < 3 stages        |
//! | `force_forward`     | always elided         | always elided              |
//! | `balancer_outbound` | only if < 4 stages    | `tcp …` from 4 stages      |
//! | `fake_dns_*`        | `fake_dns …`          | omitted                    |
//! | `manual_tproxy`     | omitted               | opaque                     |
//! | `tcp/udp_outbound`  | opaque                | first description if < 4   |
//! | anything else       | opaque                | opaque                     |

use crate::store::ConfigStore;

use super::fragment::{Badge, Description, Fragment};
use super::segment::describe_outbound;
use super::stage::{CompositeIdentifier, Stage, StageKind};

/// Chains at least this long elide `extra_inbound` listen addresses.
const LISTEN_ELIDE_LEN: usize = 3;
/// Chains at least this long drop balancer badges and elide transports.
const BALANCER_ELIDE_LEN: usize = 4;

/// Describe a composite identifier against the store.
///
/// Pure: the same identifier and store always yield the same fragments.
pub fn describe_chain(store: &ConfigStore, identifier: &str) -> Description {
    let chain = CompositeIdentifier::parse(identifier);
    let first = chain.first();
    let first_description = describe_outbound(store, first.key);

    let mut out = first_fragments(&chain, &first_description);

    let last_index = chain.len() - 1;
    for (index, stage) in chain.stages().iter().enumerate().skip(1) {
        let description = describe_outbound(store, stage.key);
        let fragment = if index == last_index {
            Some(last_fragment(stage, &first_description, &description))
        } else {
            middle_fragment(&chain, stage, &first_description, &description)
        };
        if let Some(fragment) = fragment {
            out.push(fragment);
        }
    }

    out
}

fn first_fragments(chain: &CompositeIdentifier<'_>, first_description: &str) -> Description {
    let first = chain.first();
    let out = Description::text(first.raw);

    if first.is_bare() {
        return out;
    }

    if chain.len() == 1 {
        return out.with(Badge::value(first_description).with_tooltip(first.kind.as_str()));
    }

    let badge = match &first.kind {
        StageKind::ExtraInbound if chain.len() < LISTEN_ELIDE_LEN => {
            Some(Badge::named("listen", first_description))
        }
        StageKind::ExtraInbound => Some(Badge::elided("listen")),
        StageKind::ForceForward => Some(Badge::elided("force_forward")),
        StageKind::BalancerOutbound if chain.len() < BALANCER_ELIDE_LEN => {
            Some(Badge::elided("balancer_outbound"))
        }
        StageKind::BalancerOutbound => None,
        StageKind::FakeDns(_) => Some(Badge::elided("fake_dns")),
        StageKind::ManualTproxy => None,
        _ => Some(Badge::opaque()),
    };

    match badge {
        Some(badge) => out.with(badge.with_tooltip(first_description)),
        None => out,
    }
}

fn middle_fragment(
    chain: &CompositeIdentifier<'_>,
    stage: &Stage<'_>,
    first_description: &str,
    description: &str,
) -> Option<Fragment> {
    let detailed_tooltip = || {
        format!(
            "{}: {description} ({})",
            stage.kind,
            stage.key.unwrap_or_default()
        )
    };

    let badge = match &stage.kind {
        StageKind::ExtraInbound if chain.len() < LISTEN_ELIDE_LEN => {
            Badge::named("listen", description).with_tooltip(detailed_tooltip())
        }
        StageKind::ExtraInbound => Badge::elided("listen").with_tooltip(detailed_tooltip()),
        StageKind::ForceForward => Badge::elided("force_forward").with_tooltip(detailed_tooltip()),
        StageKind::BalancerOutbound if chain.len() < BALANCER_ELIDE_LEN => {
            Badge::elided("balancer_outbound").with_tooltip(detailed_tooltip())
        }
        // A long chain's balancer summarises as the tcp hop it picks.
        StageKind::BalancerOutbound => {
            Badge::elided("tcp").with_tooltip(format!("tcp: {first_description}"))
        }
        StageKind::TcpOutbound | StageKind::UdpOutbound => {
            let transport = stage
                .kind
                .outbound_transport()
                .map(|t| t.as_str())
                .unwrap_or_default();
            if chain.len() < BALANCER_ELIDE_LEN {
                Badge::named(transport, first_description).with_tooltip(stage.kind.as_str())
            } else {
                Badge::elided(transport).with_tooltip(format!("{transport}: {first_description}"))
            }
        }
        StageKind::FakeDns(_) => return None,
        _ => Badge::opaque().with_tooltip(description),
    };

    Some(badge.into())
}

fn last_fragment(stage: &Stage<'_>, first_description: &str, description: &str) -> Fragment {
    if let Some(transport) = stage.kind.outbound_transport() {
        return Badge::named(transport.as_str(), first_description).into();
    }

    let badge = Badge::named(stage.kind.as_str(), description);
    match stage.key {
        Some(key) => badge.with_tooltip(key).into(),
        None => badge.into(),
    }
}
