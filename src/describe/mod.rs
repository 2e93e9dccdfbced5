//! Decoding of telemetry routing identifiers into readable descriptions.
//!
//! Everything here is a pure function of the identifier and the
//! [`ConfigStore`](crate::store::ConfigStore). Nothing is cached: each render
//! recomputes its descriptions from the current snapshot.
//!
//! ```rust,ignore
//! let store = ConfigStore::load(Path::new("/etc/config/xray_core"))?;
//! let desc = describe::describe_chain(&store, "tcp_outbound:cfg034f1d");
//! println!("{desc}"); // tcp_outbound:cfg034f1d { vless,203.0.113.9:443 }
//! ```

pub mod chain;
pub mod fragment;
pub mod segment;
pub mod stage;

pub use chain::describe_chain;
pub use fragment::{Badge, BadgeValue, Description, Fragment, escape_html};
pub use segment::{DIRECT, describe_inbound, describe_outbound, describe_outbound_tag};
pub use stage::{CompositeIdentifier, Stage, StageKind};
