//! xstat: status dashboard for an Xray core managed through OpenWrt UCI.
//!
//! Telemetry tags such as `extra_inbound:in1@tcp_outbound:srv` are decoded
//! against the router's config store into short descriptions with badges,
//! and rendered as terminal or web dashboards.

pub mod analytics;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod describe;
pub mod poll;
pub mod store;
pub mod telemetry;
pub mod web;
