//! JSON API handlers for the web dashboard.
//!
//! Each handler corresponds to an API endpoint and returns a
//! `Response<Cursor<Vec<u8>>>` with JSON content.

use std::io::Cursor;

use anyhow::{Context, Result};
use serde::Serialize;
use tiny_http::{Response, StatusCode};
use url::form_urlencoded;

use crate::analytics::reporter;
use crate::config;
use crate::describe::{Description, describe_chain, describe_inbound};
use crate::poll::lock_view;

use super::{WebState, content_type_json};

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct DescribeResponse<'a> {
    tag: &'a str,
    inbound: bool,
    text: String,
    html: String,
    fragments: &'a Description,
}

#[derive(Serialize)]
struct StatsResponse {
    total_polls: usize,
    applied: usize,
    stale: usize,
    errors: usize,
    error_pct: f64,
    avg_latency_ms: f64,
    max_latency_ms: u64,
    last_error: Option<LastErrorResponse>,
    daily: Vec<DailyResponse>,
}

#[derive(Serialize)]
struct LastErrorResponse {
    timestamp: String,
    message: String,
}

#[derive(Serialize)]
struct DailyResponse {
    date: String,
    polls: usize,
    errors: usize,
    avg_latency_ms: f64,
}

#[derive(Serialize)]
struct ConfigResponse {
    config: config::XstatConfig,
    toml_text: String,
}

#[derive(Serialize)]
struct HealthResponse {
    endpoint: String,
    metrics_enabled: bool,
    store_sections: usize,
    last_tick: u64,
    last_fetch: Option<String>,
    last_error: Option<String>,
    journal: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<Response<Cursor<Vec<u8>>>> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

fn bad_request(message: &str) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(400))
}

/// First value of a decoded query parameter.
pub(crate) fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

fn is_flag_set(url: &str, name: &str) -> bool {
    query_param(url, name).is_some_and(|v| matches!(v.as_str(), "" | "1" | "true" | "yes"))
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/snapshot`: the latest view, raw telemetry included.
pub fn get_snapshot(state: &WebState) -> Result<Response<Cursor<Vec<u8>>>> {
    let view = lock_view(&state.shared).clone();
    json_response(&view)
}

/// `GET /api/dashboard`: the decoded tables.
pub fn get_dashboard(state: &WebState) -> Result<Response<Cursor<Vec<u8>>>> {
    json_response(&state.dashboard())
}

/// `GET /api/describe?tag=T[&inbound=1]`: decode one identifier.
pub fn get_describe(state: &WebState, url: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let Some(tag) = query_param(url, "tag") else {
        return Ok(bad_request("missing 'tag' query parameter"));
    };
    let inbound = is_flag_set(url, "inbound");
    let description = if inbound {
        describe_inbound(&state.store, &tag)
    } else {
        describe_chain(&state.store, &tag)
    };

    json_response(&DescribeResponse {
        tag: &tag,
        inbound,
        text: description.to_string(),
        html: description.to_html(),
        fragments: &description,
    })
}

/// `GET /api/stats?days=N`: poll journal summary.
pub fn get_stats(state: &WebState, url: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let days = query_param(url, "days").and_then(|d| d.parse().ok());
    let stats = reporter::compute_stats(&state.journal, days);

    json_response(&StatsResponse {
        total_polls: stats.total_polls,
        applied: stats.outcomes.applied,
        stale: stats.outcomes.stale,
        errors: stats.outcomes.error,
        error_pct: stats.outcomes.pct(stats.outcomes.error),
        avg_latency_ms: stats.avg_latency_ms,
        max_latency_ms: stats.max_latency_ms,
        last_error: stats
            .last_error
            .map(|(timestamp, message)| LastErrorResponse { timestamp, message }),
        daily: stats
            .daily
            .into_iter()
            .map(|d| DailyResponse {
                date: d.date,
                polls: d.polls,
                errors: d.errors,
                avg_latency_ms: d.avg_latency_ms,
            })
            .collect(),
    })
}

/// `GET /api/config`: current effective configuration.
pub fn get_config() -> Result<Response<Cursor<Vec<u8>>>> {
    let cfg = config::load();
    let toml_text = toml::to_string_pretty(&cfg).context("failed to serialize config")?;

    json_response(&ConfigResponse {
        config: cfg,
        toml_text,
    })
}

/// `GET /api/health`: endpoint, store and poller status.
pub fn get_health(state: &WebState) -> Result<Response<Cursor<Vec<u8>>>> {
    let view = lock_view(&state.shared).clone();

    json_response(&HealthResponse {
        endpoint: state.endpoint.clone(),
        metrics_enabled: state.store.metrics_enabled(),
        store_sections: state.store.sections().len(),
        last_tick: view.tick,
        last_fetch: view.fetched_at.map(|t| t.to_rfc3339()),
        last_error: view.error().map(str::to_string),
        journal: state.journal.path().map(|p| p.display().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_are_decoded() {
        let url = "/api/describe?tag=extra_inbound%3Ain1%40tcp_outbound%3Asrv&inbound";
        assert_eq!(
            query_param(url, "tag").as_deref(),
            Some("extra_inbound:in1@tcp_outbound:srv")
        );
        assert!(is_flag_set(url, "inbound"));
        assert!(!is_flag_set(url, "verbose"));
        assert_eq!(query_param("/api/describe", "tag"), None);
    }

    #[test]
    fn unencoded_separators_survive() {
        let url = "/api/describe?tag=socks_inbound&days=7";
        assert_eq!(query_param(url, "tag").as_deref(), Some("socks_inbound"));
        assert_eq!(query_param(url, "days").as_deref(), Some("7"));
    }
}
