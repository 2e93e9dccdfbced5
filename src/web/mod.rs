//! Embedded web dashboard for xstat.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - A server-rendered status page with badge tooltips
//! - JSON API endpoints for the snapshot, decoded tables, tag decoding,
//!   poll statistics, config and health
//!
//! A [`Poller`](crate::poll::Poller) keeps the shared view fresh in the
//! background; requests only ever read it.
//!
//! Launched via `xstat web` (default: `http://127.0.0.1:9747`).

mod api;
mod frontend;

use std::io::Cursor;
use std::sync::Arc;

use anyhow::Result;
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::analytics::logger::PollJournal;
use crate::dashboard::{self, Dashboard, Tab};
use crate::poll::{SharedView, lock_view};
use crate::store::ConfigStore;

/// Everything a request handler may read.
pub struct WebState {
    pub store: Arc<ConfigStore>,
    pub shared: SharedView,
    pub journal: PollJournal,
    /// Telemetry URL, shown in failure hints.
    pub endpoint: String,
    /// Page auto-refresh period in seconds.
    pub refresh_secs: u64,
}

impl WebState {
    /// Dashboard for the current view, rendered at the current time.
    pub fn dashboard(&self) -> Dashboard {
        let view = lock_view(&self.shared).clone();
        dashboard::build(
            &view,
            &self.store,
            &self.endpoint,
            chrono::Utc::now().timestamp(),
        )
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the web dashboard server on the given address.
///
/// Blocks the current thread. Handles requests sequentially (sufficient for
/// a local single-user dashboard). Gracefully handles errors per-request
/// without crashing the server.
pub fn serve(addr: &str, state: &WebState) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("xstat dashboard running at http://{addr}");
    println!("Polling {} every {}s", state.endpoint, state.refresh_secs);
    println!("Press Ctrl+C to stop.\n");

    for request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let result = dispatch(state, &method, &url);

        match result {
            Ok(resp) => {
                let _ = request.respond(resp);
            }
            Err(e) => {
                let body = serde_json::json!({ "error": format!("{e:#}") }).to_string();
                let resp = Response::from_data(body.into_bytes())
                    .with_header(content_type_json())
                    .with_status_code(StatusCode(500));
                let _ = request.respond(resp);
            }
        }

        // Brief access log
        println!(
            "{} {} {}",
            method,
            url,
            chrono::Local::now().format("%H:%M:%S")
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
fn dispatch(state: &WebState, method: &Method, url: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    // Strip query string for path matching
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(serve_page(state, url)),

        (&Method::Get, "/api/snapshot") => api::get_snapshot(state),
        (&Method::Get, "/api/dashboard") => api::get_dashboard(state),
        (&Method::Get, "/api/describe") => api::get_describe(state, url),
        (&Method::Get, "/api/stats") => api::get_stats(state, url),
        (&Method::Get, "/api/config") => api::get_config(),
        (&Method::Get, "/api/health") => api::get_health(state),

        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Render the status page, optionally for a single `?tab=`.
fn serve_page(state: &WebState, url: &str) -> Response<Cursor<Vec<u8>>> {
    let tab = api::query_param(url, "tab").and_then(|t| Tab::parse(&t));
    let html = frontend::render_page(&state.dashboard(), tab, state.refresh_secs);
    Response::from_data(html.into_bytes())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

/// 404 response.
fn not_found() -> Response<Cursor<Vec<u8>>> {
    let body = r#"{"error": "not found"}"#;
    Response::from_data(body.as_bytes().to_vec())
        .with_header(content_type_json())
        .with_status_code(StatusCode(404))
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap()
}

/// HTML content type header.
fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap()
}
