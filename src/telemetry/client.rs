/// HTTP client for the core's metrics endpoint.
///
/// Uses the synchronous `ureq` client. One GET per poll tick; no retries
/// beyond the next scheduled tick.
use std::time::Duration;

use anyhow::{Context, Result};

use super::{Snapshot, SnapshotSource};
use crate::config::schema::TelemetryConfig;
use crate::store::ConfigStore;

#[derive(Debug, Clone)]
pub struct TelemetryClient {
    url: String,
    timeout: Duration,
}

impl TelemetryClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    /// Build a client from the resolved config. The port comes from the
    /// config override, else from the store's `metrics_server_port`.
    pub fn from_config(config: &TelemetryConfig, store: &ConfigStore) -> Self {
        let port = config.port.unwrap_or_else(|| store.metrics_port());
        let path = if config.path.starts_with('/') {
            config.path.clone()
        } else {
            format!("/{}", config.path)
        };
        Self::new(
            format!("http://{}:{port}{path}", config.host),
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the endpoint answers at all, with a short timeout.
    pub fn is_reachable(&self) -> bool {
        ureq::get(&self.url)
            .timeout(self.timeout.min(Duration::from_secs(3)))
            .call()
            .is_ok()
    }
}

impl SnapshotSource for TelemetryClient {
    fn fetch(&self) -> Result<Snapshot> {
        let resp = ureq::get(&self.url)
            .timeout(self.timeout)
            .call()
            .with_context(|| format!("telemetry request to {} failed", self.url))?;

        resp.into_json::<Snapshot>()
            .context("telemetry response is not valid JSON")
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_uses_store_port_by_default() {
        let store = ConfigStore::parse(
            "config general\n\toption metrics_server_port '19000'\n",
        )
        .unwrap();
        let client = TelemetryClient::from_config(&TelemetryConfig::default(), &store);
        assert_eq!(client.url(), "http://127.0.0.1:19000/debug/vars");
    }

    #[test]
    fn config_port_overrides_store() {
        let config = TelemetryConfig {
            port: Some(28888),
            path: "debug/vars".to_string(),
            ..TelemetryConfig::default()
        };
        let client = TelemetryClient::from_config(&config, &ConfigStore::default());
        assert_eq!(client.url(), "http://127.0.0.1:28888/debug/vars");
        assert_eq!(client.timeout, Duration::from_millis(config.timeout_ms));
    }

    /// Serve `body` once on an ephemeral port and return the URL.
    fn serve_once(body: &'static str) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        std::thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let _ = request.respond(tiny_http::Response::from_string(body));
            }
        });
        format!("http://127.0.0.1:{port}/debug/vars")
    }

    #[test]
    fn fetch_decodes_json_body() {
        let url = serve_once(r#"{"version": {"version": "1.8.24"}, "cmdline": ["xray"]}"#);
        let snapshot = TelemetryClient::new(url, Duration::from_secs(2)).fetch().unwrap();
        assert_eq!(snapshot.version.unwrap().version, "1.8.24");
    }

    #[test]
    fn non_json_body_is_an_error() {
        let url = serve_once("<html>not vars</html>");
        let err = TelemetryClient::new(url, Duration::from_secs(2)).fetch().unwrap_err();
        assert!(format!("{err:#}").contains("not valid JSON"));
    }

    #[test]
    fn unreachable_endpoint_is_an_error() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let client = TelemetryClient::new("http://127.0.0.1:9/debug/vars", Duration::from_millis(200));
        assert!(client.fetch().is_err());
        assert!(!client.is_reachable());
    }
}
