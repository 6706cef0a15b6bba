//! HTTP fetcher for the monitor's sensor endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use hwmon_bridge_core::{SensorTreeParser, Snapshot};
use tracing::debug;

use crate::error::PollError;

/// Fetches and parses the sensor tree from one endpoint.
pub struct SensorFetcher {
    client: reqwest::Client,
    url: String,
    parser: SensorTreeParser,
}

impl SensorFetcher {
    /// Creates a fetcher whose requests give up after `timeout`.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            parser: SensorTreeParser::new(),
        })
    }

    /// Returns the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches the document and parses it into a snapshot.
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, PollError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(PollError::from_request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status(status.as_u16()));
        }

        let document: serde_json::Value =
            response.json().await.map_err(PollError::from_request)?;
        let snapshot = self.parser.parse_json(&document)?;

        debug!(url = %self.url, sensors = snapshot.len(), "Fetched sensor tree");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    /// Serves a small fake monitor on an ephemeral port.
    async fn serve_fake_monitor() -> String {
        let app = Router::new()
            .route(
                "/data.json",
                get(|| async {
                    Json(json!({
                        "Children": [
                            {"SensorId": "/cpu/0/temperature/2", "Value": "45.2 °C", "Max": "78.0 °C"},
                            {"SensorId": "/gpu/0/fanspeed", "Value": "1200 RPM"}
                        ]
                    }))
                }),
            )
            .route(
                "/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route("/html", get(|| async { "<html></html>" }))
            .route("/array", get(|| async { Json(json!([1, 2, 3])) }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Json(json!({}))
                }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fetcher(base: &str, path: &str) -> SensorFetcher {
        SensorFetcher::new(&format!("{}{}", base, path), Duration::from_millis(300)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_and_parse() {
        let base = serve_fake_monitor().await;
        let snapshot = fetcher(&base, "/data.json").fetch_snapshot().await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.sensors[0].hw_type, "cpu");
        assert_eq!(snapshot.sensors[0].peak, Some(78.0));
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let base = serve_fake_monitor().await;
        let err = fetcher(&base, "/broken").fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, PollError::Status(500)));

        let err = fetcher(&base, "/missing").fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, PollError::Status(404)));
    }

    #[tokio::test]
    async fn test_body_not_json() {
        let base = serve_fake_monitor().await;
        let err = fetcher(&base, "/html").fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, PollError::Body(_)));
    }

    #[tokio::test]
    async fn test_root_not_a_node() {
        let base = serve_fake_monitor().await;
        let err = fetcher(&base, "/array").fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, PollError::Unparseable(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let base = serve_fake_monitor().await;
        let err = fetcher(&base, "/slow").fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, PollError::Timeout));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher(&format!("http://{}", addr), "/data.json")
            .fetch_snapshot()
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Request(_)));
    }
}
