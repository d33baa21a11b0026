//! # HTTP Collector Client
//!
//! [`Collector`](super::Collector) implementation speaking the collector
//! service's plain-HTTP ingestion contract:
//!
//! - `POST /api/ecus/register/{serial}/{uptime_ms}`: registration, no body
//! - `POST /api/ecus/bulk/{serial}`: one JSON array of wire samples per
//!   chunk

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::Collector;
use crate::codec::WireSample;
use crate::error::{EcuNodeError, Result};

/// Per-request timeout; the collector sits one hop away on the local
/// subnet, so anything slower than this is treated as a transport failure
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the collector service
#[derive(Debug, Clone)]
pub struct HttpCollector {
    client: Client,
    port: u16,
}

impl HttpCollector {
    /// Create the client for a collector listening on the given port
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be constructed.
    pub fn new(port: u16) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EcuNodeError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, port })
    }

    fn register_url(&self, addr: Ipv4Addr, serial: &str, uptime_ms: u64) -> String {
        format!(
            "http://{}:{}/api/ecus/register/{}/{}",
            addr, self.port, serial, uptime_ms
        )
    }

    fn bulk_url(&self, addr: Ipv4Addr, serial: &str) -> String {
        format!("http://{}:{}/api/ecus/bulk/{}", addr, self.port, serial)
    }

    async fn check_status(response: reqwest::Response, what: &str) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(EcuNodeError::Transport(format!(
                "{} rejected with status {}",
                what, status
            )))
        }
    }
}

#[async_trait]
impl Collector for HttpCollector {
    async fn register(&self, addr: Ipv4Addr, serial: &str, uptime_ms: u64) -> Result<()> {
        let url = self.register_url(addr, serial, uptime_ms);
        debug!("Registering at {}", url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| EcuNodeError::Transport(format!("registration failed: {}", e)))?;

        Self::check_status(response, "registration").await
    }

    async fn send_batch(
        &self,
        addr: Ipv4Addr,
        serial: &str,
        batch: &[WireSample],
    ) -> Result<()> {
        let url = self.bulk_url(addr, serial);
        debug!("Sending {} record(s) to {}", batch.len(), url);

        let response = self
            .client
            .post(&url)
            .json(batch)
            .send()
            .await
            .map_err(|e| EcuNodeError::Transport(format!("bulk send failed: {}", e)))?;

        Self::check_status(response, "bulk send").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_url_includes_serial_and_uptime() {
        let collector = HttpCollector::new(8080).unwrap();
        let url = collector.register_url(Ipv4Addr::new(192, 168, 1, 77), "abc-123", 4500);

        assert_eq!(url, "http://192.168.1.77:8080/api/ecus/register/abc-123/4500");
    }

    #[test]
    fn test_bulk_url_includes_serial() {
        let collector = HttpCollector::new(9000).unwrap();
        let url = collector.bulk_url(Ipv4Addr::new(10, 0, 0, 77), "abc-123");

        assert_eq!(url, "http://10.0.0.77:9000/api/ecus/bulk/abc-123");
    }

    #[test]
    fn test_batch_payload_is_a_json_array() {
        let batch = vec![
            WireSample {
                v: "1.23".to_string(),
                c: "0.05".to_string(),
                t: "0.10".to_string(),
            },
            WireSample {
                v: "1.24".to_string(),
                c: "0.06".to_string(),
                t: "0.20".to_string(),
            },
        ];

        let json = serde_json::to_string(&batch).unwrap();
        assert_eq!(
            json,
            r#"[{"v":"1.23","c":"0.05","t":"0.10"},{"v":"1.24","c":"0.06","t":"0.20"}]"#
        );
    }
}
