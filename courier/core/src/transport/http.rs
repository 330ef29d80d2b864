//! HTTP Transport Implementation
//!
//! Reference transport for inference services that stream their answer as
//! newline-delimited JSON frames over a long-lived chunked HTTP response.
//!
//! Each response line decodes into a [`Frame`]; lines that do not parse are
//! skipped so a noisy backend cannot wedge the exchange. The reader task
//! observes the cancellation token between chunks and drops the connection
//! promptly on revocation.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::frame::{Frame, OutboundMessage};

use super::traits::{TransportError, TransportEvent, TransportExecutor};

/// Configuration for the HTTP transport
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Exchange endpoint URL
    pub endpoint: String,
    /// Bearer credential (optional)
    pub api_key: Option<String>,
    /// Whether a credential is mandatory for this backend
    pub require_credential: bool,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1/exchange".to_string(),
            api_key: None,
            require_credential: false,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl HttpTransportConfig {
    /// Load configuration from environment variables
    ///
    /// - `COURIER_ENDPOINT`: exchange endpoint URL
    /// - `COURIER_API_KEY`: bearer credential
    /// - `COURIER_REQUIRE_CREDENTIAL`: "1" or "true" to make the credential mandatory
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: std::env::var("COURIER_ENDPOINT").unwrap_or(defaults.endpoint),
            api_key: std::env::var("COURIER_API_KEY").ok(),
            require_credential: std::env::var("COURIER_REQUIRE_CREDENTIAL")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(false),
            connect_timeout: defaults.connect_timeout,
        }
    }
}

/// HTTP transport client
#[derive(Clone)]
pub struct HttpTransport {
    /// Transport configuration
    config: HttpTransportConfig,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport from configuration
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized, which indicates a
    /// broken build environment rather than a runtime condition.
    #[must_use]
    pub fn new(config: HttpTransportConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            config,
            http_client,
        }
    }

    /// Create from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(HttpTransportConfig::from_env())
    }

    /// The configured endpoint
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Build the JSON request body for an outbound message sequence
    fn build_body(outbound: &[OutboundMessage]) -> serde_json::Value {
        serde_json::json!({
            "messages": outbound,
            "stream": true,
        })
    }

    /// Decode one NDJSON line into a frame. Returns `None` for blank or
    /// malformed lines.
    fn decode_line(line: &str) -> Option<Frame> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<Frame>(line) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping undecodable frame line");
                None
            }
        }
    }
}

#[async_trait]
impl TransportExecutor for HttpTransport {
    fn name(&self) -> &'static str {
        "Http"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(&self.config.endpoint)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok()
    }

    async fn execute(
        &self,
        outbound: &[OutboundMessage],
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<TransportEvent>, TransportError> {
        if self.config.require_credential && self.config.api_key.is_none() {
            return Err(TransportError::MissingCredential(
                "COURIER_API_KEY".to_string(),
            ));
        }

        let mut request = self
            .http_client
            .post(&self.config.endpoint)
            .json(&Self::build_body(outbound));

        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::BackendRejected { status, body });
        }

        let (tx, rx) = mpsc::channel(100);
        let mut stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut buffer = String::new();

            loop {
                let chunk = tokio::select! {
                    () = cancel.cancelled() => {
                        // Dropping the stream aborts the connection.
                        tracing::debug!("HTTP transport aborting on cancellation");
                        return;
                    }
                    chunk = stream.next() => chunk,
                };

                match chunk {
                    Some(Ok(bytes)) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));

                        while let Some(pos) = buffer.find('\n') {
                            if let Some(frame) = Self::decode_line(&buffer[..pos]) {
                                if tx.send(TransportEvent::Frame(frame)).await.is_err() {
                                    // Receiver dropped, stop streaming
                                    return;
                                }
                            }
                            buffer = buffer[pos + 1..].to_string();
                        }
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(TransportEvent::Error(e.to_string())).await;
                        return;
                    }
                    None => {
                        // Flush a trailing line without a newline, then settle.
                        if let Some(frame) = Self::decode_line(&buffer) {
                            if tx.send(TransportEvent::Frame(frame)).await.is_err() {
                                return;
                            }
                        }
                        let _ = tx.send(TransportEvent::Done(None)).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}
