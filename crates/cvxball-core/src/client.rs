//! HTTP client for a transport server.
//!
//! [`TransportClient::compute`] is the usual entry point: it uploads a
//! payload under a command token and immediately reads the computed result
//! back. Nothing is retried; the first failure is returned as-is.
//!
//! The client owns a pooled `reqwest` connection set that is released when
//! the client is dropped or [`closed`](TransportClient::close).

use crate::codec::{ArrayCodec, WireRecord};
use crate::config::TransportConfig;
use crate::payload::Payload;
use crate::protocol::ErrorResponse;
use crate::{Result, TransportError};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// Generate a command token that will not collide with other callers.
pub fn unique_token(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// Client for the PUT/GET array transport.
#[derive(Debug, Clone)]
pub struct TransportClient {
    http: reqwest::Client,
    base_url: Url,
}

impl TransportClient {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:5008`).
    ///
    /// No request is made; see [`TransportClient::connect`].
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::Config {
                message: format!("Server URL cannot be a base: {}", base_url),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(TransportConfig::REQUEST_TIMEOUT)
            .connect_timeout(TransportConfig::CONNECT_TIMEOUT)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Create a client and check that the server answers its health probe.
    pub async fn connect(base_url: &str) -> Result<Self> {
        let client = Self::new(base_url)?;
        client.health().await?;
        debug!("Transport client connected to {}", client.base_url);
        Ok(client)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::Config {
                message: format!("Server URL cannot be a base: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn command_url(&self, token: &str) -> Result<Url> {
        self.url(&[TransportConfig::COMMANDS_PATH_SEGMENT, token])
    }

    /// Probe `/health`.
    pub async fn health(&self) -> Result<()> {
        let url = self.url(&["health"])?;
        let response = self
            .http
            .get(url)
            .timeout(TransportConfig::HEALTH_TIMEOUT)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Encode `payload` and upload it under `token`.
    pub async fn write(&self, token: &str, payload: &Payload) -> Result<()> {
        let body = ArrayCodec::encode(payload)?.to_ipc_bytes()?;
        debug!("PUT {} ({} arrays, {} bytes)", token, payload.len(), body.len());

        let response = self
            .http
            .put(self.command_url(token)?)
            .header(CONTENT_TYPE, TransportConfig::ARROW_MIME)
            .body(body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Fetch and decode the computed result for `token`.
    pub async fn read(&self, token: &str) -> Result<Payload> {
        let response = self
            .http
            .get(self.command_url(token)?)
            .header(ACCEPT, TransportConfig::ARROW_MIME)
            .send()
            .await?;
        let response = check_status(response).await?;

        let bytes = response.bytes().await?;
        debug!("GET {} ({} bytes)", token, bytes.len());

        let record = WireRecord::from_ipc_bytes(&bytes)?;
        ArrayCodec::decode(&record)
    }

    /// Upload `payload` under `token`, then read the result back.
    pub async fn compute(&self, token: &str, payload: &Payload) -> Result<Payload> {
        self.write(token, payload).await?;
        self.read(token).await
    }

    /// Release the connection pool.
    pub fn close(self) {
        debug!("Transport client for {} closed", self.base_url);
    }
}

/// Turn a non-2xx response into the error the server reported.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await?;
    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(parsed) => Err(parsed.error.to_error()),
        Err(_) => Err(TransportError::TransportFailure {
            message: format!("Unexpected HTTP {}: {}", status, text),
            source: None,
        }),
    }
}
