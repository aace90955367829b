//! Inbound face-expression relay
//!
//! Browser clients push base64 image frames over a WebSocket; each frame is
//! decoded and forwarded to the vendor's batch inference endpoint (or a
//! configured proxy when no API key is present), and the backend's JSON
//! reply goes back verbatim on the same socket. Failures answer an error
//! frame; nothing here ever terminates the process.

use anyhow::{bail, Context, Result};
use axum::extract::ws::{Message, WebSocket};
use base64::Engine;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Where relayed frames are forwarded
enum RelayTarget {
    /// Vendor batch endpoint, authenticated with the API key
    Vendor { url: String, api_key: String },
    /// Fallback proxy that owns the vendor credentials itself
    Proxy { url: String },
    /// Neither configured; every frame answers a configuration error
    Unconfigured,
}

pub struct FaceRelay {
    client: reqwest::Client,
    target: RelayTarget,
}

impl FaceRelay {
    pub fn new(
        api_key: Option<String>,
        batch_url: Option<String>,
        proxy_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build relay HTTP client")?;

        let target = match (api_key, batch_url, proxy_url) {
            (Some(api_key), Some(url), _) => RelayTarget::Vendor { url, api_key },
            (_, _, Some(url)) => RelayTarget::Proxy { url },
            _ => {
                warn!("face relay has no API key and no proxy URL; frames will be refused");
                RelayTarget::Unconfigured
            }
        };

        Ok(Self { client, target })
    }

    /// Drive one client socket until it closes
    pub async fn serve_socket(self: Arc<Self>, mut socket: WebSocket) {
        info!("relay client connected");
        while let Some(message) = socket.recv().await {
            let message = match message {
                Ok(message) => message,
                Err(_) => break,
            };
            match message {
                Message::Text(text) => {
                    let reply = self.handle_frame(&text).await;
                    if socket.send(Message::Text(reply)).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                // Pings are answered by axum; binary frames are not part
                // of the protocol.
                _ => {}
            }
        }
        info!("relay client disconnected");
    }

    /// Process one inbound frame, always producing a reply string
    pub async fn handle_frame(&self, text: &str) -> String {
        match self.process(text).await {
            Ok(body) => body,
            Err(e) => {
                warn!("relay frame failed: {e:#}");
                json!({
                    "type": "error",
                    "message": "Failed to process frame",
                    "error": e.to_string(),
                })
                .to_string()
            }
        }
    }

    async fn process(&self, text: &str) -> Result<String> {
        let value: serde_json::Value =
            serde_json::from_str(text).context("frame is not valid JSON")?;

        let encoded = value
            .get("data")
            .or_else(|| value.get("file"))
            .and_then(|v| v.as_str())
            .context("frame has no data or file field")?;

        // Data-URL payloads carry a "data:image/jpeg;base64," header.
        let encoded = match encoded.split_once(',') {
            Some((_, tail)) => tail,
            None => encoded,
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .context("frame payload is not valid base64")?;

        match &self.target {
            RelayTarget::Vendor { url, api_key } => self.forward_vendor(url, api_key, bytes).await,
            RelayTarget::Proxy { url } => self.forward_proxy(url, encoded).await,
            RelayTarget::Unconfigured => {
                bail!("no vendor API key or proxy URL configured")
            }
        }
    }

    /// Submit the frame to the vendor batch endpoint and hand back the raw
    /// response body
    async fn forward_vendor(&self, url: &str, api_key: &str, bytes: Vec<u8>) -> Result<String> {
        let job = json!({ "models": { "face": {} } }).to_string();
        let form = reqwest::multipart::Form::new()
            .text("json", job)
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes)
                    .file_name("frame.jpg")
                    .mime_str("image/jpeg")
                    .context("invalid frame mime type")?,
            );

        let response = self
            .client
            .post(url)
            .header("X-Hume-Api-Key", api_key)
            .multipart(form)
            .send()
            .await
            .context("vendor request failed")?;

        response
            .text()
            .await
            .context("failed to read vendor response")
    }

    async fn forward_proxy(&self, url: &str, encoded: &str) -> Result<String> {
        let response = self
            .client
            .post(url)
            .json(&json!({ "data": encoded }))
            .send()
            .await
            .context("proxy request failed")?;

        response
            .text()
            .await
            .context("failed to read proxy response")
    }
}
