use crate::capture::CaptureMode;
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct CaptureConfig {
    pub source: CaptureMode,
    pub face_interval_ms: u64,
    pub recording_length_ms: u64,
    pub stream_window_ms: u64,
    pub max_recording_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Streaming inference endpoint (WebSocket), shared by all modalities
    pub stream_url: String,
    /// Batch analysis endpoint (REST)
    pub analyze_url: String,
    pub analyze_timeout_secs: u64,
    /// Vendor API key; when absent the relay falls back to `proxy_url`
    pub api_key: Option<String>,
    /// Vendor batch inference endpoint for the face relay
    pub batch_url: Option<String>,
    pub proxy_url: Option<String>,
}

impl Config {
    /// Load from a config file, with `MMS_`-prefixed environment variables
    /// layered on top (for example `MMS_BACKEND__API_KEY`)
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("MMS").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn face_interval(&self) -> Duration {
        Duration::from_millis(self.capture.face_interval_ms)
    }

    pub fn recording_length(&self) -> Duration {
        Duration::from_millis(self.capture.recording_length_ms)
    }

    pub fn stream_window(&self) -> Duration {
        Duration::from_millis(self.capture.stream_window_ms)
    }

    pub fn max_recording(&self) -> Duration {
        Duration::from_secs(self.capture.max_recording_secs)
    }

    pub fn analyze_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.analyze_timeout_secs)
    }
}
