use crate::analysis::AnalysisDispatcher;
use crate::capture::MediaAcquisition;
use crate::config::Config;
use crate::relay::FaceRelay;
use crate::session::{OrchestratorConfig, SessionOrchestrator};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active session orchestrators (session_id → orchestrator)
    pub sessions: Arc<RwLock<HashMap<String, Arc<SessionOrchestrator>>>>,
    pub acquisition: Arc<MediaAcquisition>,
    pub dispatcher: Arc<AnalysisDispatcher>,
    pub relay: Arc<FaceRelay>,
    pub orchestrator_config: OrchestratorConfig,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let dispatcher = Arc::new(AnalysisDispatcher::new(
            config.backend.analyze_url.clone(),
            config.analyze_timeout(),
        )?);
        let relay = Arc::new(FaceRelay::new(
            config.backend.api_key.clone(),
            config.backend.batch_url.clone(),
            config.backend.proxy_url.clone(),
            config.analyze_timeout(),
        )?);

        Ok(Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            acquisition: Arc::new(MediaAcquisition::new(config.capture.source)),
            dispatcher,
            relay,
            orchestrator_config: OrchestratorConfig {
                face_interval: config.face_interval(),
                recording_length: config.recording_length(),
                stream_window: config.stream_window(),
                max_recording: config.max_recording(),
                stream_url: config.backend.stream_url.clone(),
            },
        })
    }
}
