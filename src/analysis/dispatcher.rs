use super::payload::AnalysisRequest;
use super::AnalysisResult;
use crate::session::Session;
use anyhow::{Context, Result};
use chrono::Utc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis backend returned status {0}")]
    Status(u16),

    #[error("analysis request failed: {0}")]
    Transport(String),

    #[error("analysis response was not a JSON object: {0}")]
    MalformedResponse(String),
}

/// Serializes an accumulated session into one outbound request to the batch
/// analysis backend
///
/// Exactly one call per analyze: no chunking, no automatic retry, no
/// streaming of partial results. A fixed request timeout bounds the call so
/// a stuck backend cannot pin the state machine in Analyzing.
pub struct AnalysisDispatcher {
    client: reqwest::Client,
    endpoint: String,
}

impl AnalysisDispatcher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build analysis HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub async fn analyze(&self, session: &Session) -> Result<AnalysisResult, AnalysisError> {
        let request = AnalysisRequest::from_session(session, Utc::now());
        info!(
            session_id = %session.session_id,
            datapoints = session.total_datapoints(),
            "dispatching analysis request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "analysis backend rejected request");
            return Err(AnalysisError::Status(status.as_u16()));
        }

        let scores = response
            .json::<serde_json::Map<String, serde_json::Value>>()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        info!(fields = scores.len(), "analysis result received");
        Ok(AnalysisResult::new(scores))
    }
}
