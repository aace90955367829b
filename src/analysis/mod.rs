//! Batch analysis of an accumulated session

mod dispatcher;
mod payload;

pub use dispatcher::{AnalysisDispatcher, AnalysisError};
pub use payload::{
    AnalysisRequest, ConversationData, ConversationMetadata, EmotionTimeline, HumeData,
};

use serde::{Deserialize, Serialize};

/// Flat mapping of named scores and labels returned by the analysis
/// backend; read-only once received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(serde_json::Map<String, serde_json::Value>);

impl AnalysisResult {
    pub fn new(scores: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(scores)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
