use crate::session::{EmotionScore, Modality};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Outbound frame: one encoded sample for one streaming model
///
/// Wire shape: `{ "data": <base64>, "models": { "<modality>": {} } }`
#[derive(Debug, Serialize)]
pub struct StreamFrame {
    pub data: String,
    pub models: serde_json::Value,
}

impl StreamFrame {
    pub fn new(modality: Modality, bytes: &[u8]) -> Self {
        let mut models = serde_json::Map::new();
        models.insert(modality.as_str().to_string(), json!({}));
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            models: serde_json::Value::Object(models),
        }
    }
}

/// One prediction entry from the backend's reply
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionEntry {
    #[serde(default)]
    pub emotions: Vec<EmotionScore>,

    /// Face predictions may carry a detection confidence
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// A parsed inbound frame
#[derive(Debug)]
pub enum StreamReply {
    Predictions(Vec<PredictionEntry>),
    /// Backend-reported error frame (`{ "error": ... }`)
    BackendError(String),
    /// Valid JSON without predictions for this modality (for example a
    /// warmup or keepalive frame); ignored by the channel
    Empty,
}

#[derive(Debug, Deserialize)]
struct ModelReply {
    #[serde(default)]
    predictions: Vec<PredictionEntry>,
}

/// Parse an inbound text frame for `modality`
///
/// Expected: `{ "<modality>": { "predictions": [...] } }` or
/// `{ "error": string }`. Anything that is not valid JSON is an error.
pub fn parse_reply(modality: Modality, text: &str) -> Result<StreamReply, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    if let Some(error) = value.get("error") {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Ok(StreamReply::BackendError(message));
    }

    match value.get(modality.as_str()) {
        Some(model) => {
            let reply: ModelReply = serde_json::from_value(model.clone())?;
            if reply.predictions.is_empty() {
                Ok(StreamReply::Empty)
            } else {
                Ok(StreamReply::Predictions(reply.predictions))
            }
        }
        None => Ok(StreamReply::Empty),
    }
}
