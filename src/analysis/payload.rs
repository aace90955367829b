use crate::session::{PredictionFrame, Session};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Request body for the batch analysis backend
///
/// The whole session goes out in one request: all four modality sequences,
/// the elapsed duration, and a synthetic total-datapoint count. No chunking
/// and no partial results.
#[derive(Debug, Serialize)]
pub struct AnalysisRequest {
    pub conversation_data: ConversationData,
    pub hume_data: HumeData,
}

#[derive(Debug, Serialize)]
pub struct ConversationData {
    pub session_id: String,
    /// Elapsed session time in seconds
    pub duration: f64,
    pub start_time: String,
    pub end_time: String,
    pub metadata: ConversationMetadata,
    pub transcript_messages: Vec<PredictionFrame>,
}

#[derive(Debug, Serialize)]
pub struct ConversationMetadata {
    pub total_datapoints: usize,
    pub session_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HumeData {
    pub session_id: String,
    pub emotion_timeline: EmotionTimeline,
}

#[derive(Debug, Serialize)]
pub struct EmotionTimeline {
    pub face_emotions: Vec<PredictionFrame>,
    pub prosody_emotions: Vec<PredictionFrame>,
    pub burst_analysis: Vec<PredictionFrame>,
}

impl AnalysisRequest {
    pub fn from_session(session: &Session, ended_at: DateTime<Utc>) -> Self {
        let duration = ended_at
            .signed_duration_since(session.start_time)
            .num_milliseconds() as f64
            / 1000.0;

        Self {
            conversation_data: ConversationData {
                session_id: session.session_id.clone(),
                duration,
                start_time: session.start_time.to_rfc3339(),
                end_time: ended_at.to_rfc3339(),
                metadata: ConversationMetadata {
                    total_datapoints: session.total_datapoints(),
                    session_type: "multimodal_assessment",
                },
                transcript_messages: session.transcript_messages.clone(),
            },
            hume_data: HumeData {
                session_id: session.session_id.clone(),
                emotion_timeline: EmotionTimeline {
                    face_emotions: session.face_emotions.clone(),
                    prosody_emotions: session.prosody_timeline.clone(),
                    burst_analysis: session.burst_timeline.clone(),
                },
            },
        }
    }
}
