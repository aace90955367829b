use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sensing channel feeding the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Face,
    Prosody,
    Burst,
    Transcript,
}

impl Modality {
    /// Key used for this modality in wire frames (`models.<key>`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Face => "face",
            Modality::Prosody => "prosody",
            Modality::Burst => "burst",
            Modality::Transcript => "transcript",
        }
    }
}

/// A single named emotion score from the inference backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub name: String,
    pub score: f64,
}

/// Modality-specific payload of a prediction frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FramePayload {
    /// Ranked emotion scores from a streaming model. Confidence is only
    /// populated for face predictions.
    Emotions {
        emotions: Vec<EmotionScore>,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
    /// One conversation transcript line
    Transcript { role: String, text: String },
}

/// One timestamped inference result from a modality's streaming backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFrame {
    /// Milliseconds since the session started (not wall-clock), so frames
    /// from modalities with different network latencies stay comparable
    pub timestamp: u64,

    #[serde(flatten)]
    pub payload: FramePayload,
}

impl PredictionFrame {
    pub fn emotions(timestamp: u64, emotions: Vec<EmotionScore>, confidence: Option<f64>) -> Self {
        Self {
            timestamp,
            payload: FramePayload::Emotions { emotions, confidence },
        }
    }

    pub fn transcript(timestamp: u64, role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            payload: FramePayload::Transcript {
                role: role.into(),
                text: text.into(),
            },
        }
    }
}

/// One bounded period of data collection, from start to analysis
///
/// All four sequences are append-only; order within a sequence is arrival
/// order. A session is replaced wholesale when a new one starts, never
/// mutated across session boundaries.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub face_emotions: Vec<PredictionFrame>,
    pub prosody_timeline: Vec<PredictionFrame>,
    pub burst_timeline: Vec<PredictionFrame>,
    pub transcript_messages: Vec<PredictionFrame>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            start_time: Utc::now(),
            face_emotions: Vec::new(),
            prosody_timeline: Vec::new(),
            burst_timeline: Vec::new(),
            transcript_messages: Vec::new(),
        }
    }

    pub(crate) fn append(&mut self, modality: Modality, frame: PredictionFrame) {
        match modality {
            Modality::Face => self.face_emotions.push(frame),
            Modality::Prosody => self.prosody_timeline.push(frame),
            Modality::Burst => self.burst_timeline.push(frame),
            Modality::Transcript => self.transcript_messages.push(frame),
        }
    }

    pub fn frames(&self, modality: Modality) -> &[PredictionFrame] {
        match modality {
            Modality::Face => &self.face_emotions,
            Modality::Prosody => &self.prosody_timeline,
            Modality::Burst => &self.burst_timeline,
            Modality::Transcript => &self.transcript_messages,
        }
    }

    pub fn has_data(&self) -> bool {
        self.total_datapoints() > 0
    }

    /// Sum of all four sequence lengths
    pub fn total_datapoints(&self) -> usize {
        self.face_emotions.len()
            + self.prosody_timeline.len()
            + self.burst_timeline.len()
            + self.transcript_messages.len()
    }

    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.start_time);
        SessionStats {
            session_id: self.session_id.clone(),
            started_at: self.start_time,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            face_count: self.face_emotions.len(),
            prosody_count: self.prosody_timeline.len(),
            burst_count: self.burst_timeline.len(),
            transcript_count: self.transcript_messages.len(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-modality counts for the status surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub face_count: usize,
    pub prosody_count: usize,
    pub burst_count: usize,
    pub transcript_count: usize,
}
