// Analysis payload serialization: the full-session request body sent to
// the batch analysis backend.

use chrono::Duration;
use multimodal_sessions::analysis::AnalysisRequest;
use multimodal_sessions::session::{EmotionScore, Modality, PredictionFrame, SessionController};

#[test]
fn serializes_one_face_and_one_prosody_frame() {
    let mut controller = SessionController::new();
    controller.start().unwrap();

    // Face frame at relative t=100 with a single joy score
    controller.append(
        Modality::Face,
        PredictionFrame::emotions(
            100,
            vec![EmotionScore {
                name: "joy".to_string(),
                score: 0.9,
            }],
            Some(0.8),
        ),
    );
    controller.stop().unwrap();
    controller.resume().unwrap();

    // Prosody frame with an empty emotion list
    controller.append(Modality::Prosody, PredictionFrame::emotions(0, vec![], None));

    let snapshot = controller.begin_analysis().unwrap();
    let ended_at = snapshot.start_time + Duration::milliseconds(1500);
    let request = AnalysisRequest::from_session(&snapshot, ended_at);
    let body = serde_json::to_value(&request).unwrap();

    let timeline = &body["hume_data"]["emotion_timeline"];
    assert_eq!(timeline["face_emotions"].as_array().unwrap().len(), 1);
    assert_eq!(timeline["prosody_emotions"].as_array().unwrap().len(), 1);
    assert_eq!(timeline["burst_analysis"].as_array().unwrap().len(), 0);
    assert_eq!(
        body["conversation_data"]["metadata"]["total_datapoints"],
        serde_json::json!(2)
    );

    let face = &timeline["face_emotions"][0];
    assert_eq!(face["timestamp"], serde_json::json!(100));
    assert_eq!(face["emotions"][0]["name"], serde_json::json!("joy"));
    assert_eq!(face["emotions"][0]["score"], serde_json::json!(0.9));
    assert_eq!(face["confidence"], serde_json::json!(0.8));

    // Prosody entries carry no confidence field at all
    let prosody = &timeline["prosody_emotions"][0];
    assert_eq!(prosody["timestamp"], serde_json::json!(0));
    assert!(prosody.get("confidence").is_none());
}

#[test]
fn carries_session_identity_duration_and_transcript() {
    let mut controller = SessionController::new();
    controller.start().unwrap();
    controller.append(
        Modality::Transcript,
        PredictionFrame::transcript(250, "user", "hello there"),
    );
    controller.append(
        Modality::Transcript,
        PredictionFrame::transcript(900, "replica", "hi!"),
    );

    let snapshot = controller.begin_analysis().unwrap();
    let ended_at = snapshot.start_time + Duration::seconds(2);
    let request = AnalysisRequest::from_session(&snapshot, ended_at);
    let body = serde_json::to_value(&request).unwrap();

    let conversation = &body["conversation_data"];
    assert_eq!(
        conversation["session_id"],
        serde_json::json!(snapshot.session_id)
    );
    assert_eq!(
        body["hume_data"]["session_id"],
        serde_json::json!(snapshot.session_id)
    );
    assert!((conversation["duration"].as_f64().unwrap() - 2.0).abs() < 1e-9);
    assert_eq!(
        conversation["metadata"]["session_type"],
        serde_json::json!("multimodal_assessment")
    );

    let transcript = conversation["transcript_messages"].as_array().unwrap();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0]["role"], serde_json::json!("user"));
    assert_eq!(transcript[0]["text"], serde_json::json!("hello there"));
    assert_eq!(transcript[1]["timestamp"], serde_json::json!(900));

    // RFC3339 wall-clock bounds
    let start = conversation["start_time"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(start).is_ok());
    let end = conversation["end_time"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(end).is_ok());
}
