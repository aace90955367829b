// State machine tests: transition legality, append gating, pause/resume
// round-trips, and single-flight analysis.

use multimodal_sessions::analysis::AnalysisResult;
use multimodal_sessions::session::{
    Modality, PredictionFrame, SessionController, SessionState, TransitionError,
};

fn face_frame(timestamp: u64) -> PredictionFrame {
    PredictionFrame::emotions(
        timestamp,
        vec![multimodal_sessions::session::EmotionScore {
            name: "joy".to_string(),
            score: 0.9,
        }],
        Some(0.8),
    )
}

#[test]
fn starts_idle_with_no_session() {
    let controller = SessionController::new();
    assert_eq!(controller.state(), SessionState::Idle);
    assert!(controller.snapshot().is_none());
    assert!(controller.last_result().is_none());
}

#[test]
fn start_allocates_session_and_collects() {
    let mut controller = SessionController::new();
    let session_id = controller.start().unwrap().session_id.clone();
    assert_eq!(controller.state(), SessionState::Collecting);
    assert!(session_id.starts_with("session-"));
    assert!(!controller.snapshot().unwrap().has_data());
}

#[test]
fn start_twice_is_rejected() {
    let mut controller = SessionController::new();
    controller.start().unwrap();
    let err = controller.start().unwrap_err();
    assert_eq!(
        err,
        TransitionError::InvalidState {
            action: "start",
            state: SessionState::Collecting,
        }
    );
}

#[test]
fn appends_are_fifo_per_modality_while_collecting() {
    let mut controller = SessionController::new();
    controller.start().unwrap();

    for i in 0..5 {
        assert!(controller.append(Modality::Face, face_frame(i * 100)));
    }
    assert!(controller.append(Modality::Prosody, face_frame(42)));

    let session = controller.snapshot().unwrap();
    assert_eq!(session.face_emotions.len(), 5);
    assert_eq!(session.prosody_timeline.len(), 1);
    let timestamps: Vec<u64> = session.face_emotions.iter().map(|f| f.timestamp).collect();
    assert_eq!(timestamps, vec![0, 100, 200, 300, 400], "arrival order preserved");
}

#[test]
fn appends_outside_collecting_never_change_snapshot() {
    let mut controller = SessionController::new();

    // Idle: no session at all
    assert!(!controller.append(Modality::Face, face_frame(0)));

    controller.start().unwrap();
    controller.append(Modality::Face, face_frame(100));
    controller.stop().unwrap();

    // Stopped: pause semantics, frames deliberately dropped
    assert!(!controller.append(Modality::Face, face_frame(200)));
    assert_eq!(controller.snapshot().unwrap().face_emotions.len(), 1);

    // Analyzing: writers paused
    controller.begin_analysis().unwrap();
    assert!(!controller.append(Modality::Burst, face_frame(300)));
    assert_eq!(controller.snapshot().unwrap().burst_timeline.len(), 0);
}

#[test]
fn resume_preserves_accumulated_data_exactly() {
    let mut controller = SessionController::new();
    controller.start().unwrap();
    controller.append(Modality::Face, face_frame(100));
    controller.append(Modality::Prosody, face_frame(150));
    let before = controller.snapshot().unwrap();

    controller.stop().unwrap();
    controller.resume().unwrap();
    let after = controller.snapshot().unwrap();

    assert_eq!(after.session_id, before.session_id);
    assert_eq!(after.face_emotions, before.face_emotions);
    assert_eq!(after.prosody_timeline, before.prosody_timeline);
    assert_eq!(after.total_datapoints(), 2, "no additions across the pause");
}

#[test]
fn start_new_discards_all_sequences_and_resets_identity() {
    let mut controller = SessionController::new();
    controller.start().unwrap();
    controller.append(Modality::Face, face_frame(100));
    controller.append(Modality::Transcript, PredictionFrame::transcript(200, "user", "hello"));
    let old = controller.snapshot().unwrap();
    controller.stop().unwrap();

    let new_id = controller.start_new().unwrap().session_id.clone();
    let fresh = controller.snapshot().unwrap();

    assert_ne!(new_id, old.session_id);
    assert_eq!(fresh.total_datapoints(), 0);
    assert!(fresh.start_time >= old.start_time);
    assert_eq!(controller.state(), SessionState::Collecting);
}

#[test]
fn analyze_requires_data() {
    let mut controller = SessionController::new();
    controller.start().unwrap();
    assert_eq!(controller.begin_analysis().unwrap_err(), TransitionError::NoData);
    // The failed attempt must not have moved the state
    assert_eq!(controller.state(), SessionState::Collecting);
}

#[test]
fn analyze_is_single_flight() {
    let mut controller = SessionController::new();
    controller.start().unwrap();
    controller.append(Modality::Face, face_frame(100));

    let snapshot = controller.begin_analysis().unwrap();
    assert_eq!(controller.state(), SessionState::Analyzing);

    let err = controller.begin_analysis().unwrap_err();
    assert_eq!(err, TransitionError::AnalysisInFlight);

    // The original session is untouched by the rejected attempt
    assert_eq!(
        controller.snapshot().unwrap().face_emotions,
        snapshot.face_emotions
    );
}

#[test]
fn successful_analysis_attaches_result_and_stops() {
    let mut controller = SessionController::new();
    controller.start().unwrap();
    controller.append(Modality::Face, face_frame(100));
    controller.begin_analysis().unwrap();

    let mut scores = serde_json::Map::new();
    scores.insert("overall_score".to_string(), serde_json::json!(0.42));
    controller
        .complete_analysis(Ok(AnalysisResult::new(scores)))
        .unwrap();

    assert_eq!(controller.state(), SessionState::Stopped);
    assert!(controller.last_result().is_some());
    assert!(controller.last_error().is_none());
}

#[test]
fn failed_analysis_surfaces_error_without_result() {
    let mut controller = SessionController::new();
    controller.start().unwrap();
    controller.append(Modality::Burst, face_frame(50));
    controller.begin_analysis().unwrap();

    controller
        .complete_analysis(Err("analysis backend returned status 500".to_string()))
        .unwrap();

    assert_eq!(controller.state(), SessionState::Stopped);
    assert!(controller.last_result().is_none());
    assert_eq!(
        controller.last_error(),
        Some("analysis backend returned status 500")
    );
}

#[test]
fn new_session_clears_prior_result() {
    let mut controller = SessionController::new();
    controller.start().unwrap();
    controller.append(Modality::Face, face_frame(10));
    controller.begin_analysis().unwrap();
    controller
        .complete_analysis(Ok(AnalysisResult::new(serde_json::Map::new())))
        .unwrap();
    assert!(controller.last_result().is_some());

    controller.start_new().unwrap();
    assert!(controller.last_result().is_none());
}

#[test]
fn resume_from_collecting_is_rejected() {
    let mut controller = SessionController::new();
    controller.start().unwrap();
    assert!(matches!(
        controller.resume().unwrap_err(),
        TransitionError::InvalidState { action: "resume", .. }
    ));
}
