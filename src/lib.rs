pub mod analysis;
pub mod capture;
pub mod config;
pub mod http;
pub mod relay;
pub mod session;
pub mod stream;

pub use analysis::{AnalysisDispatcher, AnalysisError, AnalysisRequest, AnalysisResult};
pub use capture::{
    CaptureHandle, CaptureMode, CaptureSource, DenialReason, DeviceKind, FrameSampler,
    MediaAcquisition, PassthroughEncoder, Sample, SampleEncoder,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use relay::FaceRelay;
pub use session::{
    EmotionScore, FramePayload, Modality, OrchestratorConfig, OrchestratorError, PredictionFrame,
    Session, SessionController, SessionOrchestrator, SessionState, SessionStats, StatusReport,
    TransitionError,
};
pub use stream::{ChannelError, ChannelEvent, PredictionEntry, StreamFrame, StreamingChannel};
