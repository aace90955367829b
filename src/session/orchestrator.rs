use super::accumulator::{Modality, PredictionFrame, Session, SessionStats};
use super::state::{SessionController, SessionState, TransitionError};
use crate::analysis::{AnalysisDispatcher, AnalysisError, AnalysisResult};
use crate::capture::{
    CaptureHandle, DenialReason, DeviceKind, FrameSampler, MediaAcquisition, PassthroughEncoder,
    Sample, SampleEncoder,
};
use crate::stream::{ChannelError, ChannelEvent, StreamingChannel};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("device acquisition failed: {0}")]
    Acquisition(DenialReason),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Tunables for one session's capture and streaming pipeline
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Cadence for still-frame sampling (face model)
    pub face_interval: Duration,
    /// Length of each audio recording window (prosody and burst models)
    pub recording_length: Duration,
    /// Rolling window the audio pipeline may buffer; together with
    /// `recording_length` this bounds how many encoded chunks can queue
    pub stream_window: Duration,
    /// Hard wall-clock cap on a recording; collection auto-stops once
    pub max_recording: Duration,
    /// Inference backend WebSocket endpoint, shared by all modalities
    pub stream_url: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            face_interval: Duration::from_millis(2000),
            recording_length: Duration::from_millis(500),
            stream_window: Duration::from_millis(5000),
            max_recording: Duration::from_secs(30),
            stream_url: "ws://localhost:9100/v0/stream/models".to_string(),
        }
    }
}

/// Everything spawned for one collecting period; torn down on stop
struct Pipelines {
    samplers: Vec<FrameSampler>,
    channels: Vec<Arc<StreamingChannel>>,
    tasks: Vec<JoinHandle<()>>,
    handles: Vec<CaptureHandle>,
    watchdog: Option<JoinHandle<()>>,
}

/// Point-in-time report for the status surface
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: SessionState,
    pub session_id: Option<String>,
    pub stats: Option<SessionStats>,
    pub has_result: bool,
    pub analysis_error: Option<String>,
    pub stream_error: Option<String>,
    pub dropped_frames: usize,
}

/// Orchestrates one logical session: device acquisition, cadenced sampling,
/// streaming channels, accumulation, and analysis dispatch
///
/// All session mutations funnel through the controller behind one lock, so
/// the only concurrency discipline the pipeline tasks need is "ask the
/// controller"; frames arriving outside Collecting are dropped there.
pub struct SessionOrchestrator {
    config: OrchestratorConfig,
    acquisition: Arc<MediaAcquisition>,
    dispatcher: Arc<AnalysisDispatcher>,
    controller: Arc<Mutex<SessionController>>,
    pipelines: Mutex<Option<Pipelines>>,
    /// Monotonic start of the current session; survives stop/resume so
    /// relative timestamps stay comparable across pauses
    epoch: std::sync::Mutex<Option<Instant>>,
    stream_error: Arc<std::sync::Mutex<Option<String>>>,
    dropped_frames: Arc<AtomicUsize>,
}

impl SessionOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        acquisition: Arc<MediaAcquisition>,
        dispatcher: Arc<AnalysisDispatcher>,
    ) -> Self {
        Self {
            config,
            acquisition,
            dispatcher,
            controller: Arc::new(Mutex::new(SessionController::new())),
            pipelines: Mutex::new(None),
            epoch: std::sync::Mutex::new(None),
            stream_error: Arc::new(std::sync::Mutex::new(None)),
            dropped_frames: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start collecting: acquire devices, open channels, begin sampling.
    /// Returns the new session id.
    pub async fn start(self: &Arc<Self>) -> Result<String, OrchestratorError> {
        let mut controller = self.controller.lock().await;
        if controller.state() != SessionState::Idle {
            return Err(TransitionError::InvalidState {
                action: "start",
                state: controller.state(),
            }
            .into());
        }

        let epoch = Instant::now();
        let pipelines = self.spawn_pipelines(epoch).await?;
        *self.pipelines.lock().await = Some(pipelines);
        self.set_epoch(Some(epoch));

        let session = controller.start()?;
        let session_id = session.session_id.clone();
        info!(session_id = %session_id, "session started");
        Ok(session_id)
    }

    /// Stop collecting. Halts samplers, closes channels, releases devices;
    /// accumulated data is retained for resume or analysis.
    pub async fn stop(&self) -> Result<SessionStats, OrchestratorError> {
        let stats = {
            let mut controller = self.controller.lock().await;
            controller.stop()?;
            controller
                .snapshot()
                .map(|s| s.stats())
                .ok_or(TransitionError::NoData)?
        };
        self.teardown(true).await;
        info!(session_id = %stats.session_id, "session stopped");
        Ok(stats)
    }

    /// Resume collecting into the same session; previously accumulated data
    /// is untouched and timestamps keep counting from the original start
    pub async fn resume(self: &Arc<Self>) -> Result<(), OrchestratorError> {
        let mut controller = self.controller.lock().await;
        if controller.state() != SessionState::Stopped {
            return Err(TransitionError::InvalidState {
                action: "resume",
                state: controller.state(),
            }
            .into());
        }

        let epoch = self.current_epoch().unwrap_or_else(Instant::now);
        let pipelines = self.spawn_pipelines(epoch).await?;
        *self.pipelines.lock().await = Some(pipelines);

        controller.resume()?;
        info!(session_id = ?controller.session_id(), "session resumed");
        Ok(())
    }

    /// Discard the stopped session and start collecting into a fresh one
    pub async fn start_new(self: &Arc<Self>) -> Result<String, OrchestratorError> {
        let mut controller = self.controller.lock().await;
        if controller.state() != SessionState::Stopped {
            return Err(TransitionError::InvalidState {
                action: "start a new session",
                state: controller.state(),
            }
            .into());
        }

        let epoch = Instant::now();
        let pipelines = self.spawn_pipelines(epoch).await?;
        *self.pipelines.lock().await = Some(pipelines);
        self.set_epoch(Some(epoch));
        self.dropped_frames.store(0, Ordering::SeqCst);
        if let Ok(mut guard) = self.stream_error.lock() {
            guard.take();
        }

        let session = controller.start_new()?;
        let session_id = session.session_id.clone();
        info!(session_id = %session_id, "new session started, prior data discarded");
        Ok(session_id)
    }

    /// Serialize the accumulated session into one analysis request.
    /// Single-flight: a second call while one is outstanding is rejected.
    pub async fn analyze(&self) -> Result<AnalysisResult, OrchestratorError> {
        let (snapshot, was_collecting) = {
            let mut controller = self.controller.lock().await;
            let was_collecting = controller.state() == SessionState::Collecting;
            (controller.begin_analysis()?, was_collecting)
        };

        // Analyzing pauses writers; if we were mid-collection the capture
        // pipeline has nothing left to feed, so take it down.
        if was_collecting {
            self.teardown(true).await;
        }

        let outcome = self.dispatcher.analyze(&snapshot).await;

        {
            let mut controller = self.controller.lock().await;
            let recorded = match &outcome {
                Ok(result) => Ok(result.clone()),
                Err(e) => Err(e.to_string()),
            };
            if let Err(e) = controller.complete_analysis(recorded) {
                error!("failed to record analysis outcome: {}", e);
            }
        }

        outcome.map_err(Into::into)
    }

    /// Feed one conversation transcript line into the session. Gated like
    /// every other modality: a no-op outside Collecting.
    pub async fn append_transcript(&self, role: &str, text: &str) -> bool {
        let timestamp = self.relative_timestamp();
        let frame = PredictionFrame::transcript(timestamp, role, text);
        self.controller
            .lock()
            .await
            .append(Modality::Transcript, frame)
    }

    pub async fn status(&self) -> StatusReport {
        let controller = self.controller.lock().await;
        StatusReport {
            state: controller.state(),
            session_id: controller.session_id().map(str::to_string),
            stats: controller.snapshot().map(|s| s.stats()),
            has_result: controller.last_result().is_some(),
            analysis_error: controller.last_error().map(str::to_string),
            stream_error: self
                .stream_error
                .lock()
                .ok()
                .and_then(|guard| guard.clone()),
            dropped_frames: self.dropped_frames.load(Ordering::SeqCst),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.controller.lock().await.state()
    }

    pub async fn snapshot(&self) -> Option<Session> {
        self.controller.lock().await.snapshot()
    }

    pub async fn last_result(&self) -> Option<AnalysisResult> {
        self.controller.lock().await.last_result().cloned()
    }

    fn set_epoch(&self, epoch: Option<Instant>) {
        if let Ok(mut guard) = self.epoch.lock() {
            *guard = epoch;
        }
    }

    fn current_epoch(&self) -> Option<Instant> {
        self.epoch.lock().ok().and_then(|guard| *guard)
    }

    /// Milliseconds since the current session's start
    fn relative_timestamp(&self) -> u64 {
        self.current_epoch()
            .map(|epoch| epoch.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    /// Acquire devices, open one channel per modality, and spawn the
    /// sampler, forward, ingest, and watchdog tasks. Cleans up everything
    /// it created on partial failure.
    async fn spawn_pipelines(self: &Arc<Self>, epoch: Instant) -> Result<Pipelines, OrchestratorError> {
        let camera = self
            .acquisition
            .acquire(DeviceKind::Camera)
            .await
            .map_err(OrchestratorError::Acquisition)?;
        let microphone = match self.acquisition.acquire(DeviceKind::Microphone).await {
            Ok(handle) => handle,
            Err(reason) => {
                self.acquisition.release(&camera).await;
                return Err(OrchestratorError::Acquisition(reason));
            }
        };
        let handles = vec![camera.clone(), microphone.clone()];

        // How many encoded audio chunks may queue before discards start
        let audio_capacity = (self.config.stream_window.as_millis()
            / self.config.recording_length.as_millis().max(1))
        .max(1) as usize;

        let mut channels: Vec<Arc<StreamingChannel>> = Vec::new();
        let mut events: Vec<(Modality, mpsc::Receiver<ChannelEvent>)> = Vec::new();
        for modality in [Modality::Face, Modality::Prosody, Modality::Burst] {
            match StreamingChannel::open(&self.config.stream_url, modality, audio_capacity).await {
                Ok((channel, evt_rx)) => {
                    channels.push(Arc::new(channel));
                    events.push((modality, evt_rx));
                }
                Err(e) => {
                    for channel in &channels {
                        channel.close();
                    }
                    for handle in &handles {
                        self.acquisition.release(handle).await;
                    }
                    return Err(e.into());
                }
            }
        }

        let encoder: Arc<dyn SampleEncoder> = Arc::new(PassthroughEncoder);
        let mut samplers = Vec::new();
        let mut tasks = Vec::new();

        let plan: [(CaptureHandle, Duration, usize, usize); 3] = [
            (camera, self.config.face_interval, 4, 0),
            (microphone.clone(), self.config.recording_length, audio_capacity, 1),
            (microphone, self.config.recording_length, audio_capacity, 2),
        ];
        for (handle, period, capacity, channel_index) in plan {
            let (sampler, rx) = FrameSampler::start(
                handle,
                Arc::clone(&encoder),
                period,
                epoch,
                capacity,
            );
            samplers.push(sampler);
            tasks.push(Self::spawn_forward(rx, Arc::clone(&channels[channel_index])));
        }

        for (modality, evt_rx) in events {
            tasks.push(self.spawn_ingest(modality, evt_rx, epoch));
        }

        let watchdog = {
            let orchestrator = Arc::clone(self);
            let cap = self.config.max_recording;
            Some(tokio::spawn(async move {
                tokio::time::sleep(cap).await;
                orchestrator.auto_stop().await;
            }))
        };

        Ok(Pipelines {
            samplers,
            channels,
            tasks,
            handles,
            watchdog,
        })
    }

    /// Pump encoded samples from a sampler into its channel
    fn spawn_forward(
        mut rx: mpsc::Receiver<Sample>,
        channel: Arc<StreamingChannel>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(sample) = rx.recv().await {
                channel.send(sample).await;
            }
        })
    }

    /// Pump channel events into the accumulator, stamping arrival-relative
    /// timestamps; the controller drops anything outside Collecting
    fn spawn_ingest(
        self: &Arc<Self>,
        modality: Modality,
        mut evt_rx: mpsc::Receiver<ChannelEvent>,
        epoch: Instant,
    ) -> JoinHandle<()> {
        let controller = Arc::clone(&self.controller);
        let stream_error = Arc::clone(&self.stream_error);
        let dropped = Arc::clone(&self.dropped_frames);
        tokio::spawn(async move {
            while let Some(event) = evt_rx.recv().await {
                match event {
                    ChannelEvent::Prediction(entries) => {
                        let timestamp = epoch.elapsed().as_millis() as u64;
                        let mut controller = controller.lock().await;
                        for entry in entries {
                            // Face predictions default to the detector's
                            // nominal confidence when none is reported.
                            let confidence = match modality {
                                Modality::Face => Some(entry.confidence.unwrap_or(0.8)),
                                _ => None,
                            };
                            let frame =
                                PredictionFrame::emotions(timestamp, entry.emotions, confidence);
                            if !controller.append(modality, frame) {
                                dropped.fetch_add(1, Ordering::SeqCst);
                            }
                        }
                    }
                    ChannelEvent::Error(message) => {
                        warn!(modality = modality.as_str(), "stream error: {}", message);
                        if let Ok(mut guard) = stream_error.lock() {
                            *guard = Some(message);
                        }
                    }
                    ChannelEvent::Closed => {
                        info!(modality = modality.as_str(), "stream closed");
                        break;
                    }
                }
            }
        })
    }

    /// Recording cap reached: stop exactly once. Losing the race to a
    /// manual stop is fine; the transition simply refuses.
    async fn auto_stop(&self) {
        let stopped = self.controller.lock().await.stop().is_ok();
        if stopped {
            info!(
                cap_secs = self.config.max_recording.as_secs(),
                "recording cap reached, auto-stopping"
            );
            self.teardown(false).await;
        }
    }

    /// Synchronously halt samplers, close channels, abort pump tasks, and
    /// release capture handles. In-flight samples are abandoned; there is
    /// no cleanup handshake with the backend.
    async fn teardown(&self, abort_watchdog: bool) {
        if let Some(mut pipelines) = self.pipelines.lock().await.take() {
            for sampler in &mut pipelines.samplers {
                sampler.stop();
            }
            for channel in &pipelines.channels {
                channel.close();
            }
            for task in pipelines.tasks {
                task.abort();
            }
            for handle in &pipelines.handles {
                self.acquisition.release(handle).await;
            }
            if abort_watchdog {
                if let Some(watchdog) = pipelines.watchdog.take() {
                    watchdog.abort();
                }
            }
        }
    }
}
