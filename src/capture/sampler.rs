use super::device::{CaptureHandle, RawCapture};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// A single encoded unit of sensor data, immutable once produced
#[derive(Debug, Clone)]
pub struct Sample {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// Milliseconds since the session started
    pub timestamp_ms: u64,
}

/// Output of a sample encode, before the sampler stamps the timestamp
#[derive(Debug, Clone)]
pub struct EncodedSample {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Encodes a raw capture for transmission
///
/// Encoding runs on a spawned task so a long encode never blocks the timer
/// driver; the sampler drops ticks that arrive while an encode is still
/// outstanding.
#[async_trait]
pub trait SampleEncoder: Send + Sync + 'static {
    async fn encode(&self, raw: RawCapture) -> Result<EncodedSample>;
}

/// Hands the raw bytes through unchanged; the synthetic sources already
/// produce transmission-ready payloads.
pub struct PassthroughEncoder;

#[async_trait]
impl SampleEncoder for PassthroughEncoder {
    async fn encode(&self, raw: RawCapture) -> Result<EncodedSample> {
        Ok(EncodedSample {
            bytes: raw.bytes,
            mime_type: raw.mime_type.to_string(),
        })
    }
}

/// Timer-driven sampler over a live capture handle
///
/// Each tick pulls the latest raw capture and offloads encoding; at most one
/// encode is in flight per sampler, bounding memory growth under slow
/// encoders. The emitted sequence terminates (receiver closes) when the
/// sampler is stopped or the handle is released; termination is not an
/// error. A new `start` after stop yields a fresh sequence.
pub struct FrameSampler {
    running: Arc<AtomicBool>,
    dropped_ticks: Arc<AtomicUsize>,
    task: Option<JoinHandle<()>>,
}

impl FrameSampler {
    /// Start sampling `handle` every `period`, with timestamps measured
    /// from `epoch`. `capacity` bounds how many encoded samples may queue.
    pub fn start(
        handle: CaptureHandle,
        encoder: Arc<dyn SampleEncoder>,
        period: Duration,
        epoch: Instant,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Sample>) {
        let running = Arc::new(AtomicBool::new(true));
        let dropped_ticks = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let task = tokio::spawn(Self::run(
            handle,
            encoder,
            period,
            epoch,
            tx,
            Arc::clone(&running),
            Arc::clone(&dropped_ticks),
        ));

        (
            Self {
                running,
                dropped_ticks,
                task: Some(task),
            },
            rx,
        )
    }

    async fn run(
        handle: CaptureHandle,
        encoder: Arc<dyn SampleEncoder>,
        period: Duration,
        epoch: Instant,
        tx: mpsc::Sender<Sample>,
        running: Arc<AtomicBool>,
        dropped_ticks: Arc<AtomicUsize>,
    ) {
        let device = handle.kind().as_str();
        info!(device, period_ms = period.as_millis() as u64, "sampler started");

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately; skip it so the cadence starts one
        // period after start, matching the capture loop being replaced.
        interval.tick().await;

        let mut in_flight: Option<JoinHandle<()>> = None;

        loop {
            interval.tick().await;

            if !running.load(Ordering::SeqCst) || !handle.is_active() {
                break;
            }

            if let Some(task) = &in_flight {
                if !task.is_finished() {
                    dropped_ticks.fetch_add(1, Ordering::SeqCst);
                    debug!(device, "encode still in flight, dropping tick");
                    continue;
                }
            }

            let raw = match handle.latest().await {
                Ok(raw) => raw,
                Err(reason) => {
                    warn!(device, %reason, "capture source unavailable, stopping sampler");
                    break;
                }
            };

            let timestamp_ms = epoch.elapsed().as_millis() as u64;
            let encoder = Arc::clone(&encoder);
            let tx = tx.clone();
            in_flight = Some(tokio::spawn(async move {
                match encoder.encode(raw).await {
                    Ok(encoded) => {
                        let sample = Sample {
                            bytes: encoded.bytes,
                            mime_type: encoded.mime_type,
                            timestamp_ms,
                        };
                        // Receiver gone means the pipeline shut down; the
                        // sample is simply abandoned.
                        let _ = tx.send(sample).await;
                    }
                    Err(e) => warn!("sample encode failed: {e:#}"),
                }
            }));
        }

        info!(device, "sampler stopped");
    }

    /// Halt the timer. No further ticks are scheduled; the receiver closes
    /// once any in-flight encode finishes.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Ticks dropped because an encode was still outstanding
    pub fn dropped_ticks(&self) -> usize {
        self.dropped_ticks.load(Ordering::SeqCst)
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.stop();
    }
}
