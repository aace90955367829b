use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Kind of hardware input a capture handle is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Camera,
    Microphone,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Camera => "camera",
            DeviceKind::Microphone => "microphone",
        }
    }
}

/// Why device acquisition was refused
///
/// Every platform-level rejection maps onto one of these values so the
/// caller can render a stable message per reason; acquisition never panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DenialReason {
    #[error("device access denied")]
    PermissionDenied,

    #[error("no matching device found")]
    DeviceNotFound,

    #[error("device is already in use")]
    DeviceBusy,

    #[error("device cannot satisfy the requested constraints")]
    ConstraintsNotSatisfiable,

    #[error("device access blocked by security policy")]
    SecurityBlocked,

    #[error("capture is not supported on this platform")]
    Unsupported,
}

/// A raw, unencoded capture pulled from a live source
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

/// A live capture source
///
/// `latest` returns the most recent frame without blocking on the device;
/// samplers poll it on their own cadence.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn latest(&self) -> Result<RawCapture, DenialReason>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Which source implementation the factory builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Probe real hardware devices
    Device,
    /// Deterministic generated frames (demos, headless hosts, tests)
    Synthetic,
}

/// Capture source factory
pub struct CaptureSourceFactory;

impl CaptureSourceFactory {
    pub fn create(
        kind: DeviceKind,
        mode: CaptureMode,
    ) -> Result<Arc<dyn CaptureSource>, DenialReason> {
        match mode {
            CaptureMode::Synthetic => Ok(Arc::new(SyntheticSource::new(kind))),
            // No platform device integration is wired on headless targets;
            // probing finds nothing to open.
            CaptureMode::Device => Err(DenialReason::DeviceNotFound),
        }
    }
}

/// Deterministic source: counters stamped into a fixed-size payload
pub struct SyntheticSource {
    kind: DeviceKind,
    counter: AtomicU64,
}

impl SyntheticSource {
    pub fn new(kind: DeviceKind) -> Self {
        Self {
            kind,
            counter: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl CaptureSource for SyntheticSource {
    async fn latest(&self) -> Result<RawCapture, DenialReason> {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let (mime_type, len) = match self.kind {
            DeviceKind::Camera => ("image/jpeg", 256),
            DeviceKind::Microphone => ("audio/webm", 512),
        };
        let mut bytes = vec![0u8; len];
        bytes[..8].copy_from_slice(&seq.to_le_bytes());
        Ok(RawCapture { bytes, mime_type })
    }

    fn name(&self) -> &str {
        match self.kind {
            DeviceKind::Camera => "synthetic-camera",
            DeviceKind::Microphone => "synthetic-microphone",
        }
    }
}

/// Ownership token over a live capture source
///
/// Cloning shares the same underlying activity flag, so releasing any clone
/// deactivates them all. Releasing stops the source for every holder.
#[derive(Clone)]
pub struct CaptureHandle {
    kind: DeviceKind,
    source: Arc<dyn CaptureSource>,
    active: Arc<AtomicBool>,
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("kind", &self.kind)
            .field("source", &self.source.name())
            .field("active", &self.is_active())
            .finish()
    }
}

impl CaptureHandle {
    fn new(kind: DeviceKind, source: Arc<dyn CaptureSource>) -> Self {
        Self {
            kind,
            source,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns true only for the call that actually deactivated the handle
    fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::SeqCst)
    }

    /// Most recent frame from the underlying source. A released handle
    /// reports the device as gone.
    pub async fn latest(&self) -> Result<RawCapture, DenialReason> {
        if !self.is_active() {
            return Err(DenialReason::DeviceNotFound);
        }
        self.source.latest().await
    }
}

/// Device acquisition registry
///
/// Enforces at most one active handle per device kind: a second acquire for
/// a kind that is still held is refused with `DeviceBusy`.
pub struct MediaAcquisition {
    mode: CaptureMode,
    active: Mutex<HashMap<DeviceKind, CaptureHandle>>,
}

impl MediaAcquisition {
    pub fn new(mode: CaptureMode) -> Self {
        Self {
            mode,
            active: Mutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, kind: DeviceKind) -> Result<CaptureHandle, DenialReason> {
        let mut active = self.active.lock().await;
        if let Some(existing) = active.get(&kind) {
            if existing.is_active() {
                return Err(DenialReason::DeviceBusy);
            }
        }

        let source = CaptureSourceFactory::create(kind, self.mode)?;
        info!(device = kind.as_str(), source = source.name(), "capture acquired");
        let handle = CaptureHandle::new(kind, source);
        active.insert(kind, handle.clone());
        Ok(handle)
    }

    /// Release a handle and stop the underlying source. Idempotent: extra
    /// calls for an already-released handle do nothing.
    pub async fn release(&self, handle: &CaptureHandle) {
        if handle.deactivate() {
            info!(device = handle.kind().as_str(), "capture released");
        } else {
            debug!(device = handle.kind().as_str(), "capture already released");
        }
        let mut active = self.active.lock().await;
        if let Some(current) = active.get(&handle.kind()) {
            if !current.is_active() {
                active.remove(&handle.kind());
            }
        }
    }
}
