//! Device acquisition and timed sampling
//!
//! This module provides:
//! - `MediaAcquisition` - typed device acquisition with per-reason denials
//! - `CaptureHandle` - exclusive ownership token over a live source
//! - `FrameSampler` - cadenced sampling with at-most-one in-flight encode

mod device;
mod sampler;

pub use device::{
    CaptureHandle, CaptureMode, CaptureSource, CaptureSourceFactory, DenialReason, DeviceKind,
    MediaAcquisition, RawCapture, SyntheticSource,
};
pub use sampler::{EncodedSample, FrameSampler, PassthroughEncoder, Sample, SampleEncoder};
