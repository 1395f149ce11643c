mod backoff;
mod clock;
mod controller;
mod loop_worker;
mod state;

pub use backoff::{ErrorBackoff, FailureAction};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::CaptureController;
pub use loop_worker::{RepeatingTask, TickControl};
pub use state::{CapturePhase, CaptureSessionState, ScannerStatus};

use std::time::Duration;

use thiserror::Error;

use crate::api::BackendError;
use crate::camera::{CaptureConstraints, FrameSize};
use crate::models::HIGH_CONFIDENCE_THRESHOLD;

/// Timing and quality knobs of the capture loop.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub constraints: CaptureConstraints,
    pub scan_interval: Duration,
    /// Minimum spacing between two executed scans; guards against timer drift.
    pub min_scan_spacing: Duration,
    pub detect_timeout: Duration,
    pub health_interval: Duration,
    pub max_errors: u32,
    pub jpeg_quality: u8,
    pub fallback_frame: FrameSize,
    pub confidence_threshold: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            constraints: CaptureConstraints::default(),
            scan_interval: Duration::from_millis(1500),
            min_scan_spacing: Duration::from_millis(800),
            detect_timeout: Duration::from_secs(10),
            health_interval: Duration::from_secs(5),
            max_errors: 10,
            jpeg_quality: 80,
            fallback_frame: FrameSize::FALLBACK,
            confidence_threshold: HIGH_CONFIDENCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScanError {
    #[error("frame capture failed: {0}")]
    Capture(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ScanError {
    pub fn is_transient(&self) -> bool {
        match self {
            ScanError::Capture(_) => false,
            ScanError::Backend(err) => err.is_transient(),
        }
    }
}

/// What a single scan step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    NotStreaming,
    /// Ran too soon after the previous scan.
    Throttled,
    /// The video had not buffered a frame yet.
    NotReady,
    Detected { count: usize, high_confidence: usize },
    NothingDetected,
    /// Timeout, abort or network trouble. Not counted.
    TransientFailure,
    Failed { error_count: u32 },
    /// The failure limit was hit and scanning was paused.
    AutoPaused,
    /// A newer scan or a stream restart superseded this result.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthOutcome {
    Healthy,
    /// The video was stalled and a resume was attempted.
    Resumed,
    /// No live track was left; capture was force-stopped.
    Disconnected,
    Inactive,
}
