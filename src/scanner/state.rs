use serde::{Deserialize, Serialize};

use crate::models::DetectedIngredient;

use super::backoff::ErrorBackoff;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CapturePhase {
    Off,
    Ready,
    Scanning,
    Error,
}

impl Default for CapturePhase {
    fn default() -> Self {
        CapturePhase::Off
    }
}

/// Status exposed to presentation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScannerStatus {
    pub phase: CapturePhase,
    pub streaming: bool,
    pub scanning: bool,
    pub error_count: u32,
    pub scan_count: u64,
    pub camera_error: Option<String>,
}

/// Mutable state of one capture session. `scanning` implies `streaming`.
#[derive(Debug, Clone)]
pub struct CaptureSessionState {
    pub streaming: bool,
    pub scanning: bool,
    pub backoff: ErrorBackoff,
    pub last_scan_ms: Option<u64>,
    pub scan_count: u64,
    pub camera_error: Option<String>,
    pub detections: Vec<DetectedIngredient>,
    /// Set once a high-confidence batch went to the recommendation manager.
    pub forwarded_batch: bool,
    /// Bumped whenever the stream starts or stops or scanning is paused;
    /// responses from an older epoch are never applied.
    epoch: u64,
    next_ticket: u64,
    applied_ticket: u64,
}

impl CaptureSessionState {
    pub fn new(max_errors: u32) -> Self {
        Self {
            streaming: false,
            scanning: false,
            backoff: ErrorBackoff::new(max_errors),
            last_scan_ms: None,
            scan_count: 0,
            camera_error: None,
            detections: Vec::new(),
            forwarded_batch: false,
            epoch: 0,
            next_ticket: 0,
            applied_ticket: 0,
        }
    }

    pub fn status(&self) -> ScannerStatus {
        let phase = if self.camera_error.is_some() {
            CapturePhase::Error
        } else if self.scanning {
            CapturePhase::Scanning
        } else if self.streaming {
            CapturePhase::Ready
        } else {
            CapturePhase::Off
        };

        ScannerStatus {
            phase,
            streaming: self.streaming,
            scanning: self.scanning,
            error_count: self.backoff.count(),
            scan_count: self.scan_count,
            camera_error: self.camera_error.clone(),
        }
    }

    pub fn begin_stream(&mut self) {
        self.streaming = true;
        self.scanning = false;
        self.camera_error = None;
        self.detections.clear();
        self.forwarded_batch = false;
        self.reset_counters();
        self.epoch += 1;
    }

    pub fn end_stream(&mut self) {
        self.streaming = false;
        self.scanning = false;
        self.detections.clear();
        self.forwarded_batch = false;
        self.reset_counters();
        self.epoch += 1;
    }

    pub fn begin_scanning(&mut self) -> bool {
        if !self.streaming {
            return false;
        }
        self.scanning = true;
        self.scan_count = 0;
        self.reset_counters();
        true
    }

    /// Stops scanning and invalidates any scan still in flight. Returns
    /// whether scanning was on.
    pub fn end_scanning(&mut self) -> bool {
        self.epoch += 1;
        std::mem::replace(&mut self.scanning, false)
    }

    fn reset_counters(&mut self) {
        self.backoff.reset();
        self.last_scan_ms = None;
    }

    /// Claims the scan slot at `now_ms` unless the previous scan ran less than
    /// `spacing_ms` ago.
    pub fn try_claim_slot(&mut self, now_ms: u64, spacing_ms: u64) -> bool {
        if let Some(last) = self.last_scan_ms {
            if now_ms.saturating_sub(last) < spacing_ms {
                return false;
            }
        }
        self.last_scan_ms = Some(now_ms);
        true
    }

    pub fn take_ticket(&mut self) -> (u64, u64) {
        self.next_ticket += 1;
        (self.epoch, self.next_ticket)
    }

    /// Accepts a finished scan only if it is newer than every applied one and
    /// the stream it came from is still the active one.
    pub fn accept(&mut self, epoch: u64, ticket: u64) -> bool {
        if !self.streaming || epoch != self.epoch || ticket <= self.applied_ticket {
            return false;
        }
        self.applied_ticket = ticket;
        true
    }
}
