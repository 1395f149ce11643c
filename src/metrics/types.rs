use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timings of one executed scan step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetrics {
    pub timestamp: DateTime<Utc>,
    pub capture_ms: u64,
    pub encode_ms: u64,
    pub frame_bytes: usize,
    pub detect_ms: u64,
    pub detections: usize,
    pub failed: bool,
    pub total_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub system: SystemMetrics,
    pub recent_scans: Vec<ScanMetrics>,
    pub scan_count: u64,
    pub failure_count: u64,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            system: SystemMetrics {
                cpu_percent: 0.0,
                memory_mb: 0.0,
            },
            recent_scans: Vec::new(),
            scan_count: 0,
            failure_count: 0,
        }
    }
}
