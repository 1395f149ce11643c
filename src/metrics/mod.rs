mod types;

pub use types::{MetricsSnapshot, ScanMetrics, SystemMetrics};

use std::sync::Arc;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::Mutex;

const MAX_RECENT_SCANS: usize = 20;

/// Ring of recent scan timings plus process CPU/RAM, for a diagnostics view.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    recent_scans: Vec<ScanMetrics>,
    scan_count: u64,
    failure_count: u64,
    system: System,
    pid: Pid,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());

        // CPU usage is a delta between refreshes, so take a baseline now
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                recent_scans: Vec::with_capacity(MAX_RECENT_SCANS),
                scan_count: 0,
                failure_count: 0,
                system,
                pid,
            })),
        }
    }

    pub async fn record_scan(&self, metrics: ScanMetrics) {
        let mut state = self.inner.lock().await;

        state.scan_count += 1;
        if metrics.failed {
            state.failure_count += 1;
        }

        state.recent_scans.push(metrics);
        if state.recent_scans.len() > MAX_RECENT_SCANS {
            state.recent_scans.remove(0);
        }
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let mut state = self.inner.lock().await;
        let pid = state.pid;
        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        let system_metrics = match state.system.process(pid) {
            Some(process) => SystemMetrics {
                cpu_percent: process.cpu_usage(),
                memory_mb: process.memory() as f64 / 1024.0 / 1024.0,
            },
            None => SystemMetrics {
                cpu_percent: 0.0,
                memory_mb: 0.0,
            },
        };

        MetricsSnapshot {
            system: system_metrics,
            recent_scans: state.recent_scans.clone(),
            scan_count: state.scan_count,
            failure_count: state.failure_count,
        }
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        let pid = state.pid;
        state.recent_scans.clear();
        state.scan_count = 0;
        state.failure_count = 0;
        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
