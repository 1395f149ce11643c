use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{BackendError, ScanBackend};
use crate::camera::{
    encode_frame, CameraResult, MediaSource, MediaStream, ReadyState, TrackState,
};
use crate::events::{EventBus, NoticeLevel, ScannerEvent};
use crate::metrics::{MetricsCollector, ScanMetrics};
use crate::models::DetectedIngredient;
use crate::recommendations::RecommendationManager;

use super::backoff::FailureAction;
use super::clock::Clock;
use super::loop_worker::{RepeatingTask, TickControl};
use super::state::{CaptureSessionState, ScannerStatus};
use super::{HealthOutcome, ScanConfig, ScanError, ScanOutcome};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

struct FrameTimings {
    started: Instant,
    capture_ms: u64,
    encode_ms: u64,
    frame_bytes: usize,
    detect_ms: u64,
}

/// Owns the camera stream and drives the scan and health loops.
///
/// Clones share the same session. Lock order: never take `stream` while
/// holding `state`.
#[derive(Clone)]
pub struct CaptureController {
    state: Arc<Mutex<CaptureSessionState>>,
    stream: Arc<Mutex<Option<Box<dyn MediaStream>>>>,
    poll_task: Arc<Mutex<Option<RepeatingTask>>>,
    health_task: Arc<Mutex<Option<RepeatingTask>>>,
    source: Arc<dyn MediaSource>,
    backend: Arc<dyn ScanBackend>,
    recommendations: RecommendationManager,
    events: EventBus,
    metrics: MetricsCollector,
    clock: Arc<dyn Clock>,
    config: ScanConfig,
}

impl CaptureController {
    pub fn new(
        source: Arc<dyn MediaSource>,
        backend: Arc<dyn ScanBackend>,
        recommendations: RecommendationManager,
        events: EventBus,
        clock: Arc<dyn Clock>,
        config: ScanConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(CaptureSessionState::new(config.max_errors))),
            stream: Arc::new(Mutex::new(None)),
            poll_task: Arc::new(Mutex::new(None)),
            health_task: Arc::new(Mutex::new(None)),
            source,
            backend,
            recommendations,
            events,
            metrics: MetricsCollector::new(),
            clock,
            config,
        }
    }

    pub async fn status(&self) -> ScannerStatus {
        self.state.lock().await.status()
    }

    /// Latest detection batch, for overlay drawing.
    pub async fn current_detections(&self) -> Vec<DetectedIngredient> {
        self.state.lock().await.detections.clone()
    }

    pub fn recommendations(&self) -> &RecommendationManager {
        &self.recommendations
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Acquires the camera. On failure the error is classified, surfaced and
    /// returned; streaming stays off.
    pub async fn start_capture(&self) -> CameraResult<()> {
        if let Some(mut previous) = self.stream.lock().await.take() {
            log_info!("releasing previous stream before restart");
            previous.stop();
        }
        self.cancel_tasks().await;
        {
            let mut state = self.state.lock().await;
            state.end_stream();
            state.camera_error = None;
        }

        let opened = match self.source.open(&self.config.constraints).await {
            Ok(mut stream) => match stream.loaded_metadata().await {
                Ok(()) => Ok(stream),
                Err(err) => {
                    stream.stop();
                    Err(err)
                }
            },
            Err(err) => Err(err),
        };

        let stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                log_error!("error accessing camera: {err}");
                self.state.lock().await.camera_error = Some(err.to_string());
                self.events.notify(NoticeLevel::Error, err.user_message());
                self.emit_status().await;
                return Err(err);
            }
        };

        if let Some(size) = stream.video_size() {
            log_info!("camera stream ready at {}x{}", size.width, size.height);
        }
        *self.stream.lock().await = Some(stream);
        self.state.lock().await.begin_stream();
        self.spawn_health_loop().await;

        self.events
            .notify(NoticeLevel::Success, "Camera started successfully!");
        self.emit_status().await;
        Ok(())
    }

    /// Releases the camera and stops both loops. Marks the newest
    /// recommendation session complete if this capture fed any batch to the
    /// recommendation manager. Stopping a stopped capture does nothing.
    pub async fn stop_capture(&self) {
        let stream = self.stream.lock().await.take();
        let had_stream = stream.is_some();
        if let Some(mut stream) = stream {
            stream.stop();
        }
        self.cancel_tasks().await;

        let (was_streaming, forwarded) = {
            let mut state = self.state.lock().await;
            let snapshot = (state.streaming, state.forwarded_batch);
            state.end_stream();
            snapshot
        };

        if !had_stream && !was_streaming {
            return;
        }

        if forwarded && self.recommendations.mark_scan_complete().await {
            self.events
                .notify(NoticeLevel::Success, "Scan completed! Recommendations saved.");
        }

        self.events.emit(ScannerEvent::OverlayCleared);
        self.emit_status().await;
        self.events.notify(NoticeLevel::Info, "Camera stopped");
        log_info!("camera stopped");
    }

    /// Starts the scan poll. Fails when the camera is not streaming.
    pub async fn start_scanning(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.scanning {
                return Ok(());
            }
            if !state.begin_scanning() {
                drop(state);
                self.events.notify(
                    NoticeLevel::Error,
                    "Camera must be running to start scanning",
                );
                bail!("camera must be running to start scanning");
            }
        }

        self.metrics.reset().await;

        let this = self.clone();
        let task = RepeatingTask::spawn("scan", self.config.scan_interval, move || {
            let this = this.clone();
            async move {
                match this.scan_step().await {
                    ScanOutcome::AutoPaused | ScanOutcome::NotStreaming => TickControl::Break,
                    _ => TickControl::Continue,
                }
            }
        });
        if let Some(previous) = self.poll_task.lock().await.replace(task) {
            previous.cancel();
        }

        self.events
            .notify(NoticeLevel::Success, "Live scanning started!");
        self.emit_status().await;
        Ok(())
    }

    /// Stops the scan poll and clears the overlay. The stream keeps running;
    /// a scan still in flight is dropped when it returns.
    pub async fn pause_scanning(&self) {
        if let Some(task) = self.poll_task.lock().await.take() {
            task.cancel();
        }

        let was_scanning = self.state.lock().await.end_scanning();
        if !was_scanning {
            return;
        }

        self.events.emit(ScannerEvent::OverlayCleared);
        self.emit_status().await;
        self.events.notify(NoticeLevel::Info, "Scanning paused");
    }

    /// One poll cycle: throttle, capture, detect, apply.
    pub async fn scan_step(&self) -> ScanOutcome {
        let spacing_ms = self.config.min_scan_spacing.as_millis() as u64;
        let now_ms = self.clock.now_ms();

        let (epoch, ticket) = {
            let mut state = self.state.lock().await;
            if !state.streaming {
                return ScanOutcome::NotStreaming;
            }
            if !state.try_claim_slot(now_ms, spacing_ms) {
                log_debug!("scan throttled at {now_ms} ms");
                return ScanOutcome::Throttled;
            }
            state.take_ticket()
        };

        let started = Instant::now();
        let grabbed = {
            let mut guard = self.stream.lock().await;
            let Some(stream) = guard.as_mut() else {
                return ScanOutcome::NotStreaming;
            };
            if !stream.ready_state().can_capture() {
                log_warn!("video not ready for scanning");
                return ScanOutcome::NotReady;
            }
            let size = stream
                .video_size()
                .filter(|size| size.width > 0 && size.height > 0)
                .unwrap_or(self.config.fallback_frame);
            stream.grab_frame().map(|frame| (frame, size))
        };
        let capture_ms = started.elapsed().as_millis() as u64;

        let (captured, size) = match grabbed {
            Ok(frame) => frame,
            Err(err) => {
                return self
                    .finish(epoch, ticket, Err(ScanError::Capture(err.to_string())), None)
                    .await;
            }
        };

        let encode_start = Instant::now();
        let quality = self.config.jpeg_quality;
        let encoded = tokio::task::spawn_blocking(move || {
            let image = captured.decode()?;
            encode_frame(&image, size, quality)
        })
        .await;
        let frame = match encoded {
            Ok(Ok(frame)) => frame,
            Ok(Err(err)) => {
                let failure = ScanError::Capture(format!("frame processing failed: {err}"));
                return self.finish(epoch, ticket, Err(failure), None).await;
            }
            Err(err) => {
                let failure = ScanError::Capture(format!("encoder worker join failed: {err}"));
                return self.finish(epoch, ticket, Err(failure), None).await;
            }
        };
        let encode_ms = encode_start.elapsed().as_millis() as u64;
        let frame_bytes = frame.jpeg.len();

        let detect_start = Instant::now();
        let cancel = CancellationToken::new();
        let result = tokio::select! {
            result = self.backend.detect_ingredients(frame.jpeg, cancel.clone()) => result,
            _ = tokio::time::sleep(self.config.detect_timeout) => {
                cancel.cancel();
                Err(BackendError::Timeout)
            }
        };

        let timings = FrameTimings {
            started,
            capture_ms,
            encode_ms,
            frame_bytes,
            detect_ms: detect_start.elapsed().as_millis() as u64,
        };
        self.finish(epoch, ticket, result.map_err(ScanError::from), Some(timings))
            .await
    }

    async fn finish(
        &self,
        epoch: u64,
        ticket: u64,
        result: Result<Vec<DetectedIngredient>, ScanError>,
        timings: Option<FrameTimings>,
    ) -> ScanOutcome {
        if let Some(timings) = timings {
            self.record_metrics(&result, timings).await;
        }

        let mut state = self.state.lock().await;
        if !state.accept(epoch, ticket) {
            log_debug!("dropping superseded scan result (ticket {ticket})");
            return ScanOutcome::Stale;
        }

        let detections = match result {
            Ok(detections) => detections,
            Err(err) => {
                let transient = err.is_transient();
                return match state.backoff.record(transient) {
                    FailureAction::Ignored => {
                        log_warn!("scan skipped: {err}");
                        ScanOutcome::TransientFailure
                    }
                    FailureAction::FirstFailure => {
                        log_error!("scan error: {err}");
                        drop(state);
                        self.events
                            .notify(NoticeLevel::Warning, "Scan failed. Retrying...");
                        self.emit_status().await;
                        ScanOutcome::Failed { error_count: 1 }
                    }
                    FailureAction::Counted(error_count) => {
                        log_error!("scan error ({error_count} in a row): {err}");
                        drop(state);
                        self.emit_status().await;
                        ScanOutcome::Failed { error_count }
                    }
                    FailureAction::Exhausted => {
                        log_warn!("too many scan errors, pausing scanning");
                        drop(state);
                        self.pause_scanning().await;
                        self.events.notify(
                            NoticeLevel::Error,
                            "Multiple scan failures detected. Scanning paused. Please try restarting.",
                        );
                        ScanOutcome::AutoPaused
                    }
                };
            }
        };

        state.scan_count += 1;

        if detections.is_empty() {
            state.detections.clear();
            drop(state);
            self.events.emit(ScannerEvent::OverlayCleared);
            self.emit_status().await;
            return ScanOutcome::NothingDetected;
        }

        let threshold = self.config.confidence_threshold;
        let count = detections.len();
        let high_confidence = detections
            .iter()
            .filter(|ingredient| ingredient.meets(threshold))
            .count();

        state.detections = detections.clone();
        state.backoff.reset();
        if high_confidence > 0 {
            state.forwarded_batch = true;
        }
        drop(state);

        log_info!(
            "ingredients detected: {count} total, {high_confidence} high confidence ({})",
            detections
                .iter()
                .map(DetectedIngredient::label)
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.events.emit(ScannerEvent::Detections {
            ingredients: detections.clone(),
        });
        self.emit_status().await;

        if high_confidence > 0 {
            if let Some(outcome) = self.recommendations.on_detection_batch(&detections).await {
                log_debug!("recommendation fetch finished: {outcome:?}");
            }
        }

        ScanOutcome::Detected {
            count,
            high_confidence,
        }
    }

    async fn record_metrics(
        &self,
        result: &Result<Vec<DetectedIngredient>, ScanError>,
        timings: FrameTimings,
    ) {
        let (failed, detections) = match result {
            Ok(detections) => (false, detections.len()),
            Err(_) => (true, 0),
        };

        self.metrics
            .record_scan(ScanMetrics {
                timestamp: Utc::now(),
                capture_ms: timings.capture_ms,
                encode_ms: timings.encode_ms,
                frame_bytes: timings.frame_bytes,
                detect_ms: timings.detect_ms,
                detections,
                failed,
                total_ms: timings.started.elapsed().as_millis() as u64,
            })
            .await;
    }

    /// Checks that the video is advancing and that a track is still live.
    /// Only ever narrows state: a dead stream forces a full stop.
    pub async fn health_check(&self) -> HealthOutcome {
        if !self.state.lock().await.streaming {
            return HealthOutcome::Inactive;
        }

        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return HealthOutcome::Inactive;
        };

        let mut resumed = false;
        if stream.ready_state() == ReadyState::HaveNothing || stream.is_paused() {
            log_warn!("camera health check failed - video not playing");
            match stream.resume() {
                Ok(()) => resumed = true,
                Err(err) => log_error!("failed to restart video playback: {err}"),
            }
        }

        let tracks = stream.track_states();
        if tracks.contains(&TrackState::Error) {
            let mut state = self.state.lock().await;
            if state.camera_error.is_none() {
                log_error!("camera track reported an error");
                state.camera_error = Some("Camera error occurred".into());
                drop(state);
                self.events.notify(
                    NoticeLevel::Error,
                    "Camera error. Try restarting the camera.",
                );
            }
        }

        if tracks.contains(&TrackState::Live) {
            return if resumed {
                HealthOutcome::Resumed
            } else {
                HealthOutcome::Healthy
            };
        }

        log_warn!("camera health check failed - no active tracks");
        if let Some(mut dead) = guard.take() {
            dead.stop();
        }
        drop(guard);

        if let Some(task) = self.poll_task.lock().await.take() {
            task.cancel();
        }
        if let Some(task) = self.health_task.lock().await.take() {
            task.cancel();
        }
        {
            let mut state = self.state.lock().await;
            state.end_stream();
            state.camera_error = Some("Camera connection lost".into());
        }

        self.events.emit(ScannerEvent::OverlayCleared);
        self.events
            .notify(NoticeLevel::Error, "Camera disconnected. Please restart.");
        self.emit_status().await;
        HealthOutcome::Disconnected
    }

    /// Persists the current detections in the background. Returns the task
    /// handle, or `None` when there was nothing to save.
    pub async fn save_detections(&self) -> Option<JoinHandle<()>> {
        let detections = self.state.lock().await.detections.clone();
        if detections.is_empty() {
            self.events
                .notify(NoticeLevel::Info, "No ingredients detected to save");
            return None;
        }

        let backend = self.backend.clone();
        let events = self.events.clone();
        Some(tokio::spawn(async move {
            match backend.save_detections(&detections).await {
                Ok(saved) => {
                    log_info!("saved {saved} ingredients");
                    events.notify(
                        NoticeLevel::Success,
                        format!("Saved {saved} ingredients to your fridge!"),
                    );
                }
                Err(err) => {
                    log_error!("failed to save ingredients: {err}");
                    events.notify(
                        NoticeLevel::Warning,
                        "Failed to save ingredients. Please try again.",
                    );
                }
            }
        }))
    }

    async fn spawn_health_loop(&self) {
        let this = self.clone();
        let task = RepeatingTask::spawn("health", self.config.health_interval, move || {
            let this = this.clone();
            async move {
                match this.health_check().await {
                    HealthOutcome::Disconnected | HealthOutcome::Inactive => TickControl::Break,
                    _ => TickControl::Continue,
                }
            }
        });

        if let Some(previous) = self.health_task.lock().await.replace(task) {
            previous.cancel();
        }
    }

    async fn cancel_tasks(&self) {
        if let Some(task) = self.poll_task.lock().await.take() {
            task.cancel();
        }
        if let Some(task) = self.health_task.lock().await.take() {
            task.cancel();
        }
    }

    async fn emit_status(&self) {
        let status = self.status().await;
        self.events.emit(ScannerEvent::StatusChanged { status });
    }
}
