#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;
use tokio_util::sync::CancellationToken;

use ingredient_scanner_lib::api::{BackendError, BackendResult, Recommendations, ScanBackend};
use ingredient_scanner_lib::camera::{
    CameraError, CameraResult, CaptureConstraints, CapturedFrame, FrameSize, MediaSource,
    MediaStream, ReadyState, TrackState,
};
use ingredient_scanner_lib::events::{EventBus, NoticeLevel, ScannerEvent};
use ingredient_scanner_lib::models::{DetectedIngredient, Recipe};
use ingredient_scanner_lib::recommendations::{RecommendationConfig, RecommendationManager};
use ingredient_scanner_lib::scanner::{CaptureController, ManualClock, ScanConfig};

pub fn ingredient(name: &str, confidence: f32) -> DetectedIngredient {
    DetectedIngredient::new(name, confidence)
}

pub fn recipes(ids: &[&str]) -> Vec<Recipe> {
    ids.iter()
        .map(|id| Recipe::new(*id, format!("Recipe {id}")))
        .collect()
}

pub fn recipe_ids(recipes: &[Recipe]) -> Vec<String> {
    recipes.iter().map(|r| r.recipe_id.0.clone()).collect()
}

pub fn names(ingredients: &[DetectedIngredient]) -> Vec<String> {
    ingredients.iter().map(|i| i.name.clone()).collect()
}

/// Backend whose answers are queued up front. An empty queue answers with
/// an empty success.
#[derive(Default)]
pub struct FakeBackend {
    detections: Mutex<VecDeque<BackendResult<Vec<DetectedIngredient>>>>,
    recommendations: Mutex<VecDeque<BackendResult<Vec<Recipe>>>>,
    popular: Mutex<VecDeque<BackendResult<Vec<Recipe>>>>,
    detect_delay: Mutex<Option<Duration>>,
    pub detect_calls: Mutex<usize>,
    pub detect_cancelled: Mutex<bool>,
    pub recommend_calls: Mutex<Vec<Vec<DetectedIngredient>>>,
    pub popular_calls: Mutex<Vec<usize>>,
    pub saved: Mutex<Vec<Vec<DetectedIngredient>>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_detection(&self, result: BackendResult<Vec<DetectedIngredient>>) {
        self.detections.lock().unwrap().push_back(result);
    }

    pub fn push_recommendation(&self, result: BackendResult<Vec<Recipe>>) {
        self.recommendations.lock().unwrap().push_back(result);
    }

    pub fn push_popular(&self, result: BackendResult<Vec<Recipe>>) {
        self.popular.lock().unwrap().push_back(result);
    }

    pub fn set_detect_delay(&self, delay: Duration) {
        *self.detect_delay.lock().unwrap() = Some(delay);
    }

    pub fn detect_count(&self) -> usize {
        *self.detect_calls.lock().unwrap()
    }

    pub fn recommend_requests(&self) -> Vec<Vec<String>> {
        self.recommend_calls
            .lock()
            .unwrap()
            .iter()
            .map(|batch| names(batch))
            .collect()
    }
}

#[async_trait]
impl ScanBackend for FakeBackend {
    async fn detect_ingredients(
        &self,
        _jpeg: Vec<u8>,
        cancel: CancellationToken,
    ) -> BackendResult<Vec<DetectedIngredient>> {
        *self.detect_calls.lock().unwrap() += 1;
        let delay = *self.detect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::select! {
                _ = cancel.cancelled() => {
                    *self.detect_cancelled.lock().unwrap() = true;
                    return Err(BackendError::Aborted);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
        self.detections
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn save_detections(&self, ingredients: &[DetectedIngredient]) -> BackendResult<usize> {
        self.saved.lock().unwrap().push(ingredients.to_vec());
        Ok(ingredients.len())
    }

    async fn recommend_recipes(
        &self,
        ingredients: &[DetectedIngredient],
        _confidence_threshold: f32,
    ) -> BackendResult<Recommendations> {
        self.recommend_calls.lock().unwrap().push(ingredients.to_vec());
        let recipes = self
            .recommendations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))?;
        Ok(Recommendations {
            recipes,
            high_confidence_ingredients: ingredients.to_vec(),
        })
    }

    async fn popular_recipes(&self, limit: usize) -> BackendResult<Vec<Recipe>> {
        self.popular_calls.lock().unwrap().push(limit);
        self.popular
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Knobs shared between a test and the stream it handed to the controller.
#[derive(Debug, Clone)]
pub struct StreamControl {
    pub ready: ReadyState,
    pub paused: bool,
    pub tracks: Vec<TrackState>,
    pub size: Option<FrameSize>,
    pub resumed: usize,
    pub stopped: bool,
}

impl Default for StreamControl {
    fn default() -> Self {
        Self {
            ready: ReadyState::HaveEnoughData,
            paused: false,
            tracks: vec![TrackState::Live],
            size: Some(FrameSize::new(64, 48)),
            resumed: 0,
            stopped: false,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeCamera {
    pub control: Arc<Mutex<StreamControl>>,
    open_error: Arc<Mutex<Option<CameraError>>>,
    pub opened: Arc<Mutex<usize>>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_open(&self, error: CameraError) {
        *self.open_error.lock().unwrap() = Some(error);
    }

    pub fn update(&self, f: impl FnOnce(&mut StreamControl)) {
        f(&mut self.control.lock().unwrap());
    }

    pub fn snapshot(&self) -> StreamControl {
        self.control.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaSource for FakeCamera {
    async fn open(&self, _constraints: &CaptureConstraints) -> CameraResult<Box<dyn MediaStream>> {
        if let Some(error) = self.open_error.lock().unwrap().take() {
            return Err(error);
        }
        *self.opened.lock().unwrap() += 1;
        self.update(|control| control.stopped = false);
        Ok(Box::new(FakeStream {
            control: self.control.clone(),
        }))
    }
}

struct FakeStream {
    control: Arc<Mutex<StreamControl>>,
}

#[async_trait]
impl MediaStream for FakeStream {
    async fn loaded_metadata(&mut self) -> CameraResult<()> {
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        self.control.lock().unwrap().ready
    }

    fn is_paused(&self) -> bool {
        self.control.lock().unwrap().paused
    }

    fn resume(&mut self) -> CameraResult<()> {
        let mut control = self.control.lock().unwrap();
        control.paused = false;
        control.resumed += 1;
        Ok(())
    }

    fn track_states(&self) -> Vec<TrackState> {
        self.control.lock().unwrap().tracks.clone()
    }

    fn video_size(&self) -> Option<FrameSize> {
        self.control.lock().unwrap().size
    }

    fn grab_frame(&mut self) -> CameraResult<CapturedFrame> {
        Ok(CapturedFrame::Image(DynamicImage::new_rgb8(64, 48)))
    }

    fn stop(&mut self) {
        self.control.lock().unwrap().stopped = true;
    }
}

/// Scan config whose loops never fire on their own during a test.
pub fn manual_scan_config() -> ScanConfig {
    ScanConfig {
        scan_interval: Duration::from_secs(3600),
        health_interval: Duration::from_secs(3600),
        ..ScanConfig::default()
    }
}

pub struct Harness {
    pub controller: CaptureController,
    pub backend: Arc<FakeBackend>,
    pub camera: FakeCamera,
    pub clock: ManualClock,
    pub events: Receiver<ScannerEvent>,
}

pub fn harness(config: ScanConfig) -> Harness {
    let backend = FakeBackend::new();
    let camera = FakeCamera::new();
    let clock = ManualClock::new();
    let bus = EventBus::new();
    let events = bus.subscribe();

    let recommendations =
        RecommendationManager::new(backend.clone(), bus.clone(), RecommendationConfig::default());
    let controller = CaptureController::new(
        Arc::new(camera.clone()),
        backend.clone(),
        recommendations,
        bus,
        Arc::new(clock.clone()),
        config,
    );

    Harness {
        controller,
        backend,
        camera,
        clock,
        events,
    }
}

/// Events received so far, oldest first.
pub fn drain_events(events: &mut Receiver<ScannerEvent>) -> Vec<ScannerEvent> {
    let mut drained = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => drained.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    drained
}

/// Notices received so far, oldest first.
pub fn drain_notices(events: &mut Receiver<ScannerEvent>) -> Vec<(NoticeLevel, String)> {
    let mut notices = Vec::new();
    loop {
        match events.try_recv() {
            Ok(ScannerEvent::Notice { level, message }) => notices.push((level, message)),
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    notices
}
