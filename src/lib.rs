pub mod api;
pub mod camera;
pub mod events;
pub mod metrics;
pub mod models;
pub mod recommendations;
pub mod scanner;
pub mod settings;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::sync::broadcast::{self, error::RecvError};

use api::HttpBackend;
use camera::ReplayCamera;
use events::{EventBus, NoticeLevel, ScannerEvent};
use recommendations::RecommendationManager;
use scanner::{CaptureController, SystemClock};
use settings::{ScannerSettings, SettingsStore};

/// Headless scanner: replays a directory of frames against the scan API
/// until interrupted, then prints the session history.
pub fn run() -> Result<()> {
    let store = SettingsStore::from_env()?;
    let settings = store.settings();

    let level = if settings.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    info!(
        "Ingredient scanner starting up (settings: {})",
        store.path().display()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(run_scanner(settings))
}

async fn run_scanner(settings: ScannerSettings) -> Result<()> {
    let replay_dir = settings
        .camera
        .replay_dir
        .clone()
        .context("No frame source configured; set SCANNER_FRAMES to a directory of images")?;

    let backend = Arc::new(HttpBackend::new(
        &settings.api.base_url,
        settings.api.token.clone(),
        settings.request_timeout(),
    )?);

    let events = EventBus::new();
    let logger = tokio::spawn(log_events(events.subscribe()));

    let recommendations = RecommendationManager::new(
        backend.clone(),
        events.clone(),
        settings.recommendations.clone(),
    );
    let controller = CaptureController::new(
        Arc::new(ReplayCamera::new(replay_dir)),
        backend,
        recommendations.clone(),
        events,
        Arc::new(SystemClock::new()),
        settings.scan_config(),
    );

    if let Err(err) = controller.start_capture().await {
        error!("Camera unavailable: {err}");
        return Err(anyhow::anyhow!(err.user_message()));
    }
    controller.start_scanning().await?;

    info!("Scanning; press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    controller.stop_capture().await;

    let status = controller.status().await;
    let metrics = controller.metrics().get_snapshot().await;
    info!(
        "Stopped after {} scans ({} failed)",
        status.scan_count, metrics.failure_count
    );

    for session in recommendations.history().await {
        let names: Vec<&str> = session
            .ingredients
            .iter()
            .map(|ingredient| ingredient.name.as_str())
            .collect();
        info!(
            "Session {} [{}{}]: {} recipes for {}",
            session.id,
            session.source.as_str(),
            if session.scan_complete { ", complete" } else { "" },
            session.recipes.len(),
            names.join(", ")
        );
    }

    logger.abort();
    Ok(())
}

async fn log_events(mut rx: broadcast::Receiver<ScannerEvent>) {
    loop {
        match rx.recv().await {
            Ok(ScannerEvent::Notice { level, message }) => match level {
                NoticeLevel::Error => error!("{message}"),
                NoticeLevel::Warning => warn!("{message}"),
                NoticeLevel::Info | NoticeLevel::Success => info!("{message}"),
            },
            Ok(ScannerEvent::Detections { ingredients }) => {
                let labels: Vec<String> = ingredients.iter().map(|i| i.label()).collect();
                info!("Detected: {}", labels.join(", "));
            }
            Ok(ScannerEvent::RecommendationsUpdated { total, added }) => {
                info!("Recommendations: {total} total, {added} new");
            }
            Ok(ScannerEvent::StatusChanged { status }) => {
                log::debug!("Scanner status: {:?}", status.phase);
            }
            Ok(ScannerEvent::OverlayCleared) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event log fell behind, skipped {skipped} events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
