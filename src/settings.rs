use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::camera::{CaptureConstraints, FacingMode, FrameSize};
use crate::recommendations::RecommendationConfig;
use crate::scanner::ScanConfig;

pub const CONFIG_ENV: &str = "SCANNER_CONFIG";
pub const API_URL_ENV: &str = "SCANNER_API_URL";
pub const TOKEN_ENV: &str = "SCANNER_TOKEN";
pub const FRAMES_ENV: &str = "SCANNER_FRAMES";
pub const DEBUG_ENV: &str = "SCANNER_DEBUG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            token: None,
            request_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub ideal_fps: u32,
    pub max_fps: u32,
    pub facing: FacingMode,
    /// Directory of frames served by the replay camera.
    pub replay_dir: Option<PathBuf>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        let constraints = CaptureConstraints::default();
        Self {
            width: constraints.width,
            height: constraints.height,
            ideal_fps: constraints.ideal_fps,
            max_fps: constraints.max_fps,
            facing: constraints.facing,
            replay_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanSettings {
    pub interval_ms: u64,
    pub min_spacing_ms: u64,
    pub detect_timeout_ms: u64,
    pub health_interval_ms: u64,
    pub max_errors: u32,
    pub jpeg_quality: u8,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1500,
            min_spacing_ms: 800,
            detect_timeout_ms: 10_000,
            health_interval_ms: 5000,
            max_errors: 10,
            jpeg_quality: 80,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScannerSettings {
    pub api: ApiSettings,
    pub camera: CameraSettings,
    pub scan: ScanSettings,
    pub recommendations: RecommendationConfig,
    pub debug: bool,
}

impl ScannerSettings {
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            constraints: CaptureConstraints {
                width: self.camera.width,
                height: self.camera.height,
                facing: self.camera.facing,
                ideal_fps: self.camera.ideal_fps,
                max_fps: self.camera.max_fps,
            },
            scan_interval: Duration::from_millis(self.scan.interval_ms),
            min_scan_spacing: Duration::from_millis(self.scan.min_spacing_ms),
            detect_timeout: Duration::from_millis(self.scan.detect_timeout_ms),
            health_interval: Duration::from_millis(self.scan.health_interval_ms),
            max_errors: self.scan.max_errors,
            jpeg_quality: self.scan.jpeg_quality,
            fallback_frame: FrameSize::FALLBACK,
            confidence_threshold: self.recommendations.confidence_threshold,
        }
    }

    /// Rejects timings the scan loops cannot run with.
    pub fn validate(&self) -> Result<()> {
        let timings = [
            ("scan.interval_ms", self.scan.interval_ms),
            ("scan.health_interval_ms", self.scan.health_interval_ms),
            ("scan.detect_timeout_ms", self.scan.detect_timeout_ms),
        ];
        for (key, value) in timings {
            if value == 0 {
                bail!("{key} must be greater than zero");
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.request_timeout_ms)
    }

    /// Applies `SCANNER_*` overrides read through `var`.
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var(API_URL_ENV) {
            self.api.base_url = url;
        }
        if let Some(token) = var(TOKEN_ENV) {
            self.api.token = Some(token);
        }
        if let Some(dir) = var(FRAMES_ENV) {
            self.camera.replay_dir = Some(PathBuf::from(dir));
        }
        if let Some(flag) = var(DEBUG_ENV) {
            self.debug = flag == "1" || flag.eq_ignore_ascii_case("true");
        }
    }
}

/// File-backed settings. A missing or malformed file yields defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ScannerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data: ScannerSettings = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("ignoring malformed settings in {}: {err}", path.display());
                ScannerSettings::default()
            })
        } else {
            ScannerSettings::default()
        };

        data.validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Store at `SCANNER_CONFIG`, or `scanner.json` in the working directory.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("scanner.json"));
        let store = Self::new(path)?;
        store.write().apply_overrides(|key| std::env::var(key).ok());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> ScannerSettings {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, ScannerSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ScannerSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
