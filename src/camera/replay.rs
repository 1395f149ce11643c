use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use log::{info, warn};

use super::{
    CameraError, CameraResult, CaptureConstraints, CapturedFrame, FrameSize, MediaSource,
    MediaStream, ReadyState, TrackState,
};

const FRAME_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Serves the image files of a directory as a looping live stream, advancing
/// at the constraint's ideal frame rate.
pub struct ReplayCamera {
    dir: PathBuf,
}

impl ReplayCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn list_frames(&self) -> CameraResult<Vec<PathBuf>> {
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if is_frame_file(&path) {
                frames.push(path);
            }
        }
        frames.sort();
        Ok(frames)
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl MediaSource for ReplayCamera {
    async fn open(&self, constraints: &CaptureConstraints) -> CameraResult<Box<dyn MediaStream>> {
        if constraints.width == 0 || constraints.height == 0 || constraints.max_fps == 0 {
            return Err(CameraError::NotSupported);
        }

        let frames = self.list_frames()?;
        if frames.is_empty() {
            warn!("replay directory {} holds no frames", self.dir.display());
            return Err(CameraError::NotFound);
        }

        info!(
            "replay camera opened {} frames from {}",
            frames.len(),
            self.dir.display()
        );

        Ok(Box::new(ReplayStream {
            frames,
            fps: constraints.ideal_fps.clamp(1, constraints.max_fps),
            started: Instant::now(),
            size: None,
            ready: ReadyState::HaveNothing,
            track: TrackState::Live,
            paused: false,
        }))
    }
}

struct ReplayStream {
    frames: Vec<PathBuf>,
    fps: u32,
    started: Instant,
    size: Option<FrameSize>,
    ready: ReadyState,
    track: TrackState,
    paused: bool,
}

impl ReplayStream {
    fn current_index(&self) -> usize {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        ((elapsed_ms * self.fps as u64 / 1000) % self.frames.len() as u64) as usize
    }
}

#[async_trait]
impl MediaStream for ReplayStream {
    async fn loaded_metadata(&mut self) -> CameraResult<()> {
        let first = self.frames[0].clone();
        let (width, height) = tokio::task::spawn_blocking(move || image::image_dimensions(first))
            .await
            .map_err(|err| CameraError::Other(err.to_string()))??;

        self.size = Some(FrameSize::new(width, height));
        self.ready = ReadyState::HaveEnoughData;
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        self.ready
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn resume(&mut self) -> CameraResult<()> {
        if self.track != TrackState::Live {
            return Err(CameraError::Other("track is no longer live".into()));
        }
        self.paused = false;
        Ok(())
    }

    fn track_states(&self) -> Vec<TrackState> {
        vec![self.track]
    }

    fn video_size(&self) -> Option<FrameSize> {
        self.size
    }

    fn grab_frame(&mut self) -> CameraResult<CapturedFrame> {
        if self.track != TrackState::Live {
            return Err(CameraError::Other("track is no longer live".into()));
        }
        Ok(CapturedFrame::File(self.frames[self.current_index()].clone()))
    }

    fn stop(&mut self) {
        self.track = TrackState::Ended;
        self.ready = ReadyState::HaveNothing;
    }
}
