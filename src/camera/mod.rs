mod error;
mod frame;
mod replay;

pub use error::{CameraError, CameraResult};
pub use frame::{encode_frame, CapturedFrame, EncodedFrame, FrameSize};
pub use replay::ReplayCamera;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FacingMode {
    /// Rear camera on phones and tablets.
    Environment,
    User,
}

/// What the scanner asks of the camera device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: FacingMode,
    pub ideal_fps: u32,
    pub max_fps: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            facing: FacingMode::Environment,
            ideal_fps: 15,
            max_fps: 30,
        }
    }
}

/// How much of the stream has been buffered, mirroring media element readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    /// A frame can only be grabbed once the current frame is buffered.
    pub fn can_capture(self) -> bool {
        self >= ReadyState::HaveCurrentData
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackState {
    Live,
    Ended,
    Error,
}

/// Camera device provider.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn open(&self, constraints: &CaptureConstraints) -> CameraResult<Box<dyn MediaStream>>;
}

/// An acquired video stream. Owned exclusively by the capture controller.
#[async_trait]
pub trait MediaStream: Send {
    /// Resolves once the stream knows its dimensions and can start playing.
    async fn loaded_metadata(&mut self) -> CameraResult<()>;

    fn ready_state(&self) -> ReadyState;

    fn is_paused(&self) -> bool;

    /// Soft restart of a stalled or paused stream.
    fn resume(&mut self) -> CameraResult<()>;

    fn track_states(&self) -> Vec<TrackState>;

    /// Natural size of the video, if the stream has reported one.
    fn video_size(&self) -> Option<FrameSize>;

    /// Takes the current frame without decoding it. Must not block.
    fn grab_frame(&mut self) -> CameraResult<CapturedFrame>;

    /// Releases every track. Safe to call more than once.
    fn stop(&mut self);
}
