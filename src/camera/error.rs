use std::io;

use thiserror::Error;

/// Device-acquisition failures. Each one ends the current attempt; the user
/// has to start the camera again.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera found")]
    NotFound,
    #[error("camera not supported")]
    NotSupported,
    #[error("camera error: {0}")]
    Other(String),
}

impl CameraError {
    pub fn user_message(&self) -> String {
        let hint = match self {
            CameraError::PermissionDenied => {
                "Please allow camera permissions and refresh the page."
            }
            CameraError::NotFound => "No camera found on this device.",
            CameraError::NotSupported => "Camera not supported by this browser.",
            CameraError::Other(_) => "Please check your camera and try again.",
        };
        format!("Failed to access camera. {hint}")
    }
}

impl From<io::Error> for CameraError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => CameraError::PermissionDenied,
            io::ErrorKind::NotFound => CameraError::NotFound,
            io::ErrorKind::Unsupported => CameraError::NotSupported,
            _ => CameraError::Other(err.to_string()),
        }
    }
}

impl From<image::ImageError> for CameraError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(inner) => CameraError::Other(inner.to_string()),
            image::ImageError::IoError(io) => io.into(),
            other => CameraError::Other(other.to_string()),
        }
    }
}

pub type CameraResult<T> = Result<T, CameraError>;
