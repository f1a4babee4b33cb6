use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeliosError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Insufficient data: need at least {needed} usable samples, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Processing timed out after {waited:?} waiting for workers to finish")]
    ProcessingTimeout { waited: Duration },

    #[error("Processing of frame {frame_index} failed: {message}")]
    WorkerFailure { frame_index: usize, message: String },

    #[error("Frame source error: {0}")]
    FrameSource(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl HeliosError {
    /// Whether the caller should ask the user to adjust the input (for
    /// example pick the ellipse manually) rather than report a system error.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::InvalidDimensions { .. } | Self::InsufficientData { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HeliosError>;
