use thiserror::Error;

use crate::renderer::SyncStage;

#[derive(Debug, Error)]
pub enum VideoError {
    /// The source image carries no indexed color table
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The source image could not be read or decoded
    #[error("image source unavailable ({path}): {reason}")]
    SourceUnavailable { path: String, reason: String },

    /// The render backend refused an upload, draw or present
    #[error("render backend rejected {stage}: {reason}")]
    BackendRejected { stage: SyncStage, reason: String },

    #[error("invalid bit depth {0}: must be one of 1, 2, 4, 8, 16, 32")]
    InvalidBitDepth(u32),
}

impl VideoError {
    pub(crate) fn unavailable(path: impl Into<String>, reason: impl ToString) -> Self {
        VideoError::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
