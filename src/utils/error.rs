//! Error types for the compression engine.
//!
//! Two layers, both built on `thiserror`: [`CodecError`] is the per-task
//! transform outcome kept in the result store, [`CompressorError`] covers
//! what the submission and format surfaces can reject.

use thiserror::Error;

use crate::utils::formats::ImageFormat;

/// Failure of the resize/convert/encode transform for a single task.
///
/// A failed task produces no partial output; the error is stored as the
/// task's outcome and handed back by `fetch`.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Input image has a zero dimension
    #[error("input image is empty")]
    EmptyImage,

    /// Encoding to the target format failed (bad pixel layout, codec error)
    #[error("{format} encoding failed: {reason}")]
    Encode { format: ImageFormat, reason: String },

    /// Re-decoding the encoded bytes for an image sink failed
    #[error("re-decoding {format} output failed: {reason}")]
    Decode { format: ImageFormat, reason: String },
}

impl CodecError {
    pub fn encode(format: ImageFormat, reason: impl Into<String>) -> Self {
        Self::Encode {
            format,
            reason: reason.into(),
        }
    }

    pub fn decode(format: ImageFormat, reason: impl Into<String>) -> Self {
        Self::Decode {
            format,
            reason: reason.into(),
        }
    }
}

/// Errors reported by the engine surface and the format layer.
#[derive(Debug, Error)]
pub enum CompressorError {
    /// Task submitted after shutdown began
    #[error("compressor is shut down")]
    ShutDown,

    /// Unsupported or missing image format / file extension
    #[error("format error: {0}")]
    Format(String),
}

impl CompressorError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}

/// Convenience result type for engine operations.
pub type CompressorResult<T> = Result<T, CompressorError>;
