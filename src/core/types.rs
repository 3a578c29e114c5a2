//! Core types: task handles, compression parameters, output sinks.

use std::fmt;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::utils::ImageFormat;

/// Opaque identifier for a submitted compression task.
///
/// Handles are monotonically increasing for the lifetime of an engine
/// instance; [`TaskHandle::INVALID`] is the reserved "no task" sentinel and
/// is never issued. Wraparound of the 32-bit counter is not guarded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TaskHandle(u32);

impl TaskHandle {
    /// Reserved sentinel meaning "invalid / no task".
    pub const INVALID: TaskHandle = TaskHandle(0);

    pub(crate) fn first() -> Self {
        TaskHandle(1)
    }

    pub(crate) fn next(self) -> Self {
        TaskHandle(self.0.wrapping_add(1))
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Parameters for one compression task.
///
/// The task owns an immutable snapshot taken at submission time; the
/// caller's live copy may keep changing afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompressionParams {
    /// Scale factor; only values in (0, 1) actually resize
    pub scale: f64,
    /// Quality 0-100, higher keeps more detail (PNG maps this to a
    /// compression level, see `png_compression_level`)
    pub quality: u8,
    /// Convert to single-channel grayscale before encoding
    pub grayscale: bool,
    /// Target encoding
    pub format: ImageFormat,
}

impl Default for CompressionParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            quality: 80,
            grayscale: false,
            format: ImageFormat::Jpeg,
        }
    }
}

/// Which shape of result the caller wants back, chosen at submission.
///
/// The engine is agnostic to the variant; the codec produces whichever one
/// was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Encoded bytes in the target format
    Bytes,
    /// Encoded, then re-decoded back into a pixel buffer
    Image,
}

/// Finished-task payload, matching the requested [`SinkKind`].
#[derive(Debug, Clone)]
pub enum CompressedOutput {
    Bytes(Vec<u8>),
    Image(DynamicImage),
}

impl CompressedOutput {
    /// The encoded bytes, if this task used the byte sink.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Image(_) => None,
        }
    }

    /// The decoded image, if this task used the image sink.
    pub fn into_image(self) -> Option<DynamicImage> {
        match self {
            Self::Bytes(_) => None,
            Self::Image(image) => Some(image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_monotonic_and_skip_the_sentinel() {
        let first = TaskHandle::first();
        assert_ne!(first, TaskHandle::INVALID);

        let mut handle = first;
        for _ in 0..10 {
            let next = handle.next();
            assert!(next > handle);
            handle = next;
        }
    }

    #[test]
    fn default_params_match_the_documented_defaults() {
        let params = CompressionParams::default();
        assert_eq!(params.scale, 1.0);
        assert_eq!(params.quality, 80);
        assert!(!params.grayscale);
        assert_eq!(params.format, ImageFormat::Jpeg);
    }
}
