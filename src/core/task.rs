//! Compression task definition.

use image::DynamicImage;

use crate::core::types::{CompressionParams, SinkKind, TaskHandle};

/// A single queued compression job.
///
/// Owns its copy of the input image, so the caller is free to mutate or
/// drop its own. Mutated exactly once, by the worker that dequeues it.
pub struct CompressionTask {
    pub handle: TaskHandle,
    pub image: DynamicImage,
    pub params: CompressionParams,
    pub sink: SinkKind,
}
