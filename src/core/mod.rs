//! Core engine types.
//!
//! - [`TaskHandle`]: opaque identifier returned at submission
//! - [`CompressionParams`]: per-task settings snapshot
//! - [`SinkKind`] / [`CompressedOutput`]: requested and produced result shape
//! - [`CompressionTask`]: a queued job

mod task;
mod types;

pub use task::CompressionTask;
pub use types::{CompressedOutput, CompressionParams, SinkKind, TaskHandle};
