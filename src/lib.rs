// Module declarations in dependency order
pub mod core;
pub mod processing;
pub mod utils;
pub mod worker;

// Public exports for external consumers
pub use crate::core::{CompressedOutput, CompressionParams, SinkKind, TaskHandle};
pub use crate::processing::{compress, png_compression_level};
pub use crate::utils::{CodecError, CompressorError, CompressorResult, ImageFormat, format_from_extension};
pub use crate::worker::Compressor;
