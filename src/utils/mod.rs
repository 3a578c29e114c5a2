pub mod error;
pub mod formats;

pub use error::{CodecError, CompressorError, CompressorResult};
pub use formats::{ImageFormat, format_from_extension};
