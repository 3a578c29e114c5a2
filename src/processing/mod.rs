mod codec;

pub use codec::{compress, png_compression_level};
