mod pool;
mod queue;
mod results;

pub use pool::Compressor;
