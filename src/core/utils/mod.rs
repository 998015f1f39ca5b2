/// Bounded byte window for chunked packing
pub mod byte_window;
/// Block partitioning helpers
pub mod threading;
