//! System constants and defaults for the hybrid SPMD substrate.

/// Library version string.
pub const HYBRID_SPMD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default capacity of the byte window a buffer is streamed through.
/// Large enough to amortize per-message overhead, small enough that a
/// broadcast row is pipelined across several frames.
pub const DEFAULT_WINDOW_CAPACITY: usize = 64 * 1024;

/// Smallest window that can carry at least one element of every type.
pub const MIN_WINDOW_CAPACITY: usize = 8;

/// Size of the little-endian length prefix on every TCP frame.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Size of the element-count frame that opens every point-to-point message.
pub const MESSAGE_HEADER_SIZE: usize = 8;

/// Largest payload a single TCP frame may declare.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Default number of connection attempts per peer before giving up.
pub const DEFAULT_CONNECT_RETRIES: u32 = 50;

/// Default delay between connection attempts, in milliseconds.
pub const DEFAULT_CONNECT_RETRY_DELAY_MS: u64 = 100;

/// Environment variable prefix used by configuration overrides.
pub const ENV_PREFIX: &str = "SPMD_";
