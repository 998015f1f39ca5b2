//! Core infrastructure: element types, errors, constants and utilities.
//!
//! - [`types`]: the [`Element`](types::Element) trait and rank type
//! - [`constants`]: defaults and limits
//! - [`error`]: [`SpmdError`] and the crate [`Result`]
//! - [`utils`]: the byte window and block partitioning helpers

pub mod constants;
pub mod error;
pub mod types;
pub mod utils;

pub use constants::*;
pub use error::{Result, SpmdError};
pub use types::*;

use log::LevelFilter;

/// Install the `env_logger` backend.
///
/// `RUST_LOG` wins when set; otherwise `level` applies. Calling this more
/// than once, or after another logger was installed, is harmless.
pub fn init_logging(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if builder.try_init().is_ok() {
        log::debug!("logging initialized at {}", level);
    }
}
