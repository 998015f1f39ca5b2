//! Configuration management for hybrid SPMD runs.

pub mod core;

pub use self::core::{Config, ConfigBuilder};

/// File name looked up by [`load_default`] when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "spmd.toml";

/// Defaults, then `DEFAULT_CONFIG_FILE` if it exists, then environment
/// overrides.
pub fn load_default() -> crate::core::error::Result<Config> {
    let mut config = if std::path::Path::new(DEFAULT_CONFIG_FILE).exists() {
        Config::load_from_file(DEFAULT_CONFIG_FILE)?
    } else {
        Config::default()
    };
    config.apply_environment_overrides()?;
    Ok(config)
}
