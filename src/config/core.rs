//! Run configuration for a hybrid SPMD process.
//!
//! A [`Config`] describes one rank's place in the group (rank, group size,
//! peer addresses), its thread team size and its transport settings. It can
//! be loaded from a `.toml` or `.json` file, from `SPMD_*` environment
//! variables, or assembled with [`ConfigBuilder`].

use crate::core::constants::*;
use crate::core::error::{Result, SpmdError};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Configuration of one rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of ranks in the group
    pub group_size: usize,
    /// This process's rank, below `group_size`
    pub rank: usize,
    /// Worker threads per rank; 0 means one per logical CPU
    pub num_threads: usize,
    /// Bytes per transport frame
    pub window_capacity: usize,
    /// `host:port` of every rank, indexed by rank; needed when `group_size > 1`
    pub hosts: Vec<String>,
    /// Connection attempts to a peer that is not listening yet
    pub connect_retries: u32,
    /// Pause between connection attempts
    pub connect_retry_delay_ms: u64,
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            group_size: 1,
            rank: 0,
            num_threads: 0,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            hosts: Vec::new(),
            connect_retries: DEFAULT_CONNECT_RETRIES,
            connect_retry_delay_ms: DEFAULT_CONNECT_RETRY_DELAY_MS,
            log_level: "info".to_string(),
        }
    }
}

fn env_name(suffix: &str) -> String {
    format!("{}{}", ENV_PREFIX, suffix)
}

fn env_value<T: FromStr>(suffix: &str) -> Result<Option<T>> {
    let name = env_name(suffix);
    match std::env::var(&name) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SpmdError::config(format!("Invalid {}: {:?}", name, val))),
        Err(_) => Ok(None),
    }
}

fn parse_hosts(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.group_size == 0 {
            return Err(SpmdError::invalid_argument(
                "group_size",
                self.group_size,
                "must be at least 1",
            ));
        }
        if self.rank >= self.group_size {
            return Err(SpmdError::invalid_argument(
                "rank",
                self.rank,
                format!("must be below group_size {}", self.group_size),
            ));
        }
        if self.window_capacity < MIN_WINDOW_CAPACITY {
            return Err(SpmdError::invalid_argument(
                "window_capacity",
                self.window_capacity,
                format!("must be at least {} bytes", MIN_WINDOW_CAPACITY),
            ));
        }
        if self.window_capacity > MAX_FRAME_SIZE {
            return Err(SpmdError::invalid_argument(
                "window_capacity",
                self.window_capacity,
                format!("must not exceed {} bytes", MAX_FRAME_SIZE),
            ));
        }
        if self.group_size > 1 && self.hosts.len() != self.group_size {
            return Err(SpmdError::config(format!(
                "group of {} ranks needs {} hosts, got {}",
                self.group_size,
                self.group_size,
                self.hosts.len()
            )));
        }
        self.log_level_filter()?;
        Ok(())
    }

    /// Threads a [`WorkTeam`](crate::team::WorkTeam) built from this config gets.
    pub fn effective_num_threads(&self) -> usize {
        if self.num_threads == 0 {
            num_cpus::get()
        } else {
            self.num_threads
        }
    }

    /// `log_level` parsed for the logger.
    pub fn log_level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level).map_err(|_| {
            SpmdError::invalid_argument("log_level", &self.log_level, "unknown log level")
        })
    }

    /// Load configuration from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SpmdError::config(format!("Failed to read config file: {}", e)))?;

        let config: Config = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| SpmdError::config(format!("Failed to parse JSON config: {}", e)))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| SpmdError::config(format!("Failed to parse TOML config: {}", e)))?,
            _ => {
                return Err(SpmdError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)
                .map_err(|e| SpmdError::config(format!("Failed to serialize to JSON: {}", e)))?,
            Some("toml") => toml::to_string_pretty(self)
                .map_err(|e| SpmdError::config(format!("Failed to serialize to TOML: {}", e)))?,
            _ => {
                return Err(SpmdError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        std::fs::write(path, content)
            .map_err(|e| SpmdError::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Load configuration from environment variables
    pub fn load_from_environment() -> Result<Self> {
        let mut config = Config::default();
        config.apply_environment_overrides()?;
        Ok(config)
    }

    /// Overwrite every field whose `SPMD_*` variable is set
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_value("GROUP_SIZE")? {
            self.group_size = v;
        }
        if let Some(v) = env_value("RANK")? {
            self.rank = v;
        }
        if let Some(v) = env_value("NUM_THREADS")? {
            self.num_threads = v;
        }
        if let Some(v) = env_value("WINDOW_CAPACITY")? {
            self.window_capacity = v;
        }
        if let Some(v) = env_value::<String>("HOSTS")? {
            self.hosts = parse_hosts(&v);
        }
        if let Some(v) = env_value("CONNECT_RETRIES")? {
            self.connect_retries = v;
        }
        if let Some(v) = env_value("CONNECT_RETRY_DELAY_MS")? {
            self.connect_retry_delay_ms = v;
        }
        if let Some(v) = env_value("LOG_LEVEL")? {
            self.log_level = v;
        }

        self.validate()
    }
}

/// Builder for [`Config`]; `build` validates.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_size(mut self, size: usize) -> Self {
        self.config.group_size = size;
        self
    }

    pub fn rank(mut self, rank: usize) -> Self {
        self.config.rank = rank;
        self
    }

    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = threads;
        self
    }

    pub fn window_capacity(mut self, bytes: usize) -> Self {
        self.config.window_capacity = bytes;
        self
    }

    /// Replace the address list.
    pub fn hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Append one address.
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.hosts.push(host.into());
        self
    }

    pub fn connect_retries(mut self, retries: u32) -> Self {
        self.config.connect_retries = retries;
        self
    }

    pub fn connect_retry_delay_ms(mut self, delay: u64) -> Self {
        self.config.connect_retry_delay_ms = delay;
        self
    }

    pub fn log_level<S: Into<String>>(mut self, level: S) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
