//! Error handling and error types for hybrid SPMD runs.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants
//! follow the failure taxonomy of the substrate: configuration errors are
//! raised at construction, bounds errors before any element is mutated, and
//! transport errors are fatal to the whole process group.

use std::io;
use thiserror::Error;

/// Main error type for the hybrid SPMD library.
#[derive(Error, Debug)]
pub enum SpmdError {
    /// Configuration and validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid arguments passed to a constructor or operation
    #[error("Invalid argument: {parameter} = {value}, {reason}")]
    InvalidArgument {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Out of bounds access
    #[error("Index out of bounds: index {index}, length {length}")]
    IndexOutOfBounds { index: usize, length: usize },

    /// Two buffers or views that must agree in shape do not
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// Channel level failure; leaves collective state ambiguous across ranks
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Socket or file I/O errors
    #[error("I/O error: {source}")]
    IO {
        #[from]
        source: io::Error,
    },

    /// Thread pool or synchronization errors
    #[error("Threading error: {message}")]
    Threading { message: String },

    /// Internal library errors (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Results using SpmdError
pub type Result<T> = std::result::Result<T, SpmdError>;

impl SpmdError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        SpmdError::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: ToString,
        R: Into<String>,
    {
        SpmdError::InvalidArgument {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an index out of bounds error
    pub fn index_out_of_bounds(index: usize, length: usize) -> Self {
        SpmdError::IndexOutOfBounds { index, length }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch<E, A>(expected: E, actual: A) -> Self
    where
        E: Into<String>,
        A: Into<String>,
    {
        SpmdError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        SpmdError::Transport {
            message: message.into(),
        }
    }

    /// Create a threading error
    pub fn threading<S: Into<String>>(message: S) -> Self {
        SpmdError::Threading {
            message: message.into(),
        }
    }

    /// Create an internal error (should be used sparingly)
    pub fn internal<S: Into<String>>(message: S) -> Self {
        SpmdError::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable.
    ///
    /// Nothing that touches the group is: a failed collective leaves peers in
    /// an unknown state, so callers should abort the run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SpmdError::Config { .. } => false,
            SpmdError::InvalidArgument { .. } => true,
            SpmdError::IndexOutOfBounds { .. } => true,
            SpmdError::DimensionMismatch { .. } => true,
            SpmdError::Transport { .. } => false,
            SpmdError::IO { .. } => false,
            SpmdError::Threading { .. } => false,
            SpmdError::Internal { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            SpmdError::Config { .. } => "config",
            SpmdError::InvalidArgument { .. } => "invalid_argument",
            SpmdError::IndexOutOfBounds { .. } => "index_out_of_bounds",
            SpmdError::DimensionMismatch { .. } => "dimension_mismatch",
            SpmdError::Transport { .. } => "transport",
            SpmdError::IO { .. } => "io",
            SpmdError::Threading { .. } => "threading",
            SpmdError::Internal { .. } => "internal",
        }
    }

    /// True for failures that must bring the whole process group down.
    pub fn is_fatal_to_group(&self) -> bool {
        matches!(self, SpmdError::Transport { .. } | SpmdError::IO { .. })
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::error::SpmdError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::SpmdError::config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! transport_error {
    ($msg:expr) => {
        $crate::core::error::SpmdError::transport($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::SpmdError::transport(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}
