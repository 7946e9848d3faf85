//! Errors and warnings raised while applying a settings string.
//!
//! Errors abort the parse pass that raised them. Warnings are informational:
//! they are logged through `tracing` and collected into the pass's
//! [`ParseReport`](crate::ParseReport).

use crate::settings::Backend;
use thiserror::Error;

/// A syntax, validation or consistency failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A mandatory separator (`:`, `,`, `]`) was missing.
    #[error("Error parsing allocator settings, expected '{expected}'")]
    ExpectedToken { expected: char },

    /// A key was followed by its separator but no value.
    #[error("Error, expecting {option} value")]
    MissingValue { option: &'static str },

    /// A numeric option got something that is not a plain number.
    #[error("invalid numeric value '{value}' for {option}")]
    InvalidNumber { option: &'static str, value: String },

    #[error("allocator option {option} too small ({value}), must be >= {min_mb}")]
    BelowMinimum { option: &'static str, value: usize, min_mb: usize },

    #[error("garbage_collection_threshold is invalid ({value}), set it in (0.0, 1.0)")]
    ThresholdOutOfRange { value: f64 },

    #[error("{what} has to be a power of 2, got {value}")]
    NotPowerOfTwo { what: &'static str, value: usize },

    #[error("For roundups, the divisions have to be a power of 2 or 0 to disable roundup, got {value}")]
    InvalidDivision { value: usize },

    #[error("Number of register threads should be less than or equal to {max}, got {value}")]
    TooManyRegisterThreads { value: usize, max: usize },

    #[error("Expected a single True/False argument for {option}, got '{value}'")]
    InvalidBool { option: &'static str, value: String },

    #[error("Unknown allocator backend '{value}', options are native, async, cudaMallocAsync or hipMallocAsync")]
    UnknownBackend { value: String },

    /// The settings string asks for a backend other than the one the allocator committed to.
    #[error("Allocator backend parsed at runtime ({runtime}) != allocator backend parsed at load time ({loaded})")]
    BackendMismatch { runtime: Backend, loaded: Backend },

    #[error("Unrecognized allocator option: {key}")]
    UnrecognizedOption { key: String },
}

/// A non-fatal compatibility notice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigWarning {
    #[error("{name} is deprecated, use {replacement} instead")]
    DeprecatedEnvVar { name: &'static str, replacement: &'static str },

    #[error("backend: async ignores {}", .options.join(", "))]
    AsyncIgnoresNativeOptions { options: Vec<&'static str> },
}
