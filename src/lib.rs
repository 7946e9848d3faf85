//! Configuration for a caching device-memory allocator.
//!
//! A single settings string (normally taken from the environment) is lexed,
//! dispatched per option, validated and stored in a process-wide
//! [`AllocatorConfig`]:
//!
//! ```text
//! PYTORCH_ALLOC_CONF="max_split_size_mb:128,roundup_power2_divisions:[256:1,>:4]"
//! ```
//!
//! Use [`instance`] for the process-wide configuration, or build a local
//! [`AllocatorConfig`] and call [`AllocatorConfig::parse`].

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
mod settings;

#[cfg(test)]
mod tests;

pub use api::{
    AllocatorConfig, ENV_SOURCES, EnvInit, EnvSource, PRIMARY_ENV_VAR, ParseReport, instance, set_allocator_settings,
};
pub use error::{ConfigError, ConfigWarning};
pub use settings::{
    Backend, LARGE_BUFFER, MB, PINNED_MAX_REGISTER_THREADS, ROUNDUP_POWER2_END, ROUNDUP_POWER2_INTERVALS,
    ROUNDUP_POWER2_START, Settings, pinned_max_register_threads,
};
