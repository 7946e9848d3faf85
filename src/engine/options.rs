//! Per-option value parsers.
//!
//! Each handler receives the full token list and the index of the key token
//! that selected it, writes its field on `Settings` and returns the index of
//! the last token it consumed. The shared shape is:
//!
//! ```text
//! tokens: [..., key, ":", value, ...]
//!               ^i         ^returned
//! ```
//!
//! A missing `:` names the separator; a missing value names the option.
//! `roundup_power2_divisions` has a structured value and lives in
//! `divisions.rs`.

use super::keys::OptionKey;
use crate::error::ConfigError;
use crate::settings::{Backend, LARGE_BUFFER, MB, Settings, pinned_max_register_threads};
use std::num::IntErrorKind;
use tracing::trace;

/// Require `expected` at `tokens[i]`.
pub(crate) fn consume_token(tokens: &[String], i: usize, expected: char) -> Result<(), ConfigError> {
    match tokens.get(i) {
        Some(tok) if tok.chars().eq([expected]) => Ok(()),
        _ => Err(ConfigError::ExpectedToken { expected }),
    }
}

/// Consume `key ':' value` starting at the key index; returns the value index and text.
pub(crate) fn option_value<'t>(tokens: &'t [String], i: usize, key: OptionKey) -> Result<(usize, &'t str), ConfigError> {
    consume_token(tokens, i + 1, ':')?;
    let at = i + 2;
    let value = tokens.get(at).ok_or(ConfigError::MissingValue { option: key.name() })?;
    trace!(option = key.name(), value = value.as_str(), "option value");
    Ok((at, value.as_str()))
}

/// Parse a non-negative integer token.
pub(crate) fn parse_usize(option: &'static str, text: &str) -> Result<usize, ConfigError> {
    if !regex!(r"^[0-9]+$").is_match(text) {
        return Err(ConfigError::InvalidNumber { option, value: text.to_string() });
    }
    text.parse::<usize>().map_err(|_| ConfigError::InvalidNumber { option, value: text.to_string() })
}

/// Parse a megabyte count, saturating on overflow so huge values clamp instead of failing.
fn parse_mb(option: &'static str, text: &str) -> Result<usize, ConfigError> {
    if !regex!(r"^[0-9]+$").is_match(text) {
        return Err(ConfigError::InvalidNumber { option, value: text.to_string() });
    }
    match text.parse::<usize>() {
        Ok(value) => Ok(value),
        Err(err) if *err.kind() == IntErrorKind::PosOverflow => Ok(usize::MAX),
        Err(_) => Err(ConfigError::InvalidNumber { option, value: text.to_string() }),
    }
}

/// Parse an unsigned decimal (`0.5`, `.5`, `5e-1`). `inf`/`NaN` and signs are rejected.
fn parse_decimal(option: &'static str, text: &str) -> Result<f64, ConfigError> {
    if !regex!(r"^(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][-+]?[0-9]+)?$").is_match(text) {
        return Err(ConfigError::InvalidNumber { option, value: text.to_string() });
    }
    text.parse::<f64>().map_err(|_| ConfigError::InvalidNumber { option, value: text.to_string() })
}

fn parse_bool(option: &'static str, text: &str) -> Result<bool, ConfigError> {
    match text {
        "True" => Ok(true),
        "False" => Ok(false),
        _ => Err(ConfigError::InvalidBool { option, value: text.to_string() }),
    }
}

/// Validate a `_mb` option against the large-buffer floor and convert to bytes.
fn size_from_mb(option: &'static str, text: &str) -> Result<usize, ConfigError> {
    let min_mb = LARGE_BUFFER / MB;
    let max_mb = usize::MAX / MB;

    let value = parse_mb(option, text)?;
    if value < min_mb {
        return Err(ConfigError::BelowMinimum { option, value, min_mb });
    }
    Ok(value.min(max_mb) * MB)
}

pub(crate) fn parse_max_split_size(settings: &mut Settings, tokens: &[String], i: usize) -> Result<usize, ConfigError> {
    let key = OptionKey::MaxSplitSize;
    let (at, value) = option_value(tokens, i, key)?;
    settings.max_split_size = size_from_mb(key.name(), value)?;
    Ok(at)
}

pub(crate) fn parse_max_non_split_rounding_size(
    settings: &mut Settings,
    tokens: &[String],
    i: usize,
) -> Result<usize, ConfigError> {
    let key = OptionKey::MaxNonSplitRounding;
    let (at, value) = option_value(tokens, i, key)?;
    settings.max_non_split_rounding_size = size_from_mb(key.name(), value)?;
    Ok(at)
}

pub(crate) fn parse_garbage_collection_threshold(
    settings: &mut Settings,
    tokens: &[String],
    i: usize,
) -> Result<usize, ConfigError> {
    let key = OptionKey::GarbageCollectionThreshold;
    let (at, value) = option_value(tokens, i, key)?;
    let threshold = parse_decimal(key.name(), value)?;
    if !(threshold > 0.0 && threshold < 1.0) {
        return Err(ConfigError::ThresholdOutOfRange { value: threshold });
    }
    settings.garbage_collection_threshold = threshold;
    Ok(at)
}

/// `backend:<native|async>`, checked against the backend the allocator was loaded with.
pub(crate) fn parse_backend(
    settings: &mut Settings,
    tokens: &[String],
    i: usize,
    loaded: Option<Backend>,
) -> Result<usize, ConfigError> {
    let (at, value) = option_value(tokens, i, OptionKey::Backend)?;
    let runtime = Backend::from_token(value).ok_or_else(|| ConfigError::UnknownBackend { value: value.to_string() })?;
    if let Some(loaded) = loaded {
        if runtime != loaded {
            return Err(ConfigError::BackendMismatch { runtime, loaded });
        }
    }
    settings.use_async_allocator = runtime.is_async();
    Ok(at)
}

pub(crate) fn parse_expandable_segments(
    settings: &mut Settings,
    tokens: &[String],
    i: usize,
) -> Result<usize, ConfigError> {
    let key = OptionKey::ExpandableSegments;
    let (at, value) = option_value(tokens, i, key)?;
    settings.use_expandable_segments = parse_bool(key.name(), value)?;
    Ok(at)
}

pub(crate) fn parse_release_lock_on_device_malloc(
    settings: &mut Settings,
    tokens: &[String],
    i: usize,
) -> Result<usize, ConfigError> {
    let key = OptionKey::ReleaseLockOnDeviceMalloc;
    let (at, value) = option_value(tokens, i, key)?;
    settings.use_release_lock_on_device_malloc = parse_bool(key.name(), value)?;
    Ok(at)
}

pub(crate) fn parse_pinned_use_device_host_register(
    settings: &mut Settings,
    tokens: &[String],
    i: usize,
) -> Result<usize, ConfigError> {
    let key = OptionKey::PinnedUseDeviceHostRegister;
    let (at, value) = option_value(tokens, i, key)?;
    settings.pinned_use_device_host_register = parse_bool(key.name(), value)?;
    Ok(at)
}

pub(crate) fn parse_pinned_num_register_threads(
    settings: &mut Settings,
    tokens: &[String],
    i: usize,
) -> Result<usize, ConfigError> {
    let key = OptionKey::PinnedNumRegisterThreads;
    let (at, value) = option_value(tokens, i, key)?;
    let threads = parse_usize(key.name(), value)?;
    if !threads.is_power_of_two() {
        return Err(ConfigError::NotPowerOfTwo { what: "Number of register threads", value: threads });
    }
    let max = pinned_max_register_threads();
    if threads > max {
        return Err(ConfigError::TooManyRegisterThreads { value: threads, max });
    }
    settings.pinned_num_register_threads = threads;
    Ok(at)
}

pub(crate) fn parse_pinned_use_background_threads(
    settings: &mut Settings,
    tokens: &[String],
    i: usize,
) -> Result<usize, ConfigError> {
    let key = OptionKey::PinnedUseBackgroundThreads;
    let (at, value) = option_value(tokens, i, key)?;
    settings.pinned_use_background_threads = parse_bool(key.name(), value)?;
    Ok(at)
}
