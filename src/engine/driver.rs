//! Grammar driver.
//!
//! Walks the token list left to right:
//!
//! ```text
//! key ':' value (',' key ':' value)*
//!  │
//!  ├─ OptionKey::resolve (aliases folded here)
//!  ├─ per-option handler (options.rs / divisions.rs)
//!  ├─ mandatory ',' if tokens remain
//!  └─ async-backend warning check
//! ```
//!
//! The driver mutates the `Settings` it is given in place. A failure aborts
//! the pass but leaves whatever earlier options already wrote.

use super::divisions::parse_roundup_power2_divisions;
use super::keys::{OptionKey, OptionSet};
use super::lexer::lex;
use super::options::{self, consume_token};
use crate::ParseReport;
use crate::error::{ConfigError, ConfigWarning};
use crate::settings::{Backend, Settings};
use tracing::{debug, warn};

/// Apply `input` to `settings`. `loaded` is the backend the allocator already committed to.
pub(crate) fn apply(settings: &mut Settings, input: &str, loaded: Option<Backend>) -> Result<ParseReport, ConfigError> {
    let tokens = lex(input);
    debug!(tokens = tokens.len(), "applying allocator settings");

    let mut seen = OptionSet::empty();
    let mut native_only = OptionSet::empty();
    let mut warnings = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let (key, is_alias) =
            OptionKey::resolve(&tokens[i]).ok_or_else(|| ConfigError::UnrecognizedOption { key: tokens[i].clone() })?;
        if is_alias {
            debug!(alias = tokens[i].as_str(), canonical = key.name(), "deprecated option spelling");
        }

        i = match key {
            OptionKey::MaxSplitSize => options::parse_max_split_size(settings, &tokens, i)?,
            OptionKey::MaxNonSplitRounding => options::parse_max_non_split_rounding_size(settings, &tokens, i)?,
            OptionKey::GarbageCollectionThreshold => options::parse_garbage_collection_threshold(settings, &tokens, i)?,
            OptionKey::RoundupPower2Divisions => parse_roundup_power2_divisions(settings, &tokens, i)?,
            OptionKey::Backend => options::parse_backend(settings, &tokens, i, loaded)?,
            OptionKey::ExpandableSegments => options::parse_expandable_segments(settings, &tokens, i)?,
            OptionKey::ReleaseLockOnDeviceMalloc => options::parse_release_lock_on_device_malloc(settings, &tokens, i)?,
            OptionKey::PinnedUseDeviceHostRegister => {
                options::parse_pinned_use_device_host_register(settings, &tokens, i)?
            }
            OptionKey::PinnedNumRegisterThreads => options::parse_pinned_num_register_threads(settings, &tokens, i)?,
            OptionKey::PinnedUseBackgroundThreads => {
                options::parse_pinned_use_background_threads(settings, &tokens, i)?
            }
        };
        seen |= key.flag();
        if key.is_native_only() {
            native_only |= key.flag();
        }

        if i + 1 < tokens.len() {
            i += 1;
            consume_token(&tokens, i, ',')?;
        }

        if settings.use_async_allocator && !native_only.is_empty() {
            let warning = ConfigWarning::AsyncIgnoresNativeOptions { options: native_only.names() };
            warn!("{warning}");
            warnings.push(warning);
        }

        i += 1;
    }

    Ok(ParseReport { options: seen.names(), warnings })
}
