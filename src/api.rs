use crate::engine;
use crate::error::{ConfigError, ConfigWarning};
use crate::settings::{Backend, Settings};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Environment variable holding the allocator settings string.
pub const PRIMARY_ENV_VAR: &str = "PYTORCH_ALLOC_CONF";

/// An environment variable that may carry the settings string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvSource {
    pub name: &'static str,
    /// Deprecated sources are still honored but emit a warning when used.
    pub deprecated: bool,
}

/// Sources probed on first access, in priority order. The first one present wins.
pub const ENV_SOURCES: [EnvSource; 3] = [
    EnvSource { name: PRIMARY_ENV_VAR, deprecated: false },
    EnvSource { name: "PYTORCH_CUDA_ALLOC_CONF", deprecated: true },
    EnvSource { name: "PYTORCH_HIP_ALLOC_CONF", deprecated: true },
];

static INSTANCE: Lazy<AllocatorConfig> = Lazy::new(AllocatorConfig::new);

/// Outcome of a successful parse pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    /// Canonical names of the options the pass applied, in dispatch order.
    pub options: Vec<&'static str>,
    /// Non-fatal notices raised during the pass.
    pub warnings: Vec<ConfigWarning>,
}

/// Result of the one-time environment initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvInit {
    /// The source that was parsed, or `None` when no source was set.
    pub source: Option<EnvSource>,
    pub report: ParseReport,
}

/// Process-wide allocator settings.
///
/// Parsed settings sit behind a single `RwLock`: a parse pass holds the write
/// guard from reset to its last option, so readers never observe a half-applied
/// string. The last raw settings string has its own lock.
///
/// Every parse starts from defaults; options absent from the new string revert.
/// A failed parse is not rolled back: options applied before the failure stay.
#[derive(Debug)]
pub struct AllocatorConfig {
    settings: RwLock<Settings>,
    last_allocator_settings: Mutex<String>,
    /// Backend the allocator committed to, once it has started.
    loaded_backend: Mutex<Option<Backend>>,
    env_init: OnceCell<Result<EnvInit, ConfigError>>,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocatorConfig {
    /// A configuration holding compiled-in defaults. The environment is not read.
    pub fn new() -> Self {
        Self {
            settings: RwLock::new(Settings::default()),
            last_allocator_settings: Mutex::new(String::new()),
            loaded_backend: Mutex::new(None),
            env_init: OnceCell::new(),
        }
    }

    /// Apply the process environment once. See [`AllocatorConfig::init_from_lookup`].
    pub fn init_from_env(&self) -> Result<&EnvInit, ConfigError> {
        self.init_from_lookup(|name| std::env::var(name).ok())
    }

    /// Probe [`ENV_SOURCES`] through `lookup` and parse the first one present.
    ///
    /// Runs at most once per instance: concurrent callers block until the
    /// first finishes, and later calls return the stored outcome (including a
    /// stored failure) without consulting `lookup` again.
    pub fn init_from_lookup<F>(&self, lookup: F) -> Result<&EnvInit, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        self.env_init.get_or_init(|| self.parse_first_source(lookup)).as_ref().map_err(Clone::clone)
    }

    fn parse_first_source<F>(&self, mut lookup: F) -> Result<EnvInit, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        for source in ENV_SOURCES {
            let Some(text) = lookup(source.name) else {
                continue;
            };

            let mut warnings = Vec::new();
            if source.deprecated {
                let warning = ConfigWarning::DeprecatedEnvVar { name: source.name, replacement: PRIMARY_ENV_VAR };
                warn!("{warning}");
                warnings.push(warning);
            }

            info!(source = source.name, "loading allocator settings from environment");
            let mut report = self.parse(&text)?;
            warnings.append(&mut report.warnings);
            report.warnings = warnings;
            return Ok(EnvInit { source: Some(source), report });
        }

        debug!("no allocator settings in environment, using defaults");
        Ok(EnvInit { source: None, report: ParseReport::default() })
    }

    /// Reset every setting to its default and apply `text`.
    ///
    /// The loaded-backend guard is held for the whole pass, so a concurrent
    /// [`AllocatorConfig::mark_allocator_loaded`] commits either before or after it.
    pub fn parse(&self, text: &str) -> Result<ParseReport, ConfigError> {
        // Lock order: loaded_backend, then settings.
        let loaded = self.loaded_backend.lock();
        let mut settings = self.settings.write();
        *settings = Settings::reset_for(*loaded);
        *self.last_allocator_settings.lock() = text.to_string();
        engine::apply(&mut settings, text, *loaded)
    }

    /// Record the backend the allocator committed to. Later parses must agree with it.
    pub fn set_allocator_loaded(&self, backend: Backend) {
        debug!(%backend, "allocator loaded");
        *self.loaded_backend.lock() = Some(backend);
    }

    /// Commit to the backend currently configured.
    pub fn mark_allocator_loaded(&self) -> Backend {
        let mut loaded = self.loaded_backend.lock();
        let backend = self.settings.read().backend();
        debug!(%backend, "allocator loaded");
        *loaded = Some(backend);
        backend
    }

    pub fn allocator_loaded(&self) -> Option<Backend> {
        *self.loaded_backend.lock()
    }

    /// The most recently applied raw settings string.
    pub fn last_allocator_settings(&self) -> String {
        self.last_allocator_settings.lock().clone()
    }

    pub fn snapshot(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn max_split_size(&self) -> usize {
        self.settings.read().max_split_size()
    }

    pub fn max_non_split_rounding_size(&self) -> usize {
        self.settings.read().max_non_split_rounding_size()
    }

    pub fn garbage_collection_threshold(&self) -> f64 {
        self.settings.read().garbage_collection_threshold()
    }

    /// Division count for an allocation of `size` bytes.
    pub fn roundup_power2_divisions(&self, size: usize) -> usize {
        self.settings.read().roundup_power2_divisions_for(size)
    }

    pub fn use_async_allocator(&self) -> bool {
        self.settings.read().use_async_allocator()
    }

    pub fn use_expandable_segments(&self) -> bool {
        self.settings.read().use_expandable_segments()
    }

    pub fn use_release_lock_on_device_malloc(&self) -> bool {
        self.settings.read().use_release_lock_on_device_malloc()
    }

    pub fn pinned_use_device_host_register(&self) -> bool {
        self.settings.read().pinned_use_device_host_register()
    }

    pub fn pinned_num_register_threads(&self) -> usize {
        self.settings.read().pinned_num_register_threads()
    }

    pub fn pinned_use_background_threads(&self) -> bool {
        self.settings.read().pinned_use_background_threads()
    }
}

/// The process-wide configuration, initialized from the environment on first use.
///
/// # Example
/// ```no_run
/// let config = allocconf::instance().expect("valid allocator settings");
/// let threads = config.pinned_num_register_threads();
/// assert!(threads.is_power_of_two());
/// ```
pub fn instance() -> Result<&'static AllocatorConfig, ConfigError> {
    let config = &*INSTANCE;
    config.init_from_env()?;
    Ok(config)
}

/// Re-apply `text` to the process-wide configuration.
///
/// Fails without parsing if the environment settings seen at start-up were invalid.
pub fn set_allocator_settings(text: &str) -> Result<ParseReport, ConfigError> {
    instance()?.parse(text)
}
