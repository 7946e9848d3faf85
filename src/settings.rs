//! Parsed allocator settings.
//!
//! `Settings` is the strongly-typed result of a parse pass. Every field is
//! re-derived from defaults at the start of a pass; the engine then mutates the
//! fields named by the settings string.
//!
//! ## Invariants
//!
//! - `roundup_power2_divisions` always has `ROUNDUP_POWER2_INTERVALS` entries,
//!   each `0` or a power of two.
//! - `max_split_size` / `max_non_split_rounding_size` are either `usize::MAX`
//!   (unbounded) or at least `LARGE_BUFFER`.
//! - `garbage_collection_threshold` is `0.0` (disabled) or in `(0.0, 1.0)`.
//! - `pinned_num_register_threads` is a power of two `<= PINNED_MAX_REGISTER_THREADS`.

use std::fmt;

/// One mebibyte.
pub const MB: usize = 1024 * 1024;

/// Split and rounding sizes below this are rejected.
pub const LARGE_BUFFER: usize = 20 * MB;

/// Number of roundup buckets (1 MiB .. 64 GiB, power-of-two spaced).
pub const ROUNDUP_POWER2_INTERVALS: usize = 16;

/// Lower bound of the first roundup bucket.
pub const ROUNDUP_POWER2_START: usize = MB;

/// Upper bound of the last roundup bucket.
pub const ROUNDUP_POWER2_END: u64 = 64 * 1024 * MB as u64;

/// Upper bound for `pinned_num_register_threads`.
pub const PINNED_MAX_REGISTER_THREADS: usize = 128;

const _: () = assert!(
    (ROUNDUP_POWER2_END.ilog2() - ROUNDUP_POWER2_START.ilog2()) as usize == ROUNDUP_POWER2_INTERVALS,
    "roundup interval count mismatch"
);

/// Allocation strategy of the device allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Backend {
    /// The allocator manages its own block cache.
    #[default]
    Native,
    /// Allocation is delegated to the device's asynchronous allocation API.
    Async,
}

impl Backend {
    /// Canonical spelling used in settings strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::Async => "async",
        }
    }

    /// Resolve a backend value token, folding the legacy device-specific names.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "native" => Some(Backend::Native),
            "async" | "cudaMallocAsync" | "hipMallocAsync" => Some(Backend::Async),
            _ => None,
        }
    }

    pub fn is_async(self) -> bool {
        self == Backend::Async
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated allocator tuning parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub(crate) max_split_size: usize,
    pub(crate) max_non_split_rounding_size: usize,
    pub(crate) garbage_collection_threshold: f64,
    pub(crate) roundup_power2_divisions: [usize; ROUNDUP_POWER2_INTERVALS],
    pub(crate) use_async_allocator: bool,
    pub(crate) use_expandable_segments: bool,
    pub(crate) use_release_lock_on_device_malloc: bool,
    pub(crate) pinned_use_device_host_register: bool,
    pub(crate) pinned_num_register_threads: usize,
    pub(crate) pinned_use_background_threads: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_split_size: usize::MAX,
            max_non_split_rounding_size: usize::MAX,
            garbage_collection_threshold: 0.0,
            roundup_power2_divisions: [0; ROUNDUP_POWER2_INTERVALS],
            use_async_allocator: false,
            use_expandable_segments: false,
            use_release_lock_on_device_malloc: false,
            pinned_use_device_host_register: false,
            pinned_num_register_threads: 1,
            pinned_use_background_threads: false,
        }
    }
}

impl Settings {
    /// Defaults for a new parse pass. A committed backend survives the reset.
    pub(crate) fn reset_for(loaded: Option<Backend>) -> Self {
        let mut settings = Settings::default();
        if let Some(backend) = loaded {
            settings.use_async_allocator = backend.is_async();
        }
        settings
    }

    /// Largest block size (bytes) the allocator may split. `usize::MAX` means unbounded.
    pub fn max_split_size(&self) -> usize {
        self.max_split_size
    }

    /// Largest block size (bytes) that may be served without splitting/rounding.
    pub fn max_non_split_rounding_size(&self) -> usize {
        self.max_non_split_rounding_size
    }

    /// Fraction of reserved memory that triggers cached-block reclamation (0 = off).
    pub fn garbage_collection_threshold(&self) -> f64 {
        self.garbage_collection_threshold
    }

    pub fn roundup_power2_divisions(&self) -> &[usize; ROUNDUP_POWER2_INTERVALS] {
        &self.roundup_power2_divisions
    }

    /// Division count of the bucket that `size` (in bytes) falls into.
    ///
    /// Sizes below 1 MiB use the first bucket and sizes of 64 GiB or more use
    /// the last one.
    pub fn roundup_power2_divisions_for(&self, size: usize) -> usize {
        let log_size = if size == 0 { 0 } else { size.ilog2() as usize };
        self.roundup_power2_divisions[bucket_index(log_size)]
    }

    pub fn use_async_allocator(&self) -> bool {
        self.use_async_allocator
    }

    pub fn backend(&self) -> Backend {
        if self.use_async_allocator { Backend::Async } else { Backend::Native }
    }

    pub fn use_expandable_segments(&self) -> bool {
        self.use_expandable_segments
    }

    pub fn use_release_lock_on_device_malloc(&self) -> bool {
        self.use_release_lock_on_device_malloc
    }

    pub fn pinned_use_device_host_register(&self) -> bool {
        self.pinned_use_device_host_register
    }

    pub fn pinned_num_register_threads(&self) -> usize {
        self.pinned_num_register_threads
    }

    pub fn pinned_use_background_threads(&self) -> bool {
        self.pinned_use_background_threads
    }
}

/// Upper bound for `pinned_num_register_threads`.
pub fn pinned_max_register_threads() -> usize {
    PINNED_MAX_REGISTER_THREADS
}

/// Map `floor(log2(bytes))` onto a roundup bucket, clamping at both ends.
pub(crate) fn bucket_index(log_size: usize) -> usize {
    let start = ROUNDUP_POWER2_START.ilog2() as usize;
    log_size.saturating_sub(start).min(ROUNDUP_POWER2_INTERVALS - 1)
}
