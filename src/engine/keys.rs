//! Option keys and their legacy spellings.
//!
//! Every recognized option maps onto exactly one `OptionKey`. Deprecated,
//! device-specific spellings are folded onto their canonical key here, before
//! dispatch, so each option has a single handler.

/// Canonical option keys, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum OptionKey {
    MaxSplitSize,
    MaxNonSplitRounding,
    GarbageCollectionThreshold,
    RoundupPower2Divisions,
    Backend,
    ExpandableSegments,
    ReleaseLockOnDeviceMalloc,
    PinnedUseDeviceHostRegister,
    PinnedNumRegisterThreads,
    PinnedUseBackgroundThreads,
}

bitflags::bitflags! {
    /// Options seen during one parse pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct OptionSet: u16 {
        const MAX_SPLIT_SIZE                  = 1 << 0;
        const MAX_NON_SPLIT_ROUNDING          = 1 << 1;
        const GARBAGE_COLLECTION_THRESHOLD    = 1 << 2;
        const ROUNDUP_POWER2_DIVISIONS        = 1 << 3;
        const BACKEND                         = 1 << 4;
        const EXPANDABLE_SEGMENTS             = 1 << 5;
        const RELEASE_LOCK_ON_DEVICE_MALLOC   = 1 << 6;
        const PINNED_USE_DEVICE_HOST_REGISTER = 1 << 7;
        const PINNED_NUM_REGISTER_THREADS     = 1 << 8;
        const PINNED_USE_BACKGROUND_THREADS   = 1 << 9;
    }
}

/// Deprecated key spellings and the option they stand for.
const ALIASES: &[(&str, OptionKey)] = &[
    ("release_lock_on_cudamalloc", OptionKey::ReleaseLockOnDeviceMalloc),
    ("release_lock_on_hipmalloc", OptionKey::ReleaseLockOnDeviceMalloc),
    ("pinned_use_cuda_host_register", OptionKey::PinnedUseDeviceHostRegister),
    ("pinned_use_hip_host_register", OptionKey::PinnedUseDeviceHostRegister),
];

impl OptionKey {
    pub(crate) const ALL: [OptionKey; 10] = [
        OptionKey::MaxSplitSize,
        OptionKey::MaxNonSplitRounding,
        OptionKey::GarbageCollectionThreshold,
        OptionKey::RoundupPower2Divisions,
        OptionKey::Backend,
        OptionKey::ExpandableSegments,
        OptionKey::ReleaseLockOnDeviceMalloc,
        OptionKey::PinnedUseDeviceHostRegister,
        OptionKey::PinnedNumRegisterThreads,
        OptionKey::PinnedUseBackgroundThreads,
    ];

    /// Key text as written in a settings string.
    pub(crate) fn name(self) -> &'static str {
        match self {
            OptionKey::MaxSplitSize => "max_split_size_mb",
            OptionKey::MaxNonSplitRounding => "max_non_split_rounding_mb",
            OptionKey::GarbageCollectionThreshold => "garbage_collection_threshold",
            OptionKey::RoundupPower2Divisions => "roundup_power2_divisions",
            OptionKey::Backend => "backend",
            OptionKey::ExpandableSegments => "expandable_segments",
            OptionKey::ReleaseLockOnDeviceMalloc => "release_lock_on_device_malloc",
            OptionKey::PinnedUseDeviceHostRegister => "pinned_use_device_host_register",
            OptionKey::PinnedNumRegisterThreads => "pinned_num_register_threads",
            OptionKey::PinnedUseBackgroundThreads => "pinned_use_background_threads",
        }
    }

    pub(crate) fn flag(self) -> OptionSet {
        match self {
            OptionKey::MaxSplitSize => OptionSet::MAX_SPLIT_SIZE,
            OptionKey::MaxNonSplitRounding => OptionSet::MAX_NON_SPLIT_ROUNDING,
            OptionKey::GarbageCollectionThreshold => OptionSet::GARBAGE_COLLECTION_THRESHOLD,
            OptionKey::RoundupPower2Divisions => OptionSet::ROUNDUP_POWER2_DIVISIONS,
            OptionKey::Backend => OptionSet::BACKEND,
            OptionKey::ExpandableSegments => OptionSet::EXPANDABLE_SEGMENTS,
            OptionKey::ReleaseLockOnDeviceMalloc => OptionSet::RELEASE_LOCK_ON_DEVICE_MALLOC,
            OptionKey::PinnedUseDeviceHostRegister => OptionSet::PINNED_USE_DEVICE_HOST_REGISTER,
            OptionKey::PinnedNumRegisterThreads => OptionSet::PINNED_NUM_REGISTER_THREADS,
            OptionKey::PinnedUseBackgroundThreads => OptionSet::PINNED_USE_BACKGROUND_THREADS,
        }
    }

    /// Options the async backend has no use for (everything but `backend`).
    pub(crate) fn is_native_only(self) -> bool {
        self != OptionKey::Backend
    }

    /// Resolve a key token. The flag is `true` when a deprecated alias matched.
    ///
    /// Matching is exact and case-sensitive.
    pub(crate) fn resolve(token: &str) -> Option<(OptionKey, bool)> {
        if let Some(key) = Self::ALL.iter().copied().find(|key| key.name() == token) {
            return Some((key, false));
        }
        ALIASES.iter().find(|(alias, _)| *alias == token).map(|&(_, key)| (key, true))
    }
}

impl OptionSet {
    /// Canonical names of the options in this set, in dispatch order.
    pub(crate) fn names(self) -> Vec<&'static str> {
        OptionKey::ALL.iter().filter(|key| self.contains(key.flag())).map(|key| key.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_resolve_to_themselves() {
        for key in OptionKey::ALL {
            assert_eq!(OptionKey::resolve(key.name()), Some((key, false)));
        }
    }

    #[test]
    fn aliases_fold_onto_canonical_keys() {
        assert_eq!(OptionKey::resolve("release_lock_on_cudamalloc"), Some((OptionKey::ReleaseLockOnDeviceMalloc, true)));
        assert_eq!(OptionKey::resolve("pinned_use_hip_host_register"), Some((OptionKey::PinnedUseDeviceHostRegister, true)));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(OptionKey::resolve("Backend"), None);
        assert_eq!(OptionKey::resolve("max_split_size"), None);
    }

    #[test]
    fn flags_are_distinct() {
        let all = OptionKey::ALL.iter().fold(OptionSet::empty(), |acc, key| {
            assert!(!acc.contains(key.flag()));
            acc | key.flag()
        });
        assert_eq!(all, OptionSet::all());
    }

    #[test]
    fn names_follow_dispatch_order() {
        let set = OptionSet::PINNED_NUM_REGISTER_THREADS | OptionSet::MAX_SPLIT_SIZE;
        assert_eq!(set.names(), vec!["max_split_size_mb", "pinned_num_register_threads"]);
    }
}
