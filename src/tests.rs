use crate::{AllocatorConfig, Backend, ConfigError, MB, Settings};

fn parsed(input: &str) -> Result<Settings, ConfigError> {
    let config = AllocatorConfig::new();
    config.parse(input)?;
    Ok(config.snapshot())
}

#[test]
fn garbage_collection_threshold_cases() {
    // Array of (input value, expected threshold or None for failure)
    let cases: Vec<(&str, Option<f64>)> = vec![
        ("0.5", Some(0.5)),
        ("0.01", Some(0.01)),
        ("0.999", Some(0.999)),
        (".75", Some(0.75)),
        ("5e-1", Some(0.5)),
        ("0", None),
        ("0.0", None),
        ("1", None),
        ("1.0", None),
        ("1.5", None),
        ("42", None),
    ];

    for (value, expected) in cases {
        let result = parsed(&format!("garbage_collection_threshold:{value}"));
        match expected {
            Some(threshold) => assert_eq!(result.unwrap().garbage_collection_threshold(), threshold, "{value}"),
            None => assert!(result.is_err(), "{value} should be rejected"),
        }
    }
}

#[test]
fn split_size_is_stored_in_bytes() {
    for mb in [20usize, 21, 64, 512, 4096, 1 << 20] {
        let settings = parsed(&format!("max_split_size_mb:{mb}")).unwrap();
        assert_eq!(settings.max_split_size(), mb * MB, "{mb}");
        let settings = parsed(&format!("max_non_split_rounding_mb:{mb}")).unwrap();
        assert_eq!(settings.max_non_split_rounding_size(), mb * MB, "{mb}");
    }
    for option in ["max_split_size_mb", "max_non_split_rounding_mb"] {
        for mb in [0usize, 1, 19] {
            assert_eq!(
                parsed(&format!("{option}:{mb}")),
                Err(ConfigError::BelowMinimum { option, value: mb, min_mb: 20 }),
                "{option}:{mb}"
            );
        }
    }
}

#[test]
fn independent_backend_parses_without_loaded_flag() {
    let config = AllocatorConfig::new();
    config.parse("backend:native").unwrap();
    assert!(!config.use_async_allocator());
    config.parse("backend:async").unwrap();
    assert!(config.use_async_allocator());
}

#[test]
fn loaded_async_rejects_native() {
    let config = AllocatorConfig::new();
    config.set_allocator_loaded(Backend::Async);
    assert!(matches!(config.parse("backend:native"), Err(ConfigError::BackendMismatch { .. })));
    config.parse("backend:async").unwrap();
    assert!(config.use_async_allocator());
}

#[test]
fn loaded_native_rejects_async_aliases() {
    let config = AllocatorConfig::new();
    config.set_allocator_loaded(Backend::Native);
    for alias in ["async", "cudaMallocAsync", "hipMallocAsync"] {
        let err = config.parse(&format!("backend:{alias}")).unwrap_err();
        assert_eq!(err, ConfigError::BackendMismatch { runtime: Backend::Async, loaded: Backend::Native });
    }
    config.parse("backend:native").unwrap();
}

#[test]
fn roundup_divisions_examples() {
    let settings = parsed("roundup_power2_divisions:128").unwrap();
    assert_eq!(settings.roundup_power2_divisions(), &[128; 16]);

    let settings = parsed("roundup_power2_divisions:[256:8,512:16,>:32]").unwrap();
    let table = settings.roundup_power2_divisions();
    assert_eq!(settings.roundup_power2_divisions_for(256 * MB), 8);
    assert_eq!(settings.roundup_power2_divisions_for(512 * MB), 16);
    assert!(table[..8].iter().all(|&d| d == 8));
    assert!(table[10..].iter().all(|&d| d == 32));
}

#[test]
fn register_thread_limits() {
    assert!(matches!(parsed("pinned_num_register_threads:7"), Err(ConfigError::NotPowerOfTwo { value: 7, .. })));
    assert!(matches!(
        parsed("pinned_num_register_threads:256"),
        Err(ConfigError::TooManyRegisterThreads { value: 256, max: 128 })
    ));
    assert_eq!(parsed("pinned_num_register_threads:64").unwrap().pinned_num_register_threads(), 64);
}

#[test]
fn empty_string_gives_defaults() {
    assert_eq!(parsed("").unwrap(), Settings::default());
    assert_eq!(parsed(" ").unwrap(), Settings::default());
}

#[test]
fn reparse_does_not_merge() {
    let config = AllocatorConfig::new();
    config
        .parse(
            "max_split_size_mb:64,max_non_split_rounding_mb:32,garbage_collection_threshold:0.7,\
             roundup_power2_divisions:4,backend:async,expandable_segments:True,release_lock_on_device_malloc:True,\
             pinned_use_device_host_register:True,pinned_num_register_threads:4,pinned_use_background_threads:True",
        )
        .unwrap();
    assert_ne!(config.snapshot(), Settings::default());

    config.parse("pinned_num_register_threads:2").unwrap();
    let mut expected = Settings::default();
    expected.pinned_num_register_threads = 2;
    assert_eq!(config.snapshot(), expected);
}

#[test]
fn unrecognized_key_fails_in_any_position() {
    let valid = ["max_split_size_mb:64", "expandable_segments:True", "backend:native"];
    for pos in 0..=valid.len() {
        let mut parts: Vec<&str> = valid.to_vec();
        parts.insert(pos, "not_an_option:1");
        let err = parsed(&parts.join(",")).unwrap_err();
        assert_eq!(err, ConfigError::UnrecognizedOption { key: "not_an_option".to_string() });
    }
}

#[test]
fn last_settings_string_tracks_failed_parses() {
    let config = AllocatorConfig::new();
    config.parse("expandable_segments:True").unwrap();
    assert!(config.parse("expandable_segments:yes").is_err());
    assert_eq!(config.last_allocator_settings(), "expandable_segments:yes");
}
