//! Tests for the Posture configuration system.

use std::sync::Mutex;
use std::time::Duration;

use posture_core::config::posture_config::ENV_VARS;
use posture_core::config::{CliOverrides, CostMode, PostureConfig};
use posture_core::errors::{ConfigError, PostureErrorCode};

/// Serializes tests that touch process environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn tempdir() -> tempfile::TempDir {
    tempfile::TempDir::new().unwrap()
}

fn clear_posture_env_vars() {
    for key in ENV_VARS {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_match_documented_values() {
    let config = PostureConfig::default();
    assert_eq!(config.signals.effective_freshness(), Duration::from_secs(900));
    assert_eq!(config.signals.effective_max_entries(), 10_000);
    assert_eq!(config.signals.effective_schema_version(), "v1");
    assert!(!config.runtime.effective_parallel());
    assert!(!config.runtime.effective_preflight());
    assert!(config.runtime.effective_collect_questions());
    assert!(!config.graph.effective_strict_cycles());
    assert_eq!(config.guardrails.effective_cost_mode(), CostMode::CategoryOnly);
    assert!(config.guardrails.effective_enforce_checklist_format());
}

#[test]
fn cli_beats_env_beats_project_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_posture_env_vars();

    let dir = tempdir();
    std::fs::write(
        dir.path().join("posture.toml"),
        r#"
[signals]
freshness_seconds = 300
schema_version = "v2"

[graph]
strict_cycles = true
"#,
    )
    .unwrap();

    std::env::set_var("POSTURE_SIGNALS_FRESHNESS_SECONDS", "600");
    std::env::set_var("POSTURE_RUNTIME_PARALLEL", "true");

    let cli = CliOverrides {
        freshness_seconds: Some(60),
        ..Default::default()
    };
    let config = PostureConfig::load(dir.path(), Some(&cli)).unwrap();
    clear_posture_env_vars();

    assert_eq!(config.signals.freshness_seconds, Some(60));
    assert_eq!(config.signals.effective_schema_version(), "v2");
    assert!(config.graph.effective_strict_cycles());
    assert!(config.runtime.effective_parallel());
    // parallel implies preflight
    assert!(config.runtime.effective_preflight());
}

#[test]
fn missing_project_file_yields_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_posture_env_vars();

    let dir = tempdir();
    let config = PostureConfig::load(dir.path(), None).unwrap();
    assert_eq!(config.signals.effective_freshness(), Duration::from_secs(900));
}

#[test]
fn invalid_toml_reports_path() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_posture_env_vars();

    let dir = tempdir();
    std::fs::write(dir.path().join("posture.toml"), "[signals\nfreshness = ").unwrap();
    let err = PostureConfig::load(dir.path(), None).unwrap_err();
    match err {
        ConfigError::ParseError { path, .. } => assert!(path.ends_with("posture.toml")),
        other => panic!("expected ParseError, got {other:?}"),
    }
}

#[test]
fn zero_freshness_is_rejected() {
    let config = PostureConfig::from_toml("[signals]\nfreshness_seconds = 0\n").unwrap();
    let err = PostureConfig::validate(&config).unwrap_err();
    assert_eq!(err.error_code(), "CONFIG_ERROR");
    match err {
        ConfigError::ValidationFailed { field, .. } => {
            assert_eq!(field, "signals.freshness_seconds")
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn unknown_cost_mode_is_rejected() {
    let config = PostureConfig::from_toml("[guardrails]\ncost_mode = \"estimated\"\n").unwrap();
    assert!(matches!(
        PostureConfig::validate(&config),
        Err(ConfigError::ValidationFailed { ref field, .. }) if field == "guardrails.cost_mode"
    ));
}

#[test]
fn tool_backed_cost_mode_parses() {
    let config = PostureConfig::from_toml("[guardrails]\ncost_mode = \"tool_backed\"\n").unwrap();
    PostureConfig::validate(&config).unwrap();
    assert_eq!(config.guardrails.effective_cost_mode(), CostMode::ToolBacked);
}

#[test]
fn unparseable_env_values_are_ignored() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_posture_env_vars();

    std::env::set_var("POSTURE_SIGNALS_MAX_ENTRIES", "lots");
    let dir = tempdir();
    let config = PostureConfig::load(dir.path(), None).unwrap();
    clear_posture_env_vars();
    assert_eq!(config.signals.max_entries, None);
}

#[test]
fn toml_roundtrip_preserves_overrides() {
    let mut config = PostureConfig::default();
    config.signals.freshness_seconds = Some(120);
    config.guardrails.cost_mode = Some("tool_backed".to_string());

    let text = config.to_toml().unwrap();
    let back = PostureConfig::from_toml(&text).unwrap();
    assert_eq!(back.signals.freshness_seconds, Some(120));
    assert_eq!(back.guardrails.effective_cost_mode(), CostMode::ToolBacked);
}

#[test]
fn merge_only_overrides_set_fields() {
    let mut base = PostureConfig::from_toml("[signals]\nfreshness_seconds = 100\nmax_entries = 5\n").unwrap();
    let other = PostureConfig::from_toml("[signals]\nmax_entries = 50\n").unwrap();
    PostureConfig::merge(&mut base, &other);
    assert_eq!(base.signals.freshness_seconds, Some(100));
    assert_eq!(base.signals.max_entries, Some(50));
}
