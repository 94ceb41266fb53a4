//! Top-level Posture configuration with 4-layer resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{CostMode, GraphConfig, GuardrailConfig, RuntimeConfig, SignalConfig};
use crate::errors::ConfigError;

/// Name of the project-level config file.
pub const PROJECT_CONFIG_FILE: &str = "posture.toml";

/// Every environment variable the loader reads.
pub const ENV_VARS: &[&str] = &[
    "POSTURE_SIGNALS_FRESHNESS_SECONDS",
    "POSTURE_SIGNALS_MAX_ENTRIES",
    "POSTURE_SIGNALS_SCHEMA_VERSION",
    "POSTURE_RUNTIME_PREFLIGHT",
    "POSTURE_RUNTIME_PARALLEL",
    "POSTURE_GRAPH_STRICT_CYCLES",
    "POSTURE_GUARDRAILS_COST_MODE",
];

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`POSTURE_*`)
/// 3. Project config (`posture.toml` in project root)
/// 4. User config (`~/.posture/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PostureConfig {
    pub signals: SignalConfig,
    pub runtime: RuntimeConfig,
    pub graph: GraphConfig,
    pub guardrails: GuardrailConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub freshness_seconds: Option<u64>,
    pub parallel: Option<bool>,
    pub preflight: Option<bool>,
    pub strict_cycles: Option<bool>,
    pub cost_mode: Option<String>,
}

impl PostureConfig {
    /// Load configuration with 4-layer resolution rooted at `root`.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Layer 4 (lowest priority): user config
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(e @ ConfigError::ParseError { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(
                            path = %user_config_path.display(),
                            error = %e,
                            "ignoring unreadable user config"
                        );
                    }
                }
            }
        }

        // Layer 3: project config
        let project_config_path = root.join(PROJECT_CONFIG_FILE);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        // Layer 2: environment variables
        Self::apply_env_overrides(&mut config);

        // Layer 1 (highest priority): CLI flags
        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;
        tracing::debug!(
            freshness_secs = config.signals.effective_freshness().as_secs(),
            parallel = config.runtime.effective_parallel(),
            strict_cycles = config.graph.effective_strict_cycles(),
            "posture config resolved"
        );
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Validate the configuration values.
    pub fn validate(config: &PostureConfig) -> Result<(), ConfigError> {
        if config.signals.freshness_seconds == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "signals.freshness_seconds".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.signals.max_entries == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "signals.max_entries".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if let Some(ref version) = config.signals.schema_version {
            if version.trim().is_empty() {
                return Err(ConfigError::ValidationFailed {
                    field: "signals.schema_version".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }
        if let Some(ref mode) = config.guardrails.cost_mode {
            if let Err(message) = mode.parse::<CostMode>() {
                return Err(ConfigError::ValidationFailed {
                    field: "guardrails.cost_mode".to_string(),
                    message,
                });
            }
        }
        Ok(())
    }

    /// Returns the user config path: `~/.posture/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        dirs_path().map(|d| d.join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored.
    fn merge_toml_file(config: &mut PostureConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: PostureConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `Some` values in `other` win.
    pub fn merge(base: &mut PostureConfig, other: &PostureConfig) {
        // Signals
        if other.signals.freshness_seconds.is_some() {
            base.signals.freshness_seconds = other.signals.freshness_seconds;
        }
        if other.signals.max_entries.is_some() {
            base.signals.max_entries = other.signals.max_entries;
        }
        if other.signals.schema_version.is_some() {
            base.signals.schema_version = other.signals.schema_version.clone();
        }

        // Runtime
        if other.runtime.preflight.is_some() {
            base.runtime.preflight = other.runtime.preflight;
        }
        if other.runtime.parallel.is_some() {
            base.runtime.parallel = other.runtime.parallel;
        }
        if other.runtime.collect_questions.is_some() {
            base.runtime.collect_questions = other.runtime.collect_questions;
        }

        // Graph
        if other.graph.strict_cycles.is_some() {
            base.graph.strict_cycles = other.graph.strict_cycles;
        }

        // Guardrails
        if other.guardrails.cost_mode.is_some() {
            base.guardrails.cost_mode = other.guardrails.cost_mode.clone();
        }
        if other.guardrails.enforce_checklist_format.is_some() {
            base.guardrails.enforce_checklist_format = other.guardrails.enforce_checklist_format;
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `POSTURE_<SECTION>_<FIELD>`. Unparseable values are ignored.
    fn apply_env_overrides(config: &mut PostureConfig) {
        if let Some(v) = env_parse::<u64>("POSTURE_SIGNALS_FRESHNESS_SECONDS") {
            config.signals.freshness_seconds = Some(v);
        }
        if let Some(v) = env_parse::<u64>("POSTURE_SIGNALS_MAX_ENTRIES") {
            config.signals.max_entries = Some(v);
        }
        if let Ok(val) = std::env::var("POSTURE_SIGNALS_SCHEMA_VERSION") {
            config.signals.schema_version = Some(val);
        }
        if let Some(v) = env_parse::<bool>("POSTURE_RUNTIME_PREFLIGHT") {
            config.runtime.preflight = Some(v);
        }
        if let Some(v) = env_parse::<bool>("POSTURE_RUNTIME_PARALLEL") {
            config.runtime.parallel = Some(v);
        }
        if let Some(v) = env_parse::<bool>("POSTURE_GRAPH_STRICT_CYCLES") {
            config.graph.strict_cycles = Some(v);
        }
        if let Ok(val) = std::env::var("POSTURE_GUARDRAILS_COST_MODE") {
            config.guardrails.cost_mode = Some(val);
        }
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut PostureConfig, cli: &CliOverrides) {
        if let Some(v) = cli.freshness_seconds {
            config.signals.freshness_seconds = Some(v);
        }
        if let Some(v) = cli.parallel {
            config.runtime.parallel = Some(v);
        }
        if let Some(v) = cli.preflight {
            config.runtime.preflight = Some(v);
        }
        if let Some(v) = cli.strict_cycles {
            config.graph.strict_cycles = Some(v);
        }
        if let Some(ref v) = cli.cost_mode {
            config.guardrails.cost_mode = Some(v.clone());
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Returns the user-level config directory: `~/.posture/`.
fn dirs_path() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".posture"))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
