// crates/flag-gate-config/src/config.rs
// ============================================================================
// Module: Flag Gate Configuration
// Description: Configuration loading and validation for the flag engine.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: flag-gate-core, flag-logic, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and falls back to the engine defaults; values
//! that are present must be within range or the whole load fails.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use flag_gate_core::DEFAULT_MAX_FLAGS;
use flag_gate_core::DEFAULT_MAX_QUERY_BYTES;
use flag_gate_core::DEFAULT_MAX_QUERY_DEPTH;
use flag_gate_core::DEFAULT_MAX_RULES;
use flag_gate_core::DEFAULT_MAX_SCHEDULED_STEPS;
use flag_gate_core::DEFAULT_MAX_VARIATIONS;
use flag_gate_core::HARD_MAX_QUERY_BYTES;
use flag_gate_core::HARD_MAX_QUERY_DEPTH;
use flag_gate_core::InMemoryFlagCatalog;
use flag_gate_core::QueryLimits;
use flag_gate_core::ValidationLimits;
use flag_logic::LogicMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "flag-gate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "FLAG_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Hard ceiling for `flags.max_variations`.
pub const MAX_VARIATIONS_LIMIT: usize = 4096;
/// Hard ceiling for `flags.max_rules`.
pub const MAX_RULES_LIMIT: usize = 4096;
/// Hard ceiling for `flags.max_scheduled_steps`.
pub const MAX_SCHEDULED_STEPS_LIMIT: usize = 1024;
/// Hard ceiling for `catalog.max_flags`.
pub const MAX_FLAGS_LIMIT: usize = 1_000_000;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Flag engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FlagGateConfig {
    /// Targeting query configuration.
    #[serde(default)]
    pub query: QueryConfig,
    /// Flag definition limits.
    #[serde(default)]
    pub flags: FlagsConfig,
    /// Catalog limits.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl FlagGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then `FLAG_GATE_CONFIG`, then
    /// `flag-gate.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.query.validate()?;
        self.flags.validate()?;
        self.catalog.validate()?;
        Ok(())
    }

    /// Converts the configured bounds into engine validation limits.
    #[must_use]
    pub const fn evaluation_limits(&self) -> ValidationLimits {
        ValidationLimits {
            query: QueryLimits {
                max_bytes: self.query.max_query_bytes,
                max_depth: self.query.max_depth,
            },
            max_variations: self.flags.max_variations,
            max_rules: self.flags.max_rules,
            max_scheduled_steps: self.flags.max_scheduled_steps,
            max_flags: self.catalog.max_flags,
            require_full_percentage: self.flags.require_full_percentage,
        }
    }

    /// Returns the tri-state logic table used for targeting queries.
    #[must_use]
    pub const fn logic_mode(&self) -> LogicMode {
        self.query.logic
    }

    /// Builds an empty catalog that enforces the configured limits.
    #[must_use]
    pub fn build_catalog(&self) -> InMemoryFlagCatalog {
        InMemoryFlagCatalog::with_limits(self.evaluation_limits())
    }
}

// ============================================================================
// SECTION: Query Config
// ============================================================================

/// Targeting query configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QueryConfig {
    /// Maximum query source size in bytes.
    #[serde(default = "default_max_query_bytes")]
    pub max_query_bytes: usize,
    /// Maximum nesting depth of a compiled query.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Logic table used to fold unknown comparisons.
    #[serde(default)]
    pub logic: LogicMode,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_query_bytes: default_max_query_bytes(),
            max_depth: default_max_depth(),
            logic: LogicMode::default(),
        }
    }
}

impl QueryConfig {
    /// Validates query configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_limit("query.max_query_bytes", self.max_query_bytes, HARD_MAX_QUERY_BYTES)?;
        validate_limit("query.max_depth", self.max_depth, HARD_MAX_QUERY_DEPTH)
    }
}

// ============================================================================
// SECTION: Flags Config
// ============================================================================

/// Flag definition limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FlagsConfig {
    /// Maximum variations per flag.
    #[serde(default = "default_max_variations")]
    pub max_variations: usize,
    /// Maximum targeting rules per flag.
    #[serde(default = "default_max_rules")]
    pub max_rules: usize,
    /// Maximum scheduled steps per flag.
    #[serde(default = "default_max_scheduled_steps")]
    pub max_scheduled_steps: usize,
    /// Require every percentage split to total exactly 100.
    #[serde(default)]
    pub require_full_percentage: bool,
}

impl Default for FlagsConfig {
    fn default() -> Self {
        Self {
            max_variations: default_max_variations(),
            max_rules: default_max_rules(),
            max_scheduled_steps: default_max_scheduled_steps(),
            require_full_percentage: false,
        }
    }
}

impl FlagsConfig {
    /// Validates flag limits.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_limit("flags.max_variations", self.max_variations, MAX_VARIATIONS_LIMIT)?;
        validate_limit("flags.max_rules", self.max_rules, MAX_RULES_LIMIT)?;
        validate_limit(
            "flags.max_scheduled_steps",
            self.max_scheduled_steps,
            MAX_SCHEDULED_STEPS_LIMIT,
        )
    }
}

// ============================================================================
// SECTION: Catalog Config
// ============================================================================

/// Catalog limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    /// Maximum flags held by one catalog.
    #[serde(default = "default_max_flags")]
    pub max_flags: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_flags: default_max_flags(),
        }
    }
}

impl CatalogConfig {
    /// Validates catalog limits.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_limit("catalog.max_flags", self.max_flags, MAX_FLAGS_LIMIT)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default query size bound.
const fn default_max_query_bytes() -> usize {
    DEFAULT_MAX_QUERY_BYTES
}

/// Default query depth bound.
const fn default_max_depth() -> usize {
    DEFAULT_MAX_QUERY_DEPTH
}

/// Default variations per flag.
const fn default_max_variations() -> usize {
    DEFAULT_MAX_VARIATIONS
}

/// Default targeting rules per flag.
const fn default_max_rules() -> usize {
    DEFAULT_MAX_RULES
}

/// Default scheduled steps per flag.
const fn default_max_scheduled_steps() -> usize {
    DEFAULT_MAX_SCHEDULED_STEPS
}

/// Default flags per catalog.
const fn default_max_flags() -> usize {
    DEFAULT_MAX_FLAGS
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a numeric limit is non-zero and within its hard ceiling.
fn validate_limit(field: &str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
    }
    if value > max {
        return Err(ConfigError::Invalid(format!("{field} must be at most {max}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
