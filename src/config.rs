//! Configuration management for addonscan
//!
//! Settings are loaded from environment variables with defaults. Command-line
//! flags take precedence over anything configured here.
//!
//! # Environment Variables
//!
//! - `ADDONSCAN_DEPTH`: Directory levels module discovery may cross - default: "0"
//! - `ADDONSCAN_ADDONS_DEPTH`: Depth budget when looking for addon roots - default: "1"
//! - `ADDONSCAN_L10N_PATTERN`: Regex matching localization module names - default: "^l10n_"
//! - `ADDONSCAN_ON_MALFORMED`: Malformed descriptor policy (fail|skip) - default: "fail"
//! - `ADDONSCAN_ON_DUPLICATE`: Duplicate module name policy (last-wins|error) - default: "last-wins"
//! - `ADDONSCAN_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use addonscan::ScanConfig;
//!
//! let config = ScanConfig::from_env().expect("Invalid environment");
//! config.validate().expect("Invalid configuration");
//! let options = config.discovery_options();
//! ```

use crate::discovery::{DiscoveryOptions, DuplicatePolicy, MalformedPolicy};
use crate::selection::LocalizationMatcher;
use regex::Regex;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_DEPTH: usize = 0;
const DEFAULT_ADDONS_DEPTH: i64 = 1;
const DEFAULT_L10N_PATTERN: &str = "^l10n_";
const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_DEPTH: &str = "ADDONSCAN_DEPTH";
const ENV_ADDONS_DEPTH: &str = "ADDONSCAN_ADDONS_DEPTH";
const ENV_L10N_PATTERN: &str = "ADDONSCAN_L10N_PATTERN";
const ENV_ON_MALFORMED: &str = "ADDONSCAN_ON_MALFORMED";
const ENV_ON_DUPLICATE: &str = "ADDONSCAN_ON_DUPLICATE";
const ENV_LOG_LEVEL: &str = "ADDONSCAN_LOG_LEVEL";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Non-module directory levels crossed by module discovery
    pub depth: usize,

    /// Depth budget for addon root search; negative disables recursion
    pub addons_depth: i64,

    /// Regex naming localization modules
    pub l10n_pattern: String,

    pub on_malformed: MalformedPolicy,

    pub on_duplicate: DuplicatePolicy,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ScanConfig {
    /// Loads from environment variables; unparsable values fall back to defaults.
    fn default() -> Self {
        let defaults = Self::builtin();
        Self {
            depth: parse_env(ENV_DEPTH).ok().flatten().unwrap_or(defaults.depth),
            addons_depth: parse_env(ENV_ADDONS_DEPTH)
                .ok()
                .flatten()
                .unwrap_or(defaults.addons_depth),
            l10n_pattern: env::var(ENV_L10N_PATTERN).unwrap_or(defaults.l10n_pattern),
            on_malformed: parse_env(ENV_ON_MALFORMED)
                .ok()
                .flatten()
                .unwrap_or(defaults.on_malformed),
            on_duplicate: parse_env(ENV_ON_DUPLICATE)
                .ok()
                .flatten()
                .unwrap_or(defaults.on_duplicate),
            log_level: env::var(ENV_LOG_LEVEL)
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.log_level),
        }
    }
}

impl ScanConfig {
    /// Built-in defaults, ignoring the environment.
    pub fn builtin() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            addons_depth: DEFAULT_ADDONS_DEPTH,
            l10n_pattern: DEFAULT_L10N_PATTERN.to_string(),
            on_malformed: MalformedPolicy::default(),
            on_duplicate: DuplicatePolicy::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    /// Loads from environment variables, failing on values that do not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::builtin();
        Ok(Self {
            depth: parse_env(ENV_DEPTH)?.unwrap_or(defaults.depth),
            addons_depth: parse_env(ENV_ADDONS_DEPTH)?.unwrap_or(defaults.addons_depth),
            l10n_pattern: env::var(ENV_L10N_PATTERN).unwrap_or(defaults.l10n_pattern),
            on_malformed: parse_env(ENV_ON_MALFORMED)?.unwrap_or(defaults.on_malformed),
            on_duplicate: parse_env(ENV_ON_DUPLICATE)?.unwrap_or(defaults.on_duplicate),
            log_level: env::var(ENV_LOG_LEVEL)
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.log_level),
        })
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the localization pattern does not compile or
    /// the log level is unknown
    pub fn validate(&self) -> Result<(), ConfigError> {
        Regex::new(&self.l10n_pattern).map_err(|e| {
            ConfigError::ValidationFailed(format!(
                "Invalid localization pattern {:?}: {}",
                self.l10n_pattern, e
            ))
        })?;

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            on_malformed: self.on_malformed,
            on_duplicate: self.on_duplicate,
            ..Default::default()
        }
    }

    pub fn localization_matcher(&self) -> Result<LocalizationMatcher, ConfigError> {
        let pattern = Regex::new(&self.l10n_pattern).map_err(|e| ConfigError::ParseError {
            field: ENV_L10N_PATTERN.to_string(),
            error: e.to_string(),
        })?;
        Ok(LocalizationMatcher::regex(pattern))
    }
}

impl fmt::Display for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "addonscan Configuration:")?;
        writeln!(f, "  Depth: {}", self.depth)?;
        writeln!(f, "  Addons Depth: {}", self.addons_depth)?;
        writeln!(f, "  Localization Pattern: {}", self.l10n_pattern)?;
        writeln!(f, "  On Malformed: {}", self.on_malformed)?;
        writeln!(f, "  On Duplicate: {}", self.on_duplicate)?;
        write!(f, "  Log Level: {}", self.log_level)
    }
}

fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::ParseError {
                field: key.to_string(),
                error: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
