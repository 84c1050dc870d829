//! Tracker configuration loaded from the process environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;

use infertrace_env::{
    DEVICE_ID, DISABLED, EnvVarError, EnvVarFormatError, EnvVarParseError, LOG_LEVEL, RESOURCE_LOG_PATH, TOKEN_LOG_PATH,
    TraceEnvVar, TypedEnvVar,
};

use crate::handoff::HandoffTable;

pub const DEFAULT_TOKEN_LOG_PATH: &str = "llama_inference_trace.log";
pub const DEFAULT_RESOURCE_LOG_PATH: &str = "llama_resource_trace.jsonl";
pub const DEFAULT_DEVICE_ID: &str = "gpu_0";

/// How much the trackers record. Levels are ordered: `Minimal < Detailed < Verbose`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum DetailLevel {
    Minimal = 0,
    #[default]
    Detailed = 1,
    Verbose = 2,
}

impl DetailLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DetailLevel::Minimal => "minimal",
            DetailLevel::Detailed => "detailed",
            DetailLevel::Verbose => "verbose",
        }
    }

    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => DetailLevel::Minimal,
            1 => DetailLevel::Detailed,
            _ => DetailLevel::Verbose,
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown detail level '{0}' (expected minimal, detailed or verbose)")]
pub struct ParseDetailLevelError(String);

impl FromStr for DetailLevel {
    type Err = ParseDetailLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(DetailLevel::Minimal),
            "detailed" => Ok(DetailLevel::Detailed),
            "verbose" => Ok(DetailLevel::Verbose),
            _ => Err(ParseDetailLevelError(s.to_owned())),
        }
    }
}

pub const DETAIL_LEVEL: TypedEnvVar<DetailLevel> =
    TypedEnvVar::new(TraceEnvVar::DetailLevel.into_env(), parse_detail_level, format_detail_level);

fn parse_detail_level(value: &str) -> Result<DetailLevel, EnvVarParseError> {
    value.parse().map_err(|err: ParseDetailLevelError| EnvVarParseError::new(err.to_string()))
}

fn format_detail_level(level: &DetailLevel) -> Result<String, EnvVarFormatError> {
    Ok(level.as_str().to_owned())
}

/// Errors that can occur while loading [`TraceConfig`].
#[derive(Debug, thiserror::Error)]
pub enum TraceConfigError {
    /// A provided log level could not be parsed.
    #[error("invalid log level '{value}'")]
    InvalidLogLevel { value: String },
    /// A provided detail level could not be parsed.
    #[error("invalid detail level '{value}'")]
    InvalidDetailLevel { value: String },
    /// A provided boolean flag could not be parsed.
    #[error("invalid boolean flag '{value}' for {name}")]
    InvalidBoolean { name: &'static str, value: String },
    /// A typed environment variable interaction failed unexpectedly.
    #[error("failed to access trace environment: {source}")]
    EnvVar {
        #[from]
        source: EnvVarError,
    },
}

/// Settings shared by both trackers. Fixed at construction; level and
/// enablement can still be changed on a live tracker.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Minimum level for diagnostic `tracing` output.
    pub log_level: Level,
    pub detail_level: DetailLevel,
    pub token_log_path: PathBuf,
    pub resource_log_path: PathBuf,
    /// Device label embedded in resource identifiers.
    pub device_id: String,
    /// Select the no-op trackers regardless of the other settings.
    pub disabled: bool,
    pub handoffs: HandoffTable,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            detail_level: DetailLevel::default(),
            token_log_path: PathBuf::from(DEFAULT_TOKEN_LOG_PATH),
            resource_log_path: PathBuf::from(DEFAULT_RESOURCE_LOG_PATH),
            device_id: DEFAULT_DEVICE_ID.to_owned(),
            disabled: false,
            handoffs: HandoffTable::default(),
        }
    }
}

impl TraceConfig {
    /// Load configuration from the process environment, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, TraceConfigError> {
        let defaults = Self::default();

        let log_level = match LOG_LEVEL.get() {
            Ok(value) => value.unwrap_or(defaults.log_level),
            Err(EnvVarError::Parse { value, .. }) => return Err(TraceConfigError::InvalidLogLevel { value }),
            Err(err) => return Err(err.into()),
        };

        let detail_level = match DETAIL_LEVEL.get() {
            Ok(value) => value.unwrap_or(defaults.detail_level),
            Err(EnvVarError::Parse { value, .. }) => return Err(TraceConfigError::InvalidDetailLevel { value }),
            Err(err) => return Err(err.into()),
        };

        let disabled = match DISABLED.get() {
            Ok(value) => value.unwrap_or(defaults.disabled),
            Err(EnvVarError::Parse { value, .. }) => {
                return Err(TraceConfigError::InvalidBoolean {
                    name: DISABLED.key(),
                    value,
                });
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            log_level,
            detail_level,
            token_log_path: TOKEN_LOG_PATH.get()?.unwrap_or(defaults.token_log_path),
            resource_log_path: RESOURCE_LOG_PATH.get()?.unwrap_or(defaults.resource_log_path),
            // Malformed labels fall back to the default with a warning.
            device_id: DEVICE_ID.get_or_warn().unwrap_or(defaults.device_id),
            disabled,
            handoffs: defaults.handoffs,
        })
    }
}
