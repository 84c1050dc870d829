//! Identifiers and descriptors for the variables read by the trace collectors.

use std::path::PathBuf;

use tracing::Level;

use super::EnvVar;
use super::value::{EnvVarFormatError, EnvVarParseError, TypedEnvVar};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraceEnvVar {
    /// Minimum level for diagnostic `tracing` output.
    LogLevel,
    /// Trace detail level: minimal, detailed or verbose.
    DetailLevel,
    /// Destination of the token/step trace log.
    TokenLogPath,
    /// Destination of the resource trace log.
    ResourceLogPath,
    /// Device label embedded in resource identifiers.
    DeviceId,
    /// Forces both trackers into their no-op form.
    Disabled,
}

impl TraceEnvVar {
    pub const ALL: [TraceEnvVar; 6] = [
        TraceEnvVar::LogLevel,
        TraceEnvVar::DetailLevel,
        TraceEnvVar::TokenLogPath,
        TraceEnvVar::ResourceLogPath,
        TraceEnvVar::DeviceId,
        TraceEnvVar::Disabled,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            TraceEnvVar::LogLevel => "INFERTRACE_LOG_LEVEL",
            TraceEnvVar::DetailLevel => "INFERTRACE_DETAIL_LEVEL",
            TraceEnvVar::TokenLogPath => "INFERTRACE_TOKEN_LOG_PATH",
            TraceEnvVar::ResourceLogPath => "INFERTRACE_RESOURCE_LOG_PATH",
            TraceEnvVar::DeviceId => "INFERTRACE_DEVICE_ID",
            TraceEnvVar::Disabled => "INFERTRACE_DISABLED",
        }
    }

    pub const fn into_env(self) -> EnvVar {
        EnvVar::Trace(self)
    }
}

pub const LOG_LEVEL: TypedEnvVar<Level> = TypedEnvVar::new(TraceEnvVar::LogLevel.into_env(), parse_log_level, format_display);

pub const TOKEN_LOG_PATH: TypedEnvVar<PathBuf> = TypedEnvVar::new(TraceEnvVar::TokenLogPath.into_env(), parse_path, format_path);

pub const RESOURCE_LOG_PATH: TypedEnvVar<PathBuf> =
    TypedEnvVar::new(TraceEnvVar::ResourceLogPath.into_env(), parse_path, format_path);

pub const DEVICE_ID: TypedEnvVar<String> = TypedEnvVar::new(TraceEnvVar::DeviceId.into_env(), parse_device_id, format_display);

pub const DISABLED: TypedEnvVar<bool> = TypedEnvVar::new(TraceEnvVar::Disabled.into_env(), parse_bool, format_display);

fn parse_log_level(value: &str) -> Result<Level, EnvVarParseError> {
    value.parse::<Level>().map_err(|_| EnvVarParseError::new("invalid tracing level"))
}

fn parse_path(value: &str) -> Result<PathBuf, EnvVarParseError> {
    if value.trim().is_empty() {
        return Err(EnvVarParseError::new("path is empty"));
    }
    Ok(PathBuf::from(value))
}

fn format_path(path: &PathBuf) -> Result<String, EnvVarFormatError> {
    path.to_str()
        .map(str::to_owned)
        .ok_or_else(|| EnvVarFormatError::new("path is not valid UTF-8"))
}

fn parse_device_id(value: &str) -> Result<String, EnvVarParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return Err(EnvVarParseError::new("device id must be a single non-empty token"));
    }
    Ok(trimmed.to_owned())
}

fn format_display<T: std::fmt::Display>(value: &T) -> Result<String, EnvVarFormatError> {
    Ok(value.to_string())
}

/// Shared boolean parser accepting the usual truthy/falsy spellings.
pub fn parse_bool(value: &str) -> Result<bool, EnvVarParseError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(EnvVarParseError::new("value is not a recognised boolean")),
    }
}
