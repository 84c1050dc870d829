//! Shared process environment helpers for infertrace instrumentation.

pub mod environment;

pub use environment::{
    EnvVar, Environment, guard::EnvVarGuard, trace::{DEVICE_ID, DISABLED, LOG_LEVEL, RESOURCE_LOG_PATH, TOKEN_LOG_PATH, TraceEnvVar, parse_bool}, value::{EnvVarError, EnvVarFormatError, EnvVarParseError, TypedEnvVar, TypedEnvVarGuard}
};
