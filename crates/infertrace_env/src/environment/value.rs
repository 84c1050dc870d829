//! Typed environment variable descriptors.
//!
//! A [`TypedEnvVar`] pairs an [`EnvVar`] key with parse and format callbacks so
//! callers read and write domain values instead of raw strings. Descriptors are
//! `const` and may be declared by downstream crates for their own value types.
//!
//! ```
//! use infertrace_env::TOKEN_LOG_PATH;
//!
//! let guard = TOKEN_LOG_PATH.set_guard("/tmp/trace.log".into()).expect("path formats");
//! assert_eq!(guard.to_str(), Some("/tmp/trace.log"));
//! ```

use std::{marker::PhantomData, ops::Deref};

use super::{EnvVar, Environment, guard::EnvVarGuard};

/// Errors surfaced when reading or writing a typed variable.
#[derive(Debug, thiserror::Error)]
pub enum EnvVarError {
    #[error("failed to parse environment variable {name} from '{value}': {source}")]
    Parse {
        name: &'static str,
        value: String,
        source: EnvVarParseError,
    },
    #[error("failed to format environment variable {name}: {source}")]
    Format { name: &'static str, source: EnvVarFormatError },
}

/// Parse callback failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct EnvVarParseError {
    message: String,
}

impl EnvVarParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Format callback failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct EnvVarFormatError {
    message: String,
}

impl EnvVarFormatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

pub type ParseFn<T> = fn(&str) -> Result<T, EnvVarParseError>;
pub type FormatFn<T> = fn(&T) -> Result<String, EnvVarFormatError>;

/// Descriptor for a strongly-typed environment variable.
#[derive(Clone, Copy)]
pub struct TypedEnvVar<T> {
    var: EnvVar,
    parse: ParseFn<T>,
    format: FormatFn<T>,
    _marker: PhantomData<T>,
}

impl<T> TypedEnvVar<T> {
    pub const fn new(var: EnvVar, parse: ParseFn<T>, format: FormatFn<T>) -> Self {
        Self {
            var,
            parse,
            format,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.var.key()
    }

    #[must_use]
    pub const fn var(&self) -> EnvVar {
        self.var
    }

    /// Read and parse the variable. Unset yields `Ok(None)`.
    pub fn get(&self) -> Result<Option<T>, EnvVarError> {
        let Some(raw) = Environment::get(self.var) else {
            return Ok(None);
        };
        (self.parse)(&raw).map(Some).map_err(|source| EnvVarError::Parse {
            name: self.key(),
            value: raw,
            source,
        })
    }

    /// Read the variable, treating an unparsable value as unset and reporting it as a diagnostic.
    pub fn get_or_warn(&self) -> Option<T> {
        match self.get() {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(target: "instrument", %error, "ignoring malformed environment variable");
                None
            }
        }
    }

    pub fn set(&self, value: T) -> Result<(), EnvVarError> {
        let formatted = self.format_value(&value)?;
        Environment::set(self.var, &formatted);
        Ok(())
    }

    pub fn unset(&self) {
        Environment::remove(self.var);
    }

    /// Set the variable for the lifetime of the returned guard.
    pub fn set_guard(&self, value: T) -> Result<TypedEnvVarGuard<'_, T>, EnvVarError> {
        let formatted = self.format_value(&value)?;
        let previous = Environment::get(self.var);
        Environment::set(self.var, &formatted);
        Ok(TypedEnvVarGuard {
            descriptor: self,
            previous,
            value,
        })
    }

    /// Unset the variable for the lifetime of the returned guard.
    #[must_use]
    pub fn unset_guard(&self) -> EnvVarGuard {
        EnvVarGuard::unset(self.var)
    }

    fn format_value(&self, value: &T) -> Result<String, EnvVarError> {
        (self.format)(value).map_err(|source| EnvVarError::Format { name: self.key(), source })
    }
}

/// Restores the previous raw value of a typed variable on drop.
pub struct TypedEnvVarGuard<'a, T> {
    descriptor: &'a TypedEnvVar<T>,
    previous: Option<String>,
    value: T,
}

impl<T> Deref for TypedEnvVarGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> Drop for TypedEnvVarGuard<'_, T> {
    fn drop(&mut self) {
        match &self.previous {
            Some(previous) => Environment::set(self.descriptor.var, previous),
            None => Environment::remove(self.descriptor.var),
        }
    }
}
