use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// A flag was given a value outside its accepted range
    #[error("invalid value for --{flag}: {reason}")]
    InvalidValue { flag: &'static str, reason: String },
}

impl CliError {
    pub fn invalid(flag: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            flag,
            reason: reason.into(),
        }
    }
}
