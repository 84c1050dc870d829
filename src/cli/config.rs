use std::path::PathBuf;

use clap::Parser;
use infertrace_instrumentation::{DetailLevel, TraceConfig};
use tracing::Level;

use super::CliError;

const DEFAULT_PROMPT: &str = "Hello world!";

/// Command-line interface configuration for the infertrace demo
#[derive(Debug, Parser)]
#[command(name = "infertrace")]
#[command(about = "Run a simulated transformer decode under the token and resource tracers", long_about = None)]
pub struct CliConfig {
    /// Prompt recorded in the session header (default: Hello world!)
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,

    /// Trace detail level; overrides INFERTRACE_DETAIL_LEVEL
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub detail: Option<DetailChoice>,

    /// Token/step log destination; overrides INFERTRACE_TOKEN_LOG_PATH
    #[arg(long, value_name = "PATH")]
    pub token_log: Option<PathBuf>,

    /// Resource log destination; overrides INFERTRACE_RESOURCE_LOG_PATH
    #[arg(long, value_name = "PATH")]
    pub resource_log: Option<PathBuf>,

    /// Device label used in resource ids; overrides INFERTRACE_DEVICE_ID
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Number of transformer layers to simulate
    #[arg(long, default_value_t = 2)]
    pub layers: u32,

    /// Number of tokens to generate
    #[arg(long, default_value_t = 4)]
    pub max_tokens: usize,

    /// Enable verbose diagnostics
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Detail levels exposed on the command line.
#[derive(Debug, Clone, Copy, clap::ValueEnum, PartialEq, Eq)]
pub enum DetailChoice {
    /// Session, step and sampling events plus allocations of 1 MiB or more
    Minimal,
    /// Adds step starts, tensor metadata and every allocation
    Detailed,
    /// Adds cheap element-wise operations and echoes every line to diagnostics
    Verbose,
}

impl From<DetailChoice> for DetailLevel {
    fn from(choice: DetailChoice) -> Self {
        match choice {
            DetailChoice::Minimal => DetailLevel::Minimal,
            DetailChoice::Detailed => DetailLevel::Detailed,
            DetailChoice::Verbose => DetailLevel::Verbose,
        }
    }
}

impl CliConfig {
    /// Get the prompt text, using the default if not provided
    pub fn get_prompt(&self) -> String {
        self.prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
            .unwrap_or(DEFAULT_PROMPT)
            .to_string()
    }

    pub fn validate(&self) -> Result<(), CliError> {
        if self.layers == 0 {
            return Err(CliError::invalid("layers", "at least one layer is required"));
        }
        if self.max_tokens == 0 {
            return Err(CliError::invalid("max-tokens", "at least one token must be generated"));
        }
        if let Some(device) = &self.device
            && (device.is_empty() || device.contains(char::is_whitespace))
        {
            return Err(CliError::invalid("device", "must be a single non-empty token"));
        }
        Ok(())
    }

    /// Layer command-line overrides on top of the environment configuration.
    pub fn apply(&self, config: &mut TraceConfig) {
        match self.verbose {
            0 => {}
            1 => config.log_level = config.log_level.max(Level::DEBUG),
            _ => config.log_level = Level::TRACE,
        }
        if let Some(detail) = self.detail {
            config.detail_level = detail.into();
        }
        if let Some(path) = &self.token_log {
            config.token_log_path = path.clone();
        }
        if let Some(path) = &self.resource_log {
            config.resource_log_path = path.clone();
        }
        if let Some(device) = &self.device {
            config.device_id = device.clone();
        }
    }
}

#[cfg(test)]
#[path = "config.test.rs"]
mod tests;
