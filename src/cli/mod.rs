//! Command-line parsing for the `infertrace` demo binary.

pub mod config;
pub mod error;

pub use config::CliConfig;
pub use error::CliError;
