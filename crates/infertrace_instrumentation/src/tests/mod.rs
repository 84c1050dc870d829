#![cfg(test)]

mod config;
mod exporters;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// A log path in the temp dir that no other test uses.
pub(crate) fn unique_log_path(stem: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    std::env::temp_dir().join(format!("infertrace_{stem}_{unique}.jsonl"))
}
