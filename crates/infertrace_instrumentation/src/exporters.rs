//! Destinations for serialised trace lines.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::Sender;

/// Errors raised while opening a sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to open trace log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Receives complete, newline-free JSON lines.
///
/// Implementations serialise concurrent writers so that lines never interleave,
/// and swallow I/O failures after reporting them through `tracing`.
pub trait EventSink: Send + Sync {
    fn write_line(&self, line: &str);

    fn flush(&self) {}

    /// Backing file, when there is one.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Append JSON lines to a file.
pub struct JsonlSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlSink {
    /// Open `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SinkError::Open { path: path.clone(), source })?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl EventSink for JsonlSink {
    fn write_line(&self, line: &str) {
        let Ok(mut writer) = self.writer.lock() else {
            tracing::error!(target: "instrument", path = %self.path.display(), "trace writer poisoned; dropping line");
            return;
        };
        if let Err(error) = writeln!(writer, "{line}") {
            tracing::error!(target: "instrument", ?error, path = %self.path.display(), "failed to write trace line");
        }
    }

    fn flush(&self) {
        if let Ok(mut writer) = self.writer.lock()
            && let Err(error) = writer.flush()
        {
            tracing::error!(target: "instrument", ?error, path = %self.path.display(), "failed to flush trace log");
        }
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        if let Ok(writer) = self.writer.get_mut() {
            let _ = writer.flush();
        }
    }
}

/// Forward lines through an in-process channel.
pub struct ChannelSink {
    sender: Mutex<Sender<String>>,
}

impl ChannelSink {
    pub fn new(sender: Sender<String>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

impl EventSink for ChannelSink {
    fn write_line(&self, line: &str) {
        if let Ok(sender) = self.sender.lock() {
            let _ = sender.send(line.to_owned());
        }
    }
}
