//! Append-only log sink.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::error::{Result, WatchError};

/// Destination for rendered kill records. Callers guarantee at most one
/// in-flight `append` at a time; the sink does not serialize concurrent
/// writers itself.
pub trait LogSink {
    fn append(&mut self, text: &str) -> Result<()>;
}

/// File-backed sink. The file is opened, written, and closed on every call,
/// so a handle is never held across cycles and close happens on every exit
/// path via drop.
pub struct FileLogSink {
    path: PathBuf,
}

impl FileLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl LogSink for FileLogSink {
    fn append(&mut self, text: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(WatchError::LogWriteFailed)?;
        file.write_all(text.as_bytes())
            .map_err(WatchError::LogWriteFailed)
    }
}
