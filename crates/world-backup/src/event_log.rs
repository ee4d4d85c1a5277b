//! The durable record of what each backup did.
//!

use std::{
    fs::{File, OpenOptions, create_dir_all},
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::Utc;
use shared::log_timestamp;
use thiserror::Error;
use tracing::{Level, error, info, warn};

/// The event log's file name inside the log directory.
pub const EVENT_LOG_FILE: &str = "backup_log.txt";

/// An append-only log with one UTC timestamped line per event.
///
/// Every event is also emitted through `tracing`. Failing to append is reported through
/// `tracing` only, the backup carries on.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    file: File,
}

impl EventLog {
    /// Opens the log at `path` for appending, creating it and its parent directory if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, OpenEventLogError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            create_dir_all(parent).map_err(OpenEventLogError::CreateDirectory)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(OpenEventLogError::Open)?;

        Ok(Self { path, file })
    }

    /// Opens the log in `log_directory` under its usual file name.
    pub fn open_in(log_directory: &Path) -> Result<Self, OpenEventLogError> {
        Self::open(log_directory.join(EVENT_LOG_FILE))
    }

    /// Where the log is written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an informational event.
    pub fn info(&self, message: &str) {
        info!("{message}");
        self.append(Level::INFO, message);
    }

    /// Record something that went wrong without failing the backup.
    pub fn warn(&self, message: &str) {
        warn!("{message}");
        self.append(Level::WARN, message);
    }

    /// Record a failure.
    pub fn error(&self, message: &str) {
        error!("{message}");
        self.append(Level::ERROR, message);
    }

    fn append(&self, level: Level, message: &str) {
        let line = format_line(&log_timestamp(Utc::now()), level, message);

        if let Err(e) = (&self.file).write_all(line.as_bytes()) {
            error!("Could not write to event log {:?}: {e}", self.path);
        }
    }
}

/// Folds a message onto a single line so each event is exactly one line.
fn format_line(timestamp: &str, level: Level, message: &str) -> String {
    let message = message
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");

    format!("{timestamp}\t{level}\t{message}\n")
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum OpenEventLogError {
    #[error("Failed to create log directory:\n{0}")]
    CreateDirectory(#[source] io::Error),

    #[error("Failed to open event log:\n{0}")]
    Open(#[source] io::Error),
}
