//! A single backup request and its outcome.
//!

use core::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use shared::display_timestamp;
use thiserror::Error;

use crate::{
    archive::ArchiveError, probe::ProbeError, source::ListError, validate::IntegrityError,
};

/// What to do when the archive file already exists.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Fail without touching the existing file.
    #[default]
    CreateExclusive,

    /// Replace the existing file.
    Overwrite,
}

/// Everything needed for one backup attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    /// The container running the server, if the server should be signalled.
    pub container_identifier: Option<String>,

    /// The directory to back up.
    pub source_directory: PathBuf,

    /// The directory the archive is written to.
    pub destination_directory: PathBuf,

    /// The archive's file name.
    pub archive_filename: String,

    /// What to do if the archive already exists.
    pub overwrite_policy: OverwritePolicy,
}

impl BackupRequest {
    /// The full path the archive is written to.
    pub fn archive_path(&self) -> PathBuf {
        self.destination_directory.join(&self.archive_filename)
    }
}

/// The archive file name for a backup started at `time`.
pub fn archive_filename(time: DateTime<Utc>) -> String {
    format!("{}.tar.gz", display_timestamp(time))
}

/// How a backup attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// The archive was written and validated.
    Succeeded,

    /// The archive could not be written or did not validate.
    Failed,

    /// There was not enough space to attempt the backup.
    Skipped,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// The result of one pass through the backup pipeline.
#[derive(Debug)]
pub struct BackupOutcome {
    /// How the attempt ended.
    pub status: OutcomeStatus,

    /// Where the archive was, or would have been, written.
    pub archive_path: PathBuf,

    /// The size of the validated archive, or why there is none.
    pub result: Result<u64, BackupError>,

    /// When the attempt finished.
    pub timestamp: DateTime<Utc>,
}

impl BackupOutcome {
    /// Builds the outcome for a finished attempt.
    pub fn new(archive_path: PathBuf, result: Result<u64, BackupError>) -> Self {
        let status = match &result {
            Ok(_) => OutcomeStatus::Succeeded,
            Err(BackupError::Capacity { .. }) => OutcomeStatus::Skipped,
            Err(_) => OutcomeStatus::Failed,
        };

        Self {
            status,
            archive_path,
            result,
            timestamp: Utc::now(),
        }
    }

    /// Whether the archive was written and validated.
    pub fn succeeded(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

/// Why a backup attempt did not produce a validated archive.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Insufficient space: {free} bytes free, {required} bytes required")]
    Capacity { free: u64, required: u64 },

    #[error("Failed to probe storage: {0}")]
    Probe(#[from] ProbeError),

    #[error("Failed to create archive: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Failed to list source: {0}")]
    List(#[from] ListError),

    #[error("Archive failed validation: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Failed to measure archive: {0}")]
    Measure(#[source] std::io::Error),

    #[error("Failed to move validated archive into place: {0}")]
    Commit(#[source] std::io::Error),
}
