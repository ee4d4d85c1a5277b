//! Storage probe used to admit or defer a backup.
//!

use std::{io, path::Path};

use thiserror::Error;

use crate::source::{ListError, list_source};

/// Measures the storage a backup would need and the storage available for it.
pub trait StorageProbe {
    /// Bytes available to this process at `path`.
    fn free_space(&self, path: &Path) -> Result<u64, ProbeError>;

    /// Size of the largest item directly inside `directory`.
    fn largest_entry_size(&self, directory: &Path) -> Result<u64, ProbeError>;
}

/// Probe backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskProbe;

impl StorageProbe for DiskProbe {
    fn free_space(&self, path: &Path) -> Result<u64, ProbeError> {
        fs2::available_space(path).map_err(ProbeError::FreeSpace)
    }

    fn largest_entry_size(&self, directory: &Path) -> Result<u64, ProbeError> {
        let entries = list_source(directory)?;

        Ok(entries.iter().map(|entry| entry.size).max().unwrap_or(0))
    }
}

/// The free space needed to attempt a backup of a source whose largest item is `largest_entry`.
///
/// Twice the largest item leaves room for the new archive plus headroom for a retry without
/// removing older archives. This is best-effort admission control: compression ratios and
/// sparse files mean the archive can still outgrow it.
pub fn required_space(largest_entry: u64) -> u64 {
    largest_entry.saturating_mul(2)
}

/// Whether `free` bytes are enough to attempt a backup.
pub fn has_capacity(free: u64, largest_entry: u64) -> bool {
    free >= required_space(largest_entry)
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to get free space: {0}")]
    FreeSpace(#[source] io::Error),

    #[error("Failed to measure source: {0}")]
    List(#[from] ListError),
}
