//! Checks an archive against the directory it was made from.
//!

use thiserror::Error;

use crate::{archive::ArchiveManifest, source::SourceEntry};

/// Verify every source entry was archived.
///
/// Matching is by name only; a member with the right name but corrupt contents passes. The
/// whole listing must be walked without a miss for the archive to be valid, and the first
/// missing entry fails it.
pub fn verify(manifest: &ArchiveManifest, entries: &[SourceEntry]) -> Result<(), IntegrityError> {
    for entry in entries {
        if !manifest.contains_top_level(&entry.name) {
            return Err(IntegrityError {
                missing: entry.name.clone(),
                root: manifest.root().to_string(),
            });
        }
    }

    Ok(())
}

/// A source entry was not found in the archive.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("failure: {missing} not found in archive under '{root}'")]
pub struct IntegrityError {
    /// The name of the missing source entry.
    pub missing: String,

    /// The archive root the entry was expected under.
    pub root: String,
}
