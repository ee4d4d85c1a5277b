//! Top level listing of the directory being backed up.
//!

use core::fmt;
use std::{
    fs::{self, Metadata},
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// An item directly inside the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// The file name of the entry.
    pub name: String,

    /// The full path to the entry.
    pub path: PathBuf,

    /// The `ls -l` style mode string, e.g. `drwxr-xr-x`.
    pub mode: String,

    /// The size reported by the filesystem. Directories report their own size, not their contents.
    pub size: u64,
}

impl fmt::Display for SourceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.mode, self.name)
    }
}

/// Lists the entries directly inside `directory`, sorted by name.
///
/// Symlinks are listed as links and not followed. Any entry that cannot be read or stat'd
/// fails the whole listing.
pub fn list_source(directory: &Path) -> Result<Vec<SourceEntry>, ListError> {
    let read_dir = fs::read_dir(directory)
        .map_err(|e| ListError::Io(e, "read directory", directory.to_path_buf()))?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| ListError::Io(e, "read entry", directory.to_path_buf()))?;
        let path = entry.path();

        let metadata = fs::symlink_metadata(&path)
            .map_err(|e| ListError::Io(e, "stat entry", path.clone()))?;

        entries.push(SourceEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            mode: mode_string(&metadata),
            size: metadata.len(),
            path,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(entries)
}

/// Renders entries one per line, for logs and the debug prompt.
pub fn long_listing(entries: &[SourceEntry]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(unix)]
fn mode_string(metadata: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    const BITS: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];

    let mode = metadata.permissions().mode();
    let mut output = String::with_capacity(10);
    output.push(type_char(metadata));
    for (bit, character) in BITS {
        output.push(if mode & bit != 0 { character } else { '-' });
    }

    output
}

#[cfg(not(unix))]
fn mode_string(metadata: &Metadata) -> String {
    let permissions = if metadata.permissions().readonly() {
        "r--r--r--"
    } else {
        "rw-rw-rw-"
    };

    format!("{}{permissions}", type_char(metadata))
}

fn type_char(metadata: &Metadata) -> char {
    let file_type = metadata.file_type();
    if file_type.is_dir() {
        'd'
    } else if file_type.is_symlink() {
        'l'
    } else {
        '-'
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ListError {
    #[error("Failed to {1} '{2:?}': {0}")]
    Io(#[source] io::Error, &'static str, PathBuf),
}
