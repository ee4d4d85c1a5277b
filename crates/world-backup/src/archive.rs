//! Compressed archives of the source directory.
//!

use core::fmt;
use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, ErrorKind},
    path::{Component, Path, PathBuf},
};

use flate2::{Compression, write::GzEncoder};
use tar::Builder;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::OverwritePolicy;

/// What kind of filesystem object an archive member is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
    /// A symbolic link, stored as a link.
    Symlink,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "dir"),
            Self::Symlink => write!(f, "link"),
        }
    }
}

/// A member written into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    /// The member's name inside the archive, `/` separated and starting with the archive root.
    pub path: String,

    /// The kind of the member.
    pub kind: MemberKind,

    /// The size of the member's contents in bytes. Zero for directories and links.
    pub size: u64,
}

impl fmt::Display for ArchiveMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.kind, self.size, self.path)
    }
}

/// The members of an archive, in the order they were written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveManifest {
    root: String,
    members: Vec<ArchiveMember>,
}

impl ArchiveManifest {
    /// Creates an empty manifest for an archive whose members live under `root`.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            members: Vec::new(),
        }
    }

    /// The name every member is stored under.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The archived members.
    pub fn members(&self) -> &[ArchiveMember] {
        &self.members
    }

    /// Records a member.
    pub fn push(&mut self, member: ArchiveMember) {
        self.members.push(member);
    }

    /// Keeps only the members matching `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&ArchiveMember) -> bool) {
        self.members.retain(keep);
    }

    /// The number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether no member was recorded.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether an item named `name` directly inside the archive root was archived.
    pub fn contains_top_level(&self, name: &str) -> bool {
        self.members.iter().any(|member| {
            member
                .path
                .strip_prefix(self.root.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .and_then(|rest| rest.split('/').next())
                .is_some_and(|top_level| top_level == name)
        })
    }
}

impl fmt::Display for ArchiveManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} members under '{}'", self.members.len(), self.root)?;
        for member in &self.members {
            write!(f, "\n\t{member}")?;
        }

        Ok(())
    }
}

/// Something that can archive a directory.
pub trait ArchiveEngine {
    /// Archive `source` into a single file at `destination`.
    ///
    /// On failure no file at `destination` is left that could be mistaken for a complete archive.
    fn create(
        &self,
        destination: &Path,
        policy: OverwritePolicy,
        source: &Path,
        recursive: bool,
    ) -> Result<ArchiveManifest, ArchiveError>;
}

/// Writes gzip compressed tar archives.
#[derive(Debug, Clone, Copy)]
pub struct TarGzEngine {
    /// The gzip compression level.
    pub compression: Compression,
}

impl Default for TarGzEngine {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
        }
    }
}

impl ArchiveEngine for TarGzEngine {
    fn create(
        &self,
        destination: &Path,
        policy: OverwritePolicy,
        source: &Path,
        recursive: bool,
    ) -> Result<ArchiveManifest, ArchiveError> {
        let source_metadata = fs::metadata(source)
            .map_err(|e| ArchiveError::Io(e, "stat source", source.to_path_buf()))?;
        if !source_metadata.is_dir() {
            return Err(ArchiveError::NotDirectory(source.to_path_buf()));
        }

        let root = archive_root(source)?;

        match policy {
            OverwritePolicy::CreateExclusive => {
                let file = OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(destination)
                    .map_err(|e| {
                        if e.kind() == ErrorKind::AlreadyExists {
                            ArchiveError::AlreadyExists(destination.to_path_buf())
                        } else {
                            ArchiveError::Io(e, "create archive", destination.to_path_buf())
                        }
                    })?;

                self.write_archive(file, source, &root, recursive)
                    .inspect_err(|_| remove_incomplete(destination))
            }

            OverwritePolicy::Overwrite => {
                let partial = partial_path(destination);
                let file = File::create(&partial)
                    .map_err(|e| ArchiveError::Io(e, "create archive", partial.clone()))?;

                let manifest = self
                    .write_archive(file, source, &root, recursive)
                    .inspect_err(|_| remove_incomplete(&partial))?;

                fs::rename(&partial, destination)
                    .map_err(|e| ArchiveError::Io(e, "move archive into place", partial.clone()))
                    .inspect_err(|_| remove_incomplete(&partial))?;

                Ok(manifest)
            }
        }
    }
}

impl TarGzEngine {
    fn write_archive(
        &self,
        file: File,
        source: &Path,
        root: &str,
        recursive: bool,
    ) -> Result<ArchiveManifest, ArchiveError> {
        let encoder = GzEncoder::new(BufWriter::new(file), self.compression);
        let mut builder = Builder::new(encoder);
        builder.follow_symlinks(false);

        let mut manifest = ArchiveManifest::new(root);

        let walker = WalkDir::new(source).follow_links(false);
        let walker = if recursive {
            walker
        } else {
            walker.max_depth(0)
        };

        for entry in walker {
            let entry = entry?;
            let path = entry.path();

            let relative = path
                .strip_prefix(source)
                .map_err(|_| ArchiveError::OutsideSource(path.to_path_buf()))?;
            let name = Path::new(root).join(relative);

            builder
                .append_path_with_name(path, &name)
                .map_err(|e| ArchiveError::Io(e, "append member", path.to_path_buf()))?;

            let file_type = entry.file_type();
            let (kind, size) = if file_type.is_dir() {
                (MemberKind::Directory, 0)
            } else if file_type.is_symlink() {
                (MemberKind::Symlink, 0)
            } else {
                let metadata = entry.metadata()?;
                (MemberKind::File, metadata.len())
            };

            let member = ArchiveMember {
                path: member_name(&name),
                kind,
                size,
            };
            debug!("Archived {member}");
            manifest.push(member);
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| ArchiveError::Io(e, "finish tar stream", PathBuf::from(root)))?;
        let writer = encoder
            .finish()
            .map_err(|e| ArchiveError::Io(e, "finish gzip stream", PathBuf::from(root)))?;
        let file = writer
            .into_inner()
            .map_err(|e| ArchiveError::Io(e.into_error(), "flush archive", PathBuf::from(root)))?;
        file.sync_all()
            .map_err(|e| ArchiveError::Io(e, "sync archive", PathBuf::from(root)))?;

        Ok(manifest)
    }
}

/// The name the source directory is stored under, its own final path component.
fn archive_root(source: &Path) -> Result<String, ArchiveError> {
    let canonical = fs::canonicalize(source)
        .map_err(|e| ArchiveError::Io(e, "resolve source", source.to_path_buf()))?;

    let root = canonical
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("."));

    Ok(root)
}

/// Joins the normal components of a path with `/`, independent of the platform.
fn member_name(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::CurDir => Some(".".into()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// The sibling `<name>.partial` an archive is written to before it replaces `destination`.
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("archive"));
    name.push(".partial");

    destination.with_file_name(name)
}

fn remove_incomplete(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove incomplete archive {path:?}: {e}");
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive {0:?} already exists")]
    AlreadyExists(PathBuf),

    #[error("Source {0:?} is not a directory")]
    NotDirectory(PathBuf),

    #[error("Failed to {1} {2:?}: {0}")]
    Io(#[source] io::Error, &'static str, PathBuf),

    #[error("Failed to walk source: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Walked outside of the source: {0:?}")]
    OutsideSource(PathBuf),
}
