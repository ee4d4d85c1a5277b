//! # common
//!

#![allow(dead_code)]

use std::{
    cell::RefCell,
    fs::{self, File},
    path::{Path, PathBuf},
    rc::Rc,
};

use flate2::read::GzDecoder;
use tempfile::TempDir;
use world_backup::{
    ArchiveEngine, ArchiveError, ArchiveManifest, BackupRequest, DiskProbe, EventLog,
    OverwritePolicy, ProcessSignal, SignalError, StorageProbe, TarGzEngine, probe::ProbeError,
};

/// Records every command instead of sending it.
#[derive(Clone, Default)]
pub struct RecordingSignal {
    pub commands: Rc<RefCell<Vec<String>>>,
}

impl RecordingSignal {
    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    pub fn position(&self, command: &str) -> Option<usize> {
        self.commands.borrow().iter().position(|c| c == command)
    }

    pub fn count(&self, command: &str) -> usize {
        self.commands.borrow().iter().filter(|c| *c == command).count()
    }
}

impl ProcessSignal for RecordingSignal {
    fn pause_persistence(&self) -> Result<(), SignalError> {
        self.commands.borrow_mut().push(String::from("pause"));
        Ok(())
    }

    fn resume_persistence(&self) -> Result<(), SignalError> {
        self.commands.borrow_mut().push(String::from("resume"));
        Ok(())
    }

    fn broadcast(&self, message: &str) -> Result<(), SignalError> {
        self.commands.borrow_mut().push(format!("say {message}"));
        Ok(())
    }
}

/// Never manages to deliver anything.
pub struct UnreachableSignal;

impl ProcessSignal for UnreachableSignal {
    fn pause_persistence(&self) -> Result<(), SignalError> {
        Err(SignalError::CommandErrored(String::from("no such container")))
    }

    fn resume_persistence(&self) -> Result<(), SignalError> {
        Err(SignalError::CommandErrored(String::from("no such container")))
    }

    fn broadcast(&self, _message: &str) -> Result<(), SignalError> {
        Err(SignalError::CommandErrored(String::from("no such container")))
    }
}

/// Reports a fixed amount of free space but measures the source for real.
pub struct FixedFreeSpace(pub u64);

impl StorageProbe for FixedFreeSpace {
    fn free_space(&self, _path: &Path) -> Result<u64, ProbeError> {
        Ok(self.0)
    }

    fn largest_entry_size(&self, directory: &Path) -> Result<u64, ProbeError> {
        DiskProbe.largest_entry_size(directory)
    }
}

/// Writes a real archive but leaves a top level item out of the manifest.
pub struct OmittingEngine(pub &'static str);

impl ArchiveEngine for OmittingEngine {
    fn create(
        &self,
        destination: &Path,
        policy: OverwritePolicy,
        source: &Path,
        recursive: bool,
    ) -> Result<ArchiveManifest, ArchiveError> {
        let mut manifest = TarGzEngine::default().create(destination, policy, source, recursive)?;
        let omit = self.0;
        manifest.retain(|member| member.path.split('/').nth(1) != Some(omit));
        Ok(manifest)
    }
}

/// Panics part way through archiving.
pub struct PanickingEngine;

impl ArchiveEngine for PanickingEngine {
    fn create(
        &self,
        _destination: &Path,
        _policy: OverwritePolicy,
        _source: &Path,
        _recursive: bool,
    ) -> Result<ArchiveManifest, ArchiveError> {
        panic!("archive engine crashed");
    }
}

/// A temporary source, destination and log directory.
pub struct Workspace {
    pub directory: TempDir,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub logs: PathBuf,
}

/// A workspace whose source holds `a.txt` (10 bytes) and `b.txt` (20 bytes).
pub fn workspace() -> Workspace {
    let directory = tempfile::tempdir().unwrap();
    let source = directory.path().join("world");
    let destination = directory.path().join("world_backups");
    let logs = directory.path().join("logs");

    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), [b'a'; 10]).unwrap();
    fs::write(source.join("b.txt"), [b'b'; 20]).unwrap();

    Workspace {
        directory,
        source,
        destination,
        logs,
    }
}

impl Workspace {
    pub fn request(&self, overwrite_policy: OverwritePolicy) -> BackupRequest {
        BackupRequest {
            container_identifier: Some(String::from("mc-server")),
            source_directory: self.source.clone(),
            destination_directory: self.destination.clone(),
            archive_filename: String::from("2026-Oct-16-09.30.00.tar.gz"),
            overwrite_policy,
        }
    }

    pub fn event_log(&self) -> EventLog {
        EventLog::open_in(&self.logs).unwrap()
    }

    pub fn log_contents(&self) -> String {
        fs::read_to_string(self.logs.join("backup_log.txt")).unwrap()
    }
}

/// The member names stored in a `.tar.gz`, without trailing slashes.
pub fn archive_names(path: &Path) -> Vec<String> {
    let file = File::open(path).unwrap();
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            let path = entry.path().unwrap();
            path.to_string_lossy().trim_end_matches('/').to_string()
        })
        .collect()
}
