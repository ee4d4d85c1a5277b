//! The backup state machine.
//!

use std::{
    fs::{self, create_dir_all},
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use chrono::Utc;
use shared::{display_timestamp, human_size};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    archive::{ArchiveEngine, partial_path},
    context::{Context, Stage},
    event_log::EventLog,
    probe::{StorageProbe, has_capacity, required_space},
    request::{BackupError, BackupOutcome, BackupRequest, OverwritePolicy},
    signal::ProcessSignal,
    source::list_source,
    validate::verify,
};

/// Broadcast once the archive has been written and validated.
pub const SUCCESS_MESSAGE: &str = "Backup Succeeded!";

/// Broadcast when the archive could not be written.
pub const ABORT_MESSAGE: &str = "Aborting backup\nResumed saving world\nError during backup";

/// Broadcast when the space check passes.
pub const SPACE_VERIFIED_MESSAGE: &str = "free space verified for backups, attempting backup";

/// Broadcast when the backup is deferred for lack of space.
pub const LACKING_SPACE_MESSAGE: &str =
    "Lacking disk space, please cleanup backups or increase partition";

/// Runs one backup: pause, probe, archive, validate, resume, report.
///
/// Once pause has been sent, resume is always sent, whatever happens in between.
pub struct BackupOrchestrator<P, A, S> {
    probe: P,
    engine: A,
    signal: S,
    log: EventLog,
}

impl<P: StorageProbe, A: ArchiveEngine, S: ProcessSignal> BackupOrchestrator<P, A, S> {
    /// Create a new orchestrator from its collaborators.
    pub fn new(probe: P, engine: A, signal: S, log: EventLog) -> Self {
        Self {
            probe,
            engine,
            signal,
            log,
        }
    }

    /// The log outcomes are written to.
    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Make a single backup attempt.
    ///
    /// Only a destination directory that cannot be created is returned as an error, every
    /// other failure is part of the outcome.
    pub fn run(&self, request: &BackupRequest) -> Result<BackupOutcome, ResourceError> {
        let mut context = Context::new(request.container_identifier.clone());
        let archive_path = request.archive_path();

        context.stage = Stage::Paused;
        let pause = PersistencePause::pause(&self.signal, &self.log, &context);
        self.broadcast(
            &context,
            &format!("Backup starting at {} UTC", display_timestamp(Utc::now())),
        );

        if let Err(error) = self.ensure_destination(&context, &request.destination_directory) {
            context.stage = Stage::Aborted;
            self.log.error(&format!("{context}{error}"));
            pause.resume(&context);
            return Err(error);
        }

        let result = self.attempt(&mut context, request, &archive_path);
        if let Err(error) = &result {
            if !matches!(error, BackupError::Capacity { .. }) {
                context.stage = Stage::Aborted;
                self.log.error(&format!("{context}{error}"));
            }
        }

        context.stage = Stage::Resumed;
        pause.resume(&context);

        context.stage = Stage::Reported;
        let outcome = BackupOutcome::new(archive_path, result);
        self.report(&context, &outcome);

        Ok(outcome)
    }

    fn ensure_destination(&self, context: &Context, directory: &Path) -> Result<(), ResourceError> {
        match fs::metadata(directory) {
            Ok(metadata) if metadata.is_dir() => {
                debug!("{context}Directory successfully found: {directory:?}");
                Ok(())
            }

            Ok(_) => Err(ResourceError::NotDirectory(directory.to_path_buf())),

            Err(error) if error.kind() == ErrorKind::NotFound => {
                self.log
                    .info(&format!("{context}No path found, creating {directory:?}"));
                create_dir_all(directory)
                    .map_err(|e| ResourceError::Create(e, directory.to_path_buf()))?;
                self.log
                    .info(&format!("{context}Path created, using {directory:?}"));
                Ok(())
            }

            Err(error) => Err(ResourceError::Stat(error, directory.to_path_buf())),
        }
    }

    fn attempt(
        &self,
        context: &mut Context,
        request: &BackupRequest,
        archive_path: &Path,
    ) -> Result<u64, BackupError> {
        context.stage = Stage::Probing;
        let free = self.probe.free_space(&request.destination_directory)?;
        let largest = self.probe.largest_entry_size(&request.source_directory)?;
        let required = required_space(largest);
        debug!(
            "{context}Largest item {}, required {}, available {}",
            human_size(largest),
            human_size(required),
            human_size(free)
        );

        if !has_capacity(free, largest) {
            self.log.warn(&format!(
                "{context}Backup skipped, {} free but {} required",
                human_size(free),
                human_size(required)
            ));
            self.broadcast(context, LACKING_SPACE_MESSAGE);
            return Err(BackupError::Capacity { free, required });
        }
        self.broadcast(context, SPACE_VERIFIED_MESSAGE);

        // An overwrite only replaces the previous archive once the new one has been validated.
        let staged = match request.overwrite_policy {
            OverwritePolicy::CreateExclusive => archive_path.to_path_buf(),
            OverwritePolicy::Overwrite => partial_path(archive_path),
        };

        context.stage = Stage::Archiving;
        let manifest = self.engine.create(
            &staged,
            request.overwrite_policy,
            &request.source_directory,
            true,
        )?;
        self.log.info(&format!(
            "{context}Archive created: {staged:?} ({} members)",
            manifest.len()
        ));
        debug!("{context}{manifest}");

        context.stage = Stage::Validating;
        let validated = list_source(&request.source_directory)
            .map_err(BackupError::from)
            .and_then(|entries| verify(&manifest, &entries).map_err(BackupError::from));

        if staged.as_path() != archive_path {
            match validated {
                Ok(()) => fs::rename(&staged, archive_path).map_err(BackupError::Commit)?,
                Err(error) => {
                    discard(&staged);
                    return Err(error);
                }
            }
        } else {
            validated?;
        }

        let bytes = fs::metadata(archive_path)
            .map_err(BackupError::Measure)?
            .len();

        Ok(bytes)
    }

    fn report(&self, context: &Context, outcome: &BackupOutcome) {
        let path = &outcome.archive_path;

        match &outcome.result {
            Ok(bytes) => {
                self.broadcast(context, SUCCESS_MESSAGE);
                self.log.info(&format!(
                    "{context}Backup {}: {path:?} ({})",
                    outcome.status,
                    human_size(*bytes)
                ));
            }

            Err(error @ BackupError::Capacity { .. }) => {
                self.log
                    .warn(&format!("{context}Backup {}: {error}", outcome.status));
                return;
            }

            Err(BackupError::Integrity(error)) => {
                self.broadcast(
                    context,
                    &format!(
                        "Backup Failure! {} missing from archive\nPlease notify an Admin",
                        error.missing
                    ),
                );
                self.log.error(&format!(
                    "{context}Backup {}: {path:?} is missing {}",
                    outcome.status, error.missing
                ));
            }

            Err(error) => {
                self.broadcast(context, ABORT_MESSAGE);
                self.log
                    .error(&format!("{context}Backup {}: {error}", outcome.status));
            }
        }

        self.broadcast(
            context,
            &format!(
                "Backup complete at {} UTC",
                display_timestamp(outcome.timestamp)
            ),
        );
    }

    fn broadcast(&self, context: &Context, message: &str) {
        if let Err(error) = self.signal.broadcast(message) {
            let summary = message.lines().next().unwrap_or_default();
            self.log
                .warn(&format!("{context}Could not broadcast '{summary}': {error}"));
        }
    }
}

fn discard(staged: &Path) {
    if let Err(error) = fs::remove_file(staged) {
        warn!("Could not remove unvalidated archive {staged:?}: {error}");
    }
}

/// Sends pause when created and resume when finished.
///
/// If the pipeline unwinds before [`PersistencePause::resume`] is called, resume is sent on drop.
struct PersistencePause<'a, S: ProcessSignal> {
    signal: &'a S,
    log: &'a EventLog,
    resumed: bool,
}

impl<'a, S: ProcessSignal> PersistencePause<'a, S> {
    fn pause(signal: &'a S, log: &'a EventLog, context: &Context) -> Self {
        if let Err(error) = signal.pause_persistence() {
            log.warn(&format!("{context}Could not pause saving: {error}"));
        }

        Self {
            signal,
            log,
            resumed: false,
        }
    }

    fn resume(mut self, context: &Context) {
        self.resumed = true;

        if let Err(error) = self.signal.resume_persistence() {
            self.log
                .warn(&format!("{context}Could not resume saving: {error}"));
        }
    }
}

impl<S: ProcessSignal> Drop for PersistencePause<'_, S> {
    fn drop(&mut self) {
        if self.resumed {
            return;
        }

        warn!("Backup ended without resuming, resuming saving");
        if let Err(error) = self.signal.resume_persistence() {
            self.log.warn(&format!("Could not resume saving: {error}"));
        }
    }
}

/// The destination directory is unusable, so the outcome has nowhere to go.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Could not check destination {1:?}: {0}")]
    Stat(#[source] io::Error, PathBuf),

    #[error("Destination {0:?} is not a directory")]
    NotDirectory(PathBuf),

    #[error("Directory creation error {1:?}, aborting: {0}")]
    Create(#[source] io::Error, PathBuf),
}
