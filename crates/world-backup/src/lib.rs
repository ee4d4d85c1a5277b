//! # world-backup
//! Backs up a game world directory while its server is running: pauses saving, archives and
//! validates the world, then resumes saving and reports the result.
//!

pub mod archive;
pub mod cli;
pub mod config;
pub mod context;
pub mod event_log;
pub mod orchestrator;
pub mod probe;
pub mod request;
pub mod signal;
pub mod source;
pub mod validate;

pub use archive::{ArchiveEngine, ArchiveError, ArchiveManifest, ArchiveMember, TarGzEngine};
pub use config::{Config, LoadConfigError};
pub use event_log::EventLog;
pub use orchestrator::{BackupOrchestrator, ResourceError};
pub use probe::{DiskProbe, StorageProbe};
pub use request::{BackupError, BackupOutcome, BackupRequest, OutcomeStatus, OverwritePolicy};
pub use signal::{Console, ProcessSignal, SignalError};
pub use source::{SourceEntry, list_source};
pub use validate::{IntegrityError, verify};
