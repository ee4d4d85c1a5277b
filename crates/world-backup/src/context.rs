//! Where a backup is up to, used to prefix its log lines.
//!

use core::fmt::{self, Display};

/// The stages a backup moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing has been sent to the server yet.
    Idle,
    /// The server has been asked to stop saving.
    Paused,
    /// Checking the destination has room for the archive.
    Probing,
    /// Writing the archive.
    Archiving,
    /// Checking the archive against the source.
    Validating,
    /// The server has been asked to save again.
    Resumed,
    /// The outcome has been broadcast and logged.
    Reported,
    /// The backup stopped on an unrecoverable error.
    Aborted,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Paused => "Paused",
            Self::Probing => "Probing",
            Self::Archiving => "Archiving",
            Self::Validating => "Validating",
            Self::Resumed => "Resumed",
            Self::Reported => "Reported",
            Self::Aborted => "Aborted",
        };

        write!(f, "{name}")
    }
}

/// Holds the context for the current backup. Used for prefixing logs.
#[derive(Debug)]
pub struct Context {
    /// The container being backed up, if any.
    pub container: Option<String>,
    /// The current stage.
    pub stage: Stage,
}

impl Context {
    /// A new context for a backup of `container`.
    pub fn new(container: Option<String>) -> Self {
        Self {
            container,
            stage: Stage::Idle,
        }
    }
}

impl Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(container) = &self.container {
            write!(f, "[{container}] ")?;
        }

        write!(f, "[{}] ", self.stage)?;

        Ok(())
    }
}
