//! World backup config
//!

use core::{str::FromStr, time::Duration};
use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

use crate::signal::{Console, DockerConsole};

/// The file the config is read from.
pub const CONFIG_FILE: &str = "config.toml";

/// The backup config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The container running the server. Without one the server is not signalled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,

    /// The fifo inside the container the server reads console commands from.
    pub console_fifo: String,

    /// How long to wait for a single console command to be delivered.
    pub signal_timeout_seconds: u64,

    /// Where archives are written unless overridden with `-out`.
    pub backup_directory: PathBuf,

    /// Where the event log and diagnostics are written.
    pub log_directory: PathBuf,

    /// The diagnostics level, one of `trace`, `debug`, `info`, `warn` or `error`.
    pub log_level: String,
}

impl Config {
    /// Tries to load a config from a toml file.
    pub fn load_toml(file_path: PathBuf) -> Result<Self, LoadConfigError> {
        if !file_path.exists() {
            return Err(LoadConfigError::NoFile);
        }

        let contents = fs::read_to_string(file_path).map_err(LoadConfigError::Read)?;
        let config = toml::from_str(&contents)?;

        Ok(config)
    }

    /// Loads the config from a toml file, or the defaults if there is no file.
    pub fn load_or_default(file_path: PathBuf) -> Result<Self, LoadConfigError> {
        match Self::load_toml(file_path) {
            Err(LoadConfigError::NoFile) => Ok(Self::default()),
            result => result,
        }
    }

    /// The diagnostics level, falling back to `info` for unknown names.
    pub fn level(&self) -> Level {
        Level::from_str(&self.log_level).unwrap_or(Level::INFO)
    }

    /// The console to signal the server through.
    pub fn console(&self) -> Console {
        match &self.container_name {
            Some(container_name) => Console::Docker(DockerConsole::new(
                container_name.clone(),
                self.console_fifo.clone(),
                Duration::from_secs(self.signal_timeout_seconds),
            )),
            None => Console::Unattached,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let backup_directory = if cfg!(windows) {
            "backups"
        } else {
            "world_backups"
        };

        Self {
            container_name: None,
            console_fifo: String::from("/tmp/server_stdin.fifo"),
            signal_timeout_seconds: 10,
            backup_directory: PathBuf::from(backup_directory),
            log_directory: PathBuf::from("logs"),
            log_level: String::from("info"),
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("The file does not exist.")]
    NoFile,

    #[error("Failed to read the file:\n{0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to deserialize the file:\n{0}")]
    Deserialize(#[from] toml::de::Error),
}
