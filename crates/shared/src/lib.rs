//! # Shared
//! Logging and formatting helpers shared across the workspace.
//!

#![warn(missing_docs)]

mod logger;
mod size;
mod timestamp;

pub use logger::{LoggerError, init_logger};
pub use size::human_size;
pub use timestamp::{DISPLAY_FORMAT, LOG_FORMAT, display_timestamp, log_timestamp};
