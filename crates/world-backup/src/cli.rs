//! Command line arguments.
//!
//! Flags are single dash words (`-debug`) with single character forms that can be clustered
//! (`-do`). Unknown characters are reported and otherwise ignored.
//!

use std::{env, io::BufRead, path::PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::{EventLog, OverwritePolicy};

/// Usage text printed by `-help` and when run without arguments.
pub const HELP: &str = "\
Archives a world directory, pausing and resuming saving on the server around it.
Archiving is recursive, you only need to specify the path to the directory to archive.

USAGE:
    world-backup <dir_to_archive>
    world-backup -<flags> <dir_to_archive>
    world-backup -<flag_n> <parm_n> <dir_to_archive>
    world-backup init

OPTIONS:
    -d, -debug      Log more, print the directory listing and ask before starting.
    -o, -overwrite  Overwrite an existing archive, e.g. when an earlier attempt was incomplete.
    -h, -help       Print this message and exit.
    -v, -version    Print the version and exit.
    -in <path>      The directory to archive, instead of the last argument.
    -out <path>     The directory to write the archive to for this run.

    init            Write the default config.toml and exit.
                    To back up a directory named init, use -in init.

FURTHER INFO:
    Relative directories are supported, e.g. ../world.
    The server is signalled through the container named in config.toml, if any.
    Archives are named after the UTC time they were started, e.g. 2026-Oct-16-09.30.00.tar.gz.
    Every run is recorded in backup_log.txt in the log directory.
    An integrity failure means an item in the directory was not added to the archive;
    this is usually caused by permissions.";

/// What a flag does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Enable debug mode.
    Debug,
    /// Overwrite an existing archive.
    Overwrite,
    /// Print help and exit.
    Help,
    /// Print the version and exit.
    Version,
    /// Set the source directory.
    Input,
    /// Set the destination directory.
    Output,
}

/// A flag the program accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag {
    /// The word form, without its dash.
    pub name: &'static str,
    /// The single character form, if it has one.
    pub short: Option<char>,
    /// Whether the flag consumes the following argument.
    pub takes_value: bool,
    /// What the flag does.
    pub effect: Effect,
}

/// Every flag the program accepts.
pub const FLAGS: &[Flag] = &[
    Flag {
        name: "debug",
        short: Some('d'),
        takes_value: false,
        effect: Effect::Debug,
    },
    Flag {
        name: "overwrite",
        short: Some('o'),
        takes_value: false,
        effect: Effect::Overwrite,
    },
    Flag {
        name: "help",
        short: Some('h'),
        takes_value: false,
        effect: Effect::Help,
    },
    Flag {
        name: "version",
        short: Some('v'),
        takes_value: false,
        effect: Effect::Version,
    },
    Flag {
        name: "in",
        short: None,
        takes_value: true,
        effect: Effect::Input,
    },
    Flag {
        name: "out",
        short: None,
        takes_value: true,
        effect: Effect::Output,
    },
];

/// Options for a backup run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Options {
    /// The directory to back up.
    pub source: Option<PathBuf>,
    /// The directory to write the archive to, instead of the configured one.
    pub output: Option<PathBuf>,
    /// Debug mode.
    pub debug: bool,
    /// Overwrite an existing archive.
    pub overwrite: bool,
}

impl Options {
    /// The overwrite policy the flags select.
    pub fn overwrite_policy(&self) -> OverwritePolicy {
        if self.overwrite {
            OverwritePolicy::Overwrite
        } else {
            OverwritePolicy::CreateExclusive
        }
    }
}

/// What the program was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Make a backup.
    Run(Options),
    /// Print the help text.
    Help,
    /// Print the version.
    Version,
    /// Write the default config.
    Init,
}

/// Parsed arguments and anything worth telling the user about them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArgs {
    /// What to do.
    pub command: Command,
    /// Messages about ignored flags.
    pub diagnostics: Vec<String>,
}

/// Parse the arguments, not including the program name.
pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, UsageError> {
    let mut args = args.into_iter().peekable();
    let mut diagnostics = Vec::new();

    match args.peek().map(String::as_str) {
        None => return Ok(finish(Command::Help, diagnostics)),
        Some("init") => return Ok(finish(Command::Init, diagnostics)),
        Some(_) => {}
    }

    let mut options = Options::default();
    let mut positional = None;

    while let Some(arg) = args.next() {
        let Some(flag_text) = arg.strip_prefix('-').filter(|text| !text.is_empty()) else {
            positional = Some(PathBuf::from(&arg));
            continue;
        };

        let name = flag_text.strip_prefix('-').unwrap_or(flag_text);
        if let Some(flag) = FLAGS.iter().find(|flag| flag.name == name) {
            let value = if flag.takes_value {
                match args.next() {
                    Some(value) => Some(value),
                    None => return Err(UsageError::MissingValue(arg)),
                }
            } else {
                None
            };

            if let Some(command) = apply(flag.effect, value, &mut options) {
                return Ok(finish(command, diagnostics));
            }

            continue;
        }

        for character in name.chars() {
            match FLAGS.iter().find(|flag| flag.short == Some(character)) {
                Some(flag) => {
                    if let Some(command) = apply(flag.effect, None, &mut options) {
                        return Ok(finish(command, diagnostics));
                    }
                }
                None => diagnostics.push(format!("Flag not found:{arg}")),
            }
        }
    }

    // An explicit `-in` wins over the positional.
    if options.source.is_none() {
        options.source = positional;
    }

    Ok(finish(Command::Run(options), diagnostics))
}

fn apply(effect: Effect, value: Option<String>, options: &mut Options) -> Option<Command> {
    match effect {
        Effect::Debug => options.debug = true,
        Effect::Overwrite => options.overwrite = true,
        Effect::Help => return Some(Command::Help),
        Effect::Version => return Some(Command::Version),
        Effect::Input => options.source = value.map(PathBuf::from),
        Effect::Output => options.output = value.map(PathBuf::from),
    }

    None
}

fn finish(command: Command, diagnostics: Vec<String>) -> ParsedArgs {
    ParsedArgs {
        command,
        diagnostics,
    }
}

/// Ask the user to confirm by answering with a `y`, recording who aborted if they do not.
pub fn confirm<R: BufRead>(mut input: R, event_log: &EventLog, prompt: &str) -> bool {
    println!("{prompt}");

    let mut response = String::new();
    if let Err(error) = input.read_line(&mut response) {
        warn!("Could not read response: {error}");
    }

    if response.contains('y') {
        return true;
    }

    event_log.warn(&format!("Operation aborted by user: {}", user_name()));
    println!("Operation aborted by user.");

    false
}

/// The name of the user running the program, for the event log.
pub fn user_name() -> String {
    env::var("USERNAME")
        .or_else(|_| env::var("USER"))
        .unwrap_or_else(|_| String::from("undefined_user"))
}

#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Flag {0} requires a value")]
    MissingValue(String),
}
