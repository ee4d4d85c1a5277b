//! # world-backup
//! Archives a game world directory while its server keeps running.
//!

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::{env, fs, io, path::PathBuf, process::ExitCode};

use chrono::Utc;
use mimalloc::MiMalloc;
use shared::init_logger;
use tracing::{Level, error};
use world_backup::{
    BackupOrchestrator, BackupRequest, DiskProbe, EventLog, OutcomeStatus, TarGzEngine,
    cli::{self, Command, HELP, confirm},
    config::{CONFIG_FILE, Config},
    request::archive_filename,
    source::{list_source, long_listing},
};

/// The destination or log directory could not be created.
const EXIT_RESOURCE: u8 = 1;

/// The archive could not be written or failed validation.
const EXIT_BACKUP_FAILED: u8 = 2;

/// `-1`: bad usage, config or source directory.
const EXIT_CONFIGURATION: u8 = 255;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let parsed = match cli::parse(args.clone()) {
        Ok(parsed) => parsed,
        Err(error) => {
            eprintln!("{error}\nFor more information, run this again w/ -h.");
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };

    for diagnostic in &parsed.diagnostics {
        println!("{diagnostic}");
    }

    let options = match parsed.command {
        Command::Help => {
            println!("{HELP}");
            return ExitCode::SUCCESS;
        }
        Command::Version => {
            println!("Version {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Command::Init => return init_config(),
        Command::Run(options) => options,
    };

    // Load config
    let config = match Config::load_or_default(PathBuf::from(CONFIG_FILE)) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Could not load config: {error}");
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };

    let level = if options.debug {
        Level::DEBUG
    } else {
        config.level()
    };
    let _logger = match init_logger(&config.log_directory, level) {
        Ok(logger) => logger,
        Err(error) => {
            eprintln!("Could not initialize logging: {error}");
            return ExitCode::from(EXIT_RESOURCE);
        }
    };

    let event_log = match EventLog::open_in(&config.log_directory) {
        Ok(event_log) => event_log,
        Err(error) => {
            error!("Could not open event log: {error}");
            return ExitCode::from(EXIT_RESOURCE);
        }
    };
    event_log.info(&format!("Argument list: {args:?}"));

    let Some(source) = options.source.clone().filter(|source| source.is_dir()) else {
        event_log.error(&format!("Source path not found: {:?}", options.source));
        println!(
            "no file path specified, or path not found, aborting.\n\
             For more information, run this again w/ -h.\n\
             A log file should also exist with further details"
        );
        return ExitCode::from(EXIT_CONFIGURATION);
    };

    let destination = options
        .output
        .clone()
        .unwrap_or_else(|| config.backup_directory.clone());

    let listing = match list_source(&source) {
        Ok(entries) => format!("Files in {source:?}:\n{}", long_listing(&entries)),
        Err(error) => {
            event_log.error(&format!("Could not list source: {error}"));
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };
    event_log.info(&listing);

    if options.debug {
        println!("{listing}");

        if !confirm(io::stdin().lock(), &event_log, "continue?") {
            return ExitCode::SUCCESS;
        }

        let prompt = format!("Is this path correct for the BACKUP directory?\n\t{destination:?}");
        if !confirm(io::stdin().lock(), &event_log, &prompt) {
            return ExitCode::SUCCESS;
        }
    }

    let request = BackupRequest {
        container_identifier: config.container_name.clone(),
        source_directory: source,
        destination_directory: destination,
        archive_filename: archive_filename(Utc::now()),
        overwrite_policy: options.overwrite_policy(),
    };

    let orchestrator = BackupOrchestrator::new(
        DiskProbe,
        TarGzEngine::default(),
        config.console(),
        event_log,
    );

    // Errors are logged by the orchestrator.
    match orchestrator.run(&request) {
        Ok(outcome) => match outcome.status {
            OutcomeStatus::Succeeded => {
                println!(
                    "File archive completed. Log available at: {:?}",
                    orchestrator.event_log().path()
                );

                if options.debug {
                    let prompt = format!("Is everything there?\n\t{:?}", outcome.archive_path);
                    confirm(io::stdin().lock(), orchestrator.event_log(), &prompt);
                }

                ExitCode::SUCCESS
            }
            OutcomeStatus::Skipped => ExitCode::SUCCESS,
            OutcomeStatus::Failed => ExitCode::from(EXIT_BACKUP_FAILED),
        },
        Err(_) => ExitCode::from(EXIT_RESOURCE),
    }
}

/// Write the default config to `config.toml`.
fn init_config() -> ExitCode {
    let contents = match toml::to_string_pretty(&Config::default()) {
        Ok(contents) => contents,
        Err(error) => {
            eprintln!("Could not serialize config file: {error}");
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };

    if let Err(error) = fs::write(CONFIG_FILE, contents) {
        eprintln!("Could not create config file: {error}");
        return ExitCode::from(EXIT_RESOURCE);
    }

    println!("Wrote {CONFIG_FILE}");
    ExitCode::SUCCESS
}
