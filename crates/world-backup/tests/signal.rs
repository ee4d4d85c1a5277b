//! Tests for delivering console commands through docker
//!

#![cfg(unix)]

use core::time::Duration;
use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    time::Instant,
};

use world_backup::{ProcessSignal, SignalError, signal::DockerConsole};

/// Writes an executable script standing in for `docker`.
fn fake_docker(directory: &Path, body: &str) -> PathBuf {
    let path = directory.join("docker");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn console(program: PathBuf, timeout: Duration) -> DockerConsole {
    let mut console = DockerConsole::new(
        String::from("mc-server"),
        String::from("/tmp/server_stdin.fifo"),
        timeout,
    );
    console.program = program;
    console
}

#[test]
fn exec_writes_into_the_console_fifo() {
    let console = console(PathBuf::from("docker"), Duration::from_secs(1));

    assert_eq!(
        console.exec_args(),
        [
            "exec",
            "-i",
            "mc-server",
            "sh",
            "-c",
            "cat > '/tmp/server_stdin.fifo'"
        ]
    );
}

#[test]
fn commands_are_written_to_stdin() {
    let directory = tempfile::tempdir().unwrap();
    let arguments = directory.path().join("arguments");
    let input = directory.path().join("input");
    let program = fake_docker(
        directory.path(),
        &format!(
            "printf '%s\\n' \"$@\" >> '{}'\ncat >> '{}'",
            arguments.display(),
            input.display()
        ),
    );
    let console = console(program, Duration::from_secs(10));

    console.pause_persistence().unwrap();
    console
        .broadcast("Backup Failure! b.txt missing from archive\n\nPlease notify an Admin")
        .unwrap();
    console.resume_persistence().unwrap();

    assert_eq!(
        fs::read_to_string(&input).unwrap(),
        "/save-off\n\
         say Backup Failure! b.txt missing from archive\n\
         say Please notify an Admin\n\
         /save-on\n"
    );

    let arguments = fs::read_to_string(&arguments).unwrap();
    let first: Vec<_> = arguments.lines().take(6).collect();
    assert_eq!(
        first,
        [
            "exec",
            "-i",
            "mc-server",
            "sh",
            "-c",
            "cat > '/tmp/server_stdin.fifo'"
        ]
    );
}

#[test]
fn failing_command_reports_stderr() {
    let directory = tempfile::tempdir().unwrap();
    let program = fake_docker(
        directory.path(),
        "cat > /dev/null\necho 'Error: No such container: mc-server' >&2\nexit 1",
    );
    let console = console(program, Duration::from_secs(10));

    match console.pause_persistence() {
        Err(SignalError::CommandErrored(stderr)) => {
            assert_eq!(stderr, "Error: No such container: mc-server");
        }
        other => panic!("Expected the command to error, got {other:?}"),
    }
}

#[test]
fn hung_delivery_times_out() {
    let directory = tempfile::tempdir().unwrap();
    let program = fake_docker(directory.path(), "exec sleep 30");
    let timeout = Duration::from_millis(500);
    let console = console(program, timeout);

    let start = Instant::now();
    let result = console.pause_persistence();

    assert!(matches!(result, Err(SignalError::TimedOut(t)) if t == timeout));
    assert!(start.elapsed() >= timeout);
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn missing_program_fails_to_spawn() {
    let directory = tempfile::tempdir().unwrap();
    let console = console(directory.path().join("no-docker"), Duration::from_secs(1));

    assert!(matches!(
        console.resume_persistence(),
        Err(SignalError::Spawn(_))
    ));
}
