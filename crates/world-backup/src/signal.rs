//! Commands sent to the live server process.
//!

use core::time::Duration;
use std::{
    io::{self, Read, Write},
    path::PathBuf,
    process::{Child, Command, Stdio},
    thread::sleep,
    time::Instant,
};

use thiserror::Error;
use tracing::{debug, info};

/// Console command that stops the server writing the world to disk.
pub const PAUSE_COMMAND: &str = "/save-off";

/// Console command that lets the server write the world to disk again.
pub const RESUME_COMMAND: &str = "/save-on";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A fire-and-forget channel to the live server process.
///
/// Nothing is read back from the server, so a successful send only means the command was
/// delivered to its console, not that the server acted on it.
pub trait ProcessSignal {
    /// Ask the server to stop persisting its state.
    fn pause_persistence(&self) -> Result<(), SignalError>;

    /// Ask the server to persist its state again.
    fn resume_persistence(&self) -> Result<(), SignalError>;

    /// Show a message to everyone on the server.
    fn broadcast(&self, message: &str) -> Result<(), SignalError>;
}

/// Writes console commands into a fifo read by the server inside a docker container.
#[derive(Debug, Clone)]
pub struct DockerConsole {
    /// The docker executable, `docker` on the `PATH` unless changed.
    pub program: PathBuf,

    /// The container's name.
    pub container_name: String,

    /// The fifo inside the container the server reads its console from.
    pub console_fifo: String,

    /// How long a single delivery may take before it is abandoned.
    pub timeout: Duration,
}

impl DockerConsole {
    /// A console for `container_name` using the `docker` on the `PATH`.
    pub fn new(container_name: String, console_fifo: String, timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("docker"),
            container_name,
            console_fifo,
            timeout,
        }
    }

    /// The arguments passed to docker to deliver one line to the console.
    pub fn exec_args(&self) -> [String; 6] {
        [
            String::from("exec"),
            String::from("-i"),
            self.container_name.clone(),
            String::from("sh"),
            String::from("-c"),
            format!("cat > '{}'", self.console_fifo),
        ]
    }

    /// Deliver a single console line.
    pub fn send(&self, command: &str) -> Result<(), SignalError> {
        debug!("Sending '{command}' to {}", self.container_name);

        let mut child = Command::new(&self.program)
            .args(self.exec_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SignalError::Spawn)?;

        // Dropping stdin closes it so `cat` can finish.
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(error) = writeln!(stdin, "{command}") {
                kill(&mut child);
                return Err(SignalError::Io(error, "write command"));
            }
        }

        wait_with_timeout(&mut child, self.timeout)
    }
}

impl ProcessSignal for DockerConsole {
    fn pause_persistence(&self) -> Result<(), SignalError> {
        self.send(PAUSE_COMMAND)
    }

    fn resume_persistence(&self) -> Result<(), SignalError> {
        self.send(RESUME_COMMAND)
    }

    fn broadcast(&self, message: &str) -> Result<(), SignalError> {
        for line in message.lines().filter(|line| !line.trim().is_empty()) {
            self.send(&format!("say {line}"))?;
        }

        Ok(())
    }
}

/// The console the backup talks to.
#[derive(Debug, Clone)]
pub enum Console {
    /// A server in a docker container.
    Docker(DockerConsole),

    /// No server is attached; commands are only logged.
    Unattached,
}

impl ProcessSignal for Console {
    fn pause_persistence(&self) -> Result<(), SignalError> {
        match self {
            Self::Docker(docker) => docker.pause_persistence(),
            Self::Unattached => {
                info!("No server attached, skipping '{PAUSE_COMMAND}'");
                Ok(())
            }
        }
    }

    fn resume_persistence(&self) -> Result<(), SignalError> {
        match self {
            Self::Docker(docker) => docker.resume_persistence(),
            Self::Unattached => {
                info!("No server attached, skipping '{RESUME_COMMAND}'");
                Ok(())
            }
        }
    }

    fn broadcast(&self, message: &str) -> Result<(), SignalError> {
        match self {
            Self::Docker(docker) => docker.broadcast(message),
            Self::Unattached => {
                info!("{message}");
                Ok(())
            }
        }
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<(), SignalError> {
    let start = Instant::now();

    loop {
        let status = child
            .try_wait()
            .map_err(|e| SignalError::Io(e, "wait for command"))?;

        if let Some(status) = status {
            if status.success() {
                return Ok(());
            }

            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                // The exit status is the error either way.
                let _ = pipe.read_to_string(&mut stderr);
            }

            return Err(SignalError::CommandErrored(stderr.trim().to_string()));
        }

        if start.elapsed() >= timeout {
            kill(child);
            return Err(SignalError::TimedOut(timeout));
        }

        sleep(POLL_INTERVAL);
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Failed to run command:\n{0}")]
    Spawn(#[source] io::Error),

    #[error("Failed to {1}: {0}")]
    Io(#[source] io::Error, &'static str),

    #[error("Command output was error:\n{0}")]
    CommandErrored(String),

    #[error("Command did not finish within {0:?}")]
    TimedOut(Duration),
}
