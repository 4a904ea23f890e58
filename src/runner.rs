//! External command execution.
//!
//! Every stage talks to the outside world through the [`CommandRunner`] trait so
//! the pipeline can be driven by a recording fake in tests. [`SystemRunner`] is
//! the real implementation: it spawns the child with tokio and enforces a
//! bounded wait on every invocation.

use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::CommandError;

/// Time between SIGTERM and SIGKILL for a timed-out process group.
const KILL_GRACE: Duration = Duration::from_millis(200);

/// A program plus its arguments, ready to be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Wraps `program args..` in an elevation command such as `sudo`.
    /// An empty or missing wrapper runs the program directly.
    pub fn elevated<I, S>(elevate: Option<&str>, program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut wrapper: Vec<String> = elevate
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if wrapper.is_empty() {
            return Self::new(program, args);
        }
        let head = wrapper.remove(0);
        wrapper.push(program.to_string());
        wrapper.extend(args.into_iter().map(Into::into));
        Self {
            program: head,
            args: wrapper,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external commands to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `spec`, returning its output if it exited successfully.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

/// Spawns real child processes, killing any that outlive `timeout`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Sends `signal` to every process in group `pgid`.
fn signal_group(pgid: u32, signal: libc::c_int) {
    // SAFETY: killpg only takes plain integers and touches no memory.
    let rc = unsafe { libc::killpg(pgid as libc::pid_t, signal) };
    if rc != 0 {
        debug!(
            "killpg({}, {}) failed: {}",
            pgid,
            signal,
            std::io::Error::last_os_error()
        );
    }
}

/// Terminates the whole group, including grandchildren started by an
/// elevation wrapper such as sudo.
async fn kill_group(pgid: u32) {
    signal_group(pgid, libc::SIGTERM);
    tokio::time::sleep(KILL_GRACE).await;
    signal_group(pgid, libc::SIGKILL);
}

#[async_trait]
impl CommandRunner for SystemRunner {
    #[instrument(skip(self, spec), fields(cmd = %spec))]
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        debug!("Executing external command");

        let child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: spec.program.clone(),
                source,
            })?;
        // The child leads its own process group, so its pid is the group id.
        let pgid = child.id();

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| CommandError::Spawn {
                program: spec.program.clone(),
                source,
            })?,
            Err(_) => {
                warn!("Command timed out after {:?}", self.timeout);
                if let Some(pgid) = pgid {
                    kill_group(pgid).await;
                }
                return Err(CommandError::Timeout {
                    program: spec.program.clone(),
                    timeout: self.timeout,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(CommandError::Failed {
                program: spec.program.clone(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!("Command finished, {} bytes on stdout", stdout.len());
        Ok(CommandOutput { stdout, stderr })
    }
}
