// src/process/child.rs

use std::path::Path;
use std::process::ExitStatus;

use tokio::process::{Child, ChildStderr, ChildStdout};
use tracing::debug;

use crate::errors::{DaemonError, Result};
use crate::exec::CommandLine;

/// The supervised child process.
///
/// Owned by exactly one [`Supervisor`](crate::process::Supervisor); it is
/// never cloned or shared. Dropping it kills the child.
#[derive(Debug)]
pub struct SupervisedProcess {
    child: Child,
    pid: Option<u32>,
    command: String,
}

impl SupervisedProcess {
    /// Spawn `line` in `dir` with piped stdout/stderr.
    pub fn spawn(line: &CommandLine, dir: &Path) -> Result<Self> {
        let child = line
            .to_command(dir)
            .spawn()
            .map_err(|source| DaemonError::ProcessStart {
                command: line.to_string(),
                source,
            })?;
        Ok(Self::from_child(child, line.to_string()))
    }

    /// Wrap an already spawned child.
    pub fn from_child(child: Child, command: impl Into<String>) -> Self {
        let pid = child.id();
        Self {
            child,
            pid,
            command: command.into(),
        }
    }

    /// Pid at spawn time.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Hand out the output pipes. Each is returned at most once.
    pub fn take_output(&mut self) -> (Option<ChildStdout>, Option<ChildStderr>) {
        (self.child.stdout.take(), self.child.stderr.take())
    }

    /// Non-blocking exit check.
    pub fn try_exited(&mut self) -> Result<Option<ExitStatus>> {
        self.child.try_wait().map_err(|err| DaemonError::Termination {
            pid: self.pid,
            reason: format!("could not query child status: {err}"),
        })
    }

    /// Send SIGKILL (or the platform equivalent) without waiting.
    pub(crate) fn start_kill(&mut self) -> std::io::Result<()> {
        self.child.start_kill()
    }

    /// Wait until the child has exited and been reaped.
    pub async fn wait_for_exit(&mut self) -> Result<ExitStatus> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|err| DaemonError::Termination {
                pid: self.pid,
                reason: format!("could not wait for child process: {err}"),
            })?;
        debug!(pid = self.pid, %status, "child process exited");
        Ok(status)
    }
}
