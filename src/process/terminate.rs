// src/process/terminate.rs

//! Termination strategies for the supervised child.
//!
//! The strategy is picked once at startup by [`select_terminator`]. Asking
//! for graceful termination where the platform cannot deliver a termination
//! request is a configuration error reported there, not at shutdown time.
//!
//! Both strategies are safe to call on a child that has already exited: they
//! return `Ok` without signalling anything.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::TerminationMode;
use crate::errors::{DaemonError, Result};
use crate::process::child::SupervisedProcess;

/// Whether this platform can ask a process to exit before killing it.
pub fn graceful_termination_supported() -> bool {
    cfg!(unix)
}

/// Stops a child and confirms that it exited.
///
/// `Err` means exit could not be confirmed. Callers treat that as fatal,
/// since starting another child could pile up processes.
pub trait Terminator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn terminate<'a>(
        &'a self,
        process: &'a mut SupervisedProcess,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Build the strategy for the configured mode.
pub fn select_terminator(mode: TerminationMode) -> Result<Box<dyn Terminator>> {
    match mode {
        TerminationMode::Hard => Ok(Box::new(HardKill)),
        TerminationMode::Graceful { timeout } => {
            if !graceful_termination_supported() {
                return Err(DaemonError::GracefulUnsupported);
            }
            Ok(Box::new(GracefulKill::new(timeout)))
        }
    }
}

/// Kill immediately, then wait for the exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardKill;

impl HardKill {
    async fn kill(process: &mut SupervisedProcess) -> Result<()> {
        if let Some(status) = process.try_exited()? {
            debug!(pid = process.pid(), %status, "child already exited; nothing to kill");
            return Ok(());
        }

        if let Err(err) = process.start_kill() {
            // The child may have exited between the check and the signal.
            warn!(pid = process.pid(), error = %err, "could not kill child process");
        }

        process.wait_for_exit().await.map(|_| ())
    }
}

impl Terminator for HardKill {
    fn name(&self) -> &'static str {
        "hard"
    }

    fn terminate<'a>(
        &'a self,
        process: &'a mut SupervisedProcess,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Self::kill(process))
    }
}

/// Send a termination request, wait up to `timeout`, then kill.
#[derive(Debug, Clone, Copy)]
pub struct GracefulKill {
    timeout: Duration,
}

impl GracefulKill {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn stop(&self, process: &mut SupervisedProcess) -> Result<()> {
        if let Some(status) = process.try_exited()? {
            debug!(pid = process.pid(), %status, "child already exited; nothing to stop");
            return Ok(());
        }

        info!(pid = process.pid(), "gracefully stopping the current process");

        let pid = process.pid().ok_or_else(|| DaemonError::Termination {
            pid: None,
            reason: "child has no pid".to_string(),
        })?;
        request_exit(pid).map_err(|err| DaemonError::Termination {
            pid: Some(pid),
            reason: format!("could not send termination request: {err}"),
        })?;

        match tokio::time::timeout(self.timeout, process.wait_for_exit()).await {
            Ok(res) => res.map(|_| ()),
            Err(_elapsed) => {
                warn!(
                    pid,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "could not gracefully stop the current process, proceeding to hard stop"
                );
                HardKill::kill(process).await
            }
        }
    }
}

impl Terminator for GracefulKill {
    fn name(&self) -> &'static str {
        "graceful"
    }

    fn terminate<'a>(
        &'a self,
        process: &'a mut SupervisedProcess,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.stop(process))
    }
}

#[cfg(unix)]
fn request_exit(pid: u32) -> io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn request_exit(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "graceful termination is not supported on this platform",
    ))
}
