// src/process/signals.rs

//! Forward fatal signals sent to the daemon to the supervised child.
//!
//! Listeners are installed eagerly by [`TerminationSignals::install`] so a
//! signal arriving during startup is not handled by the default action
//! (which would leave the child running).

use std::io;

use tokio::task::JoinHandle;
use tracing::info;

use crate::errors::Result;
use crate::process::supervisor::SupervisorHandle;

/// Installed listeners for interrupt, terminate and quit.
#[cfg(unix)]
pub struct TerminationSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    /// Wait for the next signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.quit.recv() => "SIGQUIT",
        }
    }
}

/// Ctrl-C listener on platforms without POSIX signals.
#[cfg(not(unix))]
pub struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    pub fn install() -> io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(&mut self) -> &'static str {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        "ctrl-c"
    }
}

/// Spawn the signal forwarder.
///
/// The task resolves after the first termination signal, once the child (if
/// any) is confirmed stopped. The host then exits with status 0, or with the
/// termination error if the child could not be stopped.
pub fn spawn_signal_forwarder(
    mut signals: TerminationSignals,
    supervisor: Option<SupervisorHandle>,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let name = signals.recv().await;
        info!(signal = name, "termination signal received; shutting down");
        forward_shutdown(supervisor.as_ref()).await
    })
}

/// Ask the supervisor, if there is one, to stop its child.
pub async fn forward_shutdown(supervisor: Option<&SupervisorHandle>) -> Result<()> {
    match supervisor {
        Some(handle) => handle.shutdown().await,
        None => Ok(()),
    }
}
