// src/process/mod.rs

//! Supervision of the long-running child process.
//!
//! - [`child`] wraps the one live child and its output pipes.
//! - [`terminate`] holds the hard and graceful termination strategies.
//! - [`output`] drains child stdout/stderr into the log.
//! - [`supervisor`] owns the current child and decides when to stop and
//!   start it in response to build signals.
//! - [`signals`] forwards termination signals sent to the daemon so the
//!   child is stopped before we exit.

pub mod child;
pub mod output;
pub mod signals;
pub mod supervisor;
pub mod terminate;

pub use child::SupervisedProcess;
pub use output::{spawn_output_logger, OutputPipe};
pub use signals::{spawn_signal_forwarder, TerminationSignals};
pub use supervisor::{LifecycleEvent, Supervisor, SupervisorHandle, SupervisorState};
pub use terminate::{
    graceful_termination_supported, select_terminator, GracefulKill, HardKill, Terminator,
};
