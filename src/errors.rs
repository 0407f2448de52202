// src/errors.rs

//! Crate-wide error types.
//!
//! The process layer reports failures through [`DaemonError`] so the host can
//! tell recoverable problems apart from the fatal ones (a child that cannot be
//! started or stopped). Wiring code keeps using `anyhow` with context.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Graceful termination is not supported on this platform")]
    GracefulUnsupported,

    #[error("Could not start command '{command}': {source}")]
    ProcessStart {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Could not stop child process {pid:?}: {reason}. Aborting due to danger of infinite forks"
    )]
    Termination { pid: Option<u32>, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
