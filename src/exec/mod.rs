// src/exec/mod.rs

//! Process execution for builds.
//!
//! - [`command`] turns configured command strings into `tokio::process`
//!   commands, including `%s` substitution for the run command.
//! - [`build`] runs the build command and reports success or failure.
//! - [`notify`] runs the `--on-build` / `--on-fail` hooks after a build.

pub mod build;
pub mod command;
pub mod notify;

pub use build::{BuildRunner, ShellBuild};
pub use command::{CommandLine, CommandTemplate};
pub use notify::BuildHooks;
