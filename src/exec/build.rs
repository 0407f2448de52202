// src/exec/build.rs

//! Build execution.
//!
//! The debounce scheduler talks to a [`BuildRunner`] instead of spawning
//! processes itself, which keeps timing tests free of real builds. The
//! production implementation is [`ShellBuild`].

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, error, info};

use crate::config::BuildSettings;
use crate::errors::Result;
use crate::exec::command::CommandLine;
use crate::exec::notify::BuildHooks;

/// Runs one build and reports whether it succeeded.
///
/// The scheduler awaits each call before reading further change events, so
/// implementations never see two overlapping builds.
pub trait BuildRunner: Send {
    fn run_build(&mut self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// Runs the configured build command, then the matching hooks.
#[derive(Debug)]
pub struct ShellBuild {
    settings: BuildSettings,
    line: Option<CommandLine>,
    hooks: BuildHooks,
}

impl ShellBuild {
    pub fn new(settings: BuildSettings) -> Result<Self> {
        let line = settings
            .command
            .as_deref()
            .map(CommandLine::parse)
            .transpose()?;
        let hooks = BuildHooks::new(settings.on_success.clone(), settings.on_failure.clone());
        Ok(Self {
            settings,
            line,
            hooks,
        })
    }

    async fn build(&self) -> bool {
        let Some(line) = &self.line else {
            debug!("no build command configured; treating build as successful");
            return true;
        };

        info!(cmd = %line, dir = ?self.settings.directory, "running build command");

        let output = match line.to_command(&self.settings.directory).output().await {
            Ok(output) => output,
            Err(err) => {
                error!(cmd = %line, error = %err, "could not start build command");
                return false;
            }
        };

        let captured = captured_output(&output.stdout, &output.stderr);

        if output.status.success() {
            info!("build ok");
            if !captured.trim().is_empty() {
                debug!("build output (stdout, then stderr):\n{}", captured.trim_end());
            }
            true
        } else {
            error!(
                exit_code = output.status.code().unwrap_or(-1),
                "error while building (stdout, then stderr):\n{}",
                captured.trim_end()
            );
            false
        }
    }
}

/// Build output as logged. The pipes are read separately, so this is all of
/// stdout followed by all of stderr.
fn captured_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut captured = String::from_utf8_lossy(stdout).into_owned();
    captured.push_str(&String::from_utf8_lossy(stderr));
    captured
}

impl BuildRunner for ShellBuild {
    fn run_build(&mut self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async move {
            let success = self.build().await;
            self.hooks.notify(success).await;
            success
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn settings(command: Option<&str>) -> BuildSettings {
        BuildSettings {
            command: command.map(str::to_string),
            directory: PathBuf::from("."),
            on_success: Vec::new(),
            on_failure: Vec::new(),
        }
    }

    #[test]
    fn captured_output_puts_stdout_before_stderr() {
        let text = captured_output(b"compiling\n", b"warning: unused\n");
        assert_eq!(text, "compiling\nwarning: unused\n");
        assert_eq!(captured_output(b"", b"\xffoops"), "\u{fffd}oops");
    }

    #[tokio::test]
    async fn zero_exit_is_success() {
        let mut build = ShellBuild::new(settings(Some("true"))).expect("valid");
        assert!(build.run_build().await);
    }

    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        let mut build = ShellBuild::new(settings(Some("false"))).expect("valid");
        assert!(!build.run_build().await);
    }

    #[tokio::test]
    async fn missing_program_is_failure() {
        let mut build =
            ShellBuild::new(settings(Some("./no-such-build-tool --flag"))).expect("valid");
        assert!(!build.run_build().await);
    }

    #[tokio::test]
    async fn no_command_is_success() {
        let mut build = ShellBuild::new(settings(None)).expect("valid");
        assert!(build.run_build().await);
    }

    #[tokio::test]
    async fn build_runs_in_configured_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut s = settings(Some("touch built.marker"));
        s.directory = dir.path().to_path_buf();

        let mut build = ShellBuild::new(s).expect("valid");
        assert!(build.run_build().await);
        assert!(dir.path().join("built.marker").exists());
    }
}
