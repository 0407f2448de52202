// src/exec/command.rs

use std::fmt;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::errors::{DaemonError, Result};

/// Placeholder in the run command that receives the triggering path.
pub const PLACEHOLDER: &str = "%s";

/// A program plus its arguments, split on whitespace.
///
/// Commands are not run through a shell, so the process we signal is the
/// program itself and not an intermediate `sh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn parse(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| DaemonError::Config(format!("command {command:?} is empty")))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Build a `tokio` command with piped output and no stdin.
    ///
    /// `kill_on_drop` is set so a child can never outlive the handle that
    /// owns it.
    pub fn to_command(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// The run command with an optional `%s` slot for the changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    line: CommandLine,
}

impl CommandTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        Ok(Self {
            line: CommandLine::parse(template)?,
        })
    }

    /// Produce the command for a build triggered by `path`.
    ///
    /// The first `%s` (in the program or any argument) is replaced by `path`.
    /// Before the first change `path` is empty; an argument that was only the
    /// placeholder is then left out instead of being passed as `""`.
    pub fn render(&self, path: &str) -> CommandLine {
        let mut line = self.line.clone();

        if line.program.contains(PLACEHOLDER) {
            line.program = line.program.replacen(PLACEHOLDER, path, 1);
            return line;
        }

        if let Some(idx) = line.args.iter().position(|arg| arg.contains(PLACEHOLDER)) {
            let rendered = line.args[idx].replacen(PLACEHOLDER, path, 1);
            if rendered.is_empty() {
                line.args.remove(idx);
            } else {
                line.args[idx] = rendered;
            }
        }
        line
    }

    /// Whether the program itself is the bare placeholder.
    pub fn program_is_placeholder(&self) -> bool {
        self.line.program == PLACEHOLDER
    }
}

/// Build a command that runs `script` through the user's shell.
///
/// Used for hook commands, which may contain pipes or redirections.
pub fn shell_command(script: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(script);
        c
    } else {
        let shell = std::env::var("SHELL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "sh".to_string());
        let mut c = Command::new(shell);
        c.arg("-c").arg(script);
        c
    }
}
