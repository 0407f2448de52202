// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Every option is optional so that values coming from a `--config` TOML file
//! can be told apart from values given on the command line. Resolution into a
//! single [`DaemonConfig`](crate::config::DaemonConfig) happens in
//! [`config::loader`](crate::config::loader).

use clap::{ArgAction, Parser, ValueEnum};

/// Command-line arguments for `buildwatch`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "buildwatch",
    version,
    about = "Rebuild on file changes and keep the latest build running.",
    long_about = None
)]
pub struct CliArgs {
    /// Optional TOML file with `[watch]`, `[build]` and `[run]` sections.
    ///
    /// Command-line flags override values from the file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Directory to watch for changes (repeatable).
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    pub directories: Vec<String>,

    /// Watch subdirectories recursively.
    #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
    pub recursive: Option<bool>,

    /// Regex matched against the full path of a changed file.
    #[arg(long, value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Also watch files whose basename matches this glob (repeatable).
    #[arg(long = "include", value_name = "GLOB")]
    pub include: Vec<String>,

    /// Ignore files whose basename matches this glob (repeatable).
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Ignore directories matching this glob (repeatable).
    #[arg(long = "exclude-dir", value_name = "GLOB")]
    pub exclude_dir: Vec<String>,

    /// Poll the filesystem instead of using native notifications.
    #[arg(long)]
    pub polling: bool,

    /// Polling interval in milliseconds.
    #[arg(long, value_name = "MS")]
    pub polling_interval: Option<u64>,

    /// Quiet period in milliseconds before a burst of changes triggers a build.
    #[arg(long, value_name = "MS")]
    pub delay: Option<u64>,

    /// Command to rebuild after changes. An empty string disables building.
    #[arg(long, value_name = "CMD")]
    pub build: Option<String>,

    /// Working directory for the build command.
    #[arg(long, value_name = "DIR")]
    pub build_dir: Option<String>,

    /// Command to run and restart after every successful build.
    ///
    /// The first `%s` is replaced by the path that triggered the build.
    #[arg(long, value_name = "CMD")]
    pub command: Option<String>,

    /// Working directory for the run command.
    #[arg(long, value_name = "DIR")]
    pub run_dir: Option<String>,

    /// Stop the running command before the build starts instead of after it
    /// succeeds.
    #[arg(long)]
    pub command_stop: bool,

    /// Send a termination request before killing the running command.
    #[arg(long)]
    pub graceful_kill: bool,

    /// Seconds to wait for a graceful stop before killing.
    #[arg(long, value_name = "SECS")]
    pub graceful_timeout: Option<u64>,

    /// Prefix command output lines with `stdout:` / `stderr:`.
    #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
    pub log_prefix: Option<bool>,

    /// Run this shell command after a successful build (repeatable).
    #[arg(long = "on-build", value_name = "CMD")]
    pub on_build: Vec<String>,

    /// Run this shell command after a failed build (repeatable).
    #[arg(long = "on-fail", value_name = "CMD")]
    pub on_fail: Vec<String>,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the configuration, but don't watch or run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeatable_and_valued_flags() {
        let args = CliArgs::try_parse_from([
            "buildwatch",
            "-d",
            "src",
            "--directory",
            "lib",
            "--recursive",
            "false",
            "--exclude-dir",
            ".git",
            "--command",
            "./server --port 8080",
            "--graceful-kill",
            "--graceful-timeout",
            "5",
            "--log-prefix",
            "false",
        ])
        .expect("valid arguments");

        assert_eq!(args.directories, vec!["src", "lib"]);
        assert_eq!(args.recursive, Some(false));
        assert_eq!(args.exclude_dir, vec![".git"]);
        assert_eq!(args.command.as_deref(), Some("./server --port 8080"));
        assert!(args.graceful_kill);
        assert_eq!(args.graceful_timeout, Some(5));
        assert_eq!(args.log_prefix, Some(false));
        assert!(!args.command_stop);
    }

    #[test]
    fn unset_options_stay_none() {
        let args = CliArgs::try_parse_from(["buildwatch"]).expect("valid arguments");
        assert!(args.build.is_none());
        assert!(args.recursive.is_none());
        assert!(args.delay.is_none());
        assert!(args.directories.is_empty());
    }
}
