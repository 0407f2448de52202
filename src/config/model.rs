// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default quiet period between the last change and the build.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(900);

/// Default time a graceful stop may take before the child is killed.
pub const DEFAULT_GRACEFUL_TIMEOUT: Duration = Duration::from_secs(3);

/// Default polling interval when `--polling` is used.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub const DEFAULT_PATTERN: &str = r"(.+\.rs|.+\.toml)$";
pub const DEFAULT_BUILD_COMMAND: &str = "cargo build";
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &["target", ".git"];

/// Configuration file as read from TOML.
///
/// ```toml
/// [watch]
/// directories = ["src"]
/// exclude_dir = ["target"]
/// delay_ms = 500
///
/// [build]
/// command = "cargo build"
/// on_success = ["notify-send built"]
///
/// [run]
/// command = "./target/debug/server %s"
/// stop_before_build = false
/// graceful_kill = true
/// graceful_timeout_secs = 3
/// ```
///
/// Every field is optional; anything left out falls back to the CLI flag or
/// the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub watch: WatchSection,
    pub build: BuildSection,
    pub run: RunSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchSection {
    pub directories: Vec<String>,
    pub recursive: Option<bool>,
    pub pattern: Option<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub exclude_dir: Option<Vec<String>>,
    pub polling: bool,
    pub polling_interval_ms: Option<u64>,
    pub delay_ms: Option<u64>,
}

/// `[build]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSection {
    pub command: Option<String>,
    pub directory: Option<String>,
    pub on_success: Vec<String>,
    pub on_failure: Vec<String>,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    pub command: Option<String>,
    pub directory: Option<String>,
    pub stop_before_build: bool,
    pub graceful_kill: bool,
    pub graceful_timeout_secs: Option<u64>,
    pub log_prefix: Option<bool>,
}

/// Fully resolved configuration.
///
/// Built once at startup by [`resolve`](crate::config::loader::resolve) and
/// never mutated afterwards. Each component receives the section it needs.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub watch: WatchSettings,
    pub debounce: Duration,
    pub build: BuildSettings,
    /// `None` when no run command is configured; build outcomes are then
    /// drained without supervising anything.
    pub run: Option<RunSettings>,
}

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub directories: Vec<PathBuf>,
    pub recursive: bool,
    pub pattern: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub exclude_dir: Vec<String>,
    pub polling: bool,
    pub polling_interval: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            directories: vec![PathBuf::from(".")],
            recursive: true,
            pattern: DEFAULT_PATTERN.to_string(),
            include: Vec::new(),
            exclude: Vec::new(),
            exclude_dir: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            polling: false,
            polling_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// `None` disables the build step; every cycle then succeeds.
    pub command: Option<String>,
    pub directory: PathBuf,
    pub on_success: Vec<String>,
    pub on_failure: Vec<String>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            command: Some(DEFAULT_BUILD_COMMAND.to_string()),
            directory: PathBuf::from("."),
            on_success: Vec::new(),
            on_failure: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Command template; the first `%s` receives the triggering path.
    pub command: String,
    pub directory: PathBuf,
    pub stop: StopTiming,
    pub termination: TerminationMode,
    /// Tag child output lines with `stdout:` / `stderr:`.
    pub label_output: bool,
}

impl RunSettings {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            directory: PathBuf::from("."),
            stop: StopTiming::default(),
            termination: TerminationMode::default(),
            label_output: true,
        }
    }
}

/// When the running child is stopped relative to a new build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopTiming {
    /// Keep the child running until the new build has succeeded.
    #[default]
    AfterBuild,
    /// Stop the child as soon as a build starts, whatever its outcome.
    BeforeBuild,
}

/// How a running child is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminationMode {
    /// Kill immediately.
    #[default]
    Hard,
    /// Ask politely, then kill once `timeout` has elapsed.
    Graceful { timeout: Duration },
}
