// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cli::CliArgs;
use crate::config::model::{
    BuildSettings, DaemonConfig, FileConfig, RunSettings, StopTiming, TerminationMode,
    WatchSettings, DEFAULT_BUILD_COMMAND, DEFAULT_DEBOUNCE, DEFAULT_GRACEFUL_TIMEOUT,
};
use crate::config::validate::validate_config;
use crate::errors::DaemonError;

/// Load a configuration file from a given path.
///
/// This only performs TOML deserialization; semantic checks happen in
/// [`validate_config`] once the file has been merged with the CLI flags.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<FileConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .map_err(DaemonError::from)
        .with_context(|| format!("reading config file at {:?}", path))?;

    let config: FileConfig = toml::from_str(&contents)
        .map_err(DaemonError::from)
        .with_context(|| format!("parsing TOML config from {:?}", path))?;

    Ok(config)
}

/// Build the runtime configuration from the CLI flags, reading `--config`
/// first if one was given, and validate it.
///
/// This is the entry point used by `lib.rs`; any error here aborts the daemon
/// before a watcher or child process exists.
pub fn load_and_validate(args: &CliArgs) -> Result<DaemonConfig> {
    let file = match &args.config {
        Some(path) => load_from_path(path)?,
        None => FileConfig::default(),
    };

    let config = resolve(args, &file);
    validate_config(&config)?;
    Ok(config)
}

/// Merge built-in defaults, the config file and CLI flags.
///
/// CLI values win over file values, which win over defaults. List options
/// given on the command line replace the file's list rather than extending
/// it. Boolean switches that only exist as flags (`--polling`,
/// `--command-stop`, `--graceful-kill`) can only turn a setting on.
pub fn resolve(args: &CliArgs, file: &FileConfig) -> DaemonConfig {
    let defaults = WatchSettings::default();

    let directories: Vec<PathBuf> = pick_list(&args.directories, &file.watch.directories)
        .map(|dirs| dirs.iter().map(PathBuf::from).collect())
        .unwrap_or(defaults.directories);

    let watch = WatchSettings {
        recursive: args
            .recursive
            .or(file.watch.recursive)
            .unwrap_or(defaults.recursive),
        pattern: args
            .pattern
            .clone()
            .or_else(|| file.watch.pattern.clone())
            .unwrap_or(defaults.pattern),
        include: pick_list(&args.include, &file.watch.include)
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
        exclude: pick_list(&args.exclude, &file.watch.exclude)
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
        exclude_dir: if !args.exclude_dir.is_empty() {
            args.exclude_dir.clone()
        } else {
            file.watch.exclude_dir.clone().unwrap_or(defaults.exclude_dir)
        },
        polling: args.polling || file.watch.polling,
        polling_interval: args
            .polling_interval
            .or(file.watch.polling_interval_ms)
            .map(Duration::from_millis)
            .unwrap_or(defaults.polling_interval),
        directories,
    };

    let debounce = args
        .delay
        .or(file.watch.delay_ms)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_DEBOUNCE);

    let build_command = args
        .build
        .clone()
        .or_else(|| file.build.command.clone())
        .unwrap_or_else(|| DEFAULT_BUILD_COMMAND.to_string());

    let build = BuildSettings {
        command: non_blank(build_command),
        directory: args
            .build_dir
            .clone()
            .or_else(|| file.build.directory.clone())
            .map(PathBuf::from)
            .unwrap_or_else(|| first_directory(&watch)),
        on_success: pick_list(&args.on_build, &file.build.on_success)
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
        on_failure: pick_list(&args.on_fail, &file.build.on_failure)
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
    };

    let run = args
        .command
        .clone()
        .or_else(|| file.run.command.clone())
        .and_then(non_blank)
        .map(|command| {
            let graceful = args.graceful_kill || file.run.graceful_kill;
            let timeout = args
                .graceful_timeout
                .or(file.run.graceful_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_GRACEFUL_TIMEOUT);

            RunSettings {
                command,
                directory: args
                    .run_dir
                    .clone()
                    .or_else(|| file.run.directory.clone())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(".")),
                stop: if args.command_stop || file.run.stop_before_build {
                    StopTiming::BeforeBuild
                } else {
                    StopTiming::AfterBuild
                },
                termination: if graceful {
                    TerminationMode::Graceful { timeout }
                } else {
                    TerminationMode::Hard
                },
                label_output: args.log_prefix.or(file.run.log_prefix).unwrap_or(true),
            }
        });

    DaemonConfig {
        watch,
        debounce,
        build,
        run,
    }
}

fn pick_list<'a>(cli: &'a [String], file: &'a [String]) -> Option<&'a [String]> {
    if !cli.is_empty() {
        Some(cli)
    } else if !file.is_empty() {
        Some(file)
    } else {
        None
    }
}

fn non_blank(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

fn first_directory(watch: &WatchSettings) -> PathBuf {
    watch
        .directories
        .first()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."))
}
