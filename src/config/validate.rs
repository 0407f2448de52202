// src/config/validate.rs

use anyhow::{anyhow, Context, Result};
use globset::Glob;
use regex::Regex;

use crate::config::model::{DaemonConfig, RunSettings, TerminationMode};
use crate::errors::DaemonError;
use crate::exec::command::{CommandTemplate, PLACEHOLDER};
use crate::process::terminate::graceful_termination_supported;

/// Run semantic validation against a resolved configuration.
///
/// This checks:
/// - there is at least one watched directory and every one of them exists
/// - the quiet interval is non-zero
/// - the path regex and every glob compile
/// - the run command has at most one `%s` placeholder and a program to run
/// - graceful termination is only requested where the platform supports it,
///   and with a non-zero timeout
///
/// Everything in here is fatal: the daemon exits before it starts watching.
pub fn validate_config(cfg: &DaemonConfig) -> Result<()> {
    validate_watch(cfg)?;
    validate_build(cfg)?;
    if let Some(run) = &cfg.run {
        validate_run(run)?;
    }
    Ok(())
}

fn validate_watch(cfg: &DaemonConfig) -> Result<()> {
    if cfg.watch.directories.is_empty() {
        return Err(anyhow!("at least one directory to watch is required"));
    }

    for dir in &cfg.watch.directories {
        if !dir.is_dir() {
            return Err(anyhow!("watched directory {:?} does not exist", dir));
        }
    }

    if cfg.debounce.is_zero() {
        return Err(anyhow!("the debounce delay must be greater than zero"));
    }

    if cfg.watch.polling && cfg.watch.polling_interval.is_zero() {
        return Err(anyhow!("the polling interval must be greater than zero"));
    }

    Regex::new(&cfg.watch.pattern)
        .with_context(|| format!("invalid file pattern {:?}", cfg.watch.pattern))?;

    let globs = cfg
        .watch
        .include
        .iter()
        .chain(&cfg.watch.exclude)
        .chain(&cfg.watch.exclude_dir);
    for pat in globs {
        Glob::new(pat).with_context(|| format!("invalid glob pattern {pat:?}"))?;
    }

    Ok(())
}

fn validate_build(cfg: &DaemonConfig) -> Result<()> {
    if let Some(cmd) = &cfg.build.command {
        if !cfg.build.directory.is_dir() {
            return Err(anyhow!(
                "build directory {:?} does not exist (build command {cmd:?})",
                cfg.build.directory
            ));
        }
    }
    Ok(())
}

fn validate_run(run: &RunSettings) -> Result<()> {
    let placeholders = run.command.matches(PLACEHOLDER).count();
    if placeholders > 1 {
        return Err(DaemonError::Config(format!(
            "run command {:?} has {placeholders} `{PLACEHOLDER}` placeholders; at most one is allowed",
            run.command
        ))
        .into());
    }

    if CommandTemplate::parse(&run.command)?.program_is_placeholder() {
        return Err(DaemonError::Config(format!(
            "run command {:?} has no program before the first change; `{PLACEHOLDER}` cannot be the program",
            run.command
        ))
        .into());
    }

    if let TerminationMode::Graceful { timeout } = run.termination {
        if !graceful_termination_supported() {
            return Err(DaemonError::GracefulUnsupported.into());
        }
        if timeout.is_zero() {
            return Err(anyhow!("the graceful kill timeout must be greater than zero"));
        }
    }

    Ok(())
}
