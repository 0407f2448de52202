// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod process;
pub mod watch;

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::{DaemonConfig, StopTiming, TerminationMode};
use crate::engine::{spawn_sink, BuildSignal, ChangeEvent, DebounceScheduler};
use crate::exec::ShellBuild;
use crate::process::{
    select_terminator, spawn_output_logger, spawn_signal_forwarder, Supervisor,
    TerminationSignals,
};
use crate::watch::{spawn_watcher, PathFilter};

/// Capacity of the watcher -> scheduler channel. Changes that arrive while a
/// build runs wait here; the watcher task blocks once it is full.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config resolution and validation (fatal errors stop us here)
/// - file watcher -> debounce scheduler -> build
/// - process supervisor + output logger (or a sink without `--command`)
/// - the signal forwarder
///
/// Returns `Ok` after a termination signal once the child is stopped.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let terminator = cfg
        .run
        .as_ref()
        .map(|run| select_terminator(run.termination))
        .transpose()?;

    let signals = TerminationSignals::install().context("installing signal handlers")?;

    let (change_tx, change_rx) = mpsc::channel::<ChangeEvent>(CHANGE_CHANNEL_CAPACITY);
    let (signal_tx, signal_rx) = mpsc::channel::<BuildSignal>(1);

    let filter = PathFilter::from_settings(&cfg.watch)?;
    let _watcher = spawn_watcher(&cfg.watch, filter, change_tx)?;

    let builder = ShellBuild::new(cfg.build.clone())?;
    let scheduler = DebounceScheduler::new(cfg.debounce, builder, change_rx, signal_tx);
    let mut scheduler_task = tokio::spawn(scheduler.run());

    let (supervisor_task, handle) = match (cfg.run.clone(), terminator) {
        (Some(run), Some(terminator)) => {
            let output = spawn_output_logger(run.label_output);
            let (supervisor, handle) = Supervisor::new(run, terminator, signal_rx, output)?;
            (Some(tokio::spawn(supervisor.run())), Some(handle))
        }
        _ => {
            spawn_sink(signal_rx);
            (None, None)
        }
    };

    let mut forwarder = spawn_signal_forwarder(signals, handle);
    let supervisor_done = supervised(supervisor_task);
    tokio::pin!(supervisor_done);

    tokio::select! {
        biased;

        res = &mut forwarder => {
            res.context("signal forwarder panicked")??;
            info!("child stopped; exiting");
            Ok(())
        }
        res = &mut supervisor_done => res,
        res = &mut scheduler_task => {
            res.context("build scheduler panicked")??;
            Err(anyhow!("file watcher stopped unexpectedly"))
        }
    }
}

/// Await the supervisor task, or never resolve when there is none.
async fn supervised(task: Option<JoinHandle<errors::Result<()>>>) -> Result<()> {
    match task {
        Some(task) => {
            task.await.context("process supervisor panicked")??;
            Ok(())
        }
        None => std::future::pending().await,
    }
}

/// Simple dry-run output: print the resolved configuration.
fn print_dry_run(cfg: &DaemonConfig) {
    println!("buildwatch dry-run");
    println!("  debounce = {}ms", cfg.debounce.as_millis());
    println!();

    println!("watch:");
    for dir in &cfg.watch.directories {
        println!("  - {}", dir.display());
    }
    println!("      recursive: {}", cfg.watch.recursive);
    println!("      pattern: {}", cfg.watch.pattern);
    if !cfg.watch.include.is_empty() {
        println!("      include: {:?}", cfg.watch.include);
    }
    if !cfg.watch.exclude.is_empty() {
        println!("      exclude: {:?}", cfg.watch.exclude);
    }
    if !cfg.watch.exclude_dir.is_empty() {
        println!("      exclude_dir: {:?}", cfg.watch.exclude_dir);
    }
    if cfg.watch.polling {
        println!("      polling: every {}ms", cfg.watch.polling_interval.as_millis());
    }
    println!();

    println!("build:");
    match &cfg.build.command {
        Some(cmd) => println!("  cmd: {cmd}"),
        None => println!("  cmd: (none)"),
    }
    println!("  dir: {}", cfg.build.directory.display());
    for hook in &cfg.build.on_success {
        println!("  on_success: {hook}");
    }
    for hook in &cfg.build.on_failure {
        println!("  on_failure: {hook}");
    }
    println!();

    match &cfg.run {
        Some(run) => {
            println!("run:");
            println!("  cmd: {}", run.command);
            println!("  dir: {}", run.directory.display());
            let stop = match run.stop {
                StopTiming::AfterBuild => "after successful build",
                StopTiming::BeforeBuild => "before build",
            };
            println!("  stop: {stop}");
            match run.termination {
                TerminationMode::Hard => println!("  termination: hard"),
                TerminationMode::Graceful { timeout } => {
                    println!("  termination: graceful ({}s timeout)", timeout.as_secs())
                }
            }
            println!("  label_output: {}", run.label_output);
        }
        None => println!("run: (no command)"),
    }

    debug!("dry-run complete (no execution)");
}
