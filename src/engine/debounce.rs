// src/engine/debounce.rs

use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace};

use crate::engine::events::{BuildOutcome, BuildSignal, ChangeEvent};
use crate::exec::BuildRunner;

/// Coalesces bursts of change events into single build cycles.
///
/// Every change re-arms a timer `quiet` into the future. When the timer fires
/// without another change having arrived, one build runs: `Started` is
/// published with the latest path, the build is awaited, then `Finished`
/// carries the outcome. The timer stays disarmed until the next change.
///
/// The timer starts armed, so one build runs at startup with an empty
/// trigger path.
///
/// Builds are awaited inline, so they never overlap; changes arriving during
/// a build wait in the channel and re-arm the timer once it is done.
pub struct DebounceScheduler<B: BuildRunner> {
    quiet: Duration,
    builder: B,
    changes: mpsc::Receiver<ChangeEvent>,
    signals: mpsc::Sender<BuildSignal>,
}

impl<B: BuildRunner> DebounceScheduler<B> {
    pub fn new(
        quiet: Duration,
        builder: B,
        changes: mpsc::Receiver<ChangeEvent>,
        signals: mpsc::Sender<BuildSignal>,
    ) -> Self {
        Self {
            quiet,
            builder,
            changes,
            signals,
        }
    }

    /// Main loop. Returns when the change stream ends, or with an error when
    /// nobody is listening for build signals any more.
    pub async fn run(mut self) -> Result<()> {
        info!(quiet_ms = self.quiet.as_millis() as u64, "build scheduler started");

        let mut deadline = Some(Instant::now() + self.quiet);
        let mut latest = String::new();

        loop {
            tokio::select! {
                event = self.changes.recv() => match event {
                    Some(event) => {
                        trace!(path = %event.path, "change received; re-arming build timer");
                        latest = event.path;
                        deadline = Some(Instant::now() + self.quiet);
                    }
                    None => {
                        info!("change stream closed; build scheduler stopping");
                        return Ok(());
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    self.run_cycle(&latest).await?;
                }
            }
        }
    }

    async fn run_cycle(&mut self, trigger: &str) -> Result<()> {
        debug!(trigger = %trigger, "quiet period elapsed; starting build cycle");

        self.publish(BuildSignal::Started {
            trigger: trigger.to_string(),
        })
        .await?;

        let success = self.builder.run_build().await;

        self.publish(BuildSignal::Finished(BuildOutcome {
            success,
            trigger: trigger.to_string(),
        }))
        .await
    }

    async fn publish(&self, signal: BuildSignal) -> Result<()> {
        self.signals
            .send(signal)
            .await
            .map_err(|_| anyhow!("build signal consumer stopped"))
    }
}
