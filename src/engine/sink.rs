// src/engine/sink.rs

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::engine::events::BuildSignal;

/// Drain build signals when there is no process to supervise.
///
/// Keeps the scheduler unblocked; outcomes are only logged.
pub fn spawn_sink(mut signals: mpsc::Receiver<BuildSignal>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(signal) = signals.recv().await {
            debug!(?signal, "build signal (no run command configured)");
        }
    })
}
