use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use buildwatch::exec::BuildRunner;

/// A fake build that:
/// - records the (Tokio) instant at which each build started
/// - returns scripted outcomes, then `true` once the script runs out
/// - optionally takes `duration` to "build".
#[derive(Clone, Default)]
pub struct RecordingBuild {
    started: Arc<Mutex<Vec<Instant>>>,
    outcomes: Arc<Mutex<VecDeque<bool>>>,
    duration: Duration,
}

impl RecordingBuild {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcomes(self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        self.outcomes.lock().unwrap().extend(outcomes);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Start instants of every build so far.
    pub fn starts(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.started.lock().unwrap().len()
    }
}

impl BuildRunner for RecordingBuild {
    fn run_build(&mut self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        let started = Arc::clone(&self.started);
        let outcomes = Arc::clone(&self.outcomes);
        let duration = self.duration;

        Box::pin(async move {
            started.lock().unwrap().push(Instant::now());
            if !duration.is_zero() {
                tokio::time::sleep(duration).await;
            }
            outcomes.lock().unwrap().pop_front().unwrap_or(true)
        })
    }
}
