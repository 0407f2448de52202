// src/engine/events.rs

/// A changed file that already passed include/exclude filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: String,
}

impl ChangeEvent {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Result of one build cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub success: bool,
    /// Path of the change that triggered the build. Empty for the startup
    /// build, which no change triggered.
    pub trigger: String,
}

/// Signals published by the scheduler for every build cycle.
///
/// For each cycle `Started` is always sent before `Finished`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildSignal {
    Started { trigger: String },
    Finished(BuildOutcome),
}
