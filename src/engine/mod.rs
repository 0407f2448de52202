// src/engine/mod.rs

//! Build orchestration for buildwatch.
//!
//! This module ties together:
//! - the event types flowing between the watcher, the scheduler and the
//!   process supervisor
//! - the debounce scheduler that turns bursts of changes into single builds
//! - the sink that drains build signals when no run command is configured

pub mod debounce;
pub mod events;
pub mod sink;

pub use debounce::DebounceScheduler;
pub use events::{BuildOutcome, BuildSignal, ChangeEvent};
pub use sink::spawn_sink;
