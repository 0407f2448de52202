// src/config/mod.rs

//! Configuration loading and validation for buildwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed file model and the resolved, immutable runtime
//!   configuration (`model.rs`).
//! - Merge defaults, an optional config file and CLI flags (`loader.rs`).
//! - Validate everything that must fail at startup (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve};
pub use model::{
    BuildSettings, DaemonConfig, FileConfig, RunSettings, StopTiming, TerminationMode,
    WatchSettings,
};
pub use validate::validate_config;
