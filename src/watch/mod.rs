// src/watch/mod.rs

//! File watching and change filtering.
//!
//! This module is responsible for:
//! - Compiling the path regex and the include / exclude / exclude-dir globs.
//! - Wiring up a cross-platform filesystem watcher (`notify`), native or
//!   polling.
//!
//! It knows nothing about builds; it only turns filesystem changes into
//! [`ChangeEvent`](crate::engine::ChangeEvent)s.

pub mod patterns;
pub mod watcher;

pub use patterns::PathFilter;
pub use watcher::{spawn_watcher, WatcherHandle};
