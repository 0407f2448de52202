// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::WatchSettings;
use crate::engine::ChangeEvent;
use crate::watch::patterns::PathFilter;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `notify` watcher alive. Dropping this handle stops
/// file watching, which in turn ends the change stream.
pub struct WatcherHandle {
    _inner: Box<dyn Watcher + Send>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Start watching every configured directory and forward passing changes
/// to `changes`.
///
/// Native notifications are used unless `settings.polling` is set.
pub fn spawn_watcher(
    settings: &WatchSettings,
    filter: PathFilter,
    changes: mpsc::Sender<ChangeEvent>,
) -> Result<WatcherHandle> {
    let roots: Vec<PathBuf> = settings
        .directories
        .iter()
        .map(|dir| dir.canonicalize().unwrap_or_else(|_| dir.clone()))
        .collect();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let handler = move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if event_tx.send(event).is_err() {
                trace!("dropping notify event; watcher loop has ended");
            }
        }
        Err(err) => warn!(error = %err, "file watch error"),
    };

    let mut watcher: Box<dyn Watcher + Send> = if settings.polling {
        let config = Config::default().with_poll_interval(settings.polling_interval);
        Box::new(PollWatcher::new(handler, config).context("creating polling watcher")?)
    } else {
        Box::new(RecommendedWatcher::new(handler, Config::default()).context("creating watcher")?)
    };

    let mode = if settings.recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };

    for root in &roots {
        watcher
            .watch(root, mode)
            .with_context(|| format!("watching {:?}", root))?;
        info!(dir = ?root, recursive = settings.recursive, polling = settings.polling, "watching for changes");
    }

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            trace!(?event, "received notify event");

            if !is_relevant(&event.kind) {
                continue;
            }

            for path in &event.paths {
                let Some(root) = owning_root(&roots, path) else {
                    debug!(path = ?path, "change outside watched directories; ignoring");
                    continue;
                };
                if !filter.accepts(root, path) {
                    trace!(path = ?path, "change filtered out");
                    continue;
                }

                debug!(path = ?path, "change detected");
                if changes
                    .send(ChangeEvent::new(path.display().to_string()))
                    .await
                    .is_err()
                {
                    // The scheduler is gone; no point keeping the loop alive.
                    debug!("change consumer stopped; file watcher loop ending");
                    return;
                }
            }
        }

        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Creations, content changes, renames and removals count; reads and pure
/// metadata updates do not.
fn is_relevant(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Longest watched root containing `path`.
fn owning_root<'a>(roots: &'a [PathBuf], path: &Path) -> Option<&'a Path> {
    roots
        .iter()
        .filter(|root| path.starts_with(root))
        .max_by_key(|root| root.components().count())
        .map(PathBuf::as_path)
}

#[cfg(test)]
mod tests {
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind};

    use super::*;

    #[test]
    fn only_content_changes_are_relevant() {
        assert!(is_relevant(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(!is_relevant(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime))));
        assert!(!is_relevant(&EventKind::Access(AccessKind::Read)));
    }

    #[test]
    fn nested_root_wins() {
        let roots = vec![PathBuf::from("/a"), PathBuf::from("/a/b")];
        assert_eq!(owning_root(&roots, Path::new("/a/b/c.rs")), Some(Path::new("/a/b")));
        assert_eq!(owning_root(&roots, Path::new("/a/x.rs")), Some(Path::new("/a")));
        assert_eq!(owning_root(&roots, Path::new("/z/x.rs")), None);
    }
}
