// SPDX-License-Identifier: MIT OR Apache-2.0
//! File system watcher for the state file.
//!
//! Editors save files in different ways (truncate and write, write to a
//! temporary file and rename), so the watcher observes the file's parent
//! directory and reports debounced changes to the watched file names only.

use notify_debouncer_full::{
    new_debouncer,
    notify::{self, EventKind, RecommendedWatcher, RecursiveMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Events emitted by the file watcher
#[derive(Debug, Clone, PartialEq)]
pub enum FileEvent {
    /// A watched file was created, written or renamed into place
    Changed(PathBuf),
    /// A watched file was deleted
    Deleted(PathBuf),
    /// The watcher reported an error
    Error(String),
}

/// Configuration for the file watcher
#[derive(Debug, Clone)]
pub struct FileWatcherConfig {
    /// Debounce duration for events
    pub debounce_duration: Duration,
}

impl Default for FileWatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(250),
        }
    }
}

/// Map a raw event to watcher events for the watched files it touches
fn classify(kind: &EventKind, paths: &[PathBuf], watched: &HashSet<PathBuf>) -> Vec<FileEvent> {
    let hits = paths.iter().filter(|p| watched.contains(*p)).cloned();
    match kind {
        EventKind::Create(_) | EventKind::Modify(_) => hits.map(FileEvent::Changed).collect(),
        EventKind::Remove(_) => hits.map(FileEvent::Deleted).collect(),
        EventKind::Any | EventKind::Access(_) | EventKind::Other => Vec::new(),
    }
}

/// Debounced watcher over individual files
pub struct FileWatcher {
    watcher: Debouncer<RecommendedWatcher, RecommendedCache>,
    watched_files: Arc<RwLock<HashSet<PathBuf>>>,
}

impl FileWatcher {
    /// Create a watcher that sends its events to `event_tx`
    pub fn new(config: FileWatcherConfig, event_tx: mpsc::UnboundedSender<FileEvent>) -> Result<Self, notify::Error> {
        let watched_files = Arc::new(RwLock::new(HashSet::new()));
        let filter = Arc::clone(&watched_files);

        let watcher = new_debouncer(config.debounce_duration, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let watched = filter.read();
                    for event in events {
                        for file_event in classify(&event.kind, &event.paths, &watched) {
                            let _ = event_tx.send(file_event);
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        let _ = event_tx.send(FileEvent::Error(error.to_string()));
                    }
                }
            }
        })?;

        Ok(Self { watcher, watched_files })
    }

    /// Watch a file for changes
    pub fn watch(&mut self, path: impl AsRef<Path>) -> Result<(), notify::Error> {
        let path = absolute(path.as_ref());
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        self.watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        self.watched_files.write().insert(path.clone());
        tracing::info!("Watching {} for changes", path.display());
        Ok(())
    }
}

/// Resolve a path against the working directory so it matches what the
/// watcher reports
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify_debouncer_full::notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn watched() -> HashSet<PathBuf> {
        HashSet::from([PathBuf::from("/shows/state.json")])
    }

    #[test]
    fn test_config_default() {
        let config = FileWatcherConfig::default();
        assert_eq!(config.debounce_duration, Duration::from_millis(250));
    }

    #[test]
    fn test_classify_filters_unwatched_paths() {
        let paths = vec![PathBuf::from("/shows/state.json"), PathBuf::from("/shows/other.json")];
        let events = classify(&EventKind::Modify(ModifyKind::Any), &paths, &watched());
        assert_eq!(events, vec![FileEvent::Changed(PathBuf::from("/shows/state.json"))]);

        let events = classify(&EventKind::Create(CreateKind::File), &paths[1..], &watched());
        assert!(events.is_empty());
    }

    #[test]
    fn test_classify_removal() {
        let paths = vec![PathBuf::from("/shows/state.json")];
        let events = classify(&EventKind::Remove(RemoveKind::File), &paths, &watched());
        assert_eq!(events, vec![FileEvent::Deleted(PathBuf::from("/shows/state.json"))]);
        assert!(classify(&EventKind::Other, &paths, &watched()).is_empty());
    }

    #[test]
    fn test_absolute_keeps_absolute_paths() {
        assert_eq!(absolute(Path::new("/shows/state.json")), PathBuf::from("/shows/state.json"));
        assert!(absolute(Path::new("state.json")).is_absolute());
    }
}
