//! File system watching for external document changes
//!
//! Uses the `notify` crate with debouncing. Each open document's path is
//! watched individually; debounced events are pushed straight into the
//! engine's event queue so they are processed in sequence with surface
//! messages instead of racing them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::Duration;

use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer};

use crate::messages::EngineEvent;

/// Watches the on-disk files behind open documents.
///
/// Events are debounced to coalesce rapid changes (e.g. editors that write
/// in multiple syscalls, git operations). Deletion is detected by the
/// watched path no longer existing when the debounced event fires.
pub struct FileWatcher {
    debouncer: Debouncer<notify::RecommendedWatcher>,
    watched: HashSet<PathBuf>,
}

impl FileWatcher {
    /// Create a watcher that forwards events into `events`.
    pub fn new(debounce: Duration, events: Sender<EngineEvent>) -> notify::Result<Self> {
        let debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            match result {
                Ok(batch) => {
                    for event in batch {
                        // Continuous events during active changes - the final
                        // debounced event will follow; skip to avoid spam.
                        if matches!(event.kind, DebouncedEventKind::AnyContinuous) {
                            continue;
                        }
                        let engine_event = if event.path.exists() {
                            EngineEvent::FileChanged(event.path)
                        } else {
                            EngineEvent::FileRemoved(event.path)
                        };
                        // The engine dropping its receiver means shutdown;
                        // nothing useful to do with the event then.
                        let _ = events.send(engine_event);
                    }
                }
                Err(e) => {
                    tracing::warn!("file watcher error: {:?}", e);
                }
            }
        })?;

        Ok(Self {
            debouncer,
            watched: HashSet::new(),
        })
    }

    /// Start watching one file. Watching the same path twice is a no-op.
    pub fn watch(&mut self, path: &Path) -> notify::Result<()> {
        if self.watched.contains(path) {
            return Ok(());
        }
        self.debouncer
            .watcher()
            .watch(path, notify::RecursiveMode::NonRecursive)?;
        self.watched.insert(path.to_path_buf());
        tracing::debug!("watching {}", path.display());
        Ok(())
    }

    /// Stop watching one file. Unknown paths are ignored.
    pub fn unwatch(&mut self, path: &Path) {
        if !self.watched.remove(path) {
            return;
        }
        if let Err(e) = self.debouncer.watcher().unwatch(path) {
            // The file may already be gone; notify reports that as an error
            // but there is nothing left to unwatch.
            tracing::debug!("unwatch {}: {:?}", path.display(), e);
        }
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.watched.contains(path)
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watched", &self.watched)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::mpsc;
    use std::thread;
    use tempfile::tempdir;

    const DEBOUNCE: Duration = Duration::from_millis(100);

    #[test]
    fn test_watch_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("a.md");
        fs::write(&file, "x").expect("write");

        let (tx, _rx) = mpsc::channel();
        let mut watcher = match FileWatcher::new(DEBOUNCE, tx) {
            Ok(w) => w,
            Err(_) => return, // environment without inotify support
        };

        watcher.watch(&file).expect("watch");
        watcher.watch(&file).expect("watch twice");
        assert!(watcher.is_watching(&file));
    }

    #[test]
    fn test_unwatch_unknown_path_is_noop() {
        let (tx, _rx) = mpsc::channel();
        let mut watcher = match FileWatcher::new(DEBOUNCE, tx) {
            Ok(w) => w,
            Err(_) => return,
        };
        watcher.unwatch(Path::new("/never/watched.md"));
    }

    #[test]
    #[ignore] // Flaky in CI - file system event timing varies by platform
    fn test_modification_forwards_file_changed() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("a.md");
        fs::write(&file, "before").expect("write");

        let (tx, rx) = mpsc::channel();
        let mut watcher = FileWatcher::new(DEBOUNCE, tx).expect("watcher");
        watcher.watch(&file).expect("watch");

        fs::write(&file, "after").expect("modify");
        thread::sleep(Duration::from_millis(500));

        let event = rx.try_recv().expect("expected an event");
        match event {
            EngineEvent::FileChanged(path) => assert_eq!(path, file),
            other => panic!("expected FileChanged, got {:?}", other),
        }
    }

    #[test]
    #[ignore] // Flaky in CI - file system event timing varies by platform
    fn test_deletion_forwards_file_removed() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("a.md");
        fs::write(&file, "x").expect("write");

        let (tx, rx) = mpsc::channel();
        let mut watcher = FileWatcher::new(DEBOUNCE, tx).expect("watcher");
        watcher.watch(&file).expect("watch");

        fs::remove_file(&file).expect("remove");
        thread::sleep(Duration::from_millis(500));

        let event = rx.try_recv().expect("expected an event");
        assert!(matches!(event, EngineEvent::FileRemoved(_)));
    }
}
