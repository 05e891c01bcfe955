//! Document registry - owns every open document and its disk relationship
//!
//! The registry is the single writer for document content: surface edits,
//! saves, refreshes, and external file changes all land here, one event at a
//! time. It also runs the conflict policy when the disk changes behind a
//! dirty document.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use crate::fs_watcher::FileWatcher;
use crate::host::{ConflictChoice, ConflictPrompt, FileStore};
use crate::model::{Document, DocumentId, DocumentState, Mode, Position, Selection};
use crate::observer::{Listeners, Subscription};
use crate::recent::RecentDocuments;

/// Change notification fanned out to registry listeners
#[derive(Debug, Clone)]
pub enum DocumentChange {
    /// Content was (re)loaded or edited
    Content { id: DocumentId },
    /// Dirty/save state changed without a content reload
    State { id: DocumentId },
    /// Content was replaced from disk after an external change
    External { id: DocumentId },
    /// The document was closed; carries its final snapshot so a host can
    /// offer recovery (e.g. a dirty document whose file was deleted)
    Closed {
        id: DocumentId,
        last_state: Box<DocumentState>,
    },
}

impl DocumentChange {
    pub fn id(&self) -> &DocumentId {
        match self {
            DocumentChange::Content { id }
            | DocumentChange::State { id }
            | DocumentChange::External { id }
            | DocumentChange::Closed { id, .. } => id,
        }
    }
}

/// Per-document synchronization state against the disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Memory equals disk
    Clean,
    /// Unsaved local edits
    DirtyLocal,
    /// Disk diverged from unsaved edits; waiting on a user decision
    ConflictPending,
}

/// What an external disk change turned into
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalOutcome {
    /// Not an open document, an unreadable file, or our own write echoed back
    Ignored,
    /// Content was replaced from disk (auto-refresh or reload-from-conflict)
    Refreshed { id: DocumentId, content: String },
    /// Local edits kept; the disk event was discarded
    ConflictKept { id: DocumentId },
    /// The user chose to compare; the conflict stays pending and the host
    /// presents the diff
    ConflictPending { id: DocumentId },
}

/// Registry of all open documents
pub struct DocumentRegistry {
    documents: HashMap<DocumentId, Document>,
    by_path: HashMap<PathBuf, DocumentId>,
    conflicts: HashSet<DocumentId>,
    listeners: Listeners<DocumentChange>,
    store: Box<dyn FileStore>,
    watcher: Option<FileWatcher>,
    recent: RecentDocuments,
    default_mode: Mode,
}

impl DocumentRegistry {
    pub fn new(store: Box<dyn FileStore>) -> Self {
        Self {
            documents: HashMap::new(),
            by_path: HashMap::new(),
            conflicts: HashSet::new(),
            listeners: Listeners::new(),
            store,
            watcher: None,
            recent: RecentDocuments::in_memory(),
            default_mode: Mode::default(),
        }
    }

    pub fn with_watcher(mut self, watcher: Option<FileWatcher>) -> Self {
        self.watcher = watcher;
        self
    }

    pub(crate) fn set_recent(&mut self, recent: RecentDocuments) {
        self.recent = recent;
    }

    pub fn with_default_mode(mut self, mode: Mode) -> Self {
        self.default_mode = mode;
        self
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn document(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.documents.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &DocumentId> {
        self.documents.keys()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn recent(&self) -> &RecentDocuments {
        &self.recent
    }

    /// Synchronization state of one document, if open
    pub fn sync_state(&self, id: &DocumentId) -> Option<SyncState> {
        let doc = self.documents.get(id)?;
        Some(if self.conflicts.contains(id) {
            SyncState::ConflictPending
        } else if doc.is_dirty() {
            SyncState::DirtyLocal
        } else {
            SyncState::Clean
        })
    }

    // ========================================================================
    // Open / save / refresh / close
    // ========================================================================

    /// Open a document, reading it from disk.
    ///
    /// Idempotent: opening an already-open resource returns its id without
    /// touching disk. A file that does not exist yet opens as an empty
    /// document; any other read failure aborts the open.
    pub fn open(&mut self, path: &Path) -> io::Result<DocumentId> {
        let id = DocumentId::from_path(path);
        if self.documents.contains_key(&id) {
            return Ok(id);
        }

        let resolved = id.path();
        let content = match self.store.read(&resolved) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };

        let document = Document::new(id.clone(), resolved.clone(), &content, self.default_mode);
        self.documents.insert(id.clone(), document);
        self.by_path.insert(resolved.clone(), id.clone());

        if let Some(watcher) = &mut self.watcher {
            if let Err(e) = watcher.watch(&resolved) {
                tracing::warn!("could not watch {}: {:?}", resolved.display(), e);
            }
        }

        self.recent.add(&resolved);
        if let Err(e) = self.recent.save() {
            tracing::warn!("could not persist recent documents: {}", e);
        }

        tracing::info!("opened {}", id);
        self.listeners.emit(&DocumentChange::Content { id: id.clone() });
        Ok(id)
    }

    /// Write a dirty document to disk.
    ///
    /// Returns `Ok(false)` when there was nothing to save. On a write error
    /// the document stays dirty and the error is surfaced to the caller.
    pub fn save(&mut self, id: &DocumentId) -> io::Result<bool> {
        let Some(doc) = self.documents.get_mut(id) else {
            tracing::warn!("save for unknown document {}", id);
            return Ok(false);
        };
        if !doc.is_dirty() {
            return Ok(false);
        }

        let content = doc.content_string();
        self.store.write(doc.path(), &content)?;
        doc.mark_clean();
        // Writing resolves any pending conflict in favor of the local edits.
        self.conflicts.remove(id);

        tracing::debug!("saved {}", id);
        self.listeners.emit(&DocumentChange::State { id: id.clone() });
        Ok(true)
    }

    /// Save every dirty document. Failures are collected, never
    /// short-circuited: one failing save does not block the others.
    pub fn save_all(&mut self) -> Vec<(DocumentId, io::Error)> {
        let dirty: Vec<DocumentId> = self
            .documents
            .iter()
            .filter(|(_, doc)| doc.is_dirty())
            .map(|(id, _)| id.clone())
            .collect();

        let mut failures = Vec::new();
        for id in dirty {
            if let Err(e) = self.save(&id) {
                failures.push((id, e));
            }
        }
        failures
    }

    /// Re-read disk content, discarding local edits. Only call when it is
    /// safe to do so (the conflict policy does).
    pub fn refresh(&mut self, id: &DocumentId) -> io::Result<()> {
        let Some(doc) = self.documents.get_mut(id) else {
            tracing::warn!("refresh for unknown document {}", id);
            return Ok(());
        };

        let content = match self.store.read(doc.path()) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };
        doc.replace_from_disk(&content);
        self.conflicts.remove(id);

        self.listeners.emit(&DocumentChange::External { id: id.clone() });
        Ok(())
    }

    /// Close a document and dispose its watch. Returns false if it was not
    /// open (closing twice is a no-op).
    pub fn close(&mut self, id: &DocumentId) -> bool {
        let Some(doc) = self.documents.remove(id) else {
            return false;
        };
        let path = doc.path().to_path_buf();
        self.by_path.remove(&path);
        self.conflicts.remove(id);
        if let Some(watcher) = &mut self.watcher {
            watcher.unwatch(&path);
        }

        tracing::info!("closed {}", id);
        self.listeners.emit(&DocumentChange::Closed {
            id: id.clone(),
            last_state: Box::new(doc.state()),
        });
        true
    }

    /// Register a change listener. Dropping the handle unsubscribes.
    pub fn subscribe(
        &self,
        listener: impl Fn(&DocumentChange) + Send + Sync + 'static,
    ) -> Subscription {
        self.listeners.subscribe(listener)
    }

    // ========================================================================
    // Surface-driven mutation
    // ========================================================================

    /// Apply an edit that arrived from a surface.
    ///
    /// Returns whether the content actually changed, or `None` for an
    /// unknown document (logged, not an error - surfaces may race closure).
    pub fn apply_surface_edit(
        &mut self,
        id: &DocumentId,
        content: Option<&str>,
        is_dirty: Option<bool>,
    ) -> Option<bool> {
        let Some(doc) = self.documents.get_mut(id) else {
            tracing::warn!("edit for unknown document {}", id);
            return None;
        };

        let changed = content.map(|c| doc.update_content(c)).unwrap_or(false);
        match is_dirty {
            Some(true) => doc.mark_dirty(),
            Some(false) => doc.mark_clean(),
            None => {}
        }

        if changed {
            self.listeners.emit(&DocumentChange::Content { id: id.clone() });
        }
        Some(changed)
    }

    /// Update cursor/scroll/selection state. Returns false for an unknown
    /// document.
    pub fn set_view_state(
        &mut self,
        id: &DocumentId,
        cursor: Option<Position>,
        scroll_offset: Option<usize>,
        selections: Option<Vec<Selection>>,
    ) -> bool {
        let Some(doc) = self.documents.get_mut(id) else {
            return false;
        };
        if let Some(cursor) = cursor {
            doc.set_cursor(cursor);
        }
        if let Some(offset) = scroll_offset {
            doc.set_scroll_offset(offset);
        }
        if let Some(selections) = selections {
            doc.set_selections(selections);
        }
        true
    }

    pub(crate) fn set_document_mode(&mut self, id: &DocumentId, mode: Mode) -> bool {
        match self.documents.get_mut(id) {
            Some(doc) => {
                doc.set_mode(mode);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // External changes (conflict policy)
    // ========================================================================

    /// A watched file changed on disk.
    ///
    /// Clean documents auto-refresh. Dirty documents enter the conflict
    /// state machine: the prompt decides between reload, keep-local
    /// (also the dismissal default), and compare.
    pub fn external_change(
        &mut self,
        path: &Path,
        prompt: &dyn ConflictPrompt,
    ) -> ExternalOutcome {
        let Some(id) = self.by_path.get(path).cloned() else {
            tracing::debug!("ignoring change for unwatched path {}", path.display());
            return ExternalOutcome::Ignored;
        };
        let Some(doc) = self.documents.get(&id) else {
            return ExternalOutcome::Ignored;
        };

        if !doc.is_dirty() {
            // Auto-refresh, but swallow the echo of our own save: if disk
            // already matches memory there is nothing to deliver.
            let disk = match self.store.read(path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("could not re-read {}: {}", path.display(), e);
                    return ExternalOutcome::Ignored;
                }
            };
            let Some(doc) = self.documents.get_mut(&id) else {
                return ExternalOutcome::Ignored;
            };
            if *doc.content() == disk {
                return ExternalOutcome::Ignored;
            }
            doc.replace_from_disk(&disk);
            self.listeners.emit(&DocumentChange::External { id: id.clone() });
            return ExternalOutcome::Refreshed { id, content: disk };
        }

        self.conflicts.insert(id.clone());
        match prompt.choose(&id) {
            Some(ConflictChoice::Reload) => {
                if let Err(e) = self.refresh(&id) {
                    tracing::warn!("reload of {} failed: {}", id, e);
                    return ExternalOutcome::ConflictKept { id };
                }
                let content = self
                    .documents
                    .get(&id)
                    .map(|d| d.content_string())
                    .unwrap_or_default();
                ExternalOutcome::Refreshed { id, content }
            }
            Some(ConflictChoice::Compare) => {
                tracing::info!("conflict on {} pending comparison", id);
                ExternalOutcome::ConflictPending { id }
            }
            Some(ConflictChoice::KeepLocal) | None => {
                self.conflicts.remove(&id);
                tracing::info!("keeping local edits for {}", id);
                ExternalOutcome::ConflictKept { id }
            }
        }
    }

    /// A watched file was deleted. Deletion always wins: the document is
    /// closed regardless of dirty state, with no prompt.
    pub fn file_removed(&mut self, path: &Path) -> Option<DocumentId> {
        let id = self.by_path.get(path).cloned()?;
        self.close(&id);
        Some(id)
    }
}

impl std::fmt::Debug for DocumentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRegistry")
            .field("documents", &self.documents.len())
            .field("conflicts", &self.conflicts.len())
            .finish()
    }
}
