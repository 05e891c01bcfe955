//! The synchronization engine - composition root and event loop
//!
//! Owns the document registry, mode tracker, surface registry, and host
//! collaborators, and processes every inbound surface message and file-watch
//! callback as one discrete, sequentially handled event. That sequencing is
//! the concurrency model: there is no locking anywhere because nothing here
//! ever runs concurrently with itself.

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use crate::commands::{self, CommandId};
use crate::config::EngineConfig;
use crate::fs_watcher::FileWatcher;
use crate::host::{CommandHost, ConflictPrompt, HostBridge, Notifier};
use crate::messages::{EngineEvent, RegistryMsg, SurfaceMsg};
use crate::mode::ModeTracker;
use crate::model::{DocumentId, Mode, Position};
use crate::recent::RecentDocuments;
use crate::registry::{DocumentRegistry, ExternalOutcome};
use crate::session::SessionStore;
use crate::surfaces::{
    RestoreOutcome, SurfaceConnection, SurfaceCreation, SurfaceId, SurfaceRegistry,
};

/// The multi-surface document synchronization engine.
///
/// Construct one per process, wire the host collaborators in, and either
/// call [`Engine::run`] on a dedicated thread or [`Engine::pump`] from an
/// existing loop.
pub struct Engine {
    config: EngineConfig,
    documents: DocumentRegistry,
    modes: ModeTracker,
    surfaces: SurfaceRegistry,
    prompt: Box<dyn ConflictPrompt>,
    commands: Box<dyn CommandHost>,
    notifier: Box<dyn Notifier>,
    sessions: SessionStore,
    events_tx: Sender<EngineEvent>,
    events_rx: Receiver<EngineEvent>,
}

impl Engine {
    pub fn new(config: EngineConfig, host: HostBridge) -> Self {
        let (events_tx, events_rx) = mpsc::channel();

        let watcher = match FileWatcher::new(
            Duration::from_millis(config.watch_debounce_ms),
            events_tx.clone(),
        ) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!("file watching unavailable: {:?}", e);
                None
            }
        };

        let documents = DocumentRegistry::new(host.store)
            .with_watcher(watcher)
            .with_default_mode(config.default_mode);
        let modes = ModeTracker::new(config.default_mode);
        let surfaces = SurfaceRegistry::new(events_tx.clone());

        Self {
            config,
            documents,
            modes,
            surfaces,
            prompt: host.prompt,
            commands: host.commands,
            notifier: host.notifier,
            sessions: SessionStore::in_memory(),
            events_tx,
            events_rx,
        }
    }

    /// Wire up on-disk recent/session stores (the binary does; tests and
    /// embedded hosts usually keep the in-memory defaults).
    pub fn with_persistence(mut self, recent: RecentDocuments, sessions: SessionStore) -> Self {
        self.documents.set_recent(recent);
        self.sessions = sessions;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn documents(&self) -> &DocumentRegistry {
        &self.documents
    }

    pub fn modes(&self) -> &ModeTracker {
        &self.modes
    }

    pub fn modes_mut(&mut self) -> &mut ModeTracker {
        &mut self.modes
    }

    pub fn surfaces(&self) -> &SurfaceRegistry {
        &self.surfaces
    }

    /// A sender into the engine's event queue, for hosts that need to inject
    /// events themselves (e.g. a shutdown signal).
    pub fn sender(&self) -> Sender<EngineEvent> {
        self.events_tx.clone()
    }

    // ========================================================================
    // Host-facing operations
    // ========================================================================

    /// Open a document and create (or refocus) a surface presenting it.
    pub fn open_surface(&mut self, path: &Path, mode: Mode) -> io::Result<SurfaceCreation> {
        self.surfaces.create_surface(&mut self.documents, path, mode)
    }

    /// Switch a document's presentation mode, preserving cursor and scroll.
    pub fn switch_mode(&mut self, id: &DocumentId, target: Mode) -> bool {
        self.modes.switch_mode(&mut self.documents, id, target)
    }

    /// Save every dirty document; failures are reported through the
    /// notifier, one each, and returned as a count.
    pub fn save_all(&mut self) -> usize {
        let failures = self.documents.save_all();
        for (id, e) in &failures {
            let name = self.document_name(id);
            self.notifier.error(&format!("Failed to save {}: {}", name, e));
        }
        failures.len()
    }

    /// Close a document, disposing its surfaces and mode state.
    pub fn close_document(&mut self, id: &DocumentId) -> bool {
        if !self.documents.close(id) {
            return false;
        }
        self.modes.forget(id);
        self.surfaces.dispose_for_document(id);
        true
    }

    /// Dispose one surface. Safe to call twice.
    pub fn dispose_surface(&mut self, id: SurfaceId) -> bool {
        self.surfaces.dispose(id)
    }

    /// Run a command as if `surface` had sent it over its channel.
    pub fn execute(&mut self, surface: SurfaceId, command: &str, args: Vec<serde_json::Value>) {
        self.handle_event(EngineEvent::Surface {
            surface,
            message: SurfaceMsg::ExecuteCommand {
                command: command.to_string(),
                args,
            },
        });
    }

    // ========================================================================
    // Session persistence
    // ========================================================================

    /// Snapshot every live surface into the session store.
    pub fn persist_sessions(&mut self) -> io::Result<()> {
        let states = self.surfaces.persistable_states(&self.documents);
        self.sessions.record(states)
    }

    /// Rebuild one surface from a persisted snapshot. Fails soft: an
    /// unusable snapshot leaves a placeholder in the surface and disposes
    /// it.
    pub fn restore_surface_state(
        &mut self,
        id: SurfaceId,
        state: serde_json::Value,
    ) -> RestoreOutcome {
        self.surfaces.restore_state(&mut self.documents, id, state)
    }

    /// Rebuild surfaces from the session store.
    ///
    /// Entries that no longer make sense are skipped (fail soft); the
    /// connections of successfully restored surfaces are returned for the
    /// host to run.
    pub fn restore_sessions(&mut self) -> Vec<SurfaceConnection> {
        let entries = self.sessions.surfaces.clone();
        let mut connections = Vec::new();

        for entry in entries {
            let path = PathBuf::from(&entry.resource_id);
            let creation = match self.surfaces.create_surface(&mut self.documents, &path, entry.mode)
            {
                Ok(creation) => creation,
                Err(e) => {
                    tracing::warn!("skipping session entry {}: {}", entry.resource_id, e);
                    continue;
                }
            };
            let id = creation.surface_id();

            let state = match serde_json::to_value(&entry) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!("unserializable session entry {}: {}", entry.resource_id, e);
                    self.surfaces.dispose(id);
                    continue;
                }
            };

            match self.surfaces.restore_state(&mut self.documents, id, state) {
                RestoreOutcome::Restored(_) => {
                    if let SurfaceCreation::Created(connection) = creation {
                        connections.push(connection);
                    }
                }
                RestoreOutcome::Failed => {}
            }
        }
        connections
    }

    // ========================================================================
    // Event loop
    // ========================================================================

    /// Process one event. Never panics out: a handler failure is logged and
    /// degrades that one operation, not the engine.
    pub fn handle_event(&mut self, event: EngineEvent) {
        let result = catch_unwind(AssertUnwindSafe(|| self.dispatch(event)));
        if result.is_err() {
            tracing::error!("event handler panicked; engine state preserved");
        }
    }

    /// Drain all pending events without blocking. Returns how many were
    /// processed.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if matches!(event, EngineEvent::Shutdown) {
                break;
            }
            self.handle_event(event);
            processed += 1;
        }
        processed
    }

    /// Block processing events until a `Shutdown` event arrives.
    ///
    /// The engine holds a sender itself, so the channel can only disconnect
    /// if something unusual happened; that also ends the loop.
    pub fn run(&mut self) {
        loop {
            match self.events_rx.recv() {
                Ok(EngineEvent::Shutdown) | Err(_) => break,
                Ok(event) => self.handle_event(event),
            }
        }
        tracing::info!("engine loop stopped");
    }

    fn dispatch(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Surface { surface, message } => self.on_surface_msg(surface, message),
            EngineEvent::FileChanged(path) => self.on_file_changed(&path),
            EngineEvent::FileRemoved(path) => self.on_file_removed(&path),
            EngineEvent::Shutdown => {}
        }
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    fn on_surface_msg(&mut self, surface: SurfaceId, message: SurfaceMsg) {
        let Some(document_id) = self.surfaces.document_of(surface) else {
            // Surfaces may legitimately race their own disposal.
            tracing::warn!("message from unknown {}: {:?}", surface, message);
            return;
        };

        match message {
            SurfaceMsg::Ready {} => {
                self.surfaces.mark_ready(&self.documents, surface);
            }
            SurfaceMsg::ContentChanged { content, is_dirty } => {
                if let Some(content) = content.as_deref() {
                    self.surfaces.note_edit(surface, content);
                }
                let changed =
                    self.documents
                        .apply_surface_edit(&document_id, content.as_deref(), is_dirty);
                if changed == Some(true) {
                    if let Some(content) = content {
                        // Everyone but the author; echoing back would loop.
                        self.surfaces
                            .broadcast_document_update(&document_id, &content, Some(surface));
                    }
                }
            }
            SurfaceMsg::SaveRequest { content } => {
                self.on_save_request(surface, &document_id, content);
            }
            SurfaceMsg::ExecuteCommand { command, args } => {
                self.on_command(surface, &document_id, &command, args);
            }
        }
    }

    fn on_save_request(&mut self, surface: SurfaceId, document_id: &DocumentId, content: String) {
        let changed = self
            .documents
            .apply_surface_edit(document_id, Some(&content), None);
        if changed.is_none() {
            return;
        }
        self.surfaces.note_edit(surface, &content);

        match self.documents.save(document_id) {
            Ok(_) => {
                self.surfaces.send_to(
                    surface,
                    RegistryMsg::ContentChanged {
                        content: None,
                        is_dirty: Some(false),
                        saved: Some(true),
                    },
                );
                if changed == Some(true) {
                    self.surfaces
                        .broadcast_document_update(document_id, &content, Some(surface));
                }
            }
            Err(e) => {
                // Dirty indicator stays as-is on the surface; no ack.
                let name = self.document_name(document_id);
                self.notifier.error(&format!("Failed to save {}: {}", name, e));
            }
        }
    }

    fn on_command(
        &mut self,
        surface: SurfaceId,
        document_id: &DocumentId,
        command: &str,
        args: Vec<serde_json::Value>,
    ) {
        match commands::lookup(command) {
            Some(CommandId::RefreshFromDisk) => match self.documents.refresh(document_id) {
                Ok(()) => {
                    if let Some(doc) = self.documents.document(document_id) {
                        let content = doc.content_string();
                        self.surfaces
                            .broadcast_document_update(document_id, &content, None);
                    }
                }
                Err(e) => {
                    let name = self.document_name(document_id);
                    self.notifier
                        .error(&format!("Failed to refresh {}: {}", name, e));
                }
            },
            Some(CommandId::OpenResource) => {
                let Some(path) = args.first().and_then(|v| v.as_str()) else {
                    tracing::warn!("facet.open without a path argument");
                    return;
                };
                if let Err(e) = self.documents.open(Path::new(path)) {
                    self.notifier.error(&format!("Failed to open {}: {}", path, e));
                }
            }
            Some(CommandId::Save) => match self.documents.save(document_id) {
                Ok(_) => {
                    self.surfaces.send_to(
                        surface,
                        RegistryMsg::ContentChanged {
                            content: None,
                            is_dirty: Some(false),
                            saved: Some(true),
                        },
                    );
                }
                Err(e) => {
                    let name = self.document_name(document_id);
                    self.notifier.error(&format!("Failed to save {}: {}", name, e));
                }
            },
            Some(CommandId::SaveAll) => {
                self.save_all();
            }
            Some(
                cmd @ (CommandId::SwitchToEdit | CommandId::SwitchToRead | CommandId::SwitchToSplit),
            ) => {
                if let Some(target) = cmd.target_mode() {
                    self.modes.switch_mode(&mut self.documents, document_id, target);
                }
            }
            Some(CommandId::UpdateView) => {
                let line = args.first().and_then(|v| v.as_u64());
                let column = args.get(1).and_then(|v| v.as_u64());
                let scroll = args.get(2).and_then(|v| v.as_u64());
                let cursor = line
                    .zip(column)
                    .map(|(line, column)| Position::new(line as usize, column as usize));
                self.documents.set_view_state(
                    document_id,
                    cursor,
                    scroll.map(|s| s as usize),
                    None,
                );
            }
            Some(CommandId::Validate) => {
                if let Some(doc) = self.documents.document(document_id) {
                    let report = doc.validate();
                    if !report.is_valid {
                        let name = doc.display_name();
                        self.notifier.error(&format!(
                            "{}: {} validation error(s)",
                            name,
                            report.errors.len()
                        ));
                    }
                }
            }
            None => {
                self.commands.execute(command, &args);
            }
        }
    }

    fn on_file_changed(&mut self, path: &Path) {
        match self.documents.external_change(path, self.prompt.as_ref()) {
            ExternalOutcome::Refreshed { id, content } => {
                // Disk content now authoritative; every surface gets it.
                self.surfaces.broadcast_document_update(&id, &content, None);
            }
            ExternalOutcome::ConflictPending { id } => {
                // The diff presentation belongs to the host.
                self.commands
                    .execute("facet.compare", &[serde_json::Value::String(
                        id.as_str().to_string(),
                    )]);
            }
            ExternalOutcome::ConflictKept { .. } | ExternalOutcome::Ignored => {}
        }
    }

    fn on_file_removed(&mut self, path: &Path) {
        if let Some(id) = self.documents.file_removed(path) {
            self.modes.forget(&id);
            let disposed = self.surfaces.dispose_for_document(&id);
            tracing::info!(
                "{} deleted on disk; closed document and {} surface(s)",
                id,
                disposed.len()
            );
        }
    }

    fn document_name(&self, id: &DocumentId) -> String {
        self.documents
            .document(id)
            .map(|doc| doc.display_name())
            .unwrap_or_else(|| id.to_string())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("documents", &self.documents)
            .field("surfaces", &self.surfaces)
            .finish()
    }
}
