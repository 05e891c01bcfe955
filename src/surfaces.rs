//! Presentation-surface registry
//!
//! Surfaces render one document in one mode, in an isolated execution
//! context. The registry owns every surface's bookkeeping and the sending
//! half of its channel; surfaces own the receiving half plus a sender into
//! the engine's event queue. Nothing else ever holds a surface reference.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};

use crate::messages::{EngineEvent, RegistryMsg, SurfaceMsg};
use crate::model::{DocumentId, Mode};
use crate::registry::DocumentRegistry;
use crate::session::PersistedSurface;

/// Process-local surface identity token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Content pushed into a surface that could not be reconstructed
const RESTORE_PLACEHOLDER: &str = "This view could not be restored. Please reopen the document.";

/// One presentation surface's bookkeeping
pub struct Surface {
    id: SurfaceId,
    document_id: DocumentId,
    mode: Mode,
    /// The surface's best-known copy of the document content. May
    /// transiently diverge from the document while messages are in flight.
    content_snapshot: String,
    is_visible: bool,
    is_focused: bool,
    /// Set once the surface announces readiness; content is only broadcast
    /// to ready surfaces
    ready: bool,
    outbound: Sender<RegistryMsg>,
}

impl Surface {
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn content_snapshot(&self) -> &str {
        &self.content_snapshot
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub fn is_focused(&self) -> bool {
        self.is_focused
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("id", &self.id)
            .field("document_id", &self.document_id)
            .field("mode", &self.mode)
            .field("ready", &self.ready)
            .finish()
    }
}

/// The surface-side endpoints of a new surface's channels.
///
/// Handed to the host, which moves it into the surface's execution context.
/// The surface talks to the engine exclusively through this value.
pub struct SurfaceConnection {
    surface_id: SurfaceId,
    /// Messages from the engine, FIFO
    pub receiver: Receiver<RegistryMsg>,
    events: Sender<EngineEvent>,
}

impl SurfaceConnection {
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    /// Send a message to the engine. Returns false once the engine is gone.
    pub fn send(&self, message: SurfaceMsg) -> bool {
        self.events
            .send(EngineEvent::Surface {
                surface: self.surface_id,
                message,
            })
            .is_ok()
    }

    /// Drain everything the engine has queued for this surface.
    pub fn drain(&self) -> Vec<RegistryMsg> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

impl fmt::Debug for SurfaceConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceConnection")
            .field("surface_id", &self.surface_id)
            .finish()
    }
}

/// Result of a `create_surface` call
#[derive(Debug)]
pub enum SurfaceCreation {
    /// A new surface was created; the connection goes to the host
    Created(SurfaceConnection),
    /// A surface for this (document, mode) pair already existed and was
    /// brought to focus instead of duplicated
    Reused(SurfaceId),
}

impl SurfaceCreation {
    pub fn surface_id(&self) -> SurfaceId {
        match self {
            SurfaceCreation::Created(connection) => connection.surface_id,
            SurfaceCreation::Reused(id) => *id,
        }
    }
}

/// Outcome of reconstructing a surface from persisted state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored(DocumentId),
    /// The snapshot was unusable; the surface received a placeholder and
    /// was disposed
    Failed,
}

/// Registry of all live surfaces
pub struct SurfaceRegistry {
    surfaces: HashMap<SurfaceId, Surface>,
    next_id: u64,
    events: Sender<EngineEvent>,
}

impl SurfaceRegistry {
    /// `events` is the engine's queue; every surface created here sends
    /// its messages into it.
    pub fn new(events: Sender<EngineEvent>) -> Self {
        Self {
            surfaces: HashMap::new(),
            next_id: 0,
            events,
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    pub fn document_of(&self, id: SurfaceId) -> Option<DocumentId> {
        self.surfaces.get(&id).map(|s| s.document_id.clone())
    }

    /// All surfaces bound to one document
    pub fn surfaces_for(&self, document: &DocumentId) -> Vec<SurfaceId> {
        let mut ids: Vec<SurfaceId> = self
            .surfaces
            .values()
            .filter(|s| &s.document_id == document)
            .map(|s| s.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn ids(&self) -> Vec<SurfaceId> {
        let mut ids: Vec<SurfaceId> = self.surfaces.keys().copied().collect();
        ids.sort();
        ids
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a surface for `(resource, mode)`, or focus and return the
    /// existing one.
    ///
    /// Opening the document is delegated to the document registry (which
    /// also registers the file watch). The new surface receives no content
    /// yet: delivery waits for its `ready` message.
    pub fn create_surface(
        &mut self,
        docs: &mut DocumentRegistry,
        path: &Path,
        mode: Mode,
    ) -> io::Result<SurfaceCreation> {
        let document_id = docs.open(path)?;

        if let Some(existing) = self
            .surfaces
            .values()
            .find(|s| s.document_id == document_id && s.mode == mode)
            .map(|s| s.id)
        {
            self.focus(existing);
            tracing::debug!("reusing {} for {} [{}]", existing, document_id, mode);
            return Ok(SurfaceCreation::Reused(existing));
        }

        let id = SurfaceId(self.next_id);
        self.next_id += 1;

        let (outbound_tx, outbound_rx) = mpsc::channel();
        let surface = Surface {
            id,
            document_id: document_id.clone(),
            mode,
            content_snapshot: String::new(),
            is_visible: true,
            is_focused: false,
            ready: false,
            outbound: outbound_tx,
        };
        self.surfaces.insert(id, surface);
        self.focus(id);

        tracing::info!("created {} for {} [{}]", id, document_id, mode);
        Ok(SurfaceCreation::Created(SurfaceConnection {
            surface_id: id,
            receiver: outbound_rx,
            events: self.events.clone(),
        }))
    }

    /// Bring one surface to focus, dropping focus from the others.
    pub fn focus(&mut self, id: SurfaceId) {
        for surface in self.surfaces.values_mut() {
            surface.is_focused = surface.id == id;
        }
    }

    pub fn set_visible(&mut self, id: SurfaceId, visible: bool) {
        if let Some(surface) = self.surfaces.get_mut(&id) {
            surface.is_visible = visible;
        }
    }

    /// The surface announced readiness: it can receive messages from now
    /// on, and gets the current document content unconditionally - the one
    /// time content is pushed without comparing snapshots.
    pub fn mark_ready(&mut self, docs: &DocumentRegistry, id: SurfaceId) {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            tracing::warn!("ready from unknown {}", id);
            return;
        };
        surface.ready = true;

        let Some(doc) = docs.document(&surface.document_id) else {
            tracing::warn!("{} is bound to a closed document", id);
            return;
        };
        let content = doc.content_string();
        surface.content_snapshot = content.clone();
        let delivered = surface
            .outbound
            .send(RegistryMsg::SetContent {
                content,
                from_file: Some(true),
            })
            .is_ok();
        if !delivered {
            tracing::warn!("{} vanished before initial content", id);
            self.surfaces.remove(&id);
        }
    }

    /// Push content to one surface and update its snapshot (manual refresh).
    pub fn update_surface_content(&mut self, id: SurfaceId, content: &str) -> bool {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            tracing::warn!("content push for unknown {}", id);
            return false;
        };
        surface.content_snapshot = content.to_string();
        if surface
            .outbound
            .send(RegistryMsg::SetContent {
                content: content.to_string(),
                from_file: None,
            })
            .is_err()
        {
            self.surfaces.remove(&id);
            return false;
        }
        true
    }

    /// Fan content out to every ready surface bound to `document`, except
    /// the originating one - the author already has this content, echoing
    /// it back would loop.
    ///
    /// Surfaces whose channel is gone are disposed on the way. Returns the
    /// surfaces that received the update.
    pub fn broadcast_document_update(
        &mut self,
        document: &DocumentId,
        content: &str,
        except: Option<SurfaceId>,
    ) -> Vec<SurfaceId> {
        let mut delivered = Vec::new();
        let mut dead = Vec::new();

        for surface in self.surfaces.values_mut() {
            if &surface.document_id != document || !surface.ready {
                continue;
            }
            if Some(surface.id) == except {
                continue;
            }
            surface.content_snapshot = content.to_string();
            if surface
                .outbound
                .send(RegistryMsg::SetContent {
                    content: content.to_string(),
                    from_file: None,
                })
                .is_ok()
            {
                delivered.push(surface.id);
            } else {
                dead.push(surface.id);
            }
        }

        for id in dead {
            tracing::debug!("{} disappeared mid-broadcast", id);
            self.surfaces.remove(&id);
        }
        delivered.sort();
        delivered
    }

    /// Send one message to one surface.
    pub fn send_to(&mut self, id: SurfaceId, message: RegistryMsg) -> bool {
        let Some(surface) = self.surfaces.get(&id) else {
            tracing::warn!("message for unknown {}", id);
            return false;
        };
        if surface.outbound.send(message).is_err() {
            self.surfaces.remove(&id);
            return false;
        }
        true
    }

    /// Record the surface's own snapshot after it reported an edit.
    pub(crate) fn note_edit(&mut self, id: SurfaceId, content: &str) {
        if let Some(surface) = self.surfaces.get_mut(&id) {
            surface.content_snapshot = content.to_string();
        }
    }

    /// Tear down one surface. Safe to call twice; the second call is a
    /// no-op returning false.
    pub fn dispose(&mut self, id: SurfaceId) -> bool {
        match self.surfaces.remove(&id) {
            Some(_) => {
                tracing::info!("disposed {}", id);
                true
            }
            None => false,
        }
    }

    /// Dispose every surface bound to a closed document.
    pub fn dispose_for_document(&mut self, document: &DocumentId) -> Vec<SurfaceId> {
        let ids = self.surfaces_for(document);
        for id in &ids {
            self.surfaces.remove(id);
        }
        if !ids.is_empty() {
            tracing::info!("disposed {} surfaces for {}", ids.len(), document);
        }
        ids
    }

    // ========================================================================
    // Cross-restart persistence
    // ========================================================================

    /// Snapshot one surface for persistence.
    pub fn get_state(&self, docs: &DocumentRegistry, id: SurfaceId) -> Option<PersistedSurface> {
        let surface = self.surfaces.get(&id)?;
        let doc = docs.document(&surface.document_id)?;
        Some(PersistedSurface {
            document_id: doc.id().as_str().to_string(),
            mode: surface.mode,
            content: doc.content_string(),
            is_dirty: doc.is_dirty(),
            last_modified_iso: doc.last_modified().to_rfc3339(),
            resource_id: doc.path().to_string_lossy().to_string(),
        })
    }

    /// Snapshot every live surface, in id order.
    pub fn persistable_states(&self, docs: &DocumentRegistry) -> Vec<PersistedSurface> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.get_state(docs, id))
            .collect()
    }

    /// Rebuild a surface from persisted state.
    ///
    /// Fails soft: an unusable snapshot pushes a "please reopen"
    /// placeholder into the surface and disposes it rather than erroring.
    /// A usable snapshot re-opens the document and, if the snapshot was
    /// dirty, reinstates the unsaved content.
    pub fn restore_state(
        &mut self,
        docs: &mut DocumentRegistry,
        id: SurfaceId,
        state: serde_json::Value,
    ) -> RestoreOutcome {
        if !self.surfaces.contains_key(&id) {
            tracing::warn!("restore for unknown {}", id);
            return RestoreOutcome::Failed;
        }

        let persisted: PersistedSurface = match serde_json::from_value(state) {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::warn!("unusable persisted state for {}: {}", id, e);
                self.send_to(
                    id,
                    RegistryMsg::SetContent {
                        content: RESTORE_PLACEHOLDER.to_string(),
                        from_file: None,
                    },
                );
                self.dispose(id);
                return RestoreOutcome::Failed;
            }
        };

        let path = std::path::PathBuf::from(&persisted.resource_id);
        let document_id = match docs.open(&path) {
            Ok(document_id) => document_id,
            Err(e) => {
                tracing::warn!("could not reopen {} for {}: {}", path.display(), id, e);
                self.send_to(
                    id,
                    RegistryMsg::SetContent {
                        content: RESTORE_PLACEHOLDER.to_string(),
                        from_file: None,
                    },
                );
                self.dispose(id);
                return RestoreOutcome::Failed;
            }
        };

        // Unsaved content survives the restart.
        if persisted.is_dirty {
            docs.apply_surface_edit(&document_id, Some(&persisted.content), Some(true));
        }

        if let Some(surface) = self.surfaces.get_mut(&id) {
            surface.document_id = document_id.clone();
            surface.mode = persisted.mode;
            surface.content_snapshot = persisted.content;
        }

        tracing::info!("restored {} onto {}", id, document_id);
        RestoreOutcome::Restored(document_id)
    }
}

impl fmt::Debug for SurfaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceRegistry")
            .field("surfaces", &self.surfaces.len())
            .finish()
    }
}
