//! Presentation-mode tracking
//!
//! One state machine per document. The whole point of the ordering in
//! [`ModeTracker::switch_mode`] is position continuity: cursor and scroll are
//! snapshotted before anything else happens, so the next surface renders at
//! the same logical position even if a listener misbehaves.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::model::{DocumentId, Mode, Position};
use crate::observer::{Listeners, Subscription};
use crate::registry::DocumentRegistry;

/// Tracked mode state for one document
#[derive(Debug, Clone)]
pub struct ModeState {
    pub document_id: DocumentId,
    pub mode: Mode,
    pub cursor: Option<Position>,
    pub scroll_offset: Option<usize>,
    pub last_switched: DateTime<Utc>,
}

/// Broadcast to mode listeners and policy hooks on every switch
#[derive(Debug, Clone)]
pub struct ModeChange {
    pub id: DocumentId,
    pub from: Mode,
    pub to: Mode,
}

/// Per-document presentation-mode state machine
pub struct ModeTracker {
    states: HashMap<DocumentId, ModeState>,
    default_mode: Mode,
    listeners: Listeners<ModeChange>,
    /// Mode-specific policy hooks (e.g. toolbar visibility), run after
    /// listeners and before position restoration
    policies: Listeners<ModeChange>,
}

impl ModeTracker {
    pub fn new(default_mode: Mode) -> Self {
        Self {
            states: HashMap::new(),
            default_mode,
            listeners: Listeners::new(),
            policies: Listeners::new(),
        }
    }

    pub fn default_mode(&self) -> Mode {
        self.default_mode
    }

    /// The tracked mode for a document, or the configured default if the
    /// document has never switched.
    pub fn current_mode(&self, id: &DocumentId) -> Mode {
        self.states
            .get(id)
            .map(|state| state.mode)
            .unwrap_or(self.default_mode)
    }

    pub fn state(&self, id: &DocumentId) -> Option<&ModeState> {
        self.states.get(id)
    }

    /// False only for unknown documents; extension point for future policy.
    pub fn can_switch_mode(
        &self,
        docs: &DocumentRegistry,
        id: &DocumentId,
        _target: Mode,
    ) -> bool {
        docs.contains(id)
    }

    /// Switch a document to a new presentation mode.
    ///
    /// No-op for unknown documents or when already in the target mode.
    /// Ordering: snapshot cursor/scroll, record the new state, flip the
    /// document's mode, notify listeners, apply policy hooks, then push the
    /// snapshot back onto the document. Listeners observe the new mode
    /// before restoration happens; a failed restoration is logged, never
    /// fatal.
    pub fn switch_mode(
        &mut self,
        docs: &mut DocumentRegistry,
        id: &DocumentId,
        target: Mode,
    ) -> bool {
        let Some(doc) = docs.document(id) else {
            tracing::warn!("mode switch for unknown document {}", id);
            return false;
        };
        let from = self.current_mode(id);
        if from == target {
            return false;
        }

        // 1. snapshot the position before anything can disturb it
        let cursor = doc.cursor();
        let scroll_offset = doc.scroll_offset();

        // 2. record the switch
        self.states.insert(
            id.clone(),
            ModeState {
                document_id: id.clone(),
                mode: target,
                cursor: Some(cursor),
                scroll_offset: Some(scroll_offset),
                last_switched: Utc::now(),
            },
        );

        // 3. the document now presents in the target mode
        docs.set_document_mode(id, target);

        // 4. listeners observe the new mode first...
        let change = ModeChange {
            id: id.clone(),
            from,
            to: target,
        };
        self.listeners.emit(&change);

        // 5. ...then mode policy runs
        self.policies.emit(&change);

        // 6. restore the position so the next surface renders where the
        //    user left off
        if !docs.set_view_state(id, Some(cursor), Some(scroll_offset), None) {
            tracing::warn!("position restore skipped: {} disappeared mid-switch", id);
        }

        tracing::debug!("{}: {} -> {}", id, from, target);
        true
    }

    /// Register a mode-change listener. Dropping the handle unsubscribes.
    pub fn subscribe(
        &self,
        listener: impl Fn(&ModeChange) + Send + Sync + 'static,
    ) -> Subscription {
        self.listeners.subscribe(listener)
    }

    /// Register a mode policy hook, run after listeners on every switch.
    pub fn add_policy(
        &self,
        hook: impl Fn(&ModeChange) + Send + Sync + 'static,
    ) -> Subscription {
        self.policies.subscribe(hook)
    }

    /// Discard tracked state for a closed document.
    pub fn forget(&mut self, id: &DocumentId) {
        self.states.remove(id);
    }
}

impl std::fmt::Debug for ModeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeTracker")
            .field("tracked", &self.states.len())
            .field("default_mode", &self.default_mode)
            .finish()
    }
}
