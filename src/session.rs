//! Cross-restart surface persistence
//!
//! A host that is torn down can write every live surface's snapshot here and
//! rebuild its surfaces on the next start. Loading fails soft: a corrupt or
//! partial file yields an empty session, and individual entries that no
//! longer make sense are skipped at restore time.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::Mode;

/// Snapshot of one surface, as persisted across restarts.
///
/// Field names match the wire schema:
/// `{documentId, mode, content, isDirty, lastModifiedIso, resourceId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSurface {
    pub document_id: String,
    pub mode: Mode,
    pub content: String,
    pub is_dirty: bool,
    pub last_modified_iso: String,
    pub resource_id: String,
}

/// Versioned store of persisted surfaces (`sessions.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStore {
    #[serde(default)]
    pub version: u32,
    pub surfaces: Vec<PersistedSurface>,
    #[serde(skip)]
    storage: Option<PathBuf>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            surfaces: Vec::new(),
            storage: None,
        }
    }
}

impl SessionStore {
    pub const CURRENT_VERSION: u32 = 1;

    /// In-memory store that is never persisted
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from the default config location
    pub fn load_default() -> Self {
        match crate::config_paths::sessions_path() {
            Some(path) => Self::load_from(path),
            None => Self::in_memory(),
        }
    }

    /// Load from an explicit file, falling back to empty on any failure
    pub fn load_from(path: PathBuf) -> Self {
        let mut store = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<Self>(&contents).unwrap_or_else(|e| {
                tracing::warn!("failed to parse {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        store.storage = Some(path);
        store
    }

    /// Replace the stored snapshots and write them out
    pub fn record(&mut self, surfaces: Vec<PersistedSurface>) -> std::io::Result<()> {
        self.version = Self::CURRENT_VERSION;
        self.surfaces = surfaces;
        self.save()
    }

    /// Save to the backing file, if there is one
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = &self.storage else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
    }

    pub fn clear(&mut self) -> std::io::Result<()> {
        self.surfaces.clear();
        self.save()
    }
}
