//! Persistent recent-documents list
//!
//! Every successfully opened resource lands here, most recent first, with a
//! capacity limit. Stored as JSON in the config directory; an engine built
//! for tests uses an in-memory list that never touches disk.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// A single entry in the recent-documents list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentEntry {
    /// Absolute path to the document
    pub path: PathBuf,
    /// Timestamp when last opened (Unix epoch seconds)
    pub opened_at: u64,
    /// Number of times the document has been opened
    #[serde(default)]
    pub open_count: u32,
}

impl RecentEntry {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            opened_at: now_epoch_secs(),
            open_count: 1,
        }
    }

    fn touch(&mut self) {
        self.opened_at = now_epoch_secs();
        self.open_count += 1;
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Persistent recent-documents list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentDocuments {
    /// Schema version for forward compatibility
    #[serde(default)]
    pub version: u32,
    /// Entries, most recent first
    pub entries: Vec<RecentEntry>,
    #[serde(skip)]
    storage: Option<PathBuf>,
    #[serde(skip, default = "default_capacity")]
    capacity: usize,
}

fn default_capacity() -> usize {
    RecentDocuments::DEFAULT_CAPACITY
}

impl Default for RecentDocuments {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: Vec::new(),
            storage: None,
            capacity: Self::DEFAULT_CAPACITY,
        }
    }
}

impl RecentDocuments {
    pub const CURRENT_VERSION: u32 = 1;
    pub const DEFAULT_CAPACITY: usize = 50;

    /// In-memory list that is never persisted
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from the default config location
    pub fn load_default(capacity: usize) -> Self {
        match crate::config_paths::recent_documents_path() {
            Some(path) => Self::load_from(path, capacity),
            None => Self::in_memory(),
        }
    }

    /// Load from an explicit file, falling back to empty on any failure
    pub fn load_from(path: PathBuf, capacity: usize) -> Self {
        let mut recent = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<Self>(&contents).unwrap_or_else(|e| {
                tracing::warn!("failed to parse {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        recent.storage = Some(path);
        recent.capacity = capacity.max(1);
        recent
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

    /// Record an open (or re-open) of a document
    pub fn add(&mut self, path: &Path) {
        if let Some(idx) = self.entries.iter().position(|e| e.path == path) {
            self.entries[idx].touch();
            let entry = self.entries.remove(idx);
            self.entries.insert(0, entry);
        } else {
            self.entries.insert(0, RecentEntry::new(path.to_path_buf()));
        }
        self.entries.truncate(self.capacity);
    }

    pub fn remove(&mut self, path: &Path) {
        self.entries.retain(|e| e.path != path);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecentEntry> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_reopen_moves_to_front() {
        let mut recent = RecentDocuments::in_memory();
        recent.add(Path::new("/a.md"));
        recent.add(Path::new("/b.md"));
        recent.add(Path::new("/a.md"));

        assert_eq!(recent.entries.len(), 2);
        assert_eq!(recent.entries[0].path, PathBuf::from("/a.md"));
        assert_eq!(recent.entries[0].open_count, 2);
    }

    #[test]
    fn test_capacity_limit() {
        let mut recent = RecentDocuments::in_memory();
        recent.capacity = 3;
        for i in 0..10 {
            recent.add(Path::new(&format!("/f{}.md", i)));
        }
        assert_eq!(recent.entries.len(), 3);
        assert_eq!(recent.entries[0].path, PathBuf::from("/f9.md"));
    }

    #[test]
    fn test_remove() {
        let mut recent = RecentDocuments::in_memory();
        recent.add(Path::new("/a.md"));
        recent.add(Path::new("/b.md"));
        recent.remove(Path::new("/a.md"));
        assert_eq!(recent.entries.len(), 1);
    }

    #[test]
    fn test_in_memory_save_is_noop() {
        let mut recent = RecentDocuments::in_memory();
        recent.add(Path::new("/a.md"));
        recent.save().expect("no-op save");
    }

    #[test]
    fn test_load_save_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("recent.json");

        let mut recent = RecentDocuments::load_from(file.clone(), 10);
        recent.add(Path::new("/a.md"));
        recent.add(Path::new("/b.md"));
        recent.save().expect("save");

        let loaded = RecentDocuments::load_from(file, 10);
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(loaded.entries[0].path, PathBuf::from("/b.md"));
        assert_eq!(loaded.version, RecentDocuments::CURRENT_VERSION);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("recent.json");
        std::fs::write(&file, "not json at all").expect("write");

        let loaded = RecentDocuments::load_from(file, 10);
        assert!(loaded.is_empty());
    }
}
