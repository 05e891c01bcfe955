//! Engine configuration persistence
//!
//! Stores engine preferences in `~/.config/facet/config.yaml`

use serde::{Deserialize, Serialize};

use crate::model::Mode;

/// Engine configuration that persists across sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Presentation mode for documents that have never switched
    #[serde(default)]
    pub default_mode: Mode,

    /// Debounce window for file-watch events, in milliseconds
    #[serde(default = "default_watch_debounce_ms")]
    pub watch_debounce_ms: u64,

    /// Restore persisted surfaces on startup
    #[serde(default = "default_true")]
    pub restore_sessions: bool,

    /// Capacity of the recent-documents list
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
}

fn default_watch_debounce_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_recent_capacity() -> usize {
    crate::recent::RecentDocuments::DEFAULT_CAPACITY
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_mode: Mode::default(),
            watch_debounce_ms: default_watch_debounce_ms(),
            restore_sessions: true,
            recent_capacity: default_recent_capacity(),
        }
    }
}

impl EngineConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to disk
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> Result<(), String> {
        let path = crate::config_paths::config_file()
            .ok_or_else(|| "No config directory available".to_string())?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(&path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }
}
