//! Document model - identity, position, and presentation-mode types
//!
//! The authoritative in-memory representation of every open document lives
//! here. Registries mutate documents; surfaces only ever see snapshots.

mod document;
mod validate;

pub use document::{Document, DocumentState};
pub use validate::{validate, Diagnostic, ValidationReport};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable identifier for an open document, derived from its file path.
///
/// Two `open` calls for the same file (however spelled) resolve to the same
/// id, which is what makes `open` idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Derive an id from a path.
    ///
    /// Canonicalizes when the file exists; otherwise falls back to a
    /// lexically absolute path so unsaved-yet files still get a stable id.
    pub fn from_path(path: &Path) -> Self {
        let resolved = path
            .canonicalize()
            .unwrap_or_else(|_| lexically_absolute(path));
        Self(resolved.to_string_lossy().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Make a path absolute without touching the file system.
fn lexically_absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Presentation mode a document is shown in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Editable source view
    #[default]
    Edit,
    /// Read-only rendered view
    Read,
    /// Source and rendered view side by side
    Split,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Edit => "edit",
            Mode::Read => "read",
            Mode::Split => "split",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "edit" => Ok(Mode::Edit),
            "read" => Ok(Mode::Read),
            "split" => Ok(Mode::Split),
            other => Err(format!("unknown mode '{}' (expected edit, read, or split)", other)),
        }
    }
}

/// A cursor position, 0-indexed internally (1-indexed at user boundaries)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A selection range between two positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub start: Position,
    pub end: Position,
}

impl Selection {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}
