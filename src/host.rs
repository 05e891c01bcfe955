//! Host collaborator interfaces
//!
//! The engine touches the outside world only through these seams: disk
//! access, the conflict prompt, command dispatch, and the user-visible error
//! channel. Hosts inject real implementations at construction time; the
//! defaults log and choose the safe option.

use std::io;
use std::path::Path;

use crate::model::DocumentId;

/// File read/write keyed by path
pub trait FileStore: Send {
    /// Read a file's content. `NotFound` is an error here; the registry
    /// decides when an absent file means "empty new document".
    fn read(&self, path: &Path) -> io::Result<String>;

    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// The std::fs implementation used by the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFileStore;

impl FileStore for DiskFileStore {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// The user's decision when disk content diverged from unsaved local edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    /// Discard local edits, reload from disk
    Reload,
    /// Keep the local edits, discard the disk event
    KeepLocal,
    /// Leave the conflict pending; the host presents a diff
    Compare,
}

/// Modal prompt shown when a dirty document changes on disk.
///
/// `None` means the prompt was dismissed, which is treated as keep-local.
pub trait ConflictPrompt: Send {
    fn choose(&self, document: &DocumentId) -> Option<ConflictChoice>;
}

/// Never prompts; always keeps local edits. The safe default.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepLocalPrompt;

impl ConflictPrompt for KeepLocalPrompt {
    fn choose(&self, _document: &DocumentId) -> Option<ConflictChoice> {
        None
    }
}

/// Dispatch for commands the engine does not interpret itself
pub trait CommandHost: Send {
    fn execute(&self, command: &str, args: &[serde_json::Value]);
}

/// Logs forwarded commands; the default when no host is wired up
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCommandHost;

impl CommandHost for LoggingCommandHost {
    fn execute(&self, command: &str, args: &[serde_json::Value]) {
        tracing::info!(command, ?args, "command forwarded to host with no dispatcher");
    }
}

/// User-visible error channel
pub trait Notifier: Send {
    fn error(&self, message: &str);
}

/// Routes errors to the log; the default when no host is wired up
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// The full set of collaborators a host hands to the engine
pub struct HostBridge {
    pub store: Box<dyn FileStore>,
    pub prompt: Box<dyn ConflictPrompt>,
    pub commands: Box<dyn CommandHost>,
    pub notifier: Box<dyn Notifier>,
}

impl HostBridge {
    /// Disk-backed store, keep-local prompt, logging command host/notifier.
    pub fn with_disk_store() -> Self {
        Self::default()
    }

    pub fn store(mut self, store: impl FileStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    pub fn prompt(mut self, prompt: impl ConflictPrompt + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn commands(mut self, commands: impl CommandHost + 'static) -> Self {
        self.commands = Box::new(commands);
        self
    }

    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }
}

impl Default for HostBridge {
    fn default() -> Self {
        Self {
            store: Box::new(DiskFileStore),
            prompt: Box::new(KeepLocalPrompt),
            commands: Box::new(LoggingCommandHost),
            notifier: Box::new(LoggingNotifier),
        }
    }
}

impl std::fmt::Debug for HostBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HostBridge { .. }")
    }
}
