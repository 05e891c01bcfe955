//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use facet::config::EngineConfig;
use facet::engine::Engine;
use facet::host::{CommandHost, ConflictChoice, ConflictPrompt, FileStore, HostBridge, Notifier};
use facet::messages::{RegistryMsg, SurfaceMsg};
use facet::surfaces::{SurfaceConnection, SurfaceCreation};

/// Shared in-memory "disk" with a failure switch for write-error scenarios
#[derive(Clone, Default)]
pub struct SharedFiles {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl SharedFiles {
    pub fn insert(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), content.to_string());
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(Path::new(path)).cloned()
    }

    pub fn remove(&self, path: &str) {
        self.files.lock().unwrap().remove(Path::new(path));
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

/// `FileStore` over [`SharedFiles`]
pub struct MemoryStore(pub SharedFiles);

impl FileStore for MemoryStore {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.0
            .files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        if self.0.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "disk full"));
        }
        self.0
            .files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.0.files.lock().unwrap().contains_key(path)
    }
}

/// Conflict prompt that always answers the same thing and counts how often
/// it was asked
pub struct StaticPrompt {
    pub choice: Option<ConflictChoice>,
    pub asked: Arc<AtomicUsize>,
}

impl ConflictPrompt for StaticPrompt {
    fn choose(&self, _document: &facet::model::DocumentId) -> Option<ConflictChoice> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.choice
    }
}

/// Captures notifier errors and forwarded commands for assertions
#[derive(Clone, Default)]
pub struct Recorder {
    pub errors: Arc<Mutex<Vec<String>>>,
    pub commands: Arc<Mutex<Vec<(String, Vec<serde_json::Value>)>>>,
}

impl Recorder {
    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }

    pub fn forwarded(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(|(command, _)| command.clone())
            .collect()
    }
}

pub struct RecordingNotifier(pub Recorder);

impl Notifier for RecordingNotifier {
    fn error(&self, message: &str) {
        self.0.errors.lock().unwrap().push(message.to_string());
    }
}

pub struct RecordingCommandHost(pub Recorder);

impl CommandHost for RecordingCommandHost {
    fn execute(&self, command: &str, args: &[serde_json::Value]) {
        self.0
            .commands
            .lock()
            .unwrap()
            .push((command.to_string(), args.to_vec()));
    }
}

/// An engine over an in-memory disk plus handles to everything recorded
pub struct Fixture {
    pub engine: Engine,
    pub files: SharedFiles,
    pub recorder: Recorder,
    pub prompt_asked: Arc<AtomicUsize>,
}

/// Build a fixture whose conflict prompt always answers `choice`
pub fn fixture_with_prompt(
    initial: &[(&str, &str)],
    choice: Option<ConflictChoice>,
) -> Fixture {
    let files = SharedFiles::default();
    for (path, content) in initial {
        files.insert(path, content);
    }
    let recorder = Recorder::default();
    let prompt_asked = Arc::new(AtomicUsize::new(0));

    let host = HostBridge::default()
        .store(MemoryStore(files.clone()))
        .prompt(StaticPrompt {
            choice,
            asked: Arc::clone(&prompt_asked),
        })
        .commands(RecordingCommandHost(recorder.clone()))
        .notifier(RecordingNotifier(recorder.clone()));

    Fixture {
        engine: Engine::new(EngineConfig::default(), host),
        files,
        recorder,
        prompt_asked,
    }
}

pub fn fixture(initial: &[(&str, &str)]) -> Fixture {
    fixture_with_prompt(initial, None)
}

/// Rebuild a fixture's engine with on-disk recent/session stores
pub fn with_stores(
    fx: Fixture,
    recent: facet::recent::RecentDocuments,
    sessions: facet::session::SessionStore,
) -> Fixture {
    let Fixture {
        engine,
        files,
        recorder,
        prompt_asked,
    } = fx;
    Fixture {
        engine: engine.with_persistence(recent, sessions),
        files,
        recorder,
        prompt_asked,
    }
}

/// Create a surface, expecting a fresh connection back
pub fn create(engine: &mut Engine, path: &str, mode: facet::model::Mode) -> SurfaceConnection {
    match engine
        .open_surface(Path::new(path), mode)
        .expect("open_surface")
    {
        SurfaceCreation::Created(connection) => connection,
        SurfaceCreation::Reused(id) => panic!("expected a new surface, reused {}", id),
    }
}

/// Create a surface and complete its ready handshake
pub fn create_ready(
    engine: &mut Engine,
    path: &str,
    mode: facet::model::Mode,
) -> SurfaceConnection {
    let connection = create(engine, path, mode);
    assert!(connection.send(SurfaceMsg::Ready {}));
    engine.pump();
    connection.drain(); // discard the initial set-content
    connection
}

/// The content of every `set-content` message queued on a connection
pub fn set_contents(connection: &SurfaceConnection) -> Vec<String> {
    connection
        .drain()
        .into_iter()
        .filter_map(|message| match message {
            RegistryMsg::SetContent { content, .. } => Some(content),
            _ => None,
        })
        .collect()
}
