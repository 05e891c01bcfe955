//! facet - multi-surface document synchronization engine
//!
//! One authoritative in-memory document per open file, any number of
//! isolated presentation surfaces (edit / read / split) kept consistent with
//! each other and with the disk. Surfaces communicate with the engine only
//! through asynchronous FIFO channels; the engine processes every message
//! and file-watch callback sequentially on one logical thread.

pub mod cli;
pub mod commands;
pub mod config;
pub mod config_paths;
pub mod engine;
pub mod fs_watcher;
pub mod host;
pub mod messages;
pub mod mode;
pub mod model;
pub mod observer;
pub mod recent;
pub mod registry;
pub mod session;
pub mod surfaces;
pub mod tracing;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::Engine;
pub use host::HostBridge;
pub use messages::{EngineEvent, RegistryMsg, SurfaceMsg};
pub use model::{Document, DocumentId, Mode};
pub use surfaces::{SurfaceConnection, SurfaceCreation, SurfaceId};
