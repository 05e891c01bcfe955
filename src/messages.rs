//! Message types for the surface protocol and the engine event queue
//!
//! Surfaces are isolated execution contexts: everything they exchange with
//! the engine crosses a channel as one of these messages. The serde
//! representation matches the wire format `{type, payload}` with kebab-case
//! type tags and camelCase payload fields.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::surfaces::SurfaceId;

/// A message sent by a surface to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum SurfaceMsg {
    /// The surface can receive messages from now on. Until this arrives the
    /// engine holds back all content delivery.
    Ready {},

    /// The user edited the content in this surface
    #[serde(rename_all = "camelCase")]
    ContentChanged {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_dirty: Option<bool>,
    },

    /// The user requested a save with the surface's current content
    #[serde(rename_all = "camelCase")]
    SaveRequest { content: String },

    /// A command invocation; a small fixed set is interpreted by the engine,
    /// everything else is forwarded opaquely to the host
    #[serde(rename_all = "camelCase")]
    ExecuteCommand {
        command: String,
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },
}

/// A message sent by the engine to a surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum RegistryMsg {
    /// Replace the surface's content wholesale
    #[serde(rename_all = "camelCase")]
    SetContent {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_file: Option<bool>,
    },

    /// State acknowledgment, e.g. a successful save
    #[serde(rename_all = "camelCase")]
    ContentChanged {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_dirty: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        saved: Option<bool>,
    },
}

/// One unit of work for the engine's sequential event loop.
///
/// Every inbound surface message and every file-watch callback becomes one
/// of these; processing them one at a time on a single logical thread is what
/// keeps "user typed", "disk changed" and "save completed" from racing.
#[derive(Debug)]
pub enum EngineEvent {
    /// A message arrived from a surface
    Surface {
        surface: SurfaceId,
        message: SurfaceMsg,
    },
    /// A watched file changed on disk
    FileChanged(PathBuf),
    /// A watched file disappeared from disk
    FileRemoved(PathBuf),
    /// Stop the engine loop
    Shutdown,
}
