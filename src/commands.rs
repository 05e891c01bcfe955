//! Command registry
//!
//! The engine interprets a small fixed set of commands itself; everything
//! else received over `execute-command` is forwarded opaquely to the host.
//! The static table is what menu/palette/CLI integrations enumerate.

use crate::model::Mode;

/// Identifies a command the engine handles locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    /// Re-read the surface's document from disk, discarding local edits
    RefreshFromDisk,
    /// Open another resource as a document
    OpenResource,
    /// Save the surface's document
    Save,
    /// Save every dirty document
    SaveAll,
    /// Switch the surface's document to edit mode
    SwitchToEdit,
    /// Switch the surface's document to read mode
    SwitchToRead,
    /// Switch the surface's document to split mode
    SwitchToSplit,
    /// Update cursor/scroll state from the surface
    UpdateView,
    /// Run structural validation on the surface's document
    Validate,
}

impl CommandId {
    /// The target mode for mode-switch commands
    pub fn target_mode(&self) -> Option<Mode> {
        match self {
            CommandId::SwitchToEdit => Some(Mode::Edit),
            CommandId::SwitchToRead => Some(Mode::Read),
            CommandId::SwitchToSplit => Some(Mode::Split),
            _ => None,
        }
    }
}

/// A command definition for palette/menu integrations
#[derive(Debug, Clone)]
pub struct CommandDef {
    pub id: CommandId,
    /// Wire name, as it appears in `execute-command` messages
    pub command: &'static str,
    pub label: &'static str,
}

/// Static registry of locally handled commands
pub static COMMANDS: &[CommandDef] = &[
    CommandDef {
        id: CommandId::RefreshFromDisk,
        command: "facet.refresh",
        label: "Refresh From Disk",
    },
    CommandDef {
        id: CommandId::OpenResource,
        command: "facet.open",
        label: "Open Resource...",
    },
    CommandDef {
        id: CommandId::Save,
        command: "facet.save",
        label: "Save Document",
    },
    CommandDef {
        id: CommandId::SaveAll,
        command: "facet.saveAll",
        label: "Save All Documents",
    },
    CommandDef {
        id: CommandId::SwitchToEdit,
        command: "facet.mode.edit",
        label: "Switch to Edit Mode",
    },
    CommandDef {
        id: CommandId::SwitchToRead,
        command: "facet.mode.read",
        label: "Switch to Read Mode",
    },
    CommandDef {
        id: CommandId::SwitchToSplit,
        command: "facet.mode.split",
        label: "Switch to Split Mode",
    },
    CommandDef {
        id: CommandId::UpdateView,
        command: "facet.updateView",
        label: "Update View State",
    },
    CommandDef {
        id: CommandId::Validate,
        command: "facet.validate",
        label: "Validate Document",
    },
];

/// Commands available to palette/menu integrations
pub fn available_commands() -> &'static [CommandDef] {
    COMMANDS
}

/// Resolve a wire command name to a locally handled command
pub fn lookup(command: &str) -> Option<CommandId> {
    COMMANDS
        .iter()
        .find(|def| def.command == command)
        .map(|def| def.id)
}
