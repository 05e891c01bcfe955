//! Command-line argument parsing for the facet binary
//!
//! Supports:
//! - Opening documents with surfaces in a chosen mode
//! - Structural validation of a single file
//! - Listing recently opened documents

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::model::Mode;

/// Multi-surface document synchronization engine
#[derive(Parser, Debug)]
#[command(name = "facet", version, about = "Multi-surface document synchronization engine")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Open documents and run the engine, mirroring each one into a surface
    Open {
        /// Files to open
        #[arg(value_name = "PATHS", required = true)]
        paths: Vec<PathBuf>,

        /// Presentation mode for the created surfaces
        #[arg(long, default_value = "edit")]
        mode: Mode,

        /// Skip restoring persisted surfaces
        #[arg(short = 'n', long)]
        no_restore: bool,
    },

    /// Run structural validation and print diagnostics
    Validate {
        /// File to validate
        path: PathBuf,
    },

    /// List recently opened documents
    Recent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_defaults_to_edit_mode() {
        let args = CliArgs::parse_from(["facet", "open", "a.md"]);
        match args.command {
            CliCommand::Open { paths, mode, no_restore } => {
                assert_eq!(paths, vec![PathBuf::from("a.md")]);
                assert_eq!(mode, Mode::Edit);
                assert!(!no_restore);
            }
            other => panic!("expected open, got {:?}", other),
        }
    }

    #[test]
    fn test_open_mode_flag() {
        let args = CliArgs::parse_from(["facet", "open", "--mode", "read", "a.md", "b.md"]);
        match args.command {
            CliCommand::Open { paths, mode, .. } => {
                assert_eq!(paths.len(), 2);
                assert_eq!(mode, Mode::Read);
            }
            other => panic!("expected open, got {:?}", other),
        }
    }

    #[test]
    fn test_open_requires_a_path() {
        assert!(CliArgs::try_parse_from(["facet", "open"]).is_err());
    }

    #[test]
    fn test_open_rejects_bad_mode() {
        assert!(CliArgs::try_parse_from(["facet", "open", "--mode", "preview", "a.md"]).is_err());
    }

    #[test]
    fn test_validate_subcommand() {
        let args = CliArgs::parse_from(["facet", "validate", "doc.md"]);
        assert!(matches!(args.command, CliCommand::Validate { .. }));
    }

    #[test]
    fn test_recent_subcommand() {
        let args = CliArgs::parse_from(["facet", "recent"]);
        assert!(matches!(args.command, CliCommand::Recent));
    }
}
