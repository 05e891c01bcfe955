use std::path::PathBuf;
use std::thread;

use anyhow::Context;
use clap::Parser;

use facet::cli::{CliArgs, CliCommand};
use facet::config::EngineConfig;
use facet::engine::Engine;
use facet::host::HostBridge;
use facet::messages::{RegistryMsg, SurfaceMsg};
use facet::model::{validate, Mode};
use facet::recent::RecentDocuments;
use facet::session::SessionStore;
use facet::surfaces::{SurfaceConnection, SurfaceCreation};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    facet::tracing::init();

    match args.command {
        CliCommand::Open {
            paths,
            mode,
            no_restore,
        } => run_open(paths, mode, no_restore),
        CliCommand::Validate { path } => run_validate(path),
        CliCommand::Recent => run_recent(),
    }
}

/// Open the given documents and mirror them into console surfaces until the
/// process is interrupted. External edits to the files show up live.
fn run_open(paths: Vec<PathBuf>, mode: Mode, no_restore: bool) -> anyhow::Result<()> {
    let config = EngineConfig::load();
    let recent = RecentDocuments::load_default(config.recent_capacity);
    let sessions = SessionStore::load_default();
    let restore = config.restore_sessions && !no_restore;

    let mut engine =
        Engine::new(config, HostBridge::with_disk_store()).with_persistence(recent, sessions);

    let mut connections: Vec<SurfaceConnection> = Vec::new();
    if restore {
        connections.extend(engine.restore_sessions());
    }

    for path in &paths {
        let creation = engine
            .open_surface(path, mode)
            .with_context(|| format!("could not open {}", path.display()))?;
        match creation {
            SurfaceCreation::Created(connection) => connections.push(connection),
            SurfaceCreation::Reused(id) => {
                tracing::info!("{} already has a {} surface ({})", path.display(), mode, id)
            }
        }
    }

    // Each surface runs in its own thread and talks to the engine purely
    // over its channel, like any other host surface would.
    for connection in connections {
        thread::spawn(move || run_console_surface(connection));
    }

    // Let the ready handshakes land before the first snapshot is persisted.
    engine.pump();
    if let Err(e) = engine.persist_sessions() {
        tracing::warn!("could not persist sessions: {}", e);
    }

    println!("facet engine running; edit the files on disk to see updates. Ctrl+C to quit.");
    engine.run();
    Ok(())
}

/// The console rendition of a surface: announce readiness, then print every
/// content push the engine sends.
fn run_console_surface(connection: SurfaceConnection) {
    let id = connection.surface_id();
    if !connection.send(SurfaceMsg::Ready {}) {
        return;
    }
    while let Ok(message) = connection.receiver.recv() {
        match message {
            RegistryMsg::SetContent { content, from_file } => {
                let origin = if from_file == Some(true) { "disk" } else { "sync" };
                println!("── {} [{}] {} chars ──", id, origin, content.chars().count());
                println!("{}", content);
            }
            RegistryMsg::ContentChanged { saved, .. } => {
                if saved == Some(true) {
                    println!("── {} saved ──", id);
                }
            }
        }
    }
}

fn run_validate(path: PathBuf) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("could not read {}", path.display()))?;
    let report = validate(&content);

    for warning in &report.warnings {
        println!(
            "{}:{}:{}: warning: {}",
            path.display(),
            warning.line,
            warning.column,
            warning.message
        );
    }
    for error in &report.errors {
        println!(
            "{}:{}:{}: error: {}",
            path.display(),
            error.line,
            error.column,
            error.message
        );
    }

    if report.is_valid {
        println!(
            "{}: ok ({} warning(s))",
            path.display(),
            report.warnings.len()
        );
        Ok(())
    } else {
        std::process::exit(1);
    }
}

fn run_recent() -> anyhow::Result<()> {
    let recent = RecentDocuments::load_default(RecentDocuments::DEFAULT_CAPACITY);
    if recent.is_empty() {
        println!("no recent documents");
        return Ok(());
    }
    for entry in recent.iter() {
        println!("{}", entry.path.display());
    }
    Ok(())
}
