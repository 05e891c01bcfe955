//! Integration tests for the external-change conflict policy
//!
//! Disk events are injected directly into the engine queue so the tests are
//! deterministic; the notify-based end-to-end path lives in disk_io.rs.

mod common;

use common::{create_ready, fixture, fixture_with_prompt, set_contents};
use facet::host::ConflictChoice;
use facet::messages::{EngineEvent, SurfaceMsg};
use facet::model::Mode;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

fn disk_changed(fx: &mut common::Fixture, path: &str) {
    let sender = fx.engine.sender();
    sender
        .send(EngineEvent::FileChanged(PathBuf::from(path)))
        .expect("queue");
    fx.engine.pump();
}

fn disk_removed(fx: &mut common::Fixture, path: &str) {
    let sender = fx.engine.sender();
    sender
        .send(EngineEvent::FileRemoved(PathBuf::from(path)))
        .expect("queue");
    fx.engine.pump();
}

// ============================================================================
// Clean documents
// ============================================================================

#[test]
fn test_clean_document_auto_refreshes_without_prompt() {
    let mut fx = fixture(&[("/note.md", "v1")]);
    let surface = create_ready(&mut fx.engine, "/note.md", Mode::Read);

    fx.files.insert("/note.md", "v2");
    disk_changed(&mut fx, "/note.md");

    assert_eq!(fx.prompt_asked.load(Ordering::SeqCst), 0);
    assert_eq!(set_contents(&surface), vec!["v2".to_string()]);

    let id = fx.engine.surfaces().document_of(surface.surface_id()).unwrap();
    let doc = fx.engine.documents().document(&id).unwrap();
    assert_eq!(doc.content_string(), "v2");
    assert!(!doc.is_dirty());
}

#[test]
fn test_own_save_echo_produces_no_update() {
    let mut fx = fixture(&[("/note.md", "v1")]);
    let surface = create_ready(&mut fx.engine, "/note.md", Mode::Edit);

    surface.send(SurfaceMsg::SaveRequest {
        content: "v2".to_string(),
    });
    fx.engine.pump();
    surface.drain();

    // the watcher fires for our own write; disk already equals memory
    disk_changed(&mut fx, "/note.md");
    assert!(surface.drain().is_empty());
    assert_eq!(fx.prompt_asked.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Dirty documents: the three-way prompt
// ============================================================================

#[test]
fn test_reload_choice_takes_disk_content() {
    let mut fx = fixture_with_prompt(&[("/note.md", "base")], Some(ConflictChoice::Reload));
    let surface = create_ready(&mut fx.engine, "/note.md", Mode::Edit);

    surface.send(SurfaceMsg::ContentChanged {
        content: Some("local edit".to_string()),
        is_dirty: Some(true),
    });
    fx.engine.pump();

    fx.files.insert("/note.md", "disk edit");
    disk_changed(&mut fx, "/note.md");

    assert_eq!(fx.prompt_asked.load(Ordering::SeqCst), 1);
    let id = fx.engine.surfaces().document_of(surface.surface_id()).unwrap();
    let doc = fx.engine.documents().document(&id).unwrap();
    assert_eq!(doc.content_string(), "disk edit");
    assert!(!doc.is_dirty());
    // the reloaded content reaches the surface too
    assert_eq!(set_contents(&surface), vec!["disk edit".to_string()]);
}

#[test]
fn test_keep_choice_preserves_local_edit() {
    let mut fx = fixture_with_prompt(&[("/note.md", "base")], Some(ConflictChoice::KeepLocal));
    let surface = create_ready(&mut fx.engine, "/note.md", Mode::Edit);

    surface.send(SurfaceMsg::ContentChanged {
        content: Some("local edit".to_string()),
        is_dirty: Some(true),
    });
    fx.engine.pump();

    fx.files.insert("/note.md", "disk edit");
    disk_changed(&mut fx, "/note.md");

    let id = fx.engine.surfaces().document_of(surface.surface_id()).unwrap();
    let doc = fx.engine.documents().document(&id).unwrap();
    assert_eq!(doc.content_string(), "local edit");
    assert!(doc.is_dirty());
    assert!(surface.drain().is_empty(), "discarded disk event, no push");
}

#[test]
fn test_dismissed_prompt_defaults_to_keep_local() {
    let mut fx = fixture_with_prompt(&[("/note.md", "base")], None);
    let surface = create_ready(&mut fx.engine, "/note.md", Mode::Edit);

    surface.send(SurfaceMsg::ContentChanged {
        content: Some("local edit".to_string()),
        is_dirty: Some(true),
    });
    fx.engine.pump();

    fx.files.insert("/note.md", "disk edit");
    disk_changed(&mut fx, "/note.md");

    assert_eq!(fx.prompt_asked.load(Ordering::SeqCst), 1);
    let id = fx.engine.surfaces().document_of(surface.surface_id()).unwrap();
    let doc = fx.engine.documents().document(&id).unwrap();
    assert_eq!(doc.content_string(), "local edit");
    assert!(doc.is_dirty());
}

#[test]
fn test_compare_choice_hands_diff_to_host() {
    let mut fx = fixture_with_prompt(&[("/note.md", "base")], Some(ConflictChoice::Compare));
    let surface = create_ready(&mut fx.engine, "/note.md", Mode::Edit);

    surface.send(SurfaceMsg::ContentChanged {
        content: Some("local edit".to_string()),
        is_dirty: Some(true),
    });
    fx.engine.pump();

    fx.files.insert("/note.md", "disk edit");
    disk_changed(&mut fx, "/note.md");

    assert_eq!(fx.recorder.forwarded(), vec!["facet.compare".to_string()]);
    // undecided: local content stays, still dirty
    let id = fx.engine.surfaces().document_of(surface.surface_id()).unwrap();
    let doc = fx.engine.documents().document(&id).unwrap();
    assert_eq!(doc.content_string(), "local edit");
    assert!(doc.is_dirty());
}

// ============================================================================
// Deletion
// ============================================================================

#[test]
fn test_deletion_closes_document_and_surfaces() {
    let mut fx = fixture(&[("/note.md", "v1")]);
    let edit = create_ready(&mut fx.engine, "/note.md", Mode::Edit);
    let read = create_ready(&mut fx.engine, "/note.md", Mode::Read);
    let id = fx.engine.surfaces().document_of(edit.surface_id()).unwrap();

    fx.files.remove("/note.md");
    disk_removed(&mut fx, "/note.md");

    assert!(!fx.engine.documents().contains(&id));
    assert!(fx.engine.surfaces().is_empty());
    assert_eq!(fx.prompt_asked.load(Ordering::SeqCst), 0, "deletion never prompts");
    drop(read);
}

#[test]
fn test_deletion_wins_even_when_dirty() {
    let mut fx = fixture(&[("/note.md", "v1")]);
    let edit = create_ready(&mut fx.engine, "/note.md", Mode::Edit);
    let id = fx.engine.surfaces().document_of(edit.surface_id()).unwrap();

    edit.send(SurfaceMsg::ContentChanged {
        content: Some("unsaved".to_string()),
        is_dirty: Some(true),
    });
    fx.engine.pump();

    fx.files.remove("/note.md");
    disk_removed(&mut fx, "/note.md");

    assert!(!fx.engine.documents().contains(&id));
    assert!(fx.engine.surfaces().is_empty());
}

#[test]
fn test_stale_events_for_closed_documents_are_discarded() {
    let mut fx = fixture(&[("/note.md", "v1")]);
    let edit = create_ready(&mut fx.engine, "/note.md", Mode::Edit);
    let id = fx.engine.surfaces().document_of(edit.surface_id()).unwrap();
    fx.engine.close_document(&id);

    // a watch callback that raced the close
    disk_changed(&mut fx, "/note.md");
    disk_removed(&mut fx, "/note.md");

    assert!(fx.engine.documents().is_empty());
    assert_eq!(fx.prompt_asked.load(Ordering::SeqCst), 0);
}
