//! Tests for the tar.gz archive engine
//!

use std::fs;

use common::{archive_names, workspace};
use world_backup::{
    ArchiveEngine, ArchiveError, OverwritePolicy, TarGzEngine, archive::MemberKind,
};

mod common;

#[test]
fn archives_the_whole_tree_in_walk_order() {
    let workspace = workspace();
    fs::create_dir_all(workspace.source.join("region")).unwrap();
    fs::write(workspace.source.join("region").join("r.0.0.mca"), "chunk").unwrap();
    let destination = workspace.directory.path().join("world.tar.gz");

    let manifest = TarGzEngine::default()
        .create(
            &destination,
            OverwritePolicy::CreateExclusive,
            &workspace.source,
            true,
        )
        .unwrap();

    assert_eq!(manifest.root(), "world");

    let members: Vec<_> = manifest
        .members()
        .iter()
        .map(|member| member.path.clone())
        .collect();
    assert_eq!(archive_names(&destination), members);

    for expected in ["world", "world/a.txt", "world/b.txt", "world/region", "world/region/r.0.0.mca"] {
        assert!(members.contains(&String::from(expected)), "{expected} missing");
    }

    let b = manifest
        .members()
        .iter()
        .find(|member| member.path == "world/b.txt")
        .unwrap();
    assert_eq!(b.kind, MemberKind::File);
    assert_eq!(b.size, 20);

    assert!(manifest.contains_top_level("region"));
    assert!(!manifest.contains_top_level("r.0.0.mca"));
}

#[test]
fn non_recursive_archives_only_the_root() {
    let workspace = workspace();
    let destination = workspace.directory.path().join("world.tar.gz");

    let manifest = TarGzEngine::default()
        .create(
            &destination,
            OverwritePolicy::CreateExclusive,
            &workspace.source,
            false,
        )
        .unwrap();

    assert_eq!(manifest.len(), 1);
    assert!(!manifest.contains_top_level("a.txt"));
}

#[test]
fn exclusive_refuses_existing_archive() {
    let workspace = workspace();
    let destination = workspace.directory.path().join("world.tar.gz");
    fs::write(&destination, "previous backup").unwrap();

    let result = TarGzEngine::default().create(
        &destination,
        OverwritePolicy::CreateExclusive,
        &workspace.source,
        true,
    );

    assert!(matches!(result, Err(ArchiveError::AlreadyExists(_))));
    assert_eq!(fs::read_to_string(&destination).unwrap(), "previous backup");
}

#[test]
fn overwrite_replaces_existing_archive() {
    let workspace = workspace();
    let destination = workspace.directory.path().join("world.tar.gz");
    fs::write(&destination, "previous backup").unwrap();

    TarGzEngine::default()
        .create(
            &destination,
            OverwritePolicy::Overwrite,
            &workspace.source,
            true,
        )
        .unwrap();

    assert!(archive_names(&destination).contains(&String::from("world/a.txt")));
    assert!(!workspace.directory.path().join("world.tar.gz.partial").exists());
}

#[test]
fn failed_overwrite_keeps_previous_archive() {
    let workspace = workspace();
    let destination = workspace.directory.path().join("world.tar.gz");
    fs::write(&destination, "previous backup").unwrap();

    let result = TarGzEngine::default().create(
        &destination,
        OverwritePolicy::Overwrite,
        &workspace.source.join("a.txt"),
        true,
    );

    assert!(matches!(result, Err(ArchiveError::NotDirectory(_))));
    assert_eq!(fs::read_to_string(&destination).unwrap(), "previous backup");
}

#[test]
fn missing_source_leaves_no_archive() {
    let workspace = workspace();
    let destination = workspace.directory.path().join("world.tar.gz");

    let result = TarGzEngine::default().create(
        &destination,
        OverwritePolicy::CreateExclusive,
        &workspace.directory.path().join("missing"),
        true,
    );

    assert!(matches!(result, Err(ArchiveError::Io(..))));
    assert!(!destination.exists());
}

#[cfg(unix)]
#[test]
fn symlinks_are_stored_not_followed() {
    let workspace = workspace();
    std::os::unix::fs::symlink("a.txt", workspace.source.join("latest")).unwrap();
    let destination = workspace.directory.path().join("world.tar.gz");

    let manifest = TarGzEngine::default()
        .create(
            &destination,
            OverwritePolicy::CreateExclusive,
            &workspace.source,
            true,
        )
        .unwrap();

    let link = manifest
        .members()
        .iter()
        .find(|member| member.path == "world/latest")
        .unwrap();
    assert_eq!(link.kind, MemberKind::Symlink);
}
