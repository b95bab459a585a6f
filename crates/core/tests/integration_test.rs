//! Integration tests for treesnap core functionality

use std::fs;
use std::path::Path;
use treesnap_core::hash::{hash_bytes, hash_file};
use treesnap_core::store::{atomic_write, copy_preserving, ArchiveLayout};
use treesnap_core::{IgnoreSet, TreeScanner};

fn write(root: &Path, rel: &str, data: &[u8]) -> anyhow::Result<()> {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap())?;
    fs::write(path, data)?;
    Ok(())
}

#[test]
fn test_scan_of_realistic_project() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let root = temp_dir.path();

    // Generated shell and bookkeeping files
    write(root, "index.html", b"<html></html>")?;
    write(root, "style.css", b"body {}")?;
    write(root, "chat_history.json", b"{}")?;
    write(root, "change_log.json", b"{}")?;
    write(root, "archive/v1-1/meta.json", b"{}")?;
    write(root, "archive/v1-1/files/src/main.ts", b"old")?;

    // Tracked project files
    write(root, "src/main.ts", b"main")?;
    write(root, "src/scenes/level1.ts", b"level")?;
    write(root, "assets/hero.png", b"\x89PNG")?;
    write(root, "src/meta.json", b"{\"nested\": true}")?;

    let index = TreeScanner::default().scan(root)?;

    let tracked: Vec<_> = index.keys().map(String::as_str).collect();
    // Bare names only match at the root
    assert_eq!(
        tracked,
        vec!["assets/hero.png", "src/main.ts", "src/meta.json", "src/scenes/level1.ts"]
    );
    assert_eq!(index["src/main.ts"].hash, hash_bytes(b"main"));
    assert_eq!(index["assets/hero.png"].size, 4);
    Ok(())
}

#[test]
fn test_copy_then_hash_matches_index() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let root = temp_dir.path();
    write(root, "data/blob.bin", &[7u8; 20_000])?;

    let layout = ArchiveLayout::new(root);
    let index = TreeScanner::new(IgnoreSet::default()).scan(root)?;

    let dst = layout.payload_path("v1-1", "data/blob.bin");
    let copied = copy_preserving(&root.join("data/blob.bin"), &dst)?;

    assert_eq!(copied, 20_000);
    assert_eq!(hash_file(&dst)?, index["data/blob.bin"].hash);

    // The payload lives under archive/, so it is never rescanned
    let rescanned = TreeScanner::default().scan(root)?;
    assert_eq!(rescanned.len(), 1);
    Ok(())
}

#[test]
fn test_atomic_write_into_archive() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let layout = ArchiveLayout::new(temp_dir.path());

    atomic_write(&layout.meta_path("v2-1"), b"{\"version\": \"v2-1\"}")?;
    atomic_write(&layout.change_log_path(), b"{\"versions\": []}")?;

    assert_eq!(layout.version_dir_names()?, vec!["v2-1"]);
    assert_eq!(fs::read(layout.change_log_path())?, b"{\"versions\": []}");
    Ok(())
}

#[test]
fn test_invalid_ignore_pattern() {
    let err = IgnoreSet::new(["src/[unclosed"]).unwrap_err();
    assert_eq!(err.kind(), treesnap_core::ErrorKind::Invalid);
}
