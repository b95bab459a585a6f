//! Create a new version from the working tree

use crate::locks::ArchiveLock;
use crate::{system_config, util};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use treesnap_journal::{Archive, ChangeKind, SnapshotOptions, VersionId};

pub fn run(
    root: &Path,
    summary: &str,
    parent: Option<&str>,
    ignore_file: Option<PathBuf>,
    chat_file: Option<PathBuf>,
) -> Result<()> {
    // 1. Effective settings: flags first, then system config
    let config = system_config::load()?;

    let ignore = util::ignore_set(ignore_file.as_deref(), &config.snapshot)?;

    let chat = match chat_file {
        Some(path) => util::load_chat_file(&path)?,
        None => util::load_default_chat(root, &config.snapshot.chat_file),
    };

    let parent = parent
        .filter(|p| !p.is_empty())
        .map(str::parse::<VersionId>)
        .transpose()
        .context("Invalid --parent")?;

    let archive = Archive::with_options(
        root,
        SnapshotOptions {
            ignore,
            parallel_hash: config.snapshot.parallel_hash,
            mark_current: true,
        },
    );

    // 2. Snapshot under the archive lock
    let version = {
        let _lock = ArchiveLock::acquire(archive.layout(), "create")?;
        archive
            .create(parent, summary, chat)
            .context("Failed to create version")?
    };

    // 3. Report
    let meta = archive.load_meta(&version)?;
    let count = |kind| meta.changes_of_kind(kind).count();

    println!(
        "{} Created version {}",
        "✓".green(),
        version.to_string().yellow().bold()
    );
    if let Some(parent) = meta.parent {
        println!("  {} {}", "Parent:   ".dimmed(), parent.to_string().cyan());
    }
    println!(
        "  {} {} added, {} changed, {} deleted, {} unchanged",
        "Changes:  ".dimmed(),
        count(ChangeKind::Add).to_string().green(),
        count(ChangeKind::Change).to_string().yellow(),
        count(ChangeKind::Delete).to_string().red(),
        meta.no_changes.len()
    );
    println!(
        "  {} {}",
        "Location: ".dimmed(),
        archive.layout().version_dir(&version.to_string()).display()
    );

    Ok(())
}
