//! Show version details

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use treesnap_journal::{Archive, ChangeKind, VersionId};

/// Changed paths printed before truncating
const MAX_LISTED: usize = 20;

pub fn run(root: &Path, version: &str) -> Result<()> {
    let version: VersionId = version.parse()?;
    let archive = Archive::open(root);
    let meta = archive
        .load_meta(&version)
        .with_context(|| format!("Failed to load version {}", version))?;

    println!("{} {}", "version".yellow().bold(), meta.version.to_string().cyan());

    match meta.parent {
        Some(parent) => println!("{} {}", "Parent:    ".dimmed(), parent.to_string().cyan()),
        None => println!("{} {}", "Parent:    ".dimmed(), "(none - root version)".dimmed()),
    }

    println!(
        "{} {} ({})",
        "Date:      ".dimmed(),
        util::format_absolute_time(meta.timestamp),
        util::format_relative_time(meta.timestamp).dimmed()
    );

    if !meta.summary.is_empty() {
        println!("{} {}", "Summary:   ".dimmed(), meta.summary);
    }

    let total_size: u64 = meta.file_index.values().map(|r| r.size).sum();
    println!(
        "{} {} ({})",
        "Files:     ".dimmed(),
        meta.file_index.len(),
        util::format_size(total_size)
    );

    if !meta.changes.is_empty() {
        println!("\n{} ({} files)", "Changes:".bold(), meta.changes.len());
        for change in meta.changes.iter().take(MAX_LISTED) {
            let marker = match change.kind {
                ChangeKind::Add => "A".green().to_string(),
                ChangeKind::Change => "M".yellow().to_string(),
                ChangeKind::Delete => "D".red().to_string(),
            };
            println!("  {} {}", marker, change.path);
        }
        if meta.changes.len() > MAX_LISTED {
            println!("  {} ({} more files omitted)", "...".dimmed(), meta.changes.len() - MAX_LISTED);
        }
    }

    if !meta.no_changes.is_empty() {
        println!("\n{} ({} files)", "Unchanged:".bold(), meta.no_changes.len());
        for entry in meta.no_changes.iter().take(MAX_LISTED) {
            println!("  {} {}", entry.path.dimmed(), format!("-> {}", entry.last_version).cyan());
        }
        if meta.no_changes.len() > MAX_LISTED {
            println!("  {} ({} more files omitted)", "...".dimmed(), meta.no_changes.len() - MAX_LISTED);
        }
    }

    Ok(())
}
