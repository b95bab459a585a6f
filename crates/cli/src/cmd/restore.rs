//! Restore working tree to a version

use crate::locks::ArchiveLock;
use crate::{system_config, util};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use treesnap_journal::{Archive, RestoreWarning, SnapshotOptions, VersionId};

/// Warnings printed before truncating
const MAX_WARNINGS: usize = 10;

pub fn run(root: &Path, version: &str, overwrite: bool, ignore_file: Option<PathBuf>) -> Result<()> {
    let version: VersionId = version.parse()?;
    let config = system_config::load()?;
    let overwrite = overwrite || config.restore.overwrite;

    let archive = Archive::with_options(
        root,
        SnapshotOptions {
            ignore: util::ignore_set(ignore_file.as_deref(), &config.snapshot)?,
            parallel_hash: config.snapshot.parallel_hash,
            ..SnapshotOptions::default()
        },
    );

    let report = {
        let _lock = ArchiveLock::acquire(archive.layout(), "restore")?;
        archive
            .restore(&version, overwrite)
            .with_context(|| format!("Failed to restore {}", version))?
    };

    for path in &report.deleted {
        println!("{} Deleted extra file: {}", "-".red(), path);
    }

    let kept = report
        .warnings
        .iter()
        .filter(|w| matches!(w, RestoreWarning::KeptExisting { .. }))
        .count();
    let problems: Vec<&RestoreWarning> = report
        .warnings
        .iter()
        .filter(|w| !matches!(w, RestoreWarning::KeptExisting { .. }))
        .collect();

    if kept > 0 {
        println!(
            "{}",
            format!("Skipped {} existing files (use --overwrite to force)", kept).dimmed()
        );
    }

    if !problems.is_empty() {
        println!();
        println!("{}", "Warnings:".yellow().bold());
        for warning in problems.iter().take(MAX_WARNINGS) {
            println!("  {}", warning.to_string().yellow());
        }
        if problems.len() > MAX_WARNINGS {
            println!("  ... and {} more", problems.len() - MAX_WARNINGS);
        }
        println!();
    }

    if report.success() {
        println!(
            "{} Restored {} ({} files written, {} removed)",
            "✓".green(),
            version.to_string().yellow(),
            report.restored.len().to_string().green(),
            report.deleted.len()
        );
    } else {
        let missing = report.missing().count();
        println!(
            "{} Restored {} with {} missing files ({} files written, {} removed)",
            "⚠".yellow(),
            version.to_string().yellow(),
            missing.to_string().red(),
            report.restored.len(),
            report.deleted.len()
        );
    }

    Ok(())
}
