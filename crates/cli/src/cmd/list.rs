//! List versions in the archive

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use treesnap_journal::Archive;

pub fn run(root: &Path) -> Result<()> {
    let archive = Archive::open(root);
    let versions = archive.list().context("Failed to list versions")?;

    if versions.is_empty() {
        println!("{}", "No versions yet".dimmed());
        return Ok(());
    }

    for version in versions {
        let id = format!("{:<8}", version.to_string());

        match archive.load_meta(&version) {
            Ok(meta) => {
                let parent = meta
                    .parent
                    .map(|p| format!("<- {}", p))
                    .unwrap_or_else(|| "(root)".to_string());
                println!(
                    "{} {:<10} {} {}",
                    id.yellow(),
                    parent.dimmed(),
                    util::format_absolute_time(meta.timestamp),
                    util::short_summary(&meta.summary, 60)
                );
            }
            Err(e) => {
                println!("{} {}", id.yellow(), format!("(unreadable: {})", e).red());
            }
        }
    }

    Ok(())
}
