//! Display the change log timeline

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use treesnap_journal::Archive;

pub fn run(root: &Path, limit: Option<usize>) -> Result<()> {
    let archive = Archive::open(root);
    let log = archive.change_log().context("Failed to read change log")?;

    if log.is_empty() {
        println!("{}", "No versions yet".dimmed());
        return Ok(());
    }

    let limit = limit.unwrap_or(20);

    // Newest first
    for entry in log.entries().iter().rev().take(limit) {
        print!("{}", entry.version.to_string().yellow());

        if entry.is_latest {
            print!(" {}", "(latest)".green());
        }
        if entry.is_current {
            print!(" {}", "(current)".cyan());
        }

        match entry.parent {
            Some(parent) => print!(" {} {}", "parent".dimmed(), parent.to_string().cyan()),
            None => print!(" {}", "root".dimmed()),
        }

        println!(" [{}]", util::format_relative_time(entry.timestamp).dimmed());

        if !entry.summary.is_empty() {
            println!("    {}", util::short_summary(&entry.summary, 72));
        }
    }

    if log.len() > limit {
        println!();
        println!(
            "{}",
            format!("Showing {} of {} versions (use --limit to see more)", limit, log.len()).dimmed()
        );
    }

    Ok(())
}
