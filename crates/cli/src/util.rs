//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use treesnap_core::IgnoreSet;

use crate::system_config::SnapshotConfig;

/// Resolve the working tree root: `--root` when given, else the current directory
pub fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    let root = match root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }
    Ok(root)
}

/// Read a JSON array of glob patterns
pub fn load_ignore_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read ignore file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Ignore file {} is not a JSON list of strings", path.display()))
}

/// Ignore rules for one invocation: `--ignore-file` replaces the configured set
///
/// Create and restore must agree on these, or restore deletes files that were
/// never tracked.
pub fn ignore_set(ignore_file: Option<&Path>, config: &SnapshotConfig) -> Result<IgnoreSet> {
    match ignore_file {
        Some(path) => IgnoreSet::new(load_ignore_file(path)?)
            .with_context(|| format!("Invalid pattern in {}", path.display())),
        None => config.ignore_set(),
    }
}

/// Read an explicitly requested chat file; any failure is an error
pub fn load_chat_file(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read chat file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse chat file {}", path.display()))
}

/// Load the default chat history beside the working tree
///
/// Missing file is `{}`. A file that exists but does not parse becomes a
/// `{"warning": ...}` payload instead of failing the snapshot.
pub fn load_default_chat(root: &Path, file_name: &str) -> Value {
    let path = root.join(file_name);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) if !path.exists() => return serde_json::json!({}),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "chat history unreadable");
            return parse_warning(file_name);
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "chat history failed to parse");
            parse_warning(file_name)
        }
    }
}

fn parse_warning(file_name: &str) -> Value {
    serde_json::json!({ "warning": format!("{} exists but failed to parse", file_name) })
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts: NaiveDateTime) -> String {
    let now = chrono::Local::now().naive_local();
    let seconds = (now - ts).num_seconds();

    if seconds < 0 {
        "in the future".to_string()
    } else if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format timestamp as absolute time ("2024-01-03 14:30:00")
pub fn format_absolute_time(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format byte count as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// First line of a summary, cut to `max` characters
pub fn short_summary(summary: &str, max: usize) -> String {
    let line = summary.lines().next().unwrap_or("");
    if line.chars().count() <= max {
        return line.to_string();
    }
    let cut: String = line.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}
