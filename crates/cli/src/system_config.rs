//! System-wide configuration for treesnap
//!
//! System config is stored at `~/.config/treesnap/config.toml` (Linux/macOS)
//! or `%APPDATA%\treesnap\config.toml` (Windows). Command-line flags override it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use treesnap_core::IgnoreSet;

/// System-wide treesnap configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Snapshot creation
    pub snapshot: SnapshotConfig,

    /// Restore behavior
    pub restore: RestoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Ignore patterns replacing the built-in list (default: built-in list)
    pub ignore: Option<Vec<String>>,

    /// Chat history file read from the root when `--chat-file` is absent
    pub chat_file: String,

    /// Hash files in parallel (default: true)
    pub parallel_hash: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            ignore: None,
            chat_file: "chat_history.json".to_string(),
            parallel_hash: true,
        }
    }
}

impl SnapshotConfig {
    /// Compile the configured ignore list, or the built-in one
    pub fn ignore_set(&self) -> Result<IgnoreSet> {
        match &self.ignore {
            Some(patterns) => IgnoreSet::new(patterns).context("Invalid snapshot.ignore in system config"),
            None => Ok(IgnoreSet::default()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    /// Replace existing files without `--overwrite` (default: false)
    pub overwrite: bool,
}

/// Every key `config --get` accepts
pub const KEYS: &[&str] = &[
    "snapshot.ignore",
    "snapshot.chat_file",
    "snapshot.parallel_hash",
    "restore.overwrite",
];

impl SystemConfig {
    /// Look up one `section.key` value, formatted for display
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "snapshot.ignore" => match &self.snapshot.ignore {
                Some(patterns) => serde_json::to_string(patterns)?,
                None => serde_json::to_string(treesnap_core::DEFAULT_IGNORE)?,
            },
            "snapshot.chat_file" => self.snapshot.chat_file.clone(),
            "snapshot.parallel_hash" => self.snapshot.parallel_hash.to_string(),
            "restore.overwrite" => self.restore.overwrite.to_string(),
            _ => anyhow::bail!("Unknown config key: {} (known keys: {})", key, KEYS.join(", ")),
        };
        Ok(value)
    }
}

/// Get the system config directory path
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir().map(|h| h.join(".config/treesnap"))
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::config_dir().map(|c| c.join("treesnap"))
    }
}

/// Get the system config file path
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load system configuration
///
/// Returns default config if file doesn't exist.
pub fn load() -> Result<SystemConfig> {
    let config_path = match config_file_path() {
        Some(p) => p,
        None => {
            tracing::debug!("Could not determine config directory, using defaults");
            return Ok(SystemConfig::default());
        }
    };

    if !config_path.exists() {
        tracing::debug!("System config not found at {}, using defaults", config_path.display());
        return Ok(SystemConfig::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read system config at {}", config_path.display()))?;

    let config: SystemConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse system config at {}", config_path.display()))?;

    tracing::debug!("Loaded system config from {}", config_path.display());
    Ok(config)
}

/// Generate example config content for display
pub fn example_config() -> String {
    let mut content = String::from("# treesnap System Configuration\n");
    content.push_str("# Location: ~/.config/treesnap/config.toml\n");
    content.push_str("#\n");
    content.push_str("# [snapshot] ignore replaces the built-in ignore list entirely, e.g.\n");
    content.push_str("# ignore = [\"index.html\", \"style.css\", \"archive/**\", \"dist/**\"]\n\n");

    content.push_str(&toml::to_string_pretty(&SystemConfig::default()).unwrap_or_default());
    content
}
