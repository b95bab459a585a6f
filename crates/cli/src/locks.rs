//! Advisory lock around archive mutations

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use treesnap_core::ArchiveLayout;

/// Exclusive lock on `archive/.lock`, held for one create or restore
///
/// The lock file itself stays on disk; the flock is released when the
/// descriptor is closed on drop.
pub struct ArchiveLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Lock file content, for humans inspecting a stuck lock
#[derive(Debug, Serialize, Deserialize)]
struct LockContent {
    pid: u32,
    command: String,
    started_at: String,
}

impl ArchiveLock {
    /// Acquire the archive lock (non-blocking)
    ///
    /// Returns error if another process holds it.
    pub fn acquire(layout: &ArchiveLayout, command: &str) -> Result<Self> {
        let lock_path = layout.lock_path();

        std::fs::create_dir_all(layout.archive_dir())
            .with_context(|| format!("Failed to create archive directory {}", layout.archive_dir().display()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .context("Failed to open archive lock file")?;

        if !try_flock_exclusive(&file)? {
            let holder = read_lock_content(&mut file)
                .map(|c| format!(" (pid {}, {} since {})", c.pid, c.command, c.started_at))
                .unwrap_or_default();
            anyhow::bail!("archive is locked by another process{}", holder);
        }

        write_lock_content(&mut file, command)?;
        tracing::debug!(path = %lock_path.display(), command, "acquired archive lock");

        Ok(Self {
            path: lock_path,
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_lock_content(file: &mut File, command: &str) -> Result<()> {
    let content = LockContent {
        pid: std::process::id(),
        command: command.to_string(),
        started_at: chrono::Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S").to_string(),
    };
    let serialized = serde_json::to_string(&content).context("Failed to serialize lock content")?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn read_lock_content(file: &mut File) -> Result<LockContent> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).context("Failed to deserialize lock content")
}

/// Try to acquire exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> Result<bool> {
    Ok(true)
}
