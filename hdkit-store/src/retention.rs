//! Perpetual checkpoint/archive/retention worker.
//!
//! Each cycle checkpoints the store, archives the checkpoint, prunes the
//! archive directory down to the newest [`RETENTION_CAP`] files, and
//! sleeps for the configured interval. Per-step failures are caught and
//! logged so one failing step never blocks the others. The cycle loop runs
//! in its own task: anything that escapes the per-step safeguards (a
//! panic) is captured by the supervisor, which logs it, sleeps a fixed
//! cooldown, and restarts the loop, so the worker never permanently stops
//! on a transient failure. Shutdown is an explicit watch signal.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::checkpoint::CheckpointTarget;
use crate::error::{StoreError, StoreResult};

/// Maximum number of archive files retained after pruning.
pub const RETENTION_CAP: usize = 10;

/// How long the supervisor waits before restarting an escaped cycle loop.
const RESTART_COOLDOWN: Duration = Duration::from_secs(60);

/// Background worker keeping the store compact and the archive bounded.
#[derive(Debug)]
pub struct RetentionWorker<T> {
    target: Arc<T>,
    archive_dir: PathBuf,
    interval: Duration,
}

impl<T: CheckpointTarget> RetentionWorker<T> {
    /// Creates a worker driving `target` every `interval`, pruning
    /// `archive_dir`.
    #[must_use]
    pub fn new(target: Arc<T>, archive_dir: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            target,
            archive_dir: archive_dir.into(),
            interval,
        }
    }

    /// Spawns the worker. It runs until `shutdown` changes (or its sender
    /// is dropped).
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.supervise(shutdown))
    }

    /// Supervision loop: restart the cycle loop after any escaped failure,
    /// with a fixed cooldown in between.
    async fn supervise(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let cycles = tokio::spawn(Self::cycle_loop(
                Arc::clone(&self.target),
                self.archive_dir.clone(),
                self.interval,
                shutdown.clone(),
            ));
            match cycles.await {
                // The cycle loop only returns on shutdown.
                Ok(()) => return,
                Err(escaped) => {
                    error!(error = %escaped, "retention cycle escaped its safeguards; restarting after cooldown");
                }
            }
            tokio::select! {
                _ = shutdown.changed() => return,
                () = tokio::time::sleep(RESTART_COOLDOWN) => {}
            }
        }
    }

    async fn cycle_loop(
        target: Arc<T>,
        archive_dir: PathBuf,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            // Archive is attempted even when the checkpoint step failed.
            if let Err(err) = target.checkpoint() {
                warn!(error = %err, "checkpoint failed");
            }
            if let Err(err) = target.archive() {
                warn!(error = %err, "archiving checkpoint failed");
            }
            match prune_archive(&archive_dir) {
                Ok(0) => {}
                Ok(removed) => info!(removed, "pruned archive files"),
                Err(err) => warn!(error = %err, "archive pruning failed"),
            }

            tokio::select! {
                _ = shutdown.changed() => return,
                () = tokio::time::sleep(interval) => {}
            }
        }
    }
}

/// Deletes every archive file beyond the [`RETENTION_CAP`] most recent,
/// ordered by modification time (file name as tie-break). The single most
/// recent file is always kept. Returns the number of files removed.
fn prune_archive(dir: &Path) -> StoreResult<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }

    let entries = fs::read_dir(dir)
        .map_err(|e| StoreError::io(format!("listing {}", dir.display()), e))?;
    let mut files: Vec<(SystemTime, OsString, PathBuf)> = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| StoreError::io(format!("listing {}", dir.display()), e))?;
        let metadata = entry
            .metadata()
            .map_err(|e| StoreError::io(format!("inspecting {}", entry.path().display()), e))?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata
            .modified()
            .map_err(|e| StoreError::io(format!("inspecting {}", entry.path().display()), e))?;
        files.push((modified, entry.file_name(), entry.path()));
    }

    // Newest first.
    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    let mut removed = 0;
    for (_, _, path) in files.iter().skip(RETENTION_CAP) {
        fs::remove_file(path)
            .map_err(|e| StoreError::io(format!("removing {}", path.display()), e))?;
        removed += 1;
    }
    Ok(removed)
}
