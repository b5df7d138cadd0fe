//! Durable checkpointing and archive management.
//!
//! A checkpoint is the full wallet state serialized as CBOR, written
//! atomically (temp file + rename) to `<dir>/wallet.ckpt`. Archiving
//! copies the current checkpoint into the append-only `<dir>/archive/`
//! directory under a dated name; the retention worker prunes that
//! directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{WalletState, WalletStore};

/// File name of the current checkpoint inside the data directory.
pub const CHECKPOINT_FILE: &str = "wallet.ckpt";

/// Name of the archive directory inside the data directory.
pub const ARCHIVE_DIR: &str = "archive";

impl WalletStore {
    /// Restores a store from a checkpoint file.
    ///
    /// # Errors
    /// Returns [`StoreError::CheckpointMissing`] if the file does not
    /// exist, or a serialization error if it cannot be decoded.
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.is_file() {
            return Err(StoreError::CheckpointMissing {
                path: path.to_path_buf(),
            });
        }
        let bytes = fs::read(path)
            .map_err(|e| StoreError::io(format!("reading checkpoint {}", path.display()), e))?;
        let state: WalletState =
            ciborium::from_reader(bytes.as_slice()).map_err(|e| StoreError::Serialization {
                context: format!("decoding checkpoint {}: {e}", path.display()),
            })?;
        Ok(Self::from_state(state))
    }
}

/// The checkpoint/archive surface the retention worker drives.
///
/// Both steps are attempted every cycle even when the first fails, so they
/// are separate methods rather than one combined operation.
pub trait CheckpointTarget: Send + Sync + 'static {
    /// Compacts the current state to a durable checkpoint.
    ///
    /// # Errors
    /// Returns an error if serializing or writing the checkpoint fails.
    fn checkpoint(&self) -> StoreResult<()>;

    /// Copies the current checkpoint into the archive directory.
    ///
    /// # Errors
    /// Returns an error if no checkpoint exists yet or the copy fails.
    fn archive(&self) -> StoreResult<PathBuf>;
}

/// Checkpoints a [`WalletStore`] into a data directory.
#[derive(Debug)]
pub struct CheckpointManager {
    store: Arc<WalletStore>,
    dir: PathBuf,
    /// Disambiguates archive names created within the same second.
    seq: AtomicU64,
}

impl CheckpointManager {
    /// Creates a manager writing checkpoints for `store` under `dir`.
    #[must_use]
    pub fn new(store: Arc<WalletStore>, dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            dir: dir.into(),
            seq: AtomicU64::new(0),
        }
    }

    /// Path of the current checkpoint file.
    #[must_use]
    pub fn checkpoint_path(&self) -> PathBuf {
        self.dir.join(CHECKPOINT_FILE)
    }

    /// Path of the archive directory.
    #[must_use]
    pub fn archive_dir(&self) -> PathBuf {
        self.dir.join(ARCHIVE_DIR)
    }
}

impl CheckpointTarget for CheckpointManager {
    fn checkpoint(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::io(format!("creating {}", self.dir.display()), e))?;

        let mut encoded = Vec::new();
        ciborium::into_writer(self.store.snapshot().state(), &mut encoded).map_err(|e| {
            StoreError::Serialization {
                context: format!("encoding checkpoint: {e}"),
            }
        })?;

        // Atomic replace: readers never observe a torn checkpoint.
        let path = self.checkpoint_path();
        let tmp = path.with_extension("ckpt.tmp");
        fs::write(&tmp, &encoded)
            .map_err(|e| StoreError::io(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, &path)
            .map_err(|e| StoreError::io(format!("renaming into {}", path.display()), e))?;

        debug!(path = %path.display(), bytes = encoded.len(), "wrote checkpoint");
        Ok(())
    }

    fn archive(&self) -> StoreResult<PathBuf> {
        let checkpoint = self.checkpoint_path();
        if !checkpoint.is_file() {
            return Err(StoreError::CheckpointMissing { path: checkpoint });
        }
        let bytes = fs::read(&checkpoint)
            .map_err(|e| StoreError::io(format!("reading {}", checkpoint.display()), e))?;

        let archive_dir = self.archive_dir();
        fs::create_dir_all(&archive_dir)
            .map_err(|e| StoreError::io(format!("creating {}", archive_dir.display()), e))?;

        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());

        // `seq` restarts at zero in every process, so a name may already
        // exist from an earlier run within the same second. `create_new`
        // refuses to clobber it; bump the sequence and retry.
        loop {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed);
            let target = archive_dir.join(format!("wallet-{secs:010}-{seq:06}.ckpt"));
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StoreError::io(
                        format!("archiving into {}", target.display()),
                        e,
                    ))
                }
            };
            file.write_all(&bytes)
                .map_err(|e| StoreError::io(format!("archiving into {}", target.display()), e))?;
            debug!(path = %target.display(), "archived checkpoint");
            return Ok(target);
        }
    }
}
