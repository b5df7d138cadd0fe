//! Snapshot-isolated wallet store for `hdkit`.
//!
//! The store holds the full wallet hierarchy (roots → accounts →
//! addresses, plus address metadata) and supports two operation kinds:
//! read-only point-in-time [`Snapshot`]s and serialized read-write
//! [`WalletStore::update`]s. Durability comes from CBOR checkpoints
//! written atomically to disk; the [`RetentionWorker`] keeps the on-disk
//! archive of checkpoints bounded.

mod checkpoint;
mod error;
mod retention;
mod store;
mod types;

pub use checkpoint::{CheckpointManager, CheckpointTarget, ARCHIVE_DIR, CHECKPOINT_FILE};
pub use error::{StoreError, StoreResult};
pub use retention::{RetentionWorker, RETENTION_CAP};
pub use store::{Committed, Snapshot, Update, WalletStore};
pub use types::{AccountId, AccountIndex, AccountRecord, AddressMeta, DecodeError, RootId};
