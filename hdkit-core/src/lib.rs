//! Hierarchical wallet account registry for `hdkit`.
//!
//! Accounts are derived deterministically under wallet roots and live in
//! a snapshot-isolated [`hdkit_store::WalletStore`]. This crate exposes
//! the [`AccountRegistry`] (create/get/delete), the
//! [`AddressDeriver`] capability seam, and the [`TimeGuard`] that bounds
//! mutating operations with a wall-clock deadline.

mod deriver;
mod error;
mod guard;
mod registry;
mod types;

pub use deriver::{AddressDeriver, Sha256AddressDeriver};
pub use error::{
    AddressGenerationError, CreateAccountError, DeleteAccountError, DerivationError,
    GetAccountError,
};
pub use guard::{DeadlineExceeded, TimeGuard, DEFAULT_CREATE_DEADLINE};
pub use registry::{get_account, AccountRegistry};
pub use types::{passphrase_digest, Account, Address};

pub use hdkit_store::{AccountId, AccountIndex, DecodeError, RootId, Snapshot, StoreError};
