//! The snapshot-isolated wallet store.
//!
//! `WalletStore` keeps the full wallet hierarchy behind an
//! `Arc<WalletState>`. Readers take cheap immutable [`Snapshot`]s; writers
//! go through [`WalletStore::update`], which serializes commands behind a
//! dedicated writer lock and commits copy-on-write, so a snapshot never
//! observes a half-applied update.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::types::{AccountId, AccountIndex, AccountRecord, AddressMeta, RootId};

// State

/// Per-root namespace: passphrase digest, index allocator, and accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RootState {
    /// Labelled digest of the root's spending passphrase, recorded on the
    /// first account creation and verified on every later one.
    pub(crate) passphrase_digest: [u8; 32],
    /// Next free account index. Monotonic; indices are never reused, even
    /// after the account they named is deleted.
    pub(crate) next_index: AccountIndex,
    /// Accounts keyed by index.
    pub(crate) accounts: BTreeMap<AccountIndex, AccountRecord>,
}

/// The full persisted wallet hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct WalletState {
    /// Root namespaces keyed by root identifier.
    pub(crate) roots: BTreeMap<RootId, RootState>,
    /// Address metadata keyed by address value.
    pub(crate) address_meta: BTreeMap<String, AddressMeta>,
}

impl WalletState {
    fn account_mut(&mut self, account: &AccountId) -> StoreResult<&mut AccountRecord> {
        self.roots
            .get_mut(&account.root)
            .and_then(|root| root.accounts.get_mut(&account.index))
            .ok_or(StoreError::AccountNotFound { account: *account })
    }

    fn apply(&mut self, update: Update) -> StoreResult<Committed> {
        match update {
            Update::CreateAccount {
                root,
                name,
                passphrase_digest,
            } => {
                let root_state = self.roots.entry(root).or_insert_with(|| RootState {
                    passphrase_digest,
                    next_index: 0,
                    accounts: BTreeMap::new(),
                });
                if root_state.passphrase_digest != passphrase_digest {
                    return Err(StoreError::PassphraseMismatch { root });
                }
                let index = root_state.next_index;
                root_state.next_index += 1;
                root_state.accounts.insert(
                    index,
                    AccountRecord {
                        name,
                        addresses: Vec::new(),
                        balance: 0,
                    },
                );
                Ok(Committed::AccountCreated { index })
            }
            Update::PutAddress { account, address } => {
                let record = self.account_mut(&account)?;
                if !record.addresses.contains(&address) {
                    record.addresses.push(address);
                }
                Ok(Committed::Applied)
            }
            Update::SetAddressMeta {
                address,
                is_used,
                is_change,
            } => {
                self.address_meta
                    .insert(address, AddressMeta { is_used, is_change });
                Ok(Committed::Applied)
            }
            Update::SetBalance { account, balance } => {
                self.account_mut(&account)?.balance = balance;
                Ok(Committed::Applied)
            }
            Update::DeleteAccount { account } => {
                let root_state = self
                    .roots
                    .get_mut(&account.root)
                    .ok_or(StoreError::AccountNotFound { account })?;
                let record = root_state
                    .accounts
                    .remove(&account.index)
                    .ok_or(StoreError::AccountNotFound { account })?;
                for address in &record.addresses {
                    self.address_meta.remove(address);
                }
                Ok(Committed::Applied)
            }
        }
    }
}

// Commands

/// A serialized mutation of the wallet hierarchy.
///
/// Updates are applied one at a time, strictly ordered; each commits fully
/// before the next begins.
#[derive(Debug, Clone)]
pub enum Update {
    /// Creates an account under `root`, allocating the next free index.
    ///
    /// The root namespace is created implicitly on first use, recording
    /// `passphrase_digest`; later creations under the same root must
    /// present a matching digest.
    CreateAccount {
        /// Root to create the account under.
        root: RootId,
        /// Human-readable account name.
        name: String,
        /// Labelled digest of the spending passphrase.
        passphrase_digest: [u8; 32],
    },
    /// Appends an address to an existing account (no-op on duplicates).
    PutAddress {
        /// The owning account.
        account: AccountId,
        /// The address value to append.
        address: String,
    },
    /// Records used/change metadata for an address value.
    SetAddressMeta {
        /// The address value the metadata belongs to.
        address: String,
        /// Whether the address has appeared in a transaction.
        is_used: bool,
        /// Whether the address is an internal change address.
        is_change: bool,
    },
    /// Records the precomputed available balance of an account.
    SetBalance {
        /// The account to update.
        account: AccountId,
        /// The new available balance.
        balance: u64,
    },
    /// Unconditionally removes an account and all its addresses.
    ///
    /// Deleting an absent account is an error, not a no-op.
    DeleteAccount {
        /// The account to remove.
        account: AccountId,
    },
}

impl Update {
    /// Command name for logging. Never includes payload fields.
    const fn kind(&self) -> &'static str {
        match self {
            Self::CreateAccount { .. } => "create_account",
            Self::PutAddress { .. } => "put_address",
            Self::SetAddressMeta { .. } => "set_address_meta",
            Self::SetBalance { .. } => "set_balance",
            Self::DeleteAccount { .. } => "delete_account",
        }
    }
}

/// Outcome of a committed update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Committed {
    /// An account was created with the given allocated index.
    AccountCreated {
        /// The index the store allocated within the root's namespace.
        index: AccountIndex,
    },
    /// The update committed with no value to report.
    Applied,
}

// Store

/// Snapshot-isolated, transactionally-updated wallet store.
#[derive(Debug, Default)]
pub struct WalletStore {
    /// Current committed state. Swapped atomically on each update.
    current: RwLock<Arc<WalletState>>,
    /// Serializes writers: one update commits fully before the next begins.
    writer: Mutex<()>,
}

impl WalletStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_state(state: WalletState) -> Self {
        Self {
            current: RwLock::new(Arc::new(state)),
            writer: Mutex::new(()),
        }
    }

    /// Takes an immutable point-in-time snapshot of the store.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let current = self
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Snapshot(Arc::clone(&current))
    }

    /// Applies one update to the store.
    ///
    /// Updates are serialized and commit copy-on-write: concurrent
    /// snapshots keep observing the pre-update state.
    ///
    /// # Errors
    /// Returns the first [`StoreError`] the command runs into; on error
    /// nothing is committed.
    pub fn update(&self, update: Update) -> StoreResult<Committed> {
        let kind = update.kind();
        let _serialized = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = WalletState::clone(&self.snapshot().0);
        let committed = next.apply(update)?;
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        debug!(update = kind, "committed update");
        Ok(committed)
    }
}

// Snapshot

/// An immutable point-in-time view of the wallet hierarchy.
///
/// Cloning is cheap; all lookups read the state as of the moment the
/// snapshot was taken, regardless of concurrent writers.
#[derive(Debug, Clone)]
pub struct Snapshot(Arc<WalletState>);

impl Snapshot {
    /// Looks up an account record.
    #[must_use]
    pub fn find_account(&self, account: &AccountId) -> Option<&AccountRecord> {
        self.0
            .roots
            .get(&account.root)
            .and_then(|root| root.accounts.get(&account.index))
    }

    /// Lists the address values of an account, in insertion order.
    #[must_use]
    pub fn list_addresses_for_account(&self, account: &AccountId) -> Option<&[String]> {
        self.find_account(account)
            .map(|record| record.addresses.as_slice())
    }

    /// Looks up the used/change metadata recorded for an address value.
    ///
    /// `None` means no metadata was ever recorded; callers treat that as
    /// the default (neither used nor change).
    #[must_use]
    pub fn lookup_address_metadata(&self, address: &str) -> Option<AddressMeta> {
        self.0.address_meta.get(address).copied()
    }

    /// Reads the precomputed available balance of an account.
    #[must_use]
    pub fn balance_of(&self, account: &AccountId) -> Option<u64> {
        self.find_account(account).map(|record| record.balance)
    }

    /// Lists the account indices that exist under a root.
    #[must_use]
    pub fn account_indices(&self, root: &RootId) -> Vec<AccountIndex> {
        self.0
            .roots
            .get(root)
            .map(|state| state.accounts.keys().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn state(&self) -> &WalletState {
        &self.0
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Snapshot {}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(byte: u8) -> RootId {
        RootId::new([byte; 32])
    }

    fn create(store: &WalletStore, root: RootId, name: &str, digest: [u8; 32]) -> AccountIndex {
        match store
            .update(Update::CreateAccount {
                root,
                name: name.to_owned(),
                passphrase_digest: digest,
            })
            .unwrap()
        {
            Committed::AccountCreated { index } => index,
            Committed::Applied => panic!("create must allocate an index"),
        }
    }

    #[test]
    fn update_kind_names_every_command() {
        let account = AccountId::new(root(1), 0);
        let cases = [
            (
                Update::CreateAccount {
                    root: root(1),
                    name: String::new(),
                    passphrase_digest: [0; 32],
                },
                "create_account",
            ),
            (
                Update::PutAddress {
                    account,
                    address: String::new(),
                },
                "put_address",
            ),
            (
                Update::SetAddressMeta {
                    address: String::new(),
                    is_used: false,
                    is_change: false,
                },
                "set_address_meta",
            ),
            (
                Update::SetBalance {
                    account,
                    balance: 0,
                },
                "set_balance",
            ),
            (Update::DeleteAccount { account }, "delete_account"),
        ];
        for (update, expected) in cases {
            assert_eq!(update.kind(), expected);
        }
    }

    #[test]
    fn create_allocates_sequential_indices() {
        let store = WalletStore::new();
        let r = root(1);
        assert_eq!(create(&store, r, "a", [0; 32]), 0);
        assert_eq!(create(&store, r, "b", [0; 32]), 1);
        assert_eq!(create(&store, r, "c", [0; 32]), 2);

        // A different root has its own namespace.
        assert_eq!(create(&store, root(2), "d", [0; 32]), 0);
    }

    #[test]
    fn create_verifies_passphrase_digest() {
        let store = WalletStore::new();
        let r = root(1);
        create(&store, r, "a", [7; 32]);

        let err = store
            .update(Update::CreateAccount {
                root: r,
                name: "b".to_owned(),
                passphrase_digest: [8; 32],
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::PassphraseMismatch { root } if root == r));
    }

    #[test]
    fn put_address_is_idempotent_on_duplicates() {
        let store = WalletStore::new();
        let r = root(1);
        let index = create(&store, r, "a", [0; 32]);
        let account = AccountId::new(r, index);

        for _ in 0..2 {
            store
                .update(Update::PutAddress {
                    account,
                    address: "addr-0".to_owned(),
                })
                .unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(
            snapshot.list_addresses_for_account(&account).unwrap(),
            ["addr-0".to_owned()]
        );
    }

    #[test]
    fn put_address_on_missing_account_fails() {
        let store = WalletStore::new();
        let account = AccountId::new(root(1), 0);
        let err = store
            .update(Update::PutAddress {
                account,
                address: "addr-0".to_owned(),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::AccountNotFound { .. }));
    }

    #[test]
    fn metadata_defaults_to_absent_until_set() {
        let store = WalletStore::new();
        assert_eq!(store.snapshot().lookup_address_metadata("addr-0"), None);

        store
            .update(Update::SetAddressMeta {
                address: "addr-0".to_owned(),
                is_used: true,
                is_change: false,
            })
            .unwrap();
        assert_eq!(
            store.snapshot().lookup_address_metadata("addr-0"),
            Some(AddressMeta {
                is_used: true,
                is_change: false,
            })
        );
    }

    #[test]
    fn balance_starts_at_zero_and_follows_set_balance() {
        let store = WalletStore::new();
        let r = root(1);
        let account = AccountId::new(r, create(&store, r, "a", [0; 32]));
        assert_eq!(store.snapshot().balance_of(&account), Some(0));

        store
            .update(Update::SetBalance {
                account,
                balance: 1_000,
            })
            .unwrap();
        assert_eq!(store.snapshot().balance_of(&account), Some(1_000));
    }

    #[test]
    fn delete_removes_account_and_its_metadata() {
        let store = WalletStore::new();
        let r = root(1);
        let account = AccountId::new(r, create(&store, r, "a", [0; 32]));
        store
            .update(Update::PutAddress {
                account,
                address: "addr-0".to_owned(),
            })
            .unwrap();
        store
            .update(Update::SetAddressMeta {
                address: "addr-0".to_owned(),
                is_used: true,
                is_change: true,
            })
            .unwrap();

        store.update(Update::DeleteAccount { account }).unwrap();

        let snapshot = store.snapshot();
        assert!(snapshot.find_account(&account).is_none());
        assert_eq!(snapshot.lookup_address_metadata("addr-0"), None);
    }

    #[test]
    fn delete_of_absent_account_is_an_error() {
        let store = WalletStore::new();
        let account = AccountId::new(root(1), 0);
        let err = store.update(Update::DeleteAccount { account }).unwrap_err();
        assert!(matches!(err, StoreError::AccountNotFound { .. }));
    }

    #[test]
    fn indices_are_not_reused_after_deletion() {
        let store = WalletStore::new();
        let r = root(1);
        let first = create(&store, r, "a", [0; 32]);
        store
            .update(Update::DeleteAccount {
                account: AccountId::new(r, first),
            })
            .unwrap();

        let second = create(&store, r, "b", [0; 32]);
        assert_eq!(second, first + 1);
    }

    #[test]
    fn snapshots_are_isolated_from_later_updates() {
        let store = WalletStore::new();
        let r = root(1);
        let before = store.snapshot();

        let account = AccountId::new(r, create(&store, r, "a", [0; 32]));
        let after = store.snapshot();

        assert!(before.find_account(&account).is_none());
        assert!(after.find_account(&account).is_some());
        assert_ne!(before, after);
    }
}
