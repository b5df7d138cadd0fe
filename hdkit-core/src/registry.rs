//! The hierarchical account registry.
//!
//! `AccountRegistry` mediates all account-level mutations against the
//! store and the external address-derivation capability. Reads go through
//! [`get_account`], a pure function over one caller-supplied snapshot.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tracing::{info, warn};

use hdkit_store::{
    AccountId, AccountIndex, Committed, RootId, Snapshot, Update, WalletStore,
};

use crate::deriver::AddressDeriver;
use crate::error::{CreateAccountError, DeleteAccountError, GetAccountError};
use crate::guard::{TimeGuard, DEFAULT_CREATE_DEADLINE};
use crate::types::{passphrase_digest, Account, Address};

/// Create/get/delete operations over wallet accounts.
///
/// Generic over the address-derivation capability `D`.
#[derive(Debug)]
pub struct AccountRegistry<D> {
    store: Arc<WalletStore>,
    deriver: D,
    create_guard: TimeGuard,
}

impl<D: AddressDeriver> AccountRegistry<D> {
    /// Creates a registry with the default create-account deadline.
    #[must_use]
    pub fn new(store: Arc<WalletStore>, deriver: D) -> Self {
        Self::with_create_deadline(store, deriver, DEFAULT_CREATE_DEADLINE)
    }

    /// Creates a registry with an explicit create-account deadline.
    #[must_use]
    pub fn with_create_deadline(store: Arc<WalletStore>, deriver: D, deadline: Duration) -> Self {
        Self {
            store,
            deriver,
            create_guard: TimeGuard::new(deadline),
        }
    }

    /// The store this registry mediates.
    #[must_use]
    pub fn store(&self) -> &Arc<WalletStore> {
        &self.store
    }

    /// Creates an account under the decoded root and derives its first
    /// address.
    ///
    /// The whole operation runs under the create deadline. When address
    /// derivation or persistence fails after the account was created, the
    /// account is **not** rolled back: it remains retrievable with zero
    /// addresses and the caller gets
    /// [`CreateAccountError::FirstAddressGenerationFailed`].
    ///
    /// # Errors
    /// One variant per failure class; see [`CreateAccountError`].
    pub async fn create_account(
        &self,
        root_text: &str,
        name: &str,
        passphrase: &SecretString,
    ) -> Result<Account, CreateAccountError> {
        match self
            .create_guard
            .run(self.create_account_inner(root_text, name, passphrase))
            .await
        {
            Ok(result) => result,
            Err(_deadline) => {
                warn!(name, "create_account exceeded its deadline");
                Err(CreateAccountError::TimeLimitReached)
            }
        }
    }

    async fn create_account_inner(
        &self,
        root_text: &str,
        name: &str,
        passphrase: &SecretString,
    ) -> Result<Account, CreateAccountError> {
        let root = RootId::decode(root_text)?;

        let committed = self
            .store
            .update(Update::CreateAccount {
                root,
                name: name.to_owned(),
                passphrase_digest: passphrase_digest(passphrase),
            })
            .map_err(CreateAccountError::AccountCreationFailed)?;
        let index = match committed {
            Committed::AccountCreated { index } => index,
            Committed::Applied => unreachable!("account creation always allocates an index"),
        };
        let account = AccountId::new(root, index);

        let address = self
            .deriver
            .derive_address(&account, passphrase)
            .await
            .map_err(|e| CreateAccountError::FirstAddressGenerationFailed(e.into()))?;
        self.store
            .update(Update::PutAddress {
                account,
                address: address.value.clone(),
            })
            .map_err(|e| CreateAccountError::FirstAddressGenerationFailed(e.into()))?;

        info!(%account, name, "created account");
        Ok(Account {
            id: account,
            name: name.to_owned(),
            addresses: vec![address],
            available_balance: 0,
        })
    }

    /// Unconditionally removes an account, including all its addresses.
    ///
    /// Deleting an absent (or already-deleted) account is an error, not a
    /// no-op, mirroring the store's own contract.
    ///
    /// # Errors
    /// See [`DeleteAccountError`].
    pub fn delete_account(
        &self,
        root_text: &str,
        index: AccountIndex,
    ) -> Result<(), DeleteAccountError> {
        let root = RootId::decode(root_text)?;
        let account = AccountId::new(root, index);
        self.store
            .update(Update::DeleteAccount { account })
            .map_err(DeleteAccountError::DeleteFailed)?;
        info!(%account, "deleted account");
        Ok(())
    }
}

/// Assembles an account view from one caller-supplied snapshot.
///
/// Pure read: no time guard, no mutation. Every lookup comes from the
/// same already-acquired snapshot, so the view is consistent under
/// concurrent writers. Addresses keep the store's order and count;
/// missing metadata defaults to neither used nor change.
///
/// # Errors
/// See [`GetAccountError`].
pub fn get_account(
    snapshot: &Snapshot,
    root_text: &str,
    index: AccountIndex,
) -> Result<Account, GetAccountError> {
    let root = RootId::decode(root_text)?;
    let account = AccountId::new(root, index);
    let record = snapshot
        .find_account(&account)
        .ok_or(GetAccountError::AccountNotFound { account })?;

    let addresses = record
        .addresses
        .iter()
        .map(|value| {
            let meta = snapshot.lookup_address_metadata(value).unwrap_or_default();
            Address {
                value: value.clone(),
                is_used: meta.is_used,
                is_change: meta.is_change,
            }
        })
        .collect();

    Ok(Account {
        id: account,
        name: record.name.clone(),
        addresses,
        available_balance: snapshot.balance_of(&account).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deriver::Sha256AddressDeriver;
    use crate::error::DerivationError;
    use hdkit_store::StoreError;
    use test_case::test_case;

    const MALFORMED_ID: &str = "not-a-wallet-id";

    fn root_text(byte: u8) -> String {
        RootId::new([byte; 32]).encode()
    }

    fn passphrase() -> SecretString {
        SecretString::from("spending passphrase")
    }

    fn registry() -> AccountRegistry<Sha256AddressDeriver> {
        AccountRegistry::new(Arc::new(WalletStore::new()), Sha256AddressDeriver)
    }

    /// Deriver that always fails, for partial-failure tests.
    struct FailingDeriver;

    impl AddressDeriver for FailingDeriver {
        async fn derive_address(
            &self,
            _account: &AccountId,
            _passphrase: &SecretString,
        ) -> Result<Address, DerivationError> {
            Err(DerivationError::Failed("keychain unavailable".to_owned()))
        }
    }

    /// Deriver that never completes within any reasonable deadline.
    struct StalledDeriver;

    impl AddressDeriver for StalledDeriver {
        async fn derive_address(
            &self,
            account: &AccountId,
            passphrase: &SecretString,
        ) -> Result<Address, DerivationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Sha256AddressDeriver.derive_address(account, passphrase).await
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let registry = registry();
        let root = root_text(1);

        let created = registry
            .create_account(&root, "savings", &passphrase())
            .await
            .unwrap();
        assert_eq!(created.id.index, 0);
        assert_eq!(created.available_balance, 0);
        assert_eq!(created.addresses.len(), 1);

        let fetched =
            get_account(&registry.store().snapshot(), &root, created.id.index).unwrap();
        assert_eq!(fetched, created);
        assert!(!fetched.addresses[0].is_used);
        assert!(!fetched.addresses[0].is_change);
    }

    #[tokio::test]
    async fn create_returns_the_allocated_index() {
        let registry = registry();
        let root = root_text(1);

        for expected in 0..3 {
            let account = registry
                .create_account(&root, "acct", &passphrase())
                .await
                .unwrap();
            assert_eq!(account.id.index, expected);
        }
    }

    #[tokio::test]
    async fn malformed_wallet_id_fails_create_without_mutation() {
        let registry = registry();
        let before = registry.store().snapshot();

        let err = registry
            .create_account(MALFORMED_ID, "savings", &passphrase())
            .await
            .unwrap_err();
        assert!(matches!(err, CreateAccountError::WalletIdDecodingFailed(_)));
        assert_eq!(registry.store().snapshot(), before);
    }

    #[test_case(0; "index zero")]
    #[test_case(9; "other index")]
    fn malformed_wallet_id_fails_get(index: AccountIndex) {
        let registry = registry();
        let err = get_account(&registry.store().snapshot(), MALFORMED_ID, index).unwrap_err();
        assert!(matches!(err, GetAccountError::WalletIdDecodingFailed(_)));
    }

    #[test]
    fn malformed_wallet_id_fails_delete_without_mutation() {
        let registry = registry();
        let before = registry.store().snapshot();

        let err = registry.delete_account(MALFORMED_ID, 0).unwrap_err();
        assert!(matches!(err, DeleteAccountError::WalletIdDecodingFailed(_)));
        assert_eq!(registry.store().snapshot(), before);
    }

    #[tokio::test]
    async fn failed_first_address_leaves_the_account_without_rollback() {
        let registry =
            AccountRegistry::new(Arc::new(WalletStore::new()), FailingDeriver);
        let root = root_text(1);

        let err = registry
            .create_account(&root, "savings", &passphrase())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CreateAccountError::FirstAddressGenerationFailed(_)
        ));

        // The account persists with zero addresses.
        let orphan = get_account(&registry.store().snapshot(), &root, 0).unwrap();
        assert_eq!(orphan.name, "savings");
        assert!(orphan.addresses.is_empty());
        assert_eq!(orphan.available_balance, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn create_times_out_instead_of_returning_partial_success() {
        let registry =
            AccountRegistry::new(Arc::new(WalletStore::new()), StalledDeriver);

        let err = registry
            .create_account(&root_text(1), "savings", &passphrase())
            .await
            .unwrap_err();
        assert!(matches!(err, CreateAccountError::TimeLimitReached));
    }

    #[tokio::test]
    async fn passphrase_mismatch_surfaces_as_creation_failure() {
        let registry = registry();
        let root = root_text(1);

        registry
            .create_account(&root, "first", &passphrase())
            .await
            .unwrap();
        let err = registry
            .create_account(&root, "second", &SecretString::from("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CreateAccountError::AccountCreationFailed(StoreError::PassphraseMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn delete_then_get_reports_not_found() {
        let registry = registry();
        let root = root_text(1);

        let created = registry
            .create_account(&root, "savings", &passphrase())
            .await
            .unwrap();
        registry.delete_account(&root, created.id.index).unwrap();

        let err =
            get_account(&registry.store().snapshot(), &root, created.id.index).unwrap_err();
        assert!(matches!(err, GetAccountError::AccountNotFound { .. }));
    }

    #[tokio::test]
    async fn delete_twice_is_an_error_not_a_no_op() {
        let registry = registry();
        let root = root_text(1);

        let created = registry
            .create_account(&root, "savings", &passphrase())
            .await
            .unwrap();
        registry.delete_account(&root, created.id.index).unwrap();

        let err = registry.delete_account(&root, created.id.index).unwrap_err();
        assert!(matches!(
            err,
            DeleteAccountError::DeleteFailed(StoreError::AccountNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn get_reflects_address_metadata_and_balance() {
        let registry = registry();
        let root = root_text(1);

        let created = registry
            .create_account(&root, "savings", &passphrase())
            .await
            .unwrap();
        let account = created.id;
        let address = created.addresses[0].value.clone();

        registry
            .store()
            .update(Update::SetAddressMeta {
                address,
                is_used: true,
                is_change: false,
            })
            .unwrap();
        registry
            .store()
            .update(Update::SetBalance {
                account,
                balance: 42,
            })
            .unwrap();

        let fetched =
            get_account(&registry.store().snapshot(), &root, account.index).unwrap();
        assert!(fetched.addresses[0].is_used);
        assert!(!fetched.addresses[0].is_change);
        assert_eq!(fetched.available_balance, 42);
    }

    #[tokio::test]
    async fn get_reads_from_its_snapshot_not_the_live_store() {
        let registry = registry();
        let root = root_text(1);

        let created = registry
            .create_account(&root, "savings", &passphrase())
            .await
            .unwrap();
        let snapshot = registry.store().snapshot();

        registry.delete_account(&root, created.id.index).unwrap();

        // The pre-delete snapshot still serves the account.
        assert!(get_account(&snapshot, &root, created.id.index).is_ok());
        let err = get_account(&registry.store().snapshot(), &root, created.id.index)
            .unwrap_err();
        assert!(matches!(err, GetAccountError::AccountNotFound { .. }));
    }
}
