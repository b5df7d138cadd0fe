//! Typed operation errors for the account registry.
//!
//! One enum per operation, one variant per failure class. Errors are
//! returned as values and never cross the API boundary as panics.

use thiserror::Error;

use hdkit_store::{AccountId, DecodeError, StoreError};

/// Failure of the external address-derivation capability.
#[derive(Debug, Error)]
pub enum DerivationError {
    /// The capability could not derive an address.
    #[error("derivation_failed: {0}")]
    Failed(String),
}

/// Failure deriving or persisting the first address of a new account.
#[derive(Debug, Error)]
pub enum AddressGenerationError {
    /// The derivation capability failed.
    #[error(transparent)]
    Derivation(#[from] DerivationError),
    /// Persisting the derived address failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors returned by `create_account`.
#[derive(Debug, Error)]
pub enum CreateAccountError {
    /// The wallet identifier could not be decoded.
    #[error("wallet_id_decoding_failed: {0}")]
    WalletIdDecodingFailed(#[from] DecodeError),
    /// The store rejected the account creation.
    #[error("account_creation_failed: {0}")]
    AccountCreationFailed(#[source] StoreError),
    /// The account was created, but its first address was not.
    ///
    /// The account persists in the store with zero addresses; it is not
    /// rolled back.
    #[error("first_address_generation_failed: {0}")]
    FirstAddressGenerationFailed(#[source] AddressGenerationError),
    /// The operation exceeded its wall-clock deadline. Side effects up to
    /// the timeout are undefined from the caller's point of view.
    #[error("time_limit_reached")]
    TimeLimitReached,
}

/// Errors returned by `get_account`.
#[derive(Debug, Error)]
pub enum GetAccountError {
    /// The wallet identifier could not be decoded.
    #[error("wallet_id_decoding_failed: {0}")]
    WalletIdDecodingFailed(#[from] DecodeError),
    /// The snapshot holds no such account.
    #[error("account_not_found: {account}")]
    AccountNotFound {
        /// The account that was not found.
        account: AccountId,
    },
}

/// Errors returned by `delete_account`.
#[derive(Debug, Error)]
pub enum DeleteAccountError {
    /// The wallet identifier could not be decoded.
    #[error("wallet_id_decoding_failed: {0}")]
    WalletIdDecodingFailed(#[from] DecodeError),
    /// The store rejected the removal (including not-found).
    #[error("delete_failed: {0}")]
    DeleteFailed(#[source] StoreError),
}
