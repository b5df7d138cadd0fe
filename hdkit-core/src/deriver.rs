//! Address-derivation capability.
//!
//! Derivation is an external capability from the registry's point of
//! view (a keychain, an HSM, a remote signer), so the seam is a trait
//! with an async method. [`Sha256AddressDeriver`] is the deterministic
//! reference implementation.

use secrecy::SecretString;
use sha2::{Digest, Sha256};

use hdkit_store::AccountId;

use crate::error::DerivationError;
use crate::types::{passphrase_digest, Address};

/// Label for deriving an address from an account identifier.
const LABEL_ADDRESS: &[u8] = b"hdkit:address";

/// External capability that derives the next address for an account.
pub trait AddressDeriver: Send + Sync {
    /// Derives one fresh address for `account`.
    ///
    /// # Errors
    /// Returns a [`DerivationError`] when the capability cannot produce
    /// an address.
    fn derive_address(
        &self,
        account: &AccountId,
        passphrase: &SecretString,
    ) -> impl std::future::Future<Output = Result<Address, DerivationError>> + Send;
}

/// Deterministic labelled-SHA-256 address deriver.
///
/// The address value is
/// `hex(SHA256("hdkit:address" || root || index_le || passphrase_digest))`,
/// so the same account and passphrase always derive the same address.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256AddressDeriver;

impl AddressDeriver for Sha256AddressDeriver {
    async fn derive_address(
        &self,
        account: &AccountId,
        passphrase: &SecretString,
    ) -> Result<Address, DerivationError> {
        let mut hasher = Sha256::new();
        hasher.update(LABEL_ADDRESS);
        hasher.update(account.root.as_bytes());
        hasher.update(account.index.to_le_bytes());
        hasher.update(passphrase_digest(passphrase));
        Ok(Address {
            value: hex::encode(hasher.finalize()),
            is_used: false,
            is_change: false,
        })
    }
}
