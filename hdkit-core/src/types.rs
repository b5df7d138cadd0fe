//! View types returned by the account registry.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::{Digest, Sha256};

use hdkit_store::AccountId;

/// Label for digesting a root's spending passphrase.
const LABEL_PASSPHRASE: &[u8] = b"hdkit:passphrase";

/// A derived receiving endpoint associated with exactly one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    /// Opaque address value.
    pub value: String,
    /// Whether the address has appeared in a transaction.
    pub is_used: bool,
    /// Whether the address is an internal change address.
    pub is_change: bool,
}

/// A named, indexed sub-ledger under a root.
///
/// Assembled by the registry from a single store snapshot; mutating the
/// view has no effect on the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Unique identifier: originating root plus allocated index.
    pub id: AccountId,
    /// Human-readable account name.
    pub name: String,
    /// Addresses of the account, in insertion order.
    pub addresses: Vec<Address>,
    /// Precomputed available balance.
    pub available_balance: u64,
}

/// Computes the labelled digest of a spending passphrase.
///
/// Only this digest ever reaches the store; the passphrase itself stays
/// inside its [`SecretString`].
#[must_use]
pub fn passphrase_digest(passphrase: &SecretString) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(LABEL_PASSPHRASE);
    hasher.update(passphrase.expose_secret().as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic_and_passphrase_sensitive() {
        let a = passphrase_digest(&SecretString::from("correct horse"));
        let b = passphrase_digest(&SecretString::from("correct horse"));
        let c = passphrase_digest(&SecretString::from("battery staple"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
