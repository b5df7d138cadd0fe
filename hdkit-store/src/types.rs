//! Identifier and record types for the wallet hierarchy.
//!
//! The hierarchy is roots → accounts → addresses. Identifiers are plain
//! value types so they can double as map keys in the persisted state.

use std::fmt;

use serde::{Deserialize, Serialize};

// Identifiers

/// A 32-byte wallet root identifier.
///
/// Roots are the top-level entities of the hierarchy; every account lives
/// under exactly one root. A `RootId` is obtained by decoding the external
/// textual representation (64 lowercase hex characters) and is immutable
/// once created.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RootId(pub [u8; 32]);

impl RootId {
    /// Creates a new `RootId` from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes of the root identifier.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decodes a `RootId` from its external textual representation.
    ///
    /// # Errors
    /// Returns an error if the text is not valid hex or does not decode to
    /// exactly 32 bytes.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let bytes = hex::decode(text)?;
        let len = bytes.len();
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| DecodeError::InvalidLength { found: len })?;
        Ok(Self(arr))
    }

    /// Encodes the root identifier as its textual representation.
    #[must_use]
    pub fn encode(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootId({})", self.encode())
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Failure decoding the textual representation of a root identifier.
// No `Eq`: `hex::FromHexError` only implements `PartialEq`.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The text is not valid hexadecimal.
    #[error("invalid_hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    /// The text decoded to the wrong number of bytes.
    #[error("invalid_length: expected 32 bytes, found {found}")]
    InvalidLength {
        /// Number of bytes the text decoded to.
        found: usize,
    },
}

/// Index of an account within its root's namespace.
///
/// Allocated monotonically by the store's account-creation primitive and
/// never reused after deletion.
pub type AccountIndex = u32;

/// Unique identifier of an account: a root plus an index within it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId {
    /// The root this account belongs to.
    pub root: RootId,
    /// The account's index within the root's namespace.
    pub index: AccountIndex,
}

impl AccountId {
    /// Creates a new `AccountId`.
    #[must_use]
    pub const fn new(root: RootId, index: AccountIndex) -> Self {
        Self { root, index }
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({}/{})", self.root, self.index)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.root, self.index)
    }
}

// Records

/// Persisted state of a single account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Human-readable account name.
    pub name: String,
    /// Address values associated with the account, in insertion order.
    pub addresses: Vec<String>,
    /// Precomputed available balance, written by the ledger applier.
    pub balance: u64,
}

/// Used/change metadata attached to an address value.
///
/// Absent metadata is treated as the default: neither used nor change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressMeta {
    /// Whether the address has appeared in a transaction.
    pub is_used: bool,
    /// Whether the address is an internal change address.
    pub is_change: bool,
}
