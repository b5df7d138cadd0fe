//! Error types for store operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{AccountId, RootId};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced account does not exist.
    #[error("account_not_found: {account}")]
    AccountNotFound {
        /// The account that was not found.
        account: AccountId,
    },

    /// The spending passphrase does not match the one recorded for the root.
    #[error("passphrase_mismatch: root {root}")]
    PassphraseMismatch {
        /// The root whose recorded passphrase digest did not match.
        root: RootId,
    },

    /// An I/O operation failed.
    #[error("io_error: {context}: {source}")]
    Io {
        /// Context describing the operation.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding persisted state failed.
    #[error("serialization_error: {context}")]
    Serialization {
        /// Context describing what was being serialized.
        context: String,
    },

    /// No checkpoint exists at the expected path.
    #[error("checkpoint_missing: {}", path.display())]
    CheckpointMissing {
        /// The path where the checkpoint was expected.
        path: PathBuf,
    },
}

impl StoreError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
