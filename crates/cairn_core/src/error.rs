//! Error types for Cairn core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CairnResult<T> = Result<T, CairnError>;

/// Errors that can occur in Cairn store operations.
#[derive(Debug, Error)]
pub enum CairnError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] cairn_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Index snapshot could not be encoded.
    #[error("index codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The index file is corrupted or inconsistent.
    #[error("index corrupted: {message}")]
    IndexCorrupted {
        /// Description of the corruption.
        message: String,
    },

    /// The data file does not match the index.
    #[error("storage corrupted: {message}")]
    StorageCorrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Invalid configuration supplied by the caller.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration issue.
        message: String,
    },

    /// The working folder is locked by another open store instance.
    #[error("working folder is locked by another store instance")]
    StoreLocked,

    /// The encryption key has an invalid length.
    #[error("invalid encryption key size: {actual} bytes (expected 16, 24 or 32)")]
    InvalidKeySize {
        /// Actual size of the supplied key in bytes.
        actual: usize,
    },

    /// Encryption was requested but no key is configured.
    #[error("encryption is not configured")]
    EncryptionNotConfigured,

    /// Decryption failed because the configured key does not match the
    /// key the record was written with.
    #[error("invalid encryption key, check storage configuration")]
    InvalidEncryptionKey,

    /// The key is already booked or committed.
    #[error("key {key:?} already exists in storage")]
    DuplicateKey {
        /// The conflicting key.
        key: String,
    },

    /// The key is not present in the store.
    #[error("key {key:?} not found in storage")]
    KeyNotFound {
        /// The missing key.
        key: String,
    },

    /// Explicit flush is not supported by the active flush policy.
    #[error("flush is not supported in {mode} flush mode")]
    FlushNotSupported {
        /// Name of the active flush mode.
        mode: &'static str,
    },

    /// The store has been disposed.
    #[error("storage is disposed")]
    Disposed,
}

impl CairnError {
    /// Creates an index corruption error.
    pub fn index_corrupted(message: impl Into<String>) -> Self {
        Self::IndexCorrupted {
            message: message.into(),
        }
    }

    /// Creates a storage corruption error.
    pub fn storage_corrupted(message: impl Into<String>) -> Self {
        Self::StorageCorrupted {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a duplicate-key error.
    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Self::DuplicateKey { key: key.into() }
    }

    /// Creates a key-not-found error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }
}
