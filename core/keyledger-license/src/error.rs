//! Error types for license records and keys.

use thiserror::Error;

/// License-level errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The key string is not of the form `PREFIX-XXXX-XXXX-XXXX`.
    #[error("invalid license key format: {0}")]
    InvalidKeyFormat(String),

    /// The key prefix is empty, too long, or not uppercase alphanumeric.
    #[error("invalid key prefix: {0}")]
    InvalidPrefix(String),

    /// The origin identifier is empty or malformed.
    #[error("invalid origin: {0}")]
    InvalidOrigin(String),

    /// The owner identifier is malformed.
    #[error("invalid owner: {0}")]
    InvalidOwner(String),

    /// A stored record breaks one of the usage invariants.
    #[error("corrupt license record {key}: {reason}")]
    CorruptRecord {
        /// Key of the offending record.
        key: String,
        /// Which invariant failed.
        reason: String,
    },
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
