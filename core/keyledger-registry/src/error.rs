//! Error types for registry operations.

use keyledger_license::LicenseError;
use keyledger_storage::StorageError;
use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors surfaced by [`LicenseRegistry`](crate::LicenseRegistry).
///
/// Validation outcomes such as a missing or exhausted license are values,
/// not errors; see [`keyledger_license::ValidationOutcome`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The store could not read or durably write. Nothing was committed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),

    /// A caller-supplied argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Every generated key collided with an existing one.
    #[error("no unique key found after {attempts} attempts")]
    KeyCollision {
        /// Number of keys tried.
        attempts: u32,
    },
}

impl From<LicenseError> for RegistryError {
    fn from(err: LicenseError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
