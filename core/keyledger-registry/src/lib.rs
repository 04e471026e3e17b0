//! License registry for keyledger.
//!
//! Composes the redemption state machine from `keyledger-license` with a
//! [`LicenseStore`](keyledger_storage::LicenseStore) and exposes the
//! operations an issuer and its clients need:
//!
//! - [`LicenseRegistry::generate`]: issue a fresh key
//! - [`LicenseRegistry::validate`]: redeem or re-check a key for an origin
//! - [`LicenseRegistry::revoke`]: permanently disable a key
//! - [`LicenseRegistry::list_all`] and [`LicenseRegistry::inspect`]: admin reads
//!
//! ```ignore
//! use keyledger_registry::{LicenseRegistry, RegistryConfig};
//! use keyledger_storage::InMemoryStore;
//! use std::sync::Arc;
//!
//! let registry = LicenseRegistry::new(Arc::new(InMemoryStore::new()), RegistryConfig::default())?;
//! let license = registry.generate(Some("alice"), None)?;
//! let result = registry.validate(license.key().as_str(), "203.0.113.7")?;
//! assert!(result.outcome.is_granted());
//! ```

mod config;
mod error;
mod registry;

pub use config::RegistryConfig;
pub use error::{RegistryError, RegistryResult};
pub use registry::LicenseRegistry;
