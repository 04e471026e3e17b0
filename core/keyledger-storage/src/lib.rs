//! License record storage for keyledger.
//!
//! Provides the [`LicenseStore`] contract and two implementations:
//! - [`InMemoryStore`]: no durability, for tests and throwaway servers
//! - [`SqliteStore`]: write-through SQLite persistence
//!
//! # Architecture
//!
//! - Both stores share one in-memory table with a mutex per license key
//! - `compare_and_mutate` holds the key's mutex across read, mutation,
//!   persistence and publication, so concurrent redemptions cannot lose updates
//! - A failed write is reported as [`StorageError::Unavailable`] and the change
//!   is discarded
//! - Unreadable state at open is quarantined and replaced by an empty store

mod error;
mod memory;
mod sqlite;
mod store;
mod table;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use store::LicenseStore;
