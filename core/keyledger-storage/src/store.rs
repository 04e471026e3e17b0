//! The storage contract consumed by the license registry.

use crate::error::StorageResult;
use keyledger_license::{LicenseKey, LicenseRecord};

/// Keyed, per-record atomic storage for license records.
///
/// Implementations must make [`compare_and_mutate`](Self::compare_and_mutate)
/// atomic with respect to every other call on the same key, and must not
/// publish a change that failed to persist. Operations on different keys must
/// not contend beyond short index lookups.
pub trait LicenseStore: Send + Sync {
    /// Returns the record for `key`, or `None` if no license exists.
    fn get(&self, key: &LicenseKey) -> StorageResult<Option<LicenseRecord>>;

    /// Inserts or replaces the full record stored under `record.key()`.
    fn put(&self, record: LicenseRecord) -> StorageResult<()>;

    /// Inserts `record` only if its key is vacant.
    ///
    /// Returns `Ok(false)` without writing anything when the key is taken.
    fn insert_new(&self, record: LicenseRecord) -> StorageResult<bool>;

    /// Reads, mutates, persists and publishes one record as a single unit.
    ///
    /// `mutate` works on a copy of the current record and returns whether it
    /// changed it. Unchanged copies are not written. Returns the record as
    /// stored after the call, or `None` if the key does not exist.
    fn compare_and_mutate(
        &self,
        key: &LicenseKey,
        mutate: &mut dyn FnMut(&mut LicenseRecord) -> bool,
    ) -> StorageResult<Option<LicenseRecord>>;

    /// Returns a snapshot of every record, oldest first.
    fn list_all(&self) -> StorageResult<Vec<LicenseRecord>>;

    /// Returns the number of stored records.
    fn len(&self) -> StorageResult<usize>;

    /// Returns true if no records are stored.
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}
