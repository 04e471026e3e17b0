//! Non-durable store for tests and ephemeral servers.

use crate::error::StorageResult;
use crate::store::LicenseStore;
use crate::table::RecordTable;
use keyledger_license::{LicenseKey, LicenseRecord};

/// A [`LicenseStore`] that keeps records in memory only.
#[derive(Default)]
pub struct InMemoryStore {
    table: RecordTable,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LicenseStore for InMemoryStore {
    fn get(&self, key: &LicenseKey) -> StorageResult<Option<LicenseRecord>> {
        Ok(self.table.get(key))
    }

    fn put(&self, record: LicenseRecord) -> StorageResult<()> {
        self.table.put(record, |_| Ok(()))
    }

    fn insert_new(&self, record: LicenseRecord) -> StorageResult<bool> {
        self.table.insert_new(record, |_| Ok(()))
    }

    fn compare_and_mutate(
        &self,
        key: &LicenseKey,
        mutate: &mut dyn FnMut(&mut LicenseRecord) -> bool,
    ) -> StorageResult<Option<LicenseRecord>> {
        self.table.mutate(key, |record| mutate(record), |_| Ok(()))
    }

    fn list_all(&self) -> StorageResult<Vec<LicenseRecord>> {
        Ok(self.table.snapshot())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.table.len())
    }
}
