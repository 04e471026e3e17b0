//! In-memory record table with one lock per license key.
//!
//! The index maps each key to a slot. The index lock is only held to look up
//! or create a slot, never across persistence. Each slot carries its own
//! mutex, held for the whole read-decide-persist-publish sequence, so two
//! writers on one key serialize while writers on different keys never meet.
//!
//! Slots are never removed or replaced once created: every caller touching a
//! key meets at the same mutex. A slot holding `None` is vacant (left behind
//! by a failed insert) and reads as absent.

use crate::error::{StorageError, StorageResult};
use keyledger_license::{LicenseKey, LicenseRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

type Slot = Arc<Mutex<Option<LicenseRecord>>>;

// Mutations run on a working copy and are published only after persisting,
// so a panic inside a critical section cannot leave a half-applied record.
// Poisoned locks are therefore safe to reuse.
fn lock(slot: &Slot) -> MutexGuard<'_, Option<LicenseRecord>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub(crate) struct RecordTable {
    index: RwLock<HashMap<LicenseKey, Slot>>,
}

impl RecordTable {
    pub(crate) fn from_records(records: Vec<LicenseRecord>) -> Self {
        let index = records
            .into_iter()
            .map(|record| (record.key().clone(), Arc::new(Mutex::new(Some(record)))))
            .collect();
        Self {
            index: RwLock::new(index),
        }
    }

    fn slot(&self, key: &LicenseKey) -> Option<Slot> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        index.get(key).cloned()
    }

    fn slot_or_create(&self, key: &LicenseKey) -> Slot {
        if let Some(slot) = self.slot(key) {
            return slot;
        }
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        index.entry(key.clone()).or_default().clone()
    }

    fn slots(&self) -> Vec<Slot> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        index.values().cloned().collect()
    }

    pub(crate) fn get(&self, key: &LicenseKey) -> Option<LicenseRecord> {
        let slot = self.slot(key)?;
        let guard = lock(&slot);
        guard.clone()
    }

    pub(crate) fn put<P>(&self, record: LicenseRecord, persist: P) -> StorageResult<()>
    where
        P: FnOnce(&LicenseRecord) -> StorageResult<()>,
    {
        check(&record)?;
        let slot = self.slot_or_create(record.key());
        let mut guard = lock(&slot);
        persist(&record)?;
        *guard = Some(record);
        Ok(())
    }

    pub(crate) fn insert_new<P>(&self, record: LicenseRecord, persist: P) -> StorageResult<bool>
    where
        P: FnOnce(&LicenseRecord) -> StorageResult<()>,
    {
        check(&record)?;
        let slot = self.slot_or_create(record.key());
        let mut guard = lock(&slot);
        if guard.is_some() {
            return Ok(false);
        }
        persist(&record)?;
        *guard = Some(record);
        Ok(true)
    }

    pub(crate) fn mutate<F, P>(
        &self,
        key: &LicenseKey,
        mutate: F,
        persist: P,
    ) -> StorageResult<Option<LicenseRecord>>
    where
        F: FnOnce(&mut LicenseRecord) -> bool,
        P: FnOnce(&LicenseRecord) -> StorageResult<()>,
    {
        let Some(slot) = self.slot(key) else {
            return Ok(None);
        };
        let mut guard = lock(&slot);
        let Some(current) = guard.as_ref() else {
            return Ok(None);
        };

        let mut working = current.clone();
        if !mutate(&mut working) {
            return Ok(Some(current.clone()));
        }
        if working.key() != key {
            return Err(StorageError::InvalidData(format!(
                "mutation changed key {key} to {}",
                working.key()
            )));
        }
        check(&working)?;

        persist(&working)?;
        *guard = Some(working.clone());
        Ok(Some(working))
    }

    pub(crate) fn snapshot(&self) -> Vec<LicenseRecord> {
        let mut records: Vec<LicenseRecord> = self
            .slots()
            .iter()
            .filter_map(|slot| lock(slot).clone())
            .collect();
        records.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.key().cmp(b.key()))
        });
        records
    }

    pub(crate) fn len(&self) -> usize {
        self.slots().iter().filter(|slot| lock(slot).is_some()).count()
    }
}

fn check(record: &LicenseRecord) -> StorageResult<()> {
    record
        .verify()
        .map_err(|e| StorageError::InvalidData(e.to_string()))
}
