//! Shared fixtures for registry tests.

#![allow(dead_code)]

use keyledger_license::{LicenseKey, LicenseRecord};
use keyledger_registry::{LicenseRegistry, RegistryConfig};
use keyledger_storage::{InMemoryStore, LicenseStore, StorageError, StorageResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// A registry over a fresh in-memory store with default settings.
pub fn registry() -> LicenseRegistry {
    LicenseRegistry::new(Arc::new(InMemoryStore::new()), RegistryConfig::default()).unwrap()
}

/// A registry sharing `store` with the caller.
pub fn registry_over(store: Arc<dyn LicenseStore>) -> LicenseRegistry {
    LicenseRegistry::new(store, RegistryConfig::default()).unwrap()
}

/// Store wrapper whose writes fail while `failing` is set.
///
/// Failed writes never reach the inner store, mirroring a disk that refuses
/// to commit.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("injected write failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl LicenseStore for FlakyStore {
    fn get(&self, key: &LicenseKey) -> StorageResult<Option<LicenseRecord>> {
        self.inner.get(key)
    }

    fn put(&self, record: LicenseRecord) -> StorageResult<()> {
        self.check()?;
        self.inner.put(record)
    }

    fn insert_new(&self, record: LicenseRecord) -> StorageResult<bool> {
        self.check()?;
        self.inner.insert_new(record)
    }

    fn compare_and_mutate(
        &self,
        key: &LicenseKey,
        mutate: &mut dyn FnMut(&mut LicenseRecord) -> bool,
    ) -> StorageResult<Option<LicenseRecord>> {
        let Some(mut copy) = self.inner.get(key)? else {
            return Ok(None);
        };
        if !mutate(&mut copy) {
            return Ok(Some(copy));
        }
        self.check()?;
        self.inner.put(copy.clone())?;
        Ok(Some(copy))
    }

    fn list_all(&self) -> StorageResult<Vec<LicenseRecord>> {
        self.inner.list_all()
    }

    fn len(&self) -> StorageResult<usize> {
        self.inner.len()
    }
}

/// Store wrapper that reports the first `collisions` inserts as taken keys.
pub struct CollidingStore {
    inner: InMemoryStore,
    collisions: u32,
    attempts: AtomicU32,
}

impl CollidingStore {
    pub fn new(collisions: u32) -> Self {
        Self {
            inner: InMemoryStore::new(),
            collisions,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl LicenseStore for CollidingStore {
    fn get(&self, key: &LicenseKey) -> StorageResult<Option<LicenseRecord>> {
        self.inner.get(key)
    }

    fn put(&self, record: LicenseRecord) -> StorageResult<()> {
        self.inner.put(record)
    }

    fn insert_new(&self, record: LicenseRecord) -> StorageResult<bool> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.collisions {
            return Ok(false);
        }
        self.inner.insert_new(record)
    }

    fn compare_and_mutate(
        &self,
        key: &LicenseKey,
        mutate: &mut dyn FnMut(&mut LicenseRecord) -> bool,
    ) -> StorageResult<Option<LicenseRecord>> {
        self.inner.compare_and_mutate(key, mutate)
    }

    fn list_all(&self) -> StorageResult<Vec<LicenseRecord>> {
        self.inner.list_all()
    }

    fn len(&self) -> StorageResult<usize> {
        self.inner.len()
    }
}
