//! Shared test helpers for storage tests.

#![allow(dead_code)]

use chrono::Utc;
use keyledger_license::{KeyGenerator, LicenseRecord, OriginId, ValidationOutcome, decide};
use keyledger_storage::{LicenseStore, StorageResult};
use std::num::NonZeroU32;

/// Creates a fresh active license with the given ceiling.
pub fn record(max_uses: u32) -> LicenseRecord {
    LicenseRecord::issue(
        KeyGenerator::default().generate(),
        "tester",
        NonZeroU32::new(max_uses).unwrap(),
        Utc::now(),
    )
}

/// Runs one validation through `compare_and_mutate`, the way the registry does.
pub fn redeem(
    store: &dyn LicenseStore,
    record: &LicenseRecord,
    origin: &str,
) -> StorageResult<ValidationOutcome> {
    let origin = OriginId::parse(origin).unwrap();
    let mut outcome = ValidationOutcome::NotFound;
    store.compare_and_mutate(record.key(), &mut |current| {
        let decision = decide(Some(current), &origin, Utc::now());
        outcome = decision.outcome;
        decision.mutation.is_some_and(|m| m.apply(current))
    })?;
    Ok(outcome)
}
