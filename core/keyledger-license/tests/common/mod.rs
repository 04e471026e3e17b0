//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use keyledger_license::{KeyGenerator, LicenseRecord, OriginId};
use std::num::NonZeroU32;

/// Returns a fixed instant so records compare deterministically.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Creates a fresh active license for `owner` with the given ceiling.
pub fn issue(owner: &str, max_uses: u32) -> LicenseRecord {
    LicenseRecord::issue(
        KeyGenerator::default().generate(),
        owner,
        NonZeroU32::new(max_uses).expect("max_uses must be positive"),
        fixed_now(),
    )
}

/// Parses an origin, panicking on invalid input.
pub fn origin(s: &str) -> OriginId {
    OriginId::parse(s).unwrap()
}
