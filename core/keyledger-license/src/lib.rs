//! License records and redemption logic for keyledger.
//!
//! This crate is pure: it never touches storage or the network. It handles:
//! - License key generation and parsing (`PREFIX-XXXX-XXXX-XXXX`)
//! - The license record and its usage invariants
//! - The validation decision procedure (which outcome, which mutation)
//!
//! # Redemption Policy
//!
//! - **Counted once per origin**: the first successful validation from an
//!   origin consumes one slot of `max_uses`
//! - **Unlimited repeat access**: an origin that already redeemed keeps
//!   access, even after the license is exhausted
//! - **Revoke wins**: a revoked license is inactive for every origin
//!
//! # State Machine
//!
//! ```text
//! active ──(used_count reaches max_uses)──> used
//!   │                                        │
//!   └──────────────(revoke)──> revoked <─────┘
//! ```

mod error;
mod key;
mod machine;
mod origin;
mod record;

pub use error::{LicenseError, LicenseResult};
pub use key::{DEFAULT_KEY_PREFIX, KeyGenerator, LicenseKey, MAX_PREFIX_LEN};
pub use machine::{Decision, Mutation, ValidationOutcome, ValidationResult, decide};
pub use origin::{MAX_ORIGIN_LEN, OriginId};
pub use record::{
    DEFAULT_MAX_USES, DEFAULT_OWNER_ID, LicenseRecord, LicenseStatus, MAX_OWNER_LEN,
    normalize_owner,
};
