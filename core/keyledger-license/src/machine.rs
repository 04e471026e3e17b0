//! The validation decision procedure.
//!
//! [`decide`] is a pure function of the current record, the requesting
//! origin and the clock. It never mutates anything: it returns the outcome
//! together with the [`Mutation`] the store must commit before the outcome
//! may be reported. Keeping the decision pure lets the store run it inside
//! its per-key critical section.

use crate::origin::OriginId;
use crate::record::{LicenseRecord, LicenseStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of validating a key for one origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// No license exists under the key.
    NotFound,
    /// The license exists but is not redeemable.
    Inactive {
        /// Current status (`used` or `revoked`).
        status: LicenseStatus,
    },
    /// The license is active but has no slot left.
    LimitReached,
    /// The origin redeemed earlier; nothing was consumed.
    RepeatAccess,
    /// The origin consumed a slot.
    FirstRedemption,
}

impl ValidationOutcome {
    /// Returns true if the caller should be granted access.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::RepeatAccess | Self::FirstRedemption)
    }

    /// Returns the snake_case name of the outcome.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Inactive { .. } => "inactive",
            Self::LimitReached => "limit_reached",
            Self::RepeatAccess => "repeat_access",
            Self::FirstRedemption => "first_redemption",
        }
    }
}

/// Outcome of a validation plus the owner to personalize granted access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// What happened.
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
    /// Owner of the license, present only when access is granted.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub owner_id: Option<String>,
}

impl ValidationResult {
    /// Builds a result, attaching the owner only for granted outcomes.
    #[must_use]
    pub fn new(outcome: ValidationOutcome, record: Option<&LicenseRecord>) -> Self {
        let owner_id = record
            .filter(|_| outcome.is_granted())
            .map(|r| r.owner_id().to_string());
        Self { outcome, owner_id }
    }

    /// Result for a key that does not exist.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            outcome: ValidationOutcome::NotFound,
            owner_id: None,
        }
    }
}

/// A change to a record decided by [`decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Record `origin` as redeemed at `at` and consume one slot.
    Redeem {
        /// The redeeming origin.
        origin: OriginId,
        /// First-redemption timestamp.
        at: DateTime<Utc>,
    },
}

impl Mutation {
    /// Applies the mutation. Returns true if the record changed.
    ///
    /// Applying is a no-op when the record no longer admits the change, so a
    /// stale mutation can never break the usage invariants.
    pub fn apply(&self, record: &mut LicenseRecord) -> bool {
        match self {
            Self::Redeem { origin, at } => record.record_redemption(origin, *at),
        }
    }
}

/// An outcome and the mutation that must be committed before reporting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// The validation outcome.
    pub outcome: ValidationOutcome,
    /// The change to persist, if any.
    pub mutation: Option<Mutation>,
}

impl Decision {
    fn outcome(outcome: ValidationOutcome) -> Self {
        Self {
            outcome,
            mutation: None,
        }
    }
}

/// Decides how a validation request from `origin` resolves.
///
/// Order of checks:
/// 1. missing record: `NotFound`
/// 2. revoked: `Inactive` for every origin
/// 3. origin already redeemed: `RepeatAccess`, even once the license is used
/// 4. used: `Inactive`
/// 5. no capacity left: `LimitReached`
/// 6. otherwise `FirstRedemption`, consuming a slot
#[must_use]
pub fn decide(record: Option<&LicenseRecord>, origin: &OriginId, now: DateTime<Utc>) -> Decision {
    let Some(record) = record else {
        return Decision::outcome(ValidationOutcome::NotFound);
    };

    match record.status() {
        LicenseStatus::Revoked => Decision::outcome(ValidationOutcome::Inactive {
            status: LicenseStatus::Revoked,
        }),
        _ if record.has_redeemed(origin) => Decision::outcome(ValidationOutcome::RepeatAccess),
        LicenseStatus::Used => Decision::outcome(ValidationOutcome::Inactive {
            status: LicenseStatus::Used,
        }),
        LicenseStatus::Active if record.is_exhausted() => {
            Decision::outcome(ValidationOutcome::LimitReached)
        }
        LicenseStatus::Active => Decision {
            outcome: ValidationOutcome::FirstRedemption,
            mutation: Some(Mutation::Redeem {
                origin: origin.clone(),
                at: now,
            }),
        },
    }
}
