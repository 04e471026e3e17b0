//! The license record and its usage invariants.

use crate::error::{LicenseError, LicenseResult};
use crate::key::LicenseKey;
use crate::origin::OriginId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// Owner recorded when the issuer does not name one.
pub const DEFAULT_OWNER_ID: &str = "guest";

/// Usage ceiling applied when the issuer does not set one.
pub const DEFAULT_MAX_USES: u32 = 1;

/// Maximum owner identifier length in bytes.
pub const MAX_OWNER_LEN: usize = 256;

/// Lifecycle state of a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    /// Redeemable by new origins while capacity remains.
    Active,
    /// Every slot has been consumed.
    Used,
    /// Withdrawn by the issuer. Terminal.
    Revoked,
}

impl LicenseStatus {
    /// Returns the lowercase wire name of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Used => "used",
            Self::Revoked => "revoked",
        }
    }

    /// Returns true if the license still accepts new origins.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "used" => Ok(Self::Used),
            "revoked" => Ok(Self::Revoked),
            other => Err(LicenseError::CorruptRecord {
                key: String::new(),
                reason: format!("unknown status {other:?}"),
            }),
        }
    }
}

/// Resolves the owner for a new license.
///
/// A missing or blank owner falls back to `default`.
///
/// # Errors
///
/// Returns `InvalidOwner` if the owner is too long or contains control
/// characters.
pub fn normalize_owner(owner: Option<&str>, default: &str) -> LicenseResult<String> {
    let owner = owner.map(str::trim).filter(|o| !o.is_empty()).unwrap_or(default);
    if owner.len() > MAX_OWNER_LEN {
        return Err(LicenseError::InvalidOwner(format!(
            "owner exceeds {MAX_OWNER_LEN} bytes"
        )));
    }
    if owner.chars().any(char::is_control) {
        return Err(LicenseError::InvalidOwner(
            "owner contains control characters".to_string(),
        ));
    }
    Ok(owner.to_string())
}

/// One issued license and its usage state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    key: LicenseKey,
    owner_id: String,
    status: LicenseStatus,
    created_at: DateTime<Utc>,
    used_count: u32,
    max_uses: NonZeroU32,
    redeemed_origins: BTreeMap<OriginId, DateTime<Utc>>,
}

impl LicenseRecord {
    /// Creates a fresh, unredeemed license.
    #[must_use]
    pub fn issue(
        key: LicenseKey,
        owner_id: impl Into<String>,
        max_uses: NonZeroU32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            owner_id: owner_id.into(),
            status: LicenseStatus::Active,
            created_at,
            used_count: 0,
            max_uses,
            redeemed_origins: BTreeMap::new(),
        }
    }

    /// Returns the license key.
    #[must_use]
    pub fn key(&self) -> &LicenseKey {
        &self.key
    }

    /// Returns the owner identifier.
    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> LicenseStatus {
        self.status
    }

    /// Returns when the license was issued.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns how many distinct origins have redeemed the license.
    #[must_use]
    pub fn used_count(&self) -> u32 {
        self.used_count
    }

    /// Returns the usage ceiling.
    #[must_use]
    pub fn max_uses(&self) -> u32 {
        self.max_uses.get()
    }

    /// Returns how many slots remain.
    #[must_use]
    pub fn remaining_uses(&self) -> u32 {
        self.max_uses.get().saturating_sub(self.used_count)
    }

    /// Returns the redeemed origins with their first-redemption times.
    #[must_use]
    pub fn redeemed_origins(&self) -> &BTreeMap<OriginId, DateTime<Utc>> {
        &self.redeemed_origins
    }

    /// Returns true if `origin` has already redeemed this license.
    #[must_use]
    pub fn has_redeemed(&self, origin: &OriginId) -> bool {
        self.redeemed_origins.contains_key(origin)
    }

    /// Returns true if every slot has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.used_count >= self.max_uses.get()
    }

    /// Marks the license revoked. Returns true if the status changed.
    pub fn revoke(&mut self) -> bool {
        let changed = self.status != LicenseStatus::Revoked;
        self.status = LicenseStatus::Revoked;
        changed
    }

    /// Consumes one slot for `origin`.
    ///
    /// Returns false, leaving the record untouched, when the license is not
    /// active, has no capacity left, or the origin already redeemed.
    pub(crate) fn record_redemption(&mut self, origin: &OriginId, at: DateTime<Utc>) -> bool {
        if !self.status.is_active() || self.is_exhausted() || self.has_redeemed(origin) {
            return false;
        }
        self.redeemed_origins.insert(origin.clone(), at);
        self.used_count += 1;
        if self.is_exhausted() {
            self.status = LicenseStatus::Used;
        }
        true
    }

    /// Checks the usage invariants.
    ///
    /// Records built through this crate always pass; this guards data that
    /// was deserialized from storage.
    ///
    /// # Errors
    ///
    /// Returns `CorruptRecord` naming the first invariant that fails.
    pub fn verify(&self) -> LicenseResult<()> {
        let corrupt = |reason: String| LicenseError::CorruptRecord {
            key: self.key.to_string(),
            reason,
        };

        if self.redeemed_origins.len() != self.used_count as usize {
            return Err(corrupt(format!(
                "used_count {} does not match {} redeemed origins",
                self.used_count,
                self.redeemed_origins.len()
            )));
        }
        if self.used_count > self.max_uses.get() {
            return Err(corrupt(format!(
                "used_count {} exceeds max_uses {}",
                self.used_count, self.max_uses
            )));
        }
        match self.status {
            LicenseStatus::Active if self.is_exhausted() => {
                Err(corrupt("exhausted license is still active".to_string()))
            }
            LicenseStatus::Used if !self.is_exhausted() => {
                Err(corrupt("license marked used with capacity left".to_string()))
            }
            _ => Ok(()),
        }
    }
}
