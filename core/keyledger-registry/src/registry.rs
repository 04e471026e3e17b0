//! The license registry: issuance, validation and revocation.

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use chrono::Utc;
use keyledger_license::{
    KeyGenerator, LicenseKey, LicenseRecord, OriginId, ValidationOutcome, ValidationResult,
    decide, normalize_owner,
};
use keyledger_storage::LicenseStore;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Issues and validates license keys against a [`LicenseStore`].
///
/// The registry is synchronous and `Send + Sync`; share it behind an `Arc`
/// and call it from as many threads as needed. Every mutation is committed
/// through [`LicenseStore::compare_and_mutate`] before its result is
/// returned, so a reported `FirstRedemption` is always durable.
pub struct LicenseRegistry {
    store: Arc<dyn LicenseStore>,
    generator: KeyGenerator,
    config: RegistryConfig,
}

impl LicenseRegistry {
    /// Creates a registry over `store`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the configured prefix, default owner,
    /// default usage ceiling or attempt budget is unusable.
    pub fn new(store: Arc<dyn LicenseStore>, config: RegistryConfig) -> RegistryResult<Self> {
        let generator = KeyGenerator::new(&config.key_prefix)?;
        normalize_owner(Some(&config.default_owner), &config.default_owner)?;
        if config.default_max_uses == 0 {
            return Err(RegistryError::InvalidArgument(
                "default_max_uses must be at least 1".to_string(),
            ));
        }
        if config.max_key_attempts == 0 {
            return Err(RegistryError::InvalidArgument(
                "max_key_attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            store,
            generator,
            config,
        })
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Issues a new license.
    ///
    /// `owner_id` falls back to the configured default owner when missing or
    /// blank; `max_uses` falls back to the configured default ceiling.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a zero `max_uses` or a malformed owner
    /// - `KeyCollision` if every attempted key was already taken
    /// - `StoreUnavailable` if the record could not be written
    pub fn generate(
        &self,
        owner_id: Option<&str>,
        max_uses: Option<u32>,
    ) -> RegistryResult<LicenseRecord> {
        let max_uses = NonZeroU32::new(max_uses.unwrap_or(self.config.default_max_uses))
            .ok_or_else(|| {
                RegistryError::InvalidArgument("max_uses must be at least 1".to_string())
            })?;
        let owner_id = normalize_owner(owner_id, &self.config.default_owner)?;
        let created_at = Utc::now();

        for attempt in 1..=self.config.max_key_attempts {
            let record = LicenseRecord::issue(
                self.generator.generate(),
                owner_id.clone(),
                max_uses,
                created_at,
            );
            if self.store.insert_new(record.clone())? {
                info!(
                    "Issued license {} for {} (max uses {})",
                    record.key(),
                    record.owner_id(),
                    max_uses
                );
                return Ok(record);
            }
            warn!("Generated key {} already exists (attempt {})", record.key(), attempt);
        }

        Err(RegistryError::KeyCollision {
            attempts: self.config.max_key_attempts,
        })
    }

    /// Validates `key` for a redemption attempt from `origin_id`.
    ///
    /// A key string that is not well formed resolves to `NotFound`. A
    /// `FirstRedemption` is persisted before this returns.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `origin_id` is empty or malformed
    /// - `StoreUnavailable` if the redemption could not be committed; in that
    ///   case no slot was consumed
    pub fn validate(&self, key: &str, origin_id: &str) -> RegistryResult<ValidationResult> {
        let origin = OriginId::parse(origin_id)?;
        let Ok(key) = LicenseKey::parse(key) else {
            debug!("Rejected malformed key from {}", origin);
            return Ok(ValidationResult::not_found());
        };

        let now = Utc::now();
        let mut outcome = ValidationOutcome::NotFound;
        let stored = self.store.compare_and_mutate(&key, &mut |record| {
            let decision = decide(Some(record), &origin, now);
            outcome = decision.outcome;
            decision
                .mutation
                .is_some_and(|mutation| mutation.apply(record))
        })?;

        let Some(stored) = stored else {
            debug!("Validation of unknown key {} from {}", key, origin);
            return Ok(ValidationResult::not_found());
        };

        debug!(
            "Validated {} from {}: {} ({}/{} used)",
            key,
            origin,
            outcome.name(),
            stored.used_count(),
            stored.max_uses()
        );
        Ok(ValidationResult::new(outcome, Some(&stored)))
    }

    /// Revokes a license. Revoking twice is harmless.
    ///
    /// Returns false if no license exists under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the revocation could not be committed.
    pub fn revoke(&self, key: &str) -> RegistryResult<bool> {
        let Ok(key) = LicenseKey::parse(key) else {
            return Ok(false);
        };

        let mut changed = false;
        let stored = self.store.compare_and_mutate(&key, &mut |record| {
            changed = record.revoke();
            changed
        })?;

        match stored {
            Some(_) if changed => {
                info!("Revoked license {}", key);
                Ok(true)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    /// Returns every license, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be read.
    pub fn list_all(&self) -> RegistryResult<Vec<LicenseRecord>> {
        Ok(self.store.list_all()?)
    }

    /// Returns the current record for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be read.
    pub fn inspect(&self, key: &str) -> RegistryResult<Option<LicenseRecord>> {
        let Ok(key) = LicenseKey::parse(key) else {
            return Ok(None);
        };
        Ok(self.store.get(&key)?)
    }
}
