mod common;

use common::{registry, registry_over};
use keyledger_license::{LicenseKey, LicenseStatus, ValidationOutcome};
use keyledger_registry::{LicenseRegistry, RegistryConfig, RegistryError};
use keyledger_storage::{InMemoryStore, LicenseStore, SqliteStore};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

// ── Generation ──────────────────────────────────────────────────

#[test]
fn generate_uses_defaults() {
    let registry = registry();
    let record = registry.generate(None, None).unwrap();

    assert_eq!(record.owner_id(), "guest");
    assert_eq!(record.max_uses(), 1);
    assert_eq!(record.used_count(), 0);
    assert_eq!(record.status(), LicenseStatus::Active);
    assert!(record.redeemed_origins().is_empty());
    assert_eq!(record.key().prefix(), "LIC");
}

#[test]
fn generate_blank_owner_falls_back_to_default() {
    let registry = registry();
    let record = registry.generate(Some("   "), Some(3)).unwrap();
    assert_eq!(record.owner_id(), "guest");
    assert_eq!(record.max_uses(), 3);
}

#[test]
fn generate_trims_owner() {
    let registry = registry();
    let record = registry.generate(Some("  alice "), None).unwrap();
    assert_eq!(record.owner_id(), "alice");
}

#[test]
fn generate_rejects_zero_max_uses() {
    let registry = registry();
    let err = registry.generate(Some("alice"), Some(0)).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArgument(_)));
    assert!(registry.list_all().unwrap().is_empty());
}

#[test]
fn generate_rejects_control_characters_in_owner() {
    let registry = registry();
    let err = registry.generate(Some("al\u{7}ice"), None).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArgument(_)));
}

#[test]
fn generated_record_is_stored() {
    let registry = registry();
    let record = registry.generate(Some("alice"), Some(2)).unwrap();
    assert_eq!(
        registry.inspect(record.key().as_str()).unwrap(),
        Some(record)
    );
}

#[test]
fn generate_uses_configured_prefix_and_defaults() {
    let config = RegistryConfig {
        key_prefix: "ACME".to_string(),
        default_owner: "anonymous".to_string(),
        default_max_uses: 5,
        ..RegistryConfig::default()
    };
    let registry = LicenseRegistry::new(Arc::new(InMemoryStore::new()), config).unwrap();
    let record = registry.generate(None, None).unwrap();

    assert!(record.key().as_str().starts_with("ACME-"));
    assert_eq!(record.owner_id(), "anonymous");
    assert_eq!(record.max_uses(), 5);
}

#[test]
fn invalid_config_is_rejected() {
    let bad_prefix = RegistryConfig {
        key_prefix: "lower".to_string(),
        ..RegistryConfig::default()
    };
    let zero_uses = RegistryConfig {
        default_max_uses: 0,
        ..RegistryConfig::default()
    };
    let zero_attempts = RegistryConfig {
        max_key_attempts: 0,
        ..RegistryConfig::default()
    };

    for config in [bad_prefix, zero_uses, zero_attempts] {
        let result = LicenseRegistry::new(Arc::new(InMemoryStore::new()), config);
        assert!(matches!(result, Err(RegistryError::InvalidArgument(_))));
    }
}

#[test]
fn config_deserializes_with_defaults() {
    let config: RegistryConfig = serde_json::from_str(r#"{"key_prefix":"PRO"}"#).unwrap();
    assert_eq!(config.key_prefix, "PRO");
    assert_eq!(config.default_owner, "guest");
    assert_eq!(config.default_max_uses, 1);
    assert_eq!(config.max_key_attempts, 8);
}

// ── Validation ──────────────────────────────────────────────────

#[test]
fn single_use_scenario() {
    let registry = registry();
    let record = registry.generate(Some("alice"), Some(1)).unwrap();
    let key = record.key().as_str();

    let first = registry.validate(key, "1.1.1.1").unwrap();
    assert_eq!(first.outcome, ValidationOutcome::FirstRedemption);
    assert_eq!(first.owner_id.as_deref(), Some("alice"));

    let again = registry.validate(key, "1.1.1.1").unwrap();
    assert_eq!(again.outcome, ValidationOutcome::RepeatAccess);
    assert_eq!(again.owner_id.as_deref(), Some("alice"));

    let other = registry.validate(key, "2.2.2.2").unwrap();
    assert_eq!(
        other.outcome,
        ValidationOutcome::Inactive {
            status: LicenseStatus::Used
        }
    );
    assert_eq!(other.owner_id, None);

    let stored = registry.inspect(key).unwrap().unwrap();
    assert_eq!(stored.used_count(), 1);
    assert_eq!(stored.status(), LicenseStatus::Used);
}

#[test]
fn revoked_used_key_is_inactive_for_everyone() {
    let registry = registry();
    let record = registry.generate(Some("alice"), Some(1)).unwrap();
    let key = record.key().as_str();
    registry.validate(key, "1.1.1.1").unwrap();

    assert!(registry.revoke(key).unwrap());

    for origin in ["1.1.1.1", "2.2.2.2"] {
        let result = registry.validate(key, origin).unwrap();
        assert_eq!(
            result.outcome,
            ValidationOutcome::Inactive {
                status: LicenseStatus::Revoked
            }
        );
        assert_eq!(result.owner_id, None);
    }
}

#[test]
fn multi_use_key_admits_distinct_origins_up_to_ceiling() {
    let registry = registry();
    let record = registry.generate(Some("team"), Some(3)).unwrap();
    let key = record.key().as_str();

    for origin in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
        assert_eq!(
            registry.validate(key, origin).unwrap().outcome,
            ValidationOutcome::FirstRedemption
        );
    }
    assert_eq!(
        registry.validate(key, "10.0.0.4").unwrap().outcome,
        ValidationOutcome::Inactive {
            status: LicenseStatus::Used
        }
    );
    assert_eq!(
        registry.validate(key, "10.0.0.2").unwrap().outcome,
        ValidationOutcome::RepeatAccess
    );
}

#[test]
fn unknown_and_malformed_keys_are_not_found() {
    let registry = registry();
    let unknown = registry.validate("LIC-AAAA-BBBB-CCCC", "1.1.1.1").unwrap();
    assert_eq!(unknown.outcome, ValidationOutcome::NotFound);

    for key in ["", "garbage", "LIC-AAAA-BBBB", "LIC-aaaa-bbbb-cccc!"] {
        let result = registry.validate(key, "1.1.1.1").unwrap();
        assert_eq!(result.outcome, ValidationOutcome::NotFound, "{key:?}");
        assert_eq!(result.owner_id, None);
    }
}

#[test]
fn key_lookup_is_case_and_whitespace_insensitive() {
    let registry = registry();
    let record = registry.generate(Some("alice"), None).unwrap();
    let sloppy = format!("  {}  ", record.key().as_str().to_lowercase());

    assert_eq!(
        registry.validate(&sloppy, "1.1.1.1").unwrap().outcome,
        ValidationOutcome::FirstRedemption
    );
}

#[test]
fn empty_origin_is_invalid_argument() {
    let registry = registry();
    let record = registry.generate(None, None).unwrap();

    let err = registry.validate(record.key().as_str(), "   ").unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArgument(_)));
    assert_eq!(
        registry
            .inspect(record.key().as_str())
            .unwrap()
            .unwrap()
            .used_count(),
        0
    );
}

// ── Revocation and reads ────────────────────────────────────────

#[test]
fn revoke_is_idempotent() {
    let registry = registry();
    let record = registry.generate(None, None).unwrap();
    let key = record.key().as_str();

    assert!(registry.revoke(key).unwrap());
    assert!(registry.revoke(key).unwrap());
    assert_eq!(
        registry.inspect(key).unwrap().unwrap().status(),
        LicenseStatus::Revoked
    );
}

#[test]
fn revoke_unknown_key_is_false() {
    let registry = registry();
    assert!(!registry.revoke("LIC-AAAA-BBBB-CCCC").unwrap());
    assert!(!registry.revoke("not a key").unwrap());
}

#[test]
fn revoke_preserves_redemption_history() {
    let registry = registry();
    let record = registry.generate(None, Some(2)).unwrap();
    let key = record.key().as_str();
    registry.validate(key, "1.1.1.1").unwrap();
    registry.revoke(key).unwrap();

    let stored = registry.inspect(key).unwrap().unwrap();
    assert_eq!(stored.used_count(), 1);
    assert!(stored.verify().is_ok());
}

#[test]
fn list_all_returns_every_license_oldest_first() {
    let registry = registry();
    let keys: Vec<LicenseKey> = (0..4)
        .map(|i| {
            registry
                .generate(Some(format!("owner-{i}").as_str()), None)
                .unwrap()
                .key()
                .clone()
        })
        .collect();

    let listed = registry.list_all().unwrap();
    assert_eq!(listed.len(), 4);
    for window in listed.windows(2) {
        assert!(window[0].created_at() <= window[1].created_at());
    }
    for key in &keys {
        assert!(listed.iter().any(|r| r.key() == key));
    }
}

#[test]
fn inspect_malformed_key_is_none() {
    let registry = registry();
    assert_eq!(registry.inspect("nope").unwrap(), None);
}

// ── Durability ──────────────────────────────────────────────────

#[test]
fn redemptions_survive_restart_with_sqlite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("licenses.db");

    let key = {
        let store: Arc<dyn LicenseStore> = Arc::new(SqliteStore::open(&path).unwrap());
        let registry = registry_over(store);
        let record = registry.generate(Some("alice"), Some(1)).unwrap();
        registry.validate(record.key().as_str(), "1.1.1.1").unwrap();
        record.key().clone()
    };

    let registry = registry_over(Arc::new(SqliteStore::open(&path).unwrap()));
    assert_eq!(
        registry.validate(key.as_str(), "1.1.1.1").unwrap().outcome,
        ValidationOutcome::RepeatAccess
    );
    assert_eq!(
        registry.validate(key.as_str(), "2.2.2.2").unwrap().outcome,
        ValidationOutcome::Inactive {
            status: LicenseStatus::Used
        }
    );
}
