//! Registry configuration.

use keyledger_license::{DEFAULT_KEY_PREFIX, DEFAULT_MAX_USES, DEFAULT_OWNER_ID};
use serde::{Deserialize, Serialize};

/// Tunables for a [`LicenseRegistry`](crate::LicenseRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Prefix stamped on every generated key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Owner recorded when the issuer does not name one.
    #[serde(default = "default_owner")]
    pub default_owner: String,
    /// Usage ceiling applied when the issuer does not pass one.
    #[serde(default = "default_max_uses")]
    pub default_max_uses: u32,
    /// Fresh keys tried before generation gives up on collisions.
    #[serde(default = "default_max_key_attempts")]
    pub max_key_attempts: u32,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_owner() -> String {
    DEFAULT_OWNER_ID.to_string()
}

fn default_max_uses() -> u32 {
    DEFAULT_MAX_USES
}

fn default_max_key_attempts() -> u32 {
    8
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            default_owner: default_owner(),
            default_max_uses: default_max_uses(),
            max_key_attempts: default_max_key_attempts(),
        }
    }
}
