//! License key generation and parsing.
//!
//! License keys use the format: `PREFIX-XXXX-XXXX-XXXX`
//!
//! - `PREFIX`: 1 to 8 uppercase ASCII alphanumerics, fixed per issuer
//! - each `XXXX` block: 4 characters drawn uniformly from `A-Z0-9`
//!
//! The three random blocks carry 36^12 (about 2^62) combinations. Randomness
//! alone does not guarantee uniqueness; the registry checks every fresh key
//! against the store before handing it out.

use crate::error::{LicenseError, LicenseResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix used when the issuer does not configure one.
pub const DEFAULT_KEY_PREFIX: &str = "LIC";

/// Maximum prefix length in characters.
pub const MAX_PREFIX_LEN: usize = 8;

const KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const BLOCK_LEN: usize = 4;
const BLOCK_COUNT: usize = 3;

fn is_key_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit()
}

fn check_prefix(prefix: &str) -> LicenseResult<()> {
    if prefix.is_empty() || prefix.len() > MAX_PREFIX_LEN {
        return Err(LicenseError::InvalidPrefix(format!(
            "prefix must be 1 to {MAX_PREFIX_LEN} characters, got {}",
            prefix.len()
        )));
    }
    if !prefix.chars().all(is_key_char) {
        return Err(LicenseError::InvalidPrefix(format!(
            "prefix {prefix:?} must be uppercase alphanumeric"
        )));
    }
    Ok(())
}

/// A well-formed license key.
///
/// Construction always goes through [`LicenseKey::parse`] or a
/// [`KeyGenerator`], so a `LicenseKey` value is known to match the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LicenseKey(String);

impl LicenseKey {
    /// Parses a key, normalizing surrounding whitespace and letter case.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyFormat` if the input is not `PREFIX-XXXX-XXXX-XXXX`.
    pub fn parse(input: &str) -> LicenseResult<Self> {
        let normalized = input.trim().to_ascii_uppercase();

        let parts: Vec<&str> = normalized.split('-').collect();
        if parts.len() != BLOCK_COUNT + 1 {
            return Err(LicenseError::InvalidKeyFormat(format!(
                "expected {} dash-separated parts, got {}",
                BLOCK_COUNT + 1,
                parts.len()
            )));
        }

        check_prefix(parts[0])
            .map_err(|e| LicenseError::InvalidKeyFormat(e.to_string()))?;

        for block in &parts[1..] {
            if block.len() != BLOCK_LEN || !block.chars().all(is_key_char) {
                return Err(LicenseError::InvalidKeyFormat(format!(
                    "block {block:?} must be {BLOCK_LEN} uppercase alphanumerics"
                )));
            }
        }

        Ok(Self(normalized))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the issuer prefix portion of the key.
    #[must_use]
    pub fn prefix(&self) -> &str {
        // Format is checked at construction, so a dash is always present.
        self.0.split('-').next().unwrap_or_default()
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LicenseKey {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for LicenseKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LicenseKey {
    type Error = LicenseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LicenseKey> for String {
    fn from(key: LicenseKey) -> Self {
        key.0
    }
}

/// Produces fresh random keys under a fixed prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGenerator {
    prefix: String,
}

impl KeyGenerator {
    /// Creates a generator for the given prefix.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPrefix` if the prefix is empty, longer than
    /// [`MAX_PREFIX_LEN`], or not uppercase alphanumeric.
    pub fn new(prefix: &str) -> LicenseResult<Self> {
        check_prefix(prefix)?;
        Ok(Self {
            prefix: prefix.to_string(),
        })
    }

    /// Returns the configured prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generates a key using the thread-local random source.
    #[must_use]
    pub fn generate(&self) -> LicenseKey {
        self.generate_with(&mut rand::thread_rng())
    }

    /// Generates a key using a caller-supplied random source.
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> LicenseKey {
        let mut key = String::with_capacity(self.prefix.len() + BLOCK_COUNT * (BLOCK_LEN + 1));
        key.push_str(&self.prefix);
        for _ in 0..BLOCK_COUNT {
            key.push('-');
            for _ in 0..BLOCK_LEN {
                let idx = rng.gen_range(0..KEY_ALPHABET.len());
                key.push(KEY_ALPHABET[idx] as char);
            }
        }
        LicenseKey(key)
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}
