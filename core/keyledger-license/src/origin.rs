//! Origin identifiers for redeeming parties.
//!
//! An origin distinguishes one redeeming party from another. The transport
//! decides how to derive it; the HTTP server uses the peer IP address.
//! Origins are untrusted input, so they are bounded and stripped of control
//! characters before they reach a record.

use crate::error::{LicenseError, LicenseResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Maximum origin length in bytes.
pub const MAX_ORIGIN_LEN: usize = 256;

/// Identifier of a redeeming party (e.g. a client IP address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OriginId(String);

impl OriginId {
    /// Parses an origin identifier, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOrigin` if the result is empty, longer than
    /// [`MAX_ORIGIN_LEN`], or contains control characters.
    pub fn parse(input: &str) -> LicenseResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(LicenseError::InvalidOrigin("origin must not be empty".to_string()));
        }
        if trimmed.len() > MAX_ORIGIN_LEN {
            return Err(LicenseError::InvalidOrigin(format!(
                "origin exceeds {MAX_ORIGIN_LEN} bytes"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(LicenseError::InvalidOrigin(
                "origin contains control characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Builds an origin from a network address.
    ///
    /// IPv4-mapped IPv6 addresses collapse to their IPv4 form so a dual-stack
    /// listener does not count one client twice.
    #[must_use]
    pub fn from_ip(ip: IpAddr) -> Self {
        Self(ip.to_canonical().to_string())
    }

    /// Returns the origin as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OriginId {
    type Error = LicenseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OriginId> for String {
    fn from(origin: OriginId) -> Self {
        origin.0
    }
}
