use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::BlockError;

/// An ISO 3166-1 alpha-2 country code, stored uppercase
///
/// Parsing is the only way to construct one, so every code held by the
/// stores is already trimmed, validated, and case-folded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CountryCode {
    type Err = BlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(BlockError::InvalidCountryCode(s.to_string()))
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A time-limited country block
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalBlock {
    pub country_code: CountryCode,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TemporalBlock {
    /// An entry is semantically absent once its expiry has passed,
    /// whether or not it has been physically removed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A permanently blocked country
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedCountry {
    pub country_code: CountryCode,
    pub country_name: String,
    pub added_at: DateTime<Utc>,
}

/// One audited block decision for an inbound IP
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAttempt {
    pub ip: String,
    pub timestamp: DateTime<Utc>,
    /// `"N/A"` when the geo lookup failed
    pub country_code: String,
    pub blocked: bool,
    pub user_agent: String,
}

/// Result of a GeoIP provider lookup
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoIpInfo {
    pub ip: String,
    pub country_code: String,
    pub country_name: String,
    pub isp: String,
}

/// Why (or whether) a country is currently blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    Permanent,
    Temporal,
    Clear,
}

impl BlockStatus {
    pub fn is_blocked(self) -> bool {
        !matches!(self, BlockStatus::Clear)
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockStatus::Permanent => write!(f, "permanent"),
            BlockStatus::Temporal => write!(f, "temporal"),
            BlockStatus::Clear => write!(f, "clear"),
        }
    }
}

/// Outcome of a full inbound-IP block check
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub geo: GeoIpInfo,
    pub status: BlockStatus,
}

impl CheckOutcome {
    pub fn blocked(&self) -> bool {
        self.status.is_blocked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_country_code_normalizes() {
        let code: CountryCode = " us ".parse().unwrap();
        assert_eq!(code.as_str(), "US");
        assert_eq!(code.to_string(), "US");
    }

    #[test]
    fn test_country_code_rejects_malformed() {
        assert!("USA".parse::<CountryCode>().is_err());
        assert!("U".parse::<CountryCode>().is_err());
        assert!("U1".parse::<CountryCode>().is_err());
        assert!("".parse::<CountryCode>().is_err());
    }

    #[test]
    fn test_temporal_block_expiry_boundary() {
        let now = Utc::now();
        let block = TemporalBlock {
            country_code: "US".parse().unwrap(),
            created_at: now,
            expires_at: now + Duration::minutes(5),
        };

        assert!(!block.is_expired_at(now));
        // expires_at itself counts as expired
        assert!(block.is_expired_at(now + Duration::minutes(5)));
        assert!(block.is_expired_at(now + Duration::minutes(6)));
    }

    #[test]
    fn test_block_status() {
        assert!(BlockStatus::Permanent.is_blocked());
        assert!(BlockStatus::Temporal.is_blocked());
        assert!(!BlockStatus::Clear.is_blocked());
        assert_eq!(BlockStatus::Temporal.to_string(), "temporal");
    }
}
