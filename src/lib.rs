pub mod api;
pub mod attempts;
pub mod clock;
pub mod config;
pub mod error;
pub mod geoip;
pub mod models;
pub mod permanent;
pub mod sweeper;
pub mod temporal;

use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};

use attempts::AttemptLog;
use clock::{Clock, SystemClock};
use config::Config;
use error::{BlockError, Result};
use geoip::{GeoIpClient, GeoIpError};
use models::{BlockAttempt, BlockStatus, BlockedCountry, CheckOutcome, CountryCode, GeoIpInfo, TemporalBlock};
use permanent::PermanentBlockStore;
use temporal::TemporalBlockStore;

/// Inclusive bounds for a temporal block duration, in minutes
pub const MIN_BLOCK_MINUTES: i64 = 1;
pub const MAX_BLOCK_MINUTES: i64 = 1440;

/// Core geoblock service
///
/// Owns the block stores, the attempt log, and the GeoIP client, and
/// enforces the validation and conflict rules between them. Constructed
/// explicitly and shared behind an `Arc`; there is no global instance.
pub struct Geoblock {
    permanent: Arc<PermanentBlockStore>,
    temporal: Arc<TemporalBlockStore>,
    attempts: Arc<AttemptLog>,
    geoip: Arc<GeoIpClient>,
    clock: Arc<dyn Clock>,
}

impl Geoblock {
    /// Create a new geoblock service on the system clock
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a service instance with an injected clock
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let geoip = Arc::new(GeoIpClient::new(config.geoip.clone(), clock.clone())?);

        Ok(Self {
            permanent: Arc::new(PermanentBlockStore::new()),
            temporal: Arc::new(TemporalBlockStore::new(clock.clone())),
            attempts: Arc::new(AttemptLog::new()),
            geoip,
            clock,
        })
    }

    /// The temporal store, for wiring up the background sweeper
    pub fn temporal_store(&self) -> Arc<TemporalBlockStore> {
        self.temporal.clone()
    }

    /// Register a time-limited block for a country
    ///
    /// Validates the code and the duration, rejects countries already
    /// blocked either way, and reports a lost insert race as the same
    /// conflict a sequential caller would have seen.
    pub fn add_temporal_block(&self, code: &str, duration_minutes: i64) -> Result<TemporalBlock> {
        let code: CountryCode = code.parse()?;

        if !(MIN_BLOCK_MINUTES..=MAX_BLOCK_MINUTES).contains(&duration_minutes) {
            return Err(BlockError::InvalidDuration(duration_minutes));
        }

        if self.permanent.exists(&code) {
            return Err(BlockError::AlreadyPermanentlyBlocked(code.to_string()));
        }

        if self.temporal.is_blocked(&code) {
            return Err(BlockError::AlreadyTemporallyBlocked(code.to_string()));
        }

        match self
            .temporal
            .try_insert(&code, Duration::minutes(duration_minutes))
        {
            Some(block) => {
                info!(
                    "temporally blocked {} for {} minutes (expires {})",
                    code, duration_minutes, block.expires_at
                );
                Ok(block)
            }
            // another caller won the insert between the check and here
            None => Err(BlockError::AlreadyTemporallyBlocked(code.to_string())),
        }
    }

    /// Remove a temporal block
    pub fn remove_temporal_block(&self, code: &str) -> Result<()> {
        let code: CountryCode = code.parse()?;
        if self.temporal.remove(&code) {
            info!("removed temporal block for {}", code);
            Ok(())
        } else {
            Err(BlockError::NotFound(code.to_string()))
        }
    }

    /// Inspection snapshot of temporal blocks, newest first, unfiltered
    pub fn list_temporal(&self) -> Vec<TemporalBlock> {
        self.temporal.list_active()
    }

    /// Permanently block a country
    pub fn add_permanent_block(&self, code: &str, name: &str) -> Result<BlockedCountry> {
        let code: CountryCode = code.parse()?;

        if self.permanent.exists(&code) {
            return Err(BlockError::AlreadyPermanentlyBlocked(code.to_string()));
        }

        let country = BlockedCountry {
            country_code: code.clone(),
            country_name: name.to_string(),
            added_at: self.clock.now(),
        };

        if !self.permanent.add(country.clone()) {
            return Err(BlockError::StoreFailure(code.to_string()));
        }

        info!("permanently blocked {}", code);
        Ok(country)
    }

    /// Remove a permanent block
    pub fn remove_permanent_block(&self, code: &str) -> Result<()> {
        let code: CountryCode = code.parse()?;
        if self.permanent.remove(&code) {
            info!("removed permanent block for {}", code);
            Ok(())
        } else {
            Err(BlockError::NotFound(code.to_string()))
        }
    }

    /// Snapshot of permanently blocked countries, newest first
    pub fn list_permanent(&self) -> Vec<BlockedCountry> {
        self.permanent.list()
    }

    /// Why (or whether) a country is blocked right now
    ///
    /// Hot path: two map lookups, nothing else.
    pub fn block_status(&self, code: &CountryCode) -> BlockStatus {
        if self.permanent.exists(code) {
            BlockStatus::Permanent
        } else if self.temporal.is_blocked(code) {
            BlockStatus::Temporal
        } else {
            BlockStatus::Clear
        }
    }

    pub fn is_currently_blocked(&self, code: &CountryCode) -> bool {
        self.block_status(code).is_blocked()
    }

    /// Resolve geo information for an IP (no block decision, no audit entry)
    pub async fn lookup_ip(&self, ip: &str) -> std::result::Result<GeoIpInfo, GeoIpError> {
        self.geoip.lookup(ip).await
    }

    /// Full inbound-IP check: geo lookup, block decision, audit entry
    ///
    /// Every decision is appended to the attempt log, including lookup
    /// failures (recorded with an unknown country and propagated so the
    /// caller can answer service-unavailable).
    pub async fn check_ip(
        &self,
        ip: &str,
        user_agent: &str,
    ) -> std::result::Result<CheckOutcome, GeoIpError> {
        let geo = match self.geoip.lookup(ip).await {
            Ok(geo) => geo,
            Err(e) => {
                warn!("geo lookup failed for {}: {}", ip, e);
                self.record_attempt(ip, "N/A", false, user_agent);
                return Err(e);
            }
        };

        let status = match geo.country_code.parse::<CountryCode>() {
            Ok(code) => self.block_status(&code),
            // provider returned no usable code; never blocked by default
            Err(_) => BlockStatus::Clear,
        };

        self.record_attempt(ip, &geo.country_code, status.is_blocked(), user_agent);

        Ok(CheckOutcome { geo, status })
    }

    /// Page of the attempt log, newest first
    pub fn attempts_page(&self, page: usize, page_size: usize) -> (Vec<BlockAttempt>, usize) {
        self.attempts.page(page, page_size)
    }

    /// Best-effort audit append; must never fail the decision path
    fn record_attempt(&self, ip: &str, country_code: &str, blocked: bool, user_agent: &str) {
        self.attempts.append(BlockAttempt {
            ip: ip.to_string(),
            timestamp: self.clock.now(),
            country_code: country_code.to_string(),
            blocked,
            user_agent: user_agent.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clock::ManualClock;
    use chrono::Utc;

    fn service() -> (Geoblock, Arc<ManualClock>) {
        let clock = ManualClock::starting_at(Utc::now());
        let service = Geoblock::with_clock(&Config::default(), clock.clone()).unwrap();
        (service, clock)
    }

    fn code(s: &str) -> CountryCode {
        s.parse().unwrap()
    }

    #[test]
    fn test_temporal_block_lifecycle_scenario() {
        let (service, clock) = service();

        // t=0: block US for 60 minutes
        let block = service.add_temporal_block("US", 60).unwrap();
        assert_eq!(block.country_code.as_str(), "US");
        assert!(service.is_currently_blocked(&code("US")));

        // t=10: a second block is a conflict
        clock.advance(Duration::minutes(10));
        assert!(matches!(
            service.add_temporal_block("US", 30),
            Err(BlockError::AlreadyTemporallyBlocked(_))
        ));

        // t=61: expired, and a fresh block succeeds
        clock.advance(Duration::minutes(51));
        assert!(!service.is_currently_blocked(&code("US")));
        assert!(service.add_temporal_block("US", 15).is_ok());
    }

    #[test]
    fn test_rejects_malformed_code() {
        let (service, _clock) = service();
        assert!(matches!(
            service.add_temporal_block("USA", 10),
            Err(BlockError::InvalidCountryCode(_))
        ));
    }

    #[test]
    fn test_duration_bounds_are_inclusive() {
        let (service, _clock) = service();

        assert!(matches!(
            service.add_temporal_block("US", 0),
            Err(BlockError::InvalidDuration(0))
        ));
        assert!(matches!(
            service.add_temporal_block("US", 1441),
            Err(BlockError::InvalidDuration(1441))
        ));

        assert!(service.add_temporal_block("US", 1).is_ok());
        assert!(service.add_temporal_block("DE", 1440).is_ok());
    }

    #[test]
    fn test_lowercase_code_is_normalized() {
        let (service, _clock) = service();
        let block = service.add_temporal_block("us", 30).unwrap();
        assert_eq!(block.country_code.as_str(), "US");
        assert!(service.is_currently_blocked(&code("US")));
    }

    #[test]
    fn test_permanent_block_wins_conflicts() {
        let (service, _clock) = service();

        service.add_permanent_block("CN", "China").unwrap();
        assert!(matches!(
            service.add_temporal_block("CN", 30),
            Err(BlockError::AlreadyPermanentlyBlocked(_))
        ));
        assert_eq!(service.block_status(&code("CN")), BlockStatus::Permanent);
    }

    #[test]
    fn test_permanent_add_and_remove() {
        let (service, _clock) = service();

        service.add_permanent_block("CN", "China").unwrap();
        assert!(matches!(
            service.add_permanent_block("CN", "China"),
            Err(BlockError::AlreadyPermanentlyBlocked(_))
        ));

        service.remove_permanent_block("CN").unwrap();
        assert!(matches!(
            service.remove_permanent_block("CN"),
            Err(BlockError::NotFound(_))
        ));
        assert_eq!(service.block_status(&code("CN")), BlockStatus::Clear);
    }

    #[test]
    fn test_remove_temporal_block() {
        let (service, _clock) = service();

        service.add_temporal_block("US", 60).unwrap();
        service.remove_temporal_block("US").unwrap();
        assert!(!service.is_currently_blocked(&code("US")));
        assert!(matches!(
            service.remove_temporal_block("US"),
            Err(BlockError::NotFound(_))
        ));
    }

    #[test]
    fn test_block_status_reports_reason() {
        let (service, clock) = service();

        service.add_permanent_block("CN", "China").unwrap();
        service.add_temporal_block("US", 60).unwrap();

        assert_eq!(service.block_status(&code("CN")), BlockStatus::Permanent);
        assert_eq!(service.block_status(&code("US")), BlockStatus::Temporal);
        assert_eq!(service.block_status(&code("FR")), BlockStatus::Clear);

        clock.advance(Duration::minutes(61));
        assert_eq!(service.block_status(&code("US")), BlockStatus::Clear);
    }

    #[test]
    fn test_expired_block_gone_after_sweep() {
        let (service, clock) = service();

        service.add_temporal_block("US", 30).unwrap();
        clock.advance(Duration::minutes(31));

        // still physically present in the inspection view
        assert_eq!(service.list_temporal().len(), 1);

        let store = service.temporal_store();
        assert_eq!(store.sweep_expired(), 1);
        assert!(service.list_temporal().is_empty());
    }
}
