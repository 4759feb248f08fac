//! Temporal country block store
//!
//! TTL-keyed store for time-limited country blocks. Reads lazily expire
//! stale entries as they find them; a periodic sweep reclaims entries
//! nobody reads again. Correctness never depends on the sweep having run.

use std::sync::Arc;

use chrono::Duration;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::clock::Clock;
use crate::models::{CountryCode, TemporalBlock};
use crate::sweeper::Sweep;

/// Concurrent store of active temporal blocks, keyed by country code
///
/// All operations take `&self` and are safe from any number of threads.
/// The map is sharded, so writers for different keys do not contend and no
/// operation holds a lock across more than its own shard access.
pub struct TemporalBlockStore {
    entries: DashMap<CountryCode, TemporalBlock>,
    clock: Arc<dyn Clock>,
}

impl TemporalBlockStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Insert a block for `code` lasting `duration`, if no live entry holds
    /// the key
    ///
    /// An expired-but-unswept entry counts as absent and is overwritten.
    /// The entry API keeps the whole check-and-insert under the key's shard
    /// lock, so of any number of concurrent callers for the same absent key
    /// exactly one gets `Some`. Returns the inserted block; `None` means a
    /// live entry already occupies the key.
    pub fn try_insert(&self, code: &CountryCode, duration: Duration) -> Option<TemporalBlock> {
        let now = self.clock.now();
        let block = TemporalBlock {
            country_code: code.clone(),
            created_at: now,
            expires_at: now + duration,
        };

        match self.entries.entry(code.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired_at(now) {
                    occupied.insert(block.clone());
                    Some(block)
                } else {
                    None
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(block.clone());
                Some(block)
            }
        }
    }

    /// Whether `code` is currently blocked
    ///
    /// A read that finds a stale entry removes it as a side effect (lazy
    /// expiry). The removal re-checks the expiry under the shard lock, so a
    /// fresh block inserted by a concurrent caller is never clobbered.
    pub fn is_blocked(&self, code: &CountryCode) -> bool {
        let now = self.clock.now();
        match self.entries.get(code) {
            Some(entry) if entry.is_expired_at(now) => {
                drop(entry);
                if self
                    .entries
                    .remove_if(code, |_, block| block.is_expired_at(now))
                    .is_some()
                {
                    debug!("lazily expired temporal block for {}", code);
                }
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Remove the entry for `code`, expired or not
    ///
    /// Idempotent: returns whether an entry was actually present.
    pub fn remove(&self, code: &CountryCode) -> bool {
        self.entries.remove(code).is_some()
    }

    /// Snapshot of all entries, newest first
    ///
    /// Pure inspection view: expired-but-unswept entries are included and
    /// nothing is removed. Callers wanting "currently valid" semantics must
    /// check `expires_at` themselves.
    pub fn list_active(&self) -> Vec<TemporalBlock> {
        let mut blocks: Vec<TemporalBlock> =
            self.entries.iter().map(|entry| entry.value().clone()).collect();
        blocks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        blocks
    }

    /// Remove every entry whose expiry has passed, returning the count
    ///
    /// Two phases: snapshot the keys observed expired, then remove each one
    /// with the expiry re-checked under its shard lock. An entry re-inserted
    /// with a later expiry after the scan began survives; only entries
    /// individually observed expired at the moment of removal are reclaimed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();

        let expired: Vec<CountryCode> = self
            .entries
            .iter()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for code in expired {
            if self
                .entries
                .remove_if(&code, |_, block| block.is_expired_at(now))
                .is_some()
            {
                removed += 1;
            }
        }

        removed
    }

    /// Number of physically present entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Sweep for TemporalBlockStore {
    fn sweep(&self) -> anyhow::Result<usize> {
        Ok(self.sweep_expired())
    }
}
