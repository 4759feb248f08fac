//! Permanent country block store
//!
//! Unique-key set of countries blocked without expiry.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::models::{BlockedCountry, CountryCode};

/// Concurrent set of permanently blocked countries
#[derive(Default)]
pub struct PermanentBlockStore {
    entries: DashMap<CountryCode, BlockedCountry>,
}

impl PermanentBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert if absent; returns whether the entry was added
    pub fn add(&self, country: BlockedCountry) -> bool {
        match self.entries.entry(country.country_code.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(country);
                true
            }
        }
    }

    pub fn exists(&self, code: &CountryCode) -> bool {
        self.entries.contains_key(code)
    }

    /// Returns whether an entry was actually present
    pub fn remove(&self, code: &CountryCode) -> bool {
        self.entries.remove(code).is_some()
    }

    /// Snapshot of all blocked countries, newest first
    pub fn list(&self) -> Vec<BlockedCountry> {
        let mut countries: Vec<BlockedCountry> =
            self.entries.iter().map(|entry| entry.value().clone()).collect();
        countries.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        countries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
