//! Process-wide memoisation of postcode-to-postcode distances.
//!
//! The cache is an explicit object owned by whatever composes the
//! recommendation engine; there is no ambient static state. Entries are
//! replaced wholesale and never mutated in place.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::clock::SystemClock;
use crate::error::DistanceError;
use crate::traits::{Clock, DistanceProvider};

/// Distance reported for two identical postcodes.
pub const SAME_POSTCODE_MILES: f64 = 0.5;

/// Default time-to-live for cached distances.
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// How a distance was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMethod {
    SamePostcode,
    /// Driving distance from the remote provider.
    Provider,
    /// Great-circle estimate.
    Haversine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceReading {
    pub miles: f64,
    /// Driving time in minutes, when the source reports one.
    pub minutes: Option<f64>,
    pub method: DistanceMethod,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    reading: DistanceReading,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
        }
    }
}

/// Trim and uppercase a postcode.
pub fn normalize_postcode(postcode: &str) -> String {
    postcode.trim().to_uppercase()
}

/// Key that is identical for (a, b) and (b, a).
fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

pub struct DistanceCache<P> {
    provider: P,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<(String, String), CacheEntry>>,
}

impl<P: DistanceProvider> DistanceCache<P> {
    pub fn new(provider: P) -> Self {
        Self::with_clock(provider, CacheConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_clock(provider: P, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            config,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Distance in miles between two postcodes.
    pub fn distance(&self, a: &str, b: &str) -> Result<f64, DistanceError> {
        self.lookup(a, b).map(|reading| reading.miles)
    }

    /// Full reading between two postcodes, consulting the provider on a miss
    /// or an expired entry. Provider failures are returned, never defaulted.
    pub fn lookup(&self, a: &str, b: &str) -> Result<DistanceReading, DistanceError> {
        let a = normalize_postcode(a);
        let b = normalize_postcode(b);
        if a.is_empty() || b.is_empty() {
            return Err(DistanceError::EmptyPostcode);
        }
        if a == b {
            return Ok(DistanceReading {
                miles: SAME_POSTCODE_MILES,
                minutes: None,
                method: DistanceMethod::SamePostcode,
            });
        }

        let key = pair_key(&a, &b);
        let now = self.clock.now();
        if let Some(entry) = self.entries.read().get(&key) {
            if now - entry.fetched_at < self.config.ttl {
                debug!(
                    origin = %a,
                    destination = %b,
                    miles = entry.reading.miles,
                    "distance cache hit"
                );
                return Ok(entry.reading.clone());
            }
        }

        debug!(origin = %a, destination = %b, "distance cache miss");
        let reading = self.provider.measure(&key.0, &key.1)?;
        self.entries.write().insert(
            key,
            CacheEntry {
                reading: reading.clone(),
                fetched_at: now,
            },
        );
        Ok(reading)
    }

    /// Drop every cached distance.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        debug!(entries = entries.len(), "clearing distance cache");
        entries.clear();
    }

    /// Evict entries older than the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.config.ttl;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| now - entry.fetched_at < ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
