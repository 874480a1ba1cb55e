//! Caching layer for timetable lookups.
//!
//! The published timetable only changes between timetable periods, and the
//! raw hour columns don't depend on the minute of the query, so one fetch per
//! (stop, direction, day-type, hour) serves every query in that hour. Minute
//! filtering happens downstream of the cache.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::timetable::{DepartureQuery, ProviderError, RawDepartures, TimetableProvider};

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            max_capacity: 1000,
        }
    }
}

/// Timetable provider with caching.
///
/// Wraps another provider and memoises its answers per [`DepartureQuery`].
/// Failures are not cached.
pub struct CachedProvider<P> {
    inner: P,
    cache: MokaCache<DepartureQuery, Arc<RawDepartures>>,
}

impl<P> CachedProvider<P> {
    /// Create a new cached provider.
    pub fn new(inner: P, config: &CacheConfig) -> Self {
        let cache = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { inner, cache }
    }

    /// Access the wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

impl<P> TimetableProvider for CachedProvider<P>
where
    P: TimetableProvider + Send,
{
    async fn fetch_departures(
        &mut self,
        query: &DepartureQuery,
    ) -> Result<RawDepartures, ProviderError> {
        if let Some(cached) = self.cache.get(query).await {
            debug!(stop = %query.stop, hour = query.hour, "timetable cache hit");
            return Ok(RawDepartures::clone(&cached));
        }

        let raw = self.inner.fetch_departures(query).await?;
        self.cache.insert(*query, Arc::new(raw.clone())).await;

        Ok(raw)
    }

    /// Resets the wrapped session. Cached timetable data stays valid.
    async fn reset(&mut self) -> Result<(), ProviderError> {
        self.inner.reset().await
    }
}
