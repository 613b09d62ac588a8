//! Content-keyed memoization of analyzer outcomes.
//!
//! A store guarantees at most one in-flight computation per fingerprint:
//! concurrent callers with the same key share the leader's result instead of
//! repeating the work. Reclamation is the store's business.

mod fingerprint;
mod memory;

use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;

pub use fingerprint::Fingerprint;
pub use memory::InMemoryCacheStore;

/// Counters describing cache effectiveness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Callers that waited on another caller's in-flight computation.
    pub joins: u64,
    pub evictions: u64,
    pub entries: usize,
}

#[async_trait]
pub trait CacheStore<V, E>: Send + Sync + fmt::Debug
where
    V: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    /// Returns the memoized value for `key`, running `compute` only when no
    /// value is cached and no other caller is already computing it. Errors are
    /// returned to the caller that ran the computation and are never cached.
    async fn get_or_compute(
        &self,
        key: &Fingerprint,
        compute: BoxFuture<'_, Result<V, E>>,
    ) -> Result<V, E>;

    /// Drops a completed entry so the next lookup recomputes it.
    fn invalidate(&self, key: &Fingerprint);

    fn stats(&self) -> CacheStats;
}

/// Store used when caching is disabled: every lookup recomputes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCacheStore;

#[async_trait]
impl<V, E> CacheStore<V, E> for NoopCacheStore
where
    V: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    async fn get_or_compute(
        &self,
        _key: &Fingerprint,
        compute: BoxFuture<'_, Result<V, E>>,
    ) -> Result<V, E> {
        compute.await
    }

    fn invalidate(&self, _key: &Fingerprint) {}

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}
