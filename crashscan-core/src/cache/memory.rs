use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{CacheStats, CacheStore, Fingerprint};
use crate::config::CacheConfig;

struct Slot<V> {
    cell: OnceCell<(V, Instant)>,
}

impl<V> Slot<V> {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    fn stored_at(&self) -> Option<Instant> {
        self.cell.get().map(|(_, at)| *at)
    }
}

/// Bounded in-memory store with per-key singleflight.
///
/// Completed entries are reclaimed once they outlive the configured TTL or
/// when the store grows past `max_entries` (oldest first). Entries whose
/// computation is still running are never reclaimed.
pub struct InMemoryCacheStore<V> {
    entries: DashMap<Fingerprint, Arc<Slot<V>>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    joins: AtomicU64,
    evictions: AtomicU64,
}

impl<V> fmt::Debug for InMemoryCacheStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCacheStore")
            .field("config", &self.config)
            .field("entries", &self.entries.len())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl<V> InMemoryCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            joins: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_fresh(&self, stored_at: Instant) -> bool {
        self.config
            .ttl()
            .is_none_or(|ttl| stored_at.elapsed() < ttl)
    }

    /// Drops expired entries, abandoned empty slots, and the oldest completed
    /// entries beyond capacity.
    fn reclaim(&self) {
        let mut evicted = 0u64;
        self.entries.retain(|_, slot| {
            let keep = match slot.stored_at() {
                Some(at) => self.is_fresh(at),
                // An empty slot only the map references has no computation
                // left that could fill it.
                None => Arc::strong_count(slot) > 1,
            };
            if !keep {
                evicted += 1;
            }
            keep
        });

        let capacity = self.config.max_entries.max(1);
        if self.entries.len() > capacity {
            let mut completed: Vec<(Fingerprint, Instant)> = self
                .entries
                .iter()
                .filter_map(|entry| {
                    entry.value().stored_at().map(|at| (entry.key().clone(), at))
                })
                .collect();
            completed.sort_by_key(|(_, at)| *at);

            let excess = self.entries.len().saturating_sub(capacity);
            for (key, _) in completed.into_iter().take(excess) {
                if self
                    .entries
                    .remove_if(&key, |_, slot| slot.cell.initialized())
                    .is_some()
                {
                    evicted += 1;
                }
            }
        }

        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            debug!(
                target: "scan::cache",
                evicted,
                remaining = self.entries.len(),
                "cache entries reclaimed"
            );
        }
    }
}

#[async_trait]
impl<V, E> CacheStore<V, E> for InMemoryCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    async fn get_or_compute(
        &self,
        key: &Fingerprint,
        compute: BoxFuture<'_, Result<V, E>>,
    ) -> Result<V, E> {
        loop {
            let slot = Arc::clone(
                self.entries
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(Slot::new()))
                    .value(),
            );

            if let Some((value, stored_at)) = slot.cell.get() {
                if self.is_fresh(*stored_at) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(target: "scan::cache", %key, "cache hit");
                    return Ok(value.clone());
                }
                self.entries
                    .remove_if(key, |_, current| Arc::ptr_eq(current, &slot));
                self.evictions.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let mut led = false;
            let outcome = slot
                .cell
                .get_or_try_init(|| {
                    led = true;
                    async move { compute.await.map(|value| (value, Instant::now())) }
                })
                .await
                .map(|(value, _)| value.clone());

            if led {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(target: "scan::cache", %key, "cache miss computed");
                self.reclaim();
            } else {
                self.joins.fetch_add(1, Ordering::Relaxed);
                debug!(target: "scan::cache", %key, "joined in-flight computation");
            }
            return outcome;
        }
    }

    fn invalidate(&self, key: &Fingerprint) {
        if self
            .entries
            .remove_if(key, |_, slot| slot.cell.initialized())
            .is_some()
        {
            debug!(target: "scan::cache", %key, "cache entry invalidated");
        }
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
