//! The partitioned cache store and its consistency protocol
//!
//! The store mirrors remote entities in keyed partitions. Two invalidation
//! strengths exist:
//!
//! - **soft invalidate** marks entries stale; a read still serves the old
//!   value immediately and kicks off a background refetch
//!   (stale-while-revalidate).
//! - **hard clear** evicts entries; the next read blocks on a fresh fetch.
//!
//! Both recovery and successful mutations funnel into the same
//! clear-then-invalidate protocol, so there is no code path that changes
//! remote state and leaves a partition silently fresh.
//!
//! The clear-then-invalidate sequencing in [`CacheStore::forced_full_sync`]
//! is an explicit ordering guarantee: the clear runs to completion under the
//! store lock before the invalidate is issued, so a subsequent read observes
//! a genuinely empty cache rather than interleaving with the clear.
//!
//! Refetches are fire-and-forget from the invalidator's perspective —
//! correctness depends only on entries being marked or evicted before the
//! next read, never on a refetch completing at any particular time.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::partition::{partitions_for_topic, Partition, Topic};
use crate::error::Result;

/// Composite key addressing one cached value: an entity view plus an
/// optional parameter (e.g. species detail for one species name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub partition: Partition,
    pub param: Option<String>,
}

impl CacheKey {
    /// Key for a parameterless partition-wide view
    pub fn of(partition: Partition) -> Self {
        Self {
            partition,
            param: None,
        }
    }

    /// Key for a parameterized view
    pub fn with_param(partition: Partition, param: impl Into<String>) -> Self {
        Self {
            partition,
            param: Some(param.into()),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.param {
            Some(param) => write!(f, "{}[{}]", self.partition, param),
            None => write!(f, "{}", self.partition),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stale: bool,
    fetched_at: Instant,
}

#[derive(Debug, Default)]
struct PartitionState {
    entries: HashMap<Option<String>, CacheEntry>,
    stale: bool,
    last_fetched: Option<Instant>,
}

/// Counters describing cache traffic since construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from a fresh entry
    pub hits: u64,
    /// Reads served stale while a refetch ran in the background
    pub stale_hits: u64,
    /// Reads that had to block on a fetch
    pub misses: u64,
    /// Background refetches that failed (entry left stale)
    pub refetch_failures: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    partitions: RwLock<HashMap<Partition, PartitionState>>,
    hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    refetch_failures: AtomicU64,
}

/// Partitioned key-value cache mirroring remote survey data.
///
/// Cheaply clonable; clones share the same underlying store. All mutation
/// of the map happens under one async lock, so invalidation and eviction
/// complete atomically with respect to reads — the only ordering the
/// consistency protocol relies on.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    inner: Arc<CacheInner>,
}

enum ReadPlan {
    Fresh(Value),
    Stale(Value),
    Miss,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the named partitions stale.
    ///
    /// Existing values stay servable; the next read of a marked entry
    /// returns it immediately and refreshes in the background.
    pub async fn soft_invalidate(&self, partitions: &[Partition]) {
        let mut map = self.inner.partitions.write().await;
        for partition in partitions {
            let state = map.entry(*partition).or_default();
            state.stale = true;
            for entry in state.entries.values_mut() {
                entry.stale = true;
            }
            debug!(partition = %partition, "soft-invalidated");
        }
    }

    /// Evict all entries of the named partitions immediately.
    ///
    /// The next read of an evicted key blocks on a fresh fetch.
    pub async fn hard_clear(&self, partitions: &[Partition]) {
        let mut map = self.inner.partitions.write().await;
        for partition in partitions {
            let state = map.entry(*partition).or_default();
            let evicted = state.entries.len();
            state.entries.clear();
            state.stale = false;
            if evicted > 0 {
                debug!(partition = %partition, evicted, "hard-cleared");
            }
        }
    }

    /// Session-start resynchronization: clear everything, then mark
    /// everything stale.
    ///
    /// The clear is awaited to completion before the invalidate is issued —
    /// the two steps never interleave, so any read after this call observes
    /// an empty cache and fetches fresh.
    pub async fn forced_full_sync(&self) {
        info!("forced full sync: clearing and re-marking all partitions");
        self.hard_clear(&Partition::ALL).await;
        self.soft_invalidate(&Partition::ALL).await;
    }

    /// Run the clear-then-invalidate protocol on exactly the partitions a
    /// mutation of `topic` can have staled.
    pub async fn purge_for_mutation(&self, topic: Topic) {
        let targets = partitions_for_topic(topic);
        debug!(topic = %topic, partitions = targets.len(), "purging for mutation");
        self.hard_clear(targets).await;
        self.soft_invalidate(targets).await;
    }

    /// Read one cached value, fetching through `fetch` as the protocol
    /// requires: fresh entries are served directly, stale entries are served
    /// immediately while a background refetch replaces them, and misses
    /// block on the fetch.
    pub async fn read<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Value>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let plan = {
            let map = self.inner.partitions.read().await;
            match map
                .get(&key.partition)
                .and_then(|state| state.entries.get(&key.param))
            {
                Some(entry) if !entry.stale => ReadPlan::Fresh(entry.value.clone()),
                Some(entry) => ReadPlan::Stale(entry.value.clone()),
                None => ReadPlan::Miss,
            }
        };

        match plan {
            ReadPlan::Fresh(value) => {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
            ReadPlan::Stale(value) => {
                self.inner.stale_hits.fetch_add(1, Ordering::Relaxed);
                let store = self.clone();
                tokio::spawn(async move {
                    match fetch().await {
                        Ok(fresh) => store.insert_fresh(&key, fresh).await,
                        Err(e) => {
                            store.inner.refetch_failures.fetch_add(1, Ordering::Relaxed);
                            warn!(key = %key, error = %e, "background refetch failed; entry stays stale");
                        }
                    }
                });
                Ok(value)
            }
            ReadPlan::Miss => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                let value = fetch().await?;
                self.insert_fresh(&key, value.clone()).await;
                Ok(value)
            }
        }
    }

    /// Store a freshly fetched value for `key`.
    pub async fn insert_fresh(&self, key: &CacheKey, value: Value) {
        let now = Instant::now();
        let mut map = self.inner.partitions.write().await;
        let state = map.entry(key.partition).or_default();
        state.entries.insert(
            key.param.clone(),
            CacheEntry {
                value,
                stale: false,
                fetched_at: now,
            },
        );
        state.last_fetched = Some(now);
        state.stale = state.entries.values().any(|e| e.stale);
    }

    /// Look at a cached value without fetching. Returns the value and its
    /// staleness, if present.
    pub async fn peek(&self, key: &CacheKey) -> Option<(Value, bool)> {
        let map = self.inner.partitions.read().await;
        map.get(&key.partition)
            .and_then(|state| state.entries.get(&key.param))
            .map(|entry| (entry.value.clone(), entry.stale))
    }

    /// Whether the partition as a whole is marked stale.
    pub async fn is_stale(&self, partition: Partition) -> bool {
        let map = self.inner.partitions.read().await;
        map.get(&partition).map(|s| s.stale).unwrap_or(false)
    }

    /// Number of live entries in a partition.
    pub async fn entry_count(&self, partition: Partition) -> usize {
        let map = self.inner.partitions.read().await;
        map.get(&partition).map(|s| s.entries.len()).unwrap_or(0)
    }

    /// When the partition last stored a fresh fetch, if ever.
    pub async fn last_fetched(&self, partition: Partition) -> Option<Instant> {
        let map = self.inner.partitions.read().await;
        map.get(&partition).and_then(|s| s.last_fetched)
    }

    /// Age of the oldest entry in a partition, for diagnostics.
    pub async fn oldest_entry_age(&self, partition: Partition) -> Option<std::time::Duration> {
        let map = self.inner.partitions.read().await;
        map.get(&partition)
            .and_then(|s| s.entries.values().map(|e| e.fetched_at).min())
            .map(|t| t.elapsed())
    }

    /// Snapshot of the traffic counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            stale_hits: self.inner.stale_hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            refetch_failures: self.inner.refetch_failures.load(Ordering::Relaxed),
        }
    }
}
