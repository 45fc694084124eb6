//! Memoized compressed sizes.
//!
//! The cache is an explicit object owned by the caller and bound to one
//! compressor. Entries are keyed by content, so identical content under
//! different item indices shares an entry.

use crate::compressor::Compressor;
use crate::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const DEFAULT_SHARDS: usize = 16;

/// Below this capacity a single shard is used so the bound stays exact.
const MIN_SHARDED_CAPACITY: usize = 64;

struct Entry {
    size: usize,
    last_used: AtomicU64,
}

type Shard = HashMap<String, Entry, ahash::RandomState>;

/// Hit/miss counters for a [`CompressionCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Concurrent content → compressed-size cache.
///
/// Reads on a shard never block each other and distinct keys usually land on
/// distinct shards. Compression runs outside every lock; two threads missing
/// on the same key both compress and both store the (identical) result.
pub struct CompressionCache {
    compressor: Arc<dyn Compressor>,
    shards: Box<[RwLock<Shard>]>,
    router: ahash::RandomState,
    shard_capacity: Option<usize>,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CompressionCache {
    /// Unbounded cache.
    pub fn new(compressor: Arc<dyn Compressor>) -> Self {
        Self::build(compressor, DEFAULT_SHARDS, None)
    }

    /// Cache holding at most roughly `capacity` entries, evicting the least
    /// recently used entry of a full shard.
    pub fn with_capacity_bound(compressor: Arc<dyn Compressor>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let shards = if capacity < MIN_SHARDED_CAPACITY { 1 } else { DEFAULT_SHARDS };
        let per_shard = capacity.div_ceil(shards);
        Self::build(compressor, shards, Some(per_shard))
    }

    fn build(compressor: Arc<dyn Compressor>, shards: usize, shard_capacity: Option<usize>) -> Self {
        let shards = (0..shards)
            .map(|_| RwLock::new(Shard::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            compressor,
            shards,
            router: ahash::RandomState::new(),
            shard_capacity,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// The compressor every cached size was produced with.
    pub fn compressor(&self) -> &Arc<dyn Compressor> {
        &self.compressor
    }

    /// Compressed size of `content`, compressing on first request only.
    pub fn size_of(&self, content: &str) -> Result<usize> {
        let shard = &self.shards[self.shard_index(content)];
        let now = self.clock.fetch_add(1, Ordering::Relaxed);

        if let Some(entry) = shard.read().get(content) {
            entry.last_used.store(now, Ordering::Relaxed);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry.size);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let size = self.compressor.compressed_len(content.as_bytes())?;

        let mut guard = shard.write();
        if let Some(capacity) = self.shard_capacity {
            if guard.len() >= capacity && !guard.contains_key(content) {
                Self::evict_oldest(&mut guard);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        guard.insert(
            content.to_string(),
            Entry {
                size,
                last_used: AtomicU64::new(now),
            },
        );
        Ok(size)
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.write().clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    #[inline]
    fn shard_index(&self, content: &str) -> usize {
        (self.router.hash_one(content) as usize) % self.shards.len()
    }

    fn evict_oldest(shard: &mut Shard) {
        let oldest = shard
            .iter()
            .min_by_key(|(_, e)| e.last_used.load(Ordering::Relaxed))
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            shard.remove(&key);
        }
    }
}

impl std::fmt::Debug for CompressionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionCache")
            .field("compressor", &self.compressor.name())
            .field("shards", &self.shards.len())
            .field("shard_capacity", &self.shard_capacity)
            .field("stats", &self.stats())
            .finish()
    }
}
