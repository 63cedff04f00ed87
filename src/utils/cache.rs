use crate::board::{Board, Color};
use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Approximate bytes held per evaluation entry (key, value and LRU links)
pub const EVALUATION_ENTRY_BYTES: usize =
    std::mem::size_of::<(Board, Color)>() + std::mem::size_of::<f32>() + 48;

/// Number of evaluation entries that fit in `megabytes`, at least one.
pub fn entries_for_megabytes(megabytes: usize) -> usize {
    (megabytes.saturating_mul(1024 * 1024) / EVALUATION_ENTRY_BYTES).max(1)
}

/// Bounded LRU cache with hit/miss tracking
pub struct StatsLruCache<K: Hash + Eq, V> {
    cache: LruCache<K, V>,
    hits: u64,
    misses: u64,
}

/// Cache performance statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Hit rate as a percentage, 0 when nothing was looked up yet
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}

impl<K: Hash + Eq, V: Copy> StatsLruCache<K, V> {
    /// Create a cache holding at most `capacity` entries (minimum one).
    /// Storage grows on demand rather than being reserved up front.
    pub fn new(capacity: usize) -> Self {
        let mut cache = LruCache::unbounded();
        cache.resize(non_zero(capacity));
        Self {
            cache,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a value, counting the hit or miss
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.cache.get(key) {
            Some(&value) => {
                self.hits += 1;
                Some(value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a value, evicting the least recently used entry when full
    pub fn insert(&mut self, key: K, value: V) {
        self.cache.put(key, value);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.cache.contains(key)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    /// Change the capacity, evicting old entries if it shrinks
    pub fn resize(&mut self, capacity: usize) {
        self.cache.resize(non_zero(capacity));
    }

    /// Drop all entries and reset the counters
    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.cache.len(),
            capacity: self.capacity(),
        }
    }
}

fn non_zero(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}

/// Evaluation scores keyed by board snapshot and side to move
pub type EvaluationCache = StatsLruCache<(Board, Color), f32>;
