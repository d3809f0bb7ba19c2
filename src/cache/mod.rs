//! Kernel row cache
//!
//! The SMO solver touches whole rows of the kernel matrix: every update of
//! a pair (i, j) refreshes all prediction errors with K(i, ·) and K(j, ·).
//! Rows are therefore cached as units and evicted least-recently-used.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Bookkeeping bytes charged per cached row on top of its values
const ROW_OVERHEAD: usize = 64;

/// A step needs rows i and j at the same time
const MIN_ROWS: usize = 2;

/// LRU cache of kernel matrix rows, keyed by sample index
pub struct KernelCache {
    rows: LruCache<usize, Arc<[f64]>>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Create a cache holding at most `max_rows` rows (never fewer than two)
    pub fn new(max_rows: usize) -> Self {
        let capacity = NonZeroUsize::new(max_rows.max(MIN_ROWS)).unwrap_or(NonZeroUsize::MIN);
        Self {
            rows: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a cache for rows of `row_len` values within `memory_bytes`
    pub fn with_memory_limit(memory_bytes: usize, row_len: usize) -> Self {
        let row_bytes = row_len * std::mem::size_of::<f64>() + ROW_OVERHEAD;
        Self::new(memory_bytes / row_bytes)
    }

    /// Row `i` of the kernel matrix, filled with `kernel(t)` for `t < len` on a miss
    pub fn row<F>(&mut self, i: usize, len: usize, kernel: F) -> Arc<[f64]>
    where
        F: FnMut(usize) -> f64,
    {
        if let Some(row) = self.rows.get(&i) {
            if row.len() == len {
                self.hits += 1;
                return Arc::clone(row);
            }
        }
        self.misses += 1;
        let row: Arc<[f64]> = (0..len).map(kernel).collect();
        self.rows.put(i, Arc::clone(&row));
        row
    }

    /// Whether row `i` is resident, without touching its recency
    pub fn contains(&self, i: usize) -> bool {
        self.rows.contains(&i)
    }

    /// Fraction of row lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.rows.cap().get(),
            size: self.rows.len(),
        }
    }
}

/// Cache statistics, counted in rows
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}
