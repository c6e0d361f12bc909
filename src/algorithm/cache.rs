use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Least-recently-used cache with a fixed entry budget
///
/// Each access stamps the entry with a monotonically increasing tick; when
/// an insert pushes the cache past its capacity, the entry with the oldest
/// tick is evicted. A capacity of zero disables caching entirely.
pub struct BoundedCache<K, V> {
    capacity: usize,
    entries: HashMap<K, (V, u64)>,
    recency: BTreeMap<u64, K>,
    tick: u64,

    /// Cache performance statistics
    pub stats: CacheStats,
}

/// Performance metrics for cache effectiveness
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: usize,
    /// Number of cache misses
    pub misses: usize,
    /// Number of entries dropped to stay within capacity
    pub evictions: usize,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity.min(1024)),
            recency: BTreeMap::new(),
            tick: 0,
            stats: CacheStats::default(),
        }
    }

    /// Maximum number of entries held
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retrieve a cached value or compute, store and return a new one
    ///
    /// Failed computations are not cached.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `compute_fn`
    pub fn get_or_try_insert_with<F, E>(&mut self, key: K, compute_fn: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.tick += 1;
        let tick = self.tick;

        if let Some((value, stamp)) = self.entries.get_mut(&key) {
            self.stats.hits += 1;
            self.recency.remove(stamp);
            *stamp = tick;
            self.recency.insert(tick, key);
            return Ok(value.clone());
        }

        self.stats.misses += 1;
        let value = compute_fn()?;
        if self.capacity == 0 {
            return Ok(value);
        }

        while self.entries.len() >= self.capacity {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
        }

        self.recency.insert(tick, key.clone());
        self.entries.insert(key, (value.clone(), tick));
        Ok(value)
    }
}
