//! Bounded cache of search results keyed by `(start, end)`.

use indexmap::IndexMap;
use std::collections::HashSet;

use crate::config::EvictionPolicy;
use crate::diagnostics::RoutingFailure;
use crate::stats::CacheStats;
use crate::types::Pos;

/// A cached search outcome. Failures are cached too when the router is
/// configured to do so.
pub type CachedPath = Result<Vec<Pos>, RoutingFailure>;

/// Bounded path cache.
///
/// Entries are kept in eviction order: the front of the map is dropped
/// first. Under [`EvictionPolicy::Lru`] a hit moves its entry to the back;
/// under [`EvictionPolicy::Fifo`] only insertion order counts.
#[derive(Clone, Debug)]
pub struct PathCache {
    capacity: usize,
    policy: EvictionPolicy,
    entries: IndexMap<(Pos, Pos), CachedPath>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl PathCache {
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            capacity,
            policy,
            entries: IndexMap::with_capacity(capacity.min(1024)),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Looks up a path, counting the hit or miss.
    pub fn get(&mut self, start: Pos, end: Pos) -> Option<CachedPath> {
        let key = (start, end);
        let Some(index) = self.entries.get_index_of(&key) else {
            self.misses += 1;
            return None;
        };
        self.hits += 1;
        if self.policy == EvictionPolicy::Lru {
            let last = self.entries.len() - 1;
            self.entries.move_index(index, last);
            return self.entries.get(&key).cloned();
        }
        self.entries.get_index(index).map(|(_, cached)| cached.clone())
    }

    /// Stores a result, evicting from the front if full.
    ///
    /// Replacing an existing key keeps its position.
    pub fn insert(&mut self, start: Pos, end: Pos, path: CachedPath) {
        if self.capacity == 0 {
            return;
        }
        let key = (start, end);
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = path;
            return;
        }
        while self.entries.len() >= self.capacity {
            if self.entries.shift_remove_index(0).is_none() {
                break;
            }
            self.evictions += 1;
        }
        self.entries.insert(key, path);
    }

    /// Drops every cached path whose interior passes through one of `cells`.
    /// Returns the number of entries removed.
    pub fn invalidate_through(&mut self, cells: &HashSet<Pos>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, cached| match cached {
            Ok(path) if path.len() > 2 => !path[1..path.len() - 1].iter().any(|p| cells.contains(p)),
            _ => true,
        });
        before - self.entries.len()
    }

    /// Empties the cache. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, start: Pos, end: Pos) -> bool {
        self.entries.contains_key(&(start, end))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.hits,
            self.misses,
            self.entries.len(),
            self.capacity,
            self.evictions,
        )
    }
}
