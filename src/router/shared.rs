//! Thread-safe cache handle and batch search.
//!
//! # Feature Flag
//!
//! Batch searches fan out over rayon with the `parallel` feature:
//! ```toml
//! [dependencies]
//! redforge = { version = "0.1", features = ["parallel"] }
//! ```
//! Without it they run one after another. Either way the cache is only
//! touched from the calling thread, in request order, so hit/miss counts
//! and evictions do not depend on scheduling.

use parking_lot::Mutex;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::collections::HashSet;

use super::astar::{find_path, Occupancy, Search, StepCosts};
use super::cache::{CachedPath, PathCache};
use crate::config::EvictionPolicy;
use crate::stats::CacheStats;
use crate::types::Pos;

/// A [`PathCache`] behind a mutex.
#[derive(Debug)]
pub struct SharedPathCache {
    inner: Mutex<PathCache>,
}

impl SharedPathCache {
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            inner: Mutex::new(PathCache::new(capacity, policy)),
        }
    }

    pub fn get(&self, start: Pos, end: Pos) -> Option<CachedPath> {
        self.inner.lock().get(start, end)
    }

    pub fn insert(&self, start: Pos, end: Pos, path: CachedPath) {
        self.inner.lock().insert(start, end, path);
    }

    /// Presence check that leaves counters and recency untouched.
    pub fn contains(&self, start: Pos, end: Pos) -> bool {
        self.inner.lock().contains(start, end)
    }

    pub fn invalidate_through(&self, cells: &HashSet<Pos>) -> usize {
        self.inner.lock().invalidate_through(cells)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }
}

/// Runs independent searches against one occupancy snapshot, returning
/// outcomes in the order of `keys`.
#[cfg(feature = "parallel")]
pub(crate) fn search_all(
    occupancy: &Occupancy,
    keys: &[(Pos, Pos)],
    costs: StepCosts,
    budget: Option<usize>,
) -> Vec<Search> {
    keys.par_iter()
        .map(|&(start, end)| find_path(occupancy, start, end, costs, budget))
        .collect()
}

/// Runs independent searches against one occupancy snapshot, returning
/// outcomes in the order of `keys`.
#[cfg(not(feature = "parallel"))]
pub(crate) fn search_all(
    occupancy: &Occupancy,
    keys: &[(Pos, Pos)],
    costs: StepCosts,
    budget: Option<usize>,
) -> Vec<Search> {
    keys.iter()
        .map(|&(start, end)| find_path(occupancy, start, end, costs, budget))
        .collect()
}
