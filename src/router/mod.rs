//! Spatial router: obstacle-aware wire paths between grid coordinates.
//!
//! The router binds an occupancy snapshot of the grid, searches it with A*
//! (6-connected, Manhattan heuristic, vertical steps penalized) and memoizes
//! results per `(start, end)` in a bounded [`PathCache`].
//!
//! # Example
//!
//! ```
//! use redforge::grid::VoxelGrid;
//! use redforge::graph::DelayBounds;
//! use redforge::router::SpatialRouter;
//! use redforge::types::Pos;
//!
//! let mut router = SpatialRouter::default();
//! router.load(&VoxelGrid::new(16, 16, 16));
//!
//! let route = router.route(Pos::new(0, 0, 0), Pos::new(4, 0, 0), 15, DelayBounds::unbounded());
//! assert!(route.success);
//! assert_eq!(route.length(), 4);
//! ```

pub mod astar;
pub mod cache;
pub mod shared;

use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};

pub use astar::{find_path, Occupancy, Search, StepCosts};
pub use cache::{CachedPath, PathCache};
pub use shared::SharedPathCache;

use crate::config::RoutingParams;
use crate::diagnostics::{GridError, RoutingFailure};
use crate::graph::DelayBounds;
use crate::grid::VoxelGrid;
use crate::materials;
use crate::stats::CacheStats;
use crate::types::Pos;

/// How far above a piston a solid block can power it through quasi-connectivity.
pub const QC_RANGE: i32 = 2;

/// One routing job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteRequest {
    pub start: Pos,
    pub end: Pos,
    pub signal_strength: u8,
    pub bounds: DelayBounds,
}

impl RouteRequest {
    pub fn new(start: Pos, end: Pos) -> Self {
        Self {
            start,
            end,
            signal_strength: 15,
            bounds: DelayBounds::unbounded(),
        }
    }
}

/// Outcome of a route call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteResult {
    pub success: bool,
    /// Start to end inclusive; empty on failure
    pub path: Vec<Pos>,
    pub failure: Option<RoutingFailure>,
    /// Served from the cache
    pub cached: bool,
}

impl RouteResult {
    fn from_cached(path: CachedPath, cached: bool) -> Self {
        match path {
            Ok(path) => Self {
                success: true,
                path,
                failure: None,
                cached,
            },
            Err(failure) => Self {
                success: false,
                path: Vec::new(),
                failure: Some(failure),
                cached,
            },
        }
    }

    /// Number of unit steps along the path.
    pub fn length(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn into_result(self) -> Result<Vec<Pos>, RoutingFailure> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.path),
        }
    }
}

/// A* router with a path cache.
#[derive(Debug)]
pub struct SpatialRouter {
    costs: StepCosts,
    budget: Option<usize>,
    cache_failures: bool,
    occupancy: Occupancy,
    cache: SharedPathCache,
}

impl Default for SpatialRouter {
    fn default() -> Self {
        Self::new(&RoutingParams::default())
    }
}

impl SpatialRouter {
    pub fn new(params: &RoutingParams) -> Self {
        Self {
            costs: StepCosts {
                horizontal: params.horizontal_cost,
                vertical: params.vertical_cost,
            },
            budget: params.max_expansions,
            cache_failures: params.cache_failures,
            occupancy: Occupancy::default(),
            cache: SharedPathCache::new(params.cache_capacity, params.eviction),
        }
    }

    /// Binds a snapshot of `grid` as the traversability oracle.
    pub fn load(&mut self, grid: &VoxelGrid) {
        self.bind(Occupancy::from_grid(grid));
    }

    /// Binds a serialized occupancy buffer (see [`VoxelGrid::occupancy`]).
    pub fn load_buffer(
        &mut self,
        buffer: Vec<u8>,
        width: u32,
        height: u32,
        depth: u32,
    ) -> Result<(), GridError> {
        self.bind(Occupancy::from_buffer(buffer, width, height, depth)?);
        Ok(())
    }

    fn bind(&mut self, occupancy: Occupancy) {
        if occupancy != self.occupancy {
            if !self.cache.is_empty() {
                tracing::debug!(dropped = self.cache.len(), "grid changed, clearing path cache");
            }
            self.cache.clear();
            self.occupancy = occupancy;
        }
    }

    pub fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    /// Routes a wire from `start` to `end`, consulting the cache first.
    pub fn route(
        &self,
        start: Pos,
        end: Pos,
        signal_strength: u8,
        bounds: DelayBounds,
    ) -> RouteResult {
        self.route_request(&RouteRequest {
            start,
            end,
            signal_strength,
            bounds,
        })
    }

    pub fn route_request(&self, request: &RouteRequest) -> RouteResult {
        let RouteRequest { start, end, .. } = *request;
        if let Some(cached) = self.cache.get(start, end) {
            tracing::trace!(%start, %end, "path cache hit");
            return RouteResult::from_cached(cached, true);
        }
        tracing::trace!(%start, %end, "path cache miss");

        let search = find_path(&self.occupancy, start, end, self.costs, self.budget);
        self.finish(request, search)
    }

    /// Routes independent requests, returning results in request order.
    ///
    /// Keys missing from the cache when the batch starts are searched up
    /// front (concurrently with the `parallel` feature). Requests are then
    /// resolved against the cache one by one in request order, so results,
    /// counters and evictions match routing the requests sequentially.
    pub fn route_batch(&self, requests: &[RouteRequest]) -> Vec<RouteResult> {
        let mut keys: IndexSet<(Pos, Pos)> = IndexSet::new();
        for request in requests {
            if !self.cache.contains(request.start, request.end) {
                keys.insert((request.start, request.end));
            }
        }

        let keys: Vec<(Pos, Pos)> = keys.into_iter().collect();
        let searches: HashMap<(Pos, Pos), Search> = keys
            .iter()
            .copied()
            .zip(shared::search_all(&self.occupancy, &keys, self.costs, self.budget))
            .collect();

        let results = requests
            .iter()
            .map(|request| {
                let RouteRequest { start, end, .. } = *request;
                if let Some(cached) = self.cache.get(start, end) {
                    return RouteResult::from_cached(cached, true);
                }
                // Evicted since the batch started: search it now.
                let search = match searches.get(&(start, end)) {
                    Some(search) => search.clone(),
                    None => find_path(&self.occupancy, start, end, self.costs, self.budget),
                };
                self.finish(request, search)
            })
            .collect();

        tracing::debug!(requests = requests.len(), searched = keys.len(), "batch routed");
        results
    }

    fn finish(&self, request: &RouteRequest, search: Search) -> RouteResult {
        let RouteRequest {
            start,
            end,
            signal_strength,
            bounds,
        } = *request;
        match &search.result {
            Ok(path) => tracing::debug!(
                %start,
                %end,
                length = path.len().saturating_sub(1),
                expansions = search.expansions,
                signal_strength,
                min_delay = bounds.min(),
                max_delay = bounds.max(),
                "route found"
            ),
            Err(failure) => tracing::debug!(expansions = search.expansions, "{failure}"),
        }
        if search.result.is_ok() || self.cache_failures {
            self.cache.insert(start, end, search.result.clone());
        }
        RouteResult::from_cached(search.result, false)
    }

    /// Whether placing `material` at `pos` keeps quasi-connectivity safe.
    ///
    /// A piston or sticky piston is rejected when any solid voxel sits
    /// within [`QC_RANGE`] blocks directly above it; everything else passes.
    pub fn validate_placement(&self, pos: Pos, material: &str) -> bool {
        if !materials::is_piston(&materials::normalize(material)) {
            return true;
        }
        (1..=QC_RANGE).all(|dy| {
            let above = pos + Pos::new(0, dy, 0);
            let (w, h, d) = self.occupancy.dimensions();
            // Out-of-bounds cells are air, not obstacles.
            !crate::grid::in_bounds(above, w, h, d) || self.occupancy.is_walkable(above)
        })
    }

    /// Marks the interior of a routed path solid so later routes avoid it,
    /// dropping cached paths that run through those cells.
    ///
    /// Returns the number of newly occupied voxels.
    pub fn commit(&mut self, path: &[Pos]) -> usize {
        if path.len() <= 2 {
            return 0;
        }
        let interior = &path[1..path.len() - 1];
        let marked = interior
            .iter()
            .filter(|&&pos| self.occupancy.mark_solid(pos))
            .count();
        let cells: HashSet<Pos> = interior.iter().copied().collect();
        let dropped = self.cache.invalidate_through(&cells);
        tracing::trace!(marked, dropped, "committed route");
        marked
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvictionPolicy;
    use crate::grid::Block;

    fn router_for(grid: &VoxelGrid) -> SpatialRouter {
        let mut router = SpatialRouter::default();
        router.load(grid);
        router
    }

    #[test]
    fn test_route_then_hit() {
        let router = router_for(&VoxelGrid::new(8, 8, 8));
        let a = Pos::new(0, 0, 0);
        let b = Pos::new(0, 0, 6);

        let first = router.route(a, b, 15, DelayBounds::unbounded());
        let second = router.route(a, b, 15, DelayBounds::unbounded());
        assert!(first.success && !first.cached);
        assert!(second.cached);
        assert_eq!(first.path, second.path);
        assert_eq!(first.length(), 6);

        let stats = router.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
    }

    #[test]
    fn test_failure_cached_by_default() {
        let mut grid = VoxelGrid::new(3, 1, 1);
        grid.set_block(Pos::new(1, 0, 0), Block::new("stone")).unwrap();
        let router = router_for(&grid);

        let miss = router.route(Pos::new(0, 0, 0), Pos::new(2, 0, 0), 15, DelayBounds::unbounded());
        assert!(!miss.success);
        assert!(miss.path.is_empty());
        let again = router.route(Pos::new(0, 0, 0), Pos::new(2, 0, 0), 15, DelayBounds::unbounded());
        assert!(again.cached);
        assert_eq!(again.failure, miss.failure);
    }

    #[test]
    fn test_failure_not_cached_when_disabled() {
        let mut grid = VoxelGrid::new(3, 1, 1);
        grid.set_block(Pos::new(1, 0, 0), Block::new("stone")).unwrap();
        let params = RoutingParams {
            cache_failures: false,
            ..RoutingParams::default()
        };
        let mut router = SpatialRouter::new(&params);
        router.load(&grid);

        router.route(Pos::new(0, 0, 0), Pos::new(2, 0, 0), 15, DelayBounds::unbounded());
        assert_eq!(router.stats().size, 0);
    }

    #[test]
    fn test_reload_same_grid_keeps_cache() {
        let grid = VoxelGrid::new(8, 8, 8);
        let mut router = router_for(&grid);
        router.route(Pos::new(0, 0, 0), Pos::new(3, 0, 0), 15, DelayBounds::unbounded());

        router.load(&grid);
        assert_eq!(router.stats().size, 1);

        let mut changed = grid.clone();
        changed.set_block(Pos::new(7, 7, 7), Block::new("stone")).unwrap();
        router.load(&changed);
        assert_eq!(router.stats().size, 0);
    }

    #[test]
    fn test_load_buffer() {
        let mut grid = VoxelGrid::new(4, 2, 2);
        grid.set_block(Pos::new(1, 0, 0), Block::new("stone")).unwrap();
        let mut router = SpatialRouter::default();
        router.load_buffer(grid.occupancy(), 4, 2, 2).unwrap();
        assert!(!router.occupancy().is_walkable(Pos::new(1, 0, 0)));

        assert!(router.load_buffer(vec![0; 3], 4, 2, 2).is_err());
    }

    #[test]
    fn test_commit_blocks_later_routes() {
        // Endpoints are component blocks, so the wire is the only gap to close.
        let mut grid = VoxelGrid::new(8, 1, 3);
        grid.set_block(Pos::new(0, 0, 1), Block::new("lever")).unwrap();
        grid.set_block(Pos::new(7, 0, 1), Block::new("redstone_lamp")).unwrap();
        let mut router = router_for(&grid);
        let a = router.route(Pos::new(0, 0, 1), Pos::new(7, 0, 1), 15, DelayBounds::unbounded());
        assert_eq!(a.length(), 7);
        assert_eq!(router.commit(&a.path), 6);

        // Crossing the committed wire is now impossible in a single layer.
        let b = router.route(Pos::new(3, 0, 0), Pos::new(3, 0, 2), 15, DelayBounds::unbounded());
        assert!(!b.success);
    }

    #[test]
    fn test_commit_invalidates_crossing_paths() {
        let mut router = router_for(&VoxelGrid::new(8, 2, 3));
        let crossing = router.route(Pos::new(3, 0, 0), Pos::new(3, 0, 2), 15, DelayBounds::unbounded());
        assert!(crossing.success);
        assert_eq!(router.stats().size, 1);

        let wire = router.route(Pos::new(0, 0, 1), Pos::new(7, 0, 1), 15, DelayBounds::unbounded());
        router.commit(&wire.path);
        // Both the crossing path and the committed wire itself run through the new cells.
        assert_eq!(router.stats().size, 0);

        let rerouted = router.route(Pos::new(3, 0, 0), Pos::new(3, 0, 2), 15, DelayBounds::unbounded());
        assert!(!rerouted.cached);
        assert!(rerouted.path.iter().any(|p| p.y == 1));
    }

    #[test]
    fn test_validate_placement_qc() {
        let mut grid = VoxelGrid::new(4, 6, 4);
        grid.set_block(Pos::new(1, 3, 1), Block::new("stone")).unwrap();
        let router = router_for(&grid);

        assert!(!router.validate_placement(Pos::new(1, 1, 1), "piston"));
        assert!(!router.validate_placement(Pos::new(1, 2, 1), "minecraft:sticky_piston"));
        assert!(router.validate_placement(Pos::new(1, 0, 1), "piston"));
        assert!(router.validate_placement(Pos::new(1, 1, 1), "stone"));
        assert!(router.validate_placement(Pos::new(2, 1, 1), "piston"));
        assert!(router.validate_placement(Pos::new(1, 5, 1), "piston"));
    }

    #[test]
    fn test_batch_matches_sequential() {
        let mut grid = VoxelGrid::new(10, 4, 10);
        grid.set_block(Pos::new(4, 0, 4), Block::new("stone")).unwrap();
        let requests = vec![
            RouteRequest::new(Pos::new(0, 0, 0), Pos::new(9, 0, 9)),
            RouteRequest::new(Pos::new(2, 0, 4), Pos::new(6, 0, 4)),
            RouteRequest::new(Pos::new(0, 0, 0), Pos::new(9, 0, 9)),
        ];

        let batch_router = router_for(&grid);
        let batch = batch_router.route_batch(&requests);

        let seq_router = router_for(&grid);
        let sequential: Vec<_> = requests.iter().map(|r| seq_router.route_request(r)).collect();

        assert_eq!(batch, sequential);
        assert_eq!(batch_router.stats(), seq_router.stats());
    }

    #[test]
    fn test_batch_matches_sequential_under_eviction() {
        let grid = VoxelGrid::new(8, 1, 1);
        let a = RouteRequest::new(Pos::new(0, 0, 0), Pos::new(3, 0, 0));
        let b = RouteRequest::new(Pos::new(0, 0, 0), Pos::new(5, 0, 0));
        let requests = vec![a, b, a];

        for cache_failures in [true, false] {
            let params = RoutingParams {
                cache_capacity: 1,
                eviction: EvictionPolicy::Fifo,
                cache_failures,
                ..RoutingParams::default()
            };
            let mut batch_router = SpatialRouter::new(&params);
            batch_router.load(&grid);
            let mut seq_router = SpatialRouter::new(&params);
            seq_router.load(&grid);

            let batch = batch_router.route_batch(&requests);
            let sequential: Vec<_> = requests.iter().map(|r| seq_router.route_request(r)).collect();

            assert_eq!(batch, sequential);
            let stats = batch_router.stats();
            assert_eq!((stats.hits, stats.misses, stats.evictions), (0, 3, 2));
            assert_eq!(stats, seq_router.stats());
        }
    }

    #[test]
    fn test_failed_duplicates_not_cached_match_sequential() {
        let mut grid = VoxelGrid::new(6, 1, 1);
        grid.set_block(Pos::new(2, 0, 0), Block::new("obsidian")).unwrap();
        let blocked = RouteRequest::new(Pos::new(0, 0, 0), Pos::new(4, 0, 0));
        let requests = vec![blocked, blocked];
        let params = RoutingParams {
            cache_failures: false,
            ..RoutingParams::default()
        };

        let mut batch_router = SpatialRouter::new(&params);
        batch_router.load(&grid);
        let mut seq_router = SpatialRouter::new(&params);
        seq_router.load(&grid);

        let batch = batch_router.route_batch(&requests);
        let sequential: Vec<_> = requests.iter().map(|r| seq_router.route_request(r)).collect();
        assert_eq!(batch, sequential);
        assert!(batch.iter().all(|r| !r.success && !r.cached));
        assert_eq!(batch_router.stats(), seq_router.stats());
        assert_eq!(batch_router.stats().misses, 2);
    }

    #[test]
    fn test_fifo_router_eviction() {
        let params = RoutingParams {
            cache_capacity: 1,
            eviction: EvictionPolicy::Fifo,
            ..RoutingParams::default()
        };
        let mut router = SpatialRouter::new(&params);
        router.load(&VoxelGrid::new(8, 1, 1));
        router.route(Pos::new(0, 0, 0), Pos::new(3, 0, 0), 15, DelayBounds::unbounded());
        router.route(Pos::new(0, 0, 0), Pos::new(4, 0, 0), 15, DelayBounds::unbounded());
        let stats = router.stats();
        assert_eq!((stats.size, stats.evictions), (1, 1));
    }
}
