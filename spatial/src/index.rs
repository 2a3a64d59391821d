//! Spatial query façade owning every index of the simulation.
//!
//! Static structures live in a [`Quadtree`] that is rebuilt wholesale when the
//! static set changes. Each [`MobileClass`] owns a [`HashGrid`] that is updated
//! incrementally for bodies reported as moved, with a periodic full resync
//! that re-bins every live body and repairs moves nobody reported.
//!
//! Indices may be absent ([`SpatialIndex::degraded`]). Queries then scan the
//! caller-supplied bodies exactly, which is slower but never wrong.

use std::collections::BTreeSet;

use bastion_core::{Circle, MobileClass, MobileId, Rect, SpatialBody, SpatialConfig, StructureId};
use glam::Vec2;

use crate::{HashGrid, Quadtree, QuadtreeConfig};

/// Counters describing the work done by the façade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpatialStats {
    /// Quadtree rebuilds triggered by static set changes.
    pub static_rebuilds: u64,
    /// Periodic resyncs that re-binned every mobile body.
    pub full_resyncs: u64,
    /// Grid updates applied for bodies reported as moved.
    pub incremental_updates: u64,
}

/// Owner of the static quadtree and the per-class mobile grids.
#[derive(Debug)]
pub struct SpatialIndex {
    bounds: Rect,
    resync_interval: u64,
    statics: Option<Quadtree<StructureId>>,
    statics_dirty: bool,
    grids: [Option<HashGrid<MobileId>>; 2],
    moved: [BTreeSet<MobileId>; 2],
    stats: SpatialStats,
}

impl SpatialIndex {
    /// Creates a façade with every index present.
    #[must_use]
    pub fn new(bounds: Rect, config: &SpatialConfig) -> Self {
        let quadtree = Quadtree::new(
            bounds,
            QuadtreeConfig {
                capacity: config.quadtree_capacity,
                max_depth: config.quadtree_max_depth,
            },
        );
        let grid = || {
            Some(HashGrid::new(
                bounds.width(),
                config.grid_cell_size,
                config.grid_margin_cells,
            ))
        };
        Self {
            bounds,
            resync_interval: config.resync_interval_ticks,
            statics: Some(quadtree),
            statics_dirty: true,
            grids: [grid(), grid()],
            moved: Default::default(),
            stats: SpatialStats::default(),
        }
    }

    /// Creates a façade without indices; every query scans its fallback.
    #[must_use]
    pub fn degraded(bounds: Rect, config: &SpatialConfig) -> Self {
        Self {
            bounds,
            resync_interval: config.resync_interval_ticks,
            statics: None,
            statics_dirty: false,
            grids: [None, None],
            moved: Default::default(),
            stats: SpatialStats::default(),
        }
    }

    /// Creates an indexed or degraded façade as `config.indexed` requests.
    #[must_use]
    pub fn from_config(bounds: Rect, config: &SpatialConfig) -> Self {
        if config.indexed {
            Self::new(bounds, config)
        } else {
            log::info!("spatial indices disabled, range queries scan linearly");
            Self::degraded(bounds, config)
        }
    }

    /// World rectangle the static index covers.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Reports whether any index is missing.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.statics.is_none() || self.grids.iter().any(Option::is_none)
    }

    /// Work counters accumulated since creation.
    #[must_use]
    pub fn stats(&self) -> SpatialStats {
        self.stats
    }

    /// Reports whether the quadtree awaits a rebuild.
    #[must_use]
    pub fn statics_dirty(&self) -> bool {
        self.statics_dirty
    }

    /// Number of bodies of `class` reported as moved but not yet re-binned.
    #[must_use]
    pub fn pending_moves(&self, class: MobileClass) -> usize {
        self.moved[class.index()].len()
    }

    /// Records that a structure entered the world.
    pub fn notify_static_added(&mut self, id: StructureId) {
        log::trace!("static {id:?} added");
        self.statics_dirty = self.statics.is_some();
    }

    /// Records that a structure left the world.
    pub fn notify_static_removed(&mut self, id: StructureId) {
        log::trace!("static {id:?} removed");
        self.statics_dirty = self.statics.is_some();
    }

    /// Bins a freshly spawned body immediately.
    pub fn notify_mobile_spawned(&mut self, class: MobileClass, id: MobileId, circle: Circle) {
        if let Some(grid) = self.grids[class.index()].as_mut() {
            grid.insert(id, circle.center, circle.radius);
        }
    }

    /// Queues a body for re-binning at the next flush.
    pub fn notify_mobile_moved(&mut self, class: MobileClass, id: MobileId) {
        if self.grids[class.index()].is_some() {
            let _ = self.moved[class.index()].insert(id);
        }
    }

    /// Drops a body from its grid and from the moved queue.
    pub fn notify_mobile_removed(&mut self, class: MobileClass, id: MobileId) {
        let _ = self.moved[class.index()].remove(&id);
        if let Some(grid) = self.grids[class.index()].as_mut() {
            let _ = grid.remove(id);
        }
    }

    /// Brings every index up to date at the start of `tick`.
    ///
    /// Rebuilds the quadtree when the static set changed and re-bins moved
    /// bodies. Every `resync_interval_ticks` ticks, all mobile bodies are
    /// re-binned regardless of what was reported.
    pub fn sync<'a, S, I, M, P>(&mut self, tick: u64, statics: I, monsters: &[M], projectiles: &[P])
    where
        S: SpatialBody<Id = StructureId> + 'a,
        I: IntoIterator<Item = &'a S>,
        M: SpatialBody<Id = MobileId>,
        P: SpatialBody<Id = MobileId>,
    {
        self.rebuild_statics_if_dirty(statics);

        if self.resync_interval > 0 && tick > 0 && tick % self.resync_interval == 0 {
            self.update_all(MobileClass::Monster, monsters);
            self.update_all(MobileClass::Projectile, projectiles);
            self.stats.full_resyncs += 1;
            log::debug!("full spatial resync at tick {tick}: {:?}", self.stats);
        } else {
            self.flush_moved(MobileClass::Monster, monsters);
            self.flush_moved(MobileClass::Projectile, projectiles);
        }
    }

    /// Rebuilds the quadtree from `bodies` if the static set changed.
    pub fn rebuild_statics_if_dirty<'a, S, I>(&mut self, bodies: I)
    where
        S: SpatialBody<Id = StructureId> + 'a,
        I: IntoIterator<Item = &'a S>,
    {
        if !self.statics_dirty {
            return;
        }
        let Some(tree) = self.statics.as_mut() else {
            self.statics_dirty = false;
            return;
        };
        tree.rebuild(
            bodies
                .into_iter()
                .filter(|body| body.is_alive())
                .map(|body| (body.id(), body.circle())),
        );
        self.statics_dirty = false;
        self.stats.static_rebuilds += 1;
        log::debug!(
            "static quadtree rebuilt with {} structures across {} nodes",
            tree.len(),
            tree.node_count()
        );
    }

    /// Re-bins the queued bodies of `class`.
    ///
    /// `bodies` must be sorted by identifier. Queued bodies that are gone or
    /// dead leave the grid.
    pub fn flush_moved<B>(&mut self, class: MobileClass, bodies: &[B])
    where
        B: SpatialBody<Id = MobileId>,
    {
        let slot = class.index();
        if self.moved[slot].is_empty() {
            return;
        }
        let moved = std::mem::take(&mut self.moved[slot]);
        if let Some(grid) = self.grids[slot].as_mut() {
            for id in &moved {
                match find(bodies, *id) {
                    Some(body) if body.is_alive() => {
                        let circle = body.circle();
                        grid.update(*id, circle.center, circle.radius);
                        self.stats.incremental_updates += 1;
                    }
                    _ => {
                        let _ = grid.remove(*id);
                    }
                }
            }
        }
    }

    /// Re-bins every live body of `class` and evicts bodies not in `bodies`.
    pub fn update_all<B>(&mut self, class: MobileClass, bodies: &[B])
    where
        B: SpatialBody<Id = MobileId>,
    {
        let slot = class.index();
        self.moved[slot].clear();
        let Some(grid) = self.grids[slot].as_mut() else {
            return;
        };
        for body in bodies.iter().filter(|body| body.is_alive()) {
            let circle = body.circle();
            grid.update(body.id(), circle.center, circle.radius);
        }
        grid.retain(|id| find(bodies, id).is_some_and(SpatialBody::is_alive));
    }

    /// Structures whose bounds may overlap the circle at `center`.
    ///
    /// Broad phase when the quadtree exists; otherwise an exact scan over
    /// `fallback`. Sorted by identifier either way.
    pub fn statics_in_range<'a, S, I>(&self, center: Vec2, radius: f32, fallback: I) -> Vec<StructureId>
    where
        S: SpatialBody<Id = StructureId> + 'a,
        I: IntoIterator<Item = &'a S>,
    {
        match &self.statics {
            Some(tree) => tree.retrieve_in_range(center, radius),
            None => scan(center, radius, fallback),
        }
    }

    /// Bodies of `class` whose cells may overlap the circle at `center`.
    ///
    /// Broad phase when the grid exists; otherwise an exact scan over
    /// `fallback`. Sorted by identifier either way.
    pub fn mobiles_in_range<B>(
        &self,
        class: MobileClass,
        center: Vec2,
        radius: f32,
        fallback: &[B],
    ) -> Vec<MobileId>
    where
        B: SpatialBody<Id = MobileId>,
    {
        match &self.grids[class.index()] {
            Some(grid) => grid.query_range(center, radius),
            None => scan(center, radius, fallback),
        }
    }
}

fn find<B>(bodies: &[B], id: MobileId) -> Option<&B>
where
    B: SpatialBody<Id = MobileId>,
{
    bodies
        .binary_search_by_key(&id, SpatialBody::id)
        .ok()
        .map(|index| &bodies[index])
}

fn scan<'a, B, I>(center: Vec2, radius: f32, bodies: I) -> Vec<B::Id>
where
    B: SpatialBody + 'a,
    I: IntoIterator<Item = &'a B>,
{
    let query = Circle::new(center, radius);
    let mut out: Vec<B::Id> = bodies
        .into_iter()
        .filter(|body| body.is_alive() && body.circle().overlaps_circle(&query))
        .map(SpatialBody::id)
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}
