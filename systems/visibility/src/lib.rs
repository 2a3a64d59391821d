#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fog of war system answering whether points and circles are visible.
//!
//! Every structure reveals a static circle around itself. Beacons add a
//! rotating sector on top. Static answers come from a lazily classified
//! visibility grid, one per query radius, that is discarded whenever the
//! static sources change. At most [`MAX_CACHED_RADII`] grids are kept; a new
//! radius evicts the grid built longest ago. Sector answers are computed on every query from a
//! cached sector list that is refreshed when beacons come or go, or once the
//! beams drifted far enough from the cached angles.

mod grid;
mod sector;

use std::collections::{BTreeMap, VecDeque};

use bastion_core::{Circle, Event, Rect, StructureView, VisibilityConfig};
use glam::Vec2;

use grid::VisibilityGrid;
use sector::Beacon;

pub use grid::CellState;
pub use sector::Sector;

/// Number of distinct query radii whose visibility grids are kept at once.
pub const MAX_CACHED_RADII: usize = 8;

/// Counters describing how queries were answered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FogStats {
    /// Static checks settled by a cached cell.
    pub cache_hits: u64,
    /// Static checks that iterated the sources.
    pub exact_checks: u64,
    /// Times the cached sector list was rebuilt.
    pub sector_refreshes: u64,
    /// Times the static cache was discarded.
    pub invalidations: u64,
    /// Grids dropped to make room for a new query radius.
    pub grid_evictions: u64,
}

/// Pure system owning the visibility sources and their caches.
#[derive(Debug)]
pub struct Fog {
    bounds: Rect,
    cell_size: f32,
    drift_threshold: f32,
    fade_ticks: u32,
    statics: Vec<Circle>,
    beacons: Vec<Beacon>,
    sectors: Vec<Sector>,
    refreshed_beacons: usize,
    drift: f32,
    last_tick: u64,
    sources_dirty: bool,
    grids: BTreeMap<u32, VisibilityGrid>,
    grid_order: VecDeque<u32>,
    stats: FogStats,
}

impl Fog {
    /// Creates a fog with no sources over `bounds`.
    #[must_use]
    pub fn new(bounds: Rect, config: &VisibilityConfig) -> Self {
        Self {
            bounds,
            cell_size: config.cell_size,
            drift_threshold: config.sector_drift_threshold,
            fade_ticks: config.sector_fade_ticks,
            statics: Vec::new(),
            beacons: Vec::new(),
            sectors: Vec::new(),
            refreshed_beacons: 0,
            drift: 0.0,
            last_tick: 0,
            sources_dirty: false,
            grids: BTreeMap::new(),
            grid_order: VecDeque::new(),
            stats: FogStats::default(),
        }
    }

    /// Query counters accumulated since creation.
    #[must_use]
    pub fn stats(&self) -> FogStats {
        self.stats
    }

    /// Static sources currently in effect.
    #[must_use]
    pub fn static_sources(&self) -> &[Circle] {
        &self.statics
    }

    /// Sector list used by the latest queries.
    #[must_use]
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Number of visibility grids built since the last invalidation.
    #[must_use]
    pub fn cached_grids(&self) -> usize {
        self.grids.len()
    }

    /// Cached state for queries of `radius` at `point`, if a grid exists.
    #[must_use]
    pub fn cached_state(&self, point: Vec2, radius: f32) -> Option<CellState> {
        self.grids
            .get(&radius_key(radius))
            .and_then(|grid| grid.state_at(point))
    }

    /// Discards every cached static answer.
    pub fn invalidate(&mut self) {
        if !self.grids.is_empty() {
            log::debug!("visibility cache dropped ({} grids)", self.grids.len());
        }
        self.grids.clear();
        self.grid_order.clear();
        self.stats.invalidations += 1;
    }

    /// Replaces the static sources and discards the static cache.
    pub fn set_static_sources<I>(&mut self, sources: I)
    where
        I: IntoIterator<Item = Circle>,
    {
        self.statics.clear();
        self.statics.extend(
            sources
                .into_iter()
                .filter(|source| source.radius > 0.0 && source.center.is_finite()),
        );
        self.invalidate();
    }

    /// Requests a rebuild of the sources at the next [`Fog::handle`].
    ///
    /// Needed when structures changed in ways the world does not announce.
    pub fn mark_sources_dirty(&mut self) {
        self.sources_dirty = true;
    }

    /// Reacts to world events and advances the sectors to `tick`.
    pub fn handle(&mut self, events: &[Event], tick: u64, structures: &StructureView) {
        let mut sources_changed = std::mem::take(&mut self.sources_dirty);
        for event in events {
            match event {
                Event::WorldConfigured { width, height } => {
                    self.bounds = Rect::from_size(*width, *height);
                    sources_changed = true;
                }
                Event::StructurePlaced { .. }
                | Event::StructureRemoved { .. }
                | Event::StructureDestroyed { .. } => sources_changed = true,
                _ => {}
            }
        }

        if sources_changed {
            self.rebuild_sources(tick, structures);
        }
        self.advance_sectors(tick);
    }

    fn rebuild_sources(&mut self, tick: u64, structures: &StructureView) {
        self.set_static_sources(
            structures
                .iter()
                .map(|structure| Circle::new(structure.position, structure.kind.vision_radius())),
        );
        self.beacons = structures
            .iter()
            .filter_map(|structure| {
                structure.kind.sector().map(|spec| Beacon {
                    id: structure.id,
                    center: structure.position,
                    spec,
                    placed_at: tick.saturating_sub(structure.age_ticks),
                })
            })
            .collect();
    }

    fn advance_sectors(&mut self, tick: u64) {
        let elapsed = tick.saturating_sub(self.last_tick) as f32;
        self.last_tick = tick;
        let fastest = self
            .beacons
            .iter()
            .map(|beacon| beacon.spec.angular_speed.abs())
            .fold(0.0, f32::max);
        self.drift += fastest * elapsed;

        if self.beacons.len() != self.refreshed_beacons || self.drift > self.drift_threshold {
            self.sectors.clear();
            self.sectors.extend(
                self.beacons
                    .iter()
                    .map(|beacon| beacon.sector_at(tick, self.fade_ticks)),
            );
            self.refreshed_beacons = self.beacons.len();
            self.drift = 0.0;
            self.stats.sector_refreshes += 1;
            log::trace!(
                "sectors refreshed at tick {tick} for beacons {:?}",
                self.beacons.iter().map(|beacon| beacon.id).collect::<Vec<_>>()
            );
        }
    }

    /// Reports whether `point` lies inside any active source.
    pub fn is_position_visible(&mut self, point: Vec2) -> bool {
        self.is_circle_visible(point, 0.0)
    }

    /// Reports whether any part of the circle lies inside an active source.
    ///
    /// An infinite circle is visible as soon as any source is active.
    pub fn is_circle_visible(&mut self, center: Vec2, radius: f32) -> bool {
        if radius == f32::INFINITY {
            return !self.statics.is_empty()
                || self.sectors.iter().any(|sector| sector.weight > 0.0);
        }
        let radius = if radius.is_nan() { 0.0 } else { radius.max(0.0) };
        self.is_statically_visible(center, radius)
            || self
                .sectors
                .iter()
                .any(|sector| sector.touches_circle(center, radius))
    }

    fn is_statically_visible(&mut self, center: Vec2, radius: f32) -> bool {
        let (bounds, cell_size) = (self.bounds, self.cell_size);
        let key = radius_key(radius);
        if !self.grids.contains_key(&key) {
            if self.grids.len() >= MAX_CACHED_RADII {
                if let Some(oldest) = self.grid_order.pop_front() {
                    let _ = self.grids.remove(&oldest);
                    self.stats.grid_evictions += 1;
                }
            }
            self.grid_order.push_back(key);
        }
        let grid = self
            .grids
            .entry(key)
            .or_insert_with(|| VisibilityGrid::new(bounds, cell_size, radius));
        let (visible, cached) = grid.lookup(&self.statics, center);
        if cached {
            self.stats.cache_hits += 1;
        } else {
            self.stats.exact_checks += 1;
        }
        visible
    }
}

fn radius_key(radius: f32) -> u32 {
    radius.to_bits()
}
