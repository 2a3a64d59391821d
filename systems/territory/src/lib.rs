#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Territory connectivity system deciding which structures belong to the
//! network rooted at the core.
//!
//! Territory-providing structures link when their centers lie within twice
//! the territory radius. A breadth-first search from the root (the lowest
//! identifier core) marks every reachable provider valid. Structures that do
//! not provide territory are valid when they stand within the territory radius
//! of a valid provider.
//!
//! Recomputation is coalesced: structure changes only mark the system dirty,
//! and the search runs once the burst settles or the latency bound expires.

mod schedule;

use std::collections::{BTreeSet, VecDeque};

use bastion_core::{
    Circle, Command, Event, Rect, StructureId, StructureKind, StructureSnapshot, StructureView,
    TerritoryConfig,
};
use bastion_spatial::{Quadtree, QuadtreeConfig};
use glam::Vec2;

pub use schedule::RecalcSchedule;

/// Pure system that tracks territory connectivity and reports transitions.
#[derive(Debug)]
pub struct Territory {
    radius: f32,
    dirty: bool,
    schedule: RecalcSchedule,
    valid: BTreeSet<StructureId>,
    invalid: BTreeSet<StructureId>,
    providers: Quadtree<StructureId>,
    provider_positions: Vec<(StructureId, Vec2)>,
    recalculations: u64,
}

impl Territory {
    /// Creates a territory system for a world covering `bounds`.
    #[must_use]
    pub fn new(bounds: Rect, config: &TerritoryConfig) -> Self {
        Self {
            radius: config.radius,
            dirty: false,
            schedule: RecalcSchedule::new(config.settle_ticks, config.max_latency_ticks),
            valid: BTreeSet::new(),
            invalid: BTreeSet::new(),
            providers: Quadtree::new(bounds, QuadtreeConfig::default()),
            provider_positions: Vec::new(),
            recalculations: 0,
        }
    }

    /// Requests a recomputation. Repeated marks coalesce into one.
    pub fn mark_dirty(&mut self, tick: u64) {
        self.dirty = true;
        self.schedule.mark(tick);
    }

    /// Reports whether a recomputation is pending.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of searches run since creation.
    #[must_use]
    pub fn recalculations(&self) -> u64 {
        self.recalculations
    }

    /// Consumes world events and recomputes connectivity when the schedule fires.
    ///
    /// Connectivity changes are emitted as [`Command::SetConnectivity`].
    pub fn handle(
        &mut self,
        events: &[Event],
        tick: u64,
        structures: &StructureView,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::WorldConfigured { width, height } => {
                    self.providers = Quadtree::new(
                        Rect::from_size(*width, *height),
                        QuadtreeConfig::default(),
                    );
                    self.valid.clear();
                    self.invalid.clear();
                    self.provider_positions.clear();
                    self.mark_dirty(tick);
                }
                Event::StructurePlaced { .. }
                | Event::StructureRemoved { .. }
                | Event::StructureDestroyed { .. } => self.mark_dirty(tick),
                _ => {}
            }
        }

        if self.schedule.is_due(tick) {
            let _ = self.recalculate(structures, out);
        }
    }

    /// Recomputes the valid and invalid sets if the system is dirty.
    ///
    /// Emits a [`Command::SetConnectivity`] for every structure whose status
    /// differs from the one recorded in `structures`. Returns whether a
    /// search ran.
    pub fn recalculate(&mut self, structures: &StructureView, out: &mut Vec<Command>) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        self.schedule.clear();
        self.recalculations += 1;

        self.provider_positions.clear();
        self.provider_positions.extend(
            structures
                .iter()
                .filter(|structure| structure.kind.provides_territory())
                .map(|structure| (structure.id, structure.position)),
        );
        self.providers.rebuild(
            self.provider_positions
                .iter()
                .map(|(id, position)| (*id, Circle::new(*position, 0.0))),
        );

        let reached = self.search(structures);

        self.valid.clear();
        self.invalid.clear();
        for structure in structures.iter() {
            let connected = if structure.kind.provides_territory() {
                reached.contains(&structure.id)
            } else {
                self.covered_by(structure.position, &reached)
            };
            let _ = if connected {
                self.valid.insert(structure.id)
            } else {
                self.invalid.insert(structure.id)
            };
            if connected != structure.connected {
                log::info!(
                    "{:?} {:?} {}",
                    structure.kind,
                    structure.id,
                    if connected { "joined the network" } else { "lost the network" }
                );
                out.push(Command::SetConnectivity {
                    structure: structure.id,
                    connected,
                });
            }
        }

        log::debug!(
            "territory recomputed: {} valid, {} invalid",
            self.valid.len(),
            self.invalid.len()
        );
        true
    }

    fn search(&self, structures: &StructureView) -> BTreeSet<StructureId> {
        let mut reached = BTreeSet::new();
        let Some(root) = root_of(structures) else {
            return reached;
        };

        let link = 2.0 * self.radius;
        let mut frontier = VecDeque::from([root.id]);
        let _ = reached.insert(root.id);
        while let Some(current) = frontier.pop_front() {
            let Some(origin) = self.provider_position(current) else {
                continue;
            };
            for neighbour in self.providers.retrieve_in_range(origin, link) {
                if reached.contains(&neighbour) {
                    continue;
                }
                let Some(position) = self.provider_position(neighbour) else {
                    continue;
                };
                if origin.distance_squared(position) <= link * link {
                    let _ = reached.insert(neighbour);
                    frontier.push_back(neighbour);
                }
            }
        }
        reached
    }

    fn provider_position(&self, id: StructureId) -> Option<Vec2> {
        self.provider_positions
            .binary_search_by_key(&id, |(candidate, _)| *candidate)
            .ok()
            .map(|index| self.provider_positions[index].1)
    }

    fn covered_by(&self, position: Vec2, providers: &BTreeSet<StructureId>) -> bool {
        self.providers
            .retrieve_in_range(position, self.radius)
            .into_iter()
            .filter(|id| providers.contains(id))
            .filter_map(|id| self.provider_position(id))
            .any(|center| center.distance_squared(position) <= self.radius * self.radius)
    }

    /// Reports whether the structure was connected at the last recomputation.
    #[must_use]
    pub fn is_valid(&self, structure: StructureId) -> bool {
        self.valid.contains(&structure)
    }

    /// Structures connected at the last recomputation.
    #[must_use]
    pub fn valid(&self) -> &BTreeSet<StructureId> {
        &self.valid
    }

    /// Structures disconnected at the last recomputation.
    #[must_use]
    pub fn invalid(&self) -> &BTreeSet<StructureId> {
        &self.invalid
    }

    /// Reports whether `position` lies within the radius of a valid provider.
    #[must_use]
    pub fn is_position_in_valid_territory(&self, position: Vec2) -> bool {
        self.covered_by(position, &self.valid)
    }

    /// Reports whether `position` lies within the radius of any provider.
    #[must_use]
    pub fn is_position_in_any_territory(&self, position: Vec2) -> bool {
        self.providers
            .retrieve_in_range(position, self.radius)
            .into_iter()
            .filter_map(|id| self.provider_position(id))
            .any(|center| center.distance_squared(position) <= self.radius * self.radius)
    }
}

fn root_of(structures: &StructureView) -> Option<&StructureSnapshot> {
    structures
        .iter()
        .find(|structure| structure.kind == StructureKind::Core)
}
