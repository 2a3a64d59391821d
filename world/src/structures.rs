//! Authoritative structure state management utilities.

use std::collections::BTreeMap;

use bastion_core::{
    Circle, Health, PlacementError, Rect, SpatialBody, StructureId, StructureKind,
    StructureSnapshot,
};
use glam::Vec2;

/// State of a structure stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Structure {
    pub(crate) id: StructureId,
    pub(crate) kind: StructureKind,
    pub(crate) position: Vec2,
    pub(crate) health: Health,
    pub(crate) placed_at: u64,
    /// Last connectivity status reported by the territory engine.
    pub(crate) connected: bool,
    /// Set while the disconnection penalty is in force.
    pub(crate) penalty_applied: bool,
    /// Ticks until the mounted weapon may fire again.
    pub(crate) fire_cooldown: u32,
    pub(crate) destroyed: bool,
    pub(crate) removed: bool,
}

impl Structure {
    fn new(id: StructureId, kind: StructureKind, position: Vec2, tick: u64) -> Self {
        Self {
            id,
            kind,
            position,
            health: kind.max_health(),
            placed_at: tick,
            connected: true,
            penalty_applied: false,
            fire_cooldown: 0,
            destroyed: false,
            removed: false,
        }
    }

    /// Reports whether the structure awaits the next cleanup.
    pub(crate) fn is_flagged(&self) -> bool {
        self.destroyed || self.removed
    }

    /// Ticks between shots, including the disconnection penalty.
    pub(crate) fn fire_interval(&self, penalty_factor: u32) -> Option<u32> {
        self.kind.weapon().map(|weapon| {
            if self.penalty_applied {
                weapon.fire_interval_ticks.saturating_mul(penalty_factor)
            } else {
                weapon.fire_interval_ticks
            }
        })
    }

    pub(crate) fn snapshot(&self, tick: u64) -> StructureSnapshot {
        StructureSnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            health: self.health,
            connected: self.connected,
            age_ticks: tick.saturating_sub(self.placed_at),
        }
    }
}

impl SpatialBody for Structure {
    type Id = StructureId;

    fn id(&self) -> StructureId {
        self.id
    }

    fn circle(&self) -> Circle {
        Circle::new(self.position, self.kind.radius())
    }

    fn is_alive(&self) -> bool {
        !self.is_flagged() && !self.health.is_depleted()
    }
}

/// Registry that stores structures and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct StructureRegistry {
    entries: BTreeMap<StructureId, Structure>,
    next_id: StructureId,
}

impl StructureRegistry {
    /// Creates an empty registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: StructureId::new(0),
        }
    }

    /// Checks whether a structure of `kind` fits at `position`.
    pub(crate) fn can_place(
        &self,
        bounds: &Rect,
        kind: StructureKind,
        position: Vec2,
    ) -> Result<(), PlacementError> {
        let footprint = Circle::new(position, kind.radius());
        let reach = footprint.bounds();
        if !position.is_finite()
            || !bounds.contains_point(reach.min())
            || !bounds.contains_point(reach.max())
        {
            return Err(PlacementError::OutOfBounds);
        }
        if kind == StructureKind::Core && self.root().is_some() {
            return Err(PlacementError::DuplicateCore);
        }
        if self
            .live()
            .any(|existing| existing.circle().overlaps_circle(&footprint))
        {
            return Err(PlacementError::Occupied);
        }
        Ok(())
    }

    /// Stores a new structure and returns its identifier.
    pub(crate) fn insert(&mut self, kind: StructureKind, position: Vec2, tick: u64) -> StructureId {
        let id = self.next_id;
        self.next_id = StructureId::new(id.get().wrapping_add(1));
        let _ = self
            .entries
            .insert(id, Structure::new(id, kind, position, tick));
        id
    }

    pub(crate) fn get(&self, id: StructureId) -> Option<&Structure> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.entries.get_mut(&id)
    }

    /// Every stored structure in identifier order, flagged ones included.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Structure> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Structure> {
        self.entries.values_mut()
    }

    /// Structures that still participate in the simulation.
    pub(crate) fn live(&self) -> impl Iterator<Item = &Structure> {
        self.entries.values().filter(|structure| structure.is_alive())
    }

    /// Lowest-identifier live core, the root of the territory network.
    pub(crate) fn root(&self) -> Option<&Structure> {
        self.live()
            .find(|structure| structure.kind == StructureKind::Core)
    }

    /// Drops flagged structures, returning their identifiers.
    pub(crate) fn sweep(&mut self) -> Vec<StructureId> {
        let mut swept = Vec::new();
        self.entries.retain(|id, structure| {
            let keep = !structure.is_flagged();
            if !keep {
                swept.push(*id);
            }
            keep
        });
        swept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Rect {
        Rect::from_size(1_000.0, 1_000.0)
    }

    #[test]
    fn registry_starts_empty_with_zero_identifier() {
        let mut registry = StructureRegistry::new();
        assert!(registry.iter().next().is_none());
        let id = registry.insert(StructureKind::Relay, Vec2::new(50.0, 50.0), 0);
        assert_eq!(id.get(), 0);
    }

    #[test]
    fn placement_rejects_overlap_bounds_and_second_core() {
        let mut registry = StructureRegistry::new();
        let _ = registry.insert(StructureKind::Core, Vec2::new(500.0, 500.0), 0);

        assert_eq!(
            registry.can_place(&bounds(), StructureKind::Relay, Vec2::new(510.0, 500.0)),
            Err(PlacementError::Occupied)
        );
        assert_eq!(
            registry.can_place(&bounds(), StructureKind::Relay, Vec2::new(2.0, 500.0)),
            Err(PlacementError::OutOfBounds)
        );
        assert_eq!(
            registry.can_place(&bounds(), StructureKind::Core, Vec2::new(100.0, 100.0)),
            Err(PlacementError::DuplicateCore)
        );
        assert_eq!(
            registry.can_place(&bounds(), StructureKind::Relay, Vec2::new(600.0, 500.0)),
            Ok(())
        );
    }

    #[test]
    fn flagged_structures_free_their_footprint_and_are_swept() {
        let mut registry = StructureRegistry::new();
        let id = registry.insert(StructureKind::Turret, Vec2::new(200.0, 200.0), 0);
        if let Some(turret) = registry.get_mut(id) {
            turret.removed = true;
        }
        assert_eq!(
            registry.can_place(&bounds(), StructureKind::Turret, Vec2::new(200.0, 200.0)),
            Ok(())
        );
        assert_eq!(registry.sweep(), vec![id]);
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn penalty_multiplies_the_fire_interval() {
        let mut registry = StructureRegistry::new();
        let id = registry.insert(StructureKind::Turret, Vec2::new(200.0, 200.0), 0);
        let turret = registry.get_mut(id).expect("turret stored");
        assert_eq!(turret.fire_interval(2), Some(20));
        turret.penalty_applied = true;
        assert_eq!(turret.fire_interval(2), Some(40));
    }
}
