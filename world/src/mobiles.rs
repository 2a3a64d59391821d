//! Moving bodies: monsters and the projectiles fired at them.
//!
//! Both collections are kept in identifier order. Identifiers are allocated
//! monotonically and compaction uses `retain`, so appending preserves the
//! order and lookups can binary search.

use bastion_core::{
    Circle, Health, MobileClass, MobileId, MobileSnapshot, MonsterKind, ProjectileKind,
    SpatialBody, StructureId,
};
use glam::Vec2;

#[derive(Clone, Debug)]
pub(crate) struct Monster {
    pub(crate) id: MobileId,
    pub(crate) kind: MonsterKind,
    pub(crate) position: Vec2,
    pub(crate) previous: Vec2,
    pub(crate) health: Health,
    pub(crate) contact_cooldown: u32,
    /// Touching a structure during the last collision phase; engaged monsters hold still.
    pub(crate) engaged: bool,
    pub(crate) killed: bool,
}

impl Monster {
    pub(crate) fn new(id: MobileId, kind: MonsterKind, position: Vec2) -> Self {
        Self {
            id,
            kind,
            position,
            previous: position,
            health: kind.max_health(),
            contact_cooldown: 0,
            engaged: false,
            killed: false,
        }
    }

    /// Steps toward `goal`, halting once the bodies would touch.
    pub(crate) fn advance_toward(&mut self, goal: Circle) {
        self.previous = self.position;
        let offset = goal.center - self.position;
        let distance = offset.length();
        let gap = distance - goal.radius - self.kind.radius();
        if gap <= 0.0 || distance <= f32::EPSILON {
            return;
        }
        let step = self.kind.speed().min(gap);
        self.position += offset / distance * step;
    }

    pub(crate) fn snapshot(&self) -> MobileSnapshot {
        MobileSnapshot {
            id: self.id,
            class: MobileClass::Monster,
            position: self.position,
            radius: self.kind.radius(),
            alive: self.is_alive(),
        }
    }
}

impl SpatialBody for Monster {
    type Id = MobileId;

    fn id(&self) -> MobileId {
        self.id
    }

    fn circle(&self) -> Circle {
        Circle::new(self.position, self.kind.radius())
    }

    fn is_alive(&self) -> bool {
        !self.killed && !self.health.is_depleted()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    pub(crate) id: MobileId,
    pub(crate) kind: ProjectileKind,
    pub(crate) source: StructureId,
    pub(crate) position: Vec2,
    pub(crate) previous: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) age: u32,
    pub(crate) spent: bool,
    pub(crate) expired: bool,
}

impl Projectile {
    /// Launches a projectile from `origin` aimed at `aim`.
    pub(crate) fn launch(
        id: MobileId,
        kind: ProjectileKind,
        source: StructureId,
        origin: Vec2,
        aim: Vec2,
    ) -> Self {
        let direction = (aim - origin).normalize_or_zero();
        Self {
            id,
            kind,
            source,
            position: origin,
            previous: origin,
            velocity: direction * kind.speed(),
            age: 0,
            spent: false,
            expired: false,
        }
    }

    pub(crate) fn advance(&mut self) {
        self.previous = self.position;
        self.position += self.velocity;
        self.age = self.age.saturating_add(1);
    }

    /// Reports whether the last step covered more than the projectile's diameter.
    pub(crate) fn outran_itself(&self) -> bool {
        self.position.distance(self.previous) > 2.0 * self.kind.radius()
    }

    pub(crate) fn snapshot(&self) -> MobileSnapshot {
        MobileSnapshot {
            id: self.id,
            class: MobileClass::Projectile,
            position: self.position,
            radius: self.kind.radius(),
            alive: self.is_alive(),
        }
    }
}

impl SpatialBody for Projectile {
    type Id = MobileId;

    fn id(&self) -> MobileId {
        self.id
    }

    fn circle(&self) -> Circle {
        Circle::new(self.position, self.kind.radius())
    }

    fn is_alive(&self) -> bool {
        !self.spent && !self.expired
    }
}

/// Binary searches an identifier-ordered body list.
pub(crate) fn position_of<B: SpatialBody<Id = MobileId>>(bodies: &[B], id: MobileId) -> Option<usize> {
    bodies.binary_search_by_key(&id, SpatialBody::id).ok()
}
