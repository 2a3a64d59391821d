#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Bastion simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems read immutable views
//! ([`StructureView`], [`MobileView`]) and respond exclusively with new
//! command batches.

pub mod config;
pub mod geometry;

pub use config::{
    ConfigError, PenaltyConfig, SimulationConfig, SpatialConfig, SpawningConfig,
    TerritoryConfig, VisibilityConfig, WorldConfig,
};
pub use geometry::{
    angle_in_span, bearing, normalize_angle, sweep_collides_relative, Circle, Rect, Segment,
    Shape,
};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Unique identifier assigned to a static structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureId(u32);

impl StructureId {
    /// Creates a new structure identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a moving body (monster or projectile).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MobileId(u32);

impl MobileId {
    /// Creates a new mobile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Classes of moving bodies. Each class owns its own hash grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MobileClass {
    /// Hostile units advancing on the core.
    Monster,
    /// Shots fired by structures.
    Projectile,
}

impl MobileClass {
    /// Every mobile class in index order.
    pub const ALL: [MobileClass; 2] = [MobileClass::Monster, MobileClass::Projectile];

    /// Dense index of the class, suitable for per-class arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Monster => 0,
            Self::Projectile => 1,
        }
    }
}

/// Opaque handle to any entity known to the spatial layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityHandle {
    /// A static structure.
    Structure(StructureId),
    /// A moving body of the given class.
    Mobile(MobileClass, MobileId),
}

/// Hit points carried by structures and monsters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Health(u32);

impl Health {
    /// Creates a health value with the provided hit points.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Remaining hit points.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Reports whether no hit points remain.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.0 == 0
    }

    /// Returns the health left after taking `damage`, saturating at zero.
    #[must_use]
    pub const fn damaged(self, damage: u32) -> Self {
        Self(self.0.saturating_sub(damage))
    }
}

/// Types of structures that can be placed in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StructureKind {
    /// Root of the territory network. Exactly one may exist.
    Core,
    /// Cheap pylon that only extends territory.
    Relay,
    /// Armed tower that fires bolts at visible monsters.
    Turret,
    /// Tower that sweeps a rotating searchlight sector.
    Beacon,
    /// Resource collector; consumes territory but does not extend it.
    Collector,
    /// Support depot; consumes territory but does not extend it.
    Depot,
}

impl StructureKind {
    /// Reports whether the structure extends the territory network.
    #[must_use]
    pub const fn provides_territory(self) -> bool {
        !matches!(self, Self::Collector | Self::Depot)
    }

    /// Collision radius of the structure.
    #[must_use]
    pub const fn radius(self) -> f32 {
        match self {
            Self::Core => 24.0,
            Self::Relay => 8.0,
            Self::Turret | Self::Beacon => 14.0,
            Self::Collector | Self::Depot => 12.0,
        }
    }

    /// Hit points of a freshly placed structure.
    #[must_use]
    pub const fn max_health(self) -> Health {
        match self {
            Self::Core => Health::new(500),
            Self::Relay => Health::new(60),
            Self::Turret => Health::new(120),
            Self::Beacon => Health::new(90),
            Self::Collector | Self::Depot => Health::new(80),
        }
    }

    /// Radius of the always-on circle of vision the structure reveals.
    #[must_use]
    pub const fn vision_radius(self) -> f32 {
        match self {
            Self::Core => 160.0,
            Self::Relay => 60.0,
            Self::Turret => 110.0,
            Self::Beacon => 50.0,
            Self::Collector | Self::Depot => 40.0,
        }
    }

    /// Weapon mounted on the structure, if any.
    #[must_use]
    pub const fn weapon(self) -> Option<Weapon> {
        match self {
            Self::Turret => Some(Weapon {
                range: 150.0,
                fire_interval_ticks: 20,
                projectile: ProjectileKind::Bolt,
            }),
            Self::Core => Some(Weapon {
                range: 120.0,
                fire_interval_ticks: 45,
                projectile: ProjectileKind::Shell,
            }),
            _ => None,
        }
    }

    /// Rotating searchlight carried by the structure, if any.
    #[must_use]
    pub const fn sector(self) -> Option<SectorSpec> {
        match self {
            Self::Beacon => Some(SectorSpec {
                radius: 260.0,
                half_width: 0.35,
                angular_speed: 0.02,
            }),
            _ => None,
        }
    }
}

/// Firing parameters of an armed structure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weapon {
    /// Maximum distance from the structure center to a target's edge.
    pub range: f32,
    /// Ticks between shots while connected.
    pub fire_interval_ticks: u32,
    /// Projectile launched by each shot.
    pub projectile: ProjectileKind,
}

/// Geometry of a rotating visibility sector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SectorSpec {
    /// Reach of the sector.
    pub radius: f32,
    /// Half of the angular width, in radians.
    pub half_width: f32,
    /// Rotation per tick, in radians.
    pub angular_speed: f32,
}

/// Types of monsters that advance on the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MonsterKind {
    /// Baseline melee unit.
    Crawler,
    /// Large, slow, durable unit.
    Brute,
    /// Small, fast, fragile unit.
    Runner,
}

impl MonsterKind {
    /// Every monster kind, in spawn-table order.
    pub const ALL: [MonsterKind; 3] = [MonsterKind::Crawler, MonsterKind::Brute, MonsterKind::Runner];

    /// Collision radius of the monster.
    #[must_use]
    pub const fn radius(self) -> f32 {
        match self {
            Self::Crawler => 6.0,
            Self::Brute => 14.0,
            Self::Runner => 4.0,
        }
    }

    /// Distance travelled per tick.
    #[must_use]
    pub const fn speed(self) -> f32 {
        match self {
            Self::Crawler => 1.0,
            Self::Brute => 0.5,
            Self::Runner => 2.0,
        }
    }

    /// Hit points of a freshly spawned monster.
    #[must_use]
    pub const fn max_health(self) -> Health {
        match self {
            Self::Crawler => Health::new(20),
            Self::Brute => Health::new(80),
            Self::Runner => Health::new(8),
        }
    }

    /// Damage dealt to a touched structure.
    #[must_use]
    pub const fn contact_damage(self) -> u32 {
        match self {
            Self::Crawler => 4,
            Self::Brute => 12,
            Self::Runner => 2,
        }
    }

    /// Ticks between contact hits.
    #[must_use]
    pub const fn contact_cooldown_ticks(self) -> u32 {
        match self {
            Self::Crawler | Self::Runner => 30,
            Self::Brute => 60,
        }
    }
}

/// Types of projectiles fired by structures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Fast, small, single-target shot.
    Bolt,
    /// Slow shell that splashes on impact.
    Shell,
}

impl ProjectileKind {
    /// Collision radius of the projectile.
    #[must_use]
    pub const fn radius(self) -> f32 {
        match self {
            Self::Bolt => 2.0,
            Self::Shell => 4.0,
        }
    }

    /// Distance travelled per tick.
    #[must_use]
    pub const fn speed(self) -> f32 {
        match self {
            Self::Bolt => 24.0,
            Self::Shell => 6.0,
        }
    }

    /// Damage dealt on impact.
    #[must_use]
    pub const fn damage(self) -> u32 {
        match self {
            Self::Bolt => 6,
            Self::Shell => 10,
        }
    }

    /// Ticks the projectile survives without hitting anything.
    #[must_use]
    pub const fn lifetime_ticks(self) -> u32 {
        match self {
            Self::Bolt => 12,
            Self::Shell => 30,
        }
    }

    /// How the projectile's damage is distributed on impact.
    #[must_use]
    pub const fn impact(self) -> Impact {
        match self {
            Self::Bolt => Impact::Single,
            Self::Shell => Impact::Splash { radius: 30.0 },
        }
    }
}

/// Damage distribution applied when a projectile connects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Impact {
    /// Only the struck monster takes damage.
    Single,
    /// Every monster overlapping the splash circle takes damage.
    Splash {
        /// Radius of the splash around the impact point.
        radius: f32,
    },
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Resets the world to an empty field of the provided extent.
    ConfigureWorld {
        /// Horizontal extent in world units.
        width: f32,
        /// Vertical extent in world units.
        height: f32,
    },
    /// Advances the simulation by one tick.
    Tick,
    /// Requests placement of a structure centered at the provided position.
    PlaceStructure {
        /// Type of structure to construct.
        kind: StructureKind,
        /// Center of the structure in world units.
        position: Vec2,
    },
    /// Requests removal of an existing structure.
    RemoveStructure {
        /// Identifier of the structure targeted for removal.
        structure: StructureId,
    },
    /// Requests that a monster enter the world.
    SpawnMonster {
        /// Type of monster to spawn.
        kind: MonsterKind,
        /// Spawn position in world units.
        position: Vec2,
    },
    /// Records whether a structure is connected to the territory network.
    SetConnectivity {
        /// Structure whose status changed.
        structure: StructureId,
        /// Whether the structure is now connected.
        connected: bool,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the world was reset to a new extent.
    WorldConfigured {
        /// Horizontal extent in world units.
        width: f32,
        /// Vertical extent in world units.
        height: f32,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Index of the tick that just completed.
        tick: u64,
    },
    /// Confirms that a structure was placed into the world.
    StructurePlaced {
        /// Identifier assigned to the structure by the world.
        structure: StructureId,
        /// Type of structure that was placed.
        kind: StructureKind,
        /// Center of the structure.
        position: Vec2,
    },
    /// Reports that a structure placement request was rejected.
    StructurePlacementRejected {
        /// Type of structure requested for placement.
        kind: StructureKind,
        /// Requested center.
        position: Vec2,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a structure was removed on request.
    StructureRemoved {
        /// Identifier of the structure that was removed.
        structure: StructureId,
    },
    /// Reports that a structure removal request was rejected.
    StructureRemovalRejected {
        /// Identifier of the structure targeted for removal.
        structure: StructureId,
        /// Specific reason the removal failed.
        reason: RemovalError,
    },
    /// Reports that a structure ran out of hit points and will be swept.
    StructureDestroyed {
        /// Identifier of the destroyed structure.
        structure: StructureId,
    },
    /// Reports that a structure lost its connection to the core.
    StructureDisconnected {
        /// Identifier of the disconnected structure.
        structure: StructureId,
    },
    /// Reports that a structure regained its connection to the core.
    StructureReconnected {
        /// Identifier of the reconnected structure.
        structure: StructureId,
    },
    /// Confirms that a monster entered the world.
    MonsterSpawned {
        /// Identifier assigned to the monster.
        monster: MobileId,
        /// Type of monster that spawned.
        kind: MonsterKind,
        /// Spawn position.
        position: Vec2,
    },
    /// Reports that a monster ran out of hit points.
    MonsterKilled {
        /// Identifier of the killed monster.
        monster: MobileId,
    },
    /// Reports that a monster struck a structure.
    StructureStruck {
        /// Identifier of the struck structure.
        structure: StructureId,
        /// Identifier of the attacking monster.
        monster: MobileId,
        /// Damage dealt.
        damage: u32,
    },
    /// Confirms that a structure fired a projectile.
    ProjectileFired {
        /// Identifier assigned to the projectile.
        projectile: MobileId,
        /// Structure that fired.
        structure: StructureId,
        /// Monster the shot was aimed at.
        target: MobileId,
    },
    /// Reports that a projectile connected with a monster.
    ProjectileHit {
        /// Identifier of the projectile.
        projectile: MobileId,
        /// Monster struck first.
        monster: MobileId,
    },
    /// Reports that a projectile exhausted its lifetime without a hit.
    ProjectileExpired {
        /// Identifier of the projectile.
        projectile: MobileId,
    },
}

/// Reasons a structure placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested footprint extends beyond the world bounds.
    OutOfBounds,
    /// The requested footprint overlaps an existing structure.
    Occupied,
    /// A core already exists; only one root is allowed.
    DuplicateCore,
}

/// Reasons a structure removal request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalError {
    /// No structure with the provided identifier exists.
    MissingStructure,
    /// The core cannot be removed.
    CoreIsPermanent,
}

/// Accessors the spatial layer needs from an entity.
pub trait SpatialBody {
    /// Identifier type of the entity.
    type Id: Copy + Ord;

    /// Identifier of the entity.
    fn id(&self) -> Self::Id;

    /// Collision circle at the entity's current position.
    fn circle(&self) -> Circle;

    /// Whether the entity still participates in queries.
    fn is_alive(&self) -> bool;
}

/// Immutable representation of a single structure used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StructureSnapshot {
    /// Identifier allocated to the structure by the world.
    pub id: StructureId,
    /// Kind of structure that was constructed.
    pub kind: StructureKind,
    /// Center of the structure.
    pub position: Vec2,
    /// Remaining hit points.
    pub health: Health,
    /// Whether the structure is connected to the territory network.
    pub connected: bool,
    /// Ticks since the structure was placed.
    pub age_ticks: u64,
}

impl SpatialBody for StructureSnapshot {
    type Id = StructureId;

    fn id(&self) -> StructureId {
        self.id
    }

    fn circle(&self) -> Circle {
        Circle::new(self.position, self.kind.radius())
    }

    fn is_alive(&self) -> bool {
        !self.health.is_depleted()
    }
}

/// Read-only snapshot describing all structures in the world.
#[derive(Clone, Debug, Default)]
pub struct StructureView {
    snapshots: Vec<StructureSnapshot>,
}

impl StructureView {
    /// Creates a new structure view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<StructureSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &StructureSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshots as a slice, ordered by identifier.
    #[must_use]
    pub fn as_slice(&self) -> &[StructureSnapshot] {
        &self.snapshots
    }

    /// Looks up a structure by identifier.
    #[must_use]
    pub fn get(&self, id: StructureId) -> Option<&StructureSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of captured structures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Immutable representation of a single moving body used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MobileSnapshot {
    /// Identifier allocated to the body by the world.
    pub id: MobileId,
    /// Class of the body.
    pub class: MobileClass,
    /// Current center.
    pub position: Vec2,
    /// Collision radius.
    pub radius: f32,
    /// Whether the body has not been flagged for removal.
    pub alive: bool,
}

impl SpatialBody for MobileSnapshot {
    type Id = MobileId;

    fn id(&self) -> MobileId {
        self.id
    }

    fn circle(&self) -> Circle {
        Circle::new(self.position, self.radius)
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Read-only snapshot describing the moving bodies of one class.
#[derive(Clone, Debug, Default)]
pub struct MobileView {
    snapshots: Vec<MobileSnapshot>,
}

impl MobileView {
    /// Creates a new mobile view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<MobileSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &MobileSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshots as a slice, ordered by identifier.
    #[must_use]
    pub fn as_slice(&self) -> &[MobileSnapshot] {
        &self.snapshots
    }

    /// Number of captured bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
