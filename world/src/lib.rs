#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the Bastion simulation.
//!
//! The world owns every entity and the [`SpatialIndex`] over them. All
//! mutation goes through [`apply`]; everything else reads through [`query`].

mod mobiles;
mod pipeline;
mod structures;

use bastion_core::{
    Command, EntityHandle, Event, MobileClass, MobileId, Rect, RemovalError, SimulationConfig,
    SpatialBody, SpatialConfig, StructureKind,
};
use bastion_spatial::SpatialIndex;
use glam::Vec2;

use mobiles::{Monster, Projectile};
use structures::StructureRegistry;

/// Represents the authoritative Bastion world state.
#[derive(Debug)]
pub struct World {
    bounds: Rect,
    spatial_config: SpatialConfig,
    penalty_factor: u32,
    structures: StructureRegistry,
    monsters: Vec<Monster>,
    projectiles: Vec<Projectile>,
    spatial: SpatialIndex,
    next_mobile_id: MobileId,
    tick_index: u64,
}

impl World {
    /// Creates an empty world using the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&SimulationConfig::default())
    }

    /// Creates an empty world sized and tuned by `config`.
    #[must_use]
    pub fn with_config(config: &SimulationConfig) -> Self {
        let bounds = Rect::from_size(config.world.width, config.world.height);
        Self {
            bounds,
            spatial_config: config.spatial,
            penalty_factor: config.penalty.fire_interval_factor.max(1),
            structures: StructureRegistry::new(),
            monsters: Vec::new(),
            projectiles: Vec::new(),
            spatial: SpatialIndex::from_config(bounds, &config.spatial),
            next_mobile_id: MobileId::new(0),
            tick_index: 0,
        }
    }

    fn reset(&mut self, width: f32, height: f32) {
        self.bounds = Rect::from_size(width, height);
        self.structures = StructureRegistry::new();
        self.monsters.clear();
        self.projectiles.clear();
        self.spatial = SpatialIndex::from_config(self.bounds, &self.spatial_config);
        self.next_mobile_id = MobileId::new(0);
        self.tick_index = 0;
    }

    fn allocate_mobile_id(&mut self) -> MobileId {
        let id = self.next_mobile_id;
        self.next_mobile_id = MobileId::new(id.get().wrapping_add(1));
        id
    }

    fn set_connectivity(&mut self, structure: bastion_core::StructureId, connected: bool, out: &mut Vec<Event>) {
        let Some(entry) = self.structures.get_mut(structure) else {
            log::warn!("connectivity update for unknown {structure:?}");
            return;
        };
        if entry.is_flagged() || entry.connected == connected {
            return;
        }
        entry.connected = connected;

        if connected {
            if entry.penalty_applied {
                entry.penalty_applied = false;
                log::info!("{:?} {structure:?} reconnected, penalty lifted", entry.kind);
                out.push(Event::StructureReconnected { structure });
            }
        } else if !entry.penalty_applied {
            entry.penalty_applied = true;
            log::info!("{:?} {structure:?} disconnected, penalty applied", entry.kind);
            out.push(Event::StructureDisconnected { structure });
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// [`Command::Tick`] treats every monster as visible; use [`tick`] to supply
/// a fog of war.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureWorld { width, height } => {
            if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
                log::warn!("ignoring world extent {width}x{height}");
                return;
            }
            world.reset(width, height);
            out_events.push(Event::WorldConfigured { width, height });
        }
        Command::Tick => world.run_tick(&mut |_, _| true, out_events),
        Command::PlaceStructure { kind, position } => {
            if let Err(reason) = world
                .structures
                .can_place(&world.bounds, kind, position)
            {
                log::warn!("rejected {kind:?} at {position}: {reason:?}");
                out_events.push(Event::StructurePlacementRejected {
                    kind,
                    position,
                    reason,
                });
                return;
            }
            let structure = world.structures.insert(kind, position, world.tick_index);
            world.spatial.notify_static_added(structure);
            out_events.push(Event::StructurePlaced {
                structure,
                kind,
                position,
            });
        }
        Command::RemoveStructure { structure } => {
            let reason = match world.structures.get_mut(structure) {
                Some(entry) if entry.is_flagged() => RemovalError::MissingStructure,
                Some(entry) if entry.kind == StructureKind::Core => RemovalError::CoreIsPermanent,
                Some(entry) => {
                    entry.removed = true;
                    out_events.push(Event::StructureRemoved { structure });
                    return;
                }
                None => RemovalError::MissingStructure,
            };
            log::warn!("rejected removal of {structure:?}: {reason:?}");
            out_events.push(Event::StructureRemovalRejected { structure, reason });
        }
        Command::SpawnMonster { kind, position } => {
            if !position.is_finite() {
                log::warn!("ignoring {kind:?} spawn at {position}");
                return;
            }
            let monster = world.allocate_mobile_id();
            let body = Monster::new(monster, kind, position);
            world
                .spatial
                .notify_mobile_spawned(MobileClass::Monster, monster, body.circle());
            world.monsters.push(body);
            out_events.push(Event::MonsterSpawned {
                monster,
                kind,
                position,
            });
        }
        Command::SetConnectivity {
            structure,
            connected,
        } => world.set_connectivity(structure, connected, out_events),
    }
}

/// Advances the world by one tick, consulting `visible` before a weapon
/// locks onto a monster.
///
/// `visible` receives the monster's center and radius.
pub fn tick<F>(world: &mut World, mut visible: F, out_events: &mut Vec<Event>)
where
    F: FnMut(Vec2, f32) -> bool,
{
    world.run_tick(&mut visible, out_events);
}

/// Opens a tick: advances the clock, resyncs the spatial indices and sweeps
/// entities flagged during the previous tick.
///
/// Commands applied between this call and [`run_phases`] belong to the opened
/// tick, so monsters spawned there move and fight in it. [`tick`] performs
/// both halves back to back.
pub fn begin_tick(world: &mut World, out_events: &mut Vec<Event>) {
    world.open_tick(out_events);
}

/// Runs state resolution, movement and collision for the tick opened by
/// [`begin_tick`].
pub fn run_phases<F>(world: &mut World, mut visible: F, out_events: &mut Vec<Event>)
where
    F: FnMut(Vec2, f32) -> bool,
{
    world.run_phases(&mut visible, out_events);
}

/// Reports that an entity was repositioned outside the tick pipeline.
///
/// Moved mobiles are re-binned at the next tick; a reported structure forces
/// a quadtree rebuild.
pub fn notify_entity_moved(world: &mut World, handle: EntityHandle) {
    match handle {
        EntityHandle::Structure(id) => world.spatial.notify_static_added(id),
        EntityHandle::Mobile(class, id) => world.spatial.notify_mobile_moved(class, id),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use bastion_core::{
        MobileClass, MobileId, MobileView, Rect, StructureId, StructureSnapshot, StructureView,
    };
    use bastion_spatial::SpatialStats;
    use glam::Vec2;

    use super::World;

    /// Captures the structures still taking part in the simulation.
    ///
    /// Structures flagged for removal or destroyed are excluded even before
    /// the next cleanup sweeps them.
    #[must_use]
    pub fn structure_view(world: &World) -> StructureView {
        StructureView::from_snapshots(
            world
                .structures
                .live()
                .map(|structure| structure.snapshot(world.tick_index))
                .collect(),
        )
    }

    /// Captures the live monsters.
    #[must_use]
    pub fn monster_view(world: &World) -> MobileView {
        MobileView::from_snapshots(
            world
                .monsters
                .iter()
                .map(super::Monster::snapshot)
                .filter(|snapshot| snapshot.alive)
                .collect(),
        )
    }

    /// Captures the projectiles in flight.
    #[must_use]
    pub fn projectile_view(world: &World) -> MobileView {
        MobileView::from_snapshots(
            world
                .projectiles
                .iter()
                .map(super::Projectile::snapshot)
                .filter(|snapshot| snapshot.alive)
                .collect(),
        )
    }

    /// Broad-phase structure candidates around `center`.
    #[must_use]
    pub fn structures_near(world: &World, center: Vec2, radius: f32) -> Vec<StructureId> {
        world
            .spatial
            .statics_in_range(center, radius, world.structures.iter())
    }

    /// Broad-phase mobile candidates of `class` around `center`.
    #[must_use]
    pub fn mobiles_near(world: &World, class: MobileClass, center: Vec2, radius: f32) -> Vec<MobileId> {
        match class {
            MobileClass::Monster => {
                world
                    .spatial
                    .mobiles_in_range(class, center, radius, &world.monsters)
            }
            MobileClass::Projectile => {
                world
                    .spatial
                    .mobiles_in_range(class, center, radius, &world.projectiles)
            }
        }
    }

    /// Index of the last completed tick.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Rectangle enclosing the playable world.
    #[must_use]
    pub fn bounds(world: &World) -> Rect {
        world.bounds
    }

    /// Root of the territory network, if a core stands.
    #[must_use]
    pub fn root_core(world: &World) -> Option<StructureSnapshot> {
        world
            .structures
            .root()
            .map(|core| core.snapshot(world.tick_index))
    }

    /// Ticks between shots of the structure's weapon, penalty included.
    #[must_use]
    pub fn fire_interval(world: &World, structure: StructureId) -> Option<u32> {
        world
            .structures
            .get(structure)
            .and_then(|entry| entry.fire_interval(world.penalty_factor))
    }

    /// Remaining hit points of a monster.
    #[must_use]
    pub fn monster_health(world: &World, monster: MobileId) -> Option<u32> {
        super::mobiles::position_of(&world.monsters, monster)
            .map(|index| world.monsters[index].health.get())
    }

    /// Work counters of the spatial indices.
    #[must_use]
    pub fn spatial_stats(world: &World) -> SpatialStats {
        world.spatial.stats()
    }
}
