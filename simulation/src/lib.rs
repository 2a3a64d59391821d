#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-order orchestration of the world and its systems.
//!
//! A [`Simulation`] owns the [`World`] together with the territory, fog and
//! spawning systems. [`Simulation::step`] advances them in a fixed order:
//!
//! 1. the world opens the tick: clock, spatial resync, cleanup;
//! 2. spawning, whose commands are applied immediately so new monsters take
//!    part in this tick;
//! 3. the world's three phases (monsters, projectiles, weapons) with the fog
//!    deciding which monsters a weapon may lock onto;
//! 4. territory maintenance, whose connectivity commands are applied
//!    immediately;
//! 5. fog maintenance.
//!
//! Commands issued between steps (placements, removals) are applied at once
//! and their events reach the systems during the next step.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use bastion_core::{
    Command, ConfigError, EntityHandle, Event, MobileClass, MobileId, MobileView, MonsterKind,
    PlacementError, RemovalError, SimulationConfig, StructureId, StructureKind, StructureView,
};
use bastion_spatial::SpatialStats;
use bastion_system_spawning::Spawning;
use bastion_system_territory::Territory;
use bastion_system_visibility::{Fog, FogStats};
use bastion_world::{self as world, query, World};
use glam::Vec2;

/// World plus the systems maintaining it, stepped one tick at a time.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    world: World,
    territory: Territory,
    fog: Fog,
    spawning: Spawning,
    pending: Vec<Event>,
    last_step: Vec<Event>,
}

impl Simulation {
    /// Builds an empty simulation after validating `config`.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let world = World::with_config(&config);
        let bounds = query::bounds(&world);
        log::info!(
            "simulation ready: {}x{} world, indexed={}",
            config.world.width,
            config.world.height,
            config.spatial.indexed
        );
        Ok(Self {
            territory: Territory::new(bounds, &config.territory),
            fog: Fog::new(bounds, &config.visibility),
            spawning: Spawning::new(&config.spawning),
            world,
            config,
            pending: Vec::new(),
            last_step: Vec::new(),
        })
    }

    /// Configuration the simulation was built with.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Read access to the world for [`bastion_world::query`] functions.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Territory system state.
    #[must_use]
    pub fn territory(&self) -> &Territory {
        &self.territory
    }

    /// Index of the last completed tick.
    #[must_use]
    pub fn tick_index(&self) -> u64 {
        query::tick_index(&self.world)
    }

    /// Events returned by the most recent [`Simulation::step`].
    #[must_use]
    pub fn last_events(&self) -> &[Event] {
        &self.last_step
    }

    /// Advances the simulation by one tick.
    ///
    /// Returns every event since the previous step, including those of
    /// commands submitted in between.
    pub fn step(&mut self) -> &[Event] {
        let mut events = std::mem::take(&mut self.pending);

        world::begin_tick(&mut self.world, &mut events);
        let tick = query::tick_index(&self.world);

        let mut commands = Vec::new();
        self.spawning
            .handle(&events, query::bounds(&self.world), &mut commands);
        self.apply_all(&mut commands, &mut events);

        let fog = &mut self.fog;
        world::run_phases(
            &mut self.world,
            |center, radius| fog.is_circle_visible(center, radius),
            &mut events,
        );

        let structures = query::structure_view(&self.world);
        self.territory
            .handle(&events, tick, &structures, &mut commands);
        self.apply_all(&mut commands, &mut events);

        let structures = query::structure_view(&self.world);
        self.fog.handle(&events, tick, &structures);

        log::trace!("tick {tick}: {} events", events.len());
        self.last_step = events;
        &self.last_step
    }

    /// Runs `ticks` steps.
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            let _ = self.step();
        }
    }

    fn apply_all(&mut self, commands: &mut Vec<Command>, events: &mut Vec<Event>) {
        for command in commands.drain(..) {
            world::apply(&mut self.world, command, events);
        }
    }

    /// Applies a command between steps. Its events reach the systems at the
    /// next step.
    pub fn submit(&mut self, command: Command) -> &[Event] {
        let start = self.pending.len();
        world::apply(&mut self.world, command, &mut self.pending);
        &self.pending[start..]
    }

    /// Places a structure, reporting the identifier the world assigned.
    pub fn place_structure(
        &mut self,
        kind: StructureKind,
        position: Vec2,
    ) -> Result<StructureId, PlacementError> {
        let outcome = self
            .submit(Command::PlaceStructure { kind, position })
            .iter()
            .find_map(|event| match event {
                Event::StructurePlaced { structure, .. } => Some(Ok(*structure)),
                Event::StructurePlacementRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            });
        outcome.unwrap_or(Err(PlacementError::OutOfBounds))
    }

    /// Removes a structure. The core cannot be removed.
    pub fn remove_structure(&mut self, structure: StructureId) -> Result<(), RemovalError> {
        let outcome = self
            .submit(Command::RemoveStructure { structure })
            .iter()
            .find_map(|event| match event {
                Event::StructureRemoved { .. } => Some(Ok(())),
                Event::StructureRemovalRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            });
        outcome.unwrap_or(Err(RemovalError::MissingStructure))
    }

    /// Spawns a monster immediately, returning its identifier.
    pub fn spawn_monster(
        &mut self,
        kind: MonsterKind,
        position: Vec2,
    ) -> Option<MobileId> {
        self.submit(Command::SpawnMonster { kind, position })
            .iter()
            .find_map(|event| match event {
                Event::MonsterSpawned { monster, .. } => Some(*monster),
                _ => None,
            })
    }

    /// Moving bodies of `class` whose circles may overlap the query circle.
    #[must_use]
    pub fn query_moving_entities_near(
        &self,
        class: MobileClass,
        center: Vec2,
        radius: f32,
    ) -> Vec<MobileId> {
        query::mobiles_near(&self.world, class, center, radius)
    }

    /// Structures whose circles may overlap the query circle.
    #[must_use]
    pub fn query_static_entities_near(&self, center: Vec2, radius: f32) -> Vec<StructureId> {
        query::structures_near(&self.world, center, radius)
    }

    /// Whether `point` is revealed by any structure or beacon.
    pub fn is_position_visible(&mut self, point: Vec2) -> bool {
        self.fog.is_position_visible(point)
    }

    /// Whether any part of the circle is revealed.
    pub fn is_circle_visible(&mut self, center: Vec2, radius: f32) -> bool {
        self.fog.is_circle_visible(center, radius)
    }

    /// Whether `point` lies within the territory of a connected provider.
    #[must_use]
    pub fn is_position_in_valid_territory(&self, point: Vec2) -> bool {
        self.territory.is_position_in_valid_territory(point)
    }

    /// Whether `point` lies within the territory of any provider.
    #[must_use]
    pub fn is_position_in_any_territory(&self, point: Vec2) -> bool {
        self.territory.is_position_in_any_territory(point)
    }

    /// Reports an entity repositioned outside the tick pipeline.
    pub fn notify_entity_moved(&mut self, handle: EntityHandle) {
        world::notify_entity_moved(&mut self.world, handle);
    }

    /// Requests a territory recompute on the usual schedule.
    pub fn notify_territory_dirty(&mut self) {
        self.territory.mark_dirty(query::tick_index(&self.world));
    }

    /// Requests a rebuild of the fog sources at the next step.
    pub fn notify_visibility_sources_dirty(&mut self) {
        self.fog.mark_sources_dirty();
    }

    /// Live structures.
    #[must_use]
    pub fn structures(&self) -> StructureView {
        query::structure_view(&self.world)
    }

    /// Live monsters.
    #[must_use]
    pub fn monsters(&self) -> MobileView {
        query::monster_view(&self.world)
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> MobileView {
        query::projectile_view(&self.world)
    }

    /// Work counters of the spatial indices.
    #[must_use]
    pub fn spatial_stats(&self) -> SpatialStats {
        query::spatial_stats(&self.world)
    }

    /// Query counters of the fog.
    #[must_use]
    pub fn fog_stats(&self) -> FogStats {
        self.fog.stats()
    }

    /// Hash of the observable state.
    ///
    /// Equal across runs that received the same commands. Not stable across
    /// builds of the standard library.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick_index().hash(&mut hasher);
        for structure in self.structures().iter() {
            structure.id.hash(&mut hasher);
            structure.kind.hash(&mut hasher);
            hash_vec2(structure.position, &mut hasher);
            structure.health.hash(&mut hasher);
            structure.connected.hash(&mut hasher);
        }
        for view in [self.monsters(), self.projectiles()] {
            for mobile in view.iter() {
                mobile.id.hash(&mut hasher);
                hash_vec2(mobile.position, &mut hasher);
            }
        }
        self.territory.valid().hash(&mut hasher);
        hasher.finish()
    }
}

fn hash_vec2<H: Hasher>(value: Vec2, hasher: &mut H) {
    value.x.to_bits().hash(hasher);
    value.y.to_bits().hash(hasher);
}
