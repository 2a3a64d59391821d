//! Scripted headless scenario and its summary.

use bastion_core::{Event, StructureKind};
use bastion_simulation::Simulation;
use glam::Vec2;

/// Fortified base laid out around the world center, as offsets from it.
const LAYOUT: [(StructureKind, f32, f32); 10] = [
    (StructureKind::Core, 0.0, 0.0),
    (StructureKind::Turret, -70.0, -70.0),
    (StructureKind::Turret, 70.0, 70.0),
    (StructureKind::Turret, -70.0, 70.0),
    (StructureKind::Beacon, 70.0, -70.0),
    (StructureKind::Depot, 0.0, 80.0),
    (StructureKind::Relay, 180.0, 0.0),
    (StructureKind::Turret, 340.0, 0.0),
    (StructureKind::Collector, 380.0, 60.0),
    (StructureKind::Relay, -180.0, 0.0),
];

/// Offset of the outpost relay that the script demolishes and rebuilds.
const BRIDGE: Vec2 = Vec2::new(180.0, 0.0);

/// Totals gathered from the events of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) ticks: u64,
    pub(crate) monsters_spawned: u64,
    pub(crate) monsters_killed: u64,
    pub(crate) shots_fired: u64,
    pub(crate) hits: u64,
    pub(crate) structures_struck: u64,
    pub(crate) structures_destroyed: u64,
    pub(crate) disconnections: u64,
    pub(crate) reconnections: u64,
}

impl Summary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::TimeAdvanced { .. } => self.ticks += 1,
                Event::MonsterSpawned { .. } => self.monsters_spawned += 1,
                Event::MonsterKilled { .. } => self.monsters_killed += 1,
                Event::ProjectileFired { .. } => self.shots_fired += 1,
                Event::ProjectileHit { .. } => self.hits += 1,
                Event::StructureStruck { .. } => self.structures_struck += 1,
                Event::StructureDestroyed { .. } => self.structures_destroyed += 1,
                Event::StructureDisconnected { .. } => self.disconnections += 1,
                Event::StructureReconnected { .. } => self.reconnections += 1,
                _ => {}
            }
        }
    }
}

/// Builds the base, then runs `ticks` steps.
///
/// A third of the way in the outpost relay is demolished, cutting the far
/// turret off; two thirds of the way in it is rebuilt.
pub(crate) fn run(simulation: &mut Simulation, ticks: u64) -> Summary {
    let config = simulation.config();
    let center = Vec2::new(config.world.width, config.world.height) * 0.5;
    let mut summary = Summary::default();

    for (kind, dx, dy) in LAYOUT {
        let position = center + Vec2::new(dx, dy);
        if let Err(reason) = simulation.place_structure(kind, position) {
            log::warn!("layout skipped {kind:?} at {position}: {reason:?}");
        }
    }

    let demolish_at = ticks / 3;
    let rebuild_at = 2 * ticks / 3;
    for tick in 0..ticks {
        if tick == demolish_at && tick > 0 {
            demolish(simulation, center + BRIDGE);
        }
        if tick == rebuild_at && tick > demolish_at {
            if let Err(reason) =
                simulation.place_structure(StructureKind::Relay, center + BRIDGE)
            {
                log::warn!("bridge rebuild failed: {reason:?}");
            }
        }
        summary.record(simulation.step());
        if tick > 0 && tick % 100 == 0 {
            log::debug!(
                "tick {tick}: {} monsters, {} projectiles",
                simulation.monsters().len(),
                simulation.projectiles().len()
            );
        }
    }
    summary
}

fn demolish(simulation: &mut Simulation, position: Vec2) {
    let target = simulation
        .query_static_entities_near(position, 1.0)
        .into_iter()
        .find(|id| {
            simulation
                .structures()
                .get(*id)
                .is_some_and(|snapshot| snapshot.kind == StructureKind::Relay)
        });
    match target {
        Some(relay) => match simulation.remove_structure(relay) {
            Ok(()) => log::info!("demolished bridge relay {relay:?}"),
            Err(reason) => log::warn!("bridge demolition rejected: {reason:?}"),
        },
        None => log::info!("bridge relay already gone"),
    }
}
