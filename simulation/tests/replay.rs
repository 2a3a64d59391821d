use bastion_core::{Event, MobileClass, SimulationConfig, SpawningConfig, StructureKind};
use bastion_simulation::Simulation;
use bastion_world::query;
use glam::Vec2;

fn busy_config(indexed: bool) -> SimulationConfig {
    let mut config = SimulationConfig {
        spawning: SpawningConfig {
            interval_ticks: 15,
            wave_length_ticks: 150,
            initial_burst: 2,
            seed: 0x5eed,
        },
        ..SimulationConfig::default()
    };
    config.spatial.indexed = indexed;
    config.spatial.resync_interval_ticks = 50;
    config
}

fn build_base(simulation: &mut Simulation) {
    let layout = [
        (StructureKind::Core, 500.0, 500.0),
        (StructureKind::Turret, 440.0, 440.0),
        (StructureKind::Turret, 560.0, 560.0),
        (StructureKind::Relay, 650.0, 500.0),
        (StructureKind::Turret, 800.0, 500.0),
        (StructureKind::Beacon, 500.0, 350.0),
        (StructureKind::Collector, 520.0, 600.0),
    ];
    for (kind, x, y) in layout {
        let _ = simulation
            .place_structure(kind, Vec2::new(x, y))
            .expect("layout fits");
    }
}

fn scripted_run(config: SimulationConfig) -> (u64, Vec<Event>) {
    let mut simulation = Simulation::new(config).expect("valid config");
    build_base(&mut simulation);
    let mut events = Vec::new();

    for tick in 0..600u64 {
        if tick == 200 {
            let relay = simulation
                .structures()
                .iter()
                .find(|snapshot| snapshot.kind == StructureKind::Relay)
                .map(|snapshot| snapshot.id);
            if let Some(relay) = relay {
                simulation.remove_structure(relay).expect("relay removable");
            }
        }
        if tick == 400 {
            let _ = simulation.place_structure(StructureKind::Relay, Vec2::new(650.0, 500.0));
        }
        events.extend_from_slice(simulation.step());
    }

    (simulation.fingerprint(), events)
}

#[test]
fn deterministic_replay_produces_identical_fingerprints() {
    let (first, first_events) = scripted_run(busy_config(true));
    let (second, second_events) = scripted_run(busy_config(true));

    assert_eq!(first, second, "fingerprint diverged between runs");
    assert_eq!(first_events, second_events);
    assert!(first_events
        .iter()
        .any(|event| matches!(event, Event::ProjectileFired { .. })));
}

#[test]
fn degraded_index_replays_like_the_indexed_one() {
    let (indexed, indexed_events) = scripted_run(busy_config(true));
    let (degraded, degraded_events) = scripted_run(busy_config(false));

    assert_eq!(indexed_events, degraded_events);
    assert_eq!(indexed, degraded);
}

#[test]
fn removing_the_relay_penalises_the_outpost_once() {
    let mut config = busy_config(true);
    config.spawning.interval_ticks = u64::MAX;
    let (_, events) = scripted_run(config);
    let disconnected = events
        .iter()
        .filter(|event| matches!(event, Event::StructureDisconnected { .. }))
        .count();
    let reconnected = events
        .iter()
        .filter(|event| matches!(event, Event::StructureReconnected { .. }))
        .count();

    assert_eq!(disconnected, 1, "only the far turret loses its link");
    assert_eq!(reconnected, 1, "a new relay restores it");
}

#[test]
fn full_resync_keeps_queries_exact() {
    let mut config = busy_config(true);
    config.spatial.resync_interval_ticks = 7;
    let mut simulation = Simulation::new(config).expect("valid config");
    build_base(&mut simulation);
    simulation.run(120);

    assert!(simulation.spatial_stats().full_resyncs >= 17);
    for monster in simulation.monsters().iter() {
        let found = simulation.query_moving_entities_near(
            MobileClass::Monster,
            monster.position,
            0.5,
        );
        assert!(found.contains(&monster.id), "{:?} missing from grid", monster.id);
    }
    assert_eq!(query::tick_index(simulation.world()), 120);
}
