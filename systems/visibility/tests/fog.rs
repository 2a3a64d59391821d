use bastion_core::{Circle, Command, Event, Rect, StructureKind, VisibilityConfig};
use bastion_system_visibility::Fog;
use bastion_world::{self as world, query, World};
use glam::Vec2;
use proptest::prelude::*;

fn fog_with(sources: &[Circle]) -> Fog {
    let mut fog = Fog::new(Rect::from_size(1_000.0, 1_000.0), &VisibilityConfig::default());
    fog.set_static_sources(sources.iter().copied());
    fog
}

fn circle() -> impl Strategy<Value = Circle> {
    (0.0f32..1_000.0, 0.0f32..1_000.0, 1.0f32..250.0)
        .prop_map(|(x, y, r)| Circle::new(Vec2::new(x, y), r))
}

fn point() -> impl Strategy<Value = Vec2> {
    (-50.0f32..1_050.0, -50.0f32..1_050.0).prop_map(|(x, y)| Vec2::new(x, y))
}

proptest! {
    #[test]
    fn growing_a_source_never_hides_a_visible_point(
        sources in prop::collection::vec(circle(), 1..8),
        grown in any::<prop::sample::Index>(),
        growth in 0.0f32..200.0,
        samples in prop::collection::vec((point(), 0.0f32..20.0), 1..64),
    ) {
        let mut before = fog_with(&sources);
        let mut larger = sources.clone();
        larger[grown.index(sources.len())].radius += growth;
        let mut after = fog_with(&larger);

        for (sample, radius) in samples {
            if before.is_circle_visible(sample, radius) {
                prop_assert!(after.is_circle_visible(sample, radius));
            }
        }
    }

    #[test]
    fn cached_answers_match_an_exact_scan(
        sources in prop::collection::vec(circle(), 0..8),
        samples in prop::collection::vec(point(), 1..64),
    ) {
        let mut fog = fog_with(&sources);
        for sample in &samples {
            let exact = sources.iter().any(|source| source.contains_point(*sample));
            prop_assert_eq!(fog.is_position_visible(*sample), exact);
        }
        // Second pass answers from classified cells.
        for sample in &samples {
            let exact = sources.iter().any(|source| source.contains_point(*sample));
            prop_assert_eq!(fog.is_position_visible(*sample), exact);
        }
    }
}

#[test]
fn fog_follows_structures_placed_in_the_world() {
    let mut world = World::new();
    let mut fog = Fog::new(query::bounds(&world), &VisibilityConfig::default());
    let mut events = Vec::new();

    world::apply(
        &mut world,
        Command::PlaceStructure {
            kind: StructureKind::Core,
            position: Vec2::new(500.0, 500.0),
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::PlaceStructure {
            kind: StructureKind::Relay,
            position: Vec2::new(800.0, 500.0),
        },
        &mut events,
    );
    world::apply(&mut world, Command::Tick, &mut events);
    fog.handle(&events, query::tick_index(&world), &query::structure_view(&world));

    let near_relay = Vec2::new(840.0, 500.0);
    assert!(fog.is_position_visible(near_relay));

    let relay = query::structure_view(&world)
        .iter()
        .find(|snapshot| snapshot.kind == StructureKind::Relay)
        .map(|snapshot| snapshot.id)
        .expect("relay placed");
    let mut events = Vec::new();
    world::apply(&mut world, Command::RemoveStructure { structure: relay }, &mut events);
    world::apply(&mut world, Command::Tick, &mut events);
    assert!(events.contains(&Event::StructureRemoved { structure: relay }));
    fog.handle(&events, query::tick_index(&world), &query::structure_view(&world));

    assert!(!fog.is_position_visible(near_relay));
    assert!(fog.is_position_visible(Vec2::new(500.0, 600.0)));
}
