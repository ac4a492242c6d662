mod common;

use bracket_geometry::prelude::Point;
use realmcore::{
    Intent, Placement, SimConfig,
    data::{DashFlags, DefinitionTables, NpcDefinition, NpcId, SpellDefinition, SpellId},
    ecs::components::Position,
    map::{MapAttribute, MapId, MapInstance, MapRegistry, ZoneType},
    movement::{Blocker, Direction, MoveOutcome, StepResult},
    notify::SimEvent,
    status::StatusKind,
};

use common::{TOWN, fighter, harness, open_town, tile, town};

const GUARD: NpcId = NpcId(1);

fn definitions() -> DefinitionTables {
    DefinitionTables::default().with_npc(NpcDefinition::new(GUARD, "Guard", [30, 0]))
}

fn facing(h: &common::Harness, entity: specs::Entity) -> Direction {
    h.world.component::<Position>(entity).expect("position").dir
}

#[test]
fn dash_stops_before_a_blocked_tile_and_keeps_facing() {
    let mut maps = town(10, 10);
    if let Some(map) = maps.get_mut(TOWN) {
        map.set_attribute(Point::new(4, 5), MapAttribute::Blocked);
    }
    let mut h = harness(SimConfig::default(), maps, definitions());
    let hero = fighter(&mut h.world, 1, 5);
    h.world.face(hero, Direction::Up);
    h.drain();

    let travelled = h.world.dash(hero, 5, Direction::Right, DashFlags::default(), 0);

    assert_eq!(travelled, 2);
    assert_eq!(tile(&h.world, hero), (TOWN, 3, 5));
    assert_eq!(facing(&h, hero), Direction::Up);
    let events = h.drain();
    assert!(events.contains(&SimEvent::Dashed {
        entity: hero,
        map: TOWN,
        x: 3,
        y: 5,
        range: 2,
        transmission_ms: 100,
    }));
    assert!(!events.iter().any(|e| matches!(e, SimEvent::DirectionChanged { .. })));
}

#[test]
fn dash_flags_pass_map_blocks_but_never_occupants() {
    let mut maps = town(10, 10);
    if let Some(map) = maps.get_mut(TOWN) {
        map.set_attribute(Point::new(4, 5), MapAttribute::Blocked);
    }
    let mut h = harness(SimConfig::default(), maps, definitions());
    let hero = fighter(&mut h.world, 1, 5);
    h.world
        .spawn_npc(GUARD, Placement::new(TOWN, 7, 5))
        .expect("guard");

    let flags = DashFlags {
        ignore_map_blocks: true,
        ..DashFlags::default()
    };
    assert_eq!(h.world.dash(hero, 8, Direction::Right, flags, 0), 5);
    assert_eq!(tile(&h.world, hero), (TOWN, 6, 5));
}

#[test]
fn players_block_each_other_unless_the_zone_lets_them_pass() {
    let mut h = open_town(definitions());
    let a = fighter(&mut h.world, 4, 4);
    fighter(&mut h.world, 5, 4);
    assert_eq!(
        h.world.move_entity(a, Direction::Right, 0),
        StepResult::Blocked(MoveOutcome::BlockedByEntity(Blocker::Player))
    );

    let config = SimConfig {
        passable_zones: vec![ZoneType::Normal],
        ..SimConfig::default()
    };
    let mut h = harness(config, town(10, 10), definitions());
    let a = fighter(&mut h.world, 4, 4);
    fighter(&mut h.world, 5, 4);
    assert_eq!(h.world.move_entity(a, Direction::Right, 0), StepResult::Moved);
    assert_eq!(tile(&h.world, a), (TOWN, 5, 4));
}

#[test]
fn steps_wait_for_the_move_timer_and_statuses() {
    let mut h = open_town(definitions());
    let hero = fighter(&mut h.world, 4, 4);

    assert_eq!(h.world.move_entity(hero, Direction::Down, 0), StepResult::Moved);
    assert_eq!(h.world.move_entity(hero, Direction::Down, 10), StepResult::NotReady);

    let ready = h.world.movement_time_of(hero);
    let snare = SpellDefinition::new(SpellId(9), "Roots");
    h.world.apply_status(hero, &snare, StatusKind::Snare, 5000, ready);
    assert_eq!(h.world.move_entity(hero, Direction::Left, ready), StepResult::NotReady);
    assert_eq!(facing(&h, hero), Direction::Left);
    assert_eq!(tile(&h.world, hero), (TOWN, 4, 5));
}

#[test]
fn z_levels_gate_tiles_and_gateways_switch_levels() {
    let mut maps = town(10, 10);
    if let Some(map) = maps.get_mut(TOWN) {
        map.set_attribute(
            Point::new(5, 4),
            MapAttribute::ZDimension {
                blocked_level: Some(0),
                gateway_to: None,
            },
        );
        map.set_attribute(
            Point::new(4, 5),
            MapAttribute::ZDimension {
                blocked_level: None,
                gateway_to: Some(1),
            },
        );
    }
    let mut h = harness(SimConfig::default(), maps, definitions());
    let hero = fighter(&mut h.world, 4, 4);

    assert_eq!(h.world.can_move(hero, Direction::Right), MoveOutcome::BlockedByZLevel);
    assert_eq!(h.world.move_entity(hero, Direction::Down, 0), StepResult::Moved);
    assert_eq!(h.world.component::<Position>(hero).map(|p| p.z), Some(1));
    assert!(h.drain().contains(&SimEvent::ZChanged { entity: hero, z: 1 }));
}

#[test]
fn slides_chain_until_the_limit() {
    let mut maps = town(12, 10);
    if let Some(map) = maps.get_mut(TOWN) {
        for x in 3..=8 {
            map.set_attribute(
                Point::new(x, 5),
                MapAttribute::Slide {
                    direction: Some(Direction::Right),
                },
            );
        }
    }
    let config = SimConfig {
        slide_chain_limit: 2,
        ..SimConfig::default()
    };
    let mut h = harness(config, maps, definitions());
    let hero = fighter(&mut h.world, 2, 5);

    assert_eq!(h.world.move_entity(hero, Direction::Right, 0), StepResult::Moved);
    assert_eq!(tile(&h.world, hero), (TOWN, 5, 5));
    assert_eq!(
        h.world.can_move(hero, Direction::Left),
        MoveOutcome::SlideBlocked
    );
}

#[test]
fn steps_cross_into_linked_maps() {
    let mut maps = MapRegistry::new();
    maps.insert(MapInstance::new(TOWN, 10, 10));
    maps.insert(MapInstance::new(MapId(2), 10, 10));
    maps.link_horizontal(TOWN, MapId(2));
    let mut h = harness(SimConfig::default(), maps, definitions());
    let hero = fighter(&mut h.world, 9, 5);

    assert_eq!(h.world.move_entity(hero, Direction::Right, 0), StepResult::Moved);
    assert_eq!(tile(&h.world, hero), (MapId(2), 0, 5));
    let fields = h.world.maps().get(MapId(2)).expect("fields");
    assert!(fields.entities().contains(&hero));
    let town = h.world.maps().get(TOWN).expect("town");
    assert!(!town.entities().contains(&hero));

    assert_eq!(h.world.can_move(hero, Direction::Up), MoveOutcome::Walkable);
    let corner = fighter(&mut h.world, 0, 0);
    assert_eq!(h.world.can_move(corner, Direction::Up), MoveOutcome::OutOfBounds);
}

#[test]
fn global_event_pages_block_only_non_players() {
    let mut h = open_town(definitions());
    let hero = fighter(&mut h.world, 4, 4);
    let guard = h
        .world
        .spawn_npc(GUARD, Placement::new(TOWN, 6, 5))
        .expect("guard");
    h.world
        .spawn_event_page(Placement::new(TOWN, 5, 5), true, false)
        .expect("global page");
    h.world
        .spawn_event_page(Placement::new(TOWN, 6, 6), false, false)
        .expect("local page");

    assert_eq!(
        h.world.can_move(guard, Direction::Left),
        MoveOutcome::BlockedByEntity(Blocker::Event)
    );
    assert_eq!(h.world.can_move(guard, Direction::Down), MoveOutcome::Walkable);
    assert_eq!(h.world.can_move(hero, Direction::DownRight), MoveOutcome::Walkable);
}

#[test]
fn queued_intents_apply_on_the_next_tick() {
    let mut h = open_town(definitions());
    let hero = fighter(&mut h.world, 4, 4);
    let intents = h.world.intent_sender();
    intents
        .send(Intent::Move {
            entity: hero,
            dir: Direction::Up,
        })
        .expect("queue");
    assert_eq!(tile(&h.world, hero), (TOWN, 4, 4));

    h.world.advance(0);

    assert_eq!(tile(&h.world, hero), (TOWN, 4, 3));
    assert!(h.drain().contains(&SimEvent::Moved {
        entity: hero,
        map: TOWN,
        x: 4,
        y: 3,
        dir: Direction::Up,
    }));
}
