mod common;

use realmcore::{
    Placement,
    data::{DefinitionTables, NpcDefinition, NpcId, SpellDefinition, SpellId},
    ecs::components::Position,
    error::SimError,
    movement::{Direction, MoveRoute, RouteAction, RouteStep},
    notify::SimEvent,
    route_script,
    status::StatusKind,
};

use common::{TOWN, open_town, tile};

const WANDERER: NpcId = NpcId(1);

fn wanderer(h: &mut common::Harness, x: i32, y: i32) -> specs::Entity {
    h.world
        .spawn_npc(WANDERER, Placement::new(TOWN, x, y))
        .expect("wanderer")
}

fn definitions() -> DefinitionTables {
    DefinitionTables::default().with_npc(NpcDefinition::new(WANDERER, "Wanderer", [20, 0]))
}

#[test]
fn routes_step_on_the_move_timer_and_complete_once() {
    let mut h = open_town(definitions());
    let npc = wanderer(&mut h, 2, 2);
    h.world.set_move_route(
        npc,
        MoveRoute::new(vec![
            RouteAction::Move(Direction::Right),
            RouteAction::Move(Direction::Right),
        ]),
    );

    assert_eq!(h.world.step_route(npc, 0), Ok(RouteStep::Performed));
    assert_eq!(tile(&h.world, npc), (TOWN, 3, 2));
    assert_eq!(h.world.step_route(npc, 100), Ok(RouteStep::Waiting));
    assert_eq!(h.world.step_route(npc, 1000), Ok(RouteStep::Performed));
    assert_eq!(tile(&h.world, npc), (TOWN, 4, 2));
    assert_eq!(h.world.step_route(npc, 5000), Ok(RouteStep::Idle));

    let route = h.world.move_route(npc).expect("route");
    assert!(route.is_complete());
    let completions = h
        .drain()
        .into_iter()
        .filter(|event| *event == SimEvent::RouteCompleted { entity: npc })
        .count();
    assert_eq!(completions, 1);
}

#[test]
fn repeating_routes_wrap_without_completing() {
    let mut h = open_town(definitions());
    let npc = wanderer(&mut h, 5, 5);
    h.world.set_move_route(
        npc,
        MoveRoute::new(vec![
            RouteAction::Face(Direction::Left),
            RouteAction::TurnClockwise,
            RouteAction::Turn180,
        ])
        .repeating(),
    );

    for now in [0, 1000] {
        assert_eq!(h.world.step_route(npc, now), Ok(RouteStep::Performed));
    }
    assert_eq!(h.world.move_route(npc).map(|r| r.cursor()), Some(2));
    assert_eq!(h.world.step_route(npc, 2000), Ok(RouteStep::Performed));

    let route = h.world.move_route(npc).expect("route");
    assert_eq!(route.cursor(), 0);
    assert!(!route.is_complete());
    let pos = h.world.component::<Position>(npc).expect("position");
    assert_eq!(pos.dir, Direction::Down);
}

#[test]
fn blocked_steps_hold_the_route_unless_told_to_skip() {
    let mut h = open_town(definitions());
    let stuck = wanderer(&mut h, 5, 0);
    h.world
        .set_move_route(stuck, MoveRoute::new(vec![RouteAction::Move(Direction::Up)]));
    assert_eq!(h.world.step_route(stuck, 0), Ok(RouteStep::Blocked));
    assert_eq!(h.world.move_route(stuck).map(|r| r.cursor()), Some(0));

    let skipper = wanderer(&mut h, 7, 0);
    h.world.set_move_route(
        skipper,
        MoveRoute::new(vec![RouteAction::Move(Direction::Up)]).ignoring_blocks(),
    );
    assert_eq!(h.world.step_route(skipper, 0), Ok(RouteStep::Blocked));
    assert!(h.world.move_route(skipper).expect("route").is_complete());
}

#[test]
fn unknown_codes_are_reported() {
    let mut h = open_town(definitions());
    let npc = wanderer(&mut h, 5, 5);
    h.world.set_move_route(
        npc,
        MoveRoute::new(vec![RouteAction::from_code(50)]),
    );

    assert_eq!(
        h.world.step_route(npc, 0),
        Err(SimError::UnrecognizedAction { code: 50 })
    );
}

#[test]
fn scripted_routes_run_through_the_tick_loop() {
    let mut h = open_town(definitions());
    let npc = wanderer(&mut h, 5, 5);
    h.world
        .set_move_route(npc, route_script::from_str("# square\nwd\nsa\n"));

    for tick in 0..8 {
        h.world.advance(tick * 1000);
    }

    assert_eq!(tile(&h.world, npc), (TOWN, 5, 5));
    assert!(h.world.move_route(npc).expect("route").is_complete());
}

#[test]
fn rooted_walkers_cannot_step_back() {
    let mut h = open_town(definitions());
    let npc = wanderer(&mut h, 5, 5);
    let roots = SpellDefinition::new(SpellId(3), "Roots");
    h.world.apply_status(npc, &roots, StatusKind::Snare, 5000, 0);
    h.world
        .set_move_route(npc, MoveRoute::new(vec![RouteAction::StepBack]));

    assert_eq!(h.world.step_route(npc, 0), Ok(RouteStep::Blocked));
    assert_eq!(tile(&h.world, npc), (TOWN, 5, 5));
    assert_eq!(h.world.move_route(npc).map(|r| r.cursor()), Some(0));

    h.world.remove_statuses(npc, StatusKind::Snare);
    assert_eq!(h.world.step_route(npc, 0), Ok(RouteStep::Performed));
    assert_ne!(tile(&h.world, npc), (TOWN, 5, 5));
}
