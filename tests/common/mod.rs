use crossbeam_channel::Receiver;
use realmcore::{
    Placement, PlayerTemplate, SimConfig, SimWorld,
    combat::FlatFormula,
    data::DefinitionTables,
    ecs::components::Position,
    map::{MapId, MapInstance, MapRegistry},
    notify::SimEvent,
    rng::ScriptedRolls,
};
use specs::Entity;

pub const TOWN: MapId = MapId(1);

/// A world with flat damage, no crits and every drop roll at 100.
pub struct Harness {
    pub world: SimWorld,
    pub events: Receiver<SimEvent>,
}

impl Harness {
    pub fn drain(&self) -> Vec<SimEvent> {
        self.events.try_iter().collect()
    }
}

pub fn town(width: i32, height: i32) -> MapRegistry {
    let mut maps = MapRegistry::new();
    maps.insert(MapInstance::new(TOWN, width, height));
    maps
}

pub fn harness(config: SimConfig, maps: MapRegistry, defs: DefinitionTables) -> Harness {
    let (tx, events) = crossbeam_channel::unbounded();
    let world = SimWorld::new(config, maps, defs)
        .expect("valid world")
        .with_formula(FlatFormula)
        .with_rng(ScriptedRolls::constant(100))
        .with_notifier(tx);
    Harness { world, events }
}

pub fn open_town(defs: DefinitionTables) -> Harness {
    harness(SimConfig::default(), town(10, 10), defs)
}

/// Player with speed 10 and 100/100 vitals.
pub fn fighter(world: &mut SimWorld, x: i32, y: i32) -> Entity {
    world
        .spawn_player(
            PlayerTemplate::new("fighter", [5, 5, 0, 0, 10], [100, 100]),
            Placement::new(TOWN, x, y),
        )
        .expect("spawn fighter")
}

pub fn tile(world: &SimWorld, entity: Entity) -> (MapId, i32, i32) {
    let pos = world.component::<Position>(entity).expect("position");
    (pos.map, pos.point.x, pos.point.y)
}
