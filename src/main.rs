use std::{env, path::PathBuf, process::ExitCode};

use bracket_geometry::prelude::Point;
use realmcore::{
    ConfigError, Intent, Placement, PlayerTemplate, SimConfig, SimError, SimWorld,
    combat::DamageType,
    data::{
        ClassDefinition, ClassId, CombatData, DefinitionError, DefinitionTables, NpcDefinition,
        NpcId, ResourceDefinition, ResourceId, SpellDefinition, SpellId, SpellKind, TargetType,
        WeaponProfile,
    },
    map::{MapAttribute, MapId, MapInstance, MapRegistry},
    movement::Direction,
    notify::SimEvent,
    route_script,
    stats::StatKind,
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const TICK_MS: u64 = 100;
const DEFAULT_TICKS: u64 = 60;

const FIREBOLT: SpellId = SpellId(1);
const MEND: SpellId = SpellId(2);
const BLINK: SpellId = SpellId(3);
const WARRIOR: ClassId = ClassId(1);
const SLIME: NpcId = NpcId(1);
const OAK: ResourceId = ResourceId(1);

#[derive(Debug, Error)]
enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Definitions(#[from] DefinitionError),
    #[error(transparent)]
    Simulation(#[from] SimError),
    #[error("failed to encode snapshots: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid argument `{0}`")]
    Argument(String),
}

#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    definitions: Option<PathBuf>,
    ticks: Option<u64>,
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, RunnerError> {
        let mut options = Options::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => options.config = args.next().map(PathBuf::from),
                "--definitions" => options.definitions = args.next().map(PathBuf::from),
                "--ticks" => {
                    let raw = args.next().unwrap_or_default();
                    let ticks = raw.parse().map_err(|_| RunnerError::Argument(raw))?;
                    options.ticks = Some(ticks);
                }
                other => return Err(RunnerError::Argument(other.to_string())),
            }
        }
        Ok(options)
    }
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "runner_failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn run() -> Result<(), RunnerError> {
    let options = Options::parse(env::args().skip(1))?;
    let config = match &options.config {
        Some(path) => SimConfig::from_path(path)?,
        None => SimConfig::default(),
    };
    let definitions = match &options.definitions {
        Some(path) => DefinitionTables::from_path(path)?,
        None => builtin_definitions(),
    };
    tracing::info!(
        config = ?options.config,
        definitions = ?options.definitions,
        "runner_starting"
    );

    let maps = demo_maps(&config);
    let (events_tx, events_rx) = crossbeam_channel::unbounded::<SimEvent>();
    let mut world = SimWorld::new(config, maps, definitions)?.with_notifier(events_tx);

    let warrior = ClassDefinition {
        id: WARRIOR,
        name: "Warrior".into(),
        base_stats: [12, 6, 8, 4, 10],
        base_vitals: [120, 60],
        regen_percent: [5, 10],
        unarmed: Some(WeaponProfile::physical(4)),
    };
    let hero = world.spawn_player(
        PlayerTemplate::from_class("Hero", &warrior).with_spells([FIREBOLT, MEND, BLINK]),
        Placement::new(MapId(1), 4, 4).facing(Direction::Right),
    )?;
    let slimes = [
        world.spawn_npc(SLIME, Placement::new(MapId(1), 8, 4))?,
        world.spawn_npc(SLIME, Placement::new(MapId(1), 9, 6))?,
    ];
    world.spawn_resource(OAK, Placement::new(MapId(1), 4, 8))?;
    world.set_move_route(slimes[1], route_script::from_str("@repeat\n@ignore-blocked\nwwss"));

    let intents = world.intent_sender();
    let ticks = options.ticks.unwrap_or(DEFAULT_TICKS);
    for tick in 0..ticks {
        let now = tick * TICK_MS;
        let intent = match tick {
            0 => Intent::Cast {
                entity: hero,
                slot: 0,
                target: Some(slimes[0]),
            },
            5..=7 => Intent::Move {
                entity: hero,
                dir: Direction::Right,
            },
            20 => Intent::Cast {
                entity: hero,
                slot: 1,
                target: None,
            },
            _ => Intent::Attack {
                entity: hero,
                target: slimes[0],
            },
        };
        if intents.send(intent).is_err() {
            tracing::warn!(tick, "intent_queue_closed");
        }
        world.advance(now);
    }

    let delivered = events_rx.try_iter().count();
    let now = ticks.saturating_sub(1) * TICK_MS;
    tracing::info!(ticks, delivered, "runner_finished");
    println!("{}", serde_json::to_string_pretty(&world.snapshots(now))?);
    Ok(())
}

fn demo_maps(config: &SimConfig) -> MapRegistry {
    let mut town = MapInstance::new(MapId(1), config.map_width, config.map_height);
    for y in 0..config.map_height {
        town.set_attribute(Point::new(12, y), MapAttribute::Blocked);
    }
    town.set_attribute(
        Point::new(6, 10),
        MapAttribute::Slide {
            direction: Some(Direction::Right),
        },
    );
    let fields = MapInstance::new(MapId(2), config.map_width, config.map_height);

    let mut maps = MapRegistry::new();
    maps.insert(town);
    maps.insert(fields);
    maps.link_horizontal(MapId(1), MapId(2));
    maps
}

fn builtin_definitions() -> DefinitionTables {
    let firebolt = SpellDefinition::new(FIREBOLT, "Firebolt").with_combat(CombatData {
        target: TargetType::Single,
        cast_range: 6,
        vital_diff: [14, 0],
        scaling: 50,
        scaling_stat: StatKind::AbilityPower,
        damage_type: DamageType::Magic,
        ..CombatData::default()
    });
    let mend = SpellDefinition::new(MEND, "Mend").with_combat(CombatData {
        friendly: true,
        vital_diff: [-20, 0],
        ..CombatData::default()
    });
    let blink = SpellDefinition::new(BLINK, "Blink")
        .with_kind(SpellKind::Dash)
        .with_combat(CombatData {
            cast_range: 3,
            ..CombatData::default()
        });

    let mut slime = NpcDefinition::new(SLIME, "Slime", [40, 0]);
    slime.stats = [4, 0, 2, 2, 3];
    slime.swarm = true;

    DefinitionTables::default()
        .with_spell(SpellDefinition {
            cooldown_ms: 1500,
            vital_cost: [0, 10],
            ..firebolt
        })
        .with_spell(SpellDefinition {
            cooldown_ms: 4000,
            ..mend
        })
        .with_spell(blink)
        .with_npc(slime)
        .with_resource(ResourceDefinition::new(OAK, "Oak", 30))
}
