use serde::{Deserialize, Serialize};
use specs::Entity;

use crate::{
    data::SpellId,
    ecs::{
        SimWorld,
        components::{Appearance, CombatState, EntityKindTag, Position},
    },
    map::MapId,
    movement::Direction,
    stats::{STAT_COUNT, Stats, VITAL_COUNT, Vitals},
    status::{StatusKind, Statuses},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub spell: SpellId,
    pub kind: StatusKind,
    pub remaining_ms: u64,
    pub total_ms: u64,
    pub shield: [i32; VITAL_COUNT],
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub data: String,
}

/// Read-only view of one entity for clients and tooling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: u32,
    pub kind: EntityKindTag,
    pub name: String,
    pub sprite: String,
    pub map: MapId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub dir: Direction,
    pub vitals: [i32; VITAL_COUNT],
    pub max_vitals: [i32; VITAL_COUNT],
    pub stats: [i32; STAT_COUNT],
    pub statuses: Vec<StatusSummary>,
    pub dead: bool,
    pub blocking: bool,
    pub casting: Option<SpellId>,
    pub target: Option<u32>,
}

impl SimWorld {
    pub fn snapshot(&self, entity: Entity, now: u64) -> Option<EntitySnapshot> {
        let pos = self.component::<Position>(entity)?;
        let kind = self.kind_tag(entity)?;
        let appearance = self.component::<Appearance>(entity).unwrap_or_default();
        let state = self.component::<CombatState>(entity).unwrap_or_default();
        let (vitals, max_vitals) = self
            .inspect::<Vitals, _>(entity, |v| (v.current_all(), v.max_all()))
            .unwrap_or(([0; VITAL_COUNT], [0; VITAL_COUNT]));
        let statuses = self
            .inspect::<Statuses, _>(entity, |statuses| {
                statuses
                    .iter()
                    .map(|status| StatusSummary {
                        spell: status.spell,
                        kind: status.kind,
                        remaining_ms: status.remaining_ms(now),
                        total_ms: status.total_ms(),
                        shield: status.shield,
                        data: status.data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(EntitySnapshot {
            id: entity.id(),
            kind,
            name: appearance.name,
            sprite: appearance.sprite,
            map: pos.map,
            x: pos.point.x,
            y: pos.point.y,
            z: pos.z,
            dir: pos.dir,
            vitals,
            max_vitals,
            stats: self
                .inspect::<Stats, _>(entity, Stats::effective_all)
                .unwrap_or([0; STAT_COUNT]),
            statuses,
            dead: state.dead,
            blocking: state.blocking,
            casting: state.cast.map(|cast| cast.spell),
            target: state.target.map(|target| target.id()),
        })
    }

    /// Snapshots of every live map entity in deterministic order.
    pub fn snapshots(&self, now: u64) -> Vec<EntitySnapshot> {
        self.ordered_entities()
            .into_iter()
            .filter_map(|entity| self.snapshot(entity, now))
            .collect()
    }
}
