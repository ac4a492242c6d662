use serde::{Deserialize, Serialize};

use crate::{
    combat::formula::DamageType,
    map::MapId,
    movement::Direction,
    stats::{STAT_COUNT, StatKind, VITAL_COUNT},
    status::StatusKind,
};

use super::{AnimationId, ProjectileId, SpellId};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpellKind {
    #[default]
    CombatSpell,
    Warp,
    WarpTo,
    Dash,
    /// Runs an event script; resolved like a combat spell by the core.
    Event,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetType {
    #[default]
    SelfTarget,
    Single,
    AoE,
    Projectile,
    OnHit,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatData {
    pub target: TargetType,
    pub cast_range: i32,
    pub hit_radius: i32,
    /// Friendly spells only touch allies; hostile spells only touch enemies.
    pub friendly: bool,
    /// Positive values damage, negative values heal.
    pub vital_diff: [i32; VITAL_COUNT],
    pub stat_diff: [i32; STAT_COUNT],
    pub percent_stat_diff: [i32; STAT_COUNT],
    pub duration_ms: u64,
    pub effect: Option<StatusKind>,
    pub hot_dot: bool,
    pub hot_dot_interval_ms: u64,
    pub damage_type: DamageType,
    pub scaling_stat: StatKind,
    pub scaling: i32,
    pub crit_chance: i32,
    pub crit_multiplier: f64,
    pub on_hit_duration_ms: u64,
    pub transform_sprite: String,
    pub projectile: Option<ProjectileId>,
}

impl Default for CombatData {
    fn default() -> Self {
        Self {
            target: TargetType::SelfTarget,
            cast_range: 0,
            hit_radius: 0,
            friendly: false,
            vital_diff: [0; VITAL_COUNT],
            stat_diff: [0; STAT_COUNT],
            percent_stat_diff: [0; STAT_COUNT],
            duration_ms: 0,
            effect: None,
            hot_dot: false,
            hot_dot_interval_ms: 0,
            damage_type: DamageType::Physical,
            scaling_stat: StatKind::Attack,
            scaling: 0,
            crit_chance: 0,
            crit_multiplier: 1.5,
            on_hit_duration_ms: 0,
            transform_sprite: String::new(),
            projectile: None,
        }
    }
}

impl CombatData {
    pub fn changes_stats(&self) -> bool {
        self.stat_diff.iter().any(|diff| *diff != 0)
            || self.percent_stat_diff.iter().any(|diff| *diff != 0)
    }

    /// Flat buff amount for one stat, given the stat's base value.
    pub fn buff_amount(&self, kind: StatKind, base: i32) -> i32 {
        let idx = kind.index();
        self.stat_diff[idx] + base * self.percent_stat_diff[idx] / 100
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarpData {
    pub map: MapId,
    pub x: i32,
    pub y: i32,
    /// Facing after the warp; `None` keeps the current one.
    #[serde(default)]
    pub dir: Option<Direction>,
}

/// Which obstruction classes a dash or knockback may pass through.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashFlags {
    pub ignore_map_blocks: bool,
    pub ignore_active_resources: bool,
    pub ignore_dead_resources: bool,
    pub ignore_z_dimension: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpellDefinition {
    pub id: SpellId,
    pub name: String,
    #[serde(default)]
    pub kind: SpellKind,
    #[serde(default)]
    pub combat: CombatData,
    #[serde(default)]
    pub warp: Option<WarpData>,
    #[serde(default)]
    pub dash: DashFlags,
    #[serde(default)]
    pub cooldown_ms: u64,
    #[serde(default)]
    pub cast_time_ms: u64,
    #[serde(default)]
    pub vital_cost: [i32; VITAL_COUNT],
    #[serde(default)]
    pub hit_animation: Option<AnimationId>,
    #[serde(default)]
    pub cast_animation: Option<AnimationId>,
}

impl SpellDefinition {
    pub fn new(id: SpellId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: SpellKind::CombatSpell,
            combat: CombatData::default(),
            warp: None,
            dash: DashFlags::default(),
            cooldown_ms: 0,
            cast_time_ms: 0,
            vital_cost: [0; VITAL_COUNT],
            hit_animation: None,
            cast_animation: None,
        }
    }

    pub fn with_kind(mut self, kind: SpellKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_combat(mut self, combat: CombatData) -> Self {
        self.combat = combat;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileDefinition {
    pub id: ProjectileId,
    pub name: String,
    /// Tiles travelled before the projectile fizzles.
    #[serde(default = "default_projectile_range")]
    pub range: i32,
    /// Milliseconds per tile.
    #[serde(default = "default_projectile_speed")]
    pub speed_ms: u64,
    #[serde(default)]
    pub knockback: i32,
    #[serde(default)]
    pub pass: DashFlags,
    /// Spell resolved on impact in place of the shooter's weapon.
    #[serde(default)]
    pub spell: Option<SpellId>,
    #[serde(default)]
    pub animation: Option<AnimationId>,
}

fn default_projectile_range() -> i32 {
    5
}

fn default_projectile_speed() -> u64 {
    100
}

impl ProjectileDefinition {
    pub fn new(id: ProjectileId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            range: default_projectile_range(),
            speed_ms: default_projectile_speed(),
            knockback: 0,
            pass: DashFlags::default(),
            spell: None,
            animation: None,
        }
    }
}
