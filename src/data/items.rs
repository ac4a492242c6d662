use serde::{Deserialize, Serialize};

use crate::{combat::formula::DamageType, stats::{STAT_COUNT, StatKind}};

use super::{AnimationId, ItemId, ProjectileId};

/// Everything an auto attack needs to know about the striking hand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub damage: i32,
    #[serde(default)]
    pub damage_type: DamageType,
    #[serde(default = "default_scaling_stat")]
    pub scaling_stat: StatKind,
    #[serde(default)]
    pub scaling: i32,
    #[serde(default)]
    pub crit_chance: i32,
    #[serde(default = "default_crit_multiplier")]
    pub crit_multiplier: f64,
    #[serde(default)]
    pub attack_animation: Option<AnimationId>,
}

fn default_scaling_stat() -> StatKind {
    StatKind::Attack
}

fn default_crit_multiplier() -> f64 {
    1.5
}

impl WeaponProfile {
    pub fn physical(damage: i32) -> Self {
        Self {
            damage,
            damage_type: DamageType::Physical,
            scaling_stat: StatKind::Attack,
            scaling: 0,
            crit_chance: 0,
            crit_multiplier: default_crit_multiplier(),
            attack_animation: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: ItemId,
    pub name: String,
    /// Bound items never leave a player's inventory on death.
    #[serde(default)]
    pub bound: bool,
    #[serde(default)]
    pub weapon: Option<WeaponProfile>,
    /// Ranged weapons fire this projectile instead of striking adjacent tiles.
    #[serde(default)]
    pub projectile: Option<ProjectileId>,
    #[serde(default)]
    pub stat_bonus: [i32; STAT_COUNT],
    #[serde(default)]
    pub lifesteal_percent: i32,
    #[serde(default)]
    pub cooldown_reduction_percent: i32,
}

impl ItemDefinition {
    pub fn new(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bound: false,
            weapon: None,
            projectile: None,
            stat_bonus: [0; STAT_COUNT],
            lifesteal_percent: 0,
            cooldown_reduction_percent: 0,
        }
    }

    pub fn bound(mut self) -> Self {
        self.bound = true;
        self
    }

    pub fn with_weapon(mut self, weapon: WeaponProfile) -> Self {
        self.weapon = Some(weapon);
        self
    }
}
