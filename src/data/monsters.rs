use serde::{Deserialize, Serialize};

use crate::{
    ai::AggroPolicy,
    stats::{STAT_COUNT, VITAL_COUNT},
};

use super::{ClassId, ItemId, NpcId, ResourceId, SpellId, items::WeaponProfile};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcDrop {
    pub item: ItemId,
    #[serde(default = "one")]
    pub quantity: u32,
    /// Percent chance the NPC carries this item when it spawns.
    #[serde(default = "hundred")]
    pub chance: i32,
}

fn one() -> u32 {
    1
}

fn hundred() -> i32 {
    100
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NpcDefinition {
    pub id: NpcId,
    pub name: String,
    #[serde(default)]
    pub sprite: String,
    pub max_vitals: [i32; VITAL_COUNT],
    #[serde(default)]
    pub stats: [i32; STAT_COUNT],
    #[serde(default)]
    pub regen_percent: [i32; VITAL_COUNT],
    pub weapon: WeaponProfile,
    #[serde(default)]
    pub aggro: AggroPolicy,
    /// NPCs of the same definition on the map join in when one is hit.
    #[serde(default)]
    pub swarm: bool,
    #[serde(default)]
    pub attack_allies: bool,
    /// Other NPC definitions this one will fight.
    #[serde(default)]
    pub hostile_npcs: Vec<NpcId>,
    #[serde(default)]
    pub drops: Vec<NpcDrop>,
    #[serde(default)]
    pub spells: Vec<SpellId>,
}

impl NpcDefinition {
    pub fn new(id: NpcId, name: impl Into<String>, max_vitals: [i32; VITAL_COUNT]) -> Self {
        Self {
            id,
            name: name.into(),
            sprite: String::new(),
            max_vitals,
            stats: [0; STAT_COUNT],
            regen_percent: [0; VITAL_COUNT],
            weapon: WeaponProfile::physical(1),
            aggro: AggroPolicy::default(),
            swarm: false,
            attack_allies: false,
            hostile_npcs: Vec::new(),
            drops: Vec::new(),
            spells: Vec::new(),
        }
    }

    pub fn can_fight(&self, other: &NpcDefinition) -> bool {
        if self.id == other.id {
            self.attack_allies
        } else {
            self.hostile_npcs.contains(&other.id)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub id: ResourceId,
    pub name: String,
    pub max_health: i32,
    #[serde(default)]
    pub walkable_before: bool,
    #[serde(default = "yes")]
    pub walkable_after: bool,
    #[serde(default)]
    pub drops: Vec<NpcDrop>,
}

fn yes() -> bool {
    true
}

impl ResourceDefinition {
    pub fn new(id: ResourceId, name: impl Into<String>, max_health: i32) -> Self {
        Self {
            id,
            name: name.into(),
            max_health,
            walkable_before: false,
            walkable_after: true,
            drops: Vec::new(),
        }
    }

    pub fn walkable(&self, dead: bool) -> bool {
        if dead {
            self.walkable_after
        } else {
            self.walkable_before
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub id: ClassId,
    pub name: String,
    pub base_stats: [i32; STAT_COUNT],
    pub base_vitals: [i32; VITAL_COUNT],
    #[serde(default)]
    pub regen_percent: [i32; VITAL_COUNT],
    /// Striking profile when no weapon is equipped; the server default applies otherwise.
    #[serde(default)]
    pub unarmed: Option<WeaponProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npc_hostility_follows_definition() {
        let mut wolf = NpcDefinition::new(NpcId(1), "Wolf", [30, 0]);
        let mut sheep = NpcDefinition::new(NpcId(2), "Sheep", [10, 0]);
        assert!(!wolf.can_fight(&sheep));
        assert!(!wolf.can_fight(&wolf.clone()));

        wolf.hostile_npcs.push(NpcId(2));
        assert!(wolf.can_fight(&sheep));
        assert!(!sheep.can_fight(&wolf));

        sheep.attack_allies = true;
        assert!(sheep.can_fight(&sheep.clone()));
    }

    #[test]
    fn resource_walkability_depends_on_state() {
        let tree = ResourceDefinition::new(ResourceId(1), "Tree", 10);
        assert!(!tree.walkable(false));
        assert!(tree.walkable(true));
    }
}
