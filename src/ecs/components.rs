use bracket_geometry::prelude::Point;
use serde::{Deserialize, Serialize};
use specs::prelude::{Component, Entity, VecStorage};

use crate::{
    ai::DamageMap,
    data::{ClassId, ItemId, NpcId, ProjectileId, ResourceId, SpellId},
    map::MapId,
    movement::{Blocker, Direction, MoveRoute},
    stats::{Stats, Vitals},
    status::{Statuses, dot::DotEffects},
};

#[derive(Clone, Debug, PartialEq)]
pub struct Position {
    pub map: MapId,
    pub point: Point,
    pub z: i32,
    pub dir: Direction,
    /// Passable entities neither block nor get blocked by other entities.
    pub passable: bool,
}

impl Component for Position {
    type Storage = VecStorage<Self>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKindTag {
    Player,
    Npc,
    Resource,
    Event,
    Projectile,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartyId(pub u32);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerData {
    pub party: Option<PartyId>,
    pub class: Option<ClassId>,
    pub weapon: Option<ItemId>,
    pub lifesteal_percent: i32,
    pub cooldown_reduction_percent: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NpcData {
    pub def: NpcId,
    pub damage_map: DamageMap,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResourceData {
    pub def: ResourceId,
    pub walkable_before: bool,
    pub walkable_after: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EventPageData {
    /// Global pages are shared by every player and block non-player movers.
    pub global: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileData {
    pub def: ProjectileId,
    pub owner: Entity,
    pub spell: Option<SpellId>,
    pub item: Option<ItemId>,
    pub dir: Direction,
    pub travelled: i32,
    pub next_step_at: u64,
}

/// Closed set of entity variants. Kind-dependent rules are answered here once.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityKind {
    Player(PlayerData),
    Npc(NpcData),
    Resource(ResourceData),
    EventPage(EventPageData),
    Projectile(ProjectileData),
}

impl Component for EntityKind {
    type Storage = VecStorage<Self>;
}

impl EntityKind {
    pub fn tag(&self) -> EntityKindTag {
        match self {
            EntityKind::Player(_) => EntityKindTag::Player,
            EntityKind::Npc(_) => EntityKindTag::Npc,
            EntityKind::Resource(_) => EntityKindTag::Resource,
            EntityKind::EventPage(_) => EntityKindTag::Event,
            EntityKind::Projectile(_) => EntityKindTag::Projectile,
        }
    }

    pub fn is_player_kind(&self) -> bool {
        matches!(self, EntityKind::Player(_))
    }

    pub fn is_npc(&self) -> bool {
        matches!(self, EntityKind::Npc(_))
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, EntityKind::Resource(_))
    }

    /// Players and NPCs: the only kinds area spells and projectiles look for.
    pub fn is_combatant(&self) -> bool {
        matches!(self, EntityKind::Player(_) | EntityKind::Npc(_))
    }

    pub fn party(&self) -> Option<PartyId> {
        match self {
            EntityKind::Player(data) => data.party,
            _ => None,
        }
    }

    pub fn npc_def(&self) -> Option<NpcId> {
        match self {
            EntityKind::Npc(data) => Some(data.def),
            _ => None,
        }
    }

    /// What this occupant amounts to for a mover of kind `mover`, or `None`
    /// when the mover may share the tile. `dead` is the occupant's state;
    /// `players_pass` is the zone's player passability.
    pub fn blocker_for(&self, mover: EntityKindTag, dead: bool, players_pass: bool) -> Option<Blocker> {
        match self {
            EntityKind::Player(_) if dead => None,
            EntityKind::Player(_) if mover == EntityKindTag::Player && players_pass => None,
            EntityKind::Player(_) => Some(Blocker::Player),
            EntityKind::Npc(_) if dead => None,
            EntityKind::Npc(_) => Some(Blocker::Npc),
            EntityKind::Resource(data) => {
                let walkable = if dead {
                    data.walkable_after
                } else {
                    data.walkable_before
                };
                match (walkable, dead) {
                    (true, _) => None,
                    (false, true) => Some(Blocker::DeadResource),
                    (false, false) => Some(Blocker::ActiveResource),
                }
            }
            EntityKind::EventPage(_) | EntityKind::Projectile(_) => None,
        }
    }

    pub fn blocks_movement_for(&self, mover: EntityKindTag, dead: bool, players_pass: bool) -> bool {
        self.blocker_for(mover, dead, players_pass).is_some()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PendingCast {
    pub slot: usize,
    pub spell: SpellId,
    pub completes_at: u64,
}

/// Timers are absolute millisecond timestamps; zero means "already elapsed".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CombatState {
    pub attack_at: u64,
    pub combat_until: u64,
    pub regen_at: u64,
    pub move_at: u64,
    pub blocking: bool,
    pub cast: Option<PendingCast>,
    pub cast_target: Option<Entity>,
    /// Aggro target for NPCs, selected target for players.
    pub target: Option<Entity>,
    pub dead: bool,
}

impl Component for CombatState {
    type Storage = VecStorage<Self>;
}

impl CombatState {
    pub fn is_casting(&self) -> bool {
        self.cast.is_some()
    }

    pub fn in_combat(&self, now: u64) -> bool {
        now <= self.combat_until
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SpellSlot {
    pub spell: Option<SpellId>,
    pub ready_at: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpellBook {
    pub slots: Vec<SpellSlot>,
}

impl Component for SpellBook {
    type Storage = VecStorage<Self>;
}

impl SpellBook {
    pub fn with_spells(spells: &[SpellId], capacity: usize) -> Self {
        let mut slots = vec![SpellSlot::default(); capacity.max(spells.len())];
        for (slot, spell) in slots.iter_mut().zip(spells) {
            slot.spell = Some(*spell);
        }
        Self { slots }
    }

    pub fn spell_in(&self, slot: usize) -> Option<SpellId> {
        self.slots.get(slot).and_then(|s| s.spell)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InventorySlot {
    pub item: ItemId,
    pub quantity: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Inventory {
    pub slots: Vec<InventorySlot>,
}

impl Component for Inventory {
    type Storage = VecStorage<Self>;
}

impl Inventory {
    pub fn give(&mut self, item: ItemId, quantity: u32) {
        match self.slots.iter_mut().find(|slot| slot.item == item) {
            Some(slot) => slot.quantity = slot.quantity.saturating_add(quantity),
            None => self.slots.push(InventorySlot { item, quantity }),
        }
    }

    pub fn count(&self, item: ItemId) -> u32 {
        self.slots
            .iter()
            .filter(|slot| slot.item == item)
            .map(|slot| slot.quantity)
            .sum()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Appearance {
    pub name: String,
    pub sprite: String,
    pub face: String,
}

impl Component for Appearance {
    type Storage = VecStorage<Self>;
}

impl Component for Stats {
    type Storage = VecStorage<Self>;
}

impl Component for Vitals {
    type Storage = VecStorage<Self>;
}

impl Component for Statuses {
    type Storage = VecStorage<Self>;
}

impl Component for DotEffects {
    type Storage = VecStorage<Self>;
}

impl Component for MoveRoute {
    type Storage = VecStorage<Self>;
}
