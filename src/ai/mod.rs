use serde::{Deserialize, Serialize};
use specs::{Entity, Join, WorldExt};

use crate::{
    ecs::{
        SimWorld,
        components::{CombatState, EntityKind, Position},
    },
    notify::SimEvent,
};

/// How an NPC picks who to chase once it has been hit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggroPolicy {
    /// Whoever dealt the most cumulative damage.
    #[default]
    HighestDamage,
    /// Whoever hit last.
    MostRecent,
}

/// Cumulative damage per attacker, kept in first-hit order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DamageMap {
    entries: Vec<(Entity, i64)>,
}

impl DamageMap {
    pub fn record(&mut self, attacker: Entity, amount: i32) {
        match self.entries.iter_mut().find(|(who, _)| *who == attacker) {
            Some((_, total)) => *total += i64::from(amount),
            None => self.entries.push((attacker, i64::from(amount))),
        }
    }

    pub fn damage_from(&self, attacker: Entity) -> i64 {
        self.entries
            .iter()
            .find(|(who, _)| *who == attacker)
            .map_or(0, |(_, total)| *total)
    }

    /// Highest cumulative dealer; ties go to whoever hit first.
    pub fn top(&self) -> Option<Entity> {
        let mut best: Option<(Entity, i64)> = None;
        for (who, total) in &self.entries {
            if best.is_none_or(|(_, top)| *total > top) {
                best = Some((*who, *total));
            }
        }
        best.map(|(who, _)| who)
    }

    pub fn forget(&mut self, attacker: Entity) {
        self.entries.retain(|(who, _)| *who != attacker);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SimWorld {
    pub fn target_of(&self, entity: Entity) -> Option<Entity> {
        self.inspect::<CombatState, _>(entity, |state| state.target)
            .flatten()
    }

    pub fn assign_target(&mut self, entity: Entity, target: Option<Entity>) {
        let changed = self
            .update::<CombatState, _>(entity, |state| std::mem::replace(&mut state.target, target) != target)
            .unwrap_or(false);
        if changed {
            tracing::debug!(?entity, ?target, "target_assigned");
            self.notify(SimEvent::TargetChanged { entity, target });
        }
    }

    /// Books `amount` of damage from `attacker` against an NPC and retargets
    /// it according to its aggro policy.
    pub(crate) fn record_aggro(&mut self, npc: Entity, attacker: Entity, amount: i32) {
        let Some(def_id) = self.inspect::<EntityKind, _>(npc, EntityKind::npc_def).flatten() else {
            return;
        };
        let policy = self
            .definitions()
            .npc(def_id)
            .map(|def| def.aggro)
            .unwrap_or_default();

        let top = self
            .update::<EntityKind, _>(npc, |kind| match kind {
                EntityKind::Npc(data) => {
                    data.damage_map.record(attacker, amount);
                    data.damage_map.top()
                }
                _ => None,
            })
            .flatten();
        let target = match policy {
            AggroPolicy::HighestDamage => top.unwrap_or(attacker),
            AggroPolicy::MostRecent => attacker,
        };
        self.assign_target(npc, Some(target));
    }

    /// Idle NPCs sharing `npc`'s definition on its map join the fight.
    pub(crate) fn notify_swarm(&mut self, npc: Entity, attacker: Entity) {
        let defs = self.definitions();
        let Some(def_id) = self.inspect::<EntityKind, _>(npc, EntityKind::npc_def).flatten() else {
            return;
        };
        if !defs.npc(def_id).is_some_and(|def| def.swarm) {
            return;
        }
        let Some(map) = self.component::<Position>(npc).map(|pos| pos.map) else {
            return;
        };

        let allies: Vec<Entity> = self
            .maps
            .get(map)
            .map(|instance| instance.entities().to_vec())
            .unwrap_or_default()
            .into_iter()
            .filter(|other| *other != npc)
            .filter(|other| {
                self.inspect::<EntityKind, _>(*other, EntityKind::npc_def)
                    .flatten()
                    == Some(def_id)
            })
            .filter(|other| {
                self.inspect::<CombatState, _>(*other, |state| !state.dead && state.target.is_none())
                    .unwrap_or(false)
            })
            .collect();
        for ally in allies {
            self.assign_target(ally, Some(attacker));
        }
    }

    /// Drops `entity` from every target slot and damage map that points at it.
    pub(crate) fn forget_entity(&mut self, entity: Entity) {
        let mut retargeted = Vec::new();
        {
            let entities = self.ecs.entities();
            let mut states = self.ecs.write_storage::<CombatState>();
            let mut kinds = self.ecs.write_storage::<EntityKind>();
            for (other, state) in (&entities, &mut states).join() {
                if state.target == Some(entity) {
                    state.target = None;
                    retargeted.push(other);
                }
                if state.cast_target == Some(entity) {
                    state.cast_target = None;
                }
            }
            for kind in (&mut kinds).join() {
                if let EntityKind::Npc(data) = kind {
                    data.damage_map.forget(entity);
                }
            }
        }
        for other in retargeted {
            self.notify(SimEvent::TargetChanged {
                entity: other,
                target: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use specs::{Builder, World, WorldExt};

    use super::*;

    #[test]
    fn top_dealer_wins_and_ties_keep_the_first() {
        let mut world = World::new();
        let a = world.create_entity().build();
        let b = world.create_entity().build();

        let mut map = DamageMap::default();
        assert_eq!(map.top(), None);
        map.record(a, 10);
        map.record(b, 10);
        assert_eq!(map.top(), Some(a));
        map.record(b, 1);
        assert_eq!(map.top(), Some(b));
        assert_eq!(map.damage_from(b), 11);

        map.forget(b);
        assert_eq!(map.top(), Some(a));
    }
}
