use specs::Entity;

use crate::{
    combat::attack::AttackParams,
    data::{SpellDefinition, SpellId},
    ecs::SimWorld,
};

/// A recurring damage or heal tick owned by one attacker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DotInstance {
    pub attacker: Entity,
    pub spell: SpellId,
    pub interval_ms: u64,
    pub next_tick_at: u64,
    pub remaining: i32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DotEffects {
    pub effects: Vec<DotInstance>,
}

impl DotEffects {
    pub fn contains(&self, spell: SpellId, attacker: Entity) -> bool {
        self.effects
            .iter()
            .any(|dot| dot.spell == spell && dot.attacker == attacker)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }
}

impl SimWorld {
    /// Starts a DoT/HoT of `spell` from `attacker` on `target`. The cast itself
    /// already counts as the first tick. Returns false when nothing was added.
    pub fn add_dot(&mut self, attacker: Entity, target: Entity, spell: &SpellDefinition, now: u64) -> bool {
        let interval = spell.combat.hot_dot_interval_ms;
        if interval < 1 {
            return false;
        }
        let remaining = (spell.combat.duration_ms / interval) as i32 - 1;
        let dot = DotInstance {
            attacker,
            spell: spell.id,
            interval_ms: interval,
            next_tick_at: now + interval,
            remaining,
        };
        self.update::<DotEffects, _>(target, |dots| {
            if dots.contains(dot.spell, dot.attacker) {
                false
            } else {
                dots.effects.push(dot);
                true
            }
        })
        .unwrap_or(false)
    }

    pub fn dot_count(&self, entity: Entity) -> usize {
        self.inspect::<DotEffects, _>(entity, DotEffects::len)
            .unwrap_or(0)
    }

    /// Fires every due tick on `target` and drops finished or orphaned DoTs.
    pub(crate) fn tick_dots(&mut self, target: Entity, now: u64) {
        let Some(current) = self.component::<DotEffects>(target) else {
            return;
        };
        if current.is_empty() {
            return;
        }

        let mut kept = Vec::with_capacity(current.len());
        let mut due = Vec::new();
        for mut dot in current.effects {
            if dot.remaining <= 0 || !self.exists(dot.attacker) {
                continue;
            }
            if dot.next_tick_at <= now {
                due.push((dot.attacker, dot.spell));
                dot.next_tick_at = now + dot.interval_ms;
                dot.remaining -= 1;
            }
            kept.push(dot);
        }
        self.update::<DotEffects, _>(target, |dots| dots.effects = kept);

        let defs = self.definitions();
        for (attacker, spell) in due {
            let Some(def) = defs.spell(spell) else {
                continue;
            };
            let params = AttackParams::from_spell(def);
            self.attack(attacker, target, &params, now);
        }
    }
}
