pub mod dot;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use specs::Entity;

use crate::{
    data::{SpellDefinition, SpellId},
    ecs::SimWorld,
    notify::{CombatMessage, SimEvent},
    stats::{Stats, VITAL_COUNT, Vital},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    /// Marker installed alongside stat buffs and recurring effects.
    Buff,
    Silence,
    Stun,
    Snare,
    Blind,
    Stealth,
    Transform,
    Cleanse,
    Invulnerable,
    Shield,
    Sleep,
    OnHit,
    Taunt,
}

impl StatusKind {
    pub fn prevents_casting(self) -> bool {
        matches!(self, StatusKind::Silence | StatusKind::Stun | StatusKind::Sleep)
    }

    pub fn prevents_moving(self) -> bool {
        matches!(self, StatusKind::Stun | StatusKind::Snare | StatusKind::Sleep)
    }

    /// Statuses that make adjacent weapon attacks miss.
    pub fn causes_miss(self) -> bool {
        matches!(self, StatusKind::Stun | StatusKind::Blind | StatusKind::Sleep)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusInstance {
    pub spell: SpellId,
    pub kind: StatusKind,
    pub started_at: u64,
    pub expires_at: u64,
    /// Remaining absorption per vital; only meaningful for shields.
    pub shield: [i32; VITAL_COUNT],
    /// Free-form payload, the sprite for transforms.
    pub data: String,
}

impl StatusInstance {
    pub fn new(spell: SpellId, kind: StatusKind, duration_ms: u64, now: u64) -> Self {
        Self {
            spell,
            kind,
            started_at: now,
            expires_at: now.saturating_add(duration_ms),
            shield: [0; VITAL_COUNT],
            data: String::new(),
        }
    }

    pub fn with_shield(mut self, shield: [i32; VITAL_COUNT]) -> Self {
        self.shield = shield;
        self
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    pub fn remaining_ms(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }

    pub fn total_ms(&self) -> u64 {
        self.expires_at.saturating_sub(self.started_at)
    }

    fn depleted_shield(&self) -> bool {
        self.kind == StatusKind::Shield && self.shield.iter().all(|capacity| *capacity <= 0)
    }

    /// Soaks `amount` of damage aimed at `vital`; returns what pierces.
    fn absorb(&mut self, vital: Vital, amount: i32) -> i32 {
        let capacity = &mut self.shield[vital.index()];
        *capacity -= amount;
        if *capacity <= 0 {
            let pierce = -*capacity;
            *capacity = 0;
            pierce
        } else {
            0
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Added,
    Refreshed,
    RejectedByCleanse,
}

/// Active statuses of one entity, at most one per spell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statuses {
    table: BTreeMap<SpellId, StatusInstance>,
}

impl Statuses {
    /// A cleanse wipes every status and then installs itself; anything else is
    /// refused while a cleanse is active. Re-applying a spell's status only
    /// moves its start and expiry.
    pub fn apply(&mut self, status: StatusInstance) -> ApplyOutcome {
        if status.kind == StatusKind::Cleanse {
            self.table.clear();
        } else if self.has(StatusKind::Cleanse) {
            return ApplyOutcome::RejectedByCleanse;
        }

        match self.table.get_mut(&status.spell) {
            Some(existing) if existing.kind != status.kind => {
                *existing = status;
                ApplyOutcome::Refreshed
            }
            Some(existing) => {
                existing.started_at = status.started_at;
                existing.expires_at = status.expires_at;
                ApplyOutcome::Refreshed
            }
            None => {
                self.table.insert(status.spell, status);
                ApplyOutcome::Added
            }
        }
    }

    pub fn get(&self, spell: SpellId) -> Option<&StatusInstance> {
        self.table.get(&spell)
    }

    pub fn has(&self, kind: StatusKind) -> bool {
        self.table.values().any(|status| status.kind == kind)
    }

    pub fn first_of(&self, kind: StatusKind) -> Option<&StatusInstance> {
        self.table.values().find(|status| status.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusInstance> {
        self.table.values()
    }

    pub fn remove(&mut self, spell: SpellId) -> Option<StatusInstance> {
        self.table.remove(&spell)
    }

    pub fn remove_kind(&mut self, kind: StatusKind) -> Vec<StatusInstance> {
        let spells: Vec<SpellId> = self
            .table
            .values()
            .filter(|status| status.kind == kind)
            .map(|status| status.spell)
            .collect();
        spells
            .into_iter()
            .filter_map(|spell| self.table.remove(&spell))
            .collect()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Runs positive damage through every shield in spell order. Depleted
    /// shields are dropped straight away. Returns the damage left for the vital.
    pub fn absorb(&mut self, vital: Vital, amount: i32) -> i32 {
        if amount <= 0 || !self.has(StatusKind::Shield) {
            return amount;
        }
        let mut remaining = amount;
        for status in self.table.values_mut() {
            if status.kind == StatusKind::Shield {
                remaining = status.absorb(vital, remaining);
            }
        }
        self.table.retain(|_, status| !status.depleted_shield());
        remaining
    }

    /// Removes timed-out statuses and spent shields, returning them.
    pub fn expire(&mut self, now: u64) -> Vec<StatusInstance> {
        let gone: Vec<SpellId> = self
            .table
            .values()
            .filter(|status| now >= status.expires_at || status.depleted_shield())
            .map(|status| status.spell)
            .collect();
        gone.into_iter()
            .filter_map(|spell| self.table.remove(&spell))
            .collect()
    }
}

/// Shield capacity a spell grants, scaled by the bearer's stat.
pub fn shield_capacity(spell: &SpellDefinition, bearer: &Stats) -> [i32; VITAL_COUNT] {
    let combat = &spell.combat;
    let bonus = combat.scaling * bearer.effective(combat.scaling_stat) / 100;
    Vital::ALL.map(|vital| {
        let diff = combat.vital_diff[vital.index()];
        if diff > 0 { diff + bonus } else { 0 }
    })
}

impl SimWorld {
    /// Installs or refreshes the status `kind` from `spell` on `target`.
    pub fn apply_status(
        &mut self,
        target: Entity,
        spell: &SpellDefinition,
        kind: StatusKind,
        duration_ms: u64,
        now: u64,
    ) -> ApplyOutcome {
        let mut status = StatusInstance::new(spell.id, kind, duration_ms, now)
            .with_data(spell.combat.transform_sprite.clone());
        if kind == StatusKind::Shield {
            let capacity = self
                .inspect::<Stats, _>(target, |stats| shield_capacity(spell, stats))
                .unwrap_or([0; VITAL_COUNT]);
            status = status.with_shield(capacity);
        }

        let outcome = self
            .update::<Statuses, _>(target, |statuses| statuses.apply(status))
            .unwrap_or(ApplyOutcome::RejectedByCleanse);
        match outcome {
            ApplyOutcome::RejectedByCleanse => {
                self.notify(SimEvent::Action {
                    entity: target,
                    message: CombatMessage::Cleansed(kind),
                });
            }
            ApplyOutcome::Added | ApplyOutcome::Refreshed => {
                tracing::debug!(entity = ?target, spell = %spell.id, ?kind, ?outcome, "status_applied");
                self.notify(SimEvent::StatusesChanged { entity: target });
            }
        }
        outcome
    }

    pub fn has_status(&self, entity: Entity, kind: StatusKind) -> bool {
        self.inspect::<Statuses, _>(entity, |statuses| statuses.has(kind))
            .unwrap_or(false)
    }

    pub fn status_count(&self, entity: Entity) -> usize {
        self.inspect::<Statuses, _>(entity, Statuses::len)
            .unwrap_or(0)
    }

    /// Removes every status of `kind`; returns the removed instances.
    pub fn remove_statuses(&mut self, entity: Entity, kind: StatusKind) -> Vec<StatusInstance> {
        let removed = self
            .update::<Statuses, _>(entity, |statuses| statuses.remove_kind(kind))
            .unwrap_or_default();
        if !removed.is_empty() {
            self.notify(SimEvent::StatusesChanged { entity });
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(spell: u32, kind: StatusKind) -> StatusInstance {
        StatusInstance::new(SpellId(spell), kind, 1000, 0)
    }

    #[test]
    fn cleanse_wipes_prior_statuses_then_blocks_new_ones() {
        let mut statuses = Statuses::default();
        statuses.apply(status(1, StatusKind::Stun));
        statuses.apply(status(2, StatusKind::Blind));
        statuses.apply(status(3, StatusKind::Snare));
        assert_eq!(statuses.len(), 3);

        assert_eq!(statuses.apply(status(9, StatusKind::Cleanse)), ApplyOutcome::Added);
        assert!(!statuses.has(StatusKind::Stun));
        assert!(!statuses.has(StatusKind::Blind));
        assert!(!statuses.has(StatusKind::Snare));
        assert_eq!(statuses.len(), 1);

        assert_eq!(
            statuses.apply(status(4, StatusKind::Silence)),
            ApplyOutcome::RejectedByCleanse
        );
        assert_eq!(statuses.len(), 1);
    }

    #[test]
    fn reapplying_refreshes_timers_only() {
        let mut statuses = Statuses::default();
        statuses.apply(status(1, StatusKind::Stun).with_data("a"));
        let again = StatusInstance::new(SpellId(1), StatusKind::Stun, 1000, 400).with_data("b");
        assert_eq!(statuses.apply(again), ApplyOutcome::Refreshed);

        let stun = statuses.get(SpellId(1)).expect("stun");
        assert_eq!((stun.started_at, stun.expires_at), (400, 1400));
        assert_eq!(stun.data, "a");
        assert_eq!(stun.remaining_ms(1000), 400);
        assert_eq!(stun.total_ms(), 1000);
    }

    #[test]
    fn reapplying_under_another_kind_replaces_the_entry() {
        let mut statuses = Statuses::default();
        statuses.apply(status(1, StatusKind::Buff));
        let stun = StatusInstance::new(SpellId(1), StatusKind::Stun, 500, 200);
        assert_eq!(statuses.apply(stun), ApplyOutcome::Refreshed);

        assert!(statuses.has(StatusKind::Stun));
        assert!(!statuses.has(StatusKind::Buff));
        assert_eq!(statuses.get(SpellId(1)).map(|s| s.expires_at), Some(700));
    }

    #[test]
    fn shield_absorbs_up_to_capacity() {
        let mut statuses = Statuses::default();
        statuses.apply(status(5, StatusKind::Shield).with_shield([50, 0]));

        assert_eq!(statuses.absorb(Vital::Health, 30), 0);
        assert_eq!(statuses.get(SpellId(5)).map(|s| s.shield), Some([20, 0]));

        assert_eq!(statuses.absorb(Vital::Health, 35), 15);
        assert!(statuses.is_empty());
    }

    #[test]
    fn heals_bypass_shields() {
        let mut statuses = Statuses::default();
        statuses.apply(status(5, StatusKind::Shield).with_shield([50, 0]));
        assert_eq!(statuses.absorb(Vital::Health, -20), -20);
        assert_eq!(statuses.get(SpellId(5)).map(|s| s.shield), Some([50, 0]));
    }

    #[test]
    fn expiry_is_inclusive_of_the_deadline() {
        let mut statuses = Statuses::default();
        statuses.apply(status(1, StatusKind::Stun));
        statuses.apply(StatusInstance::new(SpellId(2), StatusKind::Blind, 2000, 0));
        assert!(statuses.expire(999).is_empty());
        let gone = statuses.expire(1000);
        assert_eq!(gone.len(), 1);
        assert_eq!(gone[0].spell, SpellId(1));
        assert!(statuses.has(StatusKind::Blind));
    }

    #[test]
    fn empty_shields_expire_early() {
        let mut statuses = Statuses::default();
        statuses.apply(status(5, StatusKind::Shield));
        assert_eq!(statuses.expire(1).len(), 1);
    }
}
