pub mod vitals;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::SpellId;

pub use vitals::{VITAL_COUNT, Vital, Vitals};

pub const STAT_COUNT: usize = 5;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatKind {
    Attack,
    AbilityPower,
    Defense,
    MagicResist,
    Speed,
}

impl StatKind {
    pub const ALL: [StatKind; STAT_COUNT] = [
        StatKind::Attack,
        StatKind::AbilityPower,
        StatKind::Defense,
        StatKind::MagicResist,
        StatKind::Speed,
    ];

    pub fn index(self) -> usize {
        match self {
            StatKind::Attack => 0,
            StatKind::AbilityPower => 1,
            StatKind::Defense => 2,
            StatKind::MagicResist => 3,
            StatKind::Speed => 4,
        }
    }
}

/// A timed modifier installed by one spell on one stat.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Buff {
    pub amount: i32,
    pub expires_at: u64,
}

#[derive(Clone, Debug, Default)]
struct StatEntry {
    buffs: BTreeMap<SpellId, Buff>,
    changed: bool,
}

/// Per-entity stat ledger.
///
/// Effective value is `base + allocation + external + sum(buffs)`, never below 1.
/// `external` carries sources owned outside the ledger such as equipment.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    pub base: [i32; STAT_COUNT],
    pub allocations: [i32; STAT_COUNT],
    pub external: [i32; STAT_COUNT],
    entries: [StatEntry; STAT_COUNT],
}

impl Stats {
    pub fn new(base: [i32; STAT_COUNT]) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    pub fn base(&self, kind: StatKind) -> i32 {
        self.base[kind.index()]
    }

    pub fn effective(&self, kind: StatKind) -> i32 {
        let idx = kind.index();
        let buffed: i32 = self.entries[idx].buffs.values().map(|buff| buff.amount).sum();
        let value = self.base[idx] + self.allocations[idx] + self.external[idx] + buffed;
        value.max(1)
    }

    pub fn effective_all(&self) -> [i32; STAT_COUNT] {
        StatKind::ALL.map(|kind| self.effective(kind))
    }

    /// Installs a buff for `spell`, or only pushes out the expiry of the one
    /// already installed by that spell.
    pub fn add_buff(&mut self, kind: StatKind, spell: SpellId, amount: i32, duration_ms: u64, now: u64) {
        let entry = &mut self.entries[kind.index()];
        let expires_at = now.saturating_add(duration_ms);
        entry
            .buffs
            .entry(spell)
            .and_modify(|buff| buff.expires_at = expires_at)
            .or_insert(Buff { amount, expires_at });
        entry.changed = true;
    }

    pub fn buff(&self, kind: StatKind, spell: SpellId) -> Option<&Buff> {
        self.entries[kind.index()].buffs.get(&spell)
    }

    pub fn buff_count(&self, kind: StatKind) -> usize {
        self.entries[kind.index()].buffs.len()
    }

    /// Drops expired buffs. Returns true when any stat changed since the last call.
    pub fn expire(&mut self, now: u64) -> bool {
        let mut changed = false;
        for entry in self.entries.iter_mut() {
            let before = entry.buffs.len();
            entry.buffs.retain(|_, buff| buff.expires_at > now);
            changed |= entry.buffs.len() != before || entry.changed;
            entry.changed = false;
        }
        changed
    }

    pub fn clear_buffs(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.buffs.clear();
            entry.changed = true;
        }
    }
}
