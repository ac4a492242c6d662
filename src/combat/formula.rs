use serde::{Deserialize, Serialize};

use crate::stats::{STAT_COUNT, StatKind};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    #[default]
    Physical,
    Magic,
    /// Ignores every defensive stat.
    True,
}

impl DamageType {
    pub fn defense_stat(self) -> Option<StatKind> {
        match self {
            DamageType::Physical => Some(StatKind::Defense),
            DamageType::Magic => Some(StatKind::MagicResist),
            DamageType::True => None,
        }
    }
}

/// One component of an attack as seen by the formula.
#[derive(Clone, Debug, PartialEq)]
pub struct DamageInput {
    /// Positive damages, negative heals.
    pub raw: i32,
    pub damage_type: DamageType,
    pub scaling_stat: StatKind,
    /// Percent of the attacker's scaling stat added to `raw`.
    pub scaling: i32,
    /// Already 1.0 when the roll was not critical.
    pub crit_multiplier: f64,
    pub attacker: [i32; STAT_COUNT],
    pub defender: [i32; STAT_COUNT],
}

pub trait DamageFormula: Send + Sync {
    /// Signed amount to apply. Positive removes from the vital, negative restores it.
    fn calculate(&self, input: &DamageInput) -> i32;
}

/// Scaled amount mitigated by the defender's matching defensive stat.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardFormula;

impl DamageFormula for StandardFormula {
    fn calculate(&self, input: &DamageInput) -> i32 {
        let stat = input.attacker[input.scaling_stat.index()] as f64;
        let bonus = stat * input.scaling as f64 / 100.0;
        let raw = input.raw as f64;
        let scaled = if input.raw < 0 { raw - bonus } else { raw + bonus };
        let mut amount = scaled * input.crit_multiplier;
        if amount > 0.0 {
            if let Some(defense) = input.damage_type.defense_stat() {
                let defense = input.defender[defense.index()].max(0) as f64;
                amount *= 100.0 / (100.0 + defense);
            }
        }
        amount.round() as i32
    }
}

/// Raw amount times the crit multiplier; no stats involved.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatFormula;

impl DamageFormula for FlatFormula {
    fn calculate(&self, input: &DamageInput) -> i32 {
        (input.raw as f64 * input.crit_multiplier).round() as i32
    }
}
