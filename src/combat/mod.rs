//! Damage, spells, projectiles and death.

pub mod attack;
pub mod formula;
pub mod projectiles;
pub mod spells;

pub use attack::{AttackOutcome, AttackParams};
pub use formula::{DamageFormula, DamageInput, DamageType, FlatFormula, StandardFormula};
