use specs::Entity;
use thiserror::Error;

use crate::data::SpellId;

/// Failures of a single simulation operation.
///
/// None of these are fatal: the tick loop logs them and moves on to the next
/// entity, so the worst case is one skipped step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("invalid target {target:?}")]
    InvalidTarget { target: Option<Entity> },
    #[error("move route action code {code} is not understood")]
    UnrecognizedAction { code: u16 },
    #[error("movement left the map grid")]
    OutOfBounds,
    #[error("configuration invariant violated: {message}")]
    ConfigurationInvariantViolation { message: String },
    #[error("entity {0:?} does not exist")]
    UnknownEntity(Entity),
    #[error("spell {0:?} has no definition")]
    UnknownSpell(SpellId),
    #[error("no {kind} definition with id {id}")]
    UnknownDefinition { kind: &'static str, id: u32 },
    #[error("spell slot {slot} is empty or out of range")]
    EmptySlot { slot: usize },
    #[error("spell slot {slot} is cooling down until {ready_at}")]
    OnCooldown { slot: usize, ready_at: u64 },
    #[error("not enough {vital} to cast")]
    InsufficientVital { vital: &'static str },
    #[error("caster is already casting")]
    AlreadyCasting,
    #[error("caster is unable to act")]
    Incapacitated,
}

impl SimError {
    pub fn invalid_target(target: impl Into<Option<Entity>>) -> Self {
        SimError::InvalidTarget {
            target: target.into(),
        }
    }

    pub fn invariant<S: Into<String>>(message: S) -> Self {
        SimError::ConfigurationInvariantViolation {
            message: message.into(),
        }
    }
}
