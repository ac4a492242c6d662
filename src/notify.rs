use crossbeam_channel::{Sender, TrySendError};
use specs::Entity;

use crate::{
    combat::formula::DamageType,
    data::{AnimationId, ItemId, SpellId},
    ecs::components::EntityKindTag,
    map::MapId,
    movement::Direction,
    stats::{STAT_COUNT, VITAL_COUNT},
    status::StatusKind,
};

/// Floating combat text attached to an entity.
#[derive(Clone, Debug, PartialEq)]
pub enum CombatMessage {
    Miss,
    Blocked,
    Critical,
    Invulnerable,
    Damage { amount: i32, damage_type: DamageType },
    Heal(i32),
    ManaDrain(i32),
    ManaRestore(i32),
    Status(StatusKind),
    /// A status was refused because a cleanse is active.
    Cleansed(StatusKind),
    Dash,
}

/// Everything the simulation reports outward. The core never waits on delivery.
#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    Spawned {
        entity: Entity,
        kind: EntityKindTag,
    },
    Despawned {
        entity: Entity,
    },
    VitalsChanged {
        entity: Entity,
        current: [i32; VITAL_COUNT],
        max: [i32; VITAL_COUNT],
    },
    StatsChanged {
        entity: Entity,
        stats: [i32; STAT_COUNT],
    },
    StatusesChanged {
        entity: Entity,
    },
    Moved {
        entity: Entity,
        map: MapId,
        x: i32,
        y: i32,
        dir: Direction,
    },
    DirectionChanged {
        entity: Entity,
        dir: Direction,
    },
    ZChanged {
        entity: Entity,
        z: i32,
    },
    Dashed {
        entity: Entity,
        map: MapId,
        x: i32,
        y: i32,
        range: i32,
        transmission_ms: u64,
    },
    Warped {
        entity: Entity,
        map: MapId,
        x: i32,
        y: i32,
        z: i32,
    },
    Animation {
        animation: AnimationId,
        entity: Option<Entity>,
        map: MapId,
        x: i32,
        y: i32,
    },
    Action {
        entity: Entity,
        message: CombatMessage,
    },
    Attacked {
        entity: Entity,
        cooldown_ms: u64,
    },
    BlockingChanged {
        entity: Entity,
        blocking: bool,
    },
    CastStarted {
        entity: Entity,
        spell: SpellId,
        completes_at: u64,
    },
    SpellCast {
        entity: Entity,
        spell: SpellId,
    },
    CooldownStarted {
        entity: Entity,
        slot: usize,
        ready_at: u64,
    },
    TargetChanged {
        entity: Entity,
        target: Option<Entity>,
    },
    Killed {
        killer: Entity,
        victim: Entity,
    },
    PvpKill {
        killer: Entity,
        victim: Entity,
    },
    Died {
        entity: Entity,
    },
    Revived {
        entity: Entity,
    },
    ItemDropped {
        map: MapId,
        x: i32,
        y: i32,
        item: ItemId,
        quantity: u32,
    },
    ProjectileSpawned {
        projectile: Entity,
        map: MapId,
        x: i32,
        y: i32,
        dir: Direction,
    },
    ProjectileMoved {
        projectile: Entity,
        map: MapId,
        x: i32,
        y: i32,
    },
    ProjectileRemoved {
        projectile: Entity,
    },
    RouteCompleted {
        entity: Entity,
    },
}

/// Fire-and-forget sink for simulation events.
pub trait Notifier: Send {
    fn notify(&mut self, event: SimEvent);
}

impl Notifier for Sender<SimEvent> {
    fn notify(&mut self, event: SimEvent) {
        match self.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "notification_dropped_channel_full");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&mut self, event: SimEvent) {
        tracing::trace!(?event, "notification");
    }
}

/// Keeps events in memory until drained.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
}

impl EventLog {
    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Notifier for EventLog {
    fn notify(&mut self, event: SimEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specs::{Builder, World, WorldExt};

    #[test]
    fn channel_sink_never_blocks() {
        let mut world = World::new();
        let entity = world.create_entity().build();
        let (mut tx, rx) = crossbeam_channel::bounded(1);
        tx.notify(SimEvent::Died { entity });
        tx.notify(SimEvent::Revived { entity });
        assert_eq!(rx.try_recv(), Ok(SimEvent::Died { entity }));
        assert!(rx.try_recv().is_err());

        drop(rx);
        tx.notify(SimEvent::Died { entity });
    }

    #[test]
    fn event_log_drains_in_order() {
        let mut world = World::new();
        let entity = world.create_entity().build();
        let mut log = EventLog::default();
        log.notify(SimEvent::Died { entity });
        log.notify(SimEvent::Revived { entity });
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.drain(),
            vec![SimEvent::Died { entity }, SimEvent::Revived { entity }]
        );
        assert!(log.is_empty());
    }
}
