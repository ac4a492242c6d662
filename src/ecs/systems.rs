use specs::prelude::*;

use super::{
    components::CombatState,
    resources::{ChangeSet, RegenSettings, SimClock},
};
use crate::{
    stats::{Stats, Vital, Vitals},
    status::Statuses,
};

/// Drops timed stat buffs whose expiry has passed.
#[derive(Default)]
pub struct BuffExpirySystem;

impl<'a> System<'a> for BuffExpirySystem {
    type SystemData = (
        Entities<'a>,
        ReadExpect<'a, SimClock>,
        WriteStorage<'a, Stats>,
        Write<'a, ChangeSet>,
    );

    fn run(&mut self, (entities, clock, mut stats, mut changes): Self::SystemData) {
        for (entity, stat) in (&entities, &mut stats).join() {
            if stat.expire(clock.now) {
                changes.stats_changed(entity);
            }
        }
    }
}

#[derive(Default)]
pub struct StatusExpirySystem;

impl<'a> System<'a> for StatusExpirySystem {
    type SystemData = (
        Entities<'a>,
        ReadExpect<'a, SimClock>,
        WriteStorage<'a, Statuses>,
        Write<'a, ChangeSet>,
    );

    fn run(&mut self, (entities, clock, mut statuses, mut changes): Self::SystemData) {
        for (entity, table) in (&entities, &mut statuses).join() {
            let expired = table.expire(clock.now);
            if !expired.is_empty() {
                tracing::debug!(?entity, count = expired.len(), "statuses_expired");
                changes.statuses_changed(entity);
            }
        }
    }
}

/// Restores a percentage of each vital per interval while out of combat.
#[derive(Default)]
pub struct RegenSystem;

impl<'a> System<'a> for RegenSystem {
    type SystemData = (
        Entities<'a>,
        ReadExpect<'a, SimClock>,
        ReadExpect<'a, RegenSettings>,
        WriteStorage<'a, Vitals>,
        WriteStorage<'a, CombatState>,
        Write<'a, ChangeSet>,
    );

    fn run(
        &mut self,
        (entities, clock, settings, mut vitals, mut states, mut changes): Self::SystemData,
    ) {
        let now = clock.now;
        for (entity, vital_set, state) in (&entities, &mut vitals, &mut states).join() {
            if state.dead || state.in_combat(now) || now < state.regen_at {
                continue;
            }
            let mut changed = false;
            for vital in Vital::ALL {
                let percent = vital_set.regen_percent[vital.index()];
                if percent == 0 {
                    continue;
                }
                let before = vital_set.get(vital);
                vital_set.add(vital, vital_set.max(vital) * percent / 100);
                changed |= vital_set.get(vital) != before;
            }
            state.regen_at = now + settings.interval_ms;
            if changed {
                changes.vitals_changed(entity);
            }
        }
    }
}
