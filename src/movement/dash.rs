use specs::Entity;

use super::{Blocker, Direction, MoveOutcome};
use crate::{
    data::DashFlags,
    ecs::{SimWorld, components::{CombatState, Position}},
    notify::SimEvent,
};

impl DashFlags {
    /// Whether a probe result may be passed through under these flags.
    pub fn allows(self, outcome: MoveOutcome) -> bool {
        match outcome {
            MoveOutcome::Walkable => true,
            MoveOutcome::BlockedByAttribute => self.ignore_map_blocks,
            MoveOutcome::BlockedByZLevel => self.ignore_z_dimension,
            MoveOutcome::BlockedByEntity(Blocker::ActiveResource) => self.ignore_active_resources,
            MoveOutcome::BlockedByEntity(Blocker::DeadResource) => self.ignore_dead_resources,
            MoveOutcome::BlockedByEntity(_)
            | MoveOutcome::SlideBlocked
            | MoveOutcome::OutOfBounds => false,
        }
    }
}

impl SimWorld {
    /// Forced straight-line movement of up to `range` tiles. Returns the
    /// number of tiles actually covered.
    pub fn dash(&mut self, entity: Entity, range: i32, dir: Direction, flags: DashFlags, now: u64) -> i32 {
        self.dash_chained(entity, range, dir, flags, now, 0)
    }

    pub(crate) fn dash_chained(
        &mut self,
        entity: Entity,
        range: i32,
        dir: Direction,
        flags: DashFlags,
        now: u64,
        depth: u32,
    ) -> i32 {
        let Some(facing) = self.component::<Position>(entity).map(|pos| pos.dir) else {
            return 0;
        };
        self.update::<CombatState, _>(entity, |state| state.move_at = 0);

        let mut travelled = 0;
        while travelled < range {
            let outcome = self.can_move(entity, dir);
            if !flags.allows(outcome) {
                tracing::debug!(?entity, ?dir, travelled, ?outcome, "dash_stopped");
                break;
            }
            if !self.commit_step(entity, dir, now, true, depth) {
                break;
            }
            travelled += 1;
            // Facing is restored silently; the dash itself is the broadcast.
            self.update::<Position, _>(entity, |pos| pos.dir = facing);
        }

        if travelled > 0 {
            let max_dash = self.config.max_dash_speed_ms;
            if let Some(pos) = self.component::<Position>(entity) {
                self.notify(SimEvent::Dashed {
                    entity,
                    map: pos.map,
                    x: pos.point.x,
                    y: pos.point.y,
                    range: travelled,
                    transmission_ms: max_dash / travelled as u64,
                });
            }
            self.update::<CombatState, _>(entity, |state| state.move_at = now + max_dash);
        }
        travelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupants_stop_dashes_regardless_of_flags() {
        let all = DashFlags {
            ignore_map_blocks: true,
            ignore_active_resources: true,
            ignore_dead_resources: true,
            ignore_z_dimension: true,
        };
        assert!(all.allows(MoveOutcome::BlockedByAttribute));
        assert!(all.allows(MoveOutcome::BlockedByEntity(Blocker::DeadResource)));
        assert!(!all.allows(MoveOutcome::BlockedByEntity(Blocker::Player)));
        assert!(!all.allows(MoveOutcome::BlockedByEntity(Blocker::Npc)));
        assert!(!all.allows(MoveOutcome::BlockedByEntity(Blocker::Event)));
        assert!(!all.allows(MoveOutcome::SlideBlocked));
        assert!(!all.allows(MoveOutcome::OutOfBounds));
    }

    #[test]
    fn resource_flags_are_independent() {
        let flags = DashFlags {
            ignore_active_resources: true,
            ..DashFlags::default()
        };
        assert!(flags.allows(MoveOutcome::BlockedByEntity(Blocker::ActiveResource)));
        assert!(!flags.allows(MoveOutcome::BlockedByEntity(Blocker::DeadResource)));
        assert!(!flags.allows(MoveOutcome::BlockedByAttribute));
    }
}
