pub mod dash;
pub mod route;

use bracket_geometry::prelude::Point;
use serde::{Deserialize, Serialize};
use specs::Entity;

use crate::{
    data::DashFlags,
    ecs::{
        SimWorld,
        components::{CombatState, EntityKind, EntityKindTag, Position},
    },
    map::{MapAttribute, translate},
    notify::SimEvent,
    stats::{StatKind, Stats},
    status::StatusKind,
};

pub use route::{MoveRoute, RouteAction, RouteStep};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    pub const CARDINAL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(self) -> Point {
        match self {
            Direction::Up => Point::new(0, -1),
            Direction::Down => Point::new(0, 1),
            Direction::Left => Point::new(-1, 0),
            Direction::Right => Point::new(1, 0),
            Direction::UpLeft => Point::new(-1, -1),
            Direction::UpRight => Point::new(1, -1),
            Direction::DownLeft => Point::new(-1, 1),
            Direction::DownRight => Point::new(1, 1),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::UpLeft => Direction::DownRight,
            Direction::UpRight => Direction::DownLeft,
            Direction::DownLeft => Direction::UpRight,
            Direction::DownRight => Direction::UpLeft,
        }
    }

    pub fn clockwise(self) -> Self {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
            Direction::UpLeft => Direction::UpRight,
            Direction::UpRight => Direction::DownRight,
            Direction::DownRight => Direction::DownLeft,
            Direction::DownLeft => Direction::UpLeft,
        }
    }

    pub fn counter_clockwise(self) -> Self {
        self.clockwise().opposite()
    }

    pub fn is_cardinal(self) -> bool {
        Direction::CARDINAL.contains(&self)
    }
}

/// What stops a mover from entering a tile occupied by another entity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Blocker {
    Player,
    Npc,
    ActiveResource,
    DeadResource,
    Event,
}

impl Blocker {
    pub fn kind(self) -> EntityKindTag {
        match self {
            Blocker::Player => EntityKindTag::Player,
            Blocker::Npc => EntityKindTag::Npc,
            Blocker::ActiveResource | Blocker::DeadResource => EntityKindTag::Resource,
            Blocker::Event => EntityKindTag::Event,
        }
    }

    fn precedence(self) -> u8 {
        match self {
            Blocker::Player => 3,
            Blocker::Npc => 2,
            Blocker::ActiveResource | Blocker::DeadResource => 1,
            Blocker::Event => 0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    OutOfBounds,
    BlockedByAttribute,
    BlockedByZLevel,
    SlideBlocked,
    BlockedByEntity(Blocker),
    Walkable,
}

impl MoveOutcome {
    pub fn is_walkable(self) -> bool {
        self == MoveOutcome::Walkable
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepResult {
    Moved,
    Blocked(MoveOutcome),
    /// Move timer still running, a cast is pending, or the mover cannot act.
    NotReady,
}

/// Milliseconds needed to cross one tile.
pub fn movement_time(speed: i32, blocking: bool, blocking_slow: f64) -> u64 {
    let mut time = 1000.0 / (1.0 + (1.0 + speed.max(0) as f64).ln());
    if blocking {
        time *= 1.0 + blocking_slow;
    }
    time.min(1000.0) as u64
}

impl SimWorld {
    /// Legality of a one-tile step from the entity's tile in `dir`.
    pub fn can_move(&self, entity: Entity, dir: Direction) -> MoveOutcome {
        let (Some(pos), Some(mover)) = (
            self.component::<Position>(entity),
            self.kind_tag(entity),
        ) else {
            return MoveOutcome::OutOfBounds;
        };
        let Some((map_id, dest)) = translate(self.maps.as_ref(), pos.map, pos.point, dir.delta()) else {
            return MoveOutcome::OutOfBounds;
        };
        let Some(map) = self.maps.get(map_id) else {
            return MoveOutcome::OutOfBounds;
        };

        match map.attribute(dest) {
            MapAttribute::Blocked => return MoveOutcome::BlockedByAttribute,
            MapAttribute::NpcAvoid if mover == EntityKindTag::Npc => {
                return MoveOutcome::BlockedByAttribute;
            }
            MapAttribute::ZDimension {
                blocked_level: Some(level),
                ..
            } if level == pos.z => return MoveOutcome::BlockedByZLevel,
            MapAttribute::Slide { direction } => {
                if mover == EntityKindTag::Event {
                    return MoveOutcome::SlideBlocked;
                }
                if direction.is_some_and(|slide| dir == slide.opposite()) {
                    return MoveOutcome::SlideBlocked;
                }
            }
            _ => {}
        }

        if pos.passable {
            return MoveOutcome::Walkable;
        }

        let players_pass = self.config.zone_is_passable(map.zone);
        let positions = self.ecs.read_storage::<Position>();
        let kinds = self.ecs.read_storage::<EntityKind>();
        let states = self.ecs.read_storage::<CombatState>();
        let occupants = map.entities().iter().filter(|occupant| **occupant != entity).filter_map(
            |occupant| {
                let other = positions.get(*occupant)?;
                let same_tile = other.map == map_id && other.point == dest && other.z == pos.z;
                (same_tile && !other.passable).then_some((*occupant, kinds.get(*occupant)?))
            },
        );

        let mut blocker: Option<Blocker> = None;
        let mut global_event = false;
        for (occupant, kind) in occupants {
            if let EntityKind::EventPage(page) = kind {
                global_event |= page.global;
                continue;
            }
            let dead = states.get(occupant).is_some_and(|state| state.dead);
            if let Some(found) = kind.blocker_for(mover, dead, players_pass) {
                if blocker.is_none_or(|current| found.precedence() > current.precedence()) {
                    blocker = Some(found);
                }
            }
        }

        match blocker {
            Some(found) => MoveOutcome::BlockedByEntity(found),
            None if global_event && mover != EntityKindTag::Player => {
                MoveOutcome::BlockedByEntity(Blocker::Event)
            }
            None => MoveOutcome::Walkable,
        }
    }

    /// Turns the entity to `dir` and steps when its move timer allows it.
    pub fn move_entity(&mut self, entity: Entity, dir: Direction, now: u64) -> StepResult {
        let Some(state) = self.component::<CombatState>(entity) else {
            return StepResult::NotReady;
        };
        self.face(entity, dir);
        if state.dead || now < state.move_at || state.is_casting() {
            return StepResult::NotReady;
        }
        if self.is_rooted(entity) {
            return StepResult::NotReady;
        }

        match self.can_move(entity, dir) {
            MoveOutcome::Walkable => {
                self.commit_step(entity, dir, now, false, 0);
                StepResult::Moved
            }
            blocked => {
                tracing::debug!(?entity, ?dir, outcome = ?blocked, "move_blocked");
                StepResult::Blocked(blocked)
            }
        }
    }

    /// Stun, Snare and Sleep hold an entity in place.
    pub fn is_rooted(&self, entity: Entity) -> bool {
        self.has_status(entity, StatusKind::Stun)
            || self.has_status(entity, StatusKind::Snare)
            || self.has_status(entity, StatusKind::Sleep)
    }

    pub fn face(&mut self, entity: Entity, dir: Direction) {
        let changed = self
            .update::<Position, _>(entity, |pos| std::mem::replace(&mut pos.dir, dir) != dir)
            .unwrap_or(false);
        if changed {
            self.notify(SimEvent::DirectionChanged { entity, dir });
        }
    }

    pub fn movement_time_of(&self, entity: Entity) -> u64 {
        let speed = self
            .inspect::<Stats, _>(entity, |stats| stats.effective(StatKind::Speed))
            .unwrap_or(1);
        let blocking = self
            .inspect::<CombatState, _>(entity, |state| state.blocking)
            .unwrap_or(false);
        movement_time(speed, blocking, self.config.blocking_slow)
    }

    /// Moves the entity one tile without any legality check. Forced steps
    /// (dashes, knockback, slides) skip the move timer and walk-in checks.
    pub(crate) fn commit_step(
        &mut self,
        entity: Entity,
        dir: Direction,
        now: u64,
        forced: bool,
        depth: u32,
    ) -> bool {
        let Some(pos) = self.component::<Position>(entity) else {
            return false;
        };
        let Some((map_id, dest)) = translate(self.maps.as_ref(), pos.map, pos.point, dir.delta()) else {
            return false;
        };

        if map_id != pos.map {
            if let Some(old) = self.maps.get_mut(pos.map) {
                old.remove_entity(entity);
            }
            if let Some(new) = self.maps.get_mut(map_id) {
                new.add_entity(entity);
            }
        }
        self.update::<Position, _>(entity, |pos| {
            pos.map = map_id;
            pos.point = dest;
        });

        if !forced {
            let facing = self
                .component::<Position>(entity)
                .map(|pos| pos.dir)
                .unwrap_or(dir);
            self.notify(SimEvent::Moved {
                entity,
                map: map_id,
                x: dest.x,
                y: dest.y,
                dir: facing,
            });
            self.projectile_walk_in(entity, now);
            let time = self.movement_time_of(entity);
            self.update::<CombatState, _>(entity, |state| state.move_at = now + time);
        }

        self.apply_z_gateway(entity);
        self.apply_slide(entity, now, depth);
        true
    }

    fn apply_z_gateway(&mut self, entity: Entity) {
        let Some(pos) = self.component::<Position>(entity) else {
            return;
        };
        let attribute = self
            .maps
            .get(pos.map)
            .map(|map| map.attribute(pos.point))
            .unwrap_or_default();
        if let MapAttribute::ZDimension {
            gateway_to: Some(level),
            ..
        } = attribute
        {
            if level != pos.z {
                self.update::<Position, _>(entity, |pos| pos.z = level);
                self.notify(SimEvent::ZChanged { entity, z: level });
            }
        }
    }

    fn apply_slide(&mut self, entity: Entity, now: u64, depth: u32) {
        if self.kind_tag(entity) == Some(EntityKindTag::Event) {
            return;
        }
        let Some(pos) = self.component::<Position>(entity) else {
            return;
        };
        let attribute = self
            .maps
            .get(pos.map)
            .map(|map| map.attribute(pos.point))
            .unwrap_or_default();
        let MapAttribute::Slide { direction } = attribute else {
            return;
        };

        let slide = direction.unwrap_or(pos.dir);
        self.face(entity, slide);
        if depth >= self.config.slide_chain_limit {
            tracing::warn!(?entity, depth, "slide_chain_limit_reached");
            return;
        }
        self.dash_chained(entity, 1, slide, DashFlags::default(), now, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotations_compose() {
        for dir in Direction::CARDINAL {
            assert_eq!(dir.clockwise().clockwise(), dir.opposite());
            assert_eq!(dir.clockwise().counter_clockwise(), dir);
        }
        assert_eq!(Direction::Up.clockwise(), Direction::Right);
        assert_eq!(Direction::Up.counter_clockwise(), Direction::Left);
        assert_eq!(Direction::UpLeft.opposite(), Direction::DownRight);
        assert!(!Direction::DownLeft.is_cardinal());
    }

    #[test]
    fn movement_time_falls_with_speed_and_caps() {
        assert_eq!(movement_time(0, false, 0.3), 1000);
        let slow = movement_time(10, false, 0.3);
        let fast = movement_time(200, false, 0.3);
        assert!(fast < slow && slow < 1000);
        assert_eq!(slow, (1000.0 / (1.0 + 11f64.ln())) as u64);
        assert!(movement_time(10, true, 0.3) > slow);
        assert_eq!(movement_time(0, true, 5.0), 1000);
    }
}
