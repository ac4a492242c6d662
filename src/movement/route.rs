use serde::{Deserialize, Serialize};
use specs::{Entity, WorldExt};

use super::{Direction, StepResult};
use crate::{
    ecs::{SimWorld, components::{CombatState, Position}},
    error::SimError,
    notify::SimEvent,
};

/// One step of a move route.
///
/// Numeric codes, as stored by route editors:
/// `1..=8` move (Up, Down, Left, Right, UpLeft, UpRight, DownLeft, DownRight),
/// `9` random move, `12` step forward, `13` step back, `14..=17` face
/// (Up, Down, Left, Right), `18` turn clockwise, `19` turn counter-clockwise,
/// `20` turn around, `21` random turn, `22`/`23`/`24` wait 100/500/1000 ms.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteAction {
    Move(Direction),
    Face(Direction),
    TurnClockwise,
    TurnCounterClockwise,
    Turn180,
    Wait(u64),
    RandomMove,
    RandomTurn,
    StepForward,
    StepBack,
    Unrecognized(u16),
}

const MOVE_ORDER: [Direction; 8] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
    Direction::UpLeft,
    Direction::UpRight,
    Direction::DownLeft,
    Direction::DownRight,
];

impl RouteAction {
    pub fn from_code(code: u16) -> Self {
        match code {
            1..=8 => RouteAction::Move(MOVE_ORDER[code as usize - 1]),
            9 => RouteAction::RandomMove,
            12 => RouteAction::StepForward,
            13 => RouteAction::StepBack,
            14..=17 => RouteAction::Face(Direction::CARDINAL[code as usize - 14]),
            18 => RouteAction::TurnClockwise,
            19 => RouteAction::TurnCounterClockwise,
            20 => RouteAction::Turn180,
            21 => RouteAction::RandomTurn,
            22 => RouteAction::Wait(100),
            23 => RouteAction::Wait(500),
            24 => RouteAction::Wait(1000),
            other => RouteAction::Unrecognized(other),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveRoute {
    pub actions: Vec<RouteAction>,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default)]
    pub ignore_if_blocked: bool,
    #[serde(skip)]
    cursor: usize,
    #[serde(skip)]
    complete: bool,
}

impl MoveRoute {
    pub fn new(actions: Vec<RouteAction>) -> Self {
        Self {
            actions,
            ..Self::default()
        }
    }

    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn ignoring_blocks(mut self) -> Self {
        self.ignore_if_blocked = true;
        self
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn current(&self) -> Option<RouteAction> {
        if self.complete {
            return None;
        }
        self.actions.get(self.cursor).copied()
    }

    /// Moves past the current action. Repeating routes wrap and never
    /// complete; returns true when the route just completed.
    pub fn advance(&mut self) -> bool {
        if self.complete {
            return false;
        }
        self.cursor += 1;
        if self.cursor < self.actions.len() {
            return false;
        }
        if self.repeat {
            self.cursor = 0;
            false
        } else {
            self.complete = true;
            true
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RouteStep {
    /// No route, or the route already finished.
    Idle,
    /// The entity's move timer or cast holds the route back.
    Waiting,
    Performed,
    Blocked,
}

impl SimWorld {
    pub fn set_move_route(&mut self, entity: Entity, route: MoveRoute) {
        let mut routes = self.ecs.write_storage::<MoveRoute>();
        if let Err(error) = routes.insert(entity, route) {
            tracing::debug!(?entity, %error, "move_route_rejected");
        }
    }

    pub fn move_route(&self, entity: Entity) -> Option<MoveRoute> {
        self.component::<MoveRoute>(entity)
    }

    /// Executes the route's current action if the entity is free to act.
    pub fn step_route(&mut self, entity: Entity, now: u64) -> Result<RouteStep, SimError> {
        let Some(route) = self.component::<MoveRoute>(entity) else {
            return Ok(RouteStep::Idle);
        };
        let Some(action) = route.current() else {
            return Ok(RouteStep::Idle);
        };
        let Some(state) = self.component::<CombatState>(entity) else {
            return Err(SimError::UnknownEntity(entity));
        };
        if state.dead || state.is_casting() || now < state.move_at {
            return Ok(RouteStep::Waiting);
        }

        let succeeded = self.perform_route_action(entity, action, now)?;
        if succeeded || route.ignore_if_blocked {
            let completed = self
                .update::<MoveRoute, _>(entity, MoveRoute::advance)
                .unwrap_or(false);
            if completed {
                self.notify(SimEvent::RouteCompleted { entity });
            }
        }
        if !succeeded {
            return Ok(RouteStep::Blocked);
        }

        let floor = now + self.movement_time_of(entity);
        self.update::<CombatState, _>(entity, |state| {
            if state.move_at <= now {
                state.move_at = floor;
            }
        });
        Ok(RouteStep::Performed)
    }

    fn perform_route_action(&mut self, entity: Entity, action: RouteAction, now: u64) -> Result<bool, SimError> {
        let facing = self
            .component::<Position>(entity)
            .map(|pos| pos.dir)
            .ok_or(SimError::UnknownEntity(entity))?;
        let succeeded = match action {
            RouteAction::Move(dir) => self.route_step(entity, dir, now),
            RouteAction::RandomMove => {
                let dir = self.random_cardinal();
                self.route_step(entity, dir, now)
            }
            RouteAction::StepForward => self.route_step(entity, facing, now),
            RouteAction::StepBack => {
                let moved = !self.is_rooted(entity) && self.can_move(entity, facing.opposite()).is_walkable();
                if moved {
                    self.commit_step(entity, facing.opposite(), now, false, 0);
                    self.face(entity, facing);
                }
                moved
            }
            RouteAction::Face(dir) => {
                self.face(entity, dir);
                true
            }
            RouteAction::TurnClockwise => {
                self.face(entity, facing.clockwise());
                true
            }
            RouteAction::TurnCounterClockwise => {
                self.face(entity, facing.counter_clockwise());
                true
            }
            RouteAction::Turn180 => {
                self.face(entity, facing.opposite());
                true
            }
            RouteAction::RandomTurn => {
                let dir = self.random_cardinal();
                self.face(entity, dir);
                true
            }
            RouteAction::Wait(ms) => {
                self.update::<CombatState, _>(entity, |state| state.move_at = now + ms);
                true
            }
            RouteAction::Unrecognized(code) => return Err(SimError::UnrecognizedAction { code }),
        };
        Ok(succeeded)
    }

    fn route_step(&mut self, entity: Entity, dir: Direction, now: u64) -> bool {
        matches!(self.move_entity(entity, dir, now), StepResult::Moved)
    }

    fn random_cardinal(&mut self) -> Direction {
        let roll = self.rng.range(0, Direction::CARDINAL.len() as i32);
        Direction::CARDINAL[roll.clamp(0, 3) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_steps() -> MoveRoute {
        MoveRoute::new(vec![
            RouteAction::Move(Direction::Up),
            RouteAction::TurnClockwise,
            RouteAction::Wait(100),
        ])
    }

    #[test]
    fn codes_map_onto_actions() {
        assert_eq!(RouteAction::from_code(1), RouteAction::Move(Direction::Up));
        assert_eq!(RouteAction::from_code(8), RouteAction::Move(Direction::DownRight));
        assert_eq!(RouteAction::from_code(16), RouteAction::Face(Direction::Left));
        assert_eq!(RouteAction::from_code(24), RouteAction::Wait(1000));
        assert_eq!(RouteAction::from_code(10), RouteAction::Unrecognized(10));
        assert_eq!(RouteAction::from_code(0), RouteAction::Unrecognized(0));
    }

    #[test]
    fn repeating_route_wraps_without_completing() {
        let mut route = three_steps().repeating();
        route.advance();
        route.advance();
        assert_eq!(route.cursor(), 2);
        assert!(!route.advance());
        assert_eq!(route.cursor(), 0);
        assert!(!route.is_complete());
        assert_eq!(route.current(), Some(RouteAction::Move(Direction::Up)));
    }

    #[test]
    fn one_shot_route_completes_once() {
        let mut route = three_steps();
        assert!(!route.advance());
        assert!(!route.advance());
        assert!(route.advance());
        assert!(route.is_complete());
        assert_eq!(route.current(), None);
        assert!(!route.advance());
    }
}
