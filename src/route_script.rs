//! Plain-text move routes: one character per action, `#` starts a comment
//! line, and `@repeat` / `@ignore-blocked` lines set the route flags.
//!
//! `w a s d` move, `q e z c` move diagonally, `?` moves randomly, `f` steps
//! forward, `b` steps back, `W A S D` face, `>` `<` turn clockwise and
//! counter-clockwise, `u` turns around, `r` turns randomly, `.` `:` `_` wait
//! 100, 500 and 1000 ms.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::movement::{Direction, MoveRoute, RouteAction};

pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<MoveRoute> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = Vec::new();
    for line in reader.lines() {
        lines.push(line?);
    }
    Ok(parse_lines(lines.iter().map(String::as_str)))
}

pub fn from_str(script: &str) -> MoveRoute {
    parse_lines(script.lines())
}

fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> MoveRoute {
    let mut route = MoveRoute::default();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match trimmed {
            "@repeat" => route.repeat = true,
            "@ignore-blocked" => route.ignore_if_blocked = true,
            directive if directive.starts_with('@') => {
                tracing::warn!(directive, "unknown_route_directive");
            }
            actions => {
                for symbol in actions.chars().filter(|c| !c.is_whitespace()) {
                    match char_to_action(symbol) {
                        Some(action) => route.actions.push(action),
                        None => tracing::warn!(%symbol, "unknown_route_symbol"),
                    }
                }
            }
        }
    }
    route
}

fn char_to_action(c: char) -> Option<RouteAction> {
    match c {
        'w' => Some(RouteAction::Move(Direction::Up)),
        's' => Some(RouteAction::Move(Direction::Down)),
        'a' => Some(RouteAction::Move(Direction::Left)),
        'd' => Some(RouteAction::Move(Direction::Right)),
        'q' => Some(RouteAction::Move(Direction::UpLeft)),
        'e' => Some(RouteAction::Move(Direction::UpRight)),
        'z' => Some(RouteAction::Move(Direction::DownLeft)),
        'c' => Some(RouteAction::Move(Direction::DownRight)),
        '?' => Some(RouteAction::RandomMove),
        'f' => Some(RouteAction::StepForward),
        'b' => Some(RouteAction::StepBack),
        'W' => Some(RouteAction::Face(Direction::Up)),
        'S' => Some(RouteAction::Face(Direction::Down)),
        'A' => Some(RouteAction::Face(Direction::Left)),
        'D' => Some(RouteAction::Face(Direction::Right)),
        '>' => Some(RouteAction::TurnClockwise),
        '<' => Some(RouteAction::TurnCounterClockwise),
        'u' => Some(RouteAction::Turn180),
        'r' => Some(RouteAction::RandomTurn),
        '.' => Some(RouteAction::Wait(100)),
        ':' => Some(RouteAction::Wait(500)),
        '_' => Some(RouteAction::Wait(1000)),
        _ => None,
    }
}
