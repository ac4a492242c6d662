//! Authoritative simulation core for a tile-based multiplayer RPG server.

pub mod ai;
pub mod combat;
pub mod config;
pub mod data;
pub mod ecs;
pub mod error;
pub mod map;
pub mod movement;
pub mod notify;
pub mod rng;
pub mod route_script;
pub mod snapshot;
pub mod stats;
pub mod status;

pub use config::{ConfigError, SimConfig};
pub use ecs::{Intent, Placement, PlayerTemplate, SimWorld};
pub use error::SimError;
pub use snapshot::{EntitySnapshot, StatusSummary};
