use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    combat::formula::DamageType, data::items::WeaponProfile, error::SimError, map::ZoneType,
    stats::StatKind,
};

pub const DEFAULT_MAP_WIDTH: i32 = 32;
pub const DEFAULT_MAP_HEIGHT: i32 = 26;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config is malformed at `{path}`: {message}")]
    Parse { path: String, message: String },
    #[error(transparent)]
    Invalid(#[from] SimError),
}

/// Server-wide tunables consumed by the simulation core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub map_width: i32,
    pub map_height: i32,
    pub regen_interval_ms: u64,
    pub combat_timer_ms: u64,
    /// Fraction added to movement time while blocking.
    pub blocking_slow: f64,
    /// Percent chance for each non-bound item to drop when a player dies.
    pub item_drop_chance: i32,
    pub max_dash_speed_ms: u64,
    pub min_attack_rate_ms: u64,
    pub max_attack_rate_ms: u64,
    pub max_stat_value: i32,
    pub max_spell_slots: usize,
    pub slide_chain_limit: u32,
    /// Zones in which players walk through each other.
    pub passable_zones: Vec<ZoneType>,
    pub unarmed: WeaponProfile,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            map_width: DEFAULT_MAP_WIDTH,
            map_height: DEFAULT_MAP_HEIGHT,
            regen_interval_ms: 3000,
            combat_timer_ms: 5000,
            blocking_slow: 0.3,
            item_drop_chance: 0,
            max_dash_speed_ms: 200,
            min_attack_rate_ms: 500,
            max_attack_rate_ms: 200,
            max_stat_value: 255,
            max_spell_slots: 35,
            slide_chain_limit: 32,
            passable_zones: Vec::new(),
            unarmed: WeaponProfile {
                damage: 1,
                damage_type: DamageType::Physical,
                scaling_stat: StatKind::Attack,
                scaling: 100,
                crit_chance: 0,
                crit_multiplier: 1.5,
                attack_animation: None,
            },
        }
    }
}

impl SimConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config: SimConfig =
            serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
                ConfigError::Parse {
                    path: error.path().to_string(),
                    message: error.inner().to_string(),
                }
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.map_width <= 0 || self.map_height <= 0 {
            return Err(SimError::invariant(format!(
                "map dimensions must be positive, got {}x{}",
                self.map_width, self.map_height
            )));
        }
        if !(0..=100).contains(&self.item_drop_chance) {
            return Err(SimError::invariant(format!(
                "item_drop_chance must be a percentage, got {}",
                self.item_drop_chance
            )));
        }
        if self.blocking_slow < 0.0 || !self.blocking_slow.is_finite() {
            return Err(SimError::invariant("blocking_slow must be a finite, non-negative fraction"));
        }
        if self.max_stat_value <= 0 {
            return Err(SimError::invariant("max_stat_value must be positive"));
        }
        if self.min_attack_rate_ms < self.max_attack_rate_ms {
            return Err(SimError::invariant(
                "min_attack_rate_ms is the slowest rate and cannot be below max_attack_rate_ms",
            ));
        }
        Ok(())
    }

    pub fn zone_is_passable(&self, zone: ZoneType) -> bool {
        self.passable_zones.contains(&zone)
    }

    pub fn attack_time_ms(&self, speed: i32) -> u64 {
        let max_stat = self.max_stat_value as f64;
        let fraction = (max_stat - speed as f64) / max_stat;
        let spread = self.min_attack_rate_ms as f64 - self.max_attack_rate_ms as f64;
        (self.max_attack_rate_ms as f64 + spread * fraction).max(0.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SimConfig::from_json_str(r#"{ "item_drop_chance": 25 }"#).expect("config");
        assert_eq!(config.item_drop_chance, 25);
        assert_eq!(config.combat_timer_ms, 5000);
        assert_eq!(config.map_width, DEFAULT_MAP_WIDTH);
    }

    #[test]
    fn parse_errors_report_the_field_path() {
        let error = SimConfig::from_json_str(r#"{ "unarmed": { "damage": "lots" } }"#)
            .expect_err("bad type");
        match error {
            ConfigError::Parse { path, .. } => assert_eq!(path, "unarmed.damage"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn out_of_range_drop_chance_is_rejected() {
        let error = SimConfig::from_json_str(r#"{ "item_drop_chance": 140 }"#).expect_err("invalid");
        assert!(matches!(
            error,
            ConfigError::Invalid(SimError::ConfigurationInvariantViolation { .. })
        ));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{ "passable_zones": ["Safe"] }}"#).expect("write");
        let config = SimConfig::from_path(file.path()).expect("config");
        assert!(config.zone_is_passable(ZoneType::Safe));
        assert!(!config.zone_is_passable(ZoneType::Arena));
    }

    #[test]
    fn attack_time_shrinks_with_speed() {
        let config = SimConfig::default();
        assert_eq!(config.attack_time_ms(0), 500);
        assert_eq!(config.attack_time_ms(255), 200);
        assert!(config.attack_time_ms(100) < config.attack_time_ms(10));
    }
}
