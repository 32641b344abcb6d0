//! Engine configuration.
//!
//! [`EngineConfig`] carries every tunable the world uses. All fields have
//! defaults, so a JSON document only needs the values it changes:
//!
//! ```
//! use taiga_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "world_size": 64, "seed": 7 }"#).unwrap();
//! assert_eq!(config.world_size, 64);
//! assert_eq!(config.activation_radius, 10);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use taiga_grid::tile::SlotKind;

use crate::tick::TickConfig;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the engine cannot run with.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Tunables for one world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Side length N of the N×N grid.
    pub world_size: i32,
    /// Seed for the world RNG (wandering, damage rolls, spawn search).
    pub seed: u64,
    /// Scheduler interval.
    pub tick_interval_ms: u64,
    /// Half-extent of the box around each player inside which NPCs act.
    /// Also the half-extent of an NPC's pathfinding view.
    pub activation_radius: i32,
    /// Player sight radius.
    pub fov_radius: i32,
    /// Age after which an NPC's pathfinding view is rebuilt from scratch.
    pub path_staleness_ms: u64,
    pub player_capacity: u32,
    pub npc_capacity: u32,
    pub item_capacity: u32,
    pub flora_capacity: u32,
    /// Entries kept in each player's event log.
    pub player_event_log_len: usize,
    /// Entries kept in the world-wide log.
    pub world_event_log_len: usize,
    /// Real seconds per in-game day.
    pub seconds_per_day: f64,
    /// Minimum time between two player actions.
    pub player_move_cooldown_ms: u64,
    /// Weight a player can carry.
    pub max_carry: f64,
    pub player_max_health: i32,
    /// Random draws before a spawn search gives up.
    pub spawn_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_size: 256,
            seed: 0x7A16A,
            tick_interval_ms: 100,
            activation_radius: 10,
            fov_radius: 10,
            path_staleness_ms: 2000,
            player_capacity: SlotKind::Player.max_handle(),
            npc_capacity: SlotKind::Npc.max_handle(),
            item_capacity: SlotKind::Item.max_handle(),
            flora_capacity: SlotKind::Flora.max_handle(),
            player_event_log_len: 4,
            world_event_log_len: 100,
            seconds_per_day: 6.66,
            player_move_cooldown_ms: 100,
            max_carry: 50.0,
            player_max_health: 20,
            spawn_attempts: 1000,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    ///
    /// Arena capacities are bounded by the packed tile field widths, so a
    /// larger capacity would hand out handles that cannot be stored.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world_size <= 0 {
            return Err(invalid("world_size", format!("must be positive, got {}", self.world_size)));
        }
        if self.world_size > i32::from(i16::MAX) {
            return Err(invalid("world_size", format!("must be at most {}, got {}", i16::MAX, self.world_size)));
        }
        if self.tick_interval_ms == 0 {
            return Err(invalid("tick_interval_ms", "must be non-zero".to_owned()));
        }
        if self.activation_radius < 0 {
            return Err(invalid("activation_radius", "must not be negative".to_owned()));
        }
        if self.fov_radius < 0 {
            return Err(invalid("fov_radius", "must not be negative".to_owned()));
        }
        for (field, value, kind) in [
            ("player_capacity", self.player_capacity, SlotKind::Player),
            ("npc_capacity", self.npc_capacity, SlotKind::Npc),
            ("item_capacity", self.item_capacity, SlotKind::Item),
            ("flora_capacity", self.flora_capacity, SlotKind::Flora),
        ] {
            if value > kind.max_handle() {
                return Err(invalid(
                    field,
                    format!("{value} exceeds the {kind} tile field (max {})", kind.max_handle()),
                ));
            }
        }
        if !(self.seconds_per_day.is_finite() && self.seconds_per_day > 0.0) {
            return Err(invalid("seconds_per_day", format!("must be positive, got {}", self.seconds_per_day)));
        }
        if !(self.max_carry.is_finite() && self.max_carry >= 0.0) {
            return Err(invalid("max_carry", format!("must be non-negative, got {}", self.max_carry)));
        }
        if self.player_max_health <= 0 {
            return Err(invalid("player_max_health", "must be positive".to_owned()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn path_staleness(&self) -> Duration {
        Duration::from_millis(self.path_staleness_ms)
    }

    pub fn move_cooldown(&self) -> Duration {
        Duration::from_millis(self.player_move_cooldown_ms)
    }

    /// Scheduler settings derived from this config.
    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            interval: self.tick_interval(),
        }
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
