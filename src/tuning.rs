//! Data-driven game balance
//!
//! Defaults mirror the values the game shipped with. A JSON override can be
//! supplied at startup; every field is optional in the file.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SimError;

/// What the score counts while the run is live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScoreMode {
    /// Seconds survived
    #[default]
    Time,
    /// World units travelled along the track
    Distance,
}

/// Tunable parameters for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerTuning {
    /// Where the first tile is placed
    pub start_point: Vec3,
    /// How many tiles to create when a run starts
    pub init_spawn_num: u32,
    /// How many leading tiles spawn with no obstacles
    pub init_no_obstacles: u32,
    /// Probability (0-1) that an eligible tile receives an obstacle
    pub obstacle_chance: f64,
    /// Seconds a player must wait between continues
    pub cooldown_secs: f64,
    /// Score by time or by distance
    pub score_mode: ScoreMode,
    /// How much track must exist ahead of the player
    pub ahead_distance: f32,
    /// How far behind the player a tile may fall before it is recycled
    pub recycle_margin: f32,
}

impl Default for RunnerTuning {
    fn default() -> Self {
        Self {
            start_point: Vec3::from_array(START_POINT),
            init_spawn_num: INIT_SPAWN_NUM,
            init_no_obstacles: INIT_NO_OBSTACLES,
            obstacle_chance: OBSTACLE_CHANCE,
            cooldown_secs: CONTINUE_COOLDOWN_SECS,
            score_mode: ScoreMode::Time,
            // Initial spawn covers this, ticks keep it topped up
            ahead_distance: INIT_SPAWN_NUM as f32 * TILE_LENGTH - TILE_LENGTH,
            recycle_margin: TILE_LENGTH,
        }
    }
}

impl RunnerTuning {
    /// Parse tuning from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let tuning: RunnerTuning = serde_json::from_str(json)?;
        tuning.validate()?;
        log::info!(
            "Loaded tuning: {} initial tiles, {} safe, obstacle chance {:.2}, cooldown {}s",
            tuning.init_spawn_num,
            tuning.init_no_obstacles,
            tuning.obstacle_chance,
            tuning.cooldown_secs
        );
        Ok(tuning)
    }

    /// Check ranges that would otherwise panic or stall the simulation
    pub fn validate(&self) -> Result<(), SimError> {
        if !(1..=MAX_INIT_SPAWN_NUM).contains(&self.init_spawn_num) {
            return Err(SimError::InvalidTuning(format!(
                "init_spawn_num must be in 1..={}, got {}",
                MAX_INIT_SPAWN_NUM, self.init_spawn_num
            )));
        }
        if !(0.0..=1.0).contains(&self.obstacle_chance) {
            return Err(SimError::InvalidTuning(format!(
                "obstacle_chance must be in 0..=1, got {}",
                self.obstacle_chance
            )));
        }
        if !self.cooldown_secs.is_finite() || self.cooldown_secs < 0.0 {
            return Err(SimError::InvalidTuning(format!(
                "cooldown_secs must be a non-negative number, got {}",
                self.cooldown_secs
            )));
        }
        if !self.ahead_distance.is_finite() || self.ahead_distance < 0.0 {
            return Err(SimError::InvalidTuning(format!(
                "ahead_distance must be non-negative, got {}",
                self.ahead_distance
            )));
        }
        if !self.recycle_margin.is_finite() || self.recycle_margin < 0.0 {
            return Err(SimError::InvalidTuning(format!(
                "recycle_margin must be non-negative, got {}",
                self.recycle_margin
            )));
        }
        if !self.start_point.is_finite() {
            return Err(SimError::InvalidTuning("start_point must be finite".into()));
        }
        Ok(())
    }
}
