//! Tilt Roller - endless runner core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (track generation, run state, continue gate)
//! - `tuning`: Data-driven game balance
//! - `settings`: Player preferences (ad toggle) and their storage
//! - `error`: Contract violations and configuration errors

pub mod error;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::SimError;
pub use settings::{MemoryStore, Settings, SettingsStore};
pub use tuning::{RunnerTuning, ScoreMode};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, matches the engine's physics step)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Where the first tile is placed
    pub const START_POINT: [f32; 3] = [0.0, 0.0, -5.0];
    /// Tiles created up front when a run starts
    pub const INIT_SPAWN_NUM: u32 = 10;
    /// Upper bound for `INIT_SPAWN_NUM` style tuning
    pub const MAX_INIT_SPAWN_NUM: u32 = 15;
    /// Leading tiles of a run that never carry obstacles
    pub const INIT_NO_OBSTACLES: u32 = 4;
    /// Chance an eligible tile receives an obstacle
    pub const OBSTACLE_CHANCE: f64 = 1.0;

    /// Seconds between continues
    pub const CONTINUE_COOLDOWN_SECS: f64 = 15.0;

    /// Default tile length (world units, entry to exit)
    pub const TILE_LENGTH: f32 = 10.0;
    /// Lateral spacing of obstacle lanes on a straight tile
    pub const LANE_SPACING: f32 = 2.0;
}

/// Format remaining seconds as zero-padded `MM:SS`
///
/// Fractions of a second are truncated, negative input clamps to zero.
pub fn format_countdown(remaining_secs: f64) -> String {
    let total = if remaining_secs.is_finite() && remaining_secs > 0.0 {
        remaining_secs.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}
