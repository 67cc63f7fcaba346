//! Simulation errors
//!
//! Only contract violations and bad configuration surface here. Ad failures
//! are not errors: they are events the continue gate absorbs.

use crate::sim::{GatePhase, ObstacleId, RunStatus};

/// Errors returned by fallible simulation operations.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Operation is not valid in the run's current status.
    #[error("cannot {action} while run is {status:?}")]
    InvalidTransition {
        action: &'static str,
        status: RunStatus,
    },

    /// A continue offer is already being decided.
    #[error("continue gate is busy ({0:?})")]
    GateBusy(GatePhase),

    /// Frontier distance must be non-negative.
    #[error("frontier distance must be non-negative, got {0}")]
    NegativeDistance(f32),

    /// Distance is not finite, or too large for tiles to extend the track.
    #[error("track distance {0} is out of range")]
    InvalidDistance(f32),

    /// Collision reported against an obstacle the track does not own.
    #[error("unknown obstacle {0}")]
    UnknownObstacle(ObstacleId),

    /// Tuning values out of range.
    #[error("invalid tuning: {0}")]
    InvalidTuning(String),

    /// Tuning or settings JSON failed to parse.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// True for errors caused by calling an operation at the wrong time.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            SimError::InvalidTransition { .. }
                | SimError::GateBusy(_)
                | SimError::NegativeDistance(_)
                | SimError::InvalidDistance(_)
                | SimError::UnknownObstacle(_)
        )
    }
}
