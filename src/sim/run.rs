//! Live run state
//!
//! Tracks whether the run is live, paused or over, the score, and the single
//! continue offer created when the player hits an obstacle.

use serde::{Deserialize, Serialize};

use super::context::SessionContext;
use super::segment::{ObstacleId, SegmentId};
use crate::error::SimError;
use crate::tuning::ScoreMode;

/// Current status of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Player is rolling, score advances
    Running,
    /// Frozen by the pause menu
    Paused,
    /// Player hit an obstacle
    Over,
}

/// The pending continue created by a collision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationOffer {
    /// Obstacle that ended the run; removed if the player continues
    pub pending_obstacle: ObstacleId,
    /// Tile carrying that obstacle
    pub segment: SegmentId,
    /// Cooldown expiry captured when the offer was created
    pub cooldown_expiry: Option<f64>,
    /// Last known ad state (true once an ad has loaded)
    pub ad_available: bool,
}

/// Score, status and continue offer for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub status: RunStatus,
    /// Monotonic while Running
    pub score: f32,
    /// Player distance along the track
    pub distance: f32,
    /// Continues granted this run
    pub continues: u32,
    score_mode: ScoreMode,
    offer: Option<ContinuationOffer>,
}

impl RunState {
    /// A fresh, running run
    pub fn new(score_mode: ScoreMode) -> Self {
        Self {
            status: RunStatus::Running,
            score: 0.0,
            distance: 0.0,
            continues: 0,
            score_mode,
            offer: None,
        }
    }

    /// Begin (or restart) the run
    pub fn start(&mut self) {
        if self.offer.take().is_some() {
            log::info!("Discarding pending continue offer");
        }
        self.status = RunStatus::Running;
        self.score = 0.0;
        self.distance = 0.0;
        self.continues = 0;
    }

    /// Advance score and distance; no-op unless Running
    pub fn tick(&mut self, dt: f32, travelled: f32) {
        if self.status != RunStatus::Running {
            return;
        }
        let travelled = if travelled.is_finite() {
            travelled.max(0.0)
        } else {
            log::warn!("Ignoring non-finite travel distance {}", travelled);
            0.0
        };
        self.distance += travelled;
        self.score += match self.score_mode {
            ScoreMode::Time => dt.max(0.0),
            ScoreMode::Distance => travelled,
        };
    }

    /// End the run on a collision and open a continue offer
    pub fn on_obstacle_hit(
        &mut self,
        obstacle: ObstacleId,
        segment: SegmentId,
        ctx: &SessionContext,
    ) -> Result<&ContinuationOffer, SimError> {
        if self.status != RunStatus::Running {
            return Err(SimError::InvalidTransition {
                action: "hit an obstacle",
                status: self.status,
            });
        }
        self.status = RunStatus::Over;
        log::info!(
            "Run over: hit {} at distance {:.1}, score {:.1}",
            obstacle,
            self.distance,
            self.score
        );
        Ok(self.offer.insert(ContinuationOffer {
            pending_obstacle: obstacle,
            segment,
            cooldown_expiry: ctx.cooldown_expiry,
            ad_available: false,
        }))
    }

    /// Bring the run back after a granted continue, consuming the offer
    pub fn resume_after_continue(&mut self) -> Result<ContinuationOffer, SimError> {
        if self.status != RunStatus::Over {
            return Err(SimError::InvalidTransition {
                action: "continue",
                status: self.status,
            });
        }
        let offer = self.offer.take().ok_or(SimError::InvalidTransition {
            action: "continue without an offer",
            status: self.status,
        })?;
        self.status = RunStatus::Running;
        self.continues += 1;
        Ok(offer)
    }

    pub fn pause(&mut self) -> Result<(), SimError> {
        if self.status != RunStatus::Running {
            return Err(SimError::InvalidTransition {
                action: "pause",
                status: self.status,
            });
        }
        self.status = RunStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SimError> {
        if self.status != RunStatus::Paused {
            return Err(SimError::InvalidTransition {
                action: "resume",
                status: self.status,
            });
        }
        self.status = RunStatus::Running;
        Ok(())
    }

    /// Pause-menu toggle; ignored while the run is over
    ///
    /// Returns true if the status changed.
    pub fn toggle_pause(&mut self) -> bool {
        match self.status {
            RunStatus::Running => self.pause().is_ok(),
            RunStatus::Paused => self.resume().is_ok(),
            RunStatus::Over => false,
        }
    }

    pub fn offer(&self) -> Option<&ContinuationOffer> {
        self.offer.as_ref()
    }

    pub fn offer_mut(&mut self) -> Option<&mut ContinuationOffer> {
        self.offer.as_mut()
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SessionContext {
        SessionContext::new(true)
    }

    #[test]
    fn test_score_only_while_running() {
        let mut run = RunState::new(ScoreMode::Time);
        run.tick(1.0, 3.0);
        assert_eq!(run.score, 1.0);
        assert_eq!(run.distance, 3.0);

        run.pause().unwrap();
        run.tick(1.0, 3.0);
        assert_eq!(run.score, 1.0);

        run.resume().unwrap();
        run.on_obstacle_hit(ObstacleId(1), SegmentId(1), &ctx()).unwrap();
        run.tick(1.0, 3.0);
        assert_eq!(run.score, 1.0);
        assert_eq!(run.distance, 3.0);
    }

    #[test]
    fn test_distance_scoring() {
        let mut run = RunState::new(ScoreMode::Distance);
        run.tick(0.5, 4.0);
        run.tick(0.5, -2.0);
        assert_eq!(run.score, 4.0);
        run.tick(0.5, f32::INFINITY);
        run.tick(0.5, f32::NAN);
        assert_eq!(run.score, 4.0);
        assert_eq!(run.distance, 4.0);
    }

    #[test]
    fn test_hit_requires_running() {
        let mut run = RunState::new(ScoreMode::Time);
        run.on_obstacle_hit(ObstacleId(1), SegmentId(1), &ctx()).unwrap();
        assert_eq!(run.status, RunStatus::Over);

        let err = run.on_obstacle_hit(ObstacleId(2), SegmentId(2), &ctx()).unwrap_err();
        assert!(err.is_contract_violation());
        // The first offer is untouched
        assert_eq!(run.offer().unwrap().pending_obstacle, ObstacleId(1));

        let mut paused = RunState::new(ScoreMode::Time);
        paused.pause().unwrap();
        assert!(matches!(
            paused.on_obstacle_hit(ObstacleId(1), SegmentId(1), &ctx()),
            Err(SimError::InvalidTransition { status: RunStatus::Paused, .. })
        ));
        assert!(paused.offer().is_none());
    }

    #[test]
    fn test_offer_captures_cooldown() {
        let mut context = ctx();
        context.arm_cooldown(15.0);
        let mut run = RunState::new(ScoreMode::Time);
        let offer = run.on_obstacle_hit(ObstacleId(3), SegmentId(2), &context).unwrap();
        assert_eq!(offer.cooldown_expiry, Some(15.0));
        assert!(!offer.ad_available);
    }

    #[test]
    fn test_start_clears_offer() {
        let mut run = RunState::new(ScoreMode::Time);
        run.tick(2.0, 5.0);
        run.on_obstacle_hit(ObstacleId(1), SegmentId(1), &ctx()).unwrap();
        run.start();
        assert!(run.offer().is_none());
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.score, 0.0);
        assert_eq!(run.distance, 0.0);
    }

    #[test]
    fn test_resume_after_continue() {
        let mut run = RunState::new(ScoreMode::Time);
        assert!(run.resume_after_continue().is_err());

        run.on_obstacle_hit(ObstacleId(9), SegmentId(4), &ctx()).unwrap();
        let offer = run.resume_after_continue().unwrap();
        assert_eq!(offer.pending_obstacle, ObstacleId(9));
        assert!(run.is_running());
        assert!(run.offer().is_none());
        assert_eq!(run.continues, 1);
    }

    #[test]
    fn test_toggle_pause() {
        let mut run = RunState::new(ScoreMode::Time);
        assert!(run.toggle_pause());
        assert_eq!(run.status, RunStatus::Paused);
        assert!(run.toggle_pause());
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.resume().is_err());

        run.on_obstacle_hit(ObstacleId(1), SegmentId(1), &ctx()).unwrap();
        assert!(!run.toggle_pause());
        assert_eq!(run.status, RunStatus::Over);
    }
}
