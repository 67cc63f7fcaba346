//! Fixed timestep simulation tick
//!
//! Advances the session by one frame: clock, pause toggle, score, track
//! frontier, and the continue gate's time-driven transitions.

use super::ads::AdAvailabilityPort;
use super::run::RunStatus;
use super::state::{RunEvent, Session};
use crate::error::SimError;

/// Input for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Distance the player rolled along the track this tick (from physics)
    pub travelled: f32,
    /// Pause toggle
    pub pause: bool,
}

/// Advance the session by one fixed timestep
pub fn tick(
    session: &mut Session,
    input: &TickInput,
    dt: f32,
    ads: &mut dyn AdAvailabilityPort,
) -> Result<(), SimError> {
    // Wall time keeps flowing for the cooldown even while paused or over
    session.ctx.advance(dt as f64);
    session.time_ticks += 1;

    // Handle pause toggle
    if input.pause && session.run.toggle_pause() {
        let event = match session.run.status {
            RunStatus::Paused => RunEvent::Paused,
            _ => RunEvent::Resumed,
        };
        log::info!("{:?}", event);
        session.push_event(event);
    }

    session.run.tick(dt, input.travelled);

    // Keep track ahead of the player and drop what is behind
    let distance = session.run.distance;
    session
        .track
        .ensure_frontier(distance, session.tuning.ahead_distance)?;
    session
        .track
        .recycle_behind(distance, session.tuning.recycle_margin);

    let before = session.gate.phase();
    let resolution = session.gate.update(&mut session.run, &session.ctx, ads);
    session.after_gate(before, resolution)
}
