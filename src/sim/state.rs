//! Session state and the operations that drive it
//!
//! A `Session` owns everything a single player session needs: the track,
//! the live run, the continue gate, and the shared context (clock, ad
//! toggle, cooldown). Only one run is active at a time; restarting replaces
//! the run but keeps the context.

use serde::{Deserialize, Serialize};

use super::ads::{AdAvailabilityPort, AdEvent};
use super::context::SessionContext;
use super::gate::{ContinuationGate, GatePhase, OfferView, Resolution};
use super::run::{RunState, RunStatus};
use super::segment::{ObstacleId, SegmentCatalog, SegmentId};
use super::track::TrackGenerator;
use crate::error::SimError;
use crate::settings::{Settings, SettingsStore};
use crate::tuning::RunnerTuning;

/// Notable things that happened, drained by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunEvent {
    /// A fresh run began
    Started,
    /// The run ended on an obstacle
    ObstacleHit {
        obstacle: ObstacleId,
        segment: SegmentId,
    },
    /// Continue is locked for this many seconds
    CooldownStarted { remaining: f64 },
    /// Continue needs an ad; one was requested
    AdRequested,
    /// Player continued; the obstacle is gone
    ContinueGranted { obstacle: ObstacleId, free: bool },
    Paused,
    Resumed,
    /// Player changed the ad preference
    ShowAdsChanged { show_ads: bool },
}

/// One player session
#[derive(Debug, Clone)]
pub struct Session {
    /// Seed the track RNG started from
    pub seed: u64,
    pub(crate) tuning: RunnerTuning,
    pub(crate) ctx: SessionContext,
    pub(crate) run: RunState,
    pub(crate) track: TrackGenerator,
    pub(crate) gate: ContinuationGate,
    /// Simulation tick counter
    pub(crate) time_ticks: u64,
    events: Vec<RunEvent>,
}

impl Session {
    /// Build a session; the ad toggle comes from stored settings
    pub fn new(
        tuning: RunnerTuning,
        catalog: SegmentCatalog,
        settings: &Settings,
        seed: u64,
    ) -> Result<Self, SimError> {
        tuning.validate()?;
        let track = TrackGenerator::new(catalog, &tuning, seed);
        let run = RunState::new(tuning.score_mode);
        log::info!("Session created (seed {}, show_ads {})", seed, settings.show_ads);
        Ok(Self {
            seed,
            ctx: SessionContext::new(settings.show_ads),
            run,
            track,
            gate: ContinuationGate::new(),
            time_ticks: 0,
            events: Vec::new(),
            tuning,
        })
    }

    /// Begin a run: fresh track, score 0, no offer
    pub fn start(&mut self) {
        self.gate.reset();
        self.run.start();
        self.track.reset(self.tuning.init_spawn_num);
        self.events.push(RunEvent::Started);
        log::info!("Run started");
    }

    /// Abandon the current run from any state and start over
    ///
    /// Cooldown and ad preference carry over.
    pub fn restart(&mut self) {
        log::info!("Restarting from {:?} / {:?}", self.run.status, self.gate.phase());
        self.start();
    }

    /// Physics reported the player touching an obstacle
    pub fn on_obstacle_hit(
        &mut self,
        obstacle: ObstacleId,
        ads: &mut dyn AdAvailabilityPort,
    ) -> Result<(), SimError> {
        if self.run.status != RunStatus::Running {
            return Err(SimError::InvalidTransition {
                action: "hit an obstacle",
                status: self.run.status,
            });
        }
        let segment = self
            .track
            .obstacle(obstacle)
            .map(|o| o.segment)
            .ok_or(SimError::UnknownObstacle(obstacle))?;

        self.run.on_obstacle_hit(obstacle, segment, &self.ctx)?;
        self.events.push(RunEvent::ObstacleHit { obstacle, segment });

        let before = self.gate.phase();
        let resolution = self.gate.open(&mut self.run, &self.ctx, ads)?;
        self.after_gate(before, resolution)
    }

    /// Ad network callback
    pub fn handle_ad_event(&mut self, event: &AdEvent) -> Result<(), SimError> {
        let before = self.gate.phase();
        let resolution = self.gate.handle_ad_event(event, &mut self.run);
        self.after_gate(before, resolution)
    }

    /// Player tapped the continue button
    pub fn tap_continue(&mut self, ads: &mut dyn AdAvailabilityPort) -> bool {
        self.gate.tap(ads)
    }

    /// Retry loading an ad after a failure
    pub fn retry_ad_load(&mut self, ads: &mut dyn AdAvailabilityPort) -> bool {
        self.gate.retry_load(ads)
    }

    /// Change the ad preference and persist it
    pub fn set_show_ads(&mut self, show_ads: bool, store: &mut dyn SettingsStore) {
        if self.ctx.show_ads == show_ads {
            return;
        }
        self.ctx.show_ads = show_ads;
        let mut settings = store.load();
        settings.show_ads = show_ads;
        store.save(&settings);
        self.events.push(RunEvent::ShowAdsChanged { show_ads });
        log::info!("Ads {}", if show_ads { "enabled" } else { "disabled" });
    }

    /// The player's "remove ads" action
    pub fn disable_ads(&mut self, store: &mut dyn SettingsStore) {
        self.set_show_ads(false, store);
    }

    pub fn tuning(&self) -> &RunnerTuning {
        &self.tuning
    }

    /// Clock, ad toggle and cooldown
    pub fn ctx(&self) -> &SessionContext {
        &self.ctx
    }

    /// The live run (read-only; collisions go through `on_obstacle_hit`)
    pub fn run(&self) -> &RunState {
        &self.run
    }

    pub fn track(&self) -> &TrackGenerator {
        &self.track
    }

    pub fn gate(&self) -> &ContinuationGate {
        &self.gate
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    /// Continue button state for the display
    pub fn view(&self) -> OfferView {
        self.gate.view(&self.ctx)
    }

    /// Take all events produced since the last call
    pub fn drain_events(&mut self) -> Vec<RunEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: RunEvent) {
        self.events.push(event);
    }

    /// Record gate transitions and apply a resolution if one came out
    pub(crate) fn after_gate(
        &mut self,
        before: GatePhase,
        resolution: Option<Resolution>,
    ) -> Result<(), SimError> {
        let after = self.gate.phase();
        if after != before {
            match after {
                GatePhase::CooldownCounting => self.events.push(RunEvent::CooldownStarted {
                    remaining: self.ctx.cooldown_remaining().unwrap_or(0.0),
                }),
                GatePhase::AdPending => self.events.push(RunEvent::AdRequested),
                _ => {}
            }
        }
        match resolution {
            Some(resolution) => self.apply_resolution(resolution),
            None => Ok(()),
        }
    }

    /// Clear the obstacle, restore the player, re-arm the cooldown
    fn apply_resolution(&mut self, resolution: Resolution) -> Result<(), SimError> {
        self.run.resume_after_continue()?;
        if self.track.remove_obstacle(resolution.obstacle).is_none() {
            // Recycled while the offer was open; nothing left to clear
            log::debug!("{} already gone from the track", resolution.obstacle);
        }
        self.ctx.arm_cooldown(self.tuning.cooldown_secs);
        self.gate.finish();
        self.events.push(RunEvent::ContinueGranted {
            obstacle: resolution.obstacle,
            free: resolution.free,
        });
        log::info!(
            "Continue granted ({}), next continue in {}s",
            if resolution.free { "free" } else { "ad" },
            self.tuning.cooldown_secs
        );
        Ok(())
    }
}
