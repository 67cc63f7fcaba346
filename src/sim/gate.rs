//! Reward-gated continue
//!
//! After a collision the player may continue the run. A continue is free when
//! ads are switched off, otherwise it costs a fully watched ad. Either way a
//! cooldown must have elapsed since the previous continue.
//!
//! ```text
//! Idle ──hit──▶ AwaitingDecision ──cooldown running──▶ CooldownCounting
//!                  │    ▲                                   │
//!                  │    └────────── cooldown expired ───────┘
//!                  ├── ads off ──▶ Resolved (free)
//!                  └── ads on ───▶ AdPending ──ShowCompleted(true)──▶ Resolved
//! Resolved ──session applies continue──▶ Idle
//! ```
//!
//! Ad failures never resolve the gate. The only way out of `AdPending`
//! without a watched ad is a restart.

use serde::{Deserialize, Serialize};

use super::ads::{AdAvailabilityPort, AdEvent};
use super::context::SessionContext;
use super::run::RunState;
use super::segment::{ObstacleId, SegmentId};
use crate::error::SimError;
use crate::format_countdown;

/// Gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GatePhase {
    /// No offer
    #[default]
    Idle,
    /// Offer exists, deciding between cooldown, free and ad paths
    AwaitingDecision,
    /// Waiting for the cooldown to run out (not interactable)
    CooldownCounting,
    /// Waiting on the ad network
    AdPending,
    /// Continue granted, waiting for the session to apply it
    Resolved,
}

/// A granted continue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Obstacle to clear from the track
    pub obstacle: ObstacleId,
    pub segment: SegmentId,
    /// True when granted without an ad
    pub free: bool,
}

/// What the continue button should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferKind {
    Hidden,
    Counting,
    Free,
    LoadingAd,
    WatchAd,
    RetryAd,
}

/// Read-only snapshot for the display sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferView {
    pub kind: OfferKind,
    pub label: String,
    pub interactable: bool,
    /// `MM:SS` while counting down
    pub countdown: Option<String>,
}

/// Continue state machine
#[derive(Debug, Clone, Default)]
pub struct ContinuationGate {
    phase: GatePhase,
    /// An ad load has been requested and not answered
    loading: bool,
    /// A loaded ad is ready to show
    ad_ready: bool,
    /// An ad show has been requested and not finished
    showing: bool,
    /// Path taken by the last resolution
    resolved_free: bool,
}

impl ContinuationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    /// Open the gate for the run's fresh offer and evaluate it immediately
    pub fn open(
        &mut self,
        run: &mut RunState,
        ctx: &SessionContext,
        ads: &mut dyn AdAvailabilityPort,
    ) -> Result<Option<Resolution>, SimError> {
        if self.phase != GatePhase::Idle {
            return Err(SimError::GateBusy(self.phase));
        }
        if run.offer().is_none() {
            return Err(SimError::InvalidTransition {
                action: "open a continue without an offer",
                status: run.status,
            });
        }
        self.clear_ad_flags();
        self.phase = GatePhase::AwaitingDecision;
        Ok(self.update(run, ctx, ads))
    }

    /// Per-tick evaluation
    ///
    /// Moves out of `AwaitingDecision`/`CooldownCounting` as time and the ad
    /// toggle allow. Returns a resolution when the free path is taken.
    pub fn update(
        &mut self,
        run: &mut RunState,
        ctx: &SessionContext,
        ads: &mut dyn AdAvailabilityPort,
    ) -> Option<Resolution> {
        loop {
            match self.phase {
                GatePhase::CooldownCounting => {
                    if ctx.cooldown_remaining().is_some() {
                        return None;
                    }
                    log::info!("Continue cooldown expired");
                    self.phase = GatePhase::AwaitingDecision;
                }
                GatePhase::AwaitingDecision => {
                    if let Some(remaining) = ctx.cooldown_remaining() {
                        log::info!("Continue on cooldown for {}", format_countdown(remaining));
                        self.phase = GatePhase::CooldownCounting;
                        return None;
                    }
                    if !ctx.show_ads {
                        log::info!("Ads disabled, granting free continue");
                        return self.resolve(run, true);
                    }
                    self.phase = GatePhase::AdPending;
                    self.request_load(ads);
                    return None;
                }
                GatePhase::AdPending => {
                    // Player removed ads while waiting: the ad no longer gates anything
                    if ctx.show_ads || self.showing {
                        return None;
                    }
                    log::info!("Ads switched off while pending, re-evaluating continue");
                    self.clear_ad_flags();
                    self.phase = GatePhase::AwaitingDecision;
                }
                GatePhase::Idle | GatePhase::Resolved => return None,
            }
        }
    }

    /// Feed an ad network callback into the gate
    pub fn handle_ad_event(&mut self, event: &AdEvent, run: &mut RunState) -> Option<Resolution> {
        if self.phase != GatePhase::AdPending {
            log::debug!("Ignoring {:?} in {:?}", event, self.phase);
            return None;
        }
        // Only answers to this offer's own outstanding request count
        let requested = match event {
            AdEvent::Loaded | AdEvent::LoadFailed { .. } => self.loading,
            _ => self.showing,
        };
        if !requested {
            log::debug!("Ignoring unrequested {:?}", event);
            return None;
        }
        match event {
            AdEvent::Loaded => {
                self.loading = false;
                self.set_ad_ready(run, true);
                log::info!("Ad loaded, continue is available");
                None
            }
            AdEvent::LoadFailed { reason } => {
                self.loading = false;
                self.set_ad_ready(run, false);
                log::warn!("Ad failed to load: {}", reason);
                None
            }
            AdEvent::ShowStarted => {
                self.showing = true;
                log::info!("Ad show started");
                None
            }
            AdEvent::ShowFailed { reason } => {
                self.showing = false;
                self.set_ad_ready(run, false);
                log::warn!("Ad failed to show: {}", reason);
                None
            }
            AdEvent::ShowCompleted { success: false } => {
                self.showing = false;
                self.set_ad_ready(run, false);
                log::warn!("Ad was not watched to completion, no continue");
                None
            }
            AdEvent::ShowCompleted { success: true } => {
                self.showing = false;
                self.set_ad_ready(run, false);
                log::info!("Ad watched, granting continue");
                self.resolve(run, false)
            }
        }
    }

    /// Player tapped the continue button
    ///
    /// Shows the ad when one is ready, otherwise retries the load. Returns
    /// true if a request went out.
    pub fn tap(&mut self, ads: &mut dyn AdAvailabilityPort) -> bool {
        if self.phase != GatePhase::AdPending || self.showing {
            return false;
        }
        if self.ad_ready {
            self.showing = true;
            ads.request_show();
            log::info!("Showing continue ad");
            true
        } else {
            self.retry_load(ads)
        }
    }

    /// Ask for another ad after a failure
    pub fn retry_load(&mut self, ads: &mut dyn AdAvailabilityPort) -> bool {
        if self.phase != GatePhase::AdPending || self.loading || self.ad_ready || self.showing {
            return false;
        }
        self.request_load(ads);
        true
    }

    /// Return to Idle once the session has applied a resolution
    pub fn finish(&mut self) {
        if self.phase == GatePhase::Resolved {
            self.phase = GatePhase::Idle;
        }
    }

    /// Drop everything (restart)
    pub fn reset(&mut self) {
        if self.phase != GatePhase::Idle {
            log::info!("Continue gate reset from {:?}", self.phase);
        }
        self.phase = GatePhase::Idle;
        self.clear_ad_flags();
    }

    /// Whether tapping the button does anything
    pub fn is_interactable(&self) -> bool {
        self.phase == GatePhase::AdPending && !self.loading && !self.showing
    }

    /// Path taken by the most recent resolution
    pub fn last_resolution_free(&self) -> bool {
        self.resolved_free
    }

    /// Snapshot for the display
    pub fn view(&self, ctx: &SessionContext) -> OfferView {
        let (kind, countdown) = match self.phase {
            GatePhase::Idle | GatePhase::Resolved => (OfferKind::Hidden, None),
            GatePhase::CooldownCounting => (
                OfferKind::Counting,
                Some(format_countdown(ctx.cooldown_remaining().unwrap_or(0.0))),
            ),
            GatePhase::AwaitingDecision if ctx.show_ads => (OfferKind::LoadingAd, None),
            GatePhase::AwaitingDecision => (OfferKind::Free, None),
            GatePhase::AdPending if self.ad_ready && !self.showing => (OfferKind::WatchAd, None),
            GatePhase::AdPending if self.loading || self.showing => (OfferKind::LoadingAd, None),
            GatePhase::AdPending => (OfferKind::RetryAd, None),
        };
        let label = match kind {
            OfferKind::Hidden => String::new(),
            OfferKind::Counting => countdown.clone().unwrap_or_default(),
            OfferKind::Free => String::from("Continue"),
            OfferKind::LoadingAd => String::from("Loading..."),
            OfferKind::WatchAd => String::from("Continue (Play Ad)"),
            OfferKind::RetryAd => String::from("Retry Ad"),
        };
        OfferView {
            kind,
            label,
            interactable: self.is_interactable(),
            countdown,
        }
    }

    fn resolve(&mut self, run: &RunState, free: bool) -> Option<Resolution> {
        let offer = run.offer()?;
        self.phase = GatePhase::Resolved;
        self.resolved_free = free;
        Some(Resolution {
            obstacle: offer.pending_obstacle,
            segment: offer.segment,
            free,
        })
    }

    fn request_load(&mut self, ads: &mut dyn AdAvailabilityPort) {
        self.loading = true;
        ads.request_load();
        log::info!("Requested continue ad");
    }

    fn set_ad_ready(&mut self, run: &mut RunState, ready: bool) {
        self.ad_ready = ready;
        if let Some(offer) = run.offer_mut() {
            offer.ad_available = ready;
        }
    }

    fn clear_ad_flags(&mut self) {
        self.loading = false;
        self.ad_ready = false;
        self.showing = false;
    }
}
