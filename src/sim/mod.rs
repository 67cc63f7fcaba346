//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, physics or platform dependencies

pub mod ads;
pub mod context;
pub mod gate;
pub mod run;
pub mod segment;
pub mod state;
pub mod tick;
pub mod track;

pub use ads::{AdAvailabilityPort, AdBehavior, AdEvent, LoopbackAds};
pub use context::SessionContext;
pub use gate::{ContinuationGate, GatePhase, OfferKind, OfferView, Resolution};
pub use run::{ContinuationOffer, RunState, RunStatus};
pub use segment::{
    Obstacle, ObstacleId, Segment, SegmentCatalog, SegmentId, SegmentTemplate, Transform,
};
pub use state::{RunEvent, Session};
pub use tick::{TickInput, tick};
pub use track::TrackGenerator;
