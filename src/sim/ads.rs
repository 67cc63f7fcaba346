//! Ad subsystem boundary
//!
//! The simulation asks the ad network to load or show an ad; the network
//! answers later with `AdEvent`s delivered back into the session on the same
//! thread as ticks.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Outbound requests to the ad network
pub trait AdAvailabilityPort {
    /// Start loading an ad; answered by `Loaded` or `LoadFailed`
    fn request_load(&mut self);
    /// Show the loaded ad; answered by `ShowStarted` then `ShowCompleted`/`ShowFailed`
    fn request_show(&mut self);
}

/// Inbound ad network callbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdEvent {
    Loaded,
    LoadFailed { reason: String },
    ShowStarted,
    ShowFailed { reason: String },
    /// `success` is false when the ad was skipped or aborted
    ShowCompleted { success: bool },
}

/// How `LoopbackAds` answers requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdBehavior {
    /// Loads and completes successfully
    #[default]
    Succeed,
    /// Every load fails
    FailLoad,
    /// Loads, but every show fails
    FailShow,
    /// Loads, but the player skips the ad
    Skip,
}

/// In-process ad network that answers requests with queued events
///
/// Used by the headless driver and tests; counts every request it receives.
#[derive(Debug, Default, Clone)]
pub struct LoopbackAds {
    pub behavior: AdBehavior,
    pub loads_requested: u32,
    pub shows_requested: u32,
    pending: VecDeque<AdEvent>,
}

impl LoopbackAds {
    pub fn new(behavior: AdBehavior) -> Self {
        Self {
            behavior,
            ..Default::default()
        }
    }

    /// Take the next queued callback
    pub fn poll(&mut self) -> Option<AdEvent> {
        self.pending.pop_front()
    }

    /// Total requests of any kind
    pub fn requests(&self) -> u32 {
        self.loads_requested + self.shows_requested
    }
}

impl AdAvailabilityPort for LoopbackAds {
    fn request_load(&mut self) {
        self.loads_requested += 1;
        let event = match self.behavior {
            AdBehavior::FailLoad => AdEvent::LoadFailed {
                reason: String::from("no fill"),
            },
            _ => AdEvent::Loaded,
        };
        self.pending.push_back(event);
    }

    fn request_show(&mut self) {
        self.shows_requested += 1;
        match self.behavior {
            AdBehavior::Succeed => {
                self.pending.push_back(AdEvent::ShowStarted);
                self.pending.push_back(AdEvent::ShowCompleted { success: true });
            }
            AdBehavior::Skip => {
                self.pending.push_back(AdEvent::ShowStarted);
                self.pending.push_back(AdEvent::ShowCompleted { success: false });
            }
            AdBehavior::FailShow | AdBehavior::FailLoad => {
                self.pending.push_back(AdEvent::ShowFailed {
                    reason: String::from("not ready"),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_success_sequence() {
        let mut ads = LoopbackAds::new(AdBehavior::Succeed);
        ads.request_load();
        assert_eq!(ads.poll(), Some(AdEvent::Loaded));
        ads.request_show();
        assert_eq!(ads.poll(), Some(AdEvent::ShowStarted));
        assert_eq!(ads.poll(), Some(AdEvent::ShowCompleted { success: true }));
        assert_eq!(ads.poll(), None);
        assert_eq!(ads.requests(), 2);
    }

    #[test]
    fn test_loopback_failures() {
        let mut ads = LoopbackAds::new(AdBehavior::FailLoad);
        ads.request_load();
        assert!(matches!(ads.poll(), Some(AdEvent::LoadFailed { .. })));

        ads.behavior = AdBehavior::Skip;
        ads.request_show();
        assert_eq!(ads.poll(), Some(AdEvent::ShowStarted));
        assert_eq!(ads.poll(), Some(AdEvent::ShowCompleted { success: false }));
    }
}
