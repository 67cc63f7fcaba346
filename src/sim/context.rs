//! Session-wide state shared by the run and the continue gate
//!
//! Lives for the whole session: survives restarts, is not persisted (except
//! `show_ads`, which is written through a `SettingsStore` by the session).

use serde::{Deserialize, Serialize};

/// Clock, ad toggle and continue cooldown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Session clock in seconds, advanced every tick
    pub now: f64,
    /// Whether continues must be paid for with an ad
    pub show_ads: bool,
    /// When the next continue becomes available (None = available now)
    pub cooldown_expiry: Option<f64>,
}

impl SessionContext {
    pub fn new(show_ads: bool) -> Self {
        Self {
            now: 0.0,
            show_ads,
            cooldown_expiry: None,
        }
    }

    /// Advance the clock
    pub fn advance(&mut self, dt: f64) {
        if dt > 0.0 {
            self.now += dt;
        }
    }

    /// Seconds until the cooldown expires, if it is still running
    pub fn cooldown_remaining(&self) -> Option<f64> {
        self.cooldown_expiry
            .map(|expiry| expiry - self.now)
            .filter(|remaining| *remaining > 0.0)
    }

    /// Start a new cooldown of `duration` seconds from now
    pub fn arm_cooldown(&mut self, duration: f64) {
        self.cooldown_expiry = Some(self.now + duration);
    }
}
