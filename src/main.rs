//! Tilt Roller entry point
//!
//! Native: runs a headless demo session (fixed-timestep loop, scripted
//! player, loopback ad network) and logs what happens.
//! Web: installs the logger and panic hook; the host page drives the session.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use tilt_roller::consts::*;
    use tilt_roller::sim::{
        AdBehavior, LoopbackAds, ObstacleId, OfferKind, RunEvent, RunStatus, SegmentCatalog,
        Session, TickInput, tick,
    };
    use tilt_roller::{MemoryStore, RunnerTuning, SettingsStore, SimError};

    /// Lane the scripted player holds (middle of a three-lane tile)
    const PLAYER_LANE: usize = 1;
    /// Forward speed of the scripted player (world units per second)
    const ROLL_SPEED: f32 = 5.0;
    /// Simulated wall time for the demo
    const DEMO_SECS: f32 = 120.0;
    /// Render frame time the accumulator is fed with
    const FRAME_DT: f32 = 1.0 / 30.0;
    /// Paid continues before the scripted player buys "remove ads"
    const PAID_CONTINUES: u32 = 2;

    /// Demo instance holding all state
    struct Game {
        session: Session,
        ads: LoopbackAds,
        store: MemoryStore,
        accumulator: f32,
        paid_continues: u32,
        free_continues: u32,
        crashes: u32,
    }

    impl Game {
        fn new(tuning: RunnerTuning, seed: u64) -> Result<Self, SimError> {
            let store = MemoryStore::new();
            let settings = store.load();
            let mut session = Session::new(tuning, SegmentCatalog::default(), &settings, seed)?;
            session.start();
            Ok(Self {
                session,
                ads: LoopbackAds::new(AdBehavior::Succeed),
                store,
                accumulator: 0.0,
                paid_continues: 0,
                free_continues: 0,
                crashes: 0,
            })
        }

        /// Run simulation ticks for one render frame
        fn update(&mut self, dt: f32) -> Result<(), SimError> {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                let travelled = if self.session.run().status == RunStatus::Running {
                    ROLL_SPEED * SIM_DT
                } else {
                    0.0
                };
                let input = TickInput {
                    travelled,
                    ..Default::default()
                };
                tick(&mut self.session, &input, SIM_DT, &mut self.ads)?;
                self.accumulator -= SIM_DT;
                substeps += 1;

                if let Some(obstacle) = self.collision() {
                    self.session.on_obstacle_hit(obstacle, &mut self.ads)?;
                }
                self.pump_ads()?;
                self.press_continue();
                self.handle_events();
            }
            Ok(())
        }

        /// Stand-in for physics: the player hits an obstacle in its lane
        /// once it rolls past the slot
        fn collision(&self) -> Option<ObstacleId> {
            if self.session.run().status != RunStatus::Running {
                return None;
            }
            let distance = self.session.run().distance;
            self.session.track().obstacles().find_map(|obstacle| {
                let segment = self.session.track().segment(obstacle.segment)?;
                let slot_distance = segment.start_distance + segment.length / 2.0;
                let crossed = distance >= slot_distance && distance - slot_distance < 1.0;
                (crossed && obstacle.slot == PLAYER_LANE).then_some(obstacle.id)
            })
        }

        /// Deliver ad network callbacks
        fn pump_ads(&mut self) -> Result<(), SimError> {
            while let Some(event) = self.ads.poll() {
                self.session.handle_ad_event(&event)?;
            }
            Ok(())
        }

        /// Scripted player taps the button as soon as it does something
        fn press_continue(&mut self) {
            let view = self.session.view();
            if view.kind == OfferKind::WatchAd && view.interactable {
                self.session.tap_continue(&mut self.ads);
            }
        }

        fn handle_events(&mut self) {
            for event in self.session.drain_events() {
                match event {
                    RunEvent::ObstacleHit { .. } => self.crashes += 1,
                    RunEvent::ContinueGranted { free: true, .. } => self.free_continues += 1,
                    RunEvent::ContinueGranted { free: false, .. } => {
                        self.paid_continues += 1;
                        if self.paid_continues == PAID_CONTINUES {
                            log::info!("Player bought \"remove ads\"");
                            self.session.disable_ads(&mut self.store);
                        }
                    }
                    RunEvent::CooldownStarted { remaining } => {
                        log::info!("Continue locked: {}", tilt_roller::format_countdown(remaining));
                    }
                    _ => {}
                }
            }
        }
    }

    pub fn run() -> Result<(), SimError> {
        let tuning = match std::env::args().nth(1) {
            Some(path) => {
                let json = std::fs::read_to_string(&path).map_err(|e| {
                    SimError::InvalidTuning(format!("cannot read {}: {}", path, e))
                })?;
                RunnerTuning::from_json(&json)?
            }
            None => RunnerTuning::default(),
        };

        let mut game = Game::new(tuning, 0x5EED)?;
        let frames = (DEMO_SECS / FRAME_DT) as u32;
        let mut last_label = String::new();
        for _ in 0..frames {
            game.update(FRAME_DT)?;

            let view = game.session.view();
            if view.kind == OfferKind::Counting && view.label != last_label {
                log::debug!("Continue button: {}", view.label);
            }
            last_label = view.label;
        }

        println!("Distance: {:.1}", game.session.run().distance);
        println!("Score:    {:.1}", game.session.run().score);
        println!("Crashes:  {}", game.crashes);
        println!("Continues: {} paid, {} free", game.paid_continues, game.free_continues);
        println!(
            "Status:   {:?} / {:?}",
            game.session.run().status,
            game.session.gate().phase()
        );
        println!("Settings: {}", game.store.raw().unwrap_or("(none)"));
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    use tilt_roller::SettingsStore;
    use tilt_roller::settings::LocalStorageStore;

    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        return;
    }

    let settings = LocalStorageStore.load();
    log::info!("Tilt Roller core loaded (show_ads {})", settings.show_ads);
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Tilt Roller (native) starting headless demo...");

    if let Err(e) = headless::run() {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
