//! Fixed-timestep tick loop.
//!
//! A [`TickLoop`] owns a [`Scene`], starts it, and updates it at a fixed
//! rate. Each tick:
//!
//! 1. Update the scene with `dt = 1 / tick_rate`.
//! 2. Stop if the configured tick budget is spent.
//! 3. Sleep out the remainder of the tick, or warn if it overran.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::TickError;
use crate::scene::Scene;

/// Configuration for the tick loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

impl TickConfig {
    /// Override the target tick rate.
    #[must_use]
    pub fn with_tick_rate(mut self, tick_rate: f64) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Stop after `max_ticks` ticks (0 = unlimited).
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Check that the rate is usable, including that one tick fits in a
    /// [`Duration`].
    pub fn validate(&self) -> Result<(), TickError> {
        if self.tick_rate.is_finite()
            && self.tick_rate > 0.0
            && Duration::try_from_secs_f64(self.step()).is_ok()
        {
            Ok(())
        } else {
            Err(TickError::InvalidTickRate(self.tick_rate))
        }
    }

    /// The fixed delta time of one tick, in seconds.
    #[must_use]
    pub fn step(&self) -> f64 {
        1.0 / self.tick_rate
    }
}

/// Drives a scene at a fixed rate.
#[derive(Debug)]
pub struct TickLoop {
    config: TickConfig,
    scene: Scene,
}

impl TickLoop {
    /// Create a tick loop over `scene`. Fails if the configuration is
    /// invalid.
    pub fn new(scene: Scene, config: TickConfig) -> Result<Self, TickError> {
        config.validate()?;
        Ok(Self { config, scene })
    }

    /// Returns the scene's tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.scene.tick_id()
    }

    #[must_use]
    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Returns a reference to the scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Returns a mutable reference to the scene.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Hand the scene back.
    #[must_use]
    pub fn into_scene(self) -> Scene {
        self.scene
    }

    /// Run one tick, starting the scene first if needed.
    pub fn tick(&mut self) {
        if !self.scene.is_started() {
            self.scene.start();
        }
        self.scene.update_by(self.config.step());
        debug!(
            tick_id = self.scene.tick_id(),
            objects = self.scene.object_count(),
            "tick complete"
        );
    }

    /// Run the tick loop for the configured number of ticks, or
    /// indefinitely. Blocks the calling thread.
    pub fn run(&mut self) {
        let tick_duration = Duration::from_secs_f64(self.config.step());
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            engines = self.scene.engine_count(),
            "starting tick loop"
        );

        loop {
            let start = Instant::now();
            self.tick();

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.scene.tick_id(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}
