//! Simulation driver
//!
//! Owns the [`SimContext`] and the [`ModuleHost`] and stands in for the host
//! engine's per-frame callback.
//!
//! ```text
//! For each frame:
//! 1. Advance time by frame_ms
//! 2. Step world movement
//! 3. Update every module (isolated)
//! 4. Drain the scheduler once
//! ```
//!
//! # Example
//!
//! ```rust
//! use dispatch_sim_core_rs::{ModuleRegistry, SimConfig, Simulation};
//!
//! let config = SimConfig {
//!     rng_seed: 12345,
//!     ..Default::default()
//! };
//! let mut sim = Simulation::new(config, &ModuleRegistry::builtin()).unwrap();
//!
//! for _ in 0..10 {
//!     let result = sim.tick();
//!     assert_eq!(result.module_failures, 0);
//! }
//! sim.shutdown();
//! ```

use crate::core::context::SimContext;
use crate::dispatch::DispatchConfig;
use crate::host::{ModuleHost, ModuleRegistry};
use crate::models::event::EventLog;
use crate::models::state::{WorldConfig, WorldState};
use crate::modules::{IncidentDispatchModule, LitterCrewConfig};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Configuration
// ============================================================================

/// Complete simulation configuration
///
/// Every section has defaults, so a JSON config only needs the fields it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulated milliseconds per frame
    pub frame_ms: u64,
    pub rng_seed: u64,
    pub world: WorldConfig,
    pub dispatch: DispatchConfig,
    pub litter_crew: LitterCrewConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            frame_ms: 100,
            rng_seed: 12345,
            world: WorldConfig::default(),
            dispatch: DispatchConfig::default(),
            litter_crew: LitterCrewConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self, SimulationError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.frame_ms == 0 {
            return Err(SimulationError::InvalidConfig(
                "frame_ms must be positive".to_string(),
            ));
        }
        self.dispatch
            .validate()
            .map_err(|err| SimulationError::InvalidConfig(err.to_string()))?;
        if !(0.0..=1.0).contains(&self.litter_crew.litter_spawn_chance) {
            return Err(SimulationError::InvalidConfig(format!(
                "litter_crew.litter_spawn_chance must be within [0, 1], got {}",
                self.litter_crew.litter_spawn_chance
            )));
        }
        Ok(())
    }
}

/// Simulation error types
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

// ============================================================================
// Driver
// ============================================================================

/// Result of a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickResult {
    pub tick: u64,
    pub now_ms: u64,
    /// Scheduled tasks that ran this frame
    pub tasks_run: usize,
    /// Scheduled tasks that panicked this frame
    pub task_failures: usize,
    /// Modules whose update failed this frame
    pub module_failures: usize,
    /// Incidents still active after this frame
    pub active_incidents: usize,
}

/// Frame-driven simulation
///
/// # Determinism
///
/// All randomness flows through the context's seeded xorshift64* RNG.
/// Same seed + same config = same incident stream and same world.
pub struct Simulation {
    ctx: SimContext,
    host: ModuleHost,
}

impl Simulation {
    /// Validate `config`, build the context and discover every module in
    /// `registry`
    pub fn new(config: SimConfig, registry: &ModuleRegistry) -> Result<Self, SimulationError> {
        config.validate()?;

        let mut ctx = SimContext::new(config);
        let host = ModuleHost::discover(registry, &mut ctx);

        Ok(Self { ctx, host })
    }

    /// Run one frame
    pub fn tick(&mut self) -> TickResult {
        self.ctx.time.advance_tick();
        let frame_ms = self.ctx.time.frame_ms();
        self.ctx.world.step(frame_ms);

        let report = self.host.update_all(&mut self.ctx);

        TickResult {
            tick: self.ctx.time.current_tick(),
            now_ms: self.ctx.now_ms(),
            tasks_run: report.drain.completed + report.drain.failed,
            task_failures: report.drain.failed,
            module_failures: report.module_failures,
            active_incidents: self.active_incidents(),
        }
    }

    /// Run `ticks` frames, returning the last result
    pub fn run(&mut self, ticks: u64) -> Option<TickResult> {
        (0..ticks).map(|_| self.tick()).last()
    }

    /// Dispose every module
    ///
    /// Returns the number of modules whose dispose failed.
    pub fn shutdown(&mut self) -> usize {
        let failures = self.host.dispose_all(&mut self.ctx);
        info!(
            "simulation stopped at {} ms after {} frame(s), {} event(s) logged",
            self.ctx.now_ms(),
            self.ctx.time.current_tick(),
            self.ctx.events.len()
        );
        failures
    }

    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }

    pub fn host(&self) -> &ModuleHost {
        &self.host
    }

    pub fn world(&self) -> &WorldState {
        &self.ctx.world
    }

    pub fn event_log(&self) -> &EventLog {
        &self.ctx.events
    }

    pub fn now_ms(&self) -> u64 {
        self.ctx.now_ms()
    }

    /// Active incidents, zero if the dispatch module is not running
    pub fn active_incidents(&self) -> usize {
        self.host
            .find::<IncidentDispatchModule>()
            .and_then(|m| m.engine())
            .map_or(0, |engine| engine.active_count())
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("current_tick", &self.ctx.time.current_tick())
            .field("now_ms", &self.ctx.now_ms())
            .field("modules", &self.host.module_names())
            .field("entities", &self.ctx.world.entity_count())
            .field("event_count", &self.ctx.events.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
