//! Simulation context
//!
//! Everything a module or scheduled task may touch on the tick thread lives
//! here, owned by the process entry point and passed down explicitly. Only the
//! scheduler's queue is shared with other threads.

use crate::core::time::TimeManager;
use crate::models::event::{Event, EventLog};
use crate::models::state::WorldState;
use crate::orchestrator::SimConfig;
use crate::rng::RngManager;
use crate::scheduler::Scheduler;
use crate::sequence::BusyMarkers;

/// Tick-thread state handed to every lifecycle call and scheduled action
pub struct SimContext {
    pub config: SimConfig,
    pub world: WorldState,
    pub scheduler: Scheduler,
    pub time: TimeManager,
    pub rng: RngManager,
    pub events: EventLog,
    pub busy: BusyMarkers,
}

impl SimContext {
    /// Build a fresh context; the config is not validated here
    pub fn new(config: SimConfig) -> Self {
        let time = TimeManager::new(config.frame_ms.max(1));
        let scheduler = Scheduler::new(time.clock());
        let rng = RngManager::new(config.rng_seed);
        let world = WorldState::new(config.world.clone());

        Self {
            config,
            world,
            scheduler,
            time,
            rng,
            events: EventLog::new(),
            busy: BusyMarkers::default(),
        }
    }

    /// Current simulation time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.time.now_ms()
    }

    /// Append an event to the log
    pub fn log_event(&mut self, event: Event) {
        self.events.log(event);
    }
}
