//! Dispatch Simulator Core - Rust Engine
//!
//! Frame-driven open-world simulation core: deferred tasks, feature-module
//! lifecycle, chained actor sequences and an incident dispatch state machine.
//!
//! # Architecture
//!
//! - **core**: Time management and the per-frame context
//! - **models**: World entities, world state, events
//! - **scheduler**: Thread-safe deferred task queue, drained once per frame
//! - **host**: Module lifecycle host and crash guard
//! - **sequence**: Chained actor sequences built on the scheduler
//! - **dispatch**: Incidents, services and units
//! - **modules**: Built-in feature modules
//! - **orchestrator**: Configuration and the frame loop
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All world mutation happens on the tick thread; only the scheduler queue
//!    is shared across threads
//! 2. All randomness is deterministic (seeded RNG)
//! 3. No task or module failure escapes the frame

// Module declarations
pub mod core;
pub mod dispatch;
pub mod host;
pub mod models;
pub mod modules;
pub mod orchestrator;
pub mod rng;
pub mod scheduler;
pub mod sequence;

// Re-exports for convenience
pub use core::context::SimContext;
pub use core::time::{SimClock, TimeManager};
pub use dispatch::{
    DispatchConfig, DispatchError, Incident, IncidentEngine, IncidentProfile, IncidentState,
    IncidentType, SceneSpawn, Service, ServiceType, Unit,
};
pub use host::{spawn_guarded, Module, ModuleError, ModuleFactory, ModuleHost, ModuleRegistry};
pub use models::{
    entity::{Entity, EntityId, EntityKind, Position, Task},
    event::{Event, EventLog, LifecyclePhase},
    state::{MarkerId, WorldConfig, WorldError, WorldState},
};
pub use modules::{IncidentDispatchModule, LitterCrewConfig, LitterCrewModule};
pub use orchestrator::{SimConfig, Simulation, SimulationError, TickResult};
pub use rng::RngManager;
pub use scheduler::{DrainReport, Scheduler};
pub use sequence::{start_errand, BusyMarkers, Errand, ErrandStep, SequenceError, SequenceTimings};
