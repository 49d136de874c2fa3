//! Orchestrator - frame loop and configuration root
//!
//! See `engine.rs` for the implementation.

pub mod engine;

pub use engine::{SimConfig, SimulationError, Simulation, TickResult};
