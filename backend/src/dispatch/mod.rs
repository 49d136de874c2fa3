//! Incident dispatch
//!
//! Incidents are generated around the observer, populated with a scene, and
//! served by one unit from each required service. Resolution starts only
//! once every required unit is on scene at the same time.

pub mod engine;
pub mod incident;
pub mod scene;
pub mod service;
pub mod types;

pub use engine::IncidentEngine;
pub use incident::Incident;
pub use service::{Service, Unit};
pub use types::{
    DispatchConfig, IncidentProfile, IncidentState, IncidentType, SceneSpawn, ServiceType,
};

use crate::models::state::WorldError;
use thiserror::Error;

/// Errors raised by the dispatch engine
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    #[error("no profile configured for incident type {0}")]
    UnknownProfile(IncidentType),

    #[error("{0}")]
    InvalidConfig(String),

    #[error(transparent)]
    World(#[from] WorldError),
}
