//! Event logging for simulation replay and auditing.
//!
//! Every significant state change is captured as an [`Event`] stamped with
//! the simulation time in milliseconds. The log lets tests and the runner
//! see what happened, and when, without reaching into component internals.
//!
//! # Event Types
//!
//! - **Scheduler**: a due task panicked
//! - **Lifecycle**: module initialized, failed, disposed; background fault
//! - **Incident**: generated, scene spawn skipped, resolution started,
//!   completed, expired
//! - **Dispatch**: unit dispatched, dispatch failed, unit recalled
//! - **Sequence**: chained sequence started, completed, aborted
//!
//! # Example
//!
//! ```rust
//! use dispatch_sim_core_rs::models::{Event, EventLog};
//!
//! let mut log = EventLog::new();
//! log.log(Event::ResolutionStarted {
//!     time: 2500,
//!     incident_id: "a1".to_string(),
//! });
//!
//! assert_eq!(log.events_for_incident("a1").len(), 1);
//! ```

use crate::dispatch::types::{IncidentType, ServiceType};
use crate::models::entity::{EntityId, Position};
use serde::Serialize;

/// Which lifecycle call a module failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Construct,
    Initialize,
    Update,
    Dispose,
}

/// Simulation event capturing a state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A scheduled action panicked; the task was discarded
    TaskFailed { time: u64, reason: String },

    /// A module finished `initialize` and is subscribed to updates
    ModuleInitialized { time: u64, module: String },

    /// A module lifecycle call returned an error or panicked
    ModuleFailed {
        time: u64,
        module: String,
        phase: LifecyclePhase,
        reason: String,
    },

    /// A module finished `dispose`
    ModuleDisposed { time: u64, module: String },

    /// A guarded background producer panicked
    BackgroundFault {
        time: u64,
        source: String,
        reason: String,
    },

    /// New incident created
    IncidentGenerated {
        time: u64,
        incident_id: String,
        kind: IncidentType,
        position: Position,
        priority: u8,
        required_services: Vec<ServiceType>,
    },

    /// One entity of a scene recipe could not be spawned
    SceneSpawnSkipped {
        time: u64,
        incident_id: String,
        model: String,
        reason: String,
    },

    /// A service routed a unit towards an incident
    UnitDispatched {
        time: u64,
        incident_id: String,
        service: ServiceType,
        vehicle: EntityId,
    },

    /// A service could not produce a unit this tick
    DispatchFailed {
        time: u64,
        incident_id: String,
        service: ServiceType,
        reason: String,
    },

    /// All required services are on scene; resolution timer started
    ResolutionStarted { time: u64, incident_id: String },

    /// Resolution duration elapsed
    IncidentCompleted { time: u64, incident_id: String },

    /// Max lifetime elapsed before completion
    IncidentExpired { time: u64, incident_id: String },

    /// A unit was released back to ambient behaviour
    UnitRecalled {
        time: u64,
        incident_id: String,
        service: ServiceType,
    },

    /// A chained sequence claimed an actor
    SequenceStarted { time: u64, actor: EntityId },

    /// A chained sequence ran to its final step
    SequenceCompleted { time: u64, actor: EntityId },

    /// A chained sequence stopped early and released its actor
    SequenceAborted {
        time: u64,
        actor: EntityId,
        step: String,
    },
}

impl Event {
    /// Simulation time (ms) when this event occurred
    pub fn time(&self) -> u64 {
        match self {
            Event::TaskFailed { time, .. } => *time,
            Event::ModuleInitialized { time, .. } => *time,
            Event::ModuleFailed { time, .. } => *time,
            Event::ModuleDisposed { time, .. } => *time,
            Event::BackgroundFault { time, .. } => *time,
            Event::IncidentGenerated { time, .. } => *time,
            Event::SceneSpawnSkipped { time, .. } => *time,
            Event::UnitDispatched { time, .. } => *time,
            Event::DispatchFailed { time, .. } => *time,
            Event::ResolutionStarted { time, .. } => *time,
            Event::IncidentCompleted { time, .. } => *time,
            Event::IncidentExpired { time, .. } => *time,
            Event::UnitRecalled { time, .. } => *time,
            Event::SequenceStarted { time, .. } => *time,
            Event::SequenceCompleted { time, .. } => *time,
            Event::SequenceAborted { time, .. } => *time,
        }
    }

    /// Short name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::TaskFailed { .. } => "TaskFailed",
            Event::ModuleInitialized { .. } => "ModuleInitialized",
            Event::ModuleFailed { .. } => "ModuleFailed",
            Event::ModuleDisposed { .. } => "ModuleDisposed",
            Event::BackgroundFault { .. } => "BackgroundFault",
            Event::IncidentGenerated { .. } => "IncidentGenerated",
            Event::SceneSpawnSkipped { .. } => "SceneSpawnSkipped",
            Event::UnitDispatched { .. } => "UnitDispatched",
            Event::DispatchFailed { .. } => "DispatchFailed",
            Event::ResolutionStarted { .. } => "ResolutionStarted",
            Event::IncidentCompleted { .. } => "IncidentCompleted",
            Event::IncidentExpired { .. } => "IncidentExpired",
            Event::UnitRecalled { .. } => "UnitRecalled",
            Event::SequenceStarted { .. } => "SequenceStarted",
            Event::SequenceCompleted { .. } => "SequenceCompleted",
            Event::SequenceAborted { .. } => "SequenceAborted",
        }
    }

    /// Incident id if the event concerns an incident
    pub fn incident_id(&self) -> Option<&str> {
        match self {
            Event::IncidentGenerated { incident_id, .. } => Some(incident_id),
            Event::SceneSpawnSkipped { incident_id, .. } => Some(incident_id),
            Event::UnitDispatched { incident_id, .. } => Some(incident_id),
            Event::DispatchFailed { incident_id, .. } => Some(incident_id),
            Event::ResolutionStarted { incident_id, .. } => Some(incident_id),
            Event::IncidentCompleted { incident_id, .. } => Some(incident_id),
            Event::IncidentExpired { incident_id, .. } => Some(incident_id),
            Event::UnitRecalled { incident_id, .. } => Some(incident_id),
            _ => None,
        }
    }

    /// Module name if the event concerns a module
    pub fn module(&self) -> Option<&str> {
        match self {
            Event::ModuleInitialized { module, .. } => Some(module),
            Event::ModuleFailed { module, .. } => Some(module),
            Event::ModuleDisposed { module, .. } => Some(module),
            _ => None,
        }
    }
}

/// Event log for storing and querying simulation events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events logged at exactly `time` ms
    pub fn events_at(&self, time: u64) -> Vec<&Event> {
        self.events.iter().filter(|e| e.time() == time).collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for_incident(&self, incident_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.incident_id() == Some(incident_id))
            .collect()
    }

    pub fn events_for_module(&self, module: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.module() == Some(module))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
