//! Domain models: world entities, world state and the event log

pub mod entity;
pub mod event;
pub mod state;

// Re-exports
pub use entity::{Entity, EntityId, EntityKind, Position, Task};
pub use event::{Event, EventLog, LifecyclePhase};
pub use state::{Marker, MarkerId, WorldConfig, WorldError, WorldState};
