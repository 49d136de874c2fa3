//! World entities
//!
//! An entity is anything the host world can spawn: vehicles, pedestrians and
//! props (debris, litter). Each entity carries at most one active task, which
//! `WorldState::step` advances every frame.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to a world entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// World-space position in metres
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Same position shifted on the ground plane
    pub fn offset(&self, dx: f64, dy: f64) -> Position {
        Position::new(self.x + dx, self.y + dy, self.z)
    }

    /// Step towards `target` by at most `max_step` metres
    ///
    /// Returns the new position and whether `target` was reached.
    pub fn step_towards(&self, target: &Position, max_step: f64) -> (Position, bool) {
        let remaining = self.distance(target);
        if remaining <= max_step || remaining == 0.0 {
            return (*target, true);
        }
        let t = max_step / remaining;
        let next = Position::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
            self.z + (target.z - self.z) * t,
        );
        (next, false)
    }
}

/// Broad category of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Vehicle,
    Pedestrian,
    Prop,
}

/// What an entity is currently doing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    /// Standing still (or parked)
    Idle,

    /// Ambient behaviour owned by the host
    Wander,

    /// Vehicle driving to a point
    DriveTo { destination: Position },

    /// Pedestrian walking to a point
    WalkTo { destination: Position },

    /// Pedestrian walking back to and boarding a vehicle
    EnterVehicle { vehicle: EntityId },

    /// Pedestrian playing a named animation in place
    PlayAction { name: String },
}

impl Task {
    /// Whether `WorldState::step` moves the entity for this task
    pub fn is_movement(&self) -> bool {
        matches!(
            self,
            Task::DriveTo { .. } | Task::WalkTo { .. } | Task::EnterVehicle { .. }
        )
    }
}

/// A spawned world entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub(crate) id: EntityId,
    pub(crate) kind: EntityKind,
    pub(crate) model: String,
    pub(crate) position: Position,
    pub(crate) task: Task,
    /// Vehicle this entity is seated in
    pub(crate) vehicle: Option<EntityId>,
}

impl Entity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn vehicle(&self) -> Option<EntityId> {
        self.vehicle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_towards_reaches_target_when_close() {
        let from = Position::new(0.0, 0.0, 0.0);
        let to = Position::new(3.0, 4.0, 0.0);

        let (next, reached) = from.step_towards(&to, 10.0);
        assert!(reached);
        assert_eq!(next, to);
    }

    #[test]
    fn test_step_towards_moves_partially() {
        let from = Position::new(0.0, 0.0, 0.0);
        let to = Position::new(10.0, 0.0, 0.0);

        let (next, reached) = from.step_towards(&to, 4.0);
        assert!(!reached);
        assert!((next.x - 4.0).abs() < 1e-9);
    }
}
