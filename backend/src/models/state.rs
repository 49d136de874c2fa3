//! World State
//!
//! In-process model of the host engine's entity API: spawning, existence
//! checks, destruction, task assignment, proximity queries, map markers and
//! in-world notifications.
//!
//! # Critical Invariants
//!
//! 1. **Id Uniqueness**: entity and marker ids are never reused
//! 2. **Seat Validity**: an entity's `vehicle` always refers to a live vehicle;
//!    destroying a vehicle unseats its passengers at the vehicle's position
//! 3. **Passengers Follow**: a seated entity's position equals its vehicle's
//!    position after every `step`
//! 4. **Released Means Owned By The Host**: a released entity wanders until the
//!    host reclaims it, `ambient_lifetime_ms` of simulated time later

use crate::models::entity::{Entity, EntityId, EntityKind, Position, Task};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors raised by world operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WorldError {
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Model unavailable: {model}")]
    SpawnUnavailable { model: String },

    #[error("Entity capacity reached ({capacity})")]
    CapacityReached { capacity: usize },

    #[error("{0} is not in a vehicle")]
    NotInVehicle(EntityId),
}

/// Handle to a map marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

/// A map marker (blip)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: Position,
    pub label: String,
}

/// Tunables for the world model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Pedestrian speed (m/s)
    pub walk_speed: f64,
    /// Vehicle speed (m/s)
    pub drive_speed: f64,
    /// Spacing of the road grid that path-accessible points snap to (m)
    pub road_grid: f64,
    /// Distance at which a walking entity boards its vehicle (m)
    pub boarding_radius: f64,
    /// Maximum number of live entities
    pub capacity: usize,
    /// Models the host cannot currently load
    pub unavailable_models: Vec<String>,
    /// Position of the observing actor (the player)
    pub observer: Position,
    /// How long a released entity lives before the host reclaims it (ms)
    pub ambient_lifetime_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            walk_speed: 1.4,
            drive_speed: 14.0,
            road_grid: 8.0,
            boarding_radius: 2.5,
            capacity: 512,
            unavailable_models: Vec::new(),
            observer: Position::default(),
            ambient_lifetime_ms: 60_000,
        }
    }
}

/// Complete world state
///
/// # Example
///
/// ```rust
/// use dispatch_sim_core_rs::models::{EntityKind, Position, WorldState};
///
/// let mut world = WorldState::default();
/// let car = world.spawn(EntityKind::Vehicle, "taxi", Position::new(0.0, 0.0, 0.0)).unwrap();
/// assert!(world.exists(car));
///
/// world.destroy(car);
/// assert!(!world.exists(car));
/// ```
#[derive(Debug, Clone)]
pub struct WorldState {
    /// Live entities, ordered by id so iteration is deterministic
    entities: BTreeMap<EntityId, Entity>,
    markers: BTreeMap<MarkerId, Marker>,
    notifications: Vec<String>,
    unavailable: BTreeSet<String>,
    /// Released entities and the ms left before the host reclaims them
    released: BTreeMap<EntityId, u64>,
    config: WorldConfig,
    observer: Position,
    next_entity_id: u64,
    next_marker_id: u64,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl WorldState {
    pub fn new(config: WorldConfig) -> Self {
        let unavailable = config.unavailable_models.iter().cloned().collect();
        let observer = config.observer;
        Self {
            entities: BTreeMap::new(),
            markers: BTreeMap::new(),
            notifications: Vec::new(),
            unavailable,
            released: BTreeMap::new(),
            config,
            observer,
            next_entity_id: 1,
            next_marker_id: 1,
        }
    }

    // ========================================================================
    // Entities
    // ========================================================================

    /// Spawn an entity at `position`
    ///
    /// Fails when the model is unavailable or the world is at capacity.
    pub fn spawn(
        &mut self,
        kind: EntityKind,
        model: &str,
        position: Position,
    ) -> Result<EntityId, WorldError> {
        if self.unavailable.contains(model) {
            return Err(WorldError::SpawnUnavailable {
                model: model.to_string(),
            });
        }
        if self.entities.len() >= self.config.capacity {
            return Err(WorldError::CapacityReached {
                capacity: self.config.capacity,
            });
        }

        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        self.entities.insert(
            id,
            Entity {
                id,
                kind,
                model: model.to_string(),
                position,
                task: Task::Idle,
                vehicle: None,
            },
        );
        Ok(id)
    }

    /// Spawn a pedestrian already seated in `vehicle`
    pub fn spawn_in_vehicle(&mut self, vehicle: EntityId, model: &str) -> Result<EntityId, WorldError> {
        let position = self
            .position(vehicle)
            .ok_or(WorldError::EntityNotFound(vehicle))?;
        let id = self.spawn(EntityKind::Pedestrian, model, position)?;
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.vehicle = Some(vehicle);
        }
        Ok(id)
    }

    pub fn exists(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Remove an entity; returns false if it was already gone
    pub fn destroy(&mut self, id: EntityId) -> bool {
        let Some(removed) = self.entities.remove(&id) else {
            return false;
        };
        self.released.remove(&id);
        if removed.kind == EntityKind::Vehicle {
            for entity in self.entities.values_mut() {
                if entity.vehicle == Some(id) {
                    entity.vehicle = None;
                    entity.position = removed.position;
                }
            }
        }
        true
    }

    pub fn assign_task(&mut self, id: EntityId, task: Task) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        entity.task = task;
        Ok(())
    }

    /// Hand an entity back to the host's ambient behaviour
    ///
    /// The entity wanders and is reclaimed once `ambient_lifetime_ms` of
    /// simulated time has passed. Returns false if it does not exist.
    pub fn release(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        entity.task = Task::Wander;
        self.released.insert(id, self.config.ambient_lifetime_ms);
        true
    }

    pub fn is_released(&self, id: EntityId) -> bool {
        self.released.contains_key(&id)
    }

    pub fn task(&self, id: EntityId) -> Option<&Task> {
        self.entities.get(&id).map(|e| &e.task)
    }

    pub fn position(&self, id: EntityId) -> Option<Position> {
        self.entities.get(&id).map(|e| e.position)
    }

    /// Distance between two live entities
    pub fn distance(&self, a: EntityId, b: EntityId) -> Option<f64> {
        Some(self.position(a)?.distance(&self.position(b)?))
    }

    /// Distance from a live entity to a point
    pub fn distance_to(&self, id: EntityId, point: &Position) -> Option<f64> {
        self.position(id).map(|p| p.distance(point))
    }

    /// Move an entity instantly; a vehicle carries its passengers along
    pub fn teleport(&mut self, id: EntityId, position: Position) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        entity.position = position;
        if entity.kind == EntityKind::Vehicle {
            self.sync_passengers(id, position);
        }
        Ok(())
    }

    pub fn vehicle_of(&self, id: EntityId) -> Option<EntityId> {
        self.entities.get(&id).and_then(|e| e.vehicle)
    }

    /// Seated entities of a vehicle, in id order
    pub fn passengers(&self, vehicle: EntityId) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.vehicle == Some(vehicle))
            .map(|e| e.id)
            .collect()
    }

    /// Get out of the current vehicle, standing beside it
    pub fn dismount(&mut self, id: EntityId) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        if entity.vehicle.take().is_none() {
            return Err(WorldError::NotInVehicle(id));
        }
        entity.position = entity.position.offset(1.5, 0.0);
        entity.task = Task::Idle;
        Ok(())
    }

    /// Seat an entity in a vehicle immediately
    pub fn warp_into_vehicle(&mut self, id: EntityId, vehicle: EntityId) -> Result<(), WorldError> {
        let position = self
            .position(vehicle)
            .ok_or(WorldError::EntityNotFound(vehicle))?;
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        entity.vehicle = Some(vehicle);
        entity.position = position;
        entity.task = Task::Idle;
        Ok(())
    }

    /// Nearest live entity of `model` within `radius` of `from`
    pub fn find_nearest(&self, model: &str, from: &Position, radius: f64) -> Option<EntityId> {
        self.entities
            .values()
            .filter(|e| e.model == model)
            .map(|e| (e.id, e.position.distance(from)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Mark a model as (un)available for future spawns
    pub fn set_model_available(&mut self, model: &str, available: bool) {
        if available {
            self.unavailable.remove(model);
        } else {
            self.unavailable.insert(model.to_string());
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Snap a point onto the road grid
    pub fn snap_to_path(&self, position: Position) -> Position {
        let grid = self.config.road_grid;
        if grid <= 0.0 {
            return position;
        }
        Position::new(
            (position.x / grid).round() * grid,
            (position.y / grid).round() * grid,
            position.z,
        )
    }

    pub fn observer_position(&self) -> Position {
        self.observer
    }

    pub fn set_observer_position(&mut self, position: Position) {
        self.observer = position;
    }

    // ========================================================================
    // Markers and notifications
    // ========================================================================

    pub fn add_marker(&mut self, position: Position, label: &str) -> MarkerId {
        let id = MarkerId(self.next_marker_id);
        self.next_marker_id += 1;
        self.markers.insert(
            id,
            Marker {
                position,
                label: label.to_string(),
            },
        );
        id
    }

    pub fn remove_marker(&mut self, id: MarkerId) -> bool {
        self.markers.remove(&id).is_some()
    }

    pub fn has_marker(&self, id: MarkerId) -> bool {
        self.markers.contains_key(&id)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Post a non-blocking in-world notification
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notifications.push(message.into());
    }

    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }

    // ========================================================================
    // Frame update
    // ========================================================================

    /// Advance all movement tasks by `dt_ms`
    pub fn step(&mut self, dt_ms: u64) {
        let dt = dt_ms as f64 / 1000.0;
        let walk_step = self.config.walk_speed * dt;
        let drive_step = self.config.drive_speed * dt;
        let boarding_radius = self.config.boarding_radius;

        let movers: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| e.task.is_movement() && e.vehicle.is_none())
            .map(|e| e.id)
            .collect();

        for id in movers {
            let (task, here) = match self.entities.get(&id) {
                Some(entity) => (entity.task.clone(), entity.position),
                None => continue,
            };
            match task {
                Task::DriveTo { destination } => {
                    let (next, reached) = here.step_towards(&destination, drive_step);
                    self.move_entity(id, next, reached);
                    self.sync_passengers(id, next);
                }
                Task::WalkTo { destination } => {
                    let (next, reached) = here.step_towards(&destination, walk_step);
                    self.move_entity(id, next, reached);
                }
                Task::EnterVehicle { vehicle } => match self.position(vehicle) {
                    Some(target) if here.distance(&target) <= boarding_radius => {
                        let _ = self.warp_into_vehicle(id, vehicle);
                    }
                    Some(target) => {
                        let (next, _) = here.step_towards(&target, walk_step);
                        self.move_entity(id, next, false);
                    }
                    // vehicle vanished; stand still
                    None => self.move_entity(id, here, true),
                },
                _ => {}
            }
        }

        self.reclaim_released(dt_ms);
    }

    /// Count down released entities and destroy the ones whose time is up
    fn reclaim_released(&mut self, dt_ms: u64) {
        let mut expired = Vec::new();
        for (id, remaining) in self.released.iter_mut() {
            *remaining = remaining.saturating_sub(dt_ms);
            if *remaining == 0 {
                expired.push(*id);
            }
        }
        for id in expired {
            self.destroy(id);
        }
    }

    fn move_entity(&mut self, id: EntityId, position: Position, arrived: bool) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.position = position;
            if arrived {
                entity.task = Task::Idle;
            }
        }
    }

    fn sync_passengers(&mut self, vehicle: EntityId, position: Position) {
        for id in self.passengers(vehicle) {
            if let Some(entity) = self.entities.get_mut(&id) {
                entity.position = position;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_unavailable_model_fails() {
        let mut world = WorldState::new(WorldConfig {
            unavailable_models: vec!["firetruk".to_string()],
            ..Default::default()
        });

        let result = world.spawn(EntityKind::Vehicle, "firetruk", Position::default());
        assert_eq!(
            result,
            Err(WorldError::SpawnUnavailable {
                model: "firetruk".to_string()
            })
        );
    }

    #[test]
    fn test_capacity_limits_spawns() {
        let mut world = WorldState::new(WorldConfig {
            capacity: 1,
            ..Default::default()
        });

        assert!(world.spawn(EntityKind::Prop, "cone", Position::default()).is_ok());
        assert_eq!(
            world.spawn(EntityKind::Prop, "cone", Position::default()),
            Err(WorldError::CapacityReached { capacity: 1 })
        );
    }

    #[test]
    fn test_snap_to_path_rounds_to_grid() {
        let world = WorldState::default();
        let snapped = world.snap_to_path(Position::new(13.0, -3.0, 1.0));
        assert_eq!(snapped, Position::new(16.0, -0.0, 1.0));
    }

    #[test]
    fn test_released_entity_is_reclaimed_after_ambient_lifetime() {
        let mut world = WorldState::new(WorldConfig {
            ambient_lifetime_ms: 1_000,
            ..Default::default()
        });
        let kept = world.spawn(EntityKind::Vehicle, "taxi", Position::default()).unwrap();
        let released = world.spawn(EntityKind::Vehicle, "ambulance", Position::default()).unwrap();
        world.assign_task(kept, Task::Wander).unwrap();

        assert!(world.release(released));
        assert_eq!(world.task(released), Some(&Task::Wander));

        world.step(900);
        assert!(world.exists(released));
        world.step(100);
        assert!(!world.exists(released));
        assert!(!world.is_released(released));
        assert!(world.exists(kept));
    }
}
