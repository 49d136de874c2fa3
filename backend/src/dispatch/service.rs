//! Responding services and their units
//!
//! A service keeps at most one unit per incident: its unit map is keyed by
//! incident id, so asking twice for the same incident finds the existing
//! entry and does nothing.

use crate::dispatch::types::ServiceType;
use crate::models::entity::{EntityId, EntityKind, Position, Task};
use crate::models::state::{MarkerId, WorldError, WorldState};
use crate::rng::RngManager;
use log::debug;
use std::collections::BTreeMap;

/// A vehicle and its driver bound to one incident
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    vehicle: EntityId,
    driver: EntityId,
    destination: Position,
    marker: MarkerId,
}

impl Unit {
    pub fn vehicle(&self) -> EntityId {
        self.vehicle
    }

    pub fn driver(&self) -> EntityId {
        self.driver
    }

    pub fn destination(&self) -> Position {
        self.destination
    }

    pub fn marker(&self) -> MarkerId {
        self.marker
    }
}

/// Long-lived pool of units of one service type
#[derive(Debug, Clone)]
pub struct Service {
    service_type: ServiceType,
    /// incident id -> unit
    units: BTreeMap<String, Unit>,
}

impl Service {
    pub fn new(service_type: ServiceType) -> Self {
        Self {
            service_type,
            units: BTreeMap::new(),
        }
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    /// Produce a unit and route it to `destination`
    ///
    /// The unit spawns `spawn_distance` away in a random direction, snapped
    /// to the road grid. Returns `Ok(None)` when a unit is already bound to
    /// `incident_id`.
    pub fn dispatch(
        &mut self,
        world: &mut WorldState,
        rng: &mut RngManager,
        incident_id: &str,
        destination: Position,
        spawn_distance: f64,
    ) -> Result<Option<EntityId>, WorldError> {
        if self.units.contains_key(incident_id) {
            return Ok(None);
        }

        let angle = rng.range_f64(0.0, std::f64::consts::TAU);
        let origin = world.snap_to_path(destination.offset(
            angle.cos() * spawn_distance,
            angle.sin() * spawn_distance,
        ));

        let vehicle = world.spawn(
            EntityKind::Vehicle,
            self.service_type.vehicle_model(),
            origin,
        )?;
        let driver = match world.spawn_in_vehicle(vehicle, self.service_type.crew_model()) {
            Ok(driver) => driver,
            Err(err) => {
                world.destroy(vehicle);
                return Err(err);
            }
        };
        world.assign_task(vehicle, Task::DriveTo { destination })?;
        let marker = world.add_marker(origin, &format!("{} unit", self.service_type));

        debug!(
            "{} unit {} en route to incident {}",
            self.service_type, vehicle, incident_id
        );
        self.units.insert(
            incident_id.to_string(),
            Unit {
                vehicle,
                driver,
                destination,
                marker,
            },
        );
        Ok(Some(vehicle))
    }

    pub fn has_unit(&self, incident_id: &str) -> bool {
        self.units.contains_key(incident_id)
    }

    pub fn unit(&self, incident_id: &str) -> Option<&Unit> {
        self.units.get(incident_id)
    }

    /// The incident's unit exists and is within `radius` of `position`
    pub fn unit_within(
        &self,
        world: &WorldState,
        incident_id: &str,
        position: &Position,
        radius: f64,
    ) -> bool {
        self.units
            .get(incident_id)
            .and_then(|unit| world.distance_to(unit.vehicle, position))
            .is_some_and(|d| d <= radius)
    }

    /// Release the incident's unit back to ambient driving
    ///
    /// Returns false if no unit was bound to `incident_id`.
    pub fn recall(&mut self, world: &mut WorldState, incident_id: &str) -> bool {
        let Some(unit) = self.units.remove(incident_id) else {
            return false;
        };
        world.remove_marker(unit.marker);
        world.release(unit.vehicle);
        world.release(unit.driver);
        debug!("{} unit {} recalled", self.service_type, unit.vehicle);
        true
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}
