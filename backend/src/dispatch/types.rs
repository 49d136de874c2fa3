//! Incident and service types, per-type profiles, and dispatch configuration
//!
//! An incident's required services, resolution duration, priority and scene
//! recipe are a pure function of its type, looked up in the configured
//! [`IncidentProfile`] table.

use crate::dispatch::DispatchError;
use crate::models::entity::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Kind of incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Fire,
    TrafficCollision,
    MedicalEmergency,
    Robbery,
    VehicleBreakdown,
}

impl IncidentType {
    pub const ALL: [IncidentType; 5] = [
        IncidentType::Fire,
        IncidentType::TrafficCollision,
        IncidentType::MedicalEmergency,
        IncidentType::Robbery,
        IncidentType::VehicleBreakdown,
    ];

    /// Map marker label
    pub fn label(&self) -> &'static str {
        match self {
            IncidentType::Fire => "Fire",
            IncidentType::TrafficCollision => "Traffic Collision",
            IncidentType::MedicalEmergency => "Medical Emergency",
            IncidentType::Robbery => "Robbery",
            IncidentType::VehicleBreakdown => "Vehicle Breakdown",
        }
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of responding service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Fire and rescue
    Rescue,
    /// Police
    Enforcement,
    /// Ambulance
    Medical,
    /// Tow trucks
    Recovery,
}

impl ServiceType {
    pub const ALL: [ServiceType; 4] = [
        ServiceType::Rescue,
        ServiceType::Enforcement,
        ServiceType::Medical,
        ServiceType::Recovery,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Rescue => "Rescue",
            ServiceType::Enforcement => "Enforcement",
            ServiceType::Medical => "Medical",
            ServiceType::Recovery => "Recovery",
        }
    }

    /// Vehicle model a unit of this service drives
    pub fn vehicle_model(&self) -> &'static str {
        match self {
            ServiceType::Rescue => "firetruk",
            ServiceType::Enforcement => "police",
            ServiceType::Medical => "ambulance",
            ServiceType::Recovery => "towtruck",
        }
    }

    /// Pedestrian model of the unit's driver
    pub fn crew_model(&self) -> &'static str {
        match self {
            ServiceType::Rescue => "s_m_y_fireman_01",
            ServiceType::Enforcement => "s_m_y_cop_01",
            ServiceType::Medical => "s_m_m_paramedic_01",
            ServiceType::Recovery => "s_m_m_trucker_01",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Derived lifecycle state of an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentState {
    /// Created, no service asked yet
    Pending,
    /// Services asked, not all on scene
    Dispatched,
    /// Every required service on scene; resolution timer running
    OnScene,
    Completed,
    Expired,
}

/// One line of a scene recipe: `count` entities of `model` within `radius`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSpawn {
    pub kind: EntityKind,
    pub model: String,
    pub count: u32,
    /// Max distance from the incident position (m)
    pub radius: f64,
}

impl SceneSpawn {
    pub fn new(kind: EntityKind, model: &str, count: u32, radius: f64) -> Self {
        Self {
            kind,
            model: model.to_string(),
            count,
            radius,
        }
    }
}

/// Everything determined by an incident's type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentProfile {
    pub kind: IncidentType,
    pub required_services: BTreeSet<ServiceType>,
    /// Time on scene, once every service has arrived (ms)
    pub resolution_ms: u64,
    /// Higher is more urgent
    pub priority: u8,
    #[serde(default)]
    pub scene: Vec<SceneSpawn>,
}

impl IncidentProfile {
    /// Built-in profile for `kind`
    pub fn default_for(kind: IncidentType) -> Self {
        use EntityKind::{Pedestrian, Prop, Vehicle};
        use ServiceType::{Enforcement, Medical, Recovery, Rescue};

        let (services, resolution_ms, priority, scene): (&[ServiceType], u64, u8, Vec<SceneSpawn>) =
            match kind {
                IncidentType::Fire => (
                    &[Rescue, Enforcement, Medical],
                    45_000,
                    9,
                    vec![
                        SceneSpawn::new(Vehicle, "burnt_sedan", 1, 3.0),
                        SceneSpawn::new(Pedestrian, "a_m_m_victim_01", 2, 4.0),
                        SceneSpawn::new(Pedestrian, "a_f_y_bystander_01", 3, 12.0),
                        SceneSpawn::new(Prop, "prop_debris_01", 2, 5.0),
                    ],
                ),
                IncidentType::TrafficCollision => (
                    &[Enforcement, Medical, Recovery],
                    30_000,
                    7,
                    vec![
                        SceneSpawn::new(Vehicle, "damaged_sedan", 2, 4.0),
                        SceneSpawn::new(Pedestrian, "a_m_y_injured_01", 1, 3.0),
                        SceneSpawn::new(Pedestrian, "a_f_y_bystander_01", 2, 10.0),
                        SceneSpawn::new(Prop, "prop_car_debris", 3, 6.0),
                    ],
                ),
                IncidentType::MedicalEmergency => (
                    &[Medical],
                    20_000,
                    6,
                    vec![
                        SceneSpawn::new(Pedestrian, "a_m_o_patient_01", 1, 1.0),
                        SceneSpawn::new(Pedestrian, "a_f_y_bystander_01", 2, 8.0),
                    ],
                ),
                IncidentType::Robbery => (
                    &[Enforcement],
                    15_000,
                    5,
                    vec![
                        SceneSpawn::new(Pedestrian, "g_m_y_suspect_01", 1, 6.0),
                        SceneSpawn::new(Pedestrian, "a_m_y_victim_02", 1, 2.0),
                    ],
                ),
                IncidentType::VehicleBreakdown => (
                    &[Recovery],
                    12_000,
                    3,
                    vec![
                        SceneSpawn::new(Vehicle, "broken_hatchback", 1, 1.0),
                        SceneSpawn::new(Pedestrian, "a_m_m_driver_01", 1, 3.0),
                    ],
                ),
            };

        Self {
            kind,
            required_services: services.iter().copied().collect(),
            resolution_ms,
            priority,
            scene,
        }
    }

    /// Built-in profiles for every incident type
    pub fn defaults() -> Vec<IncidentProfile> {
        IncidentType::ALL
            .iter()
            .map(|kind| IncidentProfile::default_for(*kind))
            .collect()
    }
}

/// Dispatch engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Minimum time between two generated incidents (ms)
    pub cooldown_ms: u64,
    /// Cap on simultaneously active incidents
    pub max_active: usize,
    /// Per-frame probability of generating an incident when allowed
    pub generation_chance: f64,
    /// Incidents not completed within this time expire (ms)
    pub max_lifetime_ms: u64,
    /// A unit within this distance of the incident is on scene (m)
    pub arrival_radius: f64,
    /// Incident placement distance from the observer (m)
    pub spawn_radius_min: f64,
    pub spawn_radius_max: f64,
    /// Distance from the incident at which units are spawned (m)
    pub unit_spawn_distance: f64,
    /// Minimum time between dispatch retries for a service that failed (ms)
    pub dispatch_retry_ms: u64,
    /// Probability a scene entity is deleted (rather than released) at cleanup
    pub cleanup_delete_chance: f64,
    pub profiles: Vec<IncidentProfile>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 60_000,
            max_active: 3,
            generation_chance: 0.002,
            max_lifetime_ms: 180_000,
            arrival_radius: 25.0,
            spawn_radius_min: 150.0,
            spawn_radius_max: 400.0,
            unit_spawn_distance: 250.0,
            dispatch_retry_ms: 5_000,
            cleanup_delete_chance: 0.6,
            profiles: IncidentProfile::defaults(),
        }
    }
}

impl DispatchConfig {
    /// Profile for `kind`, if configured
    pub fn profile(&self, kind: IncidentType) -> Option<&IncidentProfile> {
        self.profiles.iter().find(|p| p.kind == kind)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.profiles.is_empty() {
            return Err(DispatchError::InvalidConfig(
                "dispatch.profiles must not be empty".to_string(),
            ));
        }
        if self.max_active == 0 {
            return Err(DispatchError::InvalidConfig(
                "dispatch.max_active must be > 0".to_string(),
            ));
        }
        for (name, p) in [
            ("generation_chance", self.generation_chance),
            ("cleanup_delete_chance", self.cleanup_delete_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(DispatchError::InvalidConfig(format!(
                    "dispatch.{} must be within [0, 1], got {}",
                    name, p
                )));
            }
        }
        if self.spawn_radius_min > self.spawn_radius_max {
            return Err(DispatchError::InvalidConfig(format!(
                "dispatch.spawn_radius_min ({}) exceeds spawn_radius_max ({})",
                self.spawn_radius_min, self.spawn_radius_max
            )));
        }

        let mut seen = BTreeSet::new();
        for profile in &self.profiles {
            if !seen.insert(profile.kind) {
                return Err(DispatchError::InvalidConfig(format!(
                    "duplicate profile for {}",
                    profile.kind
                )));
            }
            if profile.required_services.is_empty() {
                return Err(DispatchError::InvalidConfig(format!(
                    "profile {} requires no services",
                    profile.kind
                )));
            }
        }
        Ok(())
    }
}
