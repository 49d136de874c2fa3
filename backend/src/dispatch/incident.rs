//! Incident model
//!
//! # Critical Invariants
//!
//! 1. `required_services` is fixed at creation
//! 2. `resolution_started` only becomes true once, and never reverts
//! 3. At most one of `completed` / `expired` is ever set

use crate::dispatch::types::{IncidentProfile, IncidentState, IncidentType, ServiceType};
use crate::models::entity::{EntityId, Position};
use crate::models::state::MarkerId;
use crate::rng::RngManager;
use std::collections::BTreeSet;
use uuid::Builder;

/// A transient event requiring one or more services
#[derive(Debug, Clone)]
pub struct Incident {
    id: String,
    kind: IncidentType,
    position: Position,
    start_time: u64,
    priority: u8,
    required_services: BTreeSet<ServiceType>,
    resolution_ms: u64,
    /// Scene entities spawned for this incident
    involved_entities: Vec<EntityId>,
    marker: Option<MarkerId>,
    dispatched: bool,
    /// Earliest time a failed service may be asked again
    next_dispatch_at: u64,
    resolution_started: bool,
    resolution_start_time: Option<u64>,
    completed: bool,
    expired: bool,
}

impl Incident {
    /// Create an incident of `profile.kind` at `position`
    ///
    /// The id is a v4 UUID drawn from `rng`, so a seeded run replays the
    /// same ids.
    pub fn new(profile: &IncidentProfile, position: Position, now: u64, rng: &mut RngManager) -> Self {
        Self {
            id: draw_id(rng),
            kind: profile.kind,
            position,
            start_time: now,
            priority: profile.priority,
            required_services: profile.required_services.clone(),
            resolution_ms: profile.resolution_ms,
            involved_entities: Vec::new(),
            marker: None,
            dispatched: false,
            next_dispatch_at: now,
            resolution_started: false,
            resolution_start_time: None,
            completed: false,
            expired: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> IncidentType {
        self.kind
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn required_services(&self) -> &BTreeSet<ServiceType> {
        &self.required_services
    }

    pub fn resolution_ms(&self) -> u64 {
        self.resolution_ms
    }

    pub fn involved_entities(&self) -> &[EntityId] {
        &self.involved_entities
    }

    pub fn marker(&self) -> Option<MarkerId> {
        self.marker
    }

    pub fn resolution_started(&self) -> bool {
        self.resolution_started
    }

    pub fn resolution_start_time(&self) -> Option<u64> {
        self.resolution_start_time
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Completed or expired
    pub fn is_finished(&self) -> bool {
        self.completed || self.expired
    }

    pub fn state(&self) -> IncidentState {
        if self.completed {
            IncidentState::Completed
        } else if self.expired {
            IncidentState::Expired
        } else if self.resolution_started {
            IncidentState::OnScene
        } else if self.dispatched {
            IncidentState::Dispatched
        } else {
            IncidentState::Pending
        }
    }

    pub(crate) fn add_involved(&mut self, entities: impl IntoIterator<Item = EntityId>) {
        self.involved_entities.extend(entities);
    }

    pub(crate) fn take_involved(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.involved_entities)
    }

    pub(crate) fn set_marker(&mut self, marker: MarkerId) {
        self.marker = Some(marker);
    }

    pub(crate) fn take_marker(&mut self) -> Option<MarkerId> {
        self.marker.take()
    }

    pub(crate) fn mark_dispatched(&mut self) {
        self.dispatched = true;
    }

    pub(crate) fn dispatch_due(&self, now: u64) -> bool {
        now >= self.next_dispatch_at
    }

    pub(crate) fn defer_dispatch(&mut self, until: u64) {
        self.next_dispatch_at = until;
    }

    /// Start the resolution timer; returns true only on the first call
    pub(crate) fn start_resolution(&mut self, now: u64) -> bool {
        if self.resolution_started || self.is_finished() {
            return false;
        }
        self.resolution_started = true;
        self.resolution_start_time = Some(now);
        true
    }

    /// Resolution duration has elapsed at `now`
    pub fn resolution_elapsed(&self, now: u64) -> bool {
        match self.resolution_start_time {
            Some(started) => now.saturating_sub(started) >= self.resolution_ms,
            None => false,
        }
    }

    /// Age has reached `max_lifetime_ms` at `now`
    pub fn lifetime_elapsed(&self, now: u64, max_lifetime_ms: u64) -> bool {
        now.saturating_sub(self.start_time) >= max_lifetime_ms
    }

    pub(crate) fn mark_completed(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.completed = true;
        true
    }

    pub(crate) fn mark_expired(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.expired = true;
        true
    }
}

/// Random (v4) UUID built from two draws of the simulation RNG
fn draw_id(rng: &mut RngManager) -> String {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&rng.next().to_le_bytes());
    bytes[8..].copy_from_slice(&rng.next().to_le_bytes());
    Builder::from_random_bytes(bytes).into_uuid().to_string()
}
