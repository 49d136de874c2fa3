//! Incident dispatch engine
//!
//! Polled once per frame by its module. Each update runs these phases in
//! order:
//!
//! ```text
//! 1. prune      drop incidents finished on an earlier update
//! 2. generate   cooldown elapsed, below cap, random draw -> new incident
//! 3. advance    per incident:
//!                 ask missing services for a unit
//!                 rendezvous: all required units within radius -> OnScene
//!                 resolution elapsed -> Completed
//!                 else lifetime elapsed -> Expired
//!                 on Completed/Expired: cleanup
//! ```
//!
//! Timers are plain comparisons of the current time against timestamps
//! recorded on the incident; nothing here goes through the scheduler.

use crate::core::context::SimContext;
use crate::dispatch::incident::Incident;
use crate::dispatch::scene;
use crate::dispatch::service::Service;
use crate::dispatch::types::{DispatchConfig, IncidentType, ServiceType};
use crate::dispatch::DispatchError;
use crate::models::entity::Position;
use crate::models::event::Event;
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Owns the active incidents and the long-lived services
#[derive(Debug, Clone)]
pub struct IncidentEngine {
    config: DispatchConfig,
    incidents: Vec<Incident>,
    services: BTreeMap<ServiceType, Service>,
    last_generated_at: Option<u64>,
}

impl IncidentEngine {
    pub fn new(config: DispatchConfig) -> Self {
        let services = ServiceType::ALL
            .iter()
            .map(|t| (*t, Service::new(*t)))
            .collect();
        Self {
            config,
            incidents: Vec::new(),
            services,
            last_generated_at: None,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// One polling pass
    pub fn update(&mut self, ctx: &mut SimContext) {
        self.prune();
        self.try_generate(ctx);

        let now = ctx.now_ms();
        for index in 0..self.incidents.len() {
            self.advance(ctx, index, now);
        }
    }

    /// Create an incident of `kind` at `position`, populate its scene and
    /// dispatch its services
    ///
    /// Bypasses the generation policy. Returns the new incident's id.
    pub fn spawn_incident(
        &mut self,
        ctx: &mut SimContext,
        kind: IncidentType,
        position: Position,
    ) -> Result<String, DispatchError> {
        let profile = self
            .config
            .profile(kind)
            .cloned()
            .ok_or(DispatchError::UnknownProfile(kind))?;

        let now = ctx.now_ms();
        let mut incident = Incident::new(&profile, position, now, &mut ctx.rng);
        let id = incident.id().to_string();

        let marker = ctx.world.add_marker(position, kind.label());
        incident.set_marker(marker);

        ctx.log_event(Event::IncidentGenerated {
            time: now,
            incident_id: id.clone(),
            kind,
            position,
            priority: profile.priority,
            required_services: profile.required_services.iter().copied().collect(),
        });
        info!(
            "incident {} generated: {} at ({:.1}, {:.1}), priority {}",
            id, kind, position.x, position.y, profile.priority
        );

        let involved = scene::populate(ctx, &id, position, &profile.scene);
        incident.add_involved(involved);

        self.incidents.push(incident);
        let index = self.incidents.len() - 1;
        self.dispatch_missing(ctx, index, now);
        Ok(id)
    }

    /// Recall every unit and release every scene entity
    ///
    /// Used at shutdown; leaves the engine with no incidents.
    pub fn clear(&mut self, ctx: &mut SimContext) {
        for index in 0..self.incidents.len() {
            if !self.incidents[index].is_finished() {
                self.cleanup(ctx, index);
            }
        }
        self.incidents.clear();
    }

    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    pub fn incident(&self, id: &str) -> Option<&Incident> {
        self.incidents.iter().find(|i| i.id() == id)
    }

    /// Incidents neither completed nor expired
    pub fn active_count(&self) -> usize {
        self.incidents.iter().filter(|i| !i.is_finished()).count()
    }

    pub fn service(&self, service_type: ServiceType) -> Option<&Service> {
        self.services.get(&service_type)
    }

    pub fn last_generated_at(&self) -> Option<u64> {
        self.last_generated_at
    }

    // ========================================================================
    // Phases
    // ========================================================================

    fn prune(&mut self) {
        self.incidents.retain(|i| !i.is_finished());
    }

    fn try_generate(&mut self, ctx: &mut SimContext) {
        let now = ctx.now_ms();

        let cooled_down = self
            .last_generated_at
            .map_or(true, |at| now.saturating_sub(at) >= self.config.cooldown_ms);
        if !cooled_down || self.active_count() >= self.config.max_active {
            return;
        }
        if self.config.profiles.is_empty() || !ctx.rng.chance(self.config.generation_chance) {
            return;
        }

        let kind = self.config.profiles[ctx.rng.pick_index(self.config.profiles.len())].kind;
        let position = self.pick_position(ctx);

        match self.spawn_incident(ctx, kind, position) {
            Ok(_) => self.last_generated_at = Some(now),
            Err(err) => warn!("incident generation failed: {}", err),
        }
    }

    /// Random point around the observer, snapped onto the road grid
    fn pick_position(&self, ctx: &mut SimContext) -> Position {
        let observer = ctx.world.observer_position();
        let angle = ctx.rng.range_f64(0.0, std::f64::consts::TAU);
        let distance = ctx
            .rng
            .range_f64(self.config.spawn_radius_min, self.config.spawn_radius_max);
        ctx.world.snap_to_path(observer.offset(
            angle.cos() * distance,
            angle.sin() * distance,
        ))
    }

    fn advance(&mut self, ctx: &mut SimContext, index: usize, now: u64) {
        if self.incidents[index].is_finished() {
            return;
        }

        self.dispatch_missing(ctx, index, now);

        let incident = &self.incidents[index];
        if !incident.resolution_started() && self.all_on_scene(ctx, incident) {
            let incident = &mut self.incidents[index];
            if incident.start_resolution(now) {
                info!("incident {}: all services on scene", incident.id());
                ctx.log_event(Event::ResolutionStarted {
                    time: now,
                    incident_id: incident.id().to_string(),
                });
            }
        }

        let incident = &mut self.incidents[index];
        if incident.resolution_elapsed(now) {
            incident.mark_completed();
            info!("incident {} completed", incident.id());
            ctx.log_event(Event::IncidentCompleted {
                time: now,
                incident_id: incident.id().to_string(),
            });
            self.cleanup(ctx, index);
        } else if incident.lifetime_elapsed(now, self.config.max_lifetime_ms) {
            let state = incident.state();
            incident.mark_expired();
            info!("incident {} expired while {:?}", incident.id(), state);
            ctx.log_event(Event::IncidentExpired {
                time: now,
                incident_id: incident.id().to_string(),
            });
            self.cleanup(ctx, index);
        }
    }

    /// Ask every required service without a unit to dispatch one
    fn dispatch_missing(&mut self, ctx: &mut SimContext, index: usize, now: u64) {
        let incident = &self.incidents[index];
        if !incident.dispatch_due(now) {
            return;
        }
        let id = incident.id().to_string();
        let position = incident.position();
        let required: Vec<ServiceType> = incident.required_services().iter().copied().collect();

        let mut failed = false;
        for service_type in required {
            let service = self
                .services
                .entry(service_type)
                .or_insert_with(|| Service::new(service_type));

            match service.dispatch(
                &mut ctx.world,
                &mut ctx.rng,
                &id,
                position,
                self.config.unit_spawn_distance,
            ) {
                Ok(Some(vehicle)) => {
                    self.incidents[index].mark_dispatched();
                    ctx.log_event(Event::UnitDispatched {
                        time: now,
                        incident_id: id.clone(),
                        service: service_type,
                        vehicle,
                    });
                }
                Ok(None) => {}
                Err(err) => {
                    failed = true;
                    warn!("incident {}: {} could not dispatch: {}", id, service_type, err);
                    ctx.log_event(Event::DispatchFailed {
                        time: now,
                        incident_id: id.clone(),
                        service: service_type,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if failed {
            self.incidents[index].defer_dispatch(now.saturating_add(self.config.dispatch_retry_ms));
        }
    }

    /// Rendezvous: every required service has its unit within radius
    fn all_on_scene(&self, ctx: &SimContext, incident: &Incident) -> bool {
        let position = incident.position();
        incident.required_services().iter().all(|service_type| {
            self.services.get(service_type).is_some_and(|service| {
                service.unit_within(&ctx.world, incident.id(), &position, self.config.arrival_radius)
            })
        })
    }

    /// Remove the marker, thin out the scene, recall the units
    fn cleanup(&mut self, ctx: &mut SimContext, index: usize) {
        let now = ctx.now_ms();
        let incident = &mut self.incidents[index];
        let id = incident.id().to_string();

        if let Some(marker) = incident.take_marker() {
            ctx.world.remove_marker(marker);
        }

        let mut deleted = 0;
        for entity in incident.take_involved() {
            if !ctx.world.exists(entity) {
                continue;
            }
            if ctx.rng.chance(self.config.cleanup_delete_chance) {
                ctx.world.destroy(entity);
                deleted += 1;
            } else {
                ctx.world.release(entity);
            }
        }

        for (service_type, service) in self.services.iter_mut() {
            if service.recall(&mut ctx.world, &id) {
                ctx.log_event(Event::UnitRecalled {
                    time: now,
                    incident_id: id.clone(),
                    service: *service_type,
                });
            }
        }

        debug!("incident {} cleaned up, {} scene entities deleted", id, deleted);
    }
}
