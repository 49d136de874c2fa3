//! Street-cleaning crew
//!
//! A garbage truck wanders the streets. Every patrol interval, if its crew
//! member is free, it picks the nearest piece of litter and runs an errand:
//! stop, get out, walk over, pick it up, get back in, drive on.

use crate::core::context::SimContext;
use crate::host::{Module, ModuleError};
use crate::models::entity::{EntityId, EntityKind, Position, Task};
use crate::sequence::{start_errand, Errand, SequenceTimings};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::any::Any;

pub const NAME: &str = "litter_crew";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LitterCrewConfig {
    pub enabled: bool,
    pub truck_model: String,
    pub crew_model: String,
    pub litter_model: String,
    /// Litter spawned at initialization
    pub litter_count: u32,
    /// Litter is scattered within this distance of the truck (m)
    pub scatter_radius: f64,
    /// Crew only goes for litter within this distance (m)
    pub search_radius: f64,
    pub patrol_interval_ms: u64,
    /// Animation played at the litter
    pub action: String,
    /// Per-patrol probability of new litter appearing
    pub litter_spawn_chance: f64,
    pub timings: SequenceTimings,
}

impl Default for LitterCrewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            truck_model: "trash".to_string(),
            crew_model: "s_m_y_garbage".to_string(),
            litter_model: "prop_rub_binbag_01".to_string(),
            litter_count: 6,
            scatter_radius: 30.0,
            search_radius: 60.0,
            patrol_interval_ms: 5_000,
            action: "pickup".to_string(),
            litter_spawn_chance: 0.3,
            timings: SequenceTimings::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct LitterCrewModule {
    config: LitterCrewConfig,
    truck: Option<EntityId>,
    crew: Option<EntityId>,
    litter: Vec<EntityId>,
    next_patrol_at: u64,
    errands_started: u32,
}

impl LitterCrewModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create() -> Result<Box<dyn Module>, ModuleError> {
        Ok(Box::new(Self::new()))
    }

    pub fn truck(&self) -> Option<EntityId> {
        self.truck
    }

    pub fn crew(&self) -> Option<EntityId> {
        self.crew
    }

    pub fn errands_started(&self) -> u32 {
        self.errands_started
    }

    fn scatter_litter(&mut self, ctx: &mut SimContext, around: Position) {
        let angle = ctx.rng.range_f64(0.0, std::f64::consts::TAU);
        let distance = ctx.rng.range_f64(0.0, self.config.scatter_radius);
        let position = around.offset(angle.cos() * distance, angle.sin() * distance);

        match ctx
            .world
            .spawn(EntityKind::Prop, &self.config.litter_model, position)
        {
            Ok(id) => self.litter.push(id),
            Err(err) => debug!("no litter spawned: {}", err),
        }
    }
}

impl Module for LitterCrewModule {
    fn name(&self) -> &str {
        NAME
    }

    fn initialize(&mut self, ctx: &mut SimContext) -> Result<(), ModuleError> {
        self.config = ctx.config.litter_crew.clone();
        if !self.config.enabled {
            info!("litter crew disabled");
            return Ok(());
        }

        let depot = ctx.world.snap_to_path(ctx.world.observer_position());
        let truck = ctx
            .world
            .spawn(EntityKind::Vehicle, &self.config.truck_model, depot)?;
        let crew = match ctx.world.spawn_in_vehicle(truck, &self.config.crew_model) {
            Ok(crew) => crew,
            Err(err) => {
                ctx.world.destroy(truck);
                return Err(err.into());
            }
        };
        ctx.world.assign_task(truck, Task::Wander)?;

        self.truck = Some(truck);
        self.crew = Some(crew);
        for _ in 0..self.config.litter_count {
            self.scatter_litter(ctx, depot);
        }
        self.next_patrol_at = ctx.now_ms() + self.config.patrol_interval_ms;

        info!(
            "litter crew {} on duty with {} piece(s) of litter around",
            crew,
            self.litter.len()
        );
        Ok(())
    }

    fn update(&mut self, ctx: &mut SimContext) -> Result<(), ModuleError> {
        let (Some(truck), Some(crew)) = (self.truck, self.crew) else {
            return Ok(());
        };
        let now = ctx.now_ms();
        if now < self.next_patrol_at {
            return Ok(());
        }
        self.next_patrol_at = now + self.config.patrol_interval_ms;

        self.litter.retain(|id| ctx.world.exists(*id));
        let Some(here) = ctx.world.position(truck) else {
            return Ok(());
        };
        if ctx.rng.chance(self.config.litter_spawn_chance) {
            self.scatter_litter(ctx, here);
        }

        if ctx.busy.is_busy(crew) || !ctx.world.exists(crew) {
            return Ok(());
        }

        let Some(target) = ctx
            .world
            .find_nearest(&self.config.litter_model, &here, self.config.search_radius)
        else {
            return Ok(());
        };

        let errand = Errand {
            actor: crew,
            vehicle: truck,
            target,
            action: self.config.action.clone(),
            timings: self.config.timings.clone(),
        };
        start_errand(ctx, errand).map_err(|err| ModuleError::Update(err.to_string()))?;
        self.errands_started += 1;
        Ok(())
    }

    fn dispose(&mut self, ctx: &mut SimContext) -> Result<(), ModuleError> {
        for id in self.litter.drain(..) {
            ctx.world.destroy(id);
        }
        if let Some(crew) = self.crew.take() {
            ctx.busy.release(crew);
            ctx.world.destroy(crew);
        }
        if let Some(truck) = self.truck.take() {
            ctx.world.destroy(truck);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
