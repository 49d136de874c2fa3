//! Chained actor sequences
//!
//! A multi-step actor behaviour is a small state machine whose steps run as
//! scheduled tasks. Each step re-validates the entities it needs before
//! acting, then schedules its successor. There is no blocking and no explicit
//! cancellation: when the actor disappears the chain stops by itself and
//! releases the actor's busy marker.
//!
//! The errand chain:
//!
//! ```text
//! Halt -> Dismount -> WalkToTarget -> AwaitArrival* -> PerformAction
//!      -> RemoveTarget -> ReturnToVehicle -> Resume
//! ```
//!
//! Waiting between steps is itself a task that re-checks the actor every
//! frame, so a removed actor is noticed on the next drain even while a long
//! delay is pending.

use crate::core::context::SimContext;
use crate::models::entity::{EntityId, Task};
use crate::models::event::Event;
use crate::models::state::WorldError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised when starting a sequence
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SequenceError {
    #[error("{0} is already running a sequence")]
    ActorBusy(EntityId),

    #[error(transparent)]
    World(#[from] WorldError),
}

/// Actors currently owned by a running sequence
#[derive(Debug, Clone, Default)]
pub struct BusyMarkers {
    actors: BTreeSet<EntityId>,
}

impl BusyMarkers {
    /// Mark `actor` busy; false if it already was
    pub fn claim(&mut self, actor: EntityId) -> bool {
        self.actors.insert(actor)
    }

    pub fn release(&mut self, actor: EntityId) -> bool {
        self.actors.remove(&actor)
    }

    pub fn is_busy(&self, actor: EntityId) -> bool {
        self.actors.contains(&actor)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

/// Delays and limits of the errand chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceTimings {
    /// Halt -> Dismount
    pub dismount_delay_ms: u64,
    /// Dismount -> WalkToTarget
    pub walk_delay_ms: u64,
    /// Between arrival polls
    pub poll_interval_ms: u64,
    /// Actor counts as arrived within this distance of the target (m)
    pub arrival_radius: f64,
    /// Arrival polls before the chain gives up
    pub max_polls: u32,
    /// PerformAction -> RemoveTarget
    pub action_duration_ms: u64,
    /// ReturnToVehicle -> Resume
    pub board_delay_ms: u64,
}

impl Default for SequenceTimings {
    fn default() -> Self {
        Self {
            dismount_delay_ms: 800,
            walk_delay_ms: 600,
            poll_interval_ms: 250,
            arrival_radius: 1.5,
            max_polls: 120,
            action_duration_ms: 2000,
            board_delay_ms: 1500,
        }
    }
}

/// One step of the errand chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrandStep {
    Halt,
    Dismount,
    WalkToTarget,
    AwaitArrival { polls: u32 },
    PerformAction,
    RemoveTarget,
    ReturnToVehicle,
    Resume,
}

impl ErrandStep {
    pub fn name(&self) -> &'static str {
        match self {
            ErrandStep::Halt => "halt",
            ErrandStep::Dismount => "dismount",
            ErrandStep::WalkToTarget => "walk_to_target",
            ErrandStep::AwaitArrival { .. } => "await_arrival",
            ErrandStep::PerformAction => "perform_action",
            ErrandStep::RemoveTarget => "remove_target",
            ErrandStep::ReturnToVehicle => "return_to_vehicle",
            ErrandStep::Resume => "resume",
        }
    }
}

/// An actor leaves its vehicle, deals with a target object, and drives on
#[derive(Debug, Clone, PartialEq)]
pub struct Errand {
    /// Pedestrian doing the work (usually the vehicle's driver)
    pub actor: EntityId,
    pub vehicle: EntityId,
    /// Object removed at the end of the action
    pub target: EntityId,
    /// Animation played at the target
    pub action: String,
    pub timings: SequenceTimings,
}

/// Claim the actor and run the first step
///
/// Fails if the actor is already busy or any participant is missing. On
/// success the rest of the chain proceeds through the scheduler.
pub fn start_errand(ctx: &mut SimContext, errand: Errand) -> Result<(), SequenceError> {
    for id in [errand.actor, errand.vehicle, errand.target] {
        if !ctx.world.exists(id) {
            return Err(WorldError::EntityNotFound(id).into());
        }
    }
    if !ctx.busy.claim(errand.actor) {
        return Err(SequenceError::ActorBusy(errand.actor));
    }

    let time = ctx.now_ms();
    ctx.log_event(Event::SequenceStarted {
        time,
        actor: errand.actor,
    });
    debug!("{} starts errand on {}", errand.actor, errand.target);

    run_step(ctx, errand, ErrandStep::Halt);
    Ok(())
}

/// Execute `step`, then hand off to its successor
fn run_step(ctx: &mut SimContext, errand: Errand, step: ErrandStep) {
    if !ctx.world.exists(errand.actor) {
        abort(ctx, &errand, step);
        return;
    }

    let timings = errand.timings.clone();
    match step {
        ErrandStep::Halt => {
            if ctx.world.assign_task(errand.vehicle, Task::Idle).is_err() {
                return abort(ctx, &errand, step);
            }
            continue_after(ctx, errand, ErrandStep::Dismount, timings.dismount_delay_ms);
        }

        ErrandStep::Dismount => {
            if !ctx.world.exists(errand.vehicle) || !ctx.world.exists(errand.target) {
                return abort(ctx, &errand, step);
            }
            if ctx.world.vehicle_of(errand.actor).is_some()
                && ctx.world.dismount(errand.actor).is_err()
            {
                return abort(ctx, &errand, step);
            }
            continue_after(ctx, errand, ErrandStep::WalkToTarget, timings.walk_delay_ms);
        }

        ErrandStep::WalkToTarget => {
            let Some(destination) = ctx.world.position(errand.target) else {
                return abort(ctx, &errand, step);
            };
            if ctx
                .world
                .assign_task(errand.actor, Task::WalkTo { destination })
                .is_err()
            {
                return abort(ctx, &errand, step);
            }
            continue_after(
                ctx,
                errand,
                ErrandStep::AwaitArrival { polls: 0 },
                timings.poll_interval_ms,
            );
        }

        ErrandStep::AwaitArrival { polls } => {
            let Some(distance) = ctx.world.distance(errand.actor, errand.target) else {
                return abort(ctx, &errand, step);
            };
            if distance <= timings.arrival_radius {
                run_step(ctx, errand, ErrandStep::PerformAction);
            } else if polls + 1 >= timings.max_polls {
                debug!("{} never reached {}", errand.actor, errand.target);
                abort(ctx, &errand, step);
            } else {
                continue_after(
                    ctx,
                    errand,
                    ErrandStep::AwaitArrival { polls: polls + 1 },
                    timings.poll_interval_ms,
                );
            }
        }

        ErrandStep::PerformAction => {
            if !ctx.world.exists(errand.target) {
                return abort(ctx, &errand, step);
            }
            let task = Task::PlayAction {
                name: errand.action.clone(),
            };
            if ctx.world.assign_task(errand.actor, task).is_err() {
                return abort(ctx, &errand, step);
            }
            continue_after(ctx, errand, ErrandStep::RemoveTarget, timings.action_duration_ms);
        }

        ErrandStep::RemoveTarget => {
            ctx.world.destroy(errand.target);
            run_step(ctx, errand, ErrandStep::ReturnToVehicle);
        }

        ErrandStep::ReturnToVehicle => {
            let task = Task::EnterVehicle {
                vehicle: errand.vehicle,
            };
            if !ctx.world.exists(errand.vehicle) || ctx.world.assign_task(errand.actor, task).is_err() {
                return abort(ctx, &errand, step);
            }
            continue_after(ctx, errand, ErrandStep::Resume, timings.board_delay_ms);
        }

        ErrandStep::Resume => {
            if ctx.world.vehicle_of(errand.actor) != Some(errand.vehicle)
                && ctx
                    .world
                    .warp_into_vehicle(errand.actor, errand.vehicle)
                    .is_err()
            {
                return abort(ctx, &errand, step);
            }
            if ctx.world.assign_task(errand.vehicle, Task::Wander).is_err() {
                return abort(ctx, &errand, step);
            }

            ctx.busy.release(errand.actor);
            let time = ctx.now_ms();
            ctx.log_event(Event::SequenceCompleted {
                time,
                actor: errand.actor,
            });
            debug!("{} finished errand", errand.actor);
        }
    }
}

/// Run `next` no earlier than `delay_ms` from now, watching the actor every frame
fn continue_after(ctx: &mut SimContext, errand: Errand, next: ErrandStep, delay_ms: u64) {
    let resume_at = ctx.now_ms().saturating_add(delay_ms);
    ctx.scheduler
        .schedule(0, move |ctx| wait_then(ctx, errand, next, resume_at));
}

fn wait_then(ctx: &mut SimContext, errand: Errand, next: ErrandStep, resume_at: u64) {
    if !ctx.world.exists(errand.actor) {
        abort(ctx, &errand, next);
    } else if ctx.now_ms() < resume_at {
        ctx.scheduler
            .schedule(0, move |ctx| wait_then(ctx, errand, next, resume_at));
    } else {
        run_step(ctx, errand, next);
    }
}

/// Stop the chain: release the actor and its busy marker
fn abort(ctx: &mut SimContext, errand: &Errand, step: ErrandStep) {
    for id in [errand.actor, errand.vehicle] {
        if ctx.world.exists(id) && ctx.world.assign_task(id, Task::Wander).is_err() {
            debug!("could not release {} after errand", id);
        }
    }
    ctx.busy.release(errand.actor);

    let time = ctx.now_ms();
    ctx.log_event(Event::SequenceAborted {
        time,
        actor: errand.actor,
        step: step.name().to_string(),
    });
    debug!("errand of {} stopped at {}", errand.actor, step.name());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_markers_claim_once() {
        let mut busy = BusyMarkers::default();
        let actor = EntityId(7);

        assert!(busy.claim(actor));
        assert!(!busy.claim(actor));
        assert!(busy.is_busy(actor));

        assert!(busy.release(actor));
        assert!(!busy.is_busy(actor));
        assert!(busy.is_empty());
    }

    #[test]
    fn test_step_names_are_stable() {
        assert_eq!(ErrandStep::AwaitArrival { polls: 3 }.name(), "await_arrival");
        assert_eq!(ErrandStep::Resume.name(), "resume");
    }
}
