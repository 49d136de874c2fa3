//! Scene population around an incident

use crate::core::context::SimContext;
use crate::dispatch::types::SceneSpawn;
use crate::models::entity::{EntityId, EntityKind, Position, Task};
use crate::models::event::Event;
use log::warn;

/// Spawn `recipe` around `center`
///
/// A spawn that fails is logged and skipped; the rest of the recipe still
/// runs. Returns the entities that were created.
pub fn populate(
    ctx: &mut SimContext,
    incident_id: &str,
    center: Position,
    recipe: &[SceneSpawn],
) -> Vec<EntityId> {
    let mut spawned = Vec::new();

    for line in recipe {
        for _ in 0..line.count {
            let angle = ctx.rng.range_f64(0.0, std::f64::consts::TAU);
            let distance = ctx.rng.range_f64(0.0, line.radius);
            let position = center.offset(angle.cos() * distance, angle.sin() * distance);

            match ctx.world.spawn(line.kind, &line.model, position) {
                Ok(id) => {
                    if line.kind == EntityKind::Pedestrian {
                        let _ = ctx.world.assign_task(
                            id,
                            Task::PlayAction {
                                name: "idle_scene".to_string(),
                            },
                        );
                    }
                    spawned.push(id);
                }
                Err(err) => {
                    warn!("incident {}: skipped {}: {}", incident_id, line.model, err);
                    let time = ctx.now_ms();
                    ctx.log_event(Event::SceneSpawnSkipped {
                        time,
                        incident_id: incident_id.to_string(),
                        model: line.model.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    spawned
}
