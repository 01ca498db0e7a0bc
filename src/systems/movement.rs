//! Movement integration - input to acceleration, friction, boundary

use anyhow::Result;

use crate::components::{
    DamageSource, DamageTracking, Energy, InputIntent, Position, StageState, Stunned, SwarmMode,
    SwarmUnit, Velocity,
};
use crate::ecs::{EntityId, Tag, World};
use crate::events::GameEvent;
use crate::rng::RngManager;
use crate::scheduler::{System, TickContext};
use crate::spatial::Vec3;
use crate::systems::priority;

pub struct MovementSystem;

impl MovementSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MovementSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp to the rectangle, killing the outward velocity component at a wall.
fn confine_rect(pos: &mut Vec3, vel: &mut Vec3, half_w: f32, half_h: f32) {
    if pos.x < -half_w {
        pos.x = -half_w;
        vel.x = vel.x.max(0.0);
    } else if pos.x > half_w {
        pos.x = half_w;
        vel.x = vel.x.min(0.0);
    }
    if pos.y < -half_h {
        pos.y = -half_h;
        vel.y = vel.y.max(0.0);
    } else if pos.y > half_h {
        pos.y = half_h;
        vel.y = vel.y.min(0.0);
    }
}

/// Project onto the sphere surface and constrain velocity to the tangent
/// plane. A position at the exact center snaps to a fixed surface point.
fn project_sphere(pos: &mut Vec3, vel: &mut Vec3, radius: f32) {
    let from_center = *pos;
    let normal = if from_center.length() <= f32::EPSILON {
        Vec3::new(1.0, 0.0, 0.0)
    } else {
        from_center.normalized()
    };
    *pos = normal.scale(radius);
    let radial = vel.dot(normal);
    *vel = vel.sub(normal.scale(radial));
}

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn priority(&self) -> i32 {
        priority::MOVEMENT
    }

    fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        _rng: &mut RngManager,
    ) -> Result<()> {
        let dt = ctx.dt_f32();
        let movement = &ctx.tuning.movement;
        let friction = movement.friction.powf(dt);
        let half_w = ctx.tuning.world.width / 2.0;
        let half_h = ctx.tuning.world.height / 2.0;
        let sphere_radius = ctx.tuning.world.sphere_radius;

        let mut moved: Vec<(EntityId, Vec3, f32)> = Vec::new();

        for id in world.players() {
            let Some(energy) = world.get_component::<Energy>(id) else {
                continue;
            };
            if energy.is_depleted() {
                continue;
            }
            let Some(stage_state) = world.get_component::<StageState>(id) else {
                continue;
            };
            let stage = stage_state.stage;
            let stage_tuning = ctx.tuning.stage(stage);

            let intent = world
                .get_component::<InputIntent>(id)
                .copied()
                .unwrap_or_default();
            let stunned = world
                .get_component::<Stunned>(id)
                .map(|s| ctx.now < s.until)
                .unwrap_or(false);

            let mut speed_cap = stage_tuning.max_speed;
            if world.has_tag(id, Tag::Slowed) {
                speed_cap *= movement.slowed_multiplier;
            } else if intent.sprint && world.has_tag(id, Tag::CanSprint) {
                speed_cap *= movement.sprint_multiplier;
            }

            let Some(velocity) = world.get_component::<Velocity>(id) else {
                continue;
            };
            let mut vel = velocity.0;
            if !stunned {
                let accel = intent.direction.normalized().scale(stage_tuning.accel);
                vel = vel.add(accel.scale(dt));
            }
            vel = vel.scale(friction).clamp_length(speed_cap);

            let Some(position) = world.get_component::<Position>(id) else {
                continue;
            };
            let mut pos = position.0.add(vel.scale(dt));
            if stage.uses_sphere_boundary() {
                project_sphere(&mut pos, &mut vel, sphere_radius);
            } else {
                confine_rect(&mut pos, &mut vel, half_w, half_h);
            }
            let distance = pos.distance(position.0);

            world.add_component(id, Position(pos));
            world.add_component(id, Velocity(vel));

            // Movement has a metabolic price; zeroing out here is starvation.
            let cost = distance * movement.energy_cost_per_unit;
            let mut now_dead = false;
            if let Some(energy) = world.get_component_mut::<Energy>(id) {
                if cost > 0.0 {
                    energy.drain(cost);
                    now_dead = energy.is_depleted();
                }
            }
            if now_dead {
                if let Some(tracking) = world.get_component_mut::<DamageTracking>(id) {
                    tracking.record(DamageSource::Starvation, None);
                }
            }

            if distance > f32::EPSILON {
                let current = world
                    .get_component::<Energy>(id)
                    .map(|e| e.current)
                    .unwrap_or(0.0);
                moved.push((id, pos, current));
            }
        }

        // Swarm units share the integration path at their mode speed,
        // without the energy cost; they always stay on the rectangle.
        for id in world.with_tag(Tag::Swarm) {
            let alive = world
                .get_component::<Energy>(id)
                .map(|e| !e.is_depleted())
                .unwrap_or(false);
            if !alive {
                continue;
            }
            let Some(unit) = world.get_component::<SwarmUnit>(id) else {
                continue;
            };
            let speed_cap = match unit.mode {
                SwarmMode::Patrol => ctx.tuning.swarm.patrol_speed,
                SwarmMode::Chase => ctx.tuning.swarm.chase_speed,
            };
            let intent = world
                .get_component::<InputIntent>(id)
                .copied()
                .unwrap_or_default();
            let Some(velocity) = world.get_component::<Velocity>(id) else {
                continue;
            };
            let accel = intent.direction.normalized().scale(ctx.tuning.swarm.accel);
            let mut vel = velocity
                .0
                .add(accel.scale(dt))
                .scale(friction)
                .clamp_length(speed_cap);

            let Some(position) = world.get_component::<Position>(id) else {
                continue;
            };
            let mut pos = position.0.add(vel.scale(dt));
            confine_rect(&mut pos, &mut vel, half_w, half_h);
            let distance = pos.distance(position.0);

            world.add_component(id, Position(pos));
            world.add_component(id, Velocity(vel));
            if distance > f32::EPSILON {
                let current = world
                    .get_component::<Energy>(id)
                    .map(|e| e.current)
                    .unwrap_or(0.0);
                moved.push((id, pos, current));
            }
        }

        for (id, pos, energy) in moved {
            ctx.emit(GameEvent::Moved {
                id: GameEvent::external(world, id),
                position: pos,
                energy,
            });
        }
        Ok(())
    }
}
