//! Obstacle gravity wells and the lethal core

use anyhow::Result;

use crate::components::{DamageSource, Energy, Obstacle, Position, Velocity};
use crate::ecs::{EntityId, Tag, World};
use crate::rng::RngManager;
use crate::scheduler::{System, TickContext};
use crate::spatial::Vec3;
use crate::systems::{combat, priority};

pub struct GravitySystem;

impl GravitySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GravitySystem {
    fn default() -> Self {
        Self::new()
    }
}

struct Well {
    center: Vec3,
    core_radius: f32,
    influence_radius: f32,
    strength: f32,
}

impl System for GravitySystem {
    fn name(&self) -> &'static str {
        "gravity"
    }

    fn priority(&self) -> i32 {
        priority::GRAVITY
    }

    fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        _rng: &mut RngManager,
    ) -> Result<()> {
        let dt = ctx.dt_f32();
        let swarm_susceptibility = ctx.tuning.gravity.swarm_susceptibility;

        let wells: Vec<Well> = world
            .with_tag(Tag::Obstacle)
            .into_iter()
            .filter_map(|id| {
                let pos = world.get_component::<Position>(id)?;
                let obstacle = world.get_component::<Obstacle>(id)?;
                Some(Well {
                    center: pos.0,
                    core_radius: obstacle.core_radius,
                    influence_radius: obstacle.influence_radius,
                    strength: obstacle.gravity,
                })
            })
            .collect();
        if wells.is_empty() {
            return Ok(());
        }

        let mut affected: Vec<(EntityId, f32)> = Vec::new();
        for id in world.players() {
            affected.push((id, 1.0));
        }
        for id in world.with_tag(Tag::Swarm) {
            affected.push((id, swarm_susceptibility));
        }

        for (id, susceptibility) in affected {
            let alive = world
                .get_component::<Energy>(id)
                .map(|e| !e.is_depleted())
                .unwrap_or(false);
            if !alive {
                continue;
            }
            let Some(position) = world.get_component::<Position>(id) else {
                continue;
            };
            let pos = position.0;

            let mut pull = Vec3::ZERO;
            let mut in_core = false;
            for well in &wells {
                let offset = well.center.sub(pos);
                let distance = offset.length();
                if distance <= well.core_radius {
                    in_core = true;
                    break;
                }
                if distance <= well.influence_radius && distance > f32::EPSILON {
                    // Inverse-square attraction straight into velocity
                    let magnitude = well.strength / (distance * distance);
                    pull = pull.add(offset.normalized().scale(magnitude));
                }
            }

            if in_core {
                combat::force_zero(ctx, world, id, DamageSource::Singularity);
                continue;
            }
            if pull.length_sq() > 0.0 {
                if let Some(velocity) = world.get_component_mut::<Velocity>(id) {
                    velocity.0 = velocity.0.add(pull.scale(susceptibility * dt));
                }
            }
        }
        Ok(())
    }
}
