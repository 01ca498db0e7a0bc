//! Steering for computer-driven cells.
//!
//! Bots blend nutrient seeking with hazard avoidance and write the
//! result into the same `InputIntent` a human client would send, so
//! the movement path treats both identically.

use anyhow::Result;

use crate::components::{
    DrainTarget, Energy, EvolveIntent, InputIntent, Nutrient, Obstacle, Position, StageState,
    Velocity,
};
use crate::ecs::{EntityId, Tag, World};
use crate::rng::RngManager;
use crate::scheduler::{System, TickContext};
use crate::spatial::Vec3;
use crate::systems::priority;

pub struct BotAiSystem;

impl BotAiSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BotAiSystem {
    fn default() -> Self {
        Self::new()
    }
}

struct Hazard {
    pos: Vec3,
    /// Distance at which danger reaches full strength.
    inner: f32,
    /// Distance at which danger fades to zero.
    outer: f32,
}

impl Hazard {
    /// Repulsion away from the hazard, scaled 0..1 by proximity.
    fn repulsion(&self, from: Vec3) -> Vec3 {
        let d = self.pos.distance(from);
        if d >= self.outer {
            return Vec3::ZERO;
        }
        let danger = if d <= self.inner {
            1.0
        } else {
            1.0 - (d - self.inner) / (self.outer - self.inner)
        };
        from.sub(self.pos).normalized().scale(danger)
    }
}

impl System for BotAiSystem {
    fn name(&self) -> &'static str {
        "bot_ai"
    }

    fn priority(&self) -> i32 {
        priority::BOT_AI
    }

    fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        _rng: &mut RngManager,
    ) -> Result<()> {
        let bots = ctx.tuning.bots.clone();

        let nutrients: Vec<Vec3> = world
            .ids_with::<Nutrient>()
            .into_iter()
            .filter_map(|id| world.get_component::<Position>(id).map(|p| p.0))
            .collect();

        let mut hazards: Vec<Hazard> = Vec::new();
        for id in world.ids_with::<Obstacle>() {
            let (Some(pos), Some(obstacle)) = (
                world.get_component::<Position>(id),
                world.get_component::<Obstacle>(id),
            ) else {
                continue;
            };
            hazards.push(Hazard {
                pos: pos.0,
                inner: obstacle.core_radius,
                outer: obstacle.core_radius + bots.obstacle_avoid_margin,
            });
        }
        for id in world.with_tag(Tag::Swarm) {
            let (Some(pos), Some(vel)) = (
                world.get_component::<Position>(id),
                world.get_component::<Velocity>(id),
            ) else {
                continue;
            };
            // Dodge where the swarm will be, not where it is
            let predicted = pos.0.add(vel.0.scale(bots.swarm_lookahead_secs));
            hazards.push(Hazard {
                pos: predicted,
                inner: ctx.tuning.swarm.radius,
                outer: bots.swarm_avoid_radius,
            });
        }

        for bot in world.with_tag(Tag::Bot) {
            let (Some(pos), Some(energy), Some(stage)) = (
                world.get_component::<Position>(bot).map(|p| p.0),
                world.get_component::<Energy>(bot),
                world.get_component::<StageState>(bot),
            ) else {
                continue;
            };
            if energy.is_depleted() {
                continue;
            }
            let evolve_at = ctx.tuning.stage(stage.stage).evolve_at;
            let wants_evolve = energy.current >= evolve_at && !stage.is_evolving(ctx.now);

            // Being drained dominates everything: run, sprint if able
            if let Some(drain) = world.get_component::<DrainTarget>(bot) {
                let predator_pos = world
                    .get_component::<Position>(drain.predator)
                    .map(|p| p.0);
                if let Some(predator_pos) = predator_pos {
                    let flee = pos.sub(predator_pos).normalized();
                    let sprint = world.has_tag(bot, Tag::CanSprint);
                    Self::steer(world, bot, flee, sprint);
                    continue;
                }
            }

            let seek = Self::nearest(pos, &nutrients)
                .map(|target| target.sub(pos).normalized())
                .unwrap_or(Vec3::ZERO);

            let mut avoid = Vec3::ZERO;
            for hazard in &hazards {
                avoid = avoid.add(hazard.repulsion(pos));
            }

            let direction = if avoid.length() > bots.avoid_override_threshold {
                avoid.normalized()
            } else {
                seek.add(avoid).normalized()
            };
            Self::steer(world, bot, direction, false);

            if wants_evolve && !world.has_component::<EvolveIntent>(bot) {
                world.add_component(bot, EvolveIntent);
            }
        }
        Ok(())
    }
}

impl BotAiSystem {
    fn nearest(from: Vec3, candidates: &[Vec3]) -> Option<Vec3> {
        candidates
            .iter()
            .copied()
            .min_by(|a, b| a.distance(from).total_cmp(&b.distance(from)))
    }

    fn steer(world: &mut World, bot: EntityId, direction: Vec3, sprint: bool) {
        if let Some(intent) = world.get_component_mut::<InputIntent>(bot) {
            intent.direction = direction;
            intent.sprint = sprint;
        }
    }
}
