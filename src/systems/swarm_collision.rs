//! Swarm contact damage and consumption of disabled units

use anyhow::Result;

use crate::components::{
    AbilityKind, Cooldowns, DamageSource, Energy, Position, StageState, SwarmUnit,
};
use crate::ecs::{EntityId, Tag, World};
use crate::events::GameEvent;
use crate::rng::RngManager;
use crate::scheduler::{System, TickContext};
use crate::spatial::{circles_overlap, Vec3};
use crate::systems::{combat, priority};

pub struct SwarmCollisionSystem;

impl SwarmCollisionSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SwarmCollisionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for SwarmCollisionSystem {
    fn name(&self) -> &'static str {
        "swarm_collision"
    }

    fn priority(&self) -> i32 {
        priority::SWARM_COLLISION
    }

    fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        _rng: &mut RngManager,
    ) -> Result<()> {
        let swarm_radius = ctx.tuning.swarm.radius;
        let contact_damage = ctx.tuning.swarm.contact_damage_per_sec * ctx.dt_f32();

        let units: Vec<(EntityId, Vec3, bool)> = world
            .with_tag(Tag::Swarm)
            .into_iter()
            .filter_map(|id| {
                let _unit = world.get_component::<SwarmUnit>(id)?;
                let pos = world.get_component::<Position>(id)?.0;
                let disabled = world
                    .get_component::<Energy>(id)
                    .map(|e| e.is_depleted())
                    .unwrap_or(true);
                Some((id, pos, disabled))
            })
            .collect();

        let players: Vec<(EntityId, Vec3, f32)> = world
            .players()
            .into_iter()
            .filter_map(|id| {
                let energy = world.get_component::<Energy>(id)?;
                if energy.is_depleted() {
                    return None;
                }
                let stage = world.get_component::<StageState>(id)?.stage;
                let pos = world.get_component::<Position>(id)?.0;
                Some((id, pos, ctx.tuning.stage(stage).radius))
            })
            .collect();

        // Hostile contact: damage plus the per-tick movement slow. The tag
        // was cleared at tick start, so it lasts exactly as long as contact.
        for (unit_id, unit_pos, disabled) in &units {
            if *disabled {
                continue;
            }
            for (player_id, player_pos, player_radius) in &players {
                if !circles_overlap(*unit_pos, swarm_radius, *player_pos, *player_radius) {
                    continue;
                }
                combat::apply_damage(
                    ctx,
                    world,
                    *player_id,
                    contact_damage,
                    DamageSource::Swarm,
                    Some(*unit_id),
                );
                world.tag(*player_id, Tag::Slowed);
            }
        }

        // Symmetric half: a capable player eats a disabled unit.
        for (unit_id, unit_pos, disabled) in &units {
            if !*disabled {
                continue;
            }
            for (player_id, player_pos, player_radius) in &players {
                if !world.has_tag(*player_id, Tag::CanConsumeSwarm) {
                    continue;
                }
                let reach = player_radius + ctx.tuning.swarm.consume_range;
                if !circles_overlap(*unit_pos, swarm_radius, *player_pos, reach) {
                    continue;
                }
                let ready = world
                    .get_component::<Cooldowns>(*player_id)
                    .map(|c| {
                        c.ready(
                            AbilityKind::ConsumeSwarm,
                            ctx.now,
                            ctx.tuning.swarm.consume_cooldown_secs,
                        )
                    })
                    .unwrap_or(false);
                if !ready {
                    continue;
                }

                let unit_ext = GameEvent::external(world, *unit_id);
                let player_ext = GameEvent::external(world, *player_id);
                if let Some(energy) = world.get_component_mut::<Energy>(*player_id) {
                    energy.gain(ctx.tuning.swarm.consume_reward);
                }
                if let Some(cooldowns) = world.get_component_mut::<Cooldowns>(*player_id) {
                    cooldowns.mark(AbilityKind::ConsumeSwarm, ctx.now);
                }
                world.destroy_entity(*unit_id);
                ctx.emit(GameEvent::SwarmConsumed {
                    id: unit_ext,
                    by: player_ext,
                });
                break;
            }
        }
        Ok(())
    }
}
