//! Nutrient collection. Every collected nutrient is replaced somewhere
//! else so the ambient food density stays constant.

use anyhow::Result;

use crate::components::{Energy, Nutrient, Position, StageState};
use crate::ecs::{EntityId, World};
use crate::events::GameEvent;
use crate::factory;
use crate::rng::RngManager;
use crate::scheduler::{System, TickContext};
use crate::spatial::{circles_overlap, Vec3};
use crate::systems::priority;

pub struct PickupSystem;

impl PickupSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PickupSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PickupSystem {
    fn name(&self) -> &'static str {
        "pickup"
    }

    fn priority(&self) -> i32 {
        priority::PICKUP
    }

    fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        rng: &mut RngManager,
    ) -> Result<()> {
        let nutrient_radius = ctx.tuning.pickup.nutrient_radius;

        let mut collectors: Vec<(EntityId, Vec3, f32)> = Vec::new();
        for id in world.players() {
            let (Some(pos), Some(stage), Some(energy)) = (
                world.get_component::<Position>(id),
                world.get_component::<StageState>(id),
                world.get_component::<Energy>(id),
            ) else {
                continue;
            };
            if energy.is_depleted() {
                continue;
            }
            collectors.push((id, pos.0, ctx.tuning.stage(stage.stage).radius));
        }

        let mut respawns = 0usize;
        for nutrient_id in world.ids_with::<Nutrient>() {
            let (Some(nutrient), Some(pos)) = (
                world.get_component::<Nutrient>(nutrient_id),
                world.get_component::<Position>(nutrient_id),
            ) else {
                continue;
            };
            let value = nutrient.value;
            let nutrient_pos = pos.0;

            let collector = collectors
                .iter()
                .find(|(_, pos, radius)| {
                    circles_overlap(nutrient_pos, nutrient_radius, *pos, *radius)
                })
                .map(|(id, _, _)| *id);
            let Some(collector) = collector else {
                continue;
            };

            if let Some(energy) = world.get_component_mut::<Energy>(collector) {
                energy.gain(value);
            }
            ctx.emit(GameEvent::NutrientCollected {
                id: GameEvent::external(world, nutrient_id),
                by: GameEvent::external(world, collector),
            });
            world.destroy_entity(nutrient_id);
            respawns += 1;
        }

        if respawns > 0 {
            let stream = rng.stream("nutrient_respawn");
            let positions =
                factory::sample_positions(stream, ctx.tuning, respawns, nutrient_radius * 4.0);
            for pos in positions {
                let id = factory::spawn_nutrient(world, ctx.tuning, pos);
                ctx.emit(GameEvent::NutrientSpawned {
                    id: GameEvent::external(world, id),
                    position: pos,
                });
            }
        }
        Ok(())
    }
}
