//! Contact predation - continuous energy drain between stages

use anyhow::Result;

use crate::components::{DamageSource, DrainTarget, Energy, Position, StageState};
use crate::ecs::{EntityId, World};
use crate::rng::RngManager;
use crate::scheduler::{System, TickContext};
use crate::spatial::{circles_overlap, Vec3};
use crate::stage::Stage;
use crate::systems::{combat, priority};

pub struct PredationSystem;

impl PredationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PredationSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
struct Contender {
    id: EntityId,
    stage: Stage,
    pos: Vec3,
    radius: f32,
}

impl System for PredationSystem {
    fn name(&self) -> &'static str {
        "predation"
    }

    fn priority(&self) -> i32 {
        priority::PREDATION
    }

    fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        _rng: &mut RngManager,
    ) -> Result<()> {
        // Drain links are rebuilt from scratch every tick; breaking contact
        // for a single tick is enough to escape.
        for id in world.ids_with::<DrainTarget>() {
            world.remove_component::<DrainTarget>(id);
        }

        let contenders: Vec<Contender> = world
            .players()
            .into_iter()
            .filter_map(|id| {
                let energy = world.get_component::<Energy>(id)?;
                if energy.is_depleted() {
                    return None;
                }
                let stage = world.get_component::<StageState>(id)?.stage;
                let pos = world.get_component::<Position>(id)?.0;
                Some(Contender {
                    id,
                    stage,
                    pos,
                    radius: ctx.tuning.stage(stage).radius,
                })
            })
            .collect();

        let drain = ctx.tuning.predation.drain_rate * ctx.dt_f32();
        for predator in &contenders {
            // A contender drained to zero by a larger predator earlier in
            // this same pass no longer feeds; its own death stands.
            let predator_live = world
                .get_component::<Energy>(predator.id)
                .map(|e| !e.is_depleted())
                .unwrap_or(false);
            if !predator_live {
                continue;
            }
            for prey in &contenders {
                if !predator.stage.preys_on(prey.stage) {
                    continue;
                }
                if !circles_overlap(predator.pos, predator.radius, prey.pos, prey.radius) {
                    continue;
                }

                let prey_max = world
                    .get_component::<Energy>(prey.id)
                    .map(|e| e.max)
                    .unwrap_or(0.0);
                let transferred = combat::apply_damage(
                    ctx,
                    world,
                    prey.id,
                    drain,
                    DamageSource::Predation,
                    Some(predator.id),
                );
                if transferred <= 0.0 {
                    continue;
                }
                if let Some(energy) = world.get_component_mut::<Energy>(predator.id) {
                    energy.gain(transferred);
                }
                world.add_component(
                    prey.id,
                    DrainTarget {
                        predator: predator.id,
                    },
                );

                // The kill bonus lands the instant the prey bottoms out;
                // the death system only handles processing and respawn.
                let prey_dead = world
                    .get_component::<Energy>(prey.id)
                    .map(|e| e.is_depleted())
                    .unwrap_or(false);
                if prey_dead {
                    let bonus =
                        prey_max * ctx.tuning.predation.kill_bonus_pct[prey.stage.index()];
                    if let Some(energy) = world.get_component_mut::<Energy>(predator.id) {
                        energy.max += bonus;
                    }
                }
            }
        }
        Ok(())
    }
}
