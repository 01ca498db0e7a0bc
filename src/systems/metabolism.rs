//! Background energy decay for every cell.

use anyhow::Result;

use crate::components::{DamageSource, DamageTracking, Energy};
use crate::ecs::World;
use crate::rng::RngManager;
use crate::scheduler::{System, TickContext};
use crate::systems::priority;

pub struct MetabolismSystem;

impl MetabolismSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MetabolismSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MetabolismSystem {
    fn name(&self) -> &'static str {
        "metabolism"
    }

    fn priority(&self) -> i32 {
        priority::METABOLISM
    }

    fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        _rng: &mut RngManager,
    ) -> Result<()> {
        let decay = ctx.tuning.metabolism.decay_per_sec * ctx.dt_f32();
        for id in world.players() {
            let Some(energy) = world.get_component_mut::<Energy>(id) else {
                continue;
            };
            if energy.is_depleted() {
                continue;
            }
            energy.drain(decay);
            let starved = energy.is_depleted();
            if starved {
                if let Some(tracking) = world.get_component_mut::<DamageTracking>(id) {
                    tracking.record(DamageSource::Starvation, None);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tuning;
    use crate::factory;
    use crate::spatial::Vec3;

    #[test]
    fn test_decay_and_starvation_attribution() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let player = factory::spawn_player(&mut world, &tuning, "p", Vec3::ZERO);
        world.get_component_mut::<Energy>(player).unwrap().current = 0.005;

        let mut rng = RngManager::new(1);
        let mut ctx = TickContext::new(0, 1.0 / 60.0, &tuning);
        MetabolismSystem::new()
            .run(&mut ctx, &mut world, &mut rng)
            .unwrap();

        let energy = world.get_component::<Energy>(player).unwrap();
        assert_eq!(energy.current, 0.0);
        let tracking = world.get_component::<DamageTracking>(player).unwrap();
        assert_eq!(tracking.last_source, Some(DamageSource::Starvation));
        assert_eq!(tracking.last_attacker, None);
    }

    #[test]
    fn test_already_dead_cells_are_skipped() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let player = factory::spawn_player(&mut world, &tuning, "p", Vec3::ZERO);
        world.get_component_mut::<Energy>(player).unwrap().current = 0.0;

        let mut rng = RngManager::new(1);
        let mut ctx = TickContext::new(0, 1.0 / 60.0, &tuning);
        MetabolismSystem::new()
            .run(&mut ctx, &mut world, &mut rng)
            .unwrap();

        let tracking = world.get_component::<DamageTracking>(player).unwrap();
        assert_eq!(tracking.last_source, None);
    }
}
