//! Nutrient drift toward evolved cells. MultiCell and above pull loose
//! food toward themselves; the first stage gets no pull at all.

use anyhow::Result;

use crate::components::{Energy, Nutrient, Position, StageState};
use crate::ecs::World;
use crate::rng::RngManager;
use crate::scheduler::{System, TickContext};
use crate::spatial::Vec3;
use crate::stage::Stage;
use crate::systems::priority;

pub struct AttractionSystem;

impl AttractionSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AttractionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for AttractionSystem {
    fn name(&self) -> &'static str {
        "attraction"
    }

    fn priority(&self) -> i32 {
        priority::ATTRACTION
    }

    fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        _rng: &mut RngManager,
    ) -> Result<()> {
        let radius = ctx.tuning.attraction.radius;
        let pull = ctx.tuning.attraction.strength * ctx.dt_f32();

        let mut attractors: Vec<Vec3> = Vec::new();
        for id in world.players() {
            let (Some(pos), Some(stage), Some(energy)) = (
                world.get_component::<Position>(id),
                world.get_component::<StageState>(id),
                world.get_component::<Energy>(id),
            ) else {
                continue;
            };
            if energy.is_depleted() || stage.stage == Stage::SingleCell {
                continue;
            }
            attractors.push(pos.0);
        }
        if attractors.is_empty() {
            return Ok(());
        }

        for id in world.ids_with::<Nutrient>() {
            let Some(position) = world.get_component::<Position>(id) else {
                continue;
            };
            let pos = position.0;
            let nearest = attractors
                .iter()
                .map(|a| (a.distance(pos), *a))
                .filter(|(d, _)| *d <= radius)
                .min_by(|(a, _), (b, _)| a.total_cmp(b));
            let Some((distance, attractor)) = nearest else {
                continue;
            };
            // Never overshoot the attractor in a single tick
            let step = pull.min(distance);
            let dir = attractor.sub(pos).normalized();
            if let Some(position) = world.get_component_mut::<Position>(id) {
                position.0 = pos.add(dir.scale(step));
            }
        }
        Ok(())
    }
}
