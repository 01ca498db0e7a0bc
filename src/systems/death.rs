//! Death processing. A cell dies exactly once: the recorded damage
//! source is consumed when the death is announced, and the energy value
//! is parked on a sentinel so no later tick can re-trigger it.

use anyhow::Result;

use crate::components::{
    DamageTracking, DrainTarget, Energy, PendingRespawn, Position, StageState, DEATH_SENTINEL,
};
use crate::ecs::{Tag, World};
use crate::events::GameEvent;
use crate::rng::RngManager;
use crate::scheduler::{System, TickContext};
use crate::systems::priority;

pub struct DeathSystem;

impl DeathSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DeathSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DeathSystem {
    fn name(&self) -> &'static str {
        "death"
    }

    fn priority(&self) -> i32 {
        priority::DEATH
    }

    fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        _rng: &mut RngManager,
    ) -> Result<()> {
        for id in world.players() {
            let depleted = world
                .get_component::<Energy>(id)
                .map(|e| e.is_depleted())
                .unwrap_or(false);
            if !depleted {
                continue;
            }
            let Some(tracking) = world.get_component::<DamageTracking>(id) else {
                continue;
            };
            // No recorded source means this death was already announced
            let Some(source) = tracking.last_source else {
                continue;
            };
            let killer = tracking
                .last_attacker
                .map(|attacker| GameEvent::external(world, attacker));

            let position = world
                .get_component::<Position>(id)
                .map(|p| p.0)
                .unwrap_or_default();
            let external = GameEvent::external(world, id);
            ctx.emit(GameEvent::Moved {
                id: external.clone(),
                position,
                energy: 0.0,
            });
            ctx.emit(GameEvent::Died {
                id: external,
                source: source.label(),
                killer,
            });

            if let Some(energy) = world.get_component_mut::<Energy>(id) {
                energy.current = DEATH_SENTINEL;
            }
            if let Some(tracking) = world.get_component_mut::<DamageTracking>(id) {
                tracking.last_source = None;
                tracking.last_attacker = None;
            }
            world.remove_component::<DrainTarget>(id);

            // Bots queue their own respawn; humans wait for a command
            if world.has_tag(id, Tag::Bot) {
                let delay = world
                    .get_component::<StageState>(id)
                    .map(|s| ctx.tuning.stage(s.stage).bot_respawn_delay_secs)
                    .unwrap_or(0.0);
                world.add_component(id, PendingRespawn { at: ctx.now + delay });
            }
        }
        Ok(())
    }
}
