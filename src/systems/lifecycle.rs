//! Respawn, evolution, weapon choice and timed-component expiry.
//!
//! Runs last in the tick so every deadline it checks was set by an
//! earlier system against the same simulated clock.

use anyhow::Result;
use rand::seq::SliceRandom;

use crate::components::{
    Energy, EvolveIntent, Expiry, PendingRespawn, StageState, Stunned, WeaponChoiceIntent,
};
use crate::ecs::{Tag, World};
use crate::events::GameEvent;
use crate::factory;
use crate::rng::RngManager;
use crate::scheduler::{System, TickContext};
use crate::stage::{Stage, WeaponKind};
use crate::systems::priority;

pub struct LifecycleSystem;

impl LifecycleSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LifecycleSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for LifecycleSystem {
    fn name(&self) -> &'static str {
        "lifecycle"
    }

    fn priority(&self) -> i32 {
        priority::LIFECYCLE
    }

    fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        rng: &mut RngManager,
    ) -> Result<()> {
        self.expire_timed_components(ctx, world);
        self.process_respawns(ctx, world, rng);
        self.process_evolve_intents(ctx, world);
        self.process_weapon_choices(ctx, world);
        self.auto_resolve_choice_windows(ctx, world, rng);
        Ok(())
    }
}

impl LifecycleSystem {
    fn expire_timed_components(&self, ctx: &mut TickContext<'_>, world: &mut World) {
        for id in world.ids_with::<Expiry>() {
            let expired = world
                .get_component::<Expiry>(id)
                .map(|e| ctx.now >= e.at)
                .unwrap_or(false);
            if expired {
                ctx.emit(GameEvent::Left {
                    id: GameEvent::external(world, id),
                });
                world.destroy_entity(id);
            }
        }
        for id in world.ids_with::<Stunned>() {
            let over = world
                .get_component::<Stunned>(id)
                .map(|s| ctx.now >= s.until)
                .unwrap_or(true);
            if over {
                world.remove_component::<Stunned>(id);
            }
        }
        for id in world.ids_with::<StageState>() {
            let Some(state) = world.get_component_mut::<StageState>(id) else {
                continue;
            };
            if state.evolving_until.map(|t| ctx.now >= t).unwrap_or(false) {
                state.evolving_until = None;
            }
        }
    }

    fn process_respawns(&self, ctx: &mut TickContext<'_>, world: &mut World, rng: &mut RngManager) {
        for id in world.ids_with::<PendingRespawn>() {
            let due = world
                .get_component::<PendingRespawn>(id)
                .map(|p| ctx.now >= p.at)
                .unwrap_or(false);
            if !due {
                continue;
            }
            let stream = rng.stream("respawn");
            let position = factory::sample_positions(stream, ctx.tuning, 1, 0.0)
                .into_iter()
                .next()
                .unwrap_or_default();
            factory::respawn_player(world, ctx.tuning, id, position);
            let stage = world
                .get_component::<StageState>(id)
                .map(|s| s.stage)
                .unwrap_or(Stage::SingleCell);
            ctx.emit(GameEvent::Respawned {
                id: GameEvent::external(world, id),
                stage,
                position,
            });
        }
    }

    fn process_evolve_intents(&self, ctx: &mut TickContext<'_>, world: &mut World) {
        for id in world.ids_with::<EvolveIntent>() {
            world.remove_component::<EvolveIntent>(id);
            let (Some(energy), Some(state)) = (
                world.get_component::<Energy>(id),
                world.get_component::<StageState>(id),
            ) else {
                continue;
            };
            if energy.is_depleted() || state.is_evolving(ctx.now) {
                continue;
            }
            let Some(next) = state.stage.next() else {
                continue;
            };
            if energy.current < ctx.tuning.stage(state.stage).evolve_at {
                continue;
            }

            factory::set_stage(world, ctx.tuning, id, next);
            let opens_choice = next.opens_weapon_choice();
            if let Some(state) = world.get_component_mut::<StageState>(id) {
                state.evolving_until = Some(ctx.now + ctx.tuning.lifecycle.evolving_lock_secs);
                if opens_choice {
                    state.choice_deadline =
                        Some(ctx.now + ctx.tuning.lifecycle.choice_window_secs);
                }
            }
            ctx.emit(GameEvent::Evolved {
                id: GameEvent::external(world, id),
                stage: next,
            });
            if opens_choice {
                ctx.emit(GameEvent::WeaponChoiceOpened {
                    id: GameEvent::external(world, id),
                    deadline: ctx.now + ctx.tuning.lifecycle.choice_window_secs,
                });
            }
        }
    }

    fn process_weapon_choices(&self, ctx: &mut TickContext<'_>, world: &mut World) {
        for id in world.ids_with::<WeaponChoiceIntent>() {
            let Some(WeaponChoiceIntent(weapon)) =
                world.remove_component::<WeaponChoiceIntent>(id)
            else {
                continue;
            };
            if !world.has_tag(id, Tag::CanFire) {
                continue;
            }
            let Some(state) = world.get_component_mut::<StageState>(id) else {
                continue;
            };
            // First pick wins; the window closes with it
            if state.weapon.is_some() {
                continue;
            }
            state.weapon = Some(weapon);
            state.choice_deadline = None;
            ctx.emit(GameEvent::WeaponChosen {
                id: GameEvent::external(world, id),
                weapon,
                auto_resolved: false,
            });
        }
    }

    fn auto_resolve_choice_windows(
        &self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        rng: &mut RngManager,
    ) {
        for id in world.ids_with::<StageState>() {
            let expired = world
                .get_component::<StageState>(id)
                .map(|s| {
                    s.weapon.is_none()
                        && s.choice_deadline.map(|d| ctx.now >= d).unwrap_or(false)
                })
                .unwrap_or(false);
            if !expired {
                continue;
            }
            let weapon = *WeaponKind::ALL
                .choose(rng.stream("weapon_choice"))
                .unwrap_or(&WeaponKind::Pseudopod);
            if let Some(state) = world.get_component_mut::<StageState>(id) {
                state.weapon = Some(weapon);
                state.choice_deadline = None;
            }
            ctx.emit(GameEvent::WeaponChosen {
                id: GameEvent::external(world, id),
                weapon,
                auto_resolved: true,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tuning;
    use crate::spatial::Vec3;
    use crate::stage::Stage;

    fn step_at(tuning: &Tuning, world: &mut World, tick: u64) -> Vec<GameEvent> {
        let mut ctx = TickContext::new(tick, 1.0 / 60.0, tuning);
        let mut rng = RngManager::new(9);
        LifecycleSystem::new()
            .run(&mut ctx, world, &mut rng)
            .unwrap();
        ctx.events
    }

    #[test]
    fn test_evolution_is_atomic() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let player = factory::spawn_player(&mut world, &tuning, "p", Vec3::ZERO);
        world.get_component_mut::<Energy>(player).unwrap().current =
            tuning.stage(Stage::SingleCell).evolve_at;
        world.add_component(player, EvolveIntent);

        let events = step_at(&tuning, &mut world, 0);

        let state = world.get_component::<StageState>(player).unwrap();
        assert_eq!(state.stage, Stage::MultiCell);
        assert!(state.is_evolving(0.0));
        let energy = world.get_component::<Energy>(player).unwrap();
        // New stage grants a full refill and a new ceiling together
        assert_eq!(energy.max, tuning.stage(Stage::MultiCell).max_energy);
        assert_eq!(energy.current, energy.max);
        assert!(world.has_tag(player, Tag::CanSprint));
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::Evolved { stage: Stage::MultiCell, .. })));
    }

    #[test]
    fn test_evolution_below_threshold_is_rejected() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let player = factory::spawn_player(&mut world, &tuning, "p", Vec3::ZERO);
        world.get_component_mut::<Energy>(player).unwrap().current =
            tuning.stage(Stage::SingleCell).evolve_at - 1.0;
        world.add_component(player, EvolveIntent);

        let events = step_at(&tuning, &mut world, 0);
        assert!(events.is_empty());
        let state = world.get_component::<StageState>(player).unwrap();
        assert_eq!(state.stage, Stage::SingleCell);
        assert!(!world.has_component::<EvolveIntent>(player));
    }

    #[test]
    fn test_hunter_evolution_opens_choice_window() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let player = factory::spawn_player(&mut world, &tuning, "p", Vec3::ZERO);
        factory::set_stage(&mut world, &tuning, player, Stage::MultiCell);
        world.get_component_mut::<Energy>(player).unwrap().current =
            tuning.stage(Stage::MultiCell).evolve_at;
        world.add_component(player, EvolveIntent);

        let events = step_at(&tuning, &mut world, 0);

        let state = world.get_component::<StageState>(player).unwrap();
        assert_eq!(state.stage, Stage::Hunter);
        assert!(state.weapon.is_none());
        let deadline = state.choice_deadline.expect("window open");
        assert!((deadline - tuning.lifecycle.choice_window_secs).abs() < 1e-9);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::WeaponChoiceOpened { .. })));
    }

    #[test]
    fn test_explicit_weapon_choice_wins() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let player = factory::spawn_player(&mut world, &tuning, "p", Vec3::ZERO);
        factory::set_stage(&mut world, &tuning, player, Stage::Hunter);
        world
            .get_component_mut::<StageState>(player)
            .unwrap()
            .choice_deadline = Some(5.0);
        world.add_component(player, WeaponChoiceIntent(WeaponKind::Lance));

        let events = step_at(&tuning, &mut world, 0);

        let state = world.get_component::<StageState>(player).unwrap();
        assert_eq!(state.weapon, Some(WeaponKind::Lance));
        assert_eq!(state.choice_deadline, None);
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::WeaponChosen { auto_resolved: false, .. }
        )));
    }

    #[test]
    fn test_expired_window_auto_resolves() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let player = factory::spawn_player(&mut world, &tuning, "p", Vec3::ZERO);
        factory::set_stage(&mut world, &tuning, player, Stage::Hunter);
        world
            .get_component_mut::<StageState>(player)
            .unwrap()
            .choice_deadline = Some(0.05);

        // Deadline at 0.05s has passed by tick 60 (1.0s)
        let events = step_at(&tuning, &mut world, 60);

        let state = world.get_component::<StageState>(player).unwrap();
        assert!(state.weapon.is_some());
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::WeaponChosen { auto_resolved: true, .. }
        )));
    }

    #[test]
    fn test_bot_respawns_after_delay() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let bot = factory::spawn_bot(&mut world, &tuning, Vec3::ZERO);
        factory::set_stage(&mut world, &tuning, bot, Stage::Hunter);
        world.get_component_mut::<Energy>(bot).unwrap().current = 0.0;
        world.add_component(bot, PendingRespawn { at: 0.5 });

        // Not due yet
        let events = step_at(&tuning, &mut world, 0);
        assert!(events.is_empty());
        assert!(world.has_component::<PendingRespawn>(bot));

        // Tick 60 = 1.0s simulated, past the 0.5s deadline
        let events = step_at(&tuning, &mut world, 60);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::Respawned { stage: Stage::SingleCell, .. })));
        assert!(!world.has_component::<PendingRespawn>(bot));
        let state = world.get_component::<StageState>(bot).unwrap();
        assert_eq!(state.stage, Stage::SingleCell);
        let energy = world.get_component::<Energy>(bot).unwrap();
        assert_eq!(energy.current, tuning.stage(Stage::SingleCell).max_energy);
    }

    #[test]
    fn test_stun_lifts_exactly_at_its_deadline() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let player = factory::spawn_player(&mut world, &tuning, "p", Vec3::ZERO);
        world.add_component(player, Stunned { until: 0.5 });

        step_at(&tuning, &mut world, 29);
        assert!(world.has_component::<Stunned>(player));

        step_at(&tuning, &mut world, 30);
        assert!(!world.has_component::<Stunned>(player));
    }

    #[test]
    fn test_expired_beam_is_destroyed() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let beam = factory::spawn_beam(&mut world, Vec3::ZERO, 0.1);

        step_at(&tuning, &mut world, 0);
        assert!(world.is_alive(beam));

        step_at(&tuning, &mut world, 60);
        assert!(!world.is_alive(beam));
    }
}
