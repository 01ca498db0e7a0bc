//! Simulation driver: owns the world, the system runner and the
//! derived randomness, applies queued client commands between ticks and
//! hands the resulting event batch to the caller for broadcasting.

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, warn};

use crate::components::{
    AbilityIntent, Energy, EvolveIntent, InputIntent, PendingRespawn, WeaponChoiceIntent,
};
use crate::config::Tuning;
use crate::ecs::{EntityId, Tag, World};
use crate::events::{GameEvent, WorldView};
use crate::factory;
use crate::rng::RngManager;
use crate::scheduler::{System, SystemRunner, TickContext, TickStats};
use crate::spatial::Vec3;
use crate::stage::WeaponKind;
use crate::systems::{
    AttractionSystem, BotAiSystem, DeathSystem, GravitySystem, LifecycleSystem, MetabolismSystem,
    MovementSystem, PickupSystem, PredationSystem, RangedWeaponSystem, SwarmAiSystem,
    SwarmCollisionSystem,
};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("player id '{0}' is already taken")]
    DuplicateId(String),
    #[error("player id '{0}' uses a reserved prefix")]
    ReservedId(String),
    #[error("no player with id '{0}'")]
    UnknownId(String),
    #[error("player '{0}' is not dead")]
    NotDead(String),
}

/// Client request applied between ticks. Every payload carries the
/// external string id the client joined with.
#[derive(Debug, Clone)]
pub enum Command {
    Leave {
        id: String,
    },
    SetDirection {
        id: String,
        direction: Vec3,
        sprint: bool,
    },
    Fire {
        id: String,
        target: Option<Vec3>,
    },
    Evolve {
        id: String,
    },
    ChooseWeapon {
        id: String,
        weapon: WeaponKind,
    },
    Respawn {
        id: String,
    },
}

pub struct EngineSettings {
    pub seed: u64,
    pub tick_rate_hz: u32,
    pub bot_count: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            tick_rate_hz: 60,
            bot_count: 12,
        }
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    tuning: Tuning,
    runner: SystemRunner,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings, tuning: Tuning) -> Self {
        Self {
            settings,
            tuning,
            runner: SystemRunner::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.runner.register(system);
        self
    }

    /// The full gameplay roster in its documented order.
    pub fn with_default_systems(self) -> Self {
        self.with_system(BotAiSystem::new())
            .with_system(SwarmAiSystem::new())
            .with_system(GravitySystem::new())
            .with_system(RangedWeaponSystem::new())
            .with_system(PredationSystem::new())
            .with_system(SwarmCollisionSystem::new())
            .with_system(MovementSystem::new())
            .with_system(MetabolismSystem::new())
            .with_system(PickupSystem::new())
            .with_system(AttractionSystem::new())
            .with_system(DeathSystem::new())
            .with_system(LifecycleSystem::new())
    }

    pub fn build(self) -> Engine {
        let mut engine = Engine {
            rng: RngManager::new(self.settings.seed),
            runner: self.runner,
            world: World::new(),
            tick: 0,
            dt: 1.0 / f64::from(self.settings.tick_rate_hz.max(1)),
            settings: self.settings,
            tuning: self.tuning,
        };
        engine.populate();
        engine
    }
}

pub struct Engine {
    settings: EngineSettings,
    tuning: Tuning,
    world: World,
    runner: SystemRunner,
    rng: RngManager,
    tick: u64,
    dt: f64,
}

impl Engine {
    /// Seed the arena: obstacles first so the sampler can keep food and
    /// fauna clear of their cores, then nutrients, swarm and bots.
    fn populate(&mut self) {
        let world_cfg = self.tuning.world.clone();
        let min_sep = world_cfg.min_separation;

        let stream = self.rng.stream("bootstrap");
        let obstacle_positions =
            factory::sample_positions(stream, &self.tuning, world_cfg.obstacle_count, min_sep * 2.0);
        for pos in obstacle_positions {
            factory::spawn_obstacle(&mut self.world, &self.tuning, pos);
        }

        let stream = self.rng.stream("bootstrap");
        let nutrient_positions =
            factory::sample_positions(stream, &self.tuning, world_cfg.nutrient_count, 0.0);
        for pos in nutrient_positions {
            factory::spawn_nutrient(&mut self.world, &self.tuning, pos);
        }

        let stream = self.rng.stream("bootstrap");
        let swarm_positions =
            factory::sample_positions(stream, &self.tuning, world_cfg.swarm_count, min_sep / 2.0);
        for pos in swarm_positions {
            factory::spawn_swarm_unit(&mut self.world, &self.tuning, pos);
        }

        let stream = self.rng.stream("bootstrap");
        let bot_positions =
            factory::sample_positions(stream, &self.tuning, self.settings.bot_count, min_sep);
        for pos in bot_positions {
            factory::spawn_bot(&mut self.world, &self.tuning, pos);
        }

        debug!(
            obstacles = world_cfg.obstacle_count,
            nutrients = world_cfg.nutrient_count,
            swarm = world_cfg.swarm_count,
            bots = self.settings.bot_count,
            "world populated"
        );
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.settings.tick_rate_hz
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn view(&self) -> WorldView {
        WorldView::capture(&self.world, self.tick)
    }

    pub fn recent_stats(&self) -> &[TickStats] {
        self.runner.recent_stats()
    }

    /// Admit a new human-controlled cell. The caller owns the id; the
    /// reply event carries the spawn position.
    pub fn join(&mut self, id: &str) -> Result<GameEvent, CommandError> {
        if factory::is_reserved_external_id(id) {
            return Err(CommandError::ReservedId(id.to_string()));
        }
        if self.world.entity_by_external(id).is_some() {
            return Err(CommandError::DuplicateId(id.to_string()));
        }
        let stream = self.rng.stream("join");
        let position = factory::sample_positions(stream, &self.tuning, 1, 0.0)
            .into_iter()
            .next()
            .unwrap_or_default();
        let entity = factory::spawn_player(&mut self.world, &self.tuning, id, position);
        debug!(id, entity, "player joined");
        Ok(GameEvent::Joined {
            id: id.to_string(),
            stage: crate::stage::Stage::SingleCell,
            position,
        })
    }

    /// Apply one queued command. Intent-shaped commands only mutate
    /// intent components; the systems act on them next tick.
    pub fn apply(&mut self, command: Command) -> Result<Option<GameEvent>, CommandError> {
        match command {
            Command::Leave { id } => {
                let entity = self.resolve(&id)?;
                self.world.destroy_entity(entity);
                debug!(id = %id, "player left");
                Ok(Some(GameEvent::Left { id }))
            }
            Command::SetDirection {
                id,
                direction,
                sprint,
            } => {
                let entity = self.resolve(&id)?;
                if let Some(intent) = self.world.get_component_mut::<InputIntent>(entity) {
                    intent.direction = direction;
                    intent.sprint = sprint;
                }
                Ok(None)
            }
            Command::Fire { id, target } => {
                let entity = self.resolve(&id)?;
                self.world.add_component(entity, AbilityIntent { target });
                Ok(None)
            }
            Command::Evolve { id } => {
                let entity = self.resolve(&id)?;
                self.world.add_component(entity, EvolveIntent);
                Ok(None)
            }
            Command::ChooseWeapon { id, weapon } => {
                let entity = self.resolve(&id)?;
                self.world.add_component(entity, WeaponChoiceIntent(weapon));
                Ok(None)
            }
            Command::Respawn { id } => {
                let entity = self.resolve(&id)?;
                let dead = self
                    .world
                    .get_component::<Energy>(entity)
                    .map(|e| e.is_depleted())
                    .unwrap_or(false);
                if !dead || self.world.has_tag(entity, Tag::Bot) {
                    return Err(CommandError::NotDead(id));
                }
                // Immediate respawn: the lifecycle system picks it up
                // on the next tick.
                self.world
                    .add_component(entity, PendingRespawn { at: self.now() });
                Ok(None)
            }
        }
    }

    fn resolve(&self, id: &str) -> Result<EntityId, CommandError> {
        self.world
            .entity_by_external(id)
            .ok_or_else(|| CommandError::UnknownId(id.to_string()))
    }

    pub fn now(&self) -> f64 {
        self.tick as f64 * self.dt
    }

    /// Advance the simulation by one tick and return the events it
    /// produced, in emit order.
    pub fn tick(&mut self) -> Result<Vec<GameEvent>> {
        self.world.clear_transient_tags();
        let mut ctx = TickContext::new(self.tick, self.dt, &self.tuning);
        let stats = self.runner.run(&mut ctx, &mut self.world, &mut self.rng)?;
        if stats.duration.as_secs_f64() > self.dt {
            warn!(
                tick = self.tick,
                elapsed_ms = stats.duration.as_millis() as u64,
                "tick overran its interval"
            );
        }
        self.tick += 1;
        self.rng.advance_tick();
        Ok(ctx.events)
    }

    /// Synchronous multi-tick driver for tests and headless runs.
    pub fn run_ticks(&mut self, count: u64) -> Result<Vec<GameEvent>> {
        let mut events = Vec::new();
        for _ in 0..count {
            events.extend(self.tick()?);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Position, StageState};

    fn quiet_engine(seed: u64) -> Engine {
        let mut tuning = Tuning::default();
        // Empty arena keeps these tests focused on command plumbing
        tuning.world.obstacle_count = 0;
        tuning.world.swarm_count = 0;
        tuning.world.nutrient_count = 0;
        let settings = EngineSettings {
            seed,
            tick_rate_hz: 60,
            bot_count: 0,
        };
        EngineBuilder::new(settings, tuning)
            .with_default_systems()
            .build()
    }

    #[test]
    fn test_join_rejects_duplicate_id() {
        let mut engine = quiet_engine(1);
        engine.join("ada").unwrap();
        assert!(matches!(
            engine.join("ada"),
            Err(CommandError::DuplicateId(_))
        ));
    }

    /// Generated names ("bot-N", "nut-N", ...) must stay bindable when
    /// their serial comes up, so joins cannot squat on those prefixes.
    #[test]
    fn test_join_rejects_reserved_prefixes() {
        let mut engine = quiet_engine(1);
        for id in ["bot-3", "nut-17", "obs-1", "swarm-2", "e-9"] {
            assert!(
                matches!(engine.join(id), Err(CommandError::ReservedId(_))),
                "'{id}' must be rejected"
            );
        }
        // Only the exact dashed prefix is reserved
        engine.join("bottom-feeder").unwrap();
    }

    #[test]
    fn test_commands_reach_intent_components() {
        let mut engine = quiet_engine(1);
        engine.join("ada").unwrap();
        engine
            .apply(Command::SetDirection {
                id: "ada".into(),
                direction: Vec3::xy(1.0, 0.0),
                sprint: true,
            })
            .unwrap();

        let entity = engine.world().entity_by_external("ada").unwrap();
        let intent = engine.world().get_component::<InputIntent>(entity).unwrap();
        assert_eq!(intent.direction, Vec3::xy(1.0, 0.0));
        assert!(intent.sprint);
    }

    #[test]
    fn test_unknown_id_is_an_error() {
        let mut engine = quiet_engine(1);
        assert!(matches!(
            engine.apply(Command::Evolve { id: "ghost".into() }),
            Err(CommandError::UnknownId(_))
        ));
    }

    #[test]
    fn test_respawn_rejected_while_alive() {
        let mut engine = quiet_engine(1);
        engine.join("ada").unwrap();
        assert!(matches!(
            engine.apply(Command::Respawn { id: "ada".into() }),
            Err(CommandError::NotDead(_))
        ));
    }

    #[test]
    fn test_identical_seeds_stay_in_lockstep() {
        let build = || {
            let mut engine = quiet_engine(99);
            engine.join("ada").unwrap();
            engine
                .apply(Command::SetDirection {
                    id: "ada".into(),
                    direction: Vec3::xy(0.6, 0.8),
                    sprint: false,
                })
                .unwrap();
            engine
        };
        let mut a = build();
        let mut b = build();
        a.run_ticks(30).unwrap();
        b.run_ticks(30).unwrap();

        let pos = |e: &Engine| {
            let id = e.world().entity_by_external("ada").unwrap();
            e.world().get_component::<Position>(id).unwrap().0
        };
        assert_eq!(pos(&a), pos(&b));
    }

    #[test]
    fn test_leave_removes_every_trace() {
        let mut engine = quiet_engine(1);
        engine.join("ada").unwrap();
        let entity = engine.world().entity_by_external("ada").unwrap();

        engine.apply(Command::Leave { id: "ada".into() }).unwrap();
        assert!(engine.world().entity_by_external("ada").is_none());
        assert!(engine
            .world()
            .get_component::<StageState>(entity)
            .is_none());
    }
}
