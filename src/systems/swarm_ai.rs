//! Swarm fauna steering. Units patrol around their spawn point until a
//! live cell comes inside detection range, then chase it; the mode is
//! recomputed from proximity every tick, so escaping the radius is
//! enough to shake a unit off.

use anyhow::Result;
use rand::Rng;

use crate::components::{Energy, InputIntent, Position, SwarmMode, SwarmUnit};
use crate::ecs::{Tag, World};
use crate::rng::RngManager;
use crate::scheduler::{System, TickContext};
use crate::spatial::Vec3;
use crate::systems::priority;

pub struct SwarmAiSystem;

impl SwarmAiSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SwarmAiSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for SwarmAiSystem {
    fn name(&self) -> &'static str {
        "swarm_ai"
    }

    fn priority(&self) -> i32 {
        priority::SWARM_AI
    }

    fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        rng: &mut RngManager,
    ) -> Result<()> {
        let detection = ctx.tuning.swarm.detection_radius;

        let mut prey: Vec<Vec3> = Vec::new();
        for id in world.players() {
            let alive = world
                .get_component::<Energy>(id)
                .map(|e| !e.is_depleted())
                .unwrap_or(false);
            if !alive {
                continue;
            }
            if let Some(pos) = world.get_component::<Position>(id) {
                prey.push(pos.0);
            }
        }

        for id in world.with_tag(Tag::Swarm) {
            let (Some(pos), Some(unit)) = (
                world.get_component::<Position>(id).map(|p| p.0),
                world.get_component::<SwarmUnit>(id),
            ) else {
                continue;
            };
            let disabled = world
                .get_component::<Energy>(id)
                .map(|e| e.is_depleted())
                .unwrap_or(true);
            if disabled {
                Self::steer(world, id, Vec3::ZERO, SwarmMode::Patrol);
                continue;
            }
            let home = unit.home;

            let target = prey
                .iter()
                .copied()
                .map(|p| (p.distance(pos), p))
                .filter(|(d, _)| *d <= detection)
                .min_by(|(a, _), (b, _)| a.total_cmp(b));

            match target {
                Some((_, player_pos)) => {
                    let dir = player_pos.sub(pos).normalized();
                    Self::steer(world, id, dir, SwarmMode::Chase);
                }
                None => {
                    // Wander with a homeward bias that grows with leash distance
                    let mut stream = rng.entity_stream("swarm_ai", id);
                    let angle: f32 = stream.gen_range(0.0..std::f32::consts::TAU);
                    let wander = Vec3::xy(angle.cos(), angle.sin());
                    let leash = home.distance(pos) / detection;
                    let homeward = home.sub(pos).normalized().scale(leash);
                    let dir = wander.add(homeward).normalized();
                    Self::steer(world, id, dir, SwarmMode::Patrol);
                }
            }
        }
        Ok(())
    }
}

impl SwarmAiSystem {
    fn steer(world: &mut World, id: crate::ecs::EntityId, direction: Vec3, mode: SwarmMode) {
        if let Some(intent) = world.get_component_mut::<InputIntent>(id) {
            intent.direction = direction;
            intent.sprint = false;
        }
        if let Some(unit) = world.get_component_mut::<SwarmUnit>(id) {
            unit.mode = mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tuning;
    use crate::factory;

    fn step(tuning: &Tuning, world: &mut World) {
        let mut ctx = TickContext::new(0, 1.0 / 60.0, tuning);
        let mut rng = RngManager::new(21);
        SwarmAiSystem::new().run(&mut ctx, world, &mut rng).unwrap();
    }

    #[test]
    fn test_unit_chases_player_in_range() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let unit = factory::spawn_swarm_unit(&mut world, &tuning, Vec3::ZERO);
        factory::spawn_player(&mut world, &tuning, "p", Vec3::xy(100.0, 0.0));

        step(&tuning, &mut world);

        let state = world.get_component::<SwarmUnit>(unit).unwrap();
        assert_eq!(state.mode, SwarmMode::Chase);
        let intent = world.get_component::<InputIntent>(unit).unwrap();
        assert!(intent.direction.x > 0.9);
    }

    #[test]
    fn test_unit_drops_chase_outside_detection() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let unit = factory::spawn_swarm_unit(&mut world, &tuning, Vec3::ZERO);
        world.get_component_mut::<SwarmUnit>(unit).unwrap().mode = SwarmMode::Chase;
        factory::spawn_player(
            &mut world,
            &tuning,
            "p",
            Vec3::xy(tuning.swarm.detection_radius + 100.0, 0.0),
        );

        step(&tuning, &mut world);

        let state = world.get_component::<SwarmUnit>(unit).unwrap();
        assert_eq!(state.mode, SwarmMode::Patrol);
    }

    #[test]
    fn test_dead_players_are_invisible_to_swarms() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let unit = factory::spawn_swarm_unit(&mut world, &tuning, Vec3::ZERO);
        let player = factory::spawn_player(&mut world, &tuning, "p", Vec3::xy(50.0, 0.0));
        world.get_component_mut::<Energy>(player).unwrap().current = 0.0;

        step(&tuning, &mut world);

        let state = world.get_component::<SwarmUnit>(unit).unwrap();
        assert_eq!(state.mode, SwarmMode::Patrol);
    }

    #[test]
    fn test_disabled_unit_stops_moving() {
        let tuning = Tuning::default();
        let mut world = World::new();
        let unit = factory::spawn_swarm_unit(&mut world, &tuning, Vec3::ZERO);
        world.get_component_mut::<Energy>(unit).unwrap().current = 0.0;
        factory::spawn_player(&mut world, &tuning, "p", Vec3::xy(50.0, 0.0));

        step(&tuning, &mut world);

        let intent = world.get_component::<InputIntent>(unit).unwrap();
        assert_eq!(intent.direction, Vec3::ZERO);
    }
}
