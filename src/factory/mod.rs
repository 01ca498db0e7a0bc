//! Entity factories - the only place new entities are created
//!
//! Each factory attaches the full component set and tags for its kind in
//! one call and registers the external string id, so systems can assume a
//! tagged entity always carries its expected components.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::components::{
    Cooldowns, DamageTracking, Energy, InputIntent, Nutrient, Obstacle, Position, Projectile,
    StageState, SwarmMode, SwarmUnit, Velocity,
};
use crate::config::{ProjectileTuning, Tuning};
use crate::ecs::{EntityId, Tag, World};
use crate::spatial::Vec3;
use crate::stage::Stage;

/// Attach stage, energy pool and ability tags in one atomic step.
/// Used by spawn, evolution and respawn so no tick can observe a
/// half-applied transition.
pub fn set_stage(world: &mut World, tuning: &Tuning, entity: EntityId, stage: Stage) {
    let max_energy = tuning.stage(stage).max_energy;
    if let Some(state) = world.get_component_mut::<StageState>(entity) {
        state.stage = stage;
        if !stage.ability_tags().contains(&Tag::CanFire) {
            state.weapon = None;
        }
    } else {
        world.add_component(entity, StageState::new(stage));
    }
    world.add_component(entity, Energy::full(max_energy));
    for tag in [Tag::CanSprint, Tag::CanFire, Tag::CanConsumeSwarm] {
        world.untag(entity, tag);
    }
    for tag in stage.ability_tags() {
        world.tag(entity, *tag);
    }
}

fn spawn_player_inner(
    world: &mut World,
    tuning: &Tuning,
    external_id: String,
    position: Vec3,
) -> EntityId {
    let entity = world.create_entity();
    world.add_component(entity, Position(position));
    world.add_component(entity, Velocity::default());
    world.add_component(entity, InputIntent::default());
    world.add_component(entity, Cooldowns::default());
    world.add_component(entity, DamageTracking::default());
    world.tag(entity, Tag::Player);
    set_stage(world, tuning, entity, Stage::SingleCell);
    world.bind_external_id(entity, external_id);
    entity
}

/// Human-controlled player; `external_id` comes from the connection.
pub fn spawn_player(
    world: &mut World,
    tuning: &Tuning,
    external_id: impl Into<String>,
    position: Vec3,
) -> EntityId {
    spawn_player_inner(world, tuning, external_id.into(), position)
}

/// Prefixes of the generated external ids below plus the event-side
/// placeholder; joining players must not squat on them or a later
/// generated name would collide and leave its entity unbound.
pub const RESERVED_ID_PREFIXES: [&str; 5] = ["bot-", "nut-", "obs-", "swarm-", "e-"];

pub fn is_reserved_external_id(id: &str) -> bool {
    RESERVED_ID_PREFIXES
        .iter()
        .any(|prefix| id.starts_with(prefix))
}

/// AI-controlled player: a full player plus the Bot tag.
pub fn spawn_bot(world: &mut World, tuning: &Tuning, position: Vec3) -> EntityId {
    let external = format!("bot-{}", world.fresh_serial());
    let entity = spawn_player_inner(world, tuning, external, position);
    world.tag(entity, Tag::Bot);
    entity
}

pub fn spawn_nutrient(world: &mut World, tuning: &Tuning, position: Vec3) -> EntityId {
    let external = format!("nut-{}", world.fresh_serial());
    let entity = world.create_entity();
    world.add_component(entity, Position(position));
    world.add_component(
        entity,
        Nutrient {
            value: tuning.pickup.nutrient_value,
        },
    );
    world.tag(entity, Tag::Nutrient);
    world.bind_external_id(entity, external);
    entity
}

pub fn spawn_obstacle(world: &mut World, tuning: &Tuning, position: Vec3) -> EntityId {
    let external = format!("obs-{}", world.fresh_serial());
    let entity = world.create_entity();
    world.add_component(entity, Position(position));
    world.add_component(
        entity,
        Obstacle {
            radius: tuning.gravity.obstacle_radius,
            core_radius: tuning.gravity.obstacle_core_radius,
            influence_radius: tuning.gravity.obstacle_influence_radius,
            gravity: tuning.gravity.obstacle_strength,
        },
    );
    world.tag(entity, Tag::Obstacle);
    world.bind_external_id(entity, external);
    entity
}

pub fn spawn_swarm_unit(world: &mut World, tuning: &Tuning, position: Vec3) -> EntityId {
    let external = format!("swarm-{}", world.fresh_serial());
    let entity = world.create_entity();
    world.add_component(entity, Position(position));
    world.add_component(entity, Velocity::default());
    world.add_component(entity, InputIntent::default());
    world.add_component(entity, Energy::full(tuning.swarm.max_energy));
    world.add_component(
        entity,
        SwarmUnit {
            mode: SwarmMode::Patrol,
            home: position,
        },
    );
    world.tag(entity, Tag::Swarm);
    world.bind_external_id(entity, external);
    entity
}

pub fn spawn_projectile(
    world: &mut World,
    owner: EntityId,
    position: Vec3,
    heading: Vec3,
    tuning: &ProjectileTuning,
) -> EntityId {
    let external = format!("proj-{}", world.fresh_serial());
    let entity = world.create_entity();
    world.add_component(entity, Position(position));
    world.add_component(
        entity,
        Projectile {
            owner,
            heading: heading.normalized(),
            speed: tuning.speed,
            max_distance: tuning.max_distance,
            traveled: 0.0,
            damage: tuning.damage,
            already_hit: Default::default(),
        },
    );
    world.tag(entity, Tag::Projectile);
    world.bind_external_id(entity, external);
    entity
}

/// Visual-only beam left behind by a hitscan shot; auto-expires.
pub fn spawn_beam(world: &mut World, position: Vec3, expires_at: f64) -> EntityId {
    let external = format!("beam-{}", world.fresh_serial());
    let entity = world.create_entity();
    world.add_component(entity, Position(position));
    world.add_component(entity, crate::components::Expiry { at: expires_at });
    world.tag(entity, Tag::Beam);
    world.bind_external_id(entity, external);
    entity
}

/// Reset an existing player back to SingleCell at `position`.
/// Clears combat residue so the death machinery starts from a clean slate.
pub fn respawn_player(world: &mut World, tuning: &Tuning, entity: EntityId, position: Vec3) {
    world.add_component(entity, Position(position));
    world.add_component(entity, Velocity::default());
    world.add_component(entity, InputIntent::default());
    world.add_component(entity, DamageTracking::default());
    world.remove_component::<crate::components::DrainTarget>(entity);
    world.remove_component::<crate::components::PendingRespawn>(entity);
    world.remove_component::<crate::components::Stunned>(entity);
    if let Some(state) = world.get_component_mut::<StageState>(entity) {
        state.weapon = None;
        state.evolving_until = None;
        state.choice_deadline = None;
    }
    set_stage(world, tuning, entity, Stage::SingleCell);
}

/// Minimum-separation placement sampling for world init. Deterministic
/// under a fixed seed; gives up on a candidate after a bounded number of
/// rejection rounds rather than looping forever on a crowded map.
pub fn sample_positions(
    rng: &mut ChaCha8Rng,
    tuning: &Tuning,
    count: usize,
    min_separation: f32,
) -> Vec<Vec3> {
    let half_w = tuning.world.width / 2.0;
    let half_h = tuning.world.height / 2.0;
    let mut placed: Vec<Vec3> = Vec::with_capacity(count);
    for _ in 0..count {
        let mut candidate = Vec3::ZERO;
        for _attempt in 0..32 {
            candidate = Vec3::xy(
                rng.gen_range(-half_w..half_w),
                rng.gen_range(-half_h..half_h),
            );
            let clear = placed
                .iter()
                .all(|p| p.distance(candidate) >= min_separation);
            if clear {
                break;
            }
        }
        placed.push(candidate);
    }
    placed
}
