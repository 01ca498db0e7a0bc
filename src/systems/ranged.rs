//! Ranged weapons - projectile, hitscan and area-strike resolution
//!
//! All three modes share the same gate (ability tag, weapon chosen, not
//! evolving, not stunned, cooldown, energy cost); a failed gate simply
//! does not fire. Kill credit flows through DamageTracking like every
//! other damage source.

use anyhow::Result;

use crate::components::{
    AbilityIntent, AbilityKind, Cooldowns, DamageSource, Energy, InputIntent, Position, Projectile,
    StageState, Stunned, SwarmUnit, Velocity,
};
use crate::ecs::{EntityId, Tag, World};
use crate::events::GameEvent;
use crate::factory;
use crate::rng::RngManager;
use crate::scheduler::{System, TickContext};
use crate::spatial::{circles_overlap, ray_circle_hit, Vec3};
use crate::stage::WeaponKind;
use crate::systems::{combat, priority};

pub struct RangedWeaponSystem;

impl RangedWeaponSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RangedWeaponSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
struct Target {
    id: EntityId,
    pos: Vec3,
    radius: f32,
}

/// Players first, then swarm fauna - the documented hit-test order.
fn eligible_targets(ctx: &TickContext<'_>, world: &World, exclude: EntityId) -> Vec<Target> {
    let mut targets = Vec::new();
    for id in world.players() {
        if id == exclude {
            continue;
        }
        let alive = world
            .get_component::<Energy>(id)
            .map(|e| !e.is_depleted())
            .unwrap_or(false);
        if !alive {
            continue;
        }
        let (Some(pos), Some(stage)) = (
            world.get_component::<Position>(id),
            world.get_component::<StageState>(id),
        ) else {
            continue;
        };
        targets.push(Target {
            id,
            pos: pos.0,
            radius: ctx.tuning.stage(stage.stage).radius,
        });
    }
    for id in world.with_tag(Tag::Swarm) {
        let alive = world
            .get_component::<Energy>(id)
            .map(|e| !e.is_depleted())
            .unwrap_or(false);
        if !alive || world.get_component::<SwarmUnit>(id).is_none() {
            continue;
        }
        let Some(pos) = world.get_component::<Position>(id) else {
            continue;
        };
        targets.push(Target {
            id,
            pos: pos.0,
            radius: ctx.tuning.swarm.radius,
        });
    }
    targets
}

impl RangedWeaponSystem {
    /// Shared gate; returns the weapon and firing position when every
    /// check passes, `None` otherwise with no state change.
    fn gate(
        &self,
        ctx: &TickContext<'_>,
        world: &World,
        shooter: EntityId,
    ) -> Option<(WeaponKind, Vec3)> {
        if !world.has_tag(shooter, Tag::CanFire) {
            return None;
        }
        let stage_state = world.get_component::<StageState>(shooter)?;
        let weapon = stage_state.weapon?;
        if stage_state.is_evolving(ctx.now) {
            return None;
        }
        if let Some(stunned) = world.get_component::<Stunned>(shooter) {
            if ctx.now < stunned.until {
                return None;
            }
        }
        let energy = world.get_component::<Energy>(shooter)?;
        if energy.is_depleted() {
            return None;
        }
        let (cost, cooldown) = match weapon {
            WeaponKind::Pseudopod => (
                ctx.tuning.weapons.projectile.energy_cost,
                ctx.tuning.weapons.projectile.cooldown_secs,
            ),
            WeaponKind::Lance => (
                ctx.tuning.weapons.hitscan.energy_cost,
                ctx.tuning.weapons.hitscan.cooldown_secs,
            ),
            WeaponKind::Rupture => (
                ctx.tuning.weapons.area.energy_cost,
                ctx.tuning.weapons.area.cooldown_secs,
            ),
        };
        if energy.current < cost {
            return None;
        }
        let cooldowns = world.get_component::<Cooldowns>(shooter)?;
        if !cooldowns.ready(AbilityKind::Fire, ctx.now, cooldown) {
            return None;
        }
        let pos = world.get_component::<Position>(shooter)?.0;
        Some((weapon, pos))
    }

    fn aim_direction(world: &World, shooter: EntityId, pos: Vec3, target: Option<Vec3>) -> Vec3 {
        if let Some(target) = target {
            let dir = target.sub(pos).normalized();
            if dir != Vec3::ZERO {
                return dir;
            }
        }
        let input = world
            .get_component::<InputIntent>(shooter)
            .map(|i| i.direction.normalized())
            .unwrap_or(Vec3::ZERO);
        if input != Vec3::ZERO {
            return input;
        }
        let vel = world
            .get_component::<Velocity>(shooter)
            .map(|v| v.0.normalized())
            .unwrap_or(Vec3::ZERO);
        if vel != Vec3::ZERO {
            vel
        } else {
            Vec3::new(1.0, 0.0, 0.0)
        }
    }

    fn fire(
        &self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        shooter: EntityId,
        weapon: WeaponKind,
        pos: Vec3,
        target: Option<Vec3>,
    ) {
        let cost = match weapon {
            WeaponKind::Pseudopod => ctx.tuning.weapons.projectile.energy_cost,
            WeaponKind::Lance => ctx.tuning.weapons.hitscan.energy_cost,
            WeaponKind::Rupture => ctx.tuning.weapons.area.energy_cost,
        };
        if let Some(energy) = world.get_component_mut::<Energy>(shooter) {
            energy.drain(cost);
        }
        if let Some(cooldowns) = world.get_component_mut::<Cooldowns>(shooter) {
            cooldowns.mark(AbilityKind::Fire, ctx.now);
        }

        match weapon {
            WeaponKind::Pseudopod => {
                let dir = Self::aim_direction(world, shooter, pos, target);
                let muzzle = pos.add(dir.scale(ctx.tuning.weapons.projectile.radius + 1.0));
                factory::spawn_projectile(
                    world,
                    shooter,
                    muzzle,
                    dir,
                    &ctx.tuning.weapons.projectile,
                );
            }
            WeaponKind::Lance => {
                let dir = Self::aim_direction(world, shooter, pos, target);
                let range = ctx.tuning.weapons.hitscan.range;
                let damage = ctx.tuning.weapons.hitscan.damage;
                let expires_at = ctx.now + ctx.tuning.weapons.hitscan.beam_ttl_secs;
                let mut closest: Option<(f32, EntityId)> = None;
                for candidate in eligible_targets(ctx, world, shooter) {
                    if let Some(distance) =
                        ray_circle_hit(pos, dir, candidate.pos, candidate.radius)
                    {
                        if distance <= range
                            && closest.map(|(d, _)| distance < d).unwrap_or(true)
                        {
                            closest = Some((distance, candidate.id));
                        }
                    }
                }
                let beam_end = match closest {
                    Some((distance, victim)) => {
                        combat::apply_damage(
                            ctx,
                            world,
                            victim,
                            damage,
                            DamageSource::Weapon(WeaponKind::Lance),
                            Some(shooter),
                        );
                        pos.add(dir.scale(distance))
                    }
                    None => pos.add(dir.scale(range)),
                };
                factory::spawn_beam(world, beam_end, expires_at);
            }
            WeaponKind::Rupture => {
                let radius = ctx.tuning.weapons.area.radius;
                let damage = ctx.tuning.weapons.area.damage;
                let max_range = ctx.tuning.weapons.area.max_range;
                let center = match target {
                    Some(point) => {
                        let offset = point.sub(pos).clamp_length(max_range);
                        pos.add(offset)
                    }
                    None => pos,
                };
                let mut absorbed = 0.0;
                for candidate in eligible_targets(ctx, world, shooter) {
                    if circles_overlap(center, radius, candidate.pos, candidate.radius) {
                        absorbed += combat::apply_damage(
                            ctx,
                            world,
                            candidate.id,
                            damage,
                            DamageSource::Weapon(WeaponKind::Rupture),
                            Some(shooter),
                        );
                    }
                }
                // Summed damage comes back to the caster as absorbed energy
                if absorbed > 0.0 {
                    if let Some(energy) = world.get_component_mut::<Energy>(shooter) {
                        energy.gain(absorbed);
                    }
                }
            }
        }

        ctx.emit(GameEvent::AbilityFired {
            id: GameEvent::external(world, shooter),
            weapon,
            target,
        });
    }

    fn process_intents(&self, ctx: &mut TickContext<'_>, world: &mut World) {
        for shooter in world.ids_with::<AbilityIntent>() {
            let Some(intent) = world.remove_component::<AbilityIntent>(shooter) else {
                continue;
            };
            // Rejected activations simply do not fire; the client infers
            // failure from the missing event.
            let Some((weapon, pos)) = self.gate(ctx, world, shooter) else {
                continue;
            };
            self.fire(ctx, world, shooter, weapon, pos, intent.target);
        }
    }

    /// Moves only projectiles spawned on earlier ticks, so a round
    /// lives exactly `max_distance / speed` seconds from its spawn.
    fn advance_projectiles(&self, ctx: &mut TickContext<'_>, world: &mut World, ids: &[EntityId]) {
        let dt = ctx.dt_f32();
        let projectile_radius = ctx.tuning.weapons.projectile.radius;

        for &id in ids {
            let Some(projectile) = world.get_component::<Projectile>(id) else {
                continue;
            };
            let owner = projectile.owner;
            let heading = projectile.heading;
            let speed = projectile.speed;
            let max_distance = projectile.max_distance;
            let traveled_before = projectile.traveled;
            let damage = projectile.damage;

            let step = (speed * dt).min(max_distance - traveled_before).max(0.0);
            let Some(position) = world.get_component::<Position>(id) else {
                continue;
            };
            let pos = position.0.add(heading.scale(step));
            let traveled = traveled_before + step;

            world.add_component(id, Position(pos));
            if let Some(projectile) = world.get_component_mut::<Projectile>(id) {
                projectile.traveled = traveled;
            }

            for candidate in eligible_targets(ctx, world, owner) {
                let seen = world
                    .get_component::<Projectile>(id)
                    .map(|p| p.already_hit.contains(&candidate.id))
                    .unwrap_or(true);
                if seen {
                    continue;
                }
                if !circles_overlap(pos, projectile_radius, candidate.pos, candidate.radius) {
                    continue;
                }
                combat::apply_damage(
                    ctx,
                    world,
                    candidate.id,
                    damage,
                    DamageSource::Weapon(WeaponKind::Pseudopod),
                    Some(owner),
                );
                if let Some(projectile) = world.get_component_mut::<Projectile>(id) {
                    projectile.already_hit.insert(candidate.id);
                }
            }

            if traveled >= max_distance {
                ctx.emit(GameEvent::Left {
                    id: GameEvent::external(world, id),
                });
                world.destroy_entity(id);
            } else {
                ctx.emit(GameEvent::Moved {
                    id: GameEvent::external(world, id),
                    position: pos,
                    energy: 0.0,
                });
            }
        }
    }
}

impl System for RangedWeaponSystem {
    fn name(&self) -> &'static str {
        "ranged_weapons"
    }

    fn priority(&self) -> i32 {
        priority::RANGED
    }

    fn run(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut World,
        _rng: &mut RngManager,
    ) -> Result<()> {
        let in_flight = world.ids_with::<Projectile>();
        self.process_intents(ctx, world);
        self.advance_projectiles(ctx, world, &in_flight);
        Ok(())
    }
}
