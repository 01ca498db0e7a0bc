//! Shared damage application used by every combat system

use crate::components::{DamageSource, DamageTracking, Energy};
use crate::ecs::{EntityId, World};
use crate::events::GameEvent;
use crate::scheduler::TickContext;

/// Apply `amount` of damage to `target`, recording source and attacker
/// for death attribution and emitting a Hit event. Returns the energy
/// actually removed. Entities already at or below zero are left alone so
/// a processed death is never re-recorded.
pub fn apply_damage(
    ctx: &mut TickContext<'_>,
    world: &mut World,
    target: EntityId,
    amount: f32,
    source: DamageSource,
    attacker: Option<EntityId>,
) -> f32 {
    let Some(energy) = world.get_component::<Energy>(target) else {
        return 0.0;
    };
    if energy.current <= 0.0 || amount <= 0.0 {
        return 0.0;
    }

    let target_ext = GameEvent::external(world, target);
    let attacker_ext = attacker.map(|a| GameEvent::external(world, a));

    if let Some(tracking) = world.get_component_mut::<DamageTracking>(target) {
        tracking.record(source, attacker);
    }
    let applied = world
        .get_component_mut::<Energy>(target)
        .map(|energy| energy.drain(amount))
        .unwrap_or(0.0);

    if applied > 0.0 {
        ctx.emit(GameEvent::Hit {
            target: target_ext,
            attacker: attacker_ext,
            amount: applied,
            source: source.label(),
        });
    }
    applied
}

/// Lethal-core variant: forces energy straight to zero regardless of the
/// remaining pool, bypassing any mitigation.
pub fn force_zero(
    ctx: &mut TickContext<'_>,
    world: &mut World,
    target: EntityId,
    source: DamageSource,
) {
    let Some(energy) = world.get_component::<Energy>(target) else {
        return;
    };
    if energy.current <= 0.0 {
        return;
    }
    let remaining = energy.current;
    apply_damage(ctx, world, target, remaining, source, None);
}
