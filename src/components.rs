//! Gameplay components - plain data, no behavior

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::ecs::{Component, EntityId};
use crate::spatial::Vec3;
use crate::stage::{Stage, WeaponKind};

/// Sentinel written into `Energy.current` once a death has been processed;
/// the negative value marks "already consumed" until respawn resets it.
pub const DEATH_SENTINEL: f32 = -1000.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position(pub Vec3);
impl Component for Position {}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Velocity(pub Vec3);
impl Component for Velocity {}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Energy {
    pub current: f32,
    pub max: f32,
}

impl Energy {
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Deduct up to `amount`; returns what was actually deducted.
    /// Floors at zero - depletion is the single "dead" predicate.
    pub fn drain(&mut self, amount: f32) -> f32 {
        let applied = amount.min(self.current.max(0.0));
        self.current -= applied;
        applied
    }

    /// Add energy, clamped to max; returns what was actually absorbed.
    pub fn gain(&mut self, amount: f32) -> f32 {
        let headroom = (self.max - self.current).max(0.0);
        let applied = amount.min(headroom);
        self.current += applied;
        applied
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }
}

impl Component for Energy {}

/// Evolution state. `weapon` is set once the Hunter choice resolves;
/// `choice_deadline` is the auto-resolve deadline of the open window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StageState {
    pub stage: Stage,
    pub weapon: Option<WeaponKind>,
    pub evolving_until: Option<f64>,
    pub choice_deadline: Option<f64>,
}

impl StageState {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            weapon: None,
            evolving_until: None,
            choice_deadline: None,
        }
    }

    pub fn is_evolving(&self, now: f64) -> bool {
        self.evolving_until.map(|until| now < until).unwrap_or(false)
    }
}

impl Component for StageState {}

/// Client/AI movement intent - advisory, consumed by movement next tick.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct InputIntent {
    pub direction: Vec3,
    pub sprint: bool,
}

impl Component for InputIntent {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    Fire,
    ConsumeSwarm,
}

/// Per-ability last-fired timestamps.
#[derive(Debug, Clone, Default)]
pub struct Cooldowns {
    fired_at: HashMap<AbilityKind, f64>,
}

impl Cooldowns {
    pub fn ready(&self, ability: AbilityKind, now: f64, cooldown_secs: f64) -> bool {
        match self.fired_at.get(&ability) {
            Some(last) => now - last >= cooldown_secs,
            None => true,
        }
    }

    pub fn mark(&mut self, ability: AbilityKind, now: f64) {
        self.fired_at.insert(ability, now);
    }
}

impl Component for Cooldowns {}

#[derive(Debug, Clone, Copy)]
pub struct Stunned {
    pub until: f64,
}

impl Component for Stunned {}

/// Where the last damage came from; `last_source` doubles as the
/// "death not yet processed" flag for the death system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageSource {
    Singularity,
    Predation,
    Swarm,
    Weapon(WeaponKind),
    Starvation,
}

impl DamageSource {
    pub fn label(&self) -> &'static str {
        match self {
            DamageSource::Singularity => "singularity",
            DamageSource::Predation => "predation",
            DamageSource::Swarm => "swarm",
            DamageSource::Weapon(WeaponKind::Pseudopod) => "pseudopod",
            DamageSource::Weapon(WeaponKind::Lance) => "lance",
            DamageSource::Weapon(WeaponKind::Rupture) => "rupture",
            DamageSource::Starvation => "starvation",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DamageTracking {
    pub last_source: Option<DamageSource>,
    pub last_attacker: Option<EntityId>,
}

impl DamageTracking {
    pub fn record(&mut self, source: DamageSource, attacker: Option<EntityId>) {
        self.last_source = Some(source);
        if attacker.is_some() {
            self.last_attacker = attacker;
        }
    }
}

impl Component for DamageTracking {}

/// Present on prey iff a predator held contact this tick.
#[derive(Debug, Clone, Copy)]
pub struct DrainTarget {
    pub predator: EntityId,
}

impl Component for DrainTarget {}

/// Deadline for an automatic (bot) respawn.
#[derive(Debug, Clone, Copy)]
pub struct PendingRespawn {
    pub at: f64,
}

impl Component for PendingRespawn {}

/// Natural expiry for temporary entities (beams, short-lived effects).
#[derive(Debug, Clone, Copy)]
pub struct Expiry {
    pub at: f64,
}

impl Component for Expiry {}

/// Queued ability activation from a client or bot, consumed by the
/// ranged-weapon system on the next tick.
#[derive(Debug, Clone, Copy)]
pub struct AbilityIntent {
    pub target: Option<Vec3>,
}

impl Component for AbilityIntent {}

/// Explicit evolution request, mediated by the lifecycle system.
#[derive(Debug, Clone, Copy)]
pub struct EvolveIntent;

impl Component for EvolveIntent {}

/// Weapon pick for an open Hunter choice window.
#[derive(Debug, Clone, Copy)]
pub struct WeaponChoiceIntent(pub WeaponKind);

impl Component for WeaponChoiceIntent {}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Nutrient {
    pub value: f32,
}

impl Component for Nutrient {}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Obstacle {
    pub radius: f32,
    /// Lethal core: anything inside is zeroed on the spot.
    pub core_radius: f32,
    pub influence_radius: f32,
    pub gravity: f32,
}

impl Component for Obstacle {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwarmMode {
    Patrol,
    Chase,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SwarmUnit {
    pub mode: SwarmMode,
    pub home: Vec3,
}

impl Component for SwarmUnit {}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub owner: EntityId,
    pub heading: Vec3,
    pub speed: f32,
    pub max_distance: f32,
    pub traveled: f32,
    pub damage: f32,
    /// Each target is hit at most once per projectile.
    pub already_hit: HashSet<EntityId>,
}

impl Component for Projectile {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_drain_floors_at_zero() {
        let mut energy = Energy::full(10.0);
        assert_eq!(energy.drain(4.0), 4.0);
        assert_eq!(energy.current, 6.0);
        assert_eq!(energy.drain(100.0), 6.0);
        assert_eq!(energy.current, 0.0);
        assert!(energy.is_depleted());
    }

    #[test]
    fn test_energy_gain_clamps_to_max() {
        let mut energy = Energy { current: 95.0, max: 100.0 };
        assert_eq!(energy.gain(10.0), 5.0);
        assert_eq!(energy.current, 100.0);
    }

    #[test]
    fn test_cooldown_gate() {
        let mut cooldowns = Cooldowns::default();
        assert!(cooldowns.ready(AbilityKind::Fire, 0.0, 1.0));

        cooldowns.mark(AbilityKind::Fire, 0.0);
        assert!(!cooldowns.ready(AbilityKind::Fire, 0.5, 1.0));
        assert!(cooldowns.ready(AbilityKind::Fire, 1.0, 1.0));
        // Independent ability slots
        assert!(cooldowns.ready(AbilityKind::ConsumeSwarm, 0.5, 1.0));
    }

    #[test]
    fn test_damage_tracking_keeps_attacker() {
        let mut tracking = DamageTracking::default();
        tracking.record(DamageSource::Predation, Some(9));
        tracking.record(DamageSource::Starvation, None);
        assert_eq!(tracking.last_source, Some(DamageSource::Starvation));
        assert_eq!(tracking.last_attacker, Some(9));
    }
}
