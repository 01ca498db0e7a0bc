//! Tuning configuration
//!
//! Every balance parameter (drain rates, gravity scaling, friction, the
//! per-stage tables) is configuration, not code. Loaded from YAML with
//! full defaults so the server runs without a file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stage::Stage;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Root tuning document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub world: WorldTuning,
    pub movement: MovementTuning,
    pub gravity: GravityTuning,
    pub metabolism: MetabolismTuning,
    pub predation: PredationTuning,
    pub swarm: SwarmTuning,
    pub pickup: PickupTuning,
    pub attraction: AttractionTuning,
    pub weapons: WeaponTuning,
    pub lifecycle: LifecycleTuning,
    pub bots: BotTuning,
    pub stages: [StageTuning; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    pub width: f32,
    pub height: f32,
    /// Radius of the spherical boundary the advanced stages live on.
    pub sphere_radius: f32,
    pub nutrient_count: usize,
    pub obstacle_count: usize,
    pub swarm_count: usize,
    /// Minimum separation for the placement sampler.
    pub min_separation: f32,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            width: 4000.0,
            height: 4000.0,
            sphere_radius: 1600.0,
            nutrient_count: 120,
            obstacle_count: 8,
            swarm_count: 24,
            min_separation: 180.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementTuning {
    /// Exponential friction base: v *= friction^dt.
    pub friction: f32,
    /// Energy deducted per unit of distance moved.
    pub energy_cost_per_unit: f32,
    pub sprint_multiplier: f32,
    pub slowed_multiplier: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            friction: 0.25,
            energy_cost_per_unit: 0.005,
            sprint_multiplier: 1.6,
            slowed_multiplier: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityTuning {
    /// Swarm units feel obstacle gravity at this fraction.
    pub swarm_susceptibility: f32,
    /// Defaults stamped onto obstacles at spawn time.
    pub obstacle_radius: f32,
    pub obstacle_core_radius: f32,
    pub obstacle_influence_radius: f32,
    pub obstacle_strength: f32,
}

impl Default for GravityTuning {
    fn default() -> Self {
        Self {
            swarm_susceptibility: 0.35,
            obstacle_radius: 90.0,
            obstacle_core_radius: 60.0,
            obstacle_influence_radius: 700.0,
            obstacle_strength: 2.4e6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetabolismTuning {
    pub decay_per_sec: f32,
}

impl Default for MetabolismTuning {
    fn default() -> Self {
        Self { decay_per_sec: 0.6 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredationTuning {
    /// Energy transferred per second of unbroken contact.
    pub drain_rate: f32,
    /// One-time max-energy bonus as a fraction of the victim's max,
    /// indexed by the victim's stage.
    pub kill_bonus_pct: [f32; 4],
}

impl Default for PredationTuning {
    fn default() -> Self {
        Self {
            drain_rate: 50.0,
            kill_bonus_pct: [0.30, 0.45, 0.60, 0.75],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmTuning {
    pub radius: f32,
    pub max_energy: f32,
    pub contact_damage_per_sec: f32,
    pub detection_radius: f32,
    pub patrol_speed: f32,
    pub chase_speed: f32,
    pub accel: f32,
    /// Energy reward for consuming a disabled unit.
    pub consume_reward: f32,
    pub consume_range: f32,
    pub consume_cooldown_secs: f64,
}

impl Default for SwarmTuning {
    fn default() -> Self {
        Self {
            radius: 14.0,
            max_energy: 40.0,
            contact_damage_per_sec: 20.0,
            detection_radius: 260.0,
            patrol_speed: 40.0,
            chase_speed: 110.0,
            accel: 520.0,
            consume_reward: 25.0,
            consume_range: 30.0,
            consume_cooldown_secs: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupTuning {
    pub nutrient_value: f32,
    pub nutrient_radius: f32,
}

impl Default for PickupTuning {
    fn default() -> Self {
        Self {
            nutrient_value: 12.0,
            nutrient_radius: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttractionTuning {
    /// Nutrients drift toward nearby players above SingleCell.
    pub radius: f32,
    pub strength: f32,
}

impl Default for AttractionTuning {
    fn default() -> Self {
        Self {
            radius: 120.0,
            strength: 45.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponTuning {
    pub projectile: ProjectileTuning,
    pub hitscan: HitscanTuning,
    pub area: AreaTuning,
}

impl Default for WeaponTuning {
    fn default() -> Self {
        Self {
            projectile: ProjectileTuning::default(),
            hitscan: HitscanTuning::default(),
            area: AreaTuning::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    pub speed: f32,
    pub max_distance: f32,
    pub damage: f32,
    pub radius: f32,
    pub energy_cost: f32,
    pub cooldown_secs: f64,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 1000.0,
            max_distance: 500.0,
            damage: 18.0,
            radius: 5.0,
            energy_cost: 6.0,
            cooldown_secs: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HitscanTuning {
    pub range: f32,
    pub damage: f32,
    pub energy_cost: f32,
    pub cooldown_secs: f64,
    /// Lifetime of the visual-only beam entity.
    pub beam_ttl_secs: f64,
}

impl Default for HitscanTuning {
    fn default() -> Self {
        Self {
            range: 600.0,
            damage: 26.0,
            energy_cost: 10.0,
            cooldown_secs: 1.4,
            beam_ttl_secs: 0.12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaTuning {
    pub radius: f32,
    pub damage: f32,
    pub energy_cost: f32,
    pub cooldown_secs: f64,
    pub max_range: f32,
}

impl Default for AreaTuning {
    fn default() -> Self {
        Self {
            radius: 90.0,
            damage: 22.0,
            energy_cost: 16.0,
            cooldown_secs: 2.2,
            max_range: 450.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleTuning {
    /// Window the Hunter weapon choice stays open before auto-resolve.
    pub choice_window_secs: f64,
    /// Brief lock after evolving during which the player cannot act.
    pub evolving_lock_secs: f64,
}

impl Default for LifecycleTuning {
    fn default() -> Self {
        Self {
            choice_window_secs: 8.0,
            evolving_lock_secs: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotTuning {
    pub count: usize,
    /// Avoidance magnitude above which it fully overrides seeking.
    pub avoid_override_threshold: f32,
    pub obstacle_avoid_margin: f32,
    pub swarm_avoid_radius: f32,
    /// Seconds ahead used to predict a swarm unit's position.
    pub swarm_lookahead_secs: f32,
}

impl Default for BotTuning {
    fn default() -> Self {
        Self {
            count: 12,
            avoid_override_threshold: 0.6,
            obstacle_avoid_margin: 220.0,
            swarm_avoid_radius: 160.0,
            swarm_lookahead_secs: 0.5,
        }
    }
}

/// Per-stage tuning row; indexed by `Stage::index()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTuning {
    pub max_energy: f32,
    pub max_speed: f32,
    pub accel: f32,
    pub radius: f32,
    /// Energy required before evolving out of this stage.
    pub evolve_at: f32,
    pub bot_respawn_delay_secs: f64,
}

impl Default for StageTuning {
    fn default() -> Self {
        Self {
            max_energy: 100.0,
            max_speed: 220.0,
            accel: 900.0,
            radius: 12.0,
            evolve_at: 90.0,
            bot_respawn_delay_secs: 3.0,
        }
    }
}

fn default_stage_table() -> [StageTuning; 4] {
    [
        StageTuning {
            max_energy: 100.0,
            max_speed: 220.0,
            accel: 900.0,
            radius: 12.0,
            evolve_at: 90.0,
            bot_respawn_delay_secs: 3.0,
        },
        StageTuning {
            max_energy: 400.0,
            max_speed: 190.0,
            accel: 750.0,
            radius: 22.0,
            evolve_at: 360.0,
            bot_respawn_delay_secs: 5.0,
        },
        StageTuning {
            max_energy: 900.0,
            max_speed: 165.0,
            accel: 650.0,
            radius: 36.0,
            evolve_at: 820.0,
            bot_respawn_delay_secs: 8.0,
        },
        StageTuning {
            max_energy: 2000.0,
            max_speed: 140.0,
            accel: 550.0,
            radius: 58.0,
            evolve_at: f32::INFINITY,
            bot_respawn_delay_secs: 12.0,
        },
    ]
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            world: WorldTuning::default(),
            movement: MovementTuning::default(),
            gravity: GravityTuning::default(),
            metabolism: MetabolismTuning::default(),
            predation: PredationTuning::default(),
            swarm: SwarmTuning::default(),
            pickup: PickupTuning::default(),
            attraction: AttractionTuning::default(),
            weapons: WeaponTuning::default(),
            lifecycle: LifecycleTuning::default(),
            bots: BotTuning::default(),
            stages: default_stage_table(),
        }
    }
}

impl Tuning {
    /// Load tuning from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let tuning: Tuning = serde_yaml::from_str(&contents)?;
        Ok(tuning)
    }

    /// Save tuning to a YAML file
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn stage(&self, stage: Stage) -> &StageTuning {
        &self.stages[stage.index()]
    }
}
