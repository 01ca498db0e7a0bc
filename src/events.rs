//! Outbound events and the full-state view for the client handshake
//!
//! Events use the stable external string ids; the integer entity handles
//! never cross the network boundary.

use serde::Serialize;

use crate::components::{Energy, Nutrient, Obstacle, Position, StageState, SwarmUnit};
use crate::ecs::{Tag, World};
use crate::spatial::Vec3;
use crate::stage::{Stage, WeaponKind};

/// One granular per-change event broadcast at tick end.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    Joined {
        id: String,
        stage: Stage,
        position: Vec3,
    },
    Left {
        id: String,
    },
    Moved {
        id: String,
        position: Vec3,
        energy: f32,
    },
    NutrientSpawned {
        id: String,
        position: Vec3,
    },
    NutrientCollected {
        id: String,
        by: String,
    },
    Hit {
        target: String,
        attacker: Option<String>,
        amount: f32,
        source: &'static str,
    },
    Died {
        id: String,
        source: &'static str,
        killer: Option<String>,
    },
    Respawned {
        id: String,
        stage: Stage,
        position: Vec3,
    },
    Evolved {
        id: String,
        stage: Stage,
    },
    WeaponChoiceOpened {
        id: String,
        deadline: f64,
    },
    WeaponChosen {
        id: String,
        weapon: WeaponKind,
        auto_resolved: bool,
    },
    AbilityFired {
        id: String,
        weapon: WeaponKind,
        target: Option<Vec3>,
    },
    SwarmConsumed {
        id: String,
        by: String,
    },
}

impl GameEvent {
    /// External id of an entity, or a placeholder that should never leak
    /// (every factory-created entity is bound at spawn).
    pub fn external(world: &World, entity: crate::ecs::EntityId) -> String {
        world
            .external_id_of(entity)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("e-{entity}"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub id: String,
    pub position: Vec3,
    pub stage: Stage,
    pub weapon: Option<WeaponKind>,
    pub energy: f32,
    pub max_energy: f32,
    pub is_bot: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NutrientView {
    pub id: String,
    pub position: Vec3,
    pub value: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObstacleView {
    pub id: String,
    pub position: Vec3,
    pub radius: f32,
    pub core_radius: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwarmView {
    pub id: String,
    pub position: Vec3,
    pub energy: f32,
}

/// Full snapshot delivered on join and from `/api/state`.
#[derive(Debug, Clone, Serialize)]
pub struct WorldView {
    pub tick: u64,
    pub players: Vec<PlayerView>,
    pub nutrients: Vec<NutrientView>,
    pub obstacles: Vec<ObstacleView>,
    pub swarms: Vec<SwarmView>,
}

impl WorldView {
    pub fn capture(world: &World, tick: u64) -> Self {
        let mut players = Vec::new();
        for id in world.players() {
            let (Some(pos), Some(energy), Some(stage)) = (
                world.get_component::<Position>(id),
                world.get_component::<Energy>(id),
                world.get_component::<StageState>(id),
            ) else {
                continue;
            };
            players.push(PlayerView {
                id: GameEvent::external(world, id),
                position: pos.0,
                stage: stage.stage,
                weapon: stage.weapon,
                energy: energy.current,
                max_energy: energy.max,
                is_bot: world.has_tag(id, Tag::Bot),
            });
        }

        let mut nutrients = Vec::new();
        for id in world.with_tag(Tag::Nutrient) {
            let (Some(pos), Some(nutrient)) = (
                world.get_component::<Position>(id),
                world.get_component::<Nutrient>(id),
            ) else {
                continue;
            };
            nutrients.push(NutrientView {
                id: GameEvent::external(world, id),
                position: pos.0,
                value: nutrient.value,
            });
        }

        let mut obstacles = Vec::new();
        for id in world.with_tag(Tag::Obstacle) {
            let (Some(pos), Some(obstacle)) = (
                world.get_component::<Position>(id),
                world.get_component::<Obstacle>(id),
            ) else {
                continue;
            };
            obstacles.push(ObstacleView {
                id: GameEvent::external(world, id),
                position: pos.0,
                radius: obstacle.radius,
                core_radius: obstacle.core_radius,
            });
        }

        let mut swarms = Vec::new();
        for id in world.with_tag(Tag::Swarm) {
            let (Some(pos), Some(_unit), Some(energy)) = (
                world.get_component::<Position>(id),
                world.get_component::<SwarmUnit>(id),
                world.get_component::<Energy>(id),
            ) else {
                continue;
            };
            swarms.push(SwarmView {
                id: GameEvent::external(world, id),
                position: pos.0,
                energy: energy.current,
            });
        }

        Self {
            tick,
            players,
            nutrients,
            obstacles,
            swarms,
        }
    }
}
