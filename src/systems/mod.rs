//! Gameplay systems, one per concern
//!
//! `priority` is the documented ordering contract: AI chooses direction
//! before movement integrates it, every damage source runs before death
//! resolution, and the engine broadcasts only after the whole tick has
//! resolved.

mod attraction;
mod bot_ai;
mod combat;
mod death;
mod gravity;
mod lifecycle;
mod metabolism;
mod movement;
mod pickup;
mod predation;
mod ranged;
mod swarm_ai;
mod swarm_collision;

pub use attraction::AttractionSystem;
pub use bot_ai::BotAiSystem;
pub use death::DeathSystem;
pub use gravity::GravitySystem;
pub use lifecycle::LifecycleSystem;
pub use metabolism::MetabolismSystem;
pub use movement::MovementSystem;
pub use pickup::PickupSystem;
pub use predation::PredationSystem;
pub use ranged::RangedWeaponSystem;
pub use swarm_ai::SwarmAiSystem;
pub use swarm_collision::SwarmCollisionSystem;

/// Ascending run order for one tick.
pub mod priority {
    pub const BOT_AI: i32 = 10;
    pub const SWARM_AI: i32 = 15;
    pub const GRAVITY: i32 = 20;
    pub const RANGED: i32 = 30;
    pub const PREDATION: i32 = 40;
    pub const SWARM_COLLISION: i32 = 50;
    pub const MOVEMENT: i32 = 60;
    pub const METABOLISM: i32 = 70;
    pub const PICKUP: i32 = 80;
    pub const ATTRACTION: i32 = 90;
    pub const DEATH: i32 = 100;
    pub const LIFECYCLE: i32 = 110;
}
