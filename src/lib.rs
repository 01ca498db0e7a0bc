pub mod components;
pub mod config;
pub mod ecs;
pub mod engine;
pub mod events;
pub mod factory;
pub mod rng;
pub mod scheduler;
pub mod spatial;
pub mod stage;
pub mod systems;
pub mod web;

pub use config::Tuning;
pub use engine::{Command, Engine, EngineBuilder, EngineSettings};
pub use events::{GameEvent, WorldView};
