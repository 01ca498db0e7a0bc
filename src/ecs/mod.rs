//! Entity Component System (ECS) implementation
//!
//! Typed sparse stores keyed by a numeric entity id, a tag index for
//! set-membership queries, and a string-id lookup owned by the World.

pub mod component;
pub mod entity;
pub mod tag;
pub mod world;

pub use component::{Component, ComponentStorage, TypedComponentStorage};
pub use entity::{EntityAllocator, EntityId};
pub use tag::{Tag, TagIndex};
pub use world::World;
