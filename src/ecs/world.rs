//! World - central ECS container

use std::any::TypeId;
use std::collections::HashMap;

use super::entity::EntityAllocator;
use super::tag::{Tag, TagIndex};
use super::{Component, ComponentStorage, EntityId, TypedComponentStorage};

/// World holds all entities, component stores, the tag index and the
/// bidirectional map between stable external string ids and entity ids.
pub struct World {
    entities: EntityAllocator,
    components: HashMap<TypeId, Box<dyn ComponentStorage>>,
    tags: TagIndex,
    by_external: HashMap<String, EntityId>,
    external_of: HashMap<EntityId, String>,
    serial: u64,
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: EntityAllocator::new(),
            components: HashMap::new(),
            tags: TagIndex::new(),
            by_external: HashMap::new(),
            external_of: HashMap::new(),
            serial: 0,
        }
    }

    /// Monotonic counter for generated external ids; unlike entity ids it
    /// is never reused, so "nut-17" stays unique for the process lifetime.
    pub fn fresh_serial(&mut self) -> u64 {
        self.serial += 1;
        self.serial
    }

    /// Create a new entity
    pub fn create_entity(&mut self) -> EntityId {
        self.entities.allocate()
    }

    /// Destroy an entity: every component, every tag and both id-map
    /// entries go in one step. Callers must not retain the id afterwards.
    pub fn destroy_entity(&mut self, entity: EntityId) {
        if !self.entities.is_alive(entity) {
            return;
        }
        for storage in self.components.values_mut() {
            storage.remove(entity);
        }
        self.tags.remove_all(entity);
        if let Some(external) = self.external_of.remove(&entity) {
            self.by_external.remove(&external);
        }
        self.entities.deallocate(entity);
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.count()
    }

    /// Add a component to an entity
    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) {
        if !self.entities.is_alive(entity) {
            return;
        }
        let storage = self
            .components
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(TypedComponentStorage::<T>::new()));
        if let Some(storage) = storage
            .as_any_mut()
            .downcast_mut::<TypedComponentStorage<T>>()
        {
            storage.insert(entity, component);
        }
    }

    /// Get a component from an entity
    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.storage::<T>()?.get(entity)
    }

    /// Get a mutable component from an entity
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.storage_mut::<T>()?.get_mut(entity)
    }

    /// Remove a single component, returning it if present
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        self.storage_mut::<T>()?.take(entity)
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.storage::<T>()
            .map(|storage| storage.get(entity).is_some())
            .unwrap_or(false)
    }

    /// Get storage for a component type
    pub fn storage<T: Component>(&self) -> Option<&TypedComponentStorage<T>> {
        self.components
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<TypedComponentStorage<T>>()
    }

    /// Get mutable storage for a component type
    pub fn storage_mut<T: Component>(&mut self) -> Option<&mut TypedComponentStorage<T>> {
        self.components
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<TypedComponentStorage<T>>()
    }

    /// Entity ids holding component `T`, ascending
    pub fn ids_with<T: Component>(&self) -> Vec<EntityId> {
        self.storage::<T>().map(|s| s.ids()).unwrap_or_default()
    }

    // Tags

    pub fn tag(&mut self, entity: EntityId, tag: Tag) {
        if self.entities.is_alive(entity) {
            self.tags.add(entity, tag);
        }
    }

    pub fn untag(&mut self, entity: EntityId, tag: Tag) {
        self.tags.remove(entity, tag);
    }

    pub fn has_tag(&self, entity: EntityId, tag: Tag) -> bool {
        self.tags.has(entity, tag)
    }

    /// All entities carrying `tag`, ascending
    pub fn with_tag(&self, tag: Tag) -> Vec<EntityId> {
        self.tags.entities_with(tag)
    }

    pub fn tag_count(&self, tag: Tag) -> usize {
        self.tags.count(tag)
    }

    /// Compound helper used by nearly every system: all Player-tagged
    /// entities in deterministic ascending order.
    pub fn players(&self) -> Vec<EntityId> {
        self.tags.entities_with(Tag::Player)
    }

    /// Clear the transient per-tick tags; called by the engine at tick start.
    pub fn clear_transient_tags(&mut self) {
        for tag in Tag::TRANSIENT {
            self.tags.clear_tag(*tag);
        }
    }

    // External string-id duality

    /// Bind a stable external string id to an entity. A string id maps to
    /// at most one live entity; rebinding an in-use id is rejected.
    pub fn bind_external_id(&mut self, entity: EntityId, external: impl Into<String>) -> bool {
        let external = external.into();
        if !self.entities.is_alive(entity) || self.by_external.contains_key(&external) {
            return false;
        }
        self.by_external.insert(external.clone(), entity);
        self.external_of.insert(entity, external);
        true
    }

    pub fn entity_by_external(&self, external: &str) -> Option<EntityId> {
        self.by_external.get(external).copied()
    }

    pub fn external_id_of(&self, entity: EntityId) -> Option<&str> {
        self.external_of.get(&entity).map(String::as_str)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Health {
        hp: f32,
    }
    impl Component for Health {}

    #[derive(Debug, PartialEq)]
    struct Speed {
        v: f32,
    }
    impl Component for Speed {}

    #[test]
    fn test_world_entity_lifecycle() {
        let mut world = World::new();

        let e1 = world.create_entity();
        let e2 = world.create_entity();

        assert!(world.is_alive(e1));
        assert!(world.is_alive(e2));
        assert_eq!(world.entity_count(), 2);

        world.destroy_entity(e1);
        assert!(!world.is_alive(e1));
        assert!(world.is_alive(e2));
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn test_world_components() {
        let mut world = World::new();

        let entity = world.create_entity();
        world.add_component(entity, Health { hp: 10.0 });
        world.add_component(entity, Speed { v: 2.0 });

        assert!(world.has_component::<Health>(entity));
        assert!(world.has_component::<Speed>(entity));

        if let Some(speed) = world.get_component_mut::<Speed>(entity) {
            speed.v = 3.0;
        }
        assert_eq!(world.get_component::<Speed>(entity).unwrap().v, 3.0);
    }

    #[test]
    fn test_destroy_sweeps_components_and_tags() {
        let mut world = World::new();

        let entity = world.create_entity();
        world.add_component(entity, Health { hp: 10.0 });
        world.tag(entity, Tag::Player);
        world.tag(entity, Tag::Slowed);

        world.destroy_entity(entity);
        assert!(!world.has_component::<Health>(entity));
        assert!(!world.has_tag(entity, Tag::Player));
        assert_eq!(world.players().len(), 0);

        // The reused slot hands out a fresh handle with nothing on it
        let recycled = world.create_entity();
        assert_ne!(recycled, entity);
        assert!(!world.has_component::<Health>(recycled));
    }

    /// A handle held across a destroy must not resolve to the slot's
    /// next occupant through any lookup path.
    #[test]
    fn test_stale_handle_never_resolves_to_new_occupant() {
        let mut world = World::new();

        let old = world.create_entity();
        world.add_component(old, Health { hp: 10.0 });
        assert!(world.bind_external_id(old, "ghost"));
        world.destroy_entity(old);

        let fresh = world.create_entity();
        world.add_component(fresh, Health { hp: 3.0 });
        assert!(world.bind_external_id(fresh, "newcomer"));

        assert!(!world.is_alive(old));
        assert!(world.get_component::<Health>(old).is_none());
        assert_eq!(world.external_id_of(old), None);
        assert_eq!(world.entity_by_external("ghost"), None);

        assert!(world.is_alive(fresh));
        assert_eq!(world.external_id_of(fresh), Some("newcomer"));
    }

    #[test]
    fn test_external_id_round_trip() {
        let mut world = World::new();

        let entity = world.create_entity();
        assert!(world.bind_external_id(entity, "p-42"));
        assert_eq!(world.entity_by_external("p-42"), Some(entity));
        assert_eq!(world.external_id_of(entity), Some("p-42"));

        // Duplicate binding is rejected
        let other = world.create_entity();
        assert!(!world.bind_external_id(other, "p-42"));

        world.destroy_entity(entity);
        assert_eq!(world.entity_by_external("p-42"), None);
        assert_eq!(world.external_id_of(entity), None);
    }
}
