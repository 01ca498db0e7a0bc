//! Typed component storage behind a type-erased sweep interface

use std::any::Any;
use std::collections::HashMap;

use super::EntityId;

/// Trait for components - plain data, no behavior
pub trait Component: Send + Sync + 'static {}

/// Type-erased view over a storage, used by the World to sweep every
/// store when an entity is destroyed without knowing the component type.
pub trait ComponentStorage: Send + Sync {
    fn remove(&mut self, entity_id: EntityId);
    fn has(&self, entity_id: EntityId) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Concrete storage for a specific component type
pub struct TypedComponentStorage<T: Component> {
    data: HashMap<EntityId, T>,
}

impl<T: Component> TypedComponentStorage<T> {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn insert(&mut self, entity_id: EntityId, component: T) {
        self.data.insert(entity_id, component);
    }

    pub fn get(&self, entity_id: EntityId) -> Option<&T> {
        self.data.get(&entity_id)
    }

    pub fn get_mut(&mut self, entity_id: EntityId) -> Option<&mut T> {
        self.data.get_mut(&entity_id)
    }

    pub fn take(&mut self, entity_id: EntityId) -> Option<T> {
        self.data.remove(&entity_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.data.iter().map(|(id, comp)| (*id, comp))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.data.iter_mut().map(|(id, comp)| (*id, comp))
    }

    /// Entity ids holding this component, ascending.
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.data.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl<T: Component> Default for TypedComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ComponentStorage for TypedComponentStorage<T> {
    fn remove(&mut self, entity_id: EntityId) {
        self.data.remove(&entity_id);
    }

    fn has(&self, entity_id: EntityId) -> bool {
        self.data.contains_key(&entity_id)
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
