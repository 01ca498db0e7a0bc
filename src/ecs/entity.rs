//! Entity allocation

use std::collections::BTreeSet;

/// Entity handle: slot index in the low 32 bits, slot generation in the
/// high 32. Reusing a slot bumps its generation, so a handle retained
/// across a destroy never matches the slot's next occupant and every
/// liveness or component lookup through it comes back empty.
pub type EntityId = u64;

const INDEX_BITS: u32 = 32;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

fn compose(index: u32, generation: u32) -> EntityId {
    (u64::from(generation) << INDEX_BITS) | u64::from(index)
}

/// Slot index of a handle, shared between all generations of the slot.
pub fn entity_index(id: EntityId) -> u32 {
    (id & INDEX_MASK) as u32
}

/// Generation of a handle; stale handles differ from live ones here.
pub fn entity_generation(id: EntityId) -> u32 {
    (id >> INDEX_BITS) as u32
}

/// Entity allocator with generational free-list reuse
pub struct EntityAllocator {
    generations: Vec<u32>,
    free_list: Vec<u32>,
    alive: BTreeSet<EntityId>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            free_list: Vec::new(),
            alive: BTreeSet::new(),
        }
    }

    pub fn allocate(&mut self) -> EntityId {
        let index = match self.free_list.pop() {
            Some(index) => index,
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                index
            }
        };
        let id = compose(index, self.generations[index as usize]);
        self.alive.insert(id);
        id
    }

    pub fn deallocate(&mut self, id: EntityId) {
        if self.alive.remove(&id) {
            let index = entity_index(id);
            self.generations[index as usize] = self.generations[index as usize].wrapping_add(1);
            self.free_list.push(index);
        }
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.contains(&id)
    }

    pub fn count(&self) -> usize {
        self.alive.len()
    }

    /// All live ids in ascending order; systems iterate this for
    /// deterministic update order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive.iter().copied()
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_allocation() {
        let mut allocator = EntityAllocator::new();

        let e1 = allocator.allocate();
        assert_eq!(entity_index(e1), 0);
        assert_eq!(entity_generation(e1), 0);
        assert!(allocator.is_alive(e1));

        let e2 = allocator.allocate();
        assert_eq!(entity_index(e2), 1);
        assert!(allocator.is_alive(e2));

        assert_eq!(allocator.count(), 2);
    }

    #[test]
    fn test_entity_deallocation() {
        let mut allocator = EntityAllocator::new();

        let e1 = allocator.allocate();
        let e2 = allocator.allocate();

        allocator.deallocate(e1);
        assert!(!allocator.is_alive(e1));
        assert!(allocator.is_alive(e2));
        assert_eq!(allocator.count(), 1);

        // The slot is reused but the handle is fresh
        let e3 = allocator.allocate();
        assert_eq!(entity_index(e3), entity_index(e1));
        assert_ne!(e3, e1);
    }

    #[test]
    fn test_stale_handle_stays_dead_after_slot_reuse() {
        let mut allocator = EntityAllocator::new();

        let old = allocator.allocate();
        allocator.deallocate(old);
        let fresh = allocator.allocate();

        assert_eq!(entity_generation(fresh), entity_generation(old) + 1);
        assert!(allocator.is_alive(fresh));
        assert!(!allocator.is_alive(old));
    }

    #[test]
    fn test_iter_is_sorted() {
        let mut allocator = EntityAllocator::new();
        let ids: Vec<_> = (0..5).map(|_| allocator.allocate()).collect();
        allocator.deallocate(ids[2]);
        let live: Vec<_> = allocator.iter().collect();
        assert_eq!(live, vec![ids[0], ids[1], ids[3], ids[4]]);
    }
}
