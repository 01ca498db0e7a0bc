//! Zero-payload tags and the tag index

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::EntityId;

/// A zero-payload marker enabling fast set-membership queries.
///
/// `Slowed` is transient by convention and cleared at tick start; the
/// ability tags are rewritten atomically on every stage transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tag {
    Player,
    Bot,
    Nutrient,
    Obstacle,
    Swarm,
    Projectile,
    Beam,
    Slowed,
    CanSprint,
    CanFire,
    CanConsumeSwarm,
}

impl Tag {
    /// Tags cleared at the start of every tick.
    pub const TRANSIENT: &'static [Tag] = &[Tag::Slowed];
}

/// Index from tag to the set of entities carrying it
#[derive(Default)]
pub struct TagIndex {
    by_tag: HashMap<Tag, BTreeSet<EntityId>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entity: EntityId, tag: Tag) {
        self.by_tag.entry(tag).or_default().insert(entity);
    }

    pub fn remove(&mut self, entity: EntityId, tag: Tag) {
        if let Some(set) = self.by_tag.get_mut(&tag) {
            set.remove(&entity);
        }
    }

    pub fn has(&self, entity: EntityId, tag: Tag) -> bool {
        self.by_tag
            .get(&tag)
            .map(|set| set.contains(&entity))
            .unwrap_or(false)
    }

    /// All entities carrying `tag`, ascending.
    pub fn entities_with(&self, tag: Tag) -> Vec<EntityId> {
        self.by_tag
            .get(&tag)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, tag: Tag) -> usize {
        self.by_tag.get(&tag).map(|set| set.len()).unwrap_or(0)
    }

    /// Remove every tag held by `entity` (entity destruction path).
    pub fn remove_all(&mut self, entity: EntityId) {
        for set in self.by_tag.values_mut() {
            set.remove(&entity);
        }
    }

    /// Clear a tag from every entity (transient tags at tick start).
    pub fn clear_tag(&mut self, tag: Tag) {
        if let Some(set) = self.by_tag.get_mut(&tag) {
            set.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_membership() {
        let mut index = TagIndex::new();

        index.add(1, Tag::Player);
        index.add(2, Tag::Player);
        index.add(2, Tag::Bot);

        assert!(index.has(1, Tag::Player));
        assert!(index.has(2, Tag::Bot));
        assert!(!index.has(1, Tag::Bot));
        assert_eq!(index.entities_with(Tag::Player), vec![1, 2]);
        assert_eq!(index.count(Tag::Player), 2);
    }

    #[test]
    fn test_remove_all() {
        let mut index = TagIndex::new();
        index.add(3, Tag::Player);
        index.add(3, Tag::Slowed);

        index.remove_all(3);
        assert!(!index.has(3, Tag::Player));
        assert!(!index.has(3, Tag::Slowed));
    }

    #[test]
    fn test_clear_transient() {
        let mut index = TagIndex::new();
        index.add(1, Tag::Slowed);
        index.add(2, Tag::Slowed);
        index.add(1, Tag::Player);

        index.clear_tag(Tag::Slowed);
        assert_eq!(index.count(Tag::Slowed), 0);
        assert!(index.has(1, Tag::Player));
    }
}
