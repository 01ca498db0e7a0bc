//! Evolution stages and weapon modes
//!
//! Stage gates size, speed, energy pool, boundary shape and the ability
//! tag set. The numeric tuning per stage lives in config, not here.

use serde::{Deserialize, Serialize};

use crate::ecs::Tag;

/// Discrete evolutionary tier of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SingleCell,
    MultiCell,
    Hunter,
    Leviathan,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::SingleCell,
        Stage::MultiCell,
        Stage::Hunter,
        Stage::Leviathan,
    ];

    pub fn index(self) -> usize {
        match self {
            Stage::SingleCell => 0,
            Stage::MultiCell => 1,
            Stage::Hunter => 2,
            Stage::Leviathan => 3,
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::SingleCell => Some(Stage::MultiCell),
            Stage::MultiCell => Some(Stage::Hunter),
            Stage::Hunter => Some(Stage::Leviathan),
            Stage::Leviathan => None,
        }
    }

    /// Ability tags this stage carries; rewritten atomically on evolution.
    pub fn ability_tags(self) -> &'static [Tag] {
        match self {
            Stage::SingleCell => &[],
            Stage::MultiCell => &[Tag::CanSprint, Tag::CanConsumeSwarm],
            Stage::Hunter | Stage::Leviathan => {
                &[Tag::CanSprint, Tag::CanConsumeSwarm, Tag::CanFire]
            }
        }
    }

    /// Early stages are clamped to the rectangle; advanced stages are
    /// projected onto the spherical boundary surface.
    pub fn uses_sphere_boundary(self) -> bool {
        self.index() >= Stage::Hunter.index()
    }

    /// A strictly higher stage preys on a lower one by contact drain.
    pub fn preys_on(self, other: Stage) -> bool {
        self.index() > other.index()
    }

    /// Evolution into Hunter opens the time-boxed weapon choice window.
    pub fn opens_weapon_choice(self) -> bool {
        self == Stage::Hunter
    }
}

/// The ranged-weapon resolution mode chosen at the Hunter evolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    /// Travelling entity, stepped every tick, owned hit-set.
    Pseudopod,
    /// Instantaneous line-circle hit, closest target only.
    Lance,
    /// Instantaneous circle overlap around a target point.
    Rupture,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 3] = [WeaponKind::Pseudopod, WeaponKind::Lance, WeaponKind::Rupture];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_ladder() {
        assert_eq!(Stage::SingleCell.next(), Some(Stage::MultiCell));
        assert_eq!(Stage::Leviathan.next(), None);
        assert!(Stage::MultiCell.preys_on(Stage::SingleCell));
        assert!(!Stage::SingleCell.preys_on(Stage::SingleCell));
    }

    #[test]
    fn test_ability_tags_grow_with_stage() {
        assert!(Stage::SingleCell.ability_tags().is_empty());
        assert!(Stage::MultiCell.ability_tags().contains(&Tag::CanSprint));
        assert!(!Stage::MultiCell.ability_tags().contains(&Tag::CanFire));
        assert!(Stage::Hunter.ability_tags().contains(&Tag::CanFire));
    }

    #[test]
    fn test_boundary_shape() {
        assert!(!Stage::MultiCell.uses_sphere_boundary());
        assert!(Stage::Hunter.uses_sphere_boundary());
    }
}
