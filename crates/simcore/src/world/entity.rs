use serde::{Deserialize, Serialize};

use crate::math::Vec2;

use super::position::WorldPosition;

/// Dense handle into the persistent entity store. `0` is the null id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EntityKind {
    #[default]
    None,
    Player,
    WorldObject,
    Pawn,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EntityFlags(u32);

impl EntityFlags {
    pub const NONE: Self = Self(0);
    pub const DELETED: Self = Self(0x1);
    pub const IS_ANCHOR: Self = Self(0x2);
    pub const HAS_WORLD_PLACEMENT: Self = Self(0x4);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for EntityFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldObjectKind {
    TreeForest,
    TreeJungle,
    TreeDesert,
    GoldDeposit,
    Building1,
    Building2,
}

impl WorldObjectKind {
    pub const ALL: [Self; 6] = [
        Self::TreeForest,
        Self::TreeJungle,
        Self::TreeDesert,
        Self::GoldDeposit,
        Self::Building1,
        Self::Building2,
    ];

    pub fn as_token(self) -> &'static str {
        match self {
            Self::TreeForest => "tree_forest",
            Self::TreeJungle => "tree_jungle",
            Self::TreeDesert => "tree_desert",
            Self::GoldDeposit => "gold_deposit",
            Self::Building1 => "building1",
            Self::Building2 => "building2",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    MineResource,
}

/// A worker's in-progress timed task against one target entity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Interaction {
    pub kind: Option<InteractionKind>,
    pub target: EntityId,
    pub time: f32,
    pub current_time: f32,
}

impl Interaction {
    pub fn is_active(&self) -> bool {
        self.kind.is_some()
    }

    pub fn progress(&self) -> f32 {
        if self.time <= 0.0 {
            return 0.0;
        }
        (self.current_time / self.time).clamp(0.0, 1.0)
    }
}

/// Simulation payload. Persisted inside [`Entity`] and copied into a sim
/// region's dense array while the region is open.
///
/// `p` is only meaningful inside a region: it is the offset from the region
/// origin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub flags: EntityFlags,
    pub p: Vec2,
    pub world_object: Option<WorldObjectKind>,
    pub resource_interactions_left: u32,
    pub order: Option<OrderId>,
    pub interaction: Interaction,
}

impl SimEntity {
    pub fn is_set(&self, flag: EntityFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn add_flags(&mut self, flags: EntityFlags) {
        self.flags.insert(flags);
    }

    pub fn remove_flags(&mut self, flags: EntityFlags) {
        self.flags.remove(flags);
    }

    pub fn is_deleted(&self) -> bool {
        self.is_set(EntityFlags::DELETED)
    }

    pub fn mark_deleted(&mut self) {
        self.add_flags(EntityFlags::DELETED);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Entity {
    pub world_pos: WorldPosition,
    pub sim: SimEntity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_insert_and_remove_independently() {
        let mut entity = SimEntity::default();
        entity.add_flags(EntityFlags::IS_ANCHOR | EntityFlags::DELETED);
        assert!(entity.is_deleted());
        assert!(entity.is_set(EntityFlags::IS_ANCHOR));
        entity.remove_flags(EntityFlags::DELETED);
        assert!(!entity.is_deleted());
        assert!(entity.is_set(EntityFlags::IS_ANCHOR));
    }

    #[test]
    fn interaction_progress_is_clamped() {
        let interaction = Interaction {
            kind: Some(InteractionKind::MineResource),
            target: EntityId(3),
            time: 2.0,
            current_time: 3.0,
        };
        assert_eq!(interaction.progress(), 1.0);
        assert_eq!(Interaction::default().progress(), 0.0);
    }
}
