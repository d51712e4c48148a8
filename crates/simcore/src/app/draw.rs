//! Semantic asset tags, texture resolution and the per-frame draw list item.

use std::collections::HashMap;

use thiserror::Error;

use crate::math::Vec2;
use crate::world::{EntityId, EntityKind, WorldObjectKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetTag {
    Player,
    Pawn,
    WorldObject(WorldObjectKind),
}

impl AssetTag {
    pub fn sprite_key(self) -> &'static str {
        match self {
            Self::Player => "actors/player",
            Self::Pawn => "actors/pawn",
            Self::WorldObject(WorldObjectKind::TreeForest) => "world_objects/tree_forest",
            Self::WorldObject(WorldObjectKind::TreeJungle) => "world_objects/tree_jungle",
            Self::WorldObject(WorldObjectKind::TreeDesert) => "world_objects/tree_desert",
            Self::WorldObject(WorldObjectKind::GoldDeposit) => "world_objects/gold_deposit",
            Self::WorldObject(WorldObjectKind::Building1) => "world_objects/building1",
            Self::WorldObject(WorldObjectKind::Building2) => "world_objects/building2",
        }
    }

    pub fn all() -> impl Iterator<Item = AssetTag> {
        [Self::Player, Self::Pawn]
            .into_iter()
            .chain(WorldObjectKind::ALL.into_iter().map(Self::WorldObject))
    }
}

/// Opaque renderer-side texture reference. `PLACEHOLDER` is drawn for tags
/// the lookup cannot resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    pub const PLACEHOLDER: Self = Self(0);
}

pub trait AssetLookup {
    fn texture_for(&self, tag: AssetTag) -> TextureHandle;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub entity: EntityId,
    pub kind: EntityKind,
    pub texture: TextureHandle,
    /// World-space offset from the camera position.
    pub position: Vec2,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteKeyError {
    #[error("sprite key must not be empty")]
    Empty,
    #[error("sprite key must not start with '/'")]
    LeadingSlash,
    #[error("sprite key must not contain '\\\\'")]
    Backslash,
    #[error("sprite key must not contain '..'")]
    ParentTraversal,
    #[error("sprite key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
    #[error("sprite key '{key}' registered twice")]
    Duplicate { key: String },
}

pub(crate) fn validate_sprite_key(key: &str) -> Result<(), SpriteKeyError> {
    if key.is_empty() {
        return Err(SpriteKeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(SpriteKeyError::LeadingSlash);
    }
    if key.contains('\\') {
        return Err(SpriteKeyError::Backslash);
    }
    if key.contains("..") {
        return Err(SpriteKeyError::ParentTraversal);
    }
    for ch in key.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-') {
            continue;
        }
        return Err(SpriteKeyError::InvalidCharacter { character: ch });
    }
    Ok(())
}

/// Sprite keys registered in order; handles start at 1.
#[derive(Debug, Clone, Default)]
pub struct SpriteAtlas {
    handles: HashMap<String, TextureHandle>,
}

impl SpriteAtlas {
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Result<Self, SpriteKeyError> {
        let mut handles = HashMap::new();
        for key in keys {
            validate_sprite_key(key)?;
            let handle = TextureHandle(handles.len() as u32 + 1);
            if handles.insert(key.to_string(), handle).is_some() {
                return Err(SpriteKeyError::Duplicate {
                    key: key.to_string(),
                });
            }
        }
        Ok(Self { handles })
    }

    /// Atlas covering every built-in tag.
    pub fn builtin() -> Self {
        Self::from_keys(AssetTag::all().map(AssetTag::sprite_key))
            .unwrap_or_else(|error| panic!("built-in sprite keys are invalid: {error}"))
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handle(&self, key: &str) -> Option<TextureHandle> {
        self.handles.get(key).copied()
    }
}

impl AssetLookup for SpriteAtlas {
    fn texture_for(&self, tag: AssetTag) -> TextureHandle {
        self.handle(tag.sprite_key())
            .unwrap_or(TextureHandle::PLACEHOLDER)
    }
}
