//! Chunk-partitioned world storage with per-frame simulation regions.
//!
//! The persistent [`World`] stores entities in fixed-size blocks chained off
//! sparse 16x16-unit chunks. Each frame, [`begin_sim`] gathers the chunks
//! around an anchor into a dense [`SimRegion`] working set; game code mutates
//! region-local copies and [`end_sim`] writes them back, migrating entities
//! whose chunk changed.

pub mod app;
pub mod math;
pub mod memory;
pub mod sim;
pub mod world;

pub use app::{
    screen_to_world_px, world_to_screen_px, AssetLookup, AssetTag, Camera2D, DrawItem,
    InputAction, InputSnapshot, SpriteAtlas, SpriteKeyError, TextureHandle, Viewport,
    PIXELS_PER_WORLD,
};
pub use math::{IVec2, Vec2};
pub use memory::{ArenaAllocation, ArenaError, MemoryArena, TempMemory};
pub use sim::{
    begin_sim, end_sim, EntityIter, SimIndex, SimRegion, SimRegionReport, DEFAULT_MAX_SIM_ENTITIES,
};
pub use world::{
    distance_between, pos_add, same_chunk, ChunkIndex, Entity, EntityBlock, EntityFlags, EntityId,
    EntityKind, Interaction, InteractionKind, OrderId, SimEntity, World, WorldObjectKind,
    WorldPosition, CELL_SIZE, CHUNK_SIZE, DEFAULT_MAX_ENTITY_COUNT, ENTITY_BLOCK_CAPACITY,
};
