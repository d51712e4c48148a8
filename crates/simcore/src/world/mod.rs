mod chunk;
mod entity;
mod position;
mod store;

pub use chunk::{BlockIndex, Chunk, ChunkIndex, EntityBlock, ENTITY_BLOCK_CAPACITY};
pub use entity::{
    Entity, EntityFlags, EntityId, EntityKind, Interaction, InteractionKind, OrderId, SimEntity,
    WorldObjectKind,
};
pub use position::{
    distance_between, pos_add, same_chunk, WorldPosition, CELL_SIZE, CHUNK_EPSILON, CHUNK_SIZE,
};
pub use store::{World, DEFAULT_MAX_ENTITY_COUNT};
