use std::collections::HashMap;

use tracing::trace;

use crate::math::IVec2;
use crate::memory::MemoryArena;

use super::chunk::{BlockPool, Chunk, ChunkIndex, EntityBlock, ENTITY_BLOCK_CAPACITY};
use super::entity::{Entity, EntityId};
use super::position::WorldPosition;

pub const DEFAULT_MAX_ENTITY_COUNT: usize = 16384;

/// Persistent world: chunk membership plus the append-only entity store.
///
/// Entity slots are never reclaimed. A deleted entity keeps its slot (with the
/// deleted flag set in its payload) for the lifetime of the world, so ids are
/// never reused within a session. Chunks are likewise never freed; only their
/// overflow entity blocks are recycled.
#[derive(Debug)]
pub struct World {
    arena: MemoryArena,
    chunks: Vec<Chunk>,
    chunk_map: HashMap<u64, ChunkIndex>,
    blocks: BlockPool,
    entities: Vec<Entity>,
    max_entity_count: usize,
}

impl World {
    pub fn new(arena: MemoryArena, max_entity_count: usize) -> Self {
        assert!(max_entity_count > 1, "world needs room for at least one entity");
        let mut arena = arena;
        arena.alloc(
            Self::bytes_required(max_entity_count),
            std::mem::align_of::<Entity>(),
        );
        let mut entities = Vec::with_capacity(max_entity_count);
        // Slot 0 backs the null id and is never handed out.
        entities.push(Entity::default());
        Self {
            arena,
            chunks: Vec::new(),
            chunk_map: HashMap::new(),
            blocks: BlockPool::default(),
            entities,
            max_entity_count,
        }
    }

    /// World-arena bytes charged up front for the entity store.
    pub fn bytes_required(max_entity_count: usize) -> usize {
        std::mem::size_of::<Entity>() * max_entity_count
    }

    /// World-arena bytes for the entity store, `chunk_count` chunks and the
    /// largest overflow block pool `max_entity_count` entities can occupy.
    /// Overflow blocks are always full, so the pool never outgrows
    /// `max_entity_count / ENTITY_BLOCK_CAPACITY` live blocks.
    pub fn arena_bytes_required(max_entity_count: usize, chunk_count: usize) -> usize {
        let overflow_blocks = max_entity_count / ENTITY_BLOCK_CAPACITY;
        Self::bytes_required(max_entity_count)
            + std::mem::size_of::<Chunk>() * chunk_count
            + std::mem::size_of::<EntityBlock>() * overflow_blocks
            + std::mem::align_of::<Chunk>().max(std::mem::align_of::<EntityBlock>())
    }

    pub fn arena(&self) -> &MemoryArena {
        &self.arena
    }

    /// Number of ids handed out so far, including the reserved null slot.
    pub fn entity_ids_allocated(&self) -> usize {
        self.entities.len()
    }

    pub fn max_entity_count(&self) -> usize {
        self.max_entity_count
    }

    pub fn chunks_allocated(&self) -> usize {
        self.chunks.len()
    }

    pub fn entity_blocks_allocated(&self) -> usize {
        self.blocks.allocated()
    }

    pub fn free_entity_blocks(&self) -> usize {
        self.blocks.free_count()
    }

    pub fn add_world_entity(&mut self, pos: WorldPosition) -> EntityId {
        assert!(
            self.entities.len() < self.max_entity_count,
            "entity store exhausted ({} entities)",
            self.max_entity_count
        );
        assert!(pos.is_canonical(), "entity added at non-canonical position {pos:?}");
        let id = EntityId(
            u32::try_from(self.entities.len())
                .unwrap_or_else(|_| panic!("entity id space overflow")),
        );
        let mut entity = Entity {
            world_pos: pos,
            ..Entity::default()
        };
        entity.sim.id = id;
        self.entities.push(entity);

        let chunk = self.get_world_chunk(pos.chunk);
        self.add_entity_to_chunk(chunk, id);
        id
    }

    pub fn get_world_entity(&self, id: EntityId) -> &Entity {
        assert!(!id.is_null(), "lookup of the null entity id");
        self.entities
            .get(id.index())
            .unwrap_or_else(|| panic!("entity {} was never allocated", id.0))
    }

    pub fn get_world_entity_mut(&mut self, id: EntityId) -> &mut Entity {
        assert!(!id.is_null(), "lookup of the null entity id");
        self.entities
            .get_mut(id.index())
            .unwrap_or_else(|| panic!("entity {} was never allocated", id.0))
    }

    /// Live entities in id order. The reserved null slot and deleted entities
    /// are skipped.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities
            .iter()
            .skip(1)
            .filter(|entity| !entity.sim.is_deleted())
    }

    /// Returns the chunk at `coord`, creating it on first use. The returned
    /// index stays valid for the lifetime of the world.
    pub fn get_world_chunk(&mut self, coord: IVec2) -> ChunkIndex {
        if let Some(index) = self.chunk_map.get(&coord.packed()) {
            return *index;
        }
        self.arena.alloc_struct::<Chunk>();
        let index = ChunkIndex(
            u32::try_from(self.chunks.len()).unwrap_or_else(|_| panic!("chunk table overflow")),
        );
        self.chunks.push(Chunk::new(coord));
        self.chunk_map.insert(coord.packed(), index);
        index
    }

    pub fn find_chunk(&self, coord: IVec2) -> Option<ChunkIndex> {
        self.chunk_map.get(&coord.packed()).copied()
    }

    pub fn chunk(&self, index: ChunkIndex) -> &Chunk {
        &self.chunks[index.0 as usize]
    }

    pub fn add_entity_to_chunk(&mut self, chunk: ChunkIndex, id: EntityId) {
        let chunk = &mut self.chunks[chunk.0 as usize];
        self.blocks.add_entity(&mut self.arena, chunk, id);
    }

    pub fn remove_entity_from_chunk(&mut self, chunk: ChunkIndex, id: EntityId) -> bool {
        let chunk = &mut self.chunks[chunk.0 as usize];
        self.blocks.remove_entity(chunk, id)
    }

    /// Blocks of the chunk's membership chain, head first.
    pub fn chunk_blocks(
        &self,
        chunk: ChunkIndex,
    ) -> impl Iterator<Item = &EntityBlock> + Clone + '_ {
        self.blocks.chain(self.chunk(chunk).head_block())
    }

    /// Ids in chain order. Empty for chunks that were never created.
    pub fn chunk_entity_ids(&self, coord: IVec2) -> Vec<EntityId> {
        match self.find_chunk(coord) {
            Some(chunk) => self
                .chunk_blocks(chunk)
                .flat_map(|block| block.ids().iter().copied())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn chunk_block_counts(&self, coord: IVec2) -> Vec<usize> {
        match self.find_chunk(coord) {
            Some(chunk) => self.chunk_blocks(chunk).map(EntityBlock::len).collect(),
            None => Vec::new(),
        }
    }

    pub fn move_entity(&mut self, id: EntityId, to: WorldPosition, from: WorldPosition) {
        if to.chunk != from.chunk {
            let old_chunk = self.get_world_chunk(from.chunk);
            self.remove_entity_from_chunk(old_chunk, id);
            let new_chunk = self.get_world_chunk(to.chunk);
            self.add_entity_to_chunk(new_chunk, id);
            trace!(
                entity = id.0,
                from_x = from.chunk.x,
                from_y = from.chunk.y,
                to_x = to.chunk.x,
                to_y = to.chunk.y,
                "entity_migrated"
            );
        }
        self.get_world_entity_mut(id).world_pos = to;
    }
}
