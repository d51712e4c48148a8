//! Chunk records and their entity membership chains.
//!
//! Every chunk embeds one head [`EntityBlock`]. When the head fills up, its
//! contents move into a block taken from the shared [`BlockPool`] and linked
//! behind it, so the head is always the most recently written block and every
//! overflow block is full. Removal swap-removes with the last id of the head;
//! if that empties the head while an overflow block exists, the overflow block
//! is spliced back into the head and its node returns to the free list.

use tracing::warn;

use crate::math::IVec2;
use crate::memory::MemoryArena;

use super::entity::EntityId;

pub const ENTITY_BLOCK_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockIndex(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkIndex(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityBlock {
    ids: [EntityId; ENTITY_BLOCK_CAPACITY],
    count: usize,
    next: Option<BlockIndex>,
}

impl Default for EntityBlock {
    fn default() -> Self {
        Self {
            ids: [EntityId::NULL; ENTITY_BLOCK_CAPACITY],
            count: 0,
            next: None,
        }
    }
}

impl EntityBlock {
    pub fn ids(&self) -> &[EntityId] {
        &self.ids[..self.count]
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == ENTITY_BLOCK_CAPACITY
    }

    pub fn next(&self) -> Option<BlockIndex> {
        self.next
    }

    fn push(&mut self, id: EntityId) {
        assert!(!self.is_full(), "entity block overflow");
        self.ids[self.count] = id;
        self.count += 1;
    }

    fn position(&self, id: EntityId) -> Option<usize> {
        self.ids().iter().position(|candidate| *candidate == id)
    }
}

#[derive(Debug, Clone)]
pub struct Chunk {
    coord: IVec2,
    entity_block: EntityBlock,
}

impl Chunk {
    pub(crate) fn new(coord: IVec2) -> Self {
        Self {
            coord,
            entity_block: EntityBlock::default(),
        }
    }

    pub fn coord(&self) -> IVec2 {
        self.coord
    }

    pub fn head_block(&self) -> &EntityBlock {
        &self.entity_block
    }
}

/// Overflow entity blocks shared by every chunk of a world.
#[derive(Debug, Default)]
pub struct BlockPool {
    blocks: Vec<EntityBlock>,
    free: Vec<BlockIndex>,
}

impl BlockPool {
    pub fn block(&self, index: BlockIndex) -> &EntityBlock {
        &self.blocks[index.0 as usize]
    }

    pub fn allocated(&self) -> usize {
        self.blocks.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    fn acquire(&mut self, arena: &mut MemoryArena) -> BlockIndex {
        if let Some(index) = self.free.pop() {
            return index;
        }
        arena.alloc_struct::<EntityBlock>();
        let index = u32::try_from(self.blocks.len())
            .unwrap_or_else(|_| panic!("entity block pool overflow"));
        self.blocks.push(EntityBlock::default());
        BlockIndex(index)
    }

    fn release(&mut self, index: BlockIndex) {
        self.blocks[index.0 as usize] = EntityBlock::default();
        self.free.push(index);
    }

    /// Iterates a chain starting at `head`, head first.
    pub fn chain<'a>(
        &'a self,
        head: &'a EntityBlock,
    ) -> impl Iterator<Item = &'a EntityBlock> + Clone + 'a {
        std::iter::successors(Some(head), move |block| block.next.map(|index| self.block(index)))
    }

    pub(crate) fn add_entity(&mut self, arena: &mut MemoryArena, chunk: &mut Chunk, id: EntityId) {
        let head = &mut chunk.entity_block;
        if head.is_full() {
            let index = self.acquire(arena);
            self.blocks[index.0 as usize] = *head;
            head.next = Some(index);
            head.count = 0;
        }
        head.push(id);
    }

    pub(crate) fn remove_entity(&mut self, chunk: &mut Chunk, id: EntityId) -> bool {
        let Some((location, slot)) = self.locate(chunk, id) else {
            warn!(
                entity = id.0,
                chunk_x = chunk.coord.x,
                chunk_y = chunk.coord.y,
                "entity_not_in_chunk"
            );
            return false;
        };

        let head = &mut chunk.entity_block;
        assert!(head.count > 0, "head block empty while chain holds entities");
        head.count -= 1;
        let last = head.ids[head.count];
        match location {
            None => head.ids[slot] = last,
            Some(index) => self.blocks[index.0 as usize].ids[slot] = last,
        }

        if head.count == 0 {
            if let Some(next) = head.next {
                *head = self.blocks[next.0 as usize];
                self.release(next);
            }
        }
        true
    }

    /// `None` block means the chunk's head block.
    fn locate(&self, chunk: &Chunk, id: EntityId) -> Option<(Option<BlockIndex>, usize)> {
        if let Some(slot) = chunk.entity_block.position(id) {
            return Some((None, slot));
        }
        let mut cursor = chunk.entity_block.next;
        while let Some(index) = cursor {
            let block = self.block(index);
            if let Some(slot) = block.position(id) {
                return Some((Some(index), slot));
            }
            cursor = block.next;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_arena() -> MemoryArena {
        MemoryArena::new("world", 1 << 20)
    }

    fn chain_ids(pool: &BlockPool, chunk: &Chunk) -> Vec<EntityId> {
        pool.chain(chunk.head_block())
            .flat_map(|block| block.ids().iter().copied())
            .collect()
    }

    fn chain_lengths(pool: &BlockPool, chunk: &Chunk) -> Vec<usize> {
        pool.chain(chunk.head_block()).map(EntityBlock::len).collect()
    }

    #[test]
    fn full_head_pushes_contents_into_overflow_block() {
        let mut arena = test_arena();
        let mut pool = BlockPool::default();
        let mut chunk = Chunk::new(IVec2::new(0, 0));
        for id in 1..=ENTITY_BLOCK_CAPACITY as u32 {
            pool.add_entity(&mut arena, &mut chunk, EntityId(id));
        }
        assert_eq!(chain_lengths(&pool, &chunk), vec![ENTITY_BLOCK_CAPACITY]);

        pool.add_entity(&mut arena, &mut chunk, EntityId(99));
        assert_eq!(chain_lengths(&pool, &chunk), vec![1, ENTITY_BLOCK_CAPACITY]);
        assert_eq!(chunk.head_block().ids(), &[EntityId(99)]);
        assert_eq!(pool.allocated(), 1);
    }

    #[test]
    fn emptied_head_splices_overflow_and_recycles_node() {
        let mut arena = test_arena();
        let mut pool = BlockPool::default();
        let mut chunk = Chunk::new(IVec2::new(0, 0));
        for id in 1..=ENTITY_BLOCK_CAPACITY as u32 + 1 {
            pool.add_entity(&mut arena, &mut chunk, EntityId(id));
        }

        assert!(pool.remove_entity(&mut chunk, EntityId(ENTITY_BLOCK_CAPACITY as u32 + 1)));
        assert_eq!(chain_lengths(&pool, &chunk), vec![ENTITY_BLOCK_CAPACITY]);
        assert_eq!(pool.free_count(), 1);

        let used_before = arena.data_size();
        pool.add_entity(&mut arena, &mut chunk, EntityId(500));
        assert_eq!(pool.free_count(), 0);
        assert_eq!(pool.allocated(), 1);
        assert_eq!(arena.data_size(), used_before);
    }

    #[test]
    fn removal_from_overflow_block_compacts_through_head() {
        let mut arena = test_arena();
        let mut pool = BlockPool::default();
        let mut chunk = Chunk::new(IVec2::new(0, 0));
        for id in 1..=ENTITY_BLOCK_CAPACITY as u32 + 2 {
            pool.add_entity(&mut arena, &mut chunk, EntityId(id));
        }

        assert!(pool.remove_entity(&mut chunk, EntityId(3)));
        assert_eq!(chain_lengths(&pool, &chunk), vec![1, ENTITY_BLOCK_CAPACITY]);
        let ids = chain_ids(&pool, &chunk);
        assert!(!ids.contains(&EntityId(3)));
        assert!(ids.contains(&EntityId(ENTITY_BLOCK_CAPACITY as u32 + 2)));
    }

    #[test]
    fn removing_missing_id_reports_false() {
        let mut arena = test_arena();
        let mut pool = BlockPool::default();
        let mut chunk = Chunk::new(IVec2::new(4, 4));
        pool.add_entity(&mut arena, &mut chunk, EntityId(1));
        assert!(!pool.remove_entity(&mut chunk, EntityId(2)));
        assert_eq!(chain_ids(&pool, &chunk), vec![EntityId(1)]);
    }

    #[test]
    fn interleaved_inserts_and_removes_keep_chain_consistent() {
        let mut arena = test_arena();
        let mut pool = BlockPool::default();
        let mut chunk = Chunk::new(IVec2::new(0, 0));
        let mut live: Vec<EntityId> = Vec::new();
        let mut next_id = 1u32;
        // Deterministic mixed workload that repeatedly grows and drains
        // multi-block chains, including removal from every chain position.
        let mut state = 0x2545_f491_u32;
        for step in 0..4000 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let grow = step % 600 < 400;
            if live.is_empty() || (grow && state % 4 != 0) || (!grow && state % 4 == 0) {
                let id = EntityId(next_id);
                next_id += 1;
                pool.add_entity(&mut arena, &mut chunk, id);
                live.push(id);
            } else {
                let victim = live.swap_remove(state as usize % live.len());
                assert!(pool.remove_entity(&mut chunk, victim));
            }

            let mut ids = chain_ids(&pool, &chunk);
            assert_eq!(ids.len(), live.len(), "step {step}");
            ids.sort();
            let mut expected = live.clone();
            expected.sort();
            assert_eq!(ids, expected, "step {step}");

            let lengths = chain_lengths(&pool, &chunk);
            assert!(
                lengths[1..].iter().all(|len| *len == ENTITY_BLOCK_CAPACITY),
                "overflow blocks must stay full: {lengths:?}"
            );
            assert!(lengths[0] > 0 || lengths.len() == 1, "empty head with overflow: {lengths:?}");
        }
    }

    #[test]
    fn draining_a_multi_block_chain_returns_every_node() {
        let mut arena = test_arena();
        let mut pool = BlockPool::default();
        let mut chunk = Chunk::new(IVec2::new(0, 0));
        let total = ENTITY_BLOCK_CAPACITY as u32 * 3 + 5;
        for id in 1..=total {
            pool.add_entity(&mut arena, &mut chunk, EntityId(id));
        }
        assert_eq!(pool.allocated(), 3);
        for id in 1..=total {
            assert!(pool.remove_entity(&mut chunk, EntityId(id)), "id {id}");
        }
        assert!(chunk.head_block().is_empty());
        assert_eq!(chunk.head_block().next(), None);
        assert_eq!(pool.free_count(), 3);
    }
}
