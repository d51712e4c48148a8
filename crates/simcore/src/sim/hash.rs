use crate::memory::MemoryArena;
use crate::world::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimIndex(pub(crate) u32);

impl SimIndex {
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct HashSlot {
    id: EntityId,
    index: u32,
}

/// Fixed-size open-addressed map from entity id to dense-array slot.
///
/// The slot count is a power of two strictly larger than the number of
/// entities the region may hold, so a probe always reaches either the id or an
/// empty slot.
#[derive(Debug)]
pub(crate) struct EntityHash {
    slots: Vec<HashSlot>,
    mask: usize,
}

impl EntityHash {
    pub(crate) fn new(arena: &mut MemoryArena, max_entity_count: usize) -> Self {
        let size = (max_entity_count + 1).next_power_of_two();
        Self {
            slots: arena.alloc_array(size),
            mask: size - 1,
        }
    }

    pub(crate) fn bytes_required(max_entity_count: usize) -> usize {
        std::mem::size_of::<HashSlot>() * (max_entity_count + 1).next_power_of_two()
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Position of `id`'s slot, or of the empty slot where it would go.
    pub(crate) fn probe(&self, id: EntityId) -> usize {
        assert!(!id.is_null(), "null id probed in sim entity hash");
        let hash_value = id.0 as usize;
        for offset in 0..self.slots.len() {
            let slot = (hash_value + offset) & self.mask;
            let entry = self.slots[slot];
            if entry.id.is_null() || entry.id == id {
                return slot;
            }
        }
        panic!("sim entity hash is full ({} slots)", self.slots.len());
    }

    pub(crate) fn get_at(&self, slot: usize) -> Option<SimIndex> {
        let entry = self.slots[slot];
        (!entry.id.is_null()).then_some(SimIndex(entry.index))
    }

    pub(crate) fn fill(&mut self, slot: usize, id: EntityId, index: SimIndex) {
        debug_assert!(self.slots[slot].id.is_null());
        self.slots[slot] = HashSlot { id, index: index.0 };
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<SimIndex> {
        if id.is_null() {
            return None;
        }
        self.get_at(self.probe(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_power_of_two_above_capacity() {
        let mut arena = MemoryArena::new("frame", 1 << 20);
        assert_eq!(EntityHash::new(&mut arena, 4096).slot_count(), 8192);
        assert_eq!(EntityHash::new(&mut arena, 5).slot_count(), 8);
        assert_eq!(EntityHash::new(&mut arena, 7).slot_count(), 8);
    }

    #[test]
    fn colliding_ids_probe_linearly() {
        let mut arena = MemoryArena::new("frame", 1 << 20);
        let mut hash = EntityHash::new(&mut arena, 7);
        // 3, 11 and 19 share a home slot in an 8-slot table.
        for (position, raw) in [3u32, 11, 19].into_iter().enumerate() {
            let id = EntityId(raw);
            let slot = hash.probe(id);
            assert!(hash.get_at(slot).is_none());
            hash.fill(slot, id, SimIndex(position as u32));
        }
        assert_eq!(hash.get(EntityId(3)), Some(SimIndex(0)));
        assert_eq!(hash.get(EntityId(11)), Some(SimIndex(1)));
        assert_eq!(hash.get(EntityId(19)), Some(SimIndex(2)));
        assert_eq!(hash.get(EntityId(27)), None);
        assert_eq!(hash.get(EntityId::NULL), None);
    }

    #[test]
    fn filling_every_permitted_entry_still_terminates() {
        let mut arena = MemoryArena::new("frame", 1 << 20);
        let capacity = 15;
        let mut hash = EntityHash::new(&mut arena, capacity);
        for raw in 1..=capacity as u32 {
            let id = EntityId(raw * 16);
            let slot = hash.probe(id);
            hash.fill(slot, id, SimIndex(raw));
        }
        assert_eq!(hash.get(EntityId(9999)), None);
    }
}
