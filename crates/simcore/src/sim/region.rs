use tracing::debug;

use crate::math::{IVec2, Vec2};
use crate::memory::MemoryArena;
use crate::world::{
    distance_between, pos_add, same_chunk, EntityId, SimEntity, World, WorldPosition,
};

use super::hash::{EntityHash, SimIndex};
use super::iter::EntityIter;

pub const DEFAULT_MAX_SIM_ENTITIES: usize = 4096;

/// Outcome of reconciling a region back into its world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimRegionReport {
    pub entity_count: usize,
    pub created: usize,
    pub updated: usize,
    pub migrated: usize,
    pub deleted: usize,
    /// Entities created and deleted inside the same region; never persisted.
    pub discarded: usize,
}

/// Dense per-frame working set gathered from a rectangle of chunks.
///
/// The region holds the world mutably for its whole lifetime, so chunk
/// storage only changes through [`SimRegion::end`]. Positions inside the
/// region (`SimEntity::p`) are offsets from `origin`, the minimum corner of
/// the minimum chunk.
#[derive(Debug)]
pub struct SimRegion<'w> {
    world: &'w mut World,
    origin: WorldPosition,
    min_chunk: IVec2,
    max_chunk: IVec2,
    entities: Vec<SimEntity>,
    max_entity_count: usize,
    hash: EntityHash,
}

pub fn begin_sim<'w>(
    world: &'w mut World,
    frame_arena: &mut MemoryArena,
    min_chunk: IVec2,
    max_chunk: IVec2,
    max_entity_count: usize,
) -> SimRegion<'w> {
    SimRegion::begin(world, frame_arena, min_chunk, max_chunk, max_entity_count)
}

pub fn end_sim(sim: SimRegion<'_>) -> SimRegionReport {
    sim.end()
}

impl<'w> SimRegion<'w> {
    /// Gathers every entity of every chunk in `[min_chunk, max_chunk]`
    /// (inclusive), row by row from `min_chunk.y`, then along x, then in
    /// block-chain order.
    pub fn begin(
        world: &'w mut World,
        frame_arena: &mut MemoryArena,
        min_chunk: IVec2,
        max_chunk: IVec2,
        max_entity_count: usize,
    ) -> Self {
        assert!(
            min_chunk.x <= max_chunk.x && min_chunk.y <= max_chunk.y,
            "inverted sim bounds {min_chunk:?}..{max_chunk:?}"
        );
        assert!(max_entity_count > 0, "sim region needs a non-zero capacity");
        let entities = frame_arena.alloc_vec::<SimEntity>(max_entity_count);
        let hash = EntityHash::new(frame_arena, max_entity_count);
        let mut sim = Self {
            world,
            origin: WorldPosition::new(min_chunk, Vec2::ZERO),
            min_chunk,
            max_chunk,
            entities,
            max_entity_count,
            hash,
        };

        let mut chunk_ids = Vec::new();
        for chunk_y in min_chunk.y..=max_chunk.y {
            for chunk_x in min_chunk.x..=max_chunk.x {
                let Some(chunk) = sim.world.find_chunk(IVec2::new(chunk_x, chunk_y)) else {
                    continue;
                };
                chunk_ids.clear();
                chunk_ids.extend(
                    sim.world
                        .chunk_blocks(chunk)
                        .flat_map(|block| block.ids().iter().copied()),
                );
                for id in &chunk_ids {
                    sim.add_entity(*id);
                }
            }
        }
        sim
    }

    /// Frame-arena bytes one region of `max_entity_count` entities charges,
    /// alignment padding included.
    pub fn frame_bytes_required(max_entity_count: usize) -> usize {
        let entities = std::mem::size_of::<SimEntity>() * max_entity_count;
        let hash = EntityHash::bytes_required(max_entity_count);
        entities + hash + 2 * std::mem::align_of::<SimEntity>().max(8)
    }

    pub fn origin(&self) -> WorldPosition {
        self.origin
    }

    pub fn chunk_count(&self) -> usize {
        let width = (self.max_chunk.x - self.min_chunk.x + 1) as usize;
        let height = (self.max_chunk.y - self.min_chunk.y + 1) as usize;
        width * height
    }

    /// Read-only view of the world the region was opened on.
    pub fn world(&self) -> &World {
        &*self.world
    }

    /// Slots in use, deleted entities included.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn max_entity_count(&self) -> usize {
        self.max_entity_count
    }

    pub fn world_position_of(&self, p: Vec2) -> WorldPosition {
        pos_add(self.origin, p)
    }

    pub fn local_point(&self, pos: WorldPosition) -> Vec2 {
        distance_between(pos, self.origin)
    }

    /// Brings a world entity into the region. Re-adding an id that is
    /// already present returns the existing slot untouched.
    pub fn add_entity(&mut self, id: EntityId) -> &mut SimEntity {
        assert!(!id.is_null(), "cannot add the null entity to a sim region");
        let slot = self.hash.probe(id);
        let index = match self.hash.get_at(slot) {
            Some(index) => index,
            None => {
                self.assert_has_room();
                let world_entity = self.world.get_world_entity(id);
                let mut entity = world_entity.sim;
                entity.id = id;
                entity.p = distance_between(world_entity.world_pos, self.origin);
                let index = SimIndex(self.entities.len() as u32);
                self.entities.push(entity);
                self.hash.fill(slot, id, index);
                index
            }
        };
        &mut self.entities[index.get()]
    }

    /// New entity unknown to the world; it gets an id when the region ends.
    pub fn create_entity(&mut self) -> &mut SimEntity {
        self.assert_has_room();
        self.entities.push(SimEntity::default());
        let last = self.entities.len() - 1;
        &mut self.entities[last]
    }

    pub fn get_entity_by_id(&mut self, id: EntityId) -> Option<&mut SimEntity> {
        let index = self.hash.get(id)?;
        Some(&mut self.entities[index.get()])
    }

    pub fn entity(&self, id: EntityId) -> Option<&SimEntity> {
        let index = self.hash.get(id)?;
        Some(&self.entities[index.get()])
    }

    pub fn index_of(&self, id: EntityId) -> Option<SimIndex> {
        self.hash.get(id)
    }

    pub fn entity_at(&self, index: SimIndex) -> &SimEntity {
        &self.entities[index.get()]
    }

    pub fn entity_at_mut(&mut self, index: SimIndex) -> &mut SimEntity {
        &mut self.entities[index.get()]
    }

    /// Live (non-deleted) entities in dense-array order.
    pub fn iter(&self) -> EntityIter<'_> {
        EntityIter::new(&self.entities)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SimEntity> + '_ {
        self.entities
            .iter_mut()
            .filter(|entity| !entity.is_deleted())
    }

    fn assert_has_room(&self) {
        assert!(
            self.entities.len() < self.max_entity_count,
            "sim region entity capacity exhausted ({})",
            self.max_entity_count
        );
    }

    /// Writes the region back into the world: persists new entities, drops
    /// deleted ones from their chunks and migrates entities whose chunk
    /// changed.
    pub fn end(self) -> SimRegionReport {
        let Self {
            world,
            origin,
            entities,
            min_chunk,
            max_chunk,
            ..
        } = self;
        let mut report = SimRegionReport {
            entity_count: entities.len(),
            ..SimRegionReport::default()
        };

        for entity in entities {
            let new_position = pos_add(origin, entity.p);
            if entity.id.is_null() {
                if entity.is_deleted() {
                    report.discarded += 1;
                    continue;
                }
                let id = world.add_world_entity(new_position);
                world.get_world_entity_mut(id).sim = SimEntity { id, ..entity };
                report.created += 1;
                continue;
            }

            let old_position = world.get_world_entity(entity.id).world_pos;
            if entity.is_deleted() {
                if let Some(chunk) = world.find_chunk(old_position.chunk) {
                    world.remove_entity_from_chunk(chunk, entity.id);
                }
                world.get_world_entity_mut(entity.id).sim = entity;
                report.deleted += 1;
                continue;
            }

            if !same_chunk(new_position, old_position) {
                report.migrated += 1;
            }
            world.get_world_entity_mut(entity.id).sim = entity;
            world.move_entity(entity.id, new_position, old_position);
            report.updated += 1;
        }

        debug!(
            min_chunk_x = min_chunk.x,
            min_chunk_y = min_chunk.y,
            max_chunk_x = max_chunk.x,
            max_chunk_y = max_chunk.y,
            entity_count = report.entity_count,
            created = report.created,
            updated = report.updated,
            migrated = report.migrated,
            deleted = report.deleted,
            "sim_region_closed"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{EntityKind, CHUNK_SIZE};

    const TEST_SIM_CAPACITY: usize = 256;

    fn test_world() -> World {
        World::new(MemoryArena::new("world", 8 << 20), 1024)
    }

    fn frame_arena() -> MemoryArena {
        MemoryArena::new("frame", 8 << 20)
    }

    fn at(chunk: (i32, i32), offset: (f32, f32)) -> WorldPosition {
        WorldPosition::new(IVec2::new(chunk.0, chunk.1), Vec2::new(offset.0, offset.1))
    }

    fn assert_vec2_close(actual: Vec2, expected: Vec2, epsilon: f32) {
        assert!(
            (actual.x - expected.x).abs() <= epsilon && (actual.y - expected.y).abs() <= epsilon,
            "{actual:?} vs {expected:?}"
        );
    }

    #[test]
    fn gathers_one_entity_per_chunk_over_three_by_three() {
        let mut world = test_world();
        for y in 0..3 {
            for x in 0..3 {
                world.add_world_entity(at((x, y), (8.0, 8.0)));
            }
        }
        world.add_world_entity(at((3, 0), (8.0, 8.0)));
        let mut arena = frame_arena();
        let sim = begin_sim(
            &mut world,
            &mut arena,
            IVec2::new(0, 0),
            IVec2::new(2, 2),
            TEST_SIM_CAPACITY,
        );
        assert_eq!(sim.entity_count(), 9);
        assert_eq!(sim.iter().count(), 9);
        assert_eq!(sim.chunk_count(), 9);
    }

    #[test]
    fn gather_order_is_row_major() {
        let mut world = test_world();
        let a = world.add_world_entity(at((1, 0), (1.0, 1.0)));
        let b = world.add_world_entity(at((0, 1), (1.0, 1.0)));
        let c = world.add_world_entity(at((0, 0), (1.0, 1.0)));
        let mut arena = frame_arena();
        let sim = begin_sim(
            &mut world,
            &mut arena,
            IVec2::new(0, 0),
            IVec2::new(1, 1),
            TEST_SIM_CAPACITY,
        );
        let order: Vec<EntityId> = sim.iter().map(|entity| entity.id).collect();
        assert_eq!(order, vec![c, a, b]);
    }

    #[test]
    fn local_positions_are_relative_to_min_chunk() {
        let mut world = test_world();
        let id = world.add_world_entity(at((-1, 2), (3.0, 4.0)));
        let mut arena = frame_arena();
        let sim = begin_sim(
            &mut world,
            &mut arena,
            IVec2::new(-2, 1),
            IVec2::new(0, 3),
            TEST_SIM_CAPACITY,
        );
        assert_eq!(sim.origin(), at((-2, 1), (0.0, 0.0)));
        let entity = sim.entity(id).expect("entity in region");
        assert_vec2_close(entity.p, Vec2::new(CHUNK_SIZE + 3.0, CHUNK_SIZE + 4.0), 1e-5);
        let back = sim.world_position_of(entity.p);
        assert_eq!(back.chunk, IVec2::new(-1, 2));
        assert_vec2_close(back.offset, Vec2::new(3.0, 4.0), 1e-5);
    }

    #[test]
    fn iter_mut_skips_deleted_and_writes_back() {
        let mut world = test_world();
        let kept = world.add_world_entity(at((0, 0), (2.0, 2.0)));
        let dropped = world.add_world_entity(at((0, 0), (6.0, 6.0)));
        let mut arena = frame_arena();
        let mut sim = begin_sim(
            &mut world,
            &mut arena,
            IVec2::new(0, 0),
            IVec2::new(1, 0),
            TEST_SIM_CAPACITY,
        );
        sim.get_entity_by_id(dropped).expect("in region").mark_deleted();

        let mut visited = Vec::new();
        for entity in sim.iter_mut() {
            visited.push(entity.id);
            entity.p.x += CHUNK_SIZE;
        }
        assert_eq!(visited, vec![kept]);

        let report = end_sim(sim);
        assert_eq!(report.migrated, 1);
        assert_eq!(report.deleted, 1);
        let moved = world.get_world_entity(kept).world_pos;
        assert_eq!(moved.chunk, IVec2::new(1, 0));
        assert_vec2_close(moved.offset, Vec2::new(2.0, 2.0), 1e-4);
        assert_eq!(world.get_world_entity(dropped).world_pos.chunk, IVec2::new(0, 0));
        assert_eq!(world.chunk_entity_ids(IVec2::new(1, 0)), vec![kept]);
        assert!(world.chunk_entity_ids(IVec2::new(0, 0)).is_empty());
    }

    #[test]
    fn unmodified_round_trip_keeps_position() {
        let mut world = test_world();
        let start = at((0, 0), (5.25, 9.5));
        let id = world.add_world_entity(start);
        let mut arena = frame_arena();
        let sim = begin_sim(
            &mut world,
            &mut arena,
            IVec2::new(-1, -1),
            IVec2::new(1, 1),
            TEST_SIM_CAPACITY,
        );
        let report = end_sim(sim);
        assert_eq!(report.updated, 1);
        assert_eq!(report.migrated, 0);
        let after = world.get_world_entity(id).world_pos;
        assert_eq!(after.chunk, start.chunk);
        assert_vec2_close(after.offset, start.offset, 1e-4);
        assert_eq!(world.chunk_entity_ids(IVec2::new(0, 0)), vec![id]);
    }

    #[test]
    fn moving_across_chunk_edge_migrates_membership() {
        let mut world = test_world();
        let id = world.add_world_entity(at((0, 0), (15.5, 0.0)));
        let mut arena = frame_arena();
        let mut sim = begin_sim(
            &mut world,
            &mut arena,
            IVec2::new(0, 0),
            IVec2::new(1, 1),
            TEST_SIM_CAPACITY,
        );
        sim.get_entity_by_id(id).expect("entity").p += Vec2::new(1.0, 0.0);
        let report = end_sim(sim);
        assert_eq!(report.migrated, 1);

        let pos = world.get_world_entity(id).world_pos;
        assert_eq!(pos.chunk, IVec2::new(1, 0));
        assert_vec2_close(pos.offset, Vec2::new(0.5, 0.0), 1e-4);
        assert!(world.chunk_entity_ids(IVec2::new(0, 0)).is_empty());
        assert_eq!(world.chunk_entity_ids(IVec2::new(1, 0)), vec![id]);
    }

    #[test]
    fn deleted_entity_is_filtered_then_removed_from_chunk() {
        let mut world = test_world();
        let keep = world.add_world_entity(at((0, 0), (1.0, 1.0)));
        let doomed = world.add_world_entity(at((0, 0), (2.0, 2.0)));
        let mut arena = frame_arena();
        let mut sim = begin_sim(
            &mut world,
            &mut arena,
            IVec2::new(0, 0),
            IVec2::new(0, 0),
            TEST_SIM_CAPACITY,
        );
        sim.get_entity_by_id(doomed).expect("entity").mark_deleted();
        let live: Vec<EntityId> = sim.iter().map(|entity| entity.id).collect();
        assert_eq!(live, vec![keep]);
        assert_eq!(sim.entity_count(), 2);

        let report = end_sim(sim);
        assert_eq!(report.deleted, 1);
        assert_eq!(world.chunk_entity_ids(IVec2::new(0, 0)), vec![keep]);
        // The slot itself is kept, flagged, and never reused.
        assert!(world.get_world_entity(doomed).sim.is_deleted());
        let next = world.add_world_entity(at((0, 0), (3.0, 3.0)));
        assert_eq!(next, EntityId(doomed.0 + 1));
    }

    #[test]
    fn created_entities_are_persisted_with_fresh_ids() {
        let mut world = test_world();
        let mut arena = frame_arena();
        let mut sim = begin_sim(
            &mut world,
            &mut arena,
            IVec2::new(4, 4),
            IVec2::new(5, 5),
            TEST_SIM_CAPACITY,
        );
        let created = sim.create_entity();
        assert!(created.id.is_null());
        created.kind = EntityKind::Pawn;
        created.p = Vec2::new(20.0, 3.0);
        let discarded = sim.create_entity();
        discarded.mark_deleted();
        assert_eq!(sim.iter().count(), 1);

        let report = end_sim(sim);
        assert_eq!(report.created, 1);
        assert_eq!(report.discarded, 1);
        let ids = world.chunk_entity_ids(IVec2::new(5, 4));
        assert_eq!(ids.len(), 1);
        let entity = world.get_world_entity(ids[0]);
        assert_eq!(entity.sim.id, ids[0]);
        assert_eq!(entity.sim.kind, EntityKind::Pawn);
        assert_vec2_close(entity.world_pos.offset, Vec2::new(4.0, 3.0), 1e-4);
    }

    #[test]
    fn add_entity_is_idempotent() {
        let mut world = test_world();
        let id = world.add_world_entity(at((0, 0), (1.0, 1.0)));
        let mut arena = frame_arena();
        let mut sim = begin_sim(
            &mut world,
            &mut arena,
            IVec2::new(0, 0),
            IVec2::new(0, 0),
            TEST_SIM_CAPACITY,
        );
        sim.add_entity(id).p = Vec2::new(7.0, 7.0);
        let again = sim.add_entity(id);
        assert_eq!(again.p, Vec2::new(7.0, 7.0));
        assert_eq!(sim.entity_count(), 1);
    }

    #[test]
    fn payload_changes_are_written_back() {
        let mut world = test_world();
        let id = world.add_world_entity(at((0, 0), (1.0, 1.0)));
        let mut arena = frame_arena();
        let mut sim = begin_sim(
            &mut world,
            &mut arena,
            IVec2::new(0, 0),
            IVec2::new(0, 0),
            TEST_SIM_CAPACITY,
        );
        sim.get_entity_by_id(id).expect("entity").resource_interactions_left = 7;
        end_sim(sim);
        assert_eq!(world.get_world_entity(id).sim.resource_interactions_left, 7);
    }

    #[test]
    fn entities_outside_bounds_are_not_gathered() {
        let mut world = test_world();
        world.add_world_entity(at((5, 5), (1.0, 1.0)));
        let inside = world.add_world_entity(at((0, 0), (1.0, 1.0)));
        let mut arena = frame_arena();
        let sim = begin_sim(
            &mut world,
            &mut arena,
            IVec2::new(-1, -1),
            IVec2::new(1, 1),
            TEST_SIM_CAPACITY,
        );
        let ids: Vec<EntityId> = sim.iter().map(|entity| entity.id).collect();
        assert_eq!(ids, vec![inside]);
        assert!(sim.entity(EntityId::NULL).is_none());
    }

    #[test]
    fn region_arrays_are_charged_to_frame_arena() {
        let mut world = test_world();
        let mut arena = frame_arena();
        let sim = begin_sim(
            &mut world,
            &mut arena,
            IVec2::new(0, 0),
            IVec2::new(0, 0),
            TEST_SIM_CAPACITY,
        );
        drop(sim);
        assert!(arena.data_size() >= std::mem::size_of::<SimEntity>() * TEST_SIM_CAPACITY);
    }

    #[test]
    fn frame_bytes_required_covers_region_arrays() {
        let mut world = test_world();
        world.add_world_entity(at((0, 0), (1.0, 1.0)));
        let mut arena = MemoryArena::new("frame", SimRegion::frame_bytes_required(300));
        let sim = begin_sim(&mut world, &mut arena, IVec2::new(0, 0), IVec2::new(0, 0), 300);
        assert_eq!(sim.entity_count(), 1);
    }

    #[test]
    #[should_panic(expected = "sim region entity capacity exhausted")]
    fn region_capacity_overflow_is_fatal() {
        let mut world = test_world();
        for _ in 0..3 {
            world.add_world_entity(at((0, 0), (1.0, 1.0)));
        }
        let mut arena = frame_arena();
        begin_sim(&mut world, &mut arena, IVec2::new(0, 0), IVec2::new(0, 0), 2);
    }
}
