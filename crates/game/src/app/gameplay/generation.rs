use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use simcore::{
    begin_sim, end_sim, EntityFlags, EntityId, EntityKind, IVec2, MemoryArena, SimRegion,
    SimRegionReport, Vec2, World, WorldObjectKind, WorldPosition, CELL_SIZE, CHUNK_SIZE,
};

use super::specs::WorldObjectSpecs;
use crate::app::config::GameConfig;

/// Tree kinds drawn for scattered trees, forest most common.
const TREE_KIND_TABLE: [WorldObjectKind; 6] = [
    WorldObjectKind::TreeForest,
    WorldObjectKind::TreeForest,
    WorldObjectKind::TreeForest,
    WorldObjectKind::TreeJungle,
    WorldObjectKind::TreeJungle,
    WorldObjectKind::TreeDesert,
];

#[derive(Debug, Clone)]
pub(crate) struct GeneratedWorld {
    pub(crate) player: EntityId,
    pub(crate) pawns: Vec<EntityId>,
    pub(crate) trees_placed: u32,
    pub(crate) gold_deposits_placed: u32,
    pub(crate) placements_skipped: u32,
    pub(crate) report: SimRegionReport,
}

/// Cell containing a region-local point, in global cell coordinates.
pub(crate) fn cell_of(sim: &SimRegion<'_>, p: Vec2) -> IVec2 {
    let point = sim.world_position_of(p).to_point();
    Vec2::new(point.x / CELL_SIZE, point.y / CELL_SIZE).floor()
}

/// Whether a placed world object already stands in `cell` (global cell
/// coordinates). Only entities gathered into `sim` are considered.
pub(crate) fn is_cell_occupied(sim: &SimRegion<'_>, cell: IVec2) -> bool {
    sim.iter().any(|entity| {
        entity.is_set(EntityFlags::HAS_WORLD_PLACEMENT) && cell_of(sim, entity.p) == cell
    })
}

/// Populates an empty world through a single creation region.
pub(crate) fn generate_world(
    world: &mut World,
    frame_arena: &mut MemoryArena,
    config: &GameConfig,
    specs: &WorldObjectSpecs,
) -> GeneratedWorld {
    assert_eq!(
        world.entity_ids_allocated(),
        1,
        "world generation requires an empty world"
    );
    let generation = &config.generation;
    let spread = generation.spread_chunks as i32;
    let spread_units = generation.spread_chunks as f32 * CHUNK_SIZE;
    let mut rng = ChaCha8Rng::seed_from_u64(generation.seed);

    frame_arena.clear();
    let mut sim = begin_sim(
        world,
        frame_arena,
        IVec2::new(-spread - 1, -spread - 1),
        IVec2::new(spread, spread),
        config.creation_region_capacity(),
    );

    add_player(&mut sim, generation.player_spawn);
    for spawn in &generation.pawn_spawns {
        add_pawn(&mut sim, *spawn);
    }

    let mut placements_skipped = 0;
    let mut trees_placed = 0;
    for _ in 0..generation.tree_count {
        let kind = TREE_KIND_TABLE[rng.gen_range(0..TREE_KIND_TABLE.len())];
        if place_world_object(
            &mut sim,
            &mut rng,
            spread_units,
            kind,
            specs,
            generation.max_placement_attempts,
        ) {
            trees_placed += 1;
        } else {
            placements_skipped += 1;
        }
    }
    let mut gold_deposits_placed = 0;
    for _ in 0..generation.gold_deposit_count {
        if place_world_object(
            &mut sim,
            &mut rng,
            spread_units,
            WorldObjectKind::GoldDeposit,
            specs,
            generation.max_placement_attempts,
        ) {
            gold_deposits_placed += 1;
        } else {
            placements_skipped += 1;
        }
    }
    let report = end_sim(sim);

    let mut player = None;
    let mut pawns = Vec::with_capacity(generation.pawn_spawns.len());
    for entity in world.entities() {
        match entity.sim.kind {
            EntityKind::Player if entity.sim.is_set(EntityFlags::IS_ANCHOR) => {
                player = Some(entity.sim.id);
            }
            EntityKind::Pawn => pawns.push(entity.sim.id),
            _ => {}
        }
    }
    let player = player.unwrap_or_else(|| panic!("world generation produced no player"));

    GeneratedWorld {
        player,
        pawns,
        trees_placed,
        gold_deposits_placed,
        placements_skipped,
        report,
    }
}

fn local_point(sim: &SimRegion<'_>, point: Vec2) -> Vec2 {
    sim.local_point(WorldPosition::from_point(point))
}

fn add_player(sim: &mut SimRegion<'_>, point: Vec2) {
    let p = local_point(sim, point);
    let entity = sim.create_entity();
    entity.kind = EntityKind::Player;
    entity.flags = EntityFlags::IS_ANCHOR;
    entity.p = p;
}

fn add_pawn(sim: &mut SimRegion<'_>, point: Vec2) {
    let p = local_point(sim, point);
    let entity = sim.create_entity();
    entity.kind = EntityKind::Pawn;
    entity.p = p;
}

/// Places `kind` at the center of `cell`.
pub(crate) fn add_world_object(
    sim: &mut SimRegion<'_>,
    cell: IVec2,
    kind: WorldObjectKind,
    specs: &WorldObjectSpecs,
) {
    let center = cell.to_vec2() * CELL_SIZE + Vec2::new(CELL_SIZE * 0.5, CELL_SIZE * 0.5);
    let p = local_point(sim, center);
    let entity = sim.create_entity();
    entity.kind = EntityKind::WorldObject;
    entity.flags = EntityFlags::HAS_WORLD_PLACEMENT;
    entity.world_object = Some(kind);
    entity.resource_interactions_left = specs.get(kind).default_resource_interactions;
    entity.p = p;
}

fn place_world_object(
    sim: &mut SimRegion<'_>,
    rng: &mut ChaCha8Rng,
    spread_units: f32,
    kind: WorldObjectKind,
    specs: &WorldObjectSpecs,
    max_attempts: u32,
) -> bool {
    for _ in 0..max_attempts {
        let point = Vec2::new(
            rng.gen_range(-1.0f32..1.0) * spread_units,
            rng.gen_range(-1.0f32..1.0) * spread_units,
        );
        let cell = Vec2::new(point.x / CELL_SIZE, point.y / CELL_SIZE).floor();
        if !is_cell_occupied(sim, cell) {
            add_world_object(sim, cell, kind, specs);
            return true;
        }
    }
    false
}
