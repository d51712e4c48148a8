use std::cmp::Ordering;

use simcore::{AssetLookup, AssetTag, DrawItem, EntityKind, MemoryArena, SimEntity, SimRegion};

use super::state::GameSession;

#[derive(Debug, Clone, Copy)]
struct SortEntry {
    key: f32,
    entity: SimEntity,
}

/// Frame-arena bytes the draw-list sort scratch takes for a full region.
pub(crate) fn draw_list_scratch_bytes(max_sim_entities: usize) -> usize {
    std::mem::size_of::<SortEntry>() * max_sim_entities + std::mem::align_of::<SortEntry>()
}

/// Draw items for every live region entity, back to front (higher y first).
/// Entities at equal depth keep their region order.
pub(crate) fn build_draw_list(
    session: &GameSession,
    sim: &SimRegion<'_>,
    assets: &dyn AssetLookup,
    frame_arena: &mut MemoryArena,
) -> Vec<DrawItem> {
    let temp = frame_arena.begin_temp();
    let mut entries: Vec<SortEntry> = frame_arena.alloc_vec(sim.entity_count());
    entries.extend(sim.iter().map(|entity| SortEntry {
        key: entity.p.y,
        entity: *entity,
    }));
    entries.sort_by(|a, b| b.key.partial_cmp(&a.key).unwrap_or(Ordering::Equal));

    let draw_list = entries
        .iter()
        .map(|entry| {
            let entity = &entry.entity;
            DrawItem {
                entity: entity.id,
                kind: entity.kind,
                texture: assets.texture_for(asset_tag_for(entity)),
                position: entity.p - session.camera.position,
                selected: !entity.id.is_null() && session.mouse_selected_entity == Some(entity.id),
            }
        })
        .collect();
    frame_arena.end_temp(temp);
    draw_list
}

fn asset_tag_for(entity: &SimEntity) -> AssetTag {
    match entity.kind {
        EntityKind::Player => AssetTag::Player,
        EntityKind::Pawn => AssetTag::Pawn,
        EntityKind::WorldObject => {
            let kind = entity.world_object.unwrap_or_else(|| {
                panic!("world object {:?} has no object kind", entity.id)
            });
            AssetTag::WorldObject(kind)
        }
        EntityKind::None => panic!("entity {:?} has no kind to draw", entity.id),
    }
}
