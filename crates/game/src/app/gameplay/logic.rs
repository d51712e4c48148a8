use simcore::{
    screen_to_world_px, EntityId, EntityKind, InputSnapshot, Interaction, InteractionKind,
    OrderId, SimEntity, SimIndex, SimRegion, Vec2, Viewport,
};
use tracing::{debug, info};

use super::generation::{cell_of, is_cell_occupied};
use super::orders::OrderKind;
use super::specs::{ResourceKind, WorldObjectSpec};
use super::state::GameSession;

pub(crate) const PLAYER_SPEED_UNITS_PER_SECOND: f32 = 16.0;
pub(crate) const PAWN_SPEED_UNITS_PER_SECOND: f32 = 6.0;
pub(crate) const DISTANCE_TO_INTERACT: f32 = 1.0;
pub(crate) const PAWN_FOLLOW_DISTANCE: f32 = 4.0;
pub(crate) const DISTANCE_TO_MOUSE_SELECT: f32 = 0.75;

const DISTANCE_TO_INTERACT_SQ: f32 = DISTANCE_TO_INTERACT * DISTANCE_TO_INTERACT;
const DISTANCE_TO_MOUSE_SELECT_SQ: f32 = DISTANCE_TO_MOUSE_SELECT * DISTANCE_TO_MOUSE_SELECT;

/// Advances gameplay by one frame inside an open region. `dt` is already
/// clamped.
pub(crate) fn update_game(
    session: &mut GameSession,
    sim: &mut SimRegion<'_>,
    input: &InputSnapshot,
    dt: f32,
) {
    session.camera.apply_zoom_steps(input.zoom_delta_steps());

    let followed = session.camera_followed_entity;
    let player = sim.get_entity_by_id(followed).unwrap_or_else(|| {
        panic!("followed entity {followed:?} is outside its own sim region")
    });
    player.p += input.move_axis().normalize_or_zero() * (PLAYER_SPEED_UNITS_PER_SECOND * dt);
    let player_p = player.p;
    session.camera.position = player_p;

    update_mouse_selection(session, sim, input);
    if input.left_click_pressed() {
        queue_order_for_selection(session, sim);
    }

    for pawn_slot in 0..session.pawns.len() {
        let pawn_id = session.pawns[pawn_slot];
        let Some(pawn_index) = sim.index_of(pawn_id) else {
            continue;
        };
        update_pawn(session, sim, pawn_index, player_p, dt);
    }
}

fn update_mouse_selection(session: &mut GameSession, sim: &SimRegion<'_>, input: &InputSnapshot) {
    session.mouse_selected_entity = None;
    session.hovered_cell = None;
    session.hovered_cell_occupied = false;

    let Some(cursor_px) = input.cursor_position_px() else {
        return;
    };
    let viewport = Viewport::from_window_size(input.window_size());
    if viewport.width == 0 || viewport.height == 0 {
        return;
    }
    let mouse_p = screen_to_world_px(cursor_px, &session.camera, viewport);
    let cell = cell_of(sim, mouse_p);
    session.hovered_cell = Some(cell);
    session.hovered_cell_occupied = is_cell_occupied(sim, cell);

    let mut nearest: Option<(f32, EntityId)> = None;
    for entity in sim.iter() {
        if entity.id.is_null() {
            continue;
        }
        let distance_sq = (entity.p - mouse_p).length_sq();
        if distance_sq >= DISTANCE_TO_MOUSE_SELECT_SQ {
            continue;
        }
        if nearest.map_or(true, |(best, _)| distance_sq < best) {
            nearest = Some((distance_sq, entity.id));
        }
    }
    session.mouse_selected_entity = nearest.map(|(_, id)| id);
}

fn queue_order_for_selection(session: &mut GameSession, sim: &SimRegion<'_>) {
    let Some(selected) = session.mouse_selected_entity else {
        return;
    };
    let Some(entity) = sim.entity(selected) else {
        return;
    };
    if entity.kind != EntityKind::WorldObject {
        return;
    }
    let Some(kind) = entity.world_object else {
        return;
    };
    if !session.specs.get(kind).is_resource() {
        return;
    }
    if let Some(order_id) = session.orders.try_to_add_order(OrderKind::Chop, selected) {
        debug!(order = order_id.0, target = selected.0, kind = kind.as_token(), "order_queued");
    }
}

fn update_pawn(
    session: &mut GameSession,
    sim: &mut SimRegion<'_>,
    pawn_index: SimIndex,
    player_p: Vec2,
    dt: f32,
) {
    let mut pawn = *sim.entity_at(pawn_index);
    if pawn.is_deleted() {
        return;
    }

    if pawn.order.is_none() {
        if let Some(order_id) = session.orders.get_pending_order_id() {
            session.orders.set_order_assigned(order_id);
            pawn.order = Some(order_id);
            debug!(pawn = pawn.id.0, order = order_id.0, "order_assigned");
        }
    }

    match pawn.order {
        Some(order_id) => work_order(session, sim, &mut pawn, order_id, dt),
        None => follow(&mut pawn, player_p, dt),
    }
    *sim.entity_at_mut(pawn_index) = pawn;
}

fn work_order(
    session: &mut GameSession,
    sim: &mut SimRegion<'_>,
    pawn: &mut SimEntity,
    order_id: OrderId,
    dt: f32,
) {
    let order = *session
        .orders
        .order(order_id)
        .unwrap_or_else(|| panic!("pawn {:?} holds unknown order {order_id:?}", pawn.id));
    match order.kind {
        OrderKind::Chop => {}
    }

    let Some(target_index) = sim.index_of(order.destination) else {
        session.orders.release_order(order_id);
        clear_order(pawn);
        debug!(
            pawn = pawn.id.0,
            order = order.id.0,
            target = order.destination.0,
            "order_released"
        );
        return;
    };
    let target = *sim.entity_at(target_index);
    if target.is_deleted() {
        session.orders.disband_order(order_id);
        clear_order(pawn);
        return;
    }

    let kind = target.world_object.unwrap_or_else(|| {
        panic!("order {order_id:?} targets {:?}, which is not a world object", target.id)
    });
    let spec = *session.specs.get(kind);
    if !spec.is_resource() {
        panic!("orders against building {kind:?} are not implemented");
    }

    let to_target = target.p - pawn.p;
    if to_target.length_sq() > DISTANCE_TO_INTERACT_SQ {
        let step = (PAWN_SPEED_UNITS_PER_SECOND * dt).min(to_target.length());
        pawn.p += to_target.normalize_or_zero() * step;
        return;
    }
    update_interaction(session, sim, pawn, order_id, target_index, &spec, dt);
}

fn update_interaction(
    session: &mut GameSession,
    sim: &mut SimRegion<'_>,
    pawn: &mut SimEntity,
    order_id: OrderId,
    target_index: SimIndex,
    spec: &WorldObjectSpec,
    dt: f32,
) {
    let target_id = sim.entity_at(target_index).id;
    if !pawn.interaction.is_active() || pawn.interaction.target != target_id {
        pawn.interaction = Interaction {
            kind: Some(InteractionKind::MineResource),
            target: target_id,
            time: spec.interaction_time_seconds,
            current_time: 0.0,
        };
    }
    pawn.interaction.current_time += dt;
    if pawn.interaction.current_time > pawn.interaction.time {
        complete_interaction(session, sim, pawn, order_id, target_index, spec);
    }
}

fn complete_interaction(
    session: &mut GameSession,
    sim: &mut SimRegion<'_>,
    pawn: &mut SimEntity,
    order_id: OrderId,
    target_index: SimIndex,
    spec: &WorldObjectSpec,
) {
    let target = sim.entity_at_mut(target_index);
    target.resource_interactions_left = target.resource_interactions_left.saturating_sub(1);
    match spec.resource_kind {
        Some(ResourceKind::Wood) => session.wood_count += spec.resource_gain,
        Some(ResourceKind::Gold) => session.gold_count += spec.resource_gain,
        None => {}
    }

    if target.resource_interactions_left > 0 {
        pawn.interaction.current_time = 0.0;
        return;
    }
    target.mark_deleted();
    info!(
        target = target.id.0,
        pawn = pawn.id.0,
        wood = session.wood_count,
        gold = session.gold_count,
        "resource_depleted"
    );
    session.orders.disband_order(order_id);
    clear_order(pawn);
}

fn clear_order(pawn: &mut SimEntity) {
    pawn.order = None;
    pawn.interaction = Interaction::default();
}

fn follow(pawn: &mut SimEntity, player_p: Vec2, dt: f32) {
    let to_player = player_p - pawn.p;
    let distance = to_player.length();
    if distance <= PAWN_FOLLOW_DISTANCE {
        return;
    }
    let step = (PAWN_SPEED_UNITS_PER_SECOND * dt).min(distance - PAWN_FOLLOW_DISTANCE);
    pawn.p += to_player.normalize_or_zero() * step;
}
