use simcore::{
    begin_sim, end_sim, AssetLookup, Camera2D, DrawItem, EntityId, IVec2, InputSnapshot,
    MemoryArena, SimRegionReport, World,
};
use tracing::info;

use super::generation::generate_world;
use super::logic::update_game;
use super::orders::OrderSystem;
use super::render::build_draw_list;
use super::specs::WorldObjectSpecs;
use crate::app::config::{GameConfig, SimConfig};

pub(crate) const MIN_FRAME_DT_SECONDS: f32 = 0.001;
pub(crate) const MAX_FRAME_DT_SECONDS: f32 = 0.1;

/// Gameplay state that lives outside the chunk store and survives between
/// frames.
#[derive(Debug)]
pub(crate) struct GameSession {
    pub(crate) specs: WorldObjectSpecs,
    pub(crate) orders: OrderSystem,
    pub(crate) camera: Camera2D,
    pub(crate) camera_followed_entity: EntityId,
    pub(crate) pawns: Vec<EntityId>,
    pub(crate) mouse_selected_entity: Option<EntityId>,
    pub(crate) hovered_cell: Option<IVec2>,
    pub(crate) hovered_cell_occupied: bool,
    pub(crate) wood_count: u32,
    pub(crate) gold_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DebugStats {
    pub(crate) chunks_allocated: usize,
    pub(crate) entity_blocks_allocated: usize,
    pub(crate) free_entity_blocks: usize,
    pub(crate) entity_ids_allocated: usize,
    pub(crate) sim_entity_count: usize,
    pub(crate) sim_chunk_count: usize,
    pub(crate) orders_allocated: usize,
    pub(crate) pending_orders: usize,
    pub(crate) wood_count: u32,
    pub(crate) gold_count: u32,
    pub(crate) mouse_selected_entity: Option<EntityId>,
    pub(crate) hovered_cell: Option<IVec2>,
    pub(crate) hovered_cell_occupied: bool,
    pub(crate) player_chunk: IVec2,
}

#[derive(Debug, Clone)]
pub(crate) struct FrameOutput {
    pub(crate) draw_list: Vec<DrawItem>,
    pub(crate) report: SimRegionReport,
    pub(crate) stats: DebugStats,
    pub(crate) camera: Camera2D,
    pub(crate) quit_requested: bool,
}

#[derive(Debug)]
pub(crate) struct GameState {
    world: World,
    frame_arena: MemoryArena,
    sim_config: SimConfig,
    session: GameSession,
}

impl GameState {
    pub(crate) fn new(config: &GameConfig) -> Self {
        let mut world = World::new(
            MemoryArena::new("world", config.world.world_arena_bytes),
            config.world.max_entity_count,
        );
        let mut frame_arena = MemoryArena::new("frame", config.world.frame_arena_bytes);
        let specs = WorldObjectSpecs::with_overrides(&config.world_objects);
        let generated = generate_world(&mut world, &mut frame_arena, config, &specs);
        info!(
            seed = config.generation.seed,
            entities = generated.report.created,
            trees = generated.trees_placed,
            gold_deposits = generated.gold_deposits_placed,
            placements_skipped = generated.placements_skipped,
            pawns = generated.pawns.len(),
            chunks = world.chunks_allocated(),
            entity_blocks = world.entity_blocks_allocated(),
            world_arena_bytes = world.arena().data_size(),
            "world_generated"
        );

        Self {
            world,
            frame_arena,
            sim_config: config.sim.clone(),
            session: GameSession {
                specs,
                orders: OrderSystem::default(),
                camera: Camera2D::default(),
                camera_followed_entity: generated.player,
                pawns: generated.pawns,
                mouse_selected_entity: None,
                hovered_cell: None,
                hovered_cell_occupied: false,
                wood_count: 0,
                gold_count: 0,
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> &GameSession {
        &self.session
    }

    #[cfg(test)]
    pub(crate) fn frame_arena(&self) -> &MemoryArena {
        &self.frame_arena
    }

    #[cfg(test)]
    pub(crate) fn player_position(&self) -> simcore::WorldPosition {
        self.world
            .get_world_entity(self.session.camera_followed_entity)
            .world_pos
    }

    /// Runs one frame: opens a region around the followed entity, updates
    /// gameplay, assembles the draw list and writes the region back.
    pub(crate) fn update_and_render(
        &mut self,
        input: &InputSnapshot,
        assets: &dyn AssetLookup,
    ) -> FrameOutput {
        let dt = clamp_frame_dt(input.frame_dt_seconds());
        let Self {
            world,
            frame_arena,
            sim_config,
            session,
        } = self;

        frame_arena.clear();
        let center = world
            .get_world_entity(session.camera_followed_entity)
            .world_pos
            .chunk;
        let radius = sim_config.region_chunk_radius as i32;
        let extent = IVec2::new(radius, radius);
        let mut sim = begin_sim(
            world,
            frame_arena,
            center - extent,
            center + extent,
            sim_config.max_sim_entities,
        );
        let sim_chunk_count = sim.chunk_count();

        update_game(session, &mut sim, input, dt);
        let draw_list = build_draw_list(session, &sim, assets, frame_arena);
        let report = end_sim(sim);

        let stats = DebugStats {
            chunks_allocated: world.chunks_allocated(),
            entity_blocks_allocated: world.entity_blocks_allocated(),
            free_entity_blocks: world.free_entity_blocks(),
            entity_ids_allocated: world.entity_ids_allocated(),
            sim_entity_count: report.entity_count,
            sim_chunk_count,
            orders_allocated: session.orders.orders_allocated(),
            pending_orders: session.orders.pending_count(),
            wood_count: session.wood_count,
            gold_count: session.gold_count,
            mouse_selected_entity: session.mouse_selected_entity,
            hovered_cell: session.hovered_cell,
            hovered_cell_occupied: session.hovered_cell_occupied,
            player_chunk: world
                .get_world_entity(session.camera_followed_entity)
                .world_pos
                .chunk,
        };

        FrameOutput {
            draw_list,
            report,
            stats,
            camera: session.camera,
            quit_requested: input.quit_requested(),
        }
    }

    #[cfg(test)]
    pub(crate) fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    /// Drops a world object straight into the chunk store, outside any region.
    #[cfg(test)]
    pub(crate) fn spawn_world_object(
        &mut self,
        point: simcore::Vec2,
        kind: simcore::WorldObjectKind,
    ) -> EntityId {
        let id = self.world.add_world_entity(simcore::WorldPosition::from_point(point));
        let entity = self.world.get_world_entity_mut(id);
        entity.sim.kind = simcore::EntityKind::WorldObject;
        entity.sim.flags = simcore::EntityFlags::HAS_WORLD_PLACEMENT;
        entity.sim.world_object = Some(kind);
        entity.sim.resource_interactions_left =
            self.session.specs.get(kind).default_resource_interactions;
        id
    }
}

pub(crate) fn clamp_frame_dt(dt: f32) -> f32 {
    if !dt.is_finite() {
        return MIN_FRAME_DT_SECONDS;
    }
    dt.clamp(MIN_FRAME_DT_SECONDS, MAX_FRAME_DT_SECONDS)
}
