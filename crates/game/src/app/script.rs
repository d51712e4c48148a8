use std::cmp::Ordering;

use simcore::{
    world_to_screen_px, Camera2D, EntityKind, InputAction, InputSnapshot, Vec2, Viewport,
};

use super::config::ScriptConfig;
use super::gameplay::FrameOutput;

const WALK_CYCLE: [InputAction; 4] = [
    InputAction::MoveRight,
    InputAction::MoveUp,
    InputAction::MoveLeft,
    InputAction::MoveDown,
];

/// Synthesizes per-frame input for headless runs: the player walks a square
/// and periodically clicks the nearest world object visible last frame.
#[derive(Debug)]
pub(crate) struct ScriptedInput {
    walk_leg_frames: u32,
    click_interval_frames: u32,
    window_size: (u32, u32),
    frame_dt_seconds: f32,
    frame: u64,
}

impl ScriptedInput {
    pub(crate) fn new(
        config: &ScriptConfig,
        window_size: (u32, u32),
        frame_dt_seconds: f32,
    ) -> Self {
        Self {
            walk_leg_frames: config.walk_leg_frames,
            click_interval_frames: config.click_interval_frames,
            window_size,
            frame_dt_seconds,
            frame: 0,
        }
    }

    pub(crate) fn next_input(&mut self, previous: Option<&FrameOutput>) -> InputSnapshot {
        let frame = self.frame;
        self.frame = self.frame.saturating_add(1);

        let mut input = InputSnapshot::empty()
            .with_window_size(self.window_size)
            .with_frame_dt_seconds(self.frame_dt_seconds);
        if self.walk_leg_frames > 0 {
            let leg = (frame / self.walk_leg_frames as u64) as usize % WALK_CYCLE.len();
            input = input.with_action_down(WALK_CYCLE[leg], true);
        }

        let interval = self.click_interval_frames as u64;
        if interval == 0 || frame == 0 || frame % interval != 0 {
            return input;
        }
        let viewport = Viewport::from_window_size(self.window_size);
        match previous.and_then(|output| nearest_world_object_px(output, viewport)) {
            Some(cursor_px) => input
                .with_cursor_position_px(Some(cursor_px))
                .with_left_click_pressed(true),
            None => input,
        }
    }
}

/// Screen position of the on-screen world object closest to the camera.
fn nearest_world_object_px(output: &FrameOutput, viewport: Viewport) -> Option<Vec2> {
    // Draw positions are already camera-relative.
    let camera = Camera2D {
        position: Vec2::ZERO,
        zoom: output.camera.zoom,
    };
    output
        .draw_list
        .iter()
        .filter(|item| item.kind == EntityKind::WorldObject)
        .map(|item| {
            let px = world_to_screen_px(item.position, &camera, viewport);
            (item.position.length_sq(), px)
        })
        .filter(|(_, px)| is_on_screen(*px, viewport))
        .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal))
        .map(|(_, px)| px)
}

fn is_on_screen(px: Vec2, viewport: Viewport) -> bool {
    px.x >= 0.0 && px.y >= 0.0 && px.x < viewport.width as f32 && px.y < viewport.height as f32
}
