use crate::math::Vec2;

pub const PIXELS_PER_WORLD: f32 = 32.0;

pub const CAMERA_ZOOM_DEFAULT: f32 = 1.0;
pub const CAMERA_ZOOM_MIN: f32 = 0.5;
pub const CAMERA_ZOOM_MAX: f32 = 2.0;
pub const CAMERA_ZOOM_STEP: f32 = 0.1;

/// Top-down follow camera. `position` is in the same space as the points it
/// projects; the frame driver keeps it in sim-region-local coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: CAMERA_ZOOM_DEFAULT,
        }
    }
}

impl Camera2D {
    pub fn effective_zoom(&self) -> f32 {
        clamp_camera_zoom(self.zoom)
    }

    pub fn set_zoom_clamped(&mut self, zoom: f32) {
        self.zoom = clamp_camera_zoom(zoom);
    }

    pub fn apply_zoom_steps(&mut self, steps: i32) {
        if steps == 0 {
            return;
        }
        let target_zoom = self.zoom + steps as f32 * CAMERA_ZOOM_STEP;
        self.set_zoom_clamped(target_zoom);
    }

    fn pixels_per_world(&self) -> f32 {
        PIXELS_PER_WORLD * self.effective_zoom()
    }
}

fn clamp_camera_zoom(zoom: f32) -> f32 {
    if !zoom.is_finite() {
        return CAMERA_ZOOM_DEFAULT;
    }
    zoom.clamp(CAMERA_ZOOM_MIN, CAMERA_ZOOM_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn from_window_size(window_size: (u32, u32)) -> Self {
        Self {
            width: window_size.0,
            height: window_size.1,
        }
    }
}

/// Screen y grows downward; world y grows upward.
pub fn world_to_screen_px(world: Vec2, camera: &Camera2D, viewport: Viewport) -> Vec2 {
    let pixels_per_world = camera.pixels_per_world();
    Vec2::new(
        (world.x - camera.position.x) * pixels_per_world + viewport.width as f32 * 0.5,
        viewport.height as f32 * 0.5 - (world.y - camera.position.y) * pixels_per_world,
    )
}

pub fn screen_to_world_px(screen: Vec2, camera: &Camera2D, viewport: Viewport) -> Vec2 {
    let pixels_per_world = camera.pixels_per_world();
    Vec2::new(
        (screen.x - viewport.width as f32 * 0.5) / pixels_per_world + camera.position.x,
        (viewport.height as f32 * 0.5 - screen.y) / pixels_per_world + camera.position.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport {
        width: 800,
        height: 600,
    };

    fn assert_vec2_close(actual: Vec2, expected: Vec2) {
        assert!(
            (actual.x - expected.x).abs() < 1e-4 && (actual.y - expected.y).abs() < 1e-4,
            "{actual:?} vs {expected:?}"
        );
    }

    #[test]
    fn camera_position_maps_to_viewport_center() {
        let camera = Camera2D {
            position: Vec2::new(3.0, -2.0),
            ..Camera2D::default()
        };
        assert_vec2_close(
            world_to_screen_px(camera.position, &camera, VIEWPORT),
            Vec2::new(400.0, 300.0),
        );
    }

    #[test]
    fn camera_offset_shifts_screen_position() {
        let camera = Camera2D {
            position: Vec2::new(10.0, -5.0),
            zoom: 0.5,
        };
        let screen = world_to_screen_px(Vec2::new(12.0, -4.0), &camera, VIEWPORT);
        assert_vec2_close(screen, Vec2::new(432.0, 284.0));
    }

    #[test]
    fn screen_to_world_inverts_projection() {
        let camera = Camera2D {
            position: Vec2::new(-7.5, 2.25),
            zoom: 1.7,
        };
        let world = Vec2::new(-3.0, 8.0);
        let screen = world_to_screen_px(world, &camera, VIEWPORT);
        assert_vec2_close(screen_to_world_px(screen, &camera, VIEWPORT), world);
    }

    #[test]
    fn zoom_steps_are_clamped() {
        let mut camera = Camera2D::default();
        camera.apply_zoom_steps(50);
        assert_eq!(camera.zoom, CAMERA_ZOOM_MAX);
        camera.apply_zoom_steps(-50);
        assert_eq!(camera.zoom, CAMERA_ZOOM_MIN);
        camera.set_zoom_clamped(f32::NAN);
        assert_eq!(camera.zoom, CAMERA_ZOOM_DEFAULT);
    }
}
