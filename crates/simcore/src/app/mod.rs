mod camera;
mod draw;
mod input;

pub use camera::{
    screen_to_world_px, world_to_screen_px, Camera2D, Viewport, CAMERA_ZOOM_DEFAULT,
    CAMERA_ZOOM_MAX, CAMERA_ZOOM_MIN, CAMERA_ZOOM_STEP, PIXELS_PER_WORLD,
};
pub use draw::{AssetLookup, AssetTag, DrawItem, SpriteAtlas, SpriteKeyError, TextureHandle};
pub use input::{InputAction, InputSnapshot};
