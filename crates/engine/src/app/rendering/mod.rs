mod renderer;
mod text;
mod transform;

pub use renderer::{RenderError, Renderer};
pub use transform::{follow_camera, world_to_screen_px, Viewport};
