mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::LoopStatsSnapshot;
pub use rendering::{follow_camera, world_to_screen_px, RenderError, Renderer, Viewport};
pub use scene::{
    Camera2D, DialoguePanel, Entity, EntityId, HudState, InputSnapshot, RenderableDesc,
    RenderableKind, Scene, SceneCommand, SceneWorld, Vec2,
};
