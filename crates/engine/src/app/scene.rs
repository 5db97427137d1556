use super::input::{ActionStates, InputAction};
use crate::assets::SpriteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    interact_pressed: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(quit_requested: bool, actions: ActionStates, interact_pressed: bool) -> Self {
        Self {
            quit_requested,
            actions,
            interact_pressed,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    /// Edge-triggered: true only on the tick following the key-down.
    pub fn interact_pressed(&self) -> bool {
        self.interact_pressed
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_interact_pressed(mut self, interact_pressed: bool) -> Self {
        self.interact_pressed = interact_pressed;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

/// World coordinates are pixels of the world image, y pointing down.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// `offset` is added to world coordinates to get screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera2D {
    pub offset: Vec2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderableKind {
    Placeholder([u8; 4]),
    Sprite(String),
}

#[derive(Debug, Clone)]
pub struct RenderableDesc {
    pub kind: RenderableKind,
    pub debug_name: &'static str,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub position: Vec2,
    pub size: Vec2,
    pub renderable: RenderableDesc,
    /// Higher layers draw later. Within a layer, lower feet draw later.
    pub layer: i32,
    pub visible: bool,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialoguePanel {
    pub speaker: String,
    pub text: String,
    pub awaiting_advance: bool,
}

/// Screen-space state drawn over the world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HudState {
    pub stage_label: Option<String>,
    pub hint: Option<String>,
    pub dialogue: Option<DialoguePanel>,
    pub blocking_message: Option<String>,
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    camera: Camera2D,
    background: Option<String>,
    world_size: Option<(u32, u32)>,
    sprites: SpriteStore,
    hud: HudState,
}

impl SceneWorld {
    pub fn spawn(
        &mut self,
        position: Vec2,
        size: Vec2,
        renderable: RenderableDesc,
        layer: i32,
    ) -> EntityId {
        let id = self.allocator.allocate();
        self.entities.push(Entity {
            id,
            position,
            size,
            renderable,
            layer,
            visible: true,
            highlighted: false,
        });
        id
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.camera = Camera2D::default();
        self.background = None;
        self.world_size = None;
        self.hud = HudState::default();
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    pub fn set_background(&mut self, sprite_key: impl Into<String>, world_size: (u32, u32)) {
        self.background = Some(sprite_key.into());
        self.world_size = Some(world_size);
    }

    pub fn background_key(&self) -> Option<&str> {
        self.background.as_deref()
    }

    pub fn world_size(&self) -> Option<(u32, u32)> {
        self.world_size
    }

    pub fn set_sprites(&mut self, sprites: SpriteStore) {
        self.sprites = sprites;
    }

    pub fn sprites(&self) -> &SpriteStore {
        &self.sprites
    }

    pub fn hud(&self) -> &HudState {
        &self.hud
    }

    pub fn hud_mut(&mut self) -> &mut HudState {
        &mut self.hud
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    /// True while the scene ignores gameplay input (modal dialogue, loading).
    fn is_suspended(&self) -> bool {
        false
    }
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

pub(crate) struct SceneRuntime {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneRuntime {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    pub(crate) fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.is_loaded = true;
    }

    pub(crate) fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if !self.is_loaded {
            return SceneCommand::None;
        }
        self.scene.update(fixed_dt_seconds, input, &mut self.world)
    }

    pub(crate) fn shutdown(&mut self) {
        if !self.is_loaded {
            return;
        }
        self.scene.unload(&mut self.world);
        self.world.clear();
        self.is_loaded = false;
    }

    pub(crate) fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub(crate) fn is_suspended(&self) -> bool {
        self.is_loaded && self.scene.is_suspended()
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }
}
