use std::path::PathBuf;

use engine::{
    follow_camera, AssetCategory, AssetLoadError, AssetReadiness, CollisionMap, EntityId,
    InputSnapshot, MarkerColor, RenderableDesc, RenderableKind, Scene, SceneCommand, SceneWorld,
    SpriteStore, Viewport,
};
use tracing::{error, info};

use super::dialogue::{DialogueBox, DialogueLine};
use super::dispatch::QuestDispatch;
use super::player::PlayerController;
use super::quest::QuestStage;
use super::registry::Target;
use super::session::{GameSession, SessionEvent, SessionSetup};
use super::world_objects::{
    sprite_keys_by_category, BACKGROUND_SPRITE_KEY, CLOSING_LINES, COLLISION_SPRITE_KEY,
    PLAYER_SIZE, PLAYER_SPAWN, QUEST_GIVER_NAME,
};

const HINT_SECONDS: f32 = 3.0;
const INTERACT_PROMPT: &str = "Press E to interact";
const WORLD_LAYER: i32 = 1;

const REQUIRED_CATEGORIES: [AssetCategory; 6] = [
    AssetCategory::World,
    AssetCategory::Player,
    AssetCategory::Npc,
    AssetCategory::Item,
    AssetCategory::Prop,
    AssetCategory::Collision,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScenePhase {
    Loading,
    Running,
    LoadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndingState {
    Waiting,
    ClosingLines,
    InputRequested,
}

pub(crate) struct RoseScene {
    sprites_root: PathBuf,
    viewport: Viewport,
    pending_setup: Option<(SessionSetup, Box<dyn QuestDispatch>)>,
    phase: ScenePhase,
    session: Option<GameSession>,
    collision: CollisionMap,
    player: PlayerController,
    dialogue: DialogueBox,
    hint: Option<(String, f32)>,
    ending: EndingState,
    player_entity: Option<EntityId>,
    object_entities: Vec<EntityId>,
    npc_entities: Vec<EntityId>,
    events: Vec<SessionEvent>,
}

impl RoseScene {
    pub(crate) fn new(
        sprites_root: PathBuf,
        viewport: Viewport,
        setup: SessionSetup,
        dispatch: Box<dyn QuestDispatch>,
    ) -> Self {
        Self {
            sprites_root,
            viewport,
            pending_setup: Some((setup, dispatch)),
            phase: ScenePhase::Loading,
            session: None,
            collision: CollisionMap::Unloaded {
                reason: "not loaded yet".to_string(),
            },
            player: PlayerController::new(PLAYER_SPAWN, PLAYER_SIZE),
            dialogue: DialogueBox::default(),
            hint: None,
            ending: EndingState::Waiting,
            player_entity: None,
            object_entities: Vec::new(),
            npc_entities: Vec::new(),
            events: Vec::new(),
        }
    }

    pub(crate) fn phase(&self) -> ScenePhase {
        self.phase
    }

    pub(crate) fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub(crate) fn player(&self) -> &PlayerController {
        &self.player
    }

    pub(crate) fn dialogue(&self) -> &DialogueBox {
        &self.dialogue
    }

    /// Decodes every sprite category and the collision mask. Any failure is
    /// final for this run.
    fn load_assets(
        &mut self,
        world: &mut SceneWorld,
        setup: &SessionSetup,
    ) -> Result<(u32, u32), AssetLoadError> {
        let mut readiness = AssetReadiness::expecting(&REQUIRED_CATEGORIES);
        let mut store = SpriteStore::new(self.sprites_root.clone());
        for (category, keys) in sprite_keys_by_category(&setup.objects, &setup.npcs) {
            store.preload_category(category, keys, &mut readiness)?;
        }

        let (world_width, world_height) = store
            .get(BACKGROUND_SPRITE_KEY)
            .map(|sprite| (sprite.width, sprite.height))
            .unwrap_or_default();

        let collision_path = self.sprites_root.join(format!("{COLLISION_SPRITE_KEY}.png"));
        let collision = CollisionMap::build(&collision_path, MarkerColor::WALKABLE);
        match collision.dimensions() {
            None => {
                let reason = collision.load_error().unwrap_or("unknown").to_string();
                readiness.mark_failed(AssetCategory::Collision, reason.clone());
                return Err(AssetLoadError::Collision { reason });
            }
            Some((mask_width, mask_height))
                if (mask_width, mask_height) != (world_width, world_height) =>
            {
                let error = AssetLoadError::DimensionMismatch {
                    mask_width,
                    mask_height,
                    world_width,
                    world_height,
                };
                readiness.mark_failed(AssetCategory::Collision, error.to_string());
                return Err(error);
            }
            Some(_) => readiness.mark_loaded(AssetCategory::Collision),
        }

        info!(
            ready = readiness.is_ready(),
            sprites = store.len(),
            "scene_assets_loaded"
        );
        self.collision = collision;
        world.set_sprites(store);
        world.set_background(BACKGROUND_SPRITE_KEY, (world_width, world_height));
        Ok((world_width, world_height))
    }

    fn spawn_entities(&mut self, world: &mut SceneWorld, session: &GameSession) {
        let registry = session.registry();
        self.object_entities = registry
            .objects()
            .iter()
            .map(|object| {
                world.spawn(
                    object.position,
                    object.size,
                    sprite(object.sprite_key, object.id),
                    WORLD_LAYER,
                )
            })
            .collect();
        self.npc_entities = registry
            .npcs()
            .iter()
            .map(|npc| {
                world.spawn(
                    npc.position,
                    npc.size,
                    sprite(npc.sprite_key, npc.id),
                    WORLD_LAYER,
                )
            })
            .collect();
        self.player_entity = Some(world.spawn(
            self.player.position(),
            PLAYER_SIZE,
            sprite(self.player.sprite_key(), "player"),
            WORLD_LAYER,
        ));
    }

    fn pump_events(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.drain_events(&mut self.events);
        for event in self.events.drain(..) {
            match event {
                SessionEvent::Dialogue(lines) => {
                    self.dialogue.enqueue(lines);
                    self.player.halt();
                }
                SessionEvent::Guidance(text) => {
                    self.hint = Some((text, HINT_SECONDS));
                }
                SessionEvent::AllDelivered => {
                    self.ending = EndingState::ClosingLines;
                    self.dialogue.enqueue(
                        CLOSING_LINES
                            .iter()
                            .map(|text| DialogueLine::new(QUEST_GIVER_NAME, *text)),
                    );
                    self.player.halt();
                }
                SessionEvent::CompanionScreen(_)
                | SessionEvent::StageChanged { .. }
                | SessionEvent::Collected(_)
                | SessionEvent::Delivered(_) => {}
            }
        }
    }

    fn step_gameplay(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.update();
        self.pump_events();

        self.dialogue.update(fixed_dt_seconds);
        if self.dialogue.is_idle() {
            self.player.update(input, fixed_dt_seconds, &self.collision);
            if input.interact_pressed() {
                if let Some(session) = self.session.as_mut() {
                    session.interact(self.player.position());
                }
            }
        } else if input.interact_pressed() {
            self.dialogue.advance();
        }
        self.pump_events();

        let dialogue_idle = self.dialogue.is_idle();
        if let Some(session) = self.session.as_mut() {
            session.poll_terminal(dialogue_idle);
        }
        self.pump_events();

        if self.ending == EndingState::ClosingLines && self.dialogue.is_idle() {
            if let Some(session) = self.session.as_mut() {
                if session.stage() < QuestStage::RequestInput {
                    session.request_input();
                }
            }
            self.ending = EndingState::InputRequested;
        }

        if let Some((_, remaining)) = self.hint.as_mut() {
            *remaining -= fixed_dt_seconds;
            if *remaining <= 0.0 {
                self.hint = None;
            }
        }
    }

    fn sync_world(&self, world: &mut SceneWorld) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let registry = session.registry();
        let focus = if self.dialogue.is_idle() {
            registry.nearest_eligible(self.player.position())
        } else {
            None
        };

        for (index, id) in self.object_entities.iter().enumerate() {
            if let Some(entity) = world.find_entity_mut(*id) {
                entity.visible = registry.is_object_active(index);
                entity.highlighted = focus == Some(Target::Object(index));
            }
        }
        for (index, id) in self.npc_entities.iter().enumerate() {
            if let Some(entity) = world.find_entity_mut(*id) {
                entity.visible = registry.is_npc_present();
                entity.highlighted = focus == Some(Target::Npc(index));
            }
        }
        if let Some(entity) = self.player_entity.and_then(|id| world.find_entity_mut(id)) {
            entity.position = self.player.position();
            entity.renderable.kind = RenderableKind::Sprite(self.player.sprite_key().to_string());
        }

        if let Some(world_size) = world.world_size() {
            *world.camera_mut() = follow_camera(self.player.position(), self.viewport, world_size);
        }

        let hud = world.hud_mut();
        hud.stage_label = Some(session.stage().label().to_string());
        hud.dialogue = self.dialogue.panel();
        hud.hint = match (&self.hint, focus) {
            (Some((text, _)), _) => Some(text.clone()),
            (None, Some(_)) => Some(INTERACT_PROMPT.to_string()),
            (None, None) => None,
        };
    }
}

impl Scene for RoseScene {
    fn load(&mut self, world: &mut SceneWorld) {
        let Some((setup, dispatch)) = self.pending_setup.take() else {
            return;
        };
        match self.load_assets(world, &setup) {
            Ok((width, height)) => {
                let session = GameSession::open(setup, dispatch);
                self.spawn_entities(world, &session);
                info!(
                    world_width = width,
                    world_height = height,
                    stage = session.stage().as_token(),
                    entities = world.entity_count(),
                    "scene_ready"
                );
                self.session = Some(session);
                self.phase = ScenePhase::Running;
                self.pump_events();
                self.sync_world(world);
            }
            Err(load_error) => {
                error!(error = %load_error, "asset_load_failed");
                self.phase = ScenePhase::LoadFailed;
                world.hud_mut().blocking_message =
                    Some(format!("The game could not load.\n{load_error}"));
            }
        }
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        if self.phase != ScenePhase::Running {
            return SceneCommand::None;
        }
        self.step_gameplay(fixed_dt_seconds, input);
        self.sync_world(world);
        SceneCommand::None
    }

    fn unload(&mut self, _world: &mut SceneWorld) {
        if let Some(session) = self.session.take() {
            info!(stage = session.stage().as_token(), "scene_unloaded");
        }
    }

    fn is_suspended(&self) -> bool {
        self.phase != ScenePhase::Running || !self.dialogue.is_idle()
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        let session = self.session.as_ref()?;
        let position = self.player.position();
        Some(format!(
            "rose | {} | {:.0},{:.0} {}",
            session.stage().as_token(),
            position.x,
            position.y,
            self.player.facing_token()
        ))
    }
}

fn sprite(key: &'static str, debug_name: &'static str) -> RenderableDesc {
    RenderableDesc {
        kind: RenderableKind::Sprite(key.to_string()),
        debug_name,
    }
}
