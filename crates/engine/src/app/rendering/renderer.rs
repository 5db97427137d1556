use std::collections::HashSet;
use std::sync::Arc;

use pixels::{Pixels, SurfaceTexture};
use thiserror::Error;
use tracing::warn;
use winit::window::Window;

use crate::app::{Camera2D, Entity, HudState, RenderableKind, SceneWorld, Vec2};
use crate::assets::SpriteStore;

use super::text::{text_width_px, wrap_text, Canvas, GLYPH_ADVANCE, GLYPH_HEIGHT, LINE_ADVANCE, TEXT_SCALE};
use super::{world_to_screen_px, Viewport};

const CLEAR_COLOR: [u8; 4] = [14, 16, 22, 255];
const MISSING_SPRITE_COLOR: [u8; 4] = [255, 0, 255, 255];
const HIGHLIGHT_COLOR: [u8; 4] = [255, 226, 92, 255];
const HIGHLIGHT_PADDING_PX: i32 = 2;
const PANEL_BG_COLOR: [u8; 4] = [10, 12, 16, 215];
const PANEL_BORDER_COLOR: [u8; 4] = [92, 106, 126, 255];
const TEXT_COLOR: [u8; 4] = [244, 248, 252, 255];
const SPEAKER_COLOR: [u8; 4] = [255, 176, 196, 255];
const HINT_COLOR: [u8; 4] = [176, 198, 220, 255];
const BLOCKING_BG_COLOR: [u8; 4] = [6, 6, 10, 255];
const PANEL_MARGIN_PX: i32 = 6;
const PANEL_PADDING_PX: i32 = 6;
const DIALOGUE_TEXT_LINES: i32 = 3;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create frame buffer: {0}")]
    Pixels(#[from] pixels::Error),
    #[error("failed to resize window surface: {0}")]
    Surface(#[from] pixels::TextureError),
}

/// Draws a `SceneWorld` into a fixed-size logical frame buffer that pixels
/// scales onto the window surface.
pub struct Renderer {
    pixels: Pixels<'static>,
    viewport: Viewport,
    draw_order: Vec<usize>,
    warned_missing_sprite_keys: HashSet<String>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, viewport: Viewport) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width.max(1), size.height.max(1), window);
        let pixels = Pixels::new(viewport.width.max(1), viewport.height.max(1), surface)?;
        Ok(Self {
            pixels,
            viewport,
            draw_order: Vec::new(),
            warned_missing_sprite_keys: HashSet::new(),
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)?;
        Ok(())
    }

    pub fn render(&mut self, world: &SceneWorld) -> Result<(), RenderError> {
        let Viewport { width, height } = self.viewport;
        let mut canvas = Canvas::new(self.pixels.frame_mut(), width, height);
        draw_world(
            &mut canvas,
            world,
            &mut self.draw_order,
            &mut self.warned_missing_sprite_keys,
        );
        self.pixels.render()?;
        Ok(())
    }
}

fn draw_world(
    canvas: &mut Canvas<'_>,
    world: &SceneWorld,
    draw_order: &mut Vec<usize>,
    warned_missing: &mut HashSet<String>,
) {
    canvas.clear(CLEAR_COLOR);
    let camera = world.camera();

    if let Some(sprite) = world.background_key().and_then(|key| world.sprites().get(key)) {
        let (x, y) = world_to_screen_px(camera, Vec2::default());
        canvas.blit(x, y, sprite.width, sprite.height, &sprite.rgba);
    }

    collect_draw_order(world.entities(), draw_order);
    for index in draw_order.iter().copied() {
        draw_entity(
            canvas,
            camera,
            &world.entities()[index],
            world.sprites(),
            warned_missing,
        );
    }

    draw_hud(canvas, world.hud());
}

/// Visible entities by layer, then by the y of their bottom edge so lower
/// objects overlap higher ones. Ties fall back to spawn order.
fn collect_draw_order(entities: &[Entity], out: &mut Vec<usize>) {
    out.clear();
    out.extend(
        entities
            .iter()
            .enumerate()
            .filter(|(_, entity)| entity.visible)
            .map(|(index, _)| index),
    );
    out.sort_by(|a, b| {
        let (a, b) = (&entities[*a], &entities[*b]);
        a.layer
            .cmp(&b.layer)
            .then_with(|| (a.position.y + a.size.y).total_cmp(&(b.position.y + b.size.y)))
            .then_with(|| a.id.0.cmp(&b.id.0))
    });
}

fn draw_entity(
    canvas: &mut Canvas<'_>,
    camera: &Camera2D,
    entity: &Entity,
    sprites: &SpriteStore,
    warned_missing: &mut HashSet<String>,
) {
    let (x, y) = world_to_screen_px(camera, entity.position);
    let (w, h) = (entity.size.x.round() as i32, entity.size.y.round() as i32);
    match &entity.renderable.kind {
        RenderableKind::Sprite(key) => match sprites.get(key) {
            Some(sprite) => canvas.blit(x, y, sprite.width, sprite.height, &sprite.rgba),
            None => {
                if warned_missing.insert(key.clone()) {
                    warn!(sprite_key = %key, entity = entity.renderable.debug_name, "sprite_missing_at_draw");
                }
                canvas.fill_rect(x, y, w, h, MISSING_SPRITE_COLOR);
            }
        },
        RenderableKind::Placeholder(color) => canvas.fill_rect(x, y, w, h, *color),
    }

    if entity.highlighted {
        canvas.outline_rect(
            x - HIGHLIGHT_PADDING_PX,
            y - HIGHLIGHT_PADDING_PX,
            w + HIGHLIGHT_PADDING_PX * 2,
            h + HIGHLIGHT_PADDING_PX * 2,
            HIGHLIGHT_COLOR,
        );
    }
}

fn draw_hud(canvas: &mut Canvas<'_>, hud: &HudState) {
    if let Some(message) = &hud.blocking_message {
        draw_blocking_message(canvas, message);
        return;
    }

    let text_height = GLYPH_HEIGHT * TEXT_SCALE;
    if let Some(label) = &hud.stage_label {
        let panel_w = text_width_px(label) + PANEL_PADDING_PX * 2;
        let panel_h = text_height + PANEL_PADDING_PX * 2;
        draw_panel(canvas, PANEL_MARGIN_PX, PANEL_MARGIN_PX, panel_w, panel_h);
        canvas.draw_text(
            PANEL_MARGIN_PX + PANEL_PADDING_PX,
            PANEL_MARGIN_PX + PANEL_PADDING_PX,
            label,
            TEXT_COLOR,
        );
    }

    match &hud.dialogue {
        Some(dialogue) => {
            let panel_w = canvas.width() as i32 - PANEL_MARGIN_PX * 2;
            let panel_h = LINE_ADVANCE * (DIALOGUE_TEXT_LINES + 1) + PANEL_PADDING_PX * 2;
            let panel_x = PANEL_MARGIN_PX;
            let panel_y = canvas.height() as i32 - PANEL_MARGIN_PX - panel_h;
            draw_panel(canvas, panel_x, panel_y, panel_w, panel_h);

            let text_x = panel_x + PANEL_PADDING_PX;
            let mut text_y = panel_y + PANEL_PADDING_PX;
            canvas.draw_text(text_x, text_y, &dialogue.speaker, SPEAKER_COLOR);
            let max_chars = ((panel_w - PANEL_PADDING_PX * 2) / GLYPH_ADVANCE).max(1) as usize;
            for line in wrap_text(&dialogue.text, max_chars)
                .iter()
                .take(DIALOGUE_TEXT_LINES as usize)
            {
                text_y += LINE_ADVANCE;
                canvas.draw_text(text_x, text_y, line, TEXT_COLOR);
            }

            if dialogue.awaiting_advance {
                canvas.draw_text(
                    panel_x + panel_w - PANEL_PADDING_PX - GLYPH_ADVANCE,
                    panel_y + panel_h - PANEL_PADDING_PX - text_height,
                    ">",
                    SPEAKER_COLOR,
                );
            }
        }
        None => {
            if let Some(hint) = &hud.hint {
                let x = (canvas.width() as i32 - text_width_px(hint)) / 2;
                let y = canvas.height() as i32 - PANEL_MARGIN_PX - PANEL_PADDING_PX - text_height;
                draw_panel(
                    canvas,
                    x - PANEL_PADDING_PX,
                    y - PANEL_PADDING_PX,
                    text_width_px(hint) + PANEL_PADDING_PX * 2,
                    text_height + PANEL_PADDING_PX * 2,
                );
                canvas.draw_text(x, y, hint, HINT_COLOR);
            }
        }
    }
}

fn draw_panel(canvas: &mut Canvas<'_>, x: i32, y: i32, width: i32, height: i32) {
    canvas.fill_rect(x, y, width, height, PANEL_BG_COLOR);
    canvas.outline_rect(x, y, width, height, PANEL_BORDER_COLOR);
}

fn draw_blocking_message(canvas: &mut Canvas<'_>, message: &str) {
    canvas.clear(BLOCKING_BG_COLOR);
    let max_chars = ((canvas.width() as i32 - PANEL_MARGIN_PX * 2) / GLYPH_ADVANCE).max(1) as usize;
    let lines = wrap_text(message, max_chars);
    let block_h = lines.len() as i32 * LINE_ADVANCE;
    let mut y = (canvas.height() as i32 - block_h) / 2;
    for line in &lines {
        let x = (canvas.width() as i32 - text_width_px(line)) / 2;
        canvas.draw_text(x, y, line, TEXT_COLOR);
        y += LINE_ADVANCE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{DialoguePanel, RenderableDesc};
    use crate::assets::LoadedSprite;

    const W: u32 = 120;
    const H: u32 = 80;

    fn frame() -> Vec<u8> {
        vec![0u8; (W * H * 4) as usize]
    }

    fn pixel(frame: &[u8], x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * W + x) * 4) as usize;
        [frame[offset], frame[offset + 1], frame[offset + 2], frame[offset + 3]]
    }

    fn placeholder(world: &mut SceneWorld, x: f32, y: f32, h: f32, layer: i32) -> usize {
        world.spawn(
            Vec2::new(x, y),
            Vec2::new(4.0, h),
            RenderableDesc {
                kind: RenderableKind::Placeholder([1, 2, 3, 255]),
                debug_name: "box",
            },
            layer,
        );
        world.entity_count() - 1
    }

    #[test]
    fn draw_order_sorts_by_layer_then_feet_and_skips_hidden() {
        let mut world = SceneWorld::default();
        let low_feet = placeholder(&mut world, 0.0, 30.0, 10.0, 1);
        let high_feet = placeholder(&mut world, 0.0, 10.0, 10.0, 1);
        let top_layer = placeholder(&mut world, 0.0, 0.0, 4.0, 2);
        let hidden = placeholder(&mut world, 0.0, 0.0, 4.0, 0);
        world.entities_mut()[hidden].visible = false;

        let mut order = Vec::new();
        collect_draw_order(world.entities(), &mut order);
        assert_eq!(order, vec![high_feet, low_feet, top_layer]);
    }

    #[test]
    fn background_and_entities_follow_camera_offset() {
        let mut world = SceneWorld::default();
        let mut sprites = SpriteStore::default();
        sprites.insert(
            "world/background",
            LoadedSprite {
                width: 2,
                height: 2,
                rgba: [9, 9, 9, 255].repeat(4),
            },
        );
        world.set_sprites(sprites);
        world.set_background("world/background", (2, 2));
        world.camera_mut().offset = Vec2::new(10.0, 5.0);
        placeholder(&mut world, 20.0, 20.0, 4.0, 0);

        let mut frame = frame();
        let mut canvas = Canvas::new(&mut frame, W, H);
        draw_world(&mut canvas, &world, &mut Vec::new(), &mut HashSet::new());

        assert_eq!(pixel(&frame, 10, 5), [9, 9, 9, 255]);
        assert_eq!(pixel(&frame, 0, 0), CLEAR_COLOR);
        assert_eq!(pixel(&frame, 30, 25), [1, 2, 3, 255]);
    }

    #[test]
    fn missing_sprite_draws_placeholder_and_highlight_outlines() {
        let mut world = SceneWorld::default();
        let id = world.spawn(
            Vec2::new(10.0, 10.0),
            Vec2::new(6.0, 6.0),
            RenderableDesc {
                kind: RenderableKind::Sprite("npcs/missing".to_string()),
                debug_name: "npc",
            },
            0,
        );
        world.find_entity_mut(id).expect("entity").highlighted = true;

        let mut frame = frame();
        let mut canvas = Canvas::new(&mut frame, W, H);
        let mut warned = HashSet::new();
        draw_world(&mut canvas, &world, &mut Vec::new(), &mut warned);

        assert_eq!(pixel(&frame, 12, 12), MISSING_SPRITE_COLOR);
        assert_eq!(pixel(&frame, 8, 8), HIGHLIGHT_COLOR);
        assert!(warned.contains("npcs/missing"));
    }

    #[test]
    fn dialogue_panel_draws_at_bottom_and_hides_hint() {
        let mut world = SceneWorld::default();
        world.hud_mut().hint = Some("press e".to_string());
        world.hud_mut().dialogue = Some(DialoguePanel {
            speaker: "Rose".to_string(),
            text: "hello there".to_string(),
            awaiting_advance: true,
        });

        let mut frame = frame();
        let mut canvas = Canvas::new(&mut frame, W, H);
        draw_world(&mut canvas, &world, &mut Vec::new(), &mut HashSet::new());

        let panel_h = LINE_ADVANCE * (DIALOGUE_TEXT_LINES + 1) + PANEL_PADDING_PX * 2;
        let panel_top = (H as i32 - PANEL_MARGIN_PX - panel_h) as u32;
        assert_eq!(pixel(&frame, PANEL_MARGIN_PX as u32, panel_top), PANEL_BORDER_COLOR);
        assert_eq!(pixel(&frame, 0, 0), CLEAR_COLOR);
    }

    #[test]
    fn blocking_message_replaces_the_whole_frame() {
        let mut world = SceneWorld::default();
        placeholder(&mut world, 0.0, 0.0, 4.0, 0);
        world.hud_mut().stage_label = Some("GAME START".to_string());
        world.hud_mut().blocking_message = Some("assets failed to load".to_string());

        let mut frame = frame();
        let mut canvas = Canvas::new(&mut frame, W, H);
        draw_world(&mut canvas, &world, &mut Vec::new(), &mut HashSet::new());

        assert_eq!(pixel(&frame, 0, 0), BLOCKING_BG_COLOR);
        assert_eq!(pixel(&frame, W - 1, H - 1), BLOCKING_BG_COLOR);
        assert!(frame
            .chunks_exact(4)
            .any(|px| px == TEXT_COLOR.as_slice()));
    }
}
