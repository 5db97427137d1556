use crate::app::{Camera2D, Vec2};

/// Size of the logical frame buffer in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn center(self) -> Vec2 {
        Vec2::new(self.width as f32 * 0.5, self.height as f32 * 0.5)
    }
}

/// Background offset that centers `focus`, clamped so the viewport never
/// shows past the world image edges. A world narrower than the viewport is
/// centered on that axis instead.
pub fn follow_camera(focus: Vec2, viewport: Viewport, world_size: (u32, u32)) -> Camera2D {
    let center = viewport.center();
    Camera2D {
        offset: Vec2 {
            x: clamp_axis_offset(center.x - focus.x, viewport.width, world_size.0),
            y: clamp_axis_offset(center.y - focus.y, viewport.height, world_size.1),
        },
    }
}

fn clamp_axis_offset(offset: f32, viewport_len: u32, world_len: u32) -> f32 {
    let min_offset = viewport_len as f32 - world_len as f32;
    if min_offset >= 0.0 {
        return (min_offset * 0.5).floor();
    }
    if !offset.is_finite() {
        return 0.0;
    }
    offset.clamp(min_offset, 0.0).round()
}

/// Screen position is always derived from the same offset the background
/// uses, so sprites stay glued to the world near clamped edges.
pub fn world_to_screen_px(camera: &Camera2D, world: Vec2) -> (i32, i32) {
    (
        (world.x + camera.offset.x).round() as i32,
        (world.y + camera.offset.y).round() as i32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport {
        width: 400,
        height: 300,
    };
    const WORLD: (u32, u32) = (1000, 800);

    #[test]
    fn focus_in_open_world_maps_to_viewport_center() {
        let camera = follow_camera(Vec2::new(500.0, 400.0), VIEWPORT, WORLD);
        assert_eq!(camera.offset, Vec2::new(-300.0, -250.0));
        assert_eq!(
            world_to_screen_px(&camera, Vec2::new(500.0, 400.0)),
            (200, 150)
        );
    }

    #[test]
    fn offset_clamps_at_top_left_edge() {
        let camera = follow_camera(Vec2::new(50.0, 20.0), VIEWPORT, WORLD);
        assert_eq!(camera.offset, Vec2::new(0.0, 0.0));
        assert_eq!(world_to_screen_px(&camera, Vec2::new(50.0, 20.0)), (50, 20));
    }

    #[test]
    fn offset_clamps_at_bottom_right_edge() {
        let camera = follow_camera(Vec2::new(990.0, 790.0), VIEWPORT, WORLD);
        assert_eq!(camera.offset, Vec2::new(-600.0, -500.0));
        let (sx, sy) = world_to_screen_px(&camera, Vec2::new(990.0, 790.0));
        assert_eq!((sx, sy), (390, 290));
        assert!(sx > VIEWPORT.width as i32 / 2);
    }

    #[test]
    fn world_smaller_than_viewport_is_centered() {
        let camera = follow_camera(Vec2::new(10.0, 10.0), VIEWPORT, (200, 300));
        assert_eq!(camera.offset, Vec2::new(100.0, 0.0));
    }

    #[test]
    fn non_finite_focus_does_not_poison_offset() {
        let camera = follow_camera(Vec2::new(f32::NAN, 400.0), VIEWPORT, WORLD);
        assert_eq!(camera.offset.x, 0.0);
    }
}
