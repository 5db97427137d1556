use engine::{CollisionMap, InputAction, InputSnapshot, Vec2};

const MOVE_SPEED_PX_PER_SECOND: f32 = 120.0;
const ANIMATION_FRAME_SECONDS: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Facing {
    Up,
    Down,
    Left,
    Right,
}

impl Facing {
    fn as_token(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Horizontal wins on diagonals so side sprites show while strafing.
    fn from_delta(dx: f32, dy: f32) -> Option<Self> {
        if dx > 0.0 {
            Some(Self::Right)
        } else if dx < 0.0 {
            Some(Self::Left)
        } else if dy < 0.0 {
            Some(Self::Up)
        } else if dy > 0.0 {
            Some(Self::Down)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnimFrame {
    One,
    Two,
}

impl AnimFrame {
    fn toggled(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PlayerState {
    pub(crate) position: Vec2,
    pub(crate) size: Vec2,
    pub(crate) facing: Facing,
    pub(crate) frame: AnimFrame,
    pub(crate) moving: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct PlayerController {
    state: PlayerState,
    frame_timer: f32,
}

impl PlayerController {
    pub(crate) fn new(spawn: Vec2, size: Vec2) -> Self {
        Self {
            state: PlayerState {
                position: spawn,
                size,
                facing: Facing::Down,
                frame: AnimFrame::One,
                moving: false,
            },
            frame_timer: 0.0,
        }
    }

    pub(crate) fn state(&self) -> &PlayerState {
        &self.state
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.state.position
    }

    pub(crate) fn sprite_key(&self) -> &'static str {
        match (self.state.facing, self.state.frame) {
            (Facing::Up, AnimFrame::One) => "player/up_1",
            (Facing::Up, AnimFrame::Two) => "player/up_2",
            (Facing::Down, AnimFrame::One) => "player/down_1",
            (Facing::Down, AnimFrame::Two) => "player/down_2",
            (Facing::Left, AnimFrame::One) => "player/left_1",
            (Facing::Left, AnimFrame::Two) => "player/left_2",
            (Facing::Right, AnimFrame::One) => "player/right_1",
            (Facing::Right, AnimFrame::Two) => "player/right_2",
        }
    }

    /// Stops walking and shows the resting frame. Used when a modal opens.
    pub(crate) fn halt(&mut self) {
        self.state.moving = false;
        self.state.frame = AnimFrame::One;
        self.frame_timer = 0.0;
    }

    /// One simulation step. Returns whether the position changed.
    pub(crate) fn update(
        &mut self,
        input: &InputSnapshot,
        fixed_dt_seconds: f32,
        collision: &CollisionMap,
    ) -> bool {
        let (dx, dy) = held_direction(input);
        let step = MOVE_SPEED_PX_PER_SECOND * fixed_dt_seconds;
        let intended = (dx * step, dy * step);

        let applied = if intended == (0.0, 0.0) {
            None
        } else {
            self.resolve_move(intended, collision)
        };

        match applied {
            Some((mx, my)) => {
                self.state.position.x += mx;
                self.state.position.y += my;
                if let Some(facing) = Facing::from_delta(mx, my) {
                    self.state.facing = facing;
                }
                self.advance_animation(fixed_dt_seconds);
                true
            }
            None => {
                if let Some(facing) = Facing::from_delta(intended.0, intended.1) {
                    self.state.facing = facing;
                }
                self.halt();
                false
            }
        }
    }

    /// Full move first, then vertical only, then horizontal only.
    fn resolve_move(&self, (mx, my): (f32, f32), collision: &CollisionMap) -> Option<(f32, f32)> {
        let candidates = [(mx, my), (0.0, my), (mx, 0.0)];
        candidates
            .into_iter()
            .filter(|&(cx, cy)| cx != 0.0 || cy != 0.0)
            .find(|&(cx, cy)| {
                collision.is_entity_walkable(
                    self.state.position.x + cx,
                    self.state.position.y + cy,
                    self.state.size.x,
                    self.state.size.y,
                )
            })
    }

    fn advance_animation(&mut self, fixed_dt_seconds: f32) {
        if !self.state.moving {
            self.state.moving = true;
            self.frame_timer = 0.0;
        }
        self.frame_timer += fixed_dt_seconds;
        while self.frame_timer >= ANIMATION_FRAME_SECONDS {
            self.frame_timer -= ANIMATION_FRAME_SECONDS;
            self.state.frame = self.state.frame.toggled();
        }
    }

    pub(crate) fn facing_token(&self) -> &'static str {
        self.state.facing.as_token()
    }
}

/// Screen axes: up is negative y.
fn held_direction(input: &InputSnapshot) -> (f32, f32) {
    let mut x = 0.0f32;
    let mut y = 0.0f32;
    if input.is_down(InputAction::MoveRight) {
        x += 1.0;
    }
    if input.is_down(InputAction::MoveLeft) {
        x -= 1.0;
    }
    if input.is_down(InputAction::MoveUp) {
        y -= 1.0;
    }
    if input.is_down(InputAction::MoveDown) {
        y += 1.0;
    }
    (x, y)
}
