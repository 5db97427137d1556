#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Interact,
    Quit,
}

const ACTION_COUNT: usize = 6;

/// Held state of every action, sampled once per simulation tick.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn clear(&mut self) {
        self.down = [false; ACTION_COUNT];
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Interact => 4,
            InputAction::Quit => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_toggle_independently() {
        let mut states = ActionStates::default();
        states.set(InputAction::MoveUp, true);
        states.set(InputAction::MoveLeft, true);
        assert!(states.is_down(InputAction::MoveUp));
        assert!(states.is_down(InputAction::MoveLeft));
        assert!(!states.is_down(InputAction::MoveDown));

        states.set(InputAction::MoveUp, false);
        assert!(!states.is_down(InputAction::MoveUp));

        states.clear();
        assert!(!states.is_down(InputAction::MoveLeft));
    }
}
