//! Raw device state to per-frame movement intents.

use rapier3d::prelude::Real;

/// Button and stick state as polled from the device this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawInput {
    pub move_x: Real,
    pub move_y: Real,
    pub sprint: bool,
    pub crouch: bool,
    pub jump: bool,
    pub dash: bool,
    pub grapple: bool,
}

/// Intents consumed by the locomotion states. Edge flags (`wants_jump`,
/// `wants_dash`, `wants_grapple`) are true for a single frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MovementIntents {
    pub move_axis: [Real; 2],
    pub wants_sprint: bool,
    pub wants_crouch: bool,
    pub wants_jump: bool,
    pub jump_held: bool,
    pub wants_dash: bool,
    pub dash_direction: [Real; 2],
    pub wants_grapple: bool,
}

impl MovementIntents {
    pub fn move_magnitude(&self) -> Real {
        (self.move_axis[0] * self.move_axis[0] + self.move_axis[1] * self.move_axis[1]).sqrt()
    }

    pub fn clear_edges(&mut self) {
        self.wants_jump = false;
        self.wants_dash = false;
        self.wants_grapple = false;
    }
}

pub trait InputAdapter {
    fn intents(&mut self, raw: RawInput) -> MovementIntents;
}

/// Normalizes the stick and derives press edges from held buttons.
#[derive(Default)]
pub struct DirectInputAdapter {
    previous: RawInput,
}

impl DirectInputAdapter {
    fn normalize_axis(axis: [Real; 2]) -> [Real; 2] {
        let len = (axis[0] * axis[0] + axis[1] * axis[1]).sqrt();
        if len > 1.0 {
            [axis[0] / len, axis[1] / len]
        } else {
            axis
        }
    }
}

impl InputAdapter for DirectInputAdapter {
    fn intents(&mut self, raw: RawInput) -> MovementIntents {
        let move_axis = Self::normalize_axis([raw.move_x, raw.move_y]);
        let previous = std::mem::replace(&mut self.previous, raw);
        MovementIntents {
            move_axis,
            wants_sprint: raw.sprint,
            wants_crouch: raw.crouch,
            wants_jump: raw.jump && !previous.jump,
            jump_held: raw.jump,
            wants_dash: raw.dash && !previous.dash,
            dash_direction: move_axis,
            wants_grapple: raw.grapple && !previous.grapple,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_input_is_normalized() {
        let mut adapter = DirectInputAdapter::default();
        let intents = adapter.intents(RawInput {
            move_x: 1.0,
            move_y: 1.0,
            ..Default::default()
        });
        assert!((intents.move_magnitude() - 1.0).abs() < 1.0e-6);
        assert_eq!(intents.dash_direction, intents.move_axis);
    }

    #[test]
    fn presses_fire_once_while_held() {
        let mut adapter = DirectInputAdapter::default();
        let held = RawInput {
            jump: true,
            dash: true,
            grapple: true,
            ..Default::default()
        };
        let first = adapter.intents(held);
        assert!(first.wants_jump && first.wants_dash && first.wants_grapple);
        let second = adapter.intents(held);
        assert!(!second.wants_jump && !second.wants_dash && !second.wants_grapple);
        assert!(second.jump_held);

        adapter.intents(RawInput::default());
        assert!(adapter.intents(held).wants_jump);
    }
}
