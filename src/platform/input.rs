//! Keyboard and touch input
//!
//! Both sources write into their own flag set and the engine only ever sees
//! the union, so releasing a key can't cancel a held touch button (and a
//! missed `touchend` can be cleared with [`InputState::release_all`]).

use crate::sim::tick::ControlFlags;

/// One logical control, whatever device pressed it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Up,
    Down,
    Left,
    Right,
    Primary,
    Secondary,
}

impl Control {
    /// Map a `KeyboardEvent.code`
    pub fn from_key_code(code: &str) -> Option<Self> {
        match code {
            "ArrowUp" | "KeyW" => Some(Control::Up),
            "ArrowDown" | "KeyS" => Some(Control::Down),
            "ArrowLeft" | "KeyA" => Some(Control::Left),
            "ArrowRight" | "KeyD" => Some(Control::Right),
            "Space" | "KeyJ" => Some(Control::Primary),
            "KeyE" | "KeyF" | "KeyK" => Some(Control::Secondary),
            _ => None,
        }
    }

    /// Map an on-screen button name (`data-control` attribute)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "up" => Some(Control::Up),
            "down" => Some(Control::Down),
            "left" => Some(Control::Left),
            "right" => Some(Control::Right),
            "primary" | "attack" => Some(Control::Primary),
            "secondary" | "interact" => Some(Control::Secondary),
            _ => None,
        }
    }

    fn apply(self, flags: &mut ControlFlags, pressed: bool) {
        let slot = match self {
            Control::Up => &mut flags.up,
            Control::Down => &mut flags.down,
            Control::Left => &mut flags.left,
            Control::Right => &mut flags.right,
            Control::Primary => &mut flags.primary,
            Control::Secondary => &mut flags.secondary,
        };
        *slot = pressed;
    }
}

/// Held controls per input device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    keyboard: ControlFlags,
    touch: ControlFlags,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the key is bound (so the host can `preventDefault`)
    pub fn key_down(&mut self, code: &str) -> bool {
        self.set_key(code, true)
    }

    pub fn key_up(&mut self, code: &str) -> bool {
        self.set_key(code, false)
    }

    pub fn touch_down(&mut self, control: Control) {
        control.apply(&mut self.touch, true);
    }

    pub fn touch_up(&mut self, control: Control) {
        control.apply(&mut self.touch, false);
    }

    /// Drop every held control (window blur, tab hidden, answer overlay opened)
    pub fn release_all(&mut self) {
        if self.flags() != ControlFlags::default() {
            log::debug!("Releasing held controls");
        }
        *self = Self::default();
    }

    /// What the engine should see this tick
    pub fn flags(&self) -> ControlFlags {
        self.keyboard.merge(self.touch)
    }

    fn set_key(&mut self, code: &str, pressed: bool) -> bool {
        match Control::from_key_code(code) {
            Some(control) => {
                control.apply(&mut self.keyboard, pressed);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_and_touch_merge() {
        let mut input = InputState::new();
        assert!(input.key_down("ArrowLeft"));
        input.touch_down(Control::Primary);

        let flags = input.flags();
        assert!(flags.left);
        assert!(flags.primary);
        assert!(!flags.right);
    }

    #[test]
    fn test_releasing_one_source_keeps_the_other() {
        let mut input = InputState::new();
        input.key_down("KeyW");
        input.touch_down(Control::Up);
        input.key_up("KeyW");
        assert!(input.flags().up);
        input.touch_up(Control::Up);
        assert!(!input.flags().up);
    }

    #[test]
    fn test_unbound_keys_are_reported() {
        let mut input = InputState::new();
        assert!(!input.key_down("Tab"));
        assert_eq!(input.flags(), ControlFlags::default());
    }

    #[test]
    fn test_release_all_clears_stuck_controls() {
        let mut input = InputState::new();
        input.key_down("KeyD");
        input.key_down("Space");
        input.touch_down(Control::Secondary);
        input.release_all();
        assert_eq!(input.flags(), ControlFlags::default());
    }

    #[test]
    fn test_button_names() {
        assert_eq!(Control::from_name("interact"), Some(Control::Secondary));
        assert_eq!(Control::from_name("attack"), Some(Control::Primary));
        assert_eq!(Control::from_name("jump"), None);
    }
}
