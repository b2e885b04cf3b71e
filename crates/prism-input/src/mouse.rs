//! Mouse input state tracking.

use glam::Vec2;
use hashbrown::HashMap;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta};

use crate::button_state::ButtonState;

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
}

impl TryFrom<WinitMouseButton> for MouseButton {
    type Error = ();

    fn try_from(button: WinitMouseButton) -> Result<Self, Self::Error> {
        match button {
            WinitMouseButton::Left => Ok(Self::Left),
            WinitMouseButton::Right => Ok(Self::Right),
            WinitMouseButton::Middle => Ok(Self::Middle),
            WinitMouseButton::Back => Ok(Self::Back),
            WinitMouseButton::Forward => Ok(Self::Forward),
            WinitMouseButton::Other(_) => Err(()),
        }
    }
}

/// Mouse input state.
#[derive(Debug, Default)]
pub struct MouseState {
    buttons: HashMap<MouseButton, ButtonState>,
    position: Vec2,
    last_position: Option<Vec2>,
    delta: Vec2,
    scroll_delta: f32,
}

impl MouseState {
    /// Create a new mouse state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a button event.
    pub fn process_button(&mut self, button: WinitMouseButton, element_state: ElementState) {
        let Ok(button) = MouseButton::try_from(button) else {
            return;
        };

        let state = self.buttons.entry(button).or_default();
        match element_state {
            ElementState::Pressed => state.press(),
            ElementState::Released => state.release(),
        }
    }

    /// Process cursor movement, accumulating the frame delta.
    pub fn process_cursor(&mut self, x: f32, y: f32) {
        let position = Vec2::new(x, y);
        if let Some(last) = self.last_position {
            self.delta += position - last;
        }
        self.last_position = Some(position);
        self.position = position;
    }

    /// Process a scroll event, accumulating vertical scroll.
    pub fn process_scroll(&mut self, delta: MouseScrollDelta) {
        self.scroll_delta += match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
        };
    }

    /// Returns `true` if the button is currently pressed.
    #[must_use]
    pub fn is_pressed(&self, button: MouseButton) -> bool {
        self.buttons.get(&button).is_some_and(|s| s.is_pressed())
    }

    /// Returns `true` if the button was just pressed this frame.
    #[must_use]
    pub fn is_just_pressed(&self, button: MouseButton) -> bool {
        self.buttons
            .get(&button)
            .is_some_and(|s| s.is_just_pressed())
    }

    /// Cursor position in window coordinates.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Cursor motion accumulated this frame.
    #[must_use]
    pub const fn delta(&self) -> Vec2 {
        self.delta
    }

    /// Vertical scroll accumulated this frame.
    #[must_use]
    pub const fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    /// Called at end of frame: transitions buttons, resets deltas.
    pub fn end_frame(&mut self) {
        for state in self.buttons.values_mut() {
            state.end_frame();
        }
        self.delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_delta_accumulates_until_end_frame() {
        let mut mouse = MouseState::new();
        mouse.process_cursor(10.0, 10.0);
        mouse.process_cursor(15.0, 12.0);
        mouse.process_cursor(20.0, 10.0);
        assert_eq!(mouse.delta(), Vec2::new(10.0, 0.0));

        mouse.end_frame();
        assert_eq!(mouse.delta(), Vec2::ZERO);
    }

    #[test]
    fn buttons_track_press_state() {
        let mut mouse = MouseState::new();
        mouse.process_button(WinitMouseButton::Left, ElementState::Pressed);
        assert!(mouse.is_pressed(MouseButton::Left));
        assert!(mouse.is_just_pressed(MouseButton::Left));

        mouse.end_frame();
        assert!(mouse.is_pressed(MouseButton::Left));
        assert!(!mouse.is_just_pressed(MouseButton::Left));
    }
}
