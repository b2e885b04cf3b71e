//! Keyboard input state tracking.

use hashbrown::HashMap;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::button_state::ButtonState;
use crate::modifiers::Modifiers;

/// Keyboard input state.
///
/// Tracks the state of all keyboard keys and modifier keys, queried by
/// physical key code.
#[derive(Debug, Default)]
pub struct KeyboardState {
    /// State of individual keys by key code.
    keys: HashMap<KeyCode, ButtonState>,
    /// Current modifier key state.
    modifiers: Modifiers,
}

impl KeyboardState {
    /// Create a new keyboard state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a key event.
    pub fn process_key_event(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(key_code) = event.physical_key else {
            return;
        };

        let state = self.keys.entry(key_code).or_default();
        match event.state {
            ElementState::Pressed => state.press(),
            ElementState::Released => state.release(),
        }
    }

    /// Update modifier key state.
    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    /// Returns `true` if the key is currently pressed.
    #[must_use]
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.keys.get(&key).is_some_and(|s| s.is_pressed())
    }

    /// Returns `true` if the key was just pressed this frame.
    #[must_use]
    pub fn is_just_pressed(&self, key: KeyCode) -> bool {
        self.keys.get(&key).is_some_and(|s| s.is_just_pressed())
    }

    /// Returns `true` if the key was just released this frame.
    #[must_use]
    pub fn is_just_released(&self, key: KeyCode) -> bool {
        self.keys.get(&key).is_some_and(|s| s.is_just_released())
    }

    /// Get the current modifier key state.
    #[must_use]
    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Called at end of frame to transition button states.
    pub fn end_frame(&mut self) {
        for state in self.keys.values_mut() {
            state.end_frame();
        }
    }

    /// Clear all key states.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.modifiers = Modifiers::empty();
    }
}
