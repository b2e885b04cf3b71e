//! Keyboard and mouse state tracking for the Prism renderer.
//!
//! Wraps winit events into per-frame queryable state: which keys are
//! held, which were pressed this frame, accumulated mouse motion.

pub mod button_state;
pub mod keyboard;
pub mod modifiers;
pub mod mouse;

pub use button_state::ButtonState;
pub use keyboard::KeyboardState;
pub use modifiers::Modifiers;
pub use mouse::{MouseButton, MouseState};

// Re-exported so applications don't need a direct winit dependency for
// key queries.
pub use winit::keyboard::KeyCode;

use winit::event::WindowEvent;

/// Aggregate input state for one window.
#[derive(Debug, Default)]
pub struct InputState {
    pub keyboard: KeyboardState,
    pub mouse: MouseState,
}

impl InputState {
    /// Create an empty input state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a window event into the trackers.
    ///
    /// Returns `true` if the event was consumed as input.
    pub fn process_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                self.keyboard.process_key_event(event);
                true
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.keyboard.set_modifiers(modifiers.state().into());
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse.process_button(*button, *state);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse.process_cursor(position.x as f32, position.y as f32);
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.mouse.process_scroll(*delta);
                true
            }
            _ => false,
        }
    }

    /// Called once per frame after the app has queried the state.
    pub fn end_frame(&mut self) {
        self.keyboard.end_frame();
        self.mouse.end_frame();
    }
}
