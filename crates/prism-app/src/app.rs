//! `App` trait definition.

use crate::context::WindowContext;
use crate::event::UserEvent;
use crate::frame::Frame;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};

/// Trait for Prism applications.
///
/// Implement this trait to build on the framework; window creation, GPU
/// initialization, swapchain management and the frame loop are handled
/// for you.
pub trait App: Sized {
    /// Initialize the application.
    ///
    /// Called once, after the GPU context and window exist.
    fn init(ctx: &mut WindowContext) -> anyhow::Result<Self>;

    /// Update application state.
    ///
    /// Called every frame before rendering.
    ///
    /// # Arguments
    /// * `ctx` - Window context with GPU and window access
    /// * `dt` - Delta time in seconds since last frame
    fn update(&mut self, ctx: &mut WindowContext, dt: f32);

    /// Render a frame.
    ///
    /// Record drawing commands into `frame.command_buffer()`; the frame
    /// handles image acquisition, layout transitions, submission and
    /// presentation.
    fn render(&mut self, frame: &mut Frame) -> anyhow::Result<()>;

    /// Handle window events.
    ///
    /// Return `true` if the event was consumed.
    #[allow(unused_variables)]
    fn on_event(&mut self, event: &WindowEvent) -> bool {
        false
    }

    /// Handle device events (raw input).
    #[allow(unused_variables)]
    fn on_device_event(&mut self, device_id: DeviceId, event: &DeviceEvent) {}

    /// Handle a custom user event pushed through the event loop proxy.
    #[allow(unused_variables)]
    fn on_user_event(&mut self, event: &UserEvent) {}

    /// Cleanup resources before shutdown.
    ///
    /// The GPU is idle when this is called, so destroying GPU resources
    /// is safe.
    #[allow(unused_variables)]
    fn cleanup(&mut self, ctx: &mut WindowContext) {}
}
