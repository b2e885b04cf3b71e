//! Application framework for the Prism renderer.
//!
//! This crate provides a trait-based application framework that handles
//! the windowing and presentation boilerplate:
//! - Window creation and GPU context initialization
//! - Swapchain creation and per-frame synchronization
//! - The [`Frame`] object driving the acquire/record/present cycle
//! - Event loop handling and the top-level error boundary
//!
//! # Example
//!
//! ```no_run
//! use prism_app::{run_app, App, AppConfig, Frame, WindowContext};
//!
//! struct MyApp;
//!
//! impl App for MyApp {
//!     fn init(ctx: &mut WindowContext) -> anyhow::Result<Self> {
//!         Ok(MyApp)
//!     }
//!
//!     fn update(&mut self, ctx: &mut WindowContext, dt: f32) {}
//!
//!     fn render(&mut self, frame: &mut Frame) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app::<MyApp>(AppConfig::default())
//! }
//! ```

mod app;
mod context;
mod event;
mod frame;
mod runner;

pub use app::App;
pub use context::WindowContext;
pub use event::UserEvent;
pub use frame::Frame;
pub use runner::{run_app, AppConfig};

// Re-export commonly used types for convenience
pub use prism_core::constants::MAX_FRAMES_IN_FLIGHT;
pub use prism_gpu::{GpuContext, GpuContextBuilder};
pub use winit::event::{DeviceEvent, DeviceId, WindowEvent};
