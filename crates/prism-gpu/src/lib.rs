//! Vulkan abstraction layer for the Prism renderer.
//!
//! This crate provides:
//! - Vulkan instance and device management
//! - Adapter enumeration and capability detection
//! - Memory allocation via gpu-allocator
//! - One-time command buffer recycling
//! - Swapchain handling
//! - Typed, move-only GPU resource wrappers

pub mod adapter;
pub mod capabilities;
pub mod command;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod instance;
pub mod memory;
pub mod pipeline;
pub mod resource;
pub mod shared;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use adapter::{enumerate_adapters, AdapterInfo};
pub use capabilities::{GpuCapabilities, GpuVendor};
pub use command::{CommandPool, CommandRecycler, OneTimeCommands};
pub use context::{GpuContext, GpuContextBuilder};
pub use descriptors::{
    write_combined_image_sampler, write_storage_buffer, write_uniform_buffer, DescriptorPool,
    DescriptorSetLayoutBuilder,
};
pub use error::{GpuError, Result};
pub use memory::{GpuAllocator, GpuBuffer, GpuImage};
pub use pipeline::{GraphicsPipeline, GraphicsPipelineConfig};
pub use resource::{
    IndexBuffer, StorageBuffer, TransferBuffer, UniformBuffer, VertexBuffer,
};
pub use shared::{Res, ResLock, SharedResource};
pub use surface::{SurfaceCapabilities, SurfaceContext};
pub use swapchain::Swapchain;
pub use sync::{create_fence, create_semaphore, reset_fence, wait_for_fence};
