//! GPU-resident mesh container.

use crate::vertex::Vertex;
use ash::vk;
use prism_core::math::Aabb;
use prism_gpu::memory::GpuAllocator;
use prism_gpu::resource::{IndexBuffer, IndexKind, VertexBuffer};
use prism_gpu::Result;

/// A mesh ready to draw, generic over its index width.
pub struct Mesh<I: IndexKind> {
    vertex_buffer: VertexBuffer<Vertex>,
    index_buffer: IndexBuffer<I>,
    index_count: u32,
    bounds: Aabb,
}

impl<I: IndexKind> Mesh<I> {
    /// Assemble a mesh from already-filled buffers.
    pub fn new(
        vertex_buffer: VertexBuffer<Vertex>,
        index_buffer: IndexBuffer<I>,
        bounds: Aabb,
    ) -> Self {
        let index_count = index_buffer.count() as u32;
        Self {
            vertex_buffer,
            index_buffer,
            index_count,
            bounds,
        }
    }

    /// Number of indices to draw.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertex_buffer.count()
    }

    /// Object-space bounds.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Bind buffers and issue the indexed draw.
    ///
    /// # Safety
    /// The device and command buffer must be valid and recording.
    pub unsafe fn draw(&self, device: &ash::Device, cmd: vk::CommandBuffer) {
        device.cmd_bind_vertex_buffers(cmd, 0, &[self.vertex_buffer.handle()], &[0]);
        device.cmd_bind_index_buffer(cmd, self.index_buffer.handle(), 0, I::INDEX_TYPE);
        device.cmd_draw_indexed(cmd, self.index_count, 1, 0, 0, 0);
    }

    /// Free the mesh's buffers. Consumes the mesh.
    pub fn destroy(self, allocator: &mut GpuAllocator) -> Result<()> {
        self.vertex_buffer.destroy(allocator)?;
        self.index_buffer.destroy(allocator)
    }
}
