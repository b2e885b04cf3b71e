//! Typed, move-only GPU resource wrappers.
//!
//! Vulkan objects can only be destroyed through the device/allocator that
//! created them, which a plain `Drop` impl cannot carry. Every wrapper
//! here is therefore consumed by an explicit `destroy(allocator)` call;
//! a wrapper that is dropped without it surfaces in the allocator's leak
//! report at shutdown.
//!
//! All size math goes through `prism_core::checked` and rejects overflow
//! instead of truncating.

use crate::error::{GpuError, Result};
use crate::memory::{GpuAllocator, GpuBuffer};
use ash::vk;
use bytemuck::Pod;
use gpu_allocator::MemoryLocation;
use prism_core::checked;
use std::marker::PhantomData;

mod private {
    pub trait Sealed {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// Index element types the GPU accepts.
pub trait IndexKind: Pod + private::Sealed {
    /// The matching Vulkan index type.
    const INDEX_TYPE: vk::IndexType;
}

impl IndexKind for u16 {
    const INDEX_TYPE: vk::IndexType = vk::IndexType::UINT16;
}

impl IndexKind for u32 {
    const INDEX_TYPE: vk::IndexType = vk::IndexType::UINT32;
}

/// Compute the byte size of `count` elements of `T`, rejecting overflow.
fn typed_size<T>(count: usize, what: &'static str) -> Result<u64> {
    checked::byte_size(count, std::mem::size_of::<T>()).ok_or(GpuError::TooLarge(what))
}

/// A vertex buffer holding `count` elements of `V`.
pub struct VertexBuffer<V: Pod> {
    inner: GpuBuffer,
    count: usize,
    _marker: PhantomData<V>,
}

impl<V: Pod> VertexBuffer<V> {
    /// Create a device-local vertex buffer, filled via a staging copy.
    pub fn device_local(
        allocator: &mut GpuAllocator,
        count: usize,
        name: &str,
    ) -> Result<Self> {
        let size = typed_size::<V>(count, "vertices")?;
        let inner = allocator.create_buffer(
            size,
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
            name,
        )?;
        Ok(Self {
            inner,
            count,
            _marker: PhantomData,
        })
    }

    /// Create a host-visible vertex buffer for per-frame CPU writes.
    pub fn host_visible(
        allocator: &mut GpuAllocator,
        count: usize,
        name: &str,
    ) -> Result<Self> {
        let size = typed_size::<V>(count, "vertices")?;
        let inner = allocator.create_buffer(
            size,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            MemoryLocation::CpuToGpu,
            name,
        )?;
        Ok(Self {
            inner,
            count,
            _marker: PhantomData,
        })
    }

    /// Write vertices starting at element 0 (host-visible buffers only).
    pub fn write(&self, vertices: &[V]) -> Result<()> {
        self.inner.write(vertices)
    }

    /// Raw buffer handle for binding.
    pub fn handle(&self) -> vk::Buffer {
        self.inner.buffer
    }

    /// Number of vertices the buffer holds.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Size in bytes.
    pub fn byte_size(&self) -> u64 {
        self.inner.size
    }

    /// Free the buffer. Consumes the wrapper.
    pub fn destroy(mut self, allocator: &mut GpuAllocator) -> Result<()> {
        allocator.free_buffer(&mut self.inner)
    }
}

/// An index buffer of `u16` or `u32` elements.
pub struct IndexBuffer<I: IndexKind> {
    inner: GpuBuffer,
    count: usize,
    _marker: PhantomData<I>,
}

impl<I: IndexKind> IndexBuffer<I> {
    /// Create a device-local index buffer, filled via a staging copy.
    pub fn device_local(
        allocator: &mut GpuAllocator,
        count: usize,
        name: &str,
    ) -> Result<Self> {
        let size = typed_size::<I>(count, "indices")?;
        let inner = allocator.create_buffer(
            size,
            vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
            name,
        )?;
        Ok(Self {
            inner,
            count,
            _marker: PhantomData,
        })
    }

    /// Create a host-visible index buffer for direct CPU writes.
    pub fn host_visible(
        allocator: &mut GpuAllocator,
        count: usize,
        name: &str,
    ) -> Result<Self> {
        let size = typed_size::<I>(count, "indices")?;
        let inner = allocator.create_buffer(
            size,
            vk::BufferUsageFlags::INDEX_BUFFER,
            MemoryLocation::CpuToGpu,
            name,
        )?;
        Ok(Self {
            inner,
            count,
            _marker: PhantomData,
        })
    }

    /// Write indices starting at element 0 (host-visible buffers only).
    pub fn write(&self, indices: &[I]) -> Result<()> {
        self.inner.write(indices)
    }

    /// The Vulkan index type for draw binding.
    pub fn index_type(&self) -> vk::IndexType {
        I::INDEX_TYPE
    }

    /// Raw buffer handle for binding.
    pub fn handle(&self) -> vk::Buffer {
        self.inner.buffer
    }

    /// Number of indices the buffer holds.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Free the buffer. Consumes the wrapper.
    pub fn destroy(mut self, allocator: &mut GpuAllocator) -> Result<()> {
        allocator.free_buffer(&mut self.inner)
    }
}

/// A host-visible uniform buffer holding one `T`.
pub struct UniformBuffer<T: Pod> {
    inner: GpuBuffer,
    _marker: PhantomData<T>,
}

impl<T: Pod> UniformBuffer<T> {
    /// Create the buffer.
    pub fn new(allocator: &mut GpuAllocator, name: &str) -> Result<Self> {
        let size = typed_size::<T>(1, "uniform bytes")?;
        let inner = allocator.create_buffer(
            size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            MemoryLocation::CpuToGpu,
            name,
        )?;
        Ok(Self {
            inner,
            _marker: PhantomData,
        })
    }

    /// Overwrite the contents.
    pub fn write(&self, value: &T) -> Result<()> {
        self.inner.write(std::slice::from_ref(value))
    }

    /// Raw buffer handle for descriptor writes.
    pub fn handle(&self) -> vk::Buffer {
        self.inner.buffer
    }

    /// Size in bytes, for descriptor ranges.
    pub fn byte_size(&self) -> u64 {
        self.inner.size
    }

    /// Free the buffer. Consumes the wrapper.
    pub fn destroy(mut self, allocator: &mut GpuAllocator) -> Result<()> {
        allocator.free_buffer(&mut self.inner)
    }
}

/// A storage buffer holding `count` elements of `T`.
pub struct StorageBuffer<T: Pod> {
    inner: GpuBuffer,
    count: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> StorageBuffer<T> {
    /// Create a host-visible storage buffer for per-frame CPU writes.
    pub fn host_visible(
        allocator: &mut GpuAllocator,
        count: usize,
        name: &str,
    ) -> Result<Self> {
        let size = typed_size::<T>(count, "storage elements")?;
        let inner = allocator.create_buffer(
            size,
            vk::BufferUsageFlags::STORAGE_BUFFER,
            MemoryLocation::CpuToGpu,
            name,
        )?;
        Ok(Self {
            inner,
            count,
            _marker: PhantomData,
        })
    }

    /// Write elements starting at element 0.
    pub fn write(&self, values: &[T]) -> Result<()> {
        self.inner.write(values)
    }

    /// Raw buffer handle for descriptor writes.
    pub fn handle(&self) -> vk::Buffer {
        self.inner.buffer
    }

    /// Number of elements the buffer holds.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Size in bytes, for descriptor ranges.
    pub fn byte_size(&self) -> u64 {
        self.inner.size
    }

    /// Free the buffer. Consumes the wrapper.
    pub fn destroy(mut self, allocator: &mut GpuAllocator) -> Result<()> {
        allocator.free_buffer(&mut self.inner)
    }
}

/// A host-visible staging buffer used as the source of GPU copies.
pub struct TransferBuffer {
    inner: GpuBuffer,
}

impl TransferBuffer {
    /// Create a staging buffer of `size` bytes.
    pub fn new(allocator: &mut GpuAllocator, size: u64, name: &str) -> Result<Self> {
        let inner = allocator.create_buffer(
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            name,
        )?;
        Ok(Self { inner })
    }

    /// Write bytes at the given offset.
    pub fn write_bytes(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.inner.write_bytes(offset, data)
    }

    /// Raw buffer handle for copy commands.
    pub fn handle(&self) -> vk::Buffer {
        self.inner.buffer
    }

    /// Size in bytes.
    pub fn byte_size(&self) -> u64 {
        self.inner.size
    }

    /// Free the buffer. Consumes the wrapper.
    pub fn destroy(mut self, allocator: &mut GpuAllocator) -> Result<()> {
        allocator.free_buffer(&mut self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_kinds_map_to_vk() {
        assert_eq!(<u16 as IndexKind>::INDEX_TYPE, vk::IndexType::UINT16);
        assert_eq!(<u32 as IndexKind>::INDEX_TYPE, vk::IndexType::UINT32);
    }

    #[test]
    fn typed_size_rejects_overflow() {
        let err = typed_size::<[u8; 16]>(usize::MAX, "vertices").unwrap_err();
        assert_eq!(err.to_string(), "too many vertices");
        assert_eq!(typed_size::<u32>(3, "indices").unwrap(), 12);
    }
}
