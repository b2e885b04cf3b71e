//! GPU upload of an imported asset.
//!
//! All mesh and image payloads are staged through the buffers laid out by
//! [`plan_staging`](crate::staging::plan_staging) and copied to
//! device-local memory on one shared one-time command buffer. The call
//! blocks until the copies complete, so every staging buffer is freed
//! before returning.

use crate::error::{AssetError, Result};
use crate::import::{ImportedAsset, IndexData};
use crate::staging::{plan_staging, reserve_size, PlannedRange};
use ash::vk;
use prism_core::checked;
use prism_gpu::command::CommandRecycler;
use prism_gpu::memory::{GpuAllocator, GpuImage};
use prism_gpu::resource::{IndexBuffer, TransferBuffer, VertexBuffer};
use prism_render::texture::image_barrier;
use prism_render::{Mesh, Texture, Vertex};

/// A mesh with either index width, ready to draw.
pub enum AnyMesh {
    U16(Mesh<u16>),
    U32(Mesh<u32>),
}

impl AnyMesh {
    /// Number of indices to draw.
    pub fn index_count(&self) -> u32 {
        match self {
            Self::U16(m) => m.index_count(),
            Self::U32(m) => m.index_count(),
        }
    }

    /// Object-space bounds.
    pub fn bounds(&self) -> prism_core::math::Aabb {
        match self {
            Self::U16(m) => m.bounds(),
            Self::U32(m) => m.bounds(),
        }
    }

    /// Bind buffers and issue the indexed draw.
    ///
    /// # Safety
    /// The device and command buffer must be valid and recording.
    pub unsafe fn draw(&self, device: &ash::Device, cmd: vk::CommandBuffer) {
        match self {
            Self::U16(m) => m.draw(device, cmd),
            Self::U32(m) => m.draw(device, cmd),
        }
    }

    /// Free the mesh's buffers. Consumes the mesh.
    pub fn destroy(self, allocator: &mut GpuAllocator) -> prism_gpu::Result<()> {
        match self {
            Self::U16(m) => m.destroy(allocator),
            Self::U32(m) => m.destroy(allocator),
        }
    }
}

/// One uploaded mesh with its material binding.
pub struct GpuMesh {
    pub mesh: AnyMesh,
    /// Index into [`GpuAsset::textures`], if the mesh is textured.
    pub base_color: Option<usize>,
    pub name: Option<String>,
}

/// A fully uploaded asset.
pub struct GpuAsset {
    pub meshes: Vec<GpuMesh>,
    pub textures: Vec<Texture>,
}

impl GpuAsset {
    /// Free every GPU resource. Consumes the asset.
    ///
    /// # Safety
    /// The device must be valid and no resource may be in use.
    pub unsafe fn destroy(
        self,
        device: &ash::Device,
        allocator: &mut GpuAllocator,
    ) -> prism_gpu::Result<()> {
        for mesh in self.meshes {
            mesh.mesh.destroy(allocator)?;
        }
        for texture in self.textures {
            texture.destroy(device, allocator)?;
        }
        Ok(())
    }
}

/// Upload every mesh and image of `asset` to device-local memory.
///
/// `max_buffer_size` caps each staging buffer (take it from
/// `GpuCapabilities::max_buffer_size`).
///
/// # Safety
/// All handles must be valid.
pub unsafe fn upload_asset(
    device: &ash::Device,
    allocator: &mut GpuAllocator,
    recycler: &mut CommandRecycler,
    queue: vk::Queue,
    max_buffer_size: u64,
    asset: &ImportedAsset,
) -> Result<GpuAsset> {
    // Reserve one aligned range per payload: vertices and indices per
    // mesh, then pixels per image.
    let mut payload_sizes: Vec<u64> = Vec::new();
    let mut reserved: Vec<u64> = Vec::new();

    for mesh in &asset.meshes {
        let vertex_bytes =
            checked::byte_size(mesh.vertices.len(), std::mem::size_of::<Vertex>())
                .ok_or(AssetError::TooMany("vertices"))?;
        let index_bytes = mesh.indices.byte_len()?;
        payload_sizes.push(vertex_bytes);
        payload_sizes.push(index_bytes);
        reserved.push(reserve_size(vertex_bytes)?);
        reserved.push(reserve_size(index_bytes)?);
    }

    for image in &asset.images {
        let pixel_bytes: u64 =
            checked::cast(image.pixels.len()).ok_or(AssetError::TooMany("pixels"))?;
        payload_sizes.push(pixel_bytes);
        reserved.push(reserve_size(pixel_bytes)?);
    }

    if reserved.is_empty() {
        return Ok(GpuAsset {
            meshes: Vec::new(),
            textures: Vec::new(),
        });
    }

    let plan = plan_staging(&reserved, max_buffer_size)?;

    // Create and fill the staging buffers
    let staging: Vec<TransferBuffer> = plan
        .buffer_sizes
        .iter()
        .enumerate()
        .map(|(i, &size)| TransferBuffer::new(allocator, size, &format!("asset_staging_{i}")))
        .collect::<prism_gpu::Result<_>>()?;

    let mut range_iter = plan.ranges.iter();
    let mut next_range = |data: &[u8]| -> Result<PlannedRange> {
        let range = *range_iter
            .next()
            .ok_or_else(|| AssetError::Invalid("staging plan out of ranges".into()))?;
        staging[range.buffer].write_bytes(range.offset, data)?;
        Ok(range)
    };

    struct MeshCopy {
        vertex_range: PlannedRange,
        index_range: PlannedRange,
        vertex_bytes: u64,
        index_bytes: u64,
    }

    let mut mesh_copies = Vec::with_capacity(asset.meshes.len());
    for (i, mesh) in asset.meshes.iter().enumerate() {
        let vertex_range = next_range(bytemuck::cast_slice(&mesh.vertices))?;
        let index_range = match &mesh.indices {
            IndexData::U16(v) => next_range(bytemuck::cast_slice(v))?,
            IndexData::U32(v) => next_range(bytemuck::cast_slice(v))?,
        };
        mesh_copies.push(MeshCopy {
            vertex_range,
            index_range,
            vertex_bytes: payload_sizes[i * 2],
            index_bytes: payload_sizes[i * 2 + 1],
        });
    }

    let mut image_copies = Vec::with_capacity(asset.images.len());
    for image in &asset.images {
        image_copies.push(next_range(&image.pixels)?);
    }

    // Create the device-local destinations
    enum AnyIndexBuffer {
        U16(IndexBuffer<u16>),
        U32(IndexBuffer<u32>),
    }

    let mut vertex_buffers = Vec::with_capacity(asset.meshes.len());
    let mut index_buffers = Vec::with_capacity(asset.meshes.len());
    for (i, mesh) in asset.meshes.iter().enumerate() {
        let name = mesh.name.as_deref().unwrap_or("mesh");
        vertex_buffers.push(VertexBuffer::<Vertex>::device_local(
            allocator,
            mesh.vertices.len(),
            &format!("{name}_{i}_vertices"),
        )?);
        index_buffers.push(match &mesh.indices {
            IndexData::U16(v) => AnyIndexBuffer::U16(IndexBuffer::device_local(
                allocator,
                v.len(),
                &format!("{name}_{i}_indices"),
            )?),
            IndexData::U32(v) => AnyIndexBuffer::U32(IndexBuffer::device_local(
                allocator,
                v.len(),
                &format!("{name}_{i}_indices"),
            )?),
        });
    }

    let mut images: Vec<GpuImage> = Vec::with_capacity(asset.images.len());
    for (i, image) in asset.images.iter().enumerate() {
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(vk::Format::R8G8B8A8_SRGB)
            .extent(vk::Extent3D {
                width: image.width,
                height: image.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        images.push(allocator.create_image(
            &image_info,
            gpu_allocator::MemoryLocation::GpuOnly,
            &format!("asset_image_{i}"),
        )?);
    }

    // Record every copy on one shared one-time command buffer
    let cmds = recycler.acquire(device)?;
    let cmd = cmds.buffer();

    for (copy, (vertex_buffer, index_buffer)) in mesh_copies
        .iter()
        .zip(vertex_buffers.iter().zip(index_buffers.iter()))
    {
        let region = vk::BufferCopy {
            src_offset: copy.vertex_range.offset,
            dst_offset: 0,
            size: copy.vertex_bytes,
        };
        device.cmd_copy_buffer(
            cmd,
            staging[copy.vertex_range.buffer].handle(),
            vertex_buffer.handle(),
            &[region],
        );

        let dst = match index_buffer {
            AnyIndexBuffer::U16(b) => b.handle(),
            AnyIndexBuffer::U32(b) => b.handle(),
        };
        let region = vk::BufferCopy {
            src_offset: copy.index_range.offset,
            dst_offset: 0,
            size: copy.index_bytes,
        };
        device.cmd_copy_buffer(cmd, staging[copy.index_range.buffer].handle(), dst, &[region]);
    }

    for (range, (image, data)) in image_copies.iter().zip(images.iter().zip(&asset.images)) {
        image_barrier(
            device,
            cmd,
            image.image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
        );

        let region = vk::BufferImageCopy::default()
            .buffer_offset(range.offset)
            .image_subresource(
                vk::ImageSubresourceLayers::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .mip_level(0)
                    .base_array_layer(0)
                    .layer_count(1),
            )
            .image_extent(vk::Extent3D {
                width: data.width,
                height: data.height,
                depth: 1,
            });
        device.cmd_copy_buffer_to_image(
            cmd,
            staging[range.buffer].handle(),
            image.image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );

        image_barrier(
            device,
            cmd,
            image.image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
        );
    }

    // Block until the upload completes, then release the staging set
    recycler.submit_and_wait(device, queue, cmds)?;
    for buffer in staging {
        buffer.destroy(allocator)?;
    }

    // Assemble the public wrappers
    let textures = images
        .into_iter()
        .zip(&asset.images)
        .map(|(image, data)| Texture::from_image(device, image, data.width, data.height))
        .collect::<prism_gpu::Result<Vec<_>>>()?;

    let meshes = asset
        .meshes
        .iter()
        .zip(vertex_buffers.into_iter().zip(index_buffers))
        .map(|(data, (vertex_buffer, index_buffer))| {
            let mesh = match index_buffer {
                AnyIndexBuffer::U16(ib) => {
                    AnyMesh::U16(Mesh::new(vertex_buffer, ib, data.bounds))
                }
                AnyIndexBuffer::U32(ib) => {
                    AnyMesh::U32(Mesh::new(vertex_buffer, ib, data.bounds))
                }
            };
            GpuMesh {
                mesh,
                base_color: data.base_color_image,
                name: data.name.clone(),
            }
        })
        .collect();

    Ok(GpuAsset {
        meshes,
        textures,
    })
}
