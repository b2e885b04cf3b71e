//! CPU-side glTF parsing.
//!
//! Produces plain vectors of vertices, indices, pixels, skins and
//! animation channels; nothing here touches the GPU. Vertex attributes
//! the document does not provide are filled with the fallbacks documented
//! on [`Vertex`].

use crate::animation::LocalTransform;
use crate::error::{AssetError, Result};
use glam::{Mat4, Quat, Vec3};
use prism_core::checked;
use prism_core::math::Aabb;
use prism_render::Vertex;
use serde::Serialize;
use std::path::Path;

/// Index data, narrowed to 16 bits when every index fits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    /// Number of indices.
    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    /// True when there are no indices.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes occupied by the index payload.
    pub fn byte_len(&self) -> Result<u64> {
        let elem = match self {
            Self::U16(_) => 2,
            Self::U32(_) => 4,
        };
        checked::byte_size(self.len(), elem).ok_or(AssetError::TooMany("index bytes"))
    }
}

/// One renderable primitive.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub name: Option<String>,
    pub vertices: Vec<Vertex>,
    pub indices: IndexData,
    /// Index into [`ImportedAsset::images`] for the base color texture.
    pub base_color_image: Option<usize>,
    pub bounds: Aabb,
}

/// Decoded RGBA8 image.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// A node in the document hierarchy.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub name: Option<String>,
    pub parent: Option<usize>,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
}

impl NodeData {
    /// The node's rest-pose local transform.
    pub fn local_transform(&self) -> LocalTransform {
        LocalTransform {
            translation: self.translation,
            rotation: self.rotation,
            scale: self.scale,
        }
    }
}

/// A skin: joint nodes plus their inverse bind matrices.
#[derive(Debug, Clone)]
pub struct SkinData {
    /// Node indices, in joint order.
    pub joints: Vec<usize>,
    /// One matrix per joint, same order.
    pub inverse_bind: Vec<Mat4>,
}

/// Keyframe interpolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
}

/// Values animated by one channel.
#[derive(Debug, Clone)]
pub enum ChannelValues {
    Translations(Vec<Vec3>),
    Rotations(Vec<Quat>),
    Scales(Vec<Vec3>),
}

/// One animation channel targeting a node.
#[derive(Debug, Clone)]
pub struct ChannelData {
    pub node: usize,
    pub times: Vec<f32>,
    pub values: ChannelValues,
    pub interpolation: Interpolation,
}

/// A named animation clip.
#[derive(Debug, Clone)]
pub struct AnimationData {
    pub name: Option<String>,
    pub channels: Vec<ChannelData>,
    /// Largest keyframe time across all channels, in seconds.
    pub duration: f32,
}

/// Everything parsed from one glTF document.
#[derive(Debug, Clone, Default)]
pub struct ImportedAsset {
    pub meshes: Vec<MeshData>,
    pub images: Vec<ImageData>,
    pub nodes: Vec<NodeData>,
    pub skins: Vec<SkinData>,
    pub animations: Vec<AnimationData>,
}

/// Flat counts for logging and snapshot tests.
#[derive(Debug, Clone, Serialize)]
pub struct AssetSummary {
    pub meshes: usize,
    pub images: usize,
    pub skins: usize,
    pub animations: usize,
    pub total_vertices: u64,
    pub total_indices: u64,
}

impl ImportedAsset {
    /// Summarize the asset's contents.
    pub fn summary(&self) -> AssetSummary {
        AssetSummary {
            meshes: self.meshes.len(),
            images: self.images.len(),
            skins: self.skins.len(),
            animations: self.animations.len(),
            total_vertices: self
                .meshes
                .iter()
                .map(|m| m.vertices.len() as u64)
                .sum(),
            total_indices: self.meshes.iter().map(|m| m.indices.len() as u64).sum(),
        }
    }
}

/// Import a glTF or GLB file from disk.
pub fn import_path(path: impl AsRef<Path>) -> Result<ImportedAsset> {
    let path = path.as_ref();
    let (document, buffers, images) = gltf::import(path)?;
    tracing::info!("Importing {}", path.display());
    build_asset(&document, &buffers, &images)
}

/// Import a glTF or GLB document from memory.
pub fn import_slice(bytes: &[u8]) -> Result<ImportedAsset> {
    let (document, buffers, images) = gltf::import_slice(bytes)?;
    build_asset(&document, &buffers, &images)
}

fn build_asset(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> Result<ImportedAsset> {
    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            meshes.push(read_primitive(&mesh, &primitive, buffers)?);
        }
    }

    let images = images.iter().map(decode_image).collect::<Result<Vec<_>>>()?;
    let nodes = read_nodes(document);
    let skins = read_skins(document, buffers)?;
    let animations = read_animations(document, buffers)?;

    let asset = ImportedAsset {
        meshes,
        images,
        nodes,
        skins,
        animations,
    };

    let summary = asset.summary();
    tracing::info!(
        "Imported {} meshes, {} images, {} skins, {} animations ({} vertices)",
        summary.meshes,
        summary.images,
        summary.skins,
        summary.animations,
        summary.total_vertices,
    );

    Ok(asset)
}

fn read_primitive(
    mesh: &gltf::Mesh,
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> Result<MeshData> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        return Err(AssetError::UnsupportedTopology(primitive.mode()));
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or(AssetError::MissingPositions)?
        .collect();

    checked::cast::<u32, usize>(positions.len()).ok_or(AssetError::TooMany("vertices"))?;

    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
    let tex_coords: Option<Vec<[f32; 2]>> =
        reader.read_tex_coords(0).map(|t| t.into_f32().collect());
    let colors: Option<Vec<[f32; 4]>> =
        reader.read_colors(0).map(|c| c.into_rgba_f32().collect());
    let joints: Option<Vec<[u16; 4]>> = reader.read_joints(0).map(|j| j.into_u16().collect());
    let weights: Option<Vec<[f32; 4]>> = reader.read_weights(0).map(|w| w.into_f32().collect());

    // The default material factor is white, leaving colors untouched
    let base_color_factor = primitive
        .material()
        .pbr_metallic_roughness()
        .base_color_factor();

    let mut bounds = Aabb::default();
    let mut vertices = Vec::with_capacity(positions.len());
    for (i, position) in positions.iter().enumerate() {
        bounds.expand_to_include(Vec3::from_array(*position));

        let mut color = colors
            .as_ref()
            .and_then(|c| c.get(i).copied())
            .unwrap_or(Vertex::DEFAULT_COLOR);
        for (c, f) in color.iter_mut().zip(base_color_factor.iter()) {
            *c *= f;
        }

        vertices.push(Vertex {
            position: *position,
            normal: normals
                .as_ref()
                .and_then(|n| n.get(i).copied())
                .unwrap_or(Vertex::DEFAULT_NORMAL),
            tex_coord: tex_coords
                .as_ref()
                .and_then(|t| t.get(i).copied())
                .unwrap_or(Vertex::DEFAULT_TEX_COORD),
            color,
            joints: joints
                .as_ref()
                .and_then(|j| j.get(i).copied())
                .unwrap_or(Vertex::DEFAULT_JOINTS),
            weights: weights
                .as_ref()
                .and_then(|w| w.get(i).copied())
                .unwrap_or(Vertex::DEFAULT_WEIGHTS),
        });
    }

    // Unindexed primitives draw their vertices in order
    let raw_indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };

    checked::cast::<u32, usize>(raw_indices.len()).ok_or(AssetError::TooMany("indices"))?;

    // Narrow to 16-bit indices when the whole range fits
    let indices = if raw_indices.iter().all(|&i| i <= u32::from(u16::MAX)) {
        IndexData::U16(raw_indices.into_iter().map(|i| i as u16).collect())
    } else {
        IndexData::U32(raw_indices)
    };

    let base_color_image = primitive
        .material()
        .pbr_metallic_roughness()
        .base_color_texture()
        .map(|info| info.texture().source().index());

    Ok(MeshData {
        name: mesh.name().map(String::from),
        vertices,
        indices,
        base_color_image,
        bounds,
    })
}

/// Expand a decoded glTF image to RGBA8.
fn decode_image(data: &gltf::image::Data) -> Result<ImageData> {
    use gltf::image::Format;

    let pixel_count = checked::mul(data.width as usize, data.height as usize)
        .ok_or(AssetError::TooMany("pixels"))?;

    let pixels = match data.format {
        Format::R8G8B8A8 => data.pixels.clone(),
        Format::R8G8B8 => {
            let mut out = Vec::with_capacity(pixel_count * 4);
            for rgb in data.pixels.chunks_exact(3) {
                out.extend_from_slice(rgb);
                out.push(255);
            }
            out
        }
        Format::R8 => {
            let mut out = Vec::with_capacity(pixel_count * 4);
            for &g in &data.pixels {
                out.extend_from_slice(&[g, g, g, 255]);
            }
            out
        }
        other => {
            return Err(AssetError::Invalid(format!(
                "unsupported image format {other:?}"
            )))
        }
    };

    if pixels.len() != pixel_count * 4 {
        return Err(AssetError::Invalid(format!(
            "image payload is {} bytes, expected {}",
            pixels.len(),
            pixel_count * 4
        )));
    }

    Ok(ImageData {
        width: data.width,
        height: data.height,
        pixels,
    })
}

fn read_nodes(document: &gltf::Document) -> Vec<NodeData> {
    let mut nodes: Vec<NodeData> = document
        .nodes()
        .map(|node| {
            let (translation, rotation, scale) = node.transform().decomposed();
            NodeData {
                name: node.name().map(String::from),
                parent: None,
                translation: Vec3::from_array(translation),
                rotation: Quat::from_array(rotation),
                scale: Vec3::from_array(scale),
                mesh: node.mesh().map(|m| m.index()),
                skin: node.skin().map(|s| s.index()),
            }
        })
        .collect();

    for node in document.nodes() {
        for child in node.children() {
            nodes[child.index()].parent = Some(node.index());
        }
    }

    nodes
}

fn read_skins(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<SkinData>> {
    let mut skins = Vec::new();
    for skin in document.skins() {
        let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();

        let reader = skin.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
        let inverse_bind: Vec<Mat4> = match reader.read_inverse_bind_matrices() {
            Some(matrices) => matrices.map(|m| Mat4::from_cols_array_2d(&m)).collect(),
            // Absent matrices default to identity per the glTF spec
            None => vec![Mat4::IDENTITY; joints.len()],
        };

        if inverse_bind.len() != joints.len() {
            return Err(AssetError::Invalid(format!(
                "skin has {} joints but {} inverse bind matrices",
                joints.len(),
                inverse_bind.len()
            )));
        }

        skins.push(SkinData {
            joints,
            inverse_bind,
        });
    }
    Ok(skins)
}

fn read_animations(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<AnimationData>> {
    let mut animations = Vec::new();
    for animation in document.animations() {
        let mut channels = Vec::new();
        let mut duration = 0.0f32;

        for channel in animation.channels() {
            let interpolation = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Linear => Interpolation::Linear,
                gltf::animation::Interpolation::Step => Interpolation::Step,
                other => {
                    return Err(AssetError::Invalid(format!(
                        "unsupported interpolation {other:?}"
                    )))
                }
            };

            let reader =
                channel.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

            let times: Vec<f32> = reader
                .read_inputs()
                .ok_or_else(|| AssetError::Invalid("channel without inputs".into()))?
                .collect();

            if let Some(&last) = times.last() {
                duration = duration.max(last);
            }

            let values = match reader
                .read_outputs()
                .ok_or_else(|| AssetError::Invalid("channel without outputs".into()))?
            {
                gltf::animation::util::ReadOutputs::Translations(iter) => {
                    ChannelValues::Translations(iter.map(Vec3::from_array).collect())
                }
                gltf::animation::util::ReadOutputs::Rotations(iter) => ChannelValues::Rotations(
                    iter.into_f32().map(Quat::from_array).collect(),
                ),
                gltf::animation::util::ReadOutputs::Scales(iter) => {
                    ChannelValues::Scales(iter.map(Vec3::from_array).collect())
                }
                gltf::animation::util::ReadOutputs::MorphTargetWeights(_) => {
                    // Morph targets are not part of this renderer
                    continue;
                }
            };

            channels.push(ChannelData {
                node: channel.target().node().index(),
                times,
                values,
                interpolation,
            });
        }

        animations.push(AnimationData {
            name: animation.name().map(String::from),
            channels,
            duration,
        });
    }
    Ok(animations)
}

#[cfg(test)]
mod tests {
    use super::*;

    static TRIANGLE_GLTF: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/test_data/triangle.gltf"
    ));

    #[test]
    fn triangle_imports_to_one_u16_mesh() {
        let asset = import_slice(TRIANGLE_GLTF).unwrap();

        assert_eq!(asset.meshes.len(), 1);
        let mesh = &asset.meshes[0];
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, IndexData::U16(vec![0, 1, 2]));
        assert_eq!(mesh.indices.len(), 3);
    }

    #[test]
    fn triangle_vertices_get_documented_fallbacks() {
        let asset = import_slice(TRIANGLE_GLTF).unwrap();
        for v in &asset.meshes[0].vertices {
            assert_eq!(v.normal, Vertex::DEFAULT_NORMAL);
            assert_eq!(v.tex_coord, Vertex::DEFAULT_TEX_COORD);
            assert_eq!(v.color, Vertex::DEFAULT_COLOR);
            assert_eq!(v.joints, Vertex::DEFAULT_JOINTS);
            assert_eq!(v.weights, Vertex::DEFAULT_WEIGHTS);
        }
    }

    #[test]
    fn triangle_bounds_cover_positions() {
        let asset = import_slice(TRIANGLE_GLTF).unwrap();
        let bounds = asset.meshes[0].bounds;
        assert_eq!(bounds.min, Vec3::ZERO);
        assert_eq!(bounds.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn triangle_summary_snapshot() {
        let asset = import_slice(TRIANGLE_GLTF).unwrap();
        insta::assert_yaml_snapshot!(asset.summary(), @r###"
        ---
        meshes: 1
        images: 0
        skins: 0
        animations: 0
        total_vertices: 3
        total_indices: 3
        "###);
    }

    #[test]
    fn wide_indices_stay_u32() {
        // 70k vertices cannot be indexed with u16
        let raw: Vec<u32> = vec![0, 70_000];
        assert!(!raw.iter().all(|&i| i <= u32::from(u16::MAX)));
    }
}
