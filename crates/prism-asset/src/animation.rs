//! Animation sampling and node hierarchy evaluation.

use crate::import::{AnimationData, ChannelValues, Interpolation, NodeData};
use glam::{Mat4, Quat, Vec3};

/// A node's local translation/rotation/scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl LocalTransform {
    /// Compose into a matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// The rest pose of a node hierarchy.
pub fn rest_pose(nodes: &[NodeData]) -> Vec<LocalTransform> {
    nodes.iter().map(NodeData::local_transform).collect()
}

/// Overwrite posed locals with the clip sampled at `time` seconds.
///
/// Channels clamp to their first/last keyframe outside the keyframe
/// range; looping is the caller's concern (`time % clip.duration`).
/// Nodes the clip does not target keep their current transform.
pub fn sample_animation(clip: &AnimationData, time: f32, pose: &mut [LocalTransform]) {
    for channel in &clip.channels {
        let Some(target) = pose.get_mut(channel.node) else {
            continue;
        };

        match &channel.values {
            ChannelValues::Translations(values) => {
                if let Some(v) =
                    sample_vec3(&channel.times, values, time, channel.interpolation)
                {
                    target.translation = v;
                }
            }
            ChannelValues::Scales(values) => {
                if let Some(v) =
                    sample_vec3(&channel.times, values, time, channel.interpolation)
                {
                    target.scale = v;
                }
            }
            ChannelValues::Rotations(values) => {
                if let Some(q) =
                    sample_quat(&channel.times, values, time, channel.interpolation)
                {
                    target.rotation = q;
                }
            }
        }
    }
}

/// Model-space transform of every node.
///
/// `pose` must be one local transform per node, in node order.
pub fn global_transforms(nodes: &[NodeData], pose: &[LocalTransform]) -> Vec<Mat4> {
    let mut globals: Vec<Option<Mat4>> = vec![None; nodes.len()];
    for i in 0..nodes.len() {
        resolve_global(nodes, pose, &mut globals, i);
    }
    globals
        .into_iter()
        .map(|g| g.unwrap_or(Mat4::IDENTITY))
        .collect()
}

fn resolve_global(
    nodes: &[NodeData],
    pose: &[LocalTransform],
    globals: &mut [Option<Mat4>],
    index: usize,
) -> Mat4 {
    if let Some(cached) = globals[index] {
        return cached;
    }

    let local = pose
        .get(index)
        .copied()
        .unwrap_or_default()
        .matrix();

    let global = match nodes[index].parent {
        Some(parent) => resolve_global(nodes, pose, globals, parent) * local,
        None => local,
    };

    globals[index] = Some(global);
    global
}

/// Locate the keyframe pair bracketing `time` and the blend factor.
///
/// Returns `None` for an empty channel; clamps outside the range.
fn keyframe_segment(times: &[f32], time: f32) -> Option<(usize, usize, f32)> {
    if times.is_empty() {
        return None;
    }
    if time <= times[0] {
        return Some((0, 0, 0.0));
    }
    let last = times.len() - 1;
    if time >= times[last] {
        return Some((last, last, 0.0));
    }

    // times are sorted per the glTF spec
    let next = times.partition_point(|&t| t <= time);
    let prev = next - 1;
    let span = times[next] - times[prev];
    let factor = if span > 0.0 {
        (time - times[prev]) / span
    } else {
        0.0
    };
    Some((prev, next, factor))
}

fn sample_vec3(
    times: &[f32],
    values: &[Vec3],
    time: f32,
    interpolation: Interpolation,
) -> Option<Vec3> {
    let (prev, next, factor) = keyframe_segment(times, time)?;
    let a = *values.get(prev)?;
    match interpolation {
        Interpolation::Step => Some(a),
        Interpolation::Linear => {
            let b = *values.get(next)?;
            Some(a.lerp(b, factor))
        }
    }
}

fn sample_quat(
    times: &[f32],
    values: &[Quat],
    time: f32,
    interpolation: Interpolation,
) -> Option<Quat> {
    let (prev, next, factor) = keyframe_segment(times, time)?;
    let a = *values.get(prev)?;
    match interpolation {
        Interpolation::Step => Some(a),
        Interpolation::Linear => {
            let b = *values.get(next)?;
            Some(a.slerp(b, factor))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ChannelData;
    use approx::assert_relative_eq;

    fn translation_clip(times: Vec<f32>, values: Vec<Vec3>) -> AnimationData {
        let duration = times.last().copied().unwrap_or(0.0);
        AnimationData {
            name: None,
            channels: vec![ChannelData {
                node: 0,
                times,
                values: ChannelValues::Translations(values),
                interpolation: Interpolation::Linear,
            }],
            duration,
        }
    }

    fn single_node() -> Vec<NodeData> {
        vec![NodeData {
            name: None,
            parent: None,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            mesh: None,
            skin: None,
        }]
    }

    #[test]
    fn linear_interpolation_blends_midway() {
        let clip = translation_clip(vec![0.0, 2.0], vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)]);
        let mut pose = vec![LocalTransform::default()];

        sample_animation(&clip, 1.0, &mut pose);
        assert_relative_eq!(pose[0].translation.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn clamps_outside_keyframe_range() {
        let clip = translation_clip(vec![1.0, 2.0], vec![Vec3::X, Vec3::Y]);
        let mut pose = vec![LocalTransform::default()];

        sample_animation(&clip, 0.0, &mut pose);
        assert_eq!(pose[0].translation, Vec3::X);

        sample_animation(&clip, 5.0, &mut pose);
        assert_eq!(pose[0].translation, Vec3::Y);
    }

    #[test]
    fn step_interpolation_holds_left_value() {
        let mut clip = translation_clip(vec![0.0, 1.0], vec![Vec3::ZERO, Vec3::X]);
        clip.channels[0].interpolation = Interpolation::Step;
        let mut pose = vec![LocalTransform::default()];

        sample_animation(&clip, 0.9, &mut pose);
        assert_eq!(pose[0].translation, Vec3::ZERO);
    }

    #[test]
    fn globals_chain_through_parents() {
        let mut nodes = single_node();
        nodes.push(NodeData {
            name: None,
            parent: Some(0),
            translation: Vec3::X,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            mesh: None,
            skin: None,
        });

        let mut pose = rest_pose(&nodes);
        pose[0].translation = Vec3::Y;

        let globals = global_transforms(&nodes, &pose);
        let child_origin = globals[1].transform_point3(Vec3::ZERO);
        assert_relative_eq!(child_origin.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(child_origin.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn untargeted_nodes_keep_their_pose() {
        let clip = translation_clip(vec![0.0], vec![Vec3::X]);
        let mut pose = vec![LocalTransform::default(), LocalTransform::default()];
        pose[1].translation = Vec3::Z;

        sample_animation(&clip, 0.0, &mut pose);
        assert_eq!(pose[0].translation, Vec3::X);
        assert_eq!(pose[1].translation, Vec3::Z);
    }
}
