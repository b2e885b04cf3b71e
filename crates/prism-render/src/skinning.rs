//! Joint palette computation for skeletal animation.

use glam::Mat4;

/// Compute the joint matrix palette uploaded to the skinned pipeline.
///
/// `globals[i]` is joint `i`'s model-space transform for the current
/// pose; `inverse_bind[i]` maps bind-pose vertices into joint space.
/// Both slices use the skin's joint order. Extra entries in either slice
/// are ignored.
pub fn joint_matrices(globals: &[Mat4], inverse_bind: &[Mat4]) -> Vec<Mat4> {
    globals
        .iter()
        .zip(inverse_bind.iter())
        .map(|(global, inv)| *global * *inv)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec3;

    #[test]
    fn bind_pose_yields_identity() {
        // In bind pose, global == inverse(inverse_bind)
        let bind = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let palette = joint_matrices(&[bind], &[bind.inverse()]);
        assert_eq!(palette.len(), 1);
        let diff = (palette[0] - Mat4::IDENTITY).to_cols_array();
        for v in diff {
            assert_relative_eq!(v, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn palette_moves_bind_space_points() {
        // Joint at origin in bind pose, posed one unit up: a vertex bound
        // to it moves one unit up.
        let inverse_bind = Mat4::IDENTITY;
        let global = Mat4::from_translation(Vec3::Y);
        let palette = joint_matrices(&[global], &[inverse_bind]);
        let moved = palette[0].transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(moved.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(moved.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(moved.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn length_is_min_of_inputs() {
        let palette = joint_matrices(&[Mat4::IDENTITY; 3], &[Mat4::IDENTITY; 2]);
        assert_eq!(palette.len(), 2);
    }
}
