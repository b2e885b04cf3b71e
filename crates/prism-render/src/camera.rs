//! Camera and view management.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Camera for rendering.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Create a camera looking from `position` at `target`.
    pub fn look_from(position: Vec3, target: Vec3, aspect: f32) -> Self {
        Self {
            position,
            direction: (target - position).normalize(),
            aspect,
            ..Default::default()
        }
    }

    /// Place the camera on an orbit around `target`.
    ///
    /// `yaw` rotates around Y, `pitch` tilts toward the poles, `radius`
    /// is the distance from the target.
    pub fn orbit(&mut self, target: Vec3, yaw: f32, pitch: f32, radius: f32) {
        let pitch = pitch.clamp(
            -std::f32::consts::FRAC_PI_2 + 0.01,
            std::f32::consts::FRAC_PI_2 - 0.01,
        );
        let offset = Vec3::new(
            radius * pitch.cos() * yaw.sin(),
            radius * pitch.sin(),
            radius * pitch.cos() * yaw.cos(),
        );
        self.position = target + offset;
        self.direction = (target - self.position).normalize();
    }

    /// Look at a target position.
    pub fn look_at(&mut self, target: Vec3) {
        self.direction = (target - self.position).normalize();
    }

    /// Set the aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.direction, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        // Vulkan clip space has an inverted Y relative to GL
        let mut proj = Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
        proj.y_axis.y *= -1.0;
        proj
    }

    /// Uniform block for the vertex stage.
    pub fn uniforms(&self) -> CameraUniforms {
        CameraUniforms {
            view_proj: (self.projection_matrix() * self.view_matrix()).to_cols_array_2d(),
            position: [self.position.x, self.position.y, self.position.z, 1.0],
        }
    }
}

/// GPU-side camera data.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn orbit_keeps_radius() {
        let mut camera = Camera::default();
        camera.orbit(Vec3::ZERO, 1.3, 0.4, 8.0);
        assert_relative_eq!(camera.position.length(), 8.0, epsilon = 1e-4);
    }

    #[test]
    fn orbit_looks_at_target() {
        let mut camera = Camera::default();
        let target = Vec3::new(1.0, 2.0, 3.0);
        camera.orbit(target, 0.7, -0.2, 5.0);
        let expected = (target - camera.position).normalize();
        assert_relative_eq!(camera.direction.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(camera.direction.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(camera.direction.z, expected.z, epsilon = 1e-5);
    }

    #[test]
    fn projection_flips_y_for_vulkan() {
        let camera = Camera::default();
        let proj = camera.projection_matrix();
        assert!(proj.y_axis.y < 0.0);
    }
}
