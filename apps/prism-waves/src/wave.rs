//! Travelling-wave math for the water surface.
//!
//! The surface is a superposition of sine waves evaluated on the CPU
//! every frame; the grid vertices are rewritten into a host-visible
//! vertex buffer.

use glam::{Vec2, Vec3};
use prism_render::Vertex;
use std::f32::consts::TAU;

/// One travelling sine wave.
#[derive(Debug, Clone, Copy)]
pub struct Wave {
    /// Peak height.
    pub amplitude: f32,
    /// Crest-to-crest distance.
    pub wavelength: f32,
    /// Propagation speed in units per second.
    pub speed: f32,
    /// Travel direction in the XZ plane.
    pub direction: Vec2,
}

impl Wave {
    pub fn new(amplitude: f32, wavelength: f32, speed: f32, direction: Vec2) -> Self {
        Self {
            amplitude,
            wavelength,
            speed,
            direction: direction.normalize_or_zero(),
        }
    }
}

/// A default-looking choppy sea.
pub fn default_waves() -> Vec<Wave> {
    vec![
        Wave::new(0.30, 8.0, 2.0, Vec2::new(1.0, 0.3)),
        Wave::new(0.15, 4.1, 1.4, Vec2::new(-0.7, 1.0)),
        Wave::new(0.08, 2.3, 2.6, Vec2::new(0.2, -1.0)),
    ]
}

/// Surface height at `pos` and `time`.
pub fn height(waves: &[Wave], pos: Vec2, time: f32) -> f32 {
    waves
        .iter()
        .map(|w| {
            let k = TAU / w.wavelength;
            w.amplitude * (k * (w.direction.dot(pos) - w.speed * time)).sin()
        })
        .sum()
}

/// Surface normal at `pos` and `time`, by central differences.
pub fn normal(waves: &[Wave], pos: Vec2, time: f32) -> Vec3 {
    const EPS: f32 = 0.01;
    let dx = height(waves, pos + Vec2::new(EPS, 0.0), time)
        - height(waves, pos - Vec2::new(EPS, 0.0), time);
    let dz = height(waves, pos + Vec2::new(0.0, EPS), time)
        - height(waves, pos - Vec2::new(0.0, EPS), time);
    Vec3::new(-dx / (2.0 * EPS), 1.0, -dz / (2.0 * EPS)).normalize()
}

/// Triangle-list indices for an `n` x `n` vertex grid.
pub fn grid_indices(n: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity((n - 1) * (n - 1) * 6);
    for row in 0..n - 1 {
        for col in 0..n - 1 {
            let top_left = (row * n + col) as u32;
            let top_right = top_left + 1;
            let bottom_left = top_left + n as u32;
            let bottom_right = bottom_left + 1;

            indices.extend_from_slice(&[
                top_left,
                bottom_left,
                top_right,
                top_right,
                bottom_left,
                bottom_right,
            ]);
        }
    }
    indices
}

/// Fill `vertices` with the displaced grid for the given time.
///
/// The grid is `n` x `n` vertices, `spacing` apart, centered on the
/// origin of the XZ plane.
pub fn fill_grid(vertices: &mut Vec<Vertex>, waves: &[Wave], n: usize, spacing: f32, time: f32) {
    vertices.clear();
    let half = (n as f32 - 1.0) * spacing * 0.5;

    for row in 0..n {
        for col in 0..n {
            let x = col as f32 * spacing - half;
            let z = row as f32 * spacing - half;
            let pos2 = Vec2::new(x, z);

            let y = height(waves, pos2, time);
            let normal = normal(waves, pos2, time);

            let mut vertex = Vertex::from_position([x, y, z]);
            vertex.normal = normal.to_array();
            vertex.color = [0.18, 0.42, 0.66, 1.0];
            vertices.push(vertex);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn flat_sea_without_amplitude() {
        let waves = [Wave::new(0.0, 4.0, 1.0, Vec2::X)];
        let h = height(&waves, Vec2::new(3.0, -2.0), 1.7);
        assert_relative_eq!(h, 0.0);

        let n = normal(&waves, Vec2::ZERO, 0.0);
        assert_relative_eq!(n.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn height_is_time_periodic() {
        let waves = [Wave::new(0.5, 4.0, 2.0, Vec2::X)];
        // Temporal period is wavelength / speed
        let period = 4.0 / 2.0;
        let pos = Vec2::new(1.3, 0.4);
        let a = height(&waves, pos, 0.37);
        let b = height(&waves, pos, 0.37 + period);
        assert_relative_eq!(a, b, epsilon = 1e-4);
    }

    #[test]
    fn height_bounded_by_total_amplitude() {
        let waves = default_waves();
        let bound: f32 = waves.iter().map(|w| w.amplitude).sum();
        for i in 0..100 {
            let pos = Vec2::new(i as f32 * 0.37, i as f32 * -0.21);
            let h = height(&waves, pos, i as f32 * 0.1);
            assert!(h.abs() <= bound + 1e-5);
        }
    }

    #[test]
    fn grid_indices_cover_all_quads() {
        let n = 4;
        let indices = grid_indices(n);
        assert_eq!(indices.len(), (n - 1) * (n - 1) * 6);
        assert!(indices.iter().all(|&i| (i as usize) < n * n));
    }

    #[test]
    fn grid_vertices_are_centered() {
        let mut vertices = Vec::new();
        fill_grid(&mut vertices, &[], 3, 1.0, 0.0);
        assert_eq!(vertices.len(), 9);
        assert_eq!(vertices[0].position[0], -1.0);
        assert_eq!(vertices[8].position[0], 1.0);
        // No waves: flat at y = 0
        assert!(vertices.iter().all(|v| v.position[1] == 0.0));
    }
}
