//! Math utilities and helpers.

use glam::Vec3;

/// Axis-Aligned Bounding Box.
#[derive(Clone, Copy, Debug)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Default for Aabb {
    /// An empty box that absorbs the first point it is expanded by.
    fn default() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }
}

impl Aabb {
    /// Create a new AABB from min and max corners
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Get the center of the AABB
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size of the AABB
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Radius of the bounding sphere, used for camera framing
    #[inline]
    pub fn radius(&self) -> f32 {
        self.size().length() * 0.5
    }

    /// Expand AABB to include a point
    #[inline]
    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Merge two AABBs
    #[inline]
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_from_empty() {
        let mut aabb = Aabb::default();
        aabb.expand_to_include(Vec3::new(1.0, 2.0, 3.0));
        aabb.expand_to_include(Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(aabb.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn merge_covers_both() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(-2.0), Vec3::splat(-1.0));
        let m = a.merge(&b);
        assert_eq!(m.min, Vec3::splat(-2.0));
        assert_eq!(m.max, Vec3::ONE);
    }

    #[test]
    fn center_and_size() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        assert_eq!(aabb.center(), Vec3::ONE);
        assert_eq!(aabb.size(), Vec3::splat(2.0));
    }
}
