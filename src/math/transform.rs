use serde::{Deserialize, Serialize};

use super::quat::Quat;
use super::vec3::Vec3;

/// A rigid frame: position plus orientation.
///
/// Shapes are posed in the world through a `Transform` built from their body's pose
/// and their own offset within the body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    #[inline]
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    #[inline]
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Local point to world point
    #[inline]
    pub fn transform_point(self, point: Vec3) -> Vec3 {
        self.rotation.rotate_vec(point) + self.position
    }

    /// Local direction to world direction (no translation)
    #[inline]
    pub fn transform_vector(self, vector: Vec3) -> Vec3 {
        self.rotation.rotate_vec(vector)
    }

    #[inline]
    pub fn inverse_transform_point(self, point: Vec3) -> Vec3 {
        self.rotation.inverse_rotate_vec(point - self.position)
    }

    #[inline]
    pub fn inverse_transform_vector(self, vector: Vec3) -> Vec3 {
        self.rotation.inverse_rotate_vec(vector)
    }

    /// Places `child` (expressed in this frame) into the parent space of `self`
    #[inline]
    pub fn compose(self, child: Self) -> Self {
        Self {
            position: self.transform_point(child.position),
            rotation: self.rotation * child.rotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const EPSILON: f32 = 1e-5;

    fn vec3_approx_eq(a: Vec3, b: Vec3) -> bool {
        a.distance_squared(b) < EPSILON * EPSILON
    }

    #[test]
    fn test_point_round_trip() {
        let t = Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), PI / 3.0),
        );
        let p = Vec3::new(-2.0, 0.5, 4.0);

        assert!(vec3_approx_eq(t.inverse_transform_point(t.transform_point(p)), p));
        assert!(vec3_approx_eq(t.inverse_transform_vector(t.transform_vector(p)), p));
    }

    #[test]
    fn test_translation_does_not_move_vectors() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        assert!(vec3_approx_eq(t.transform_point(Vec3::ONE), Vec3::new(2.0, 3.0, 4.0)));
        assert!(vec3_approx_eq(t.transform_vector(Vec3::ONE), Vec3::ONE));
    }

    #[test]
    fn test_compose_shape_offset() {
        // Body rotated 90 degrees about Z, shape offset one unit along body X
        let body = Transform::new(Vec3::new(0.0, 0.0, 5.0), Quat::from_axis_angle(Vec3::Z, PI / 2.0));
        let shape = Transform::from_position(Vec3::X);

        let world = body.compose(shape);
        assert!(vec3_approx_eq(world.position, Vec3::new(0.0, 1.0, 5.0)));
        assert!(vec3_approx_eq(world.transform_vector(Vec3::X), Vec3::Y));
    }
}
