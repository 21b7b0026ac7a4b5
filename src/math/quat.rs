use std::ops::{Mul, MulAssign, Neg};

use serde::{Deserialize, Serialize};

use super::vec3::Vec3;

/// A quaternion representing a rotation in 3D space.
///
/// Stored as (x, y, z, w) where w is the scalar part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// Identity quaternion (no rotation)
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Creates a quaternion from a rotation axis and angle (in radians)
    #[inline]
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let (s, c) = (angle * 0.5).sin_cos();
        let axis = axis.normalize();
        Self::new(axis.x * s, axis.y * s, axis.z * s, c)
    }

    /// Shortest-arc rotation taking `from` onto `to`
    pub fn from_rotation_arc(from: Vec3, to: Vec3) -> Self {
        let from = from.normalize();
        let to = to.normalize();
        let dot = from.dot(to);

        if dot > 0.9999 {
            return Self::IDENTITY;
        }

        if dot < -0.9999 {
            // Opposite vectors: any perpendicular axis works
            let (axis, _) = from.tangents();
            return Self::from_axis_angle(axis, std::f32::consts::PI);
        }

        let cross = from.cross(to);
        Self::new(cross.x, cross.y, cross.z, 1.0 + dot).normalize()
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Returns a unit quaternion, or identity when the length collapses to zero
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > 1e-10 {
            let inv_len = 1.0 / len;
            Self::new(self.x * inv_len, self.y * inv_len, self.z * inv_len, self.w * inv_len)
        } else {
            Self::IDENTITY
        }
    }

    /// One Newton step towards unit length. Cheap, only valid for nearly unit input.
    #[inline]
    pub fn normalize_fast(self) -> Self {
        let f = (3.0 - self.length_squared()) * 0.5;
        Self::new(self.x * f, self.y * f, self.z * f, self.w * f)
    }

    /// Inverse rotation for unit quaternions
    #[inline]
    pub fn conjugate(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    #[inline]
    pub fn rotate_vec(self, v: Vec3) -> Vec3 {
        let qv = Vec3::new(self.x, self.y, self.z);
        let uv = qv.cross(v);
        let uuv = qv.cross(uv);
        v + (uv * self.w + uuv) * 2.0
    }

    #[inline]
    pub fn inverse_rotate_vec(self, v: Vec3) -> Vec3 {
        self.conjugate().rotate_vec(v)
    }

    /// Spherical linear interpolation along the shorter arc
    pub fn slerp(self, other: Self, t: f32) -> Self {
        let mut dot = self.dot(other);

        let other = if dot < 0.0 {
            dot = -dot;
            -other
        } else {
            other
        };

        // Nearly identical rotations: fall back to normalized lerp
        if dot > 0.9995 {
            return Self::new(
                self.x + t * (other.x - self.x),
                self.y + t * (other.y - self.y),
                self.z + t * (other.z - self.z),
                self.w + t * (other.w - self.w),
            )
            .normalize();
        }

        let theta = dot.clamp(-1.0, 1.0).acos();
        let sin_theta = theta.sin();
        let s0 = ((1.0 - t) * theta).sin() / sin_theta;
        let s1 = (t * theta).sin() / sin_theta;

        Self::new(
            s0 * self.x + s1 * other.x,
            s0 * self.y + s1 * other.y,
            s0 * self.z + s1 * other.z,
            s0 * self.w + s1 * other.w,
        )
    }

    /// First-order step of `q' = 0.5 * (w, 0) * q`.
    ///
    /// The result drifts off unit length; callers renormalize.
    #[inline]
    pub fn integrate(self, angular_velocity: Vec3, dt: f32) -> Self {
        let half_dt = dt * 0.5;
        let (ax, ay, az) = (angular_velocity.x, angular_velocity.y, angular_velocity.z);

        Self::new(
            self.x + half_dt * (ax * self.w + ay * self.z - az * self.y),
            self.y + half_dt * (ay * self.w + az * self.x - ax * self.z),
            self.z + half_dt * (az * self.w + ax * self.y - ay * self.x),
            self.w + half_dt * (-ax * self.x - ay * self.y - az * self.z),
        )
    }
}

impl Mul for Quat {
    type Output = Self;

    /// Quaternion multiplication (combines rotations, `self` applied last)
    #[inline]
    fn mul(self, other: Self) -> Self {
        Self::new(
            self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
            self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
        )
    }
}

impl MulAssign for Quat {
    #[inline]
    fn mul_assign(&mut self, other: Self) {
        *self = *self * other;
    }
}

impl Neg for Quat {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, -self.w)
    }
}
