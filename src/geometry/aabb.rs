use crate::math::{Transform, Vec3};

/// An axis-aligned bounding box defined by minimum and maximum points.
///
/// Used by the broadphase and by the octree spatial index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// An empty AABB that contains no points
    pub const EMPTY: Self = Self {
        min: Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
        max: Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    /// Bounds of unbounded shapes such as planes.
    ///
    /// Uses `f32::MAX` rather than infinity so that overlap tests never see NaN.
    pub const INFINITE: Self = Self {
        min: Vec3::new(-f32::MAX, -f32::MAX, -f32::MAX),
        max: Vec3::new(f32::MAX, f32::MAX, f32::MAX),
    };

    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points
            .into_iter()
            .fold(Self::EMPTY, |aabb, point| aabb.expand_to_include(point))
    }

    #[inline]
    pub fn center(self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn half_extents(self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    #[inline]
    pub fn size(self) -> Vec3 {
        self.max - self.min
    }

    /// True when the box has non-negative extent on every axis
    #[inline]
    pub fn is_valid(self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// True for a valid box whose corners are real coordinates, not the plane sentinels
    #[inline]
    pub fn is_bounded(self) -> bool {
        const LIMIT: f32 = 1e18;
        self.is_valid()
            && self.min.is_finite()
            && self.max.is_finite()
            && self.min.min_element() > -LIMIT
            && self.max.max_element() < LIMIT
    }

    #[inline]
    pub fn contains_point(self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// True when `other` lies completely inside this box (shared faces count as inside)
    #[inline]
    pub fn contains_aabb(self, other: Self) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Overlap test, inclusive on shared boundaries
    #[inline]
    pub fn overlaps(self, other: Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[inline]
    pub fn expand_to_include(self, point: Vec3) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    pub fn corners(self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Bounds of this world-space box as seen from inside `frame`
    pub fn to_local_frame(self, frame: &Transform) -> Self {
        if !self.is_bounded() {
            return Self::INFINITE;
        }
        Self::from_points(self.corners().map(|c| frame.inverse_transform_point(c)))
    }

    /// Bounds of this `frame`-local box in world space
    pub fn to_world_frame(self, frame: &Transform) -> Self {
        if !self.is_bounded() {
            return Self::INFINITE;
        }
        Self::from_points(self.corners().map(|c| frame.transform_point(c)))
    }

    /// Slab test. Returns the entry and exit distances along the ray.
    pub fn ray_intersection(self, origin: Vec3, direction: Vec3) -> Option<(f32, f32)> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            if direction[axis].abs() < 1e-12 {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction[axis];
            let t1 = (self.min[axis] - origin[axis]) * inv;
            let t2 = (self.max[axis] - origin[axis]) * inv;
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
        }

        if t_max >= t_min && t_max >= 0.0 {
            Some((t_min.max(0.0), t_max))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quat;
    use std::f32::consts::PI;

    #[test]
    fn test_center_and_extents() {
        let aabb = Aabb::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.center(), Vec3::ZERO);
        assert_eq!(aabb.half_extents(), Vec3::new(1.0, 2.0, 3.0));
        assert!(aabb.is_bounded());
        assert!(!Aabb::INFINITE.is_bounded());
        assert!(!Aabb::EMPTY.is_valid());
    }

    #[test]
    fn test_overlap_is_inclusive() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let touching = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let apart = Aabb::new(Vec3::new(1.001, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));

        assert!(a.overlaps(touching));
        assert!(touching.overlaps(a));
        assert!(!a.overlaps(apart));
        assert!(a.overlaps(Aabb::INFINITE));
    }

    #[test]
    fn test_containment_and_union() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0));
        let u = a.union(b);

        assert!(u.contains_aabb(a));
        assert!(u.contains_aabb(b));
        assert!(!a.contains_aabb(u));
        assert!(a.contains_point(Vec3::ONE));
        assert_eq!(u, Aabb::new(Vec3::ZERO, Vec3::splat(3.0)));
    }

    #[test]
    fn test_frame_round_trip() {
        let frame = Transform::new(Vec3::new(5.0, 0.0, 0.0), Quat::from_axis_angle(Vec3::Z, PI / 2.0));
        let local = Aabb::new(Vec3::new(-1.0, -2.0, -0.5), Vec3::new(1.0, 2.0, 0.5));

        let world = local.to_world_frame(&frame);
        // X and Y extents swap under the quarter turn
        assert!(world.min.almost_equals(Vec3::new(3.0, -1.0, -0.5), 1e-5));
        assert!(world.max.almost_equals(Vec3::new(7.0, 1.0, 0.5), 1e-5));

        let back = world.to_local_frame(&frame);
        assert!(back.min.almost_equals(local.min, 1e-5));
        assert!(back.max.almost_equals(local.max, 1e-5));
    }

    #[test]
    fn test_ray_intersection() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::ONE);

        let (t_in, t_out) = aabb
            .ray_intersection(Vec3::new(-5.0, 0.0, 0.0), Vec3::X)
            .unwrap();
        assert!((t_in - 4.0).abs() < 1e-6);
        assert!((t_out - 6.0).abs() < 1e-6);

        assert!(aabb.ray_intersection(Vec3::new(-5.0, 2.0, 0.0), Vec3::X).is_none());
    }
}
