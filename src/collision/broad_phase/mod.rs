//! Candidate pair search over body bounding boxes.

mod naive;
mod octree;
mod sap;

pub use naive::NaiveBroadphase;
pub use octree::OctreeBroadphase;
pub use sap::{SapAxis, SapBroadphase};

use std::fmt::Debug;

use crate::collision::contact::BodyHandle;
use crate::dynamics::RigidBody;
use crate::geometry::Aabb;

/// Produces the body pairs whose bounds may touch this step.
///
/// `bodies` is the world's slot vector; slots with an invalid handle are free and
/// must be skipped.
pub trait Broadphase: Debug {
    /// Appends each overlapping, collidable pair once
    fn collision_pairs(&mut self, bodies: &[RigidBody], pairs: &mut Vec<(BodyHandle, BodyHandle)>);

    /// Swaps the AABB test for a bounding-sphere distance test
    fn set_use_bounding_sphere(&mut self, enabled: bool);

    /// Appends every body whose AABB overlaps `aabb`
    fn aabb_query(&self, bodies: &[RigidBody], aabb: Aabb, result: &mut Vec<BodyHandle>) {
        result.extend(
            bodies
                .iter()
                .filter(|b| b.handle.is_valid() && b.aabb().overlaps(aabb))
                .map(|b| b.handle),
        );
    }
}

/// Whether two bodies may collide at all, regardless of where they are
pub fn need_broadphase_collision(a: &RigidBody, b: &RigidBody) -> bool {
    if !a.handle.is_valid() || !b.handle.is_valid() || a.handle == b.handle {
        return false;
    }

    if (a.collision_filter_group & b.collision_filter_mask) == 0
        || (b.collision_filter_group & a.collision_filter_mask) == 0
    {
        return false;
    }

    if !a.is_dynamic() && !b.is_dynamic() {
        return false;
    }

    // Nothing can move the pair apart or together
    let resting = |body: &RigidBody| body.is_sleeping() || body.is_static();
    !(resting(a) && resting(b))
}

/// Bounding volume overlap test, inclusive on shared boundaries
pub fn intersection_test(a: &RigidBody, b: &RigidBody, use_bounding_sphere: bool) -> bool {
    if use_bounding_sphere {
        let reach = a.bounding_radius() + b.bounding_radius();
        a.position.distance_squared(b.position) <= reach * reach
    } else {
        a.aabb().overlaps(b.aabb())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::math::Vec3;

    #[test]
    fn test_filter_masks() {
        let mut a = sphere_at(0, Vec3::ZERO);
        let mut b = sphere_at(1, Vec3::ZERO);
        assert!(need_broadphase_collision(&a, &b));

        a.collision_filter_group = 0b01;
        b.collision_filter_mask = 0b10;
        assert!(!need_broadphase_collision(&a, &b));

        b.collision_filter_mask = 0b11;
        a.collision_filter_mask = 0b10;
        b.collision_filter_group = 0b10;
        assert!(need_broadphase_collision(&a, &b));
    }

    #[test]
    fn test_resting_pairs_are_skipped() {
        let mut a = sphere_at(0, Vec3::ZERO);
        let floor = ground(1);
        assert!(need_broadphase_collision(&a, &floor));

        a.sleep();
        assert!(!need_broadphase_collision(&a, &floor));
        assert!(!need_broadphase_collision(&floor, &ground(2)));
    }

    #[test]
    fn test_bounding_sphere_mode() {
        let a = sphere_at(0, Vec3::ZERO);
        // AABBs overlap at the corner, spheres do not
        let b = sphere_at(1, Vec3::new(0.9, 0.9, 0.9));
        assert!(intersection_test(&a, &b, false));
        assert!(!intersection_test(&a, &b, true));
    }
}
