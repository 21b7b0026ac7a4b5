use super::{intersection_test, need_broadphase_collision, Broadphase};
use crate::collision::contact::BodyHandle;
use crate::dynamics::RigidBody;

/// Tests every pair of bodies
#[derive(Debug, Clone, Default)]
pub struct NaiveBroadphase {
    pub use_bounding_sphere: bool,
}

impl NaiveBroadphase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Broadphase for NaiveBroadphase {
    fn collision_pairs(&mut self, bodies: &[RigidBody], pairs: &mut Vec<(BodyHandle, BodyHandle)>) {
        for (i, a) in bodies.iter().enumerate() {
            for b in &bodies[i + 1..] {
                if need_broadphase_collision(a, b) && intersection_test(a, b, self.use_bounding_sphere) {
                    pairs.push((a.handle, b.handle));
                }
            }
        }
    }

    fn set_use_bounding_sphere(&mut self, enabled: bool) {
        self.use_bounding_sphere = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::dynamics::RigidBody;
    use crate::math::Vec3;

    #[test]
    fn test_finds_overlapping_pairs() {
        let bodies = vec![
            sphere_at(0, Vec3::ZERO),
            sphere_at(1, Vec3::new(0.8, 0.0, 0.0)),
            sphere_at(2, Vec3::new(5.0, 0.0, 0.0)),
            ground(3),
        ];

        let mut pairs = Vec::new();
        NaiveBroadphase::new().collision_pairs(&bodies, &mut pairs);

        // The plane spans everything below z = 0, so every sphere touches it
        assert_eq!(sorted(pairs), vec![(0, 1), (0, 3), (1, 3), (2, 3)]);
    }

    #[test]
    fn test_free_slots_are_skipped() {
        let bodies = vec![sphere_at(0, Vec3::ZERO), RigidBody::default(), sphere_at(2, Vec3::ZERO)];

        let mut pairs = Vec::new();
        NaiveBroadphase::new().collision_pairs(&bodies, &mut pairs);
        assert_eq!(sorted(pairs), vec![(0, 2)]);
    }
}
