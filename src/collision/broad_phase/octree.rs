use log::warn;

use super::{intersection_test, need_broadphase_collision, Broadphase};
use crate::collision::contact::BodyHandle;
use crate::dynamics::RigidBody;
use crate::geometry::{Aabb, Octree, OctreeConfig};

/// Rebuilds an octree over the bounded bodies every step and queries it per body.
///
/// Bodies with unbounded boxes (tilted planes, half-spaces) cannot live in the tree
/// and are tested against everyone instead.
#[derive(Debug, Clone)]
pub struct OctreeBroadphase {
    pub use_bounding_sphere: bool,
    tree: Octree<usize>,
    bounded: Vec<usize>,
    unbounded: Vec<usize>,
    candidates: Vec<usize>,
}

impl Default for OctreeBroadphase {
    fn default() -> Self {
        Self::new(OctreeConfig::default())
    }
}

impl OctreeBroadphase {
    pub fn new(config: OctreeConfig) -> Self {
        Self {
            use_bounding_sphere: false,
            tree: Octree::new(Aabb::EMPTY, config),
            bounded: Vec::new(),
            unbounded: Vec::new(),
            candidates: Vec::new(),
        }
    }

    fn rebuild(&mut self, bodies: &[RigidBody]) {
        self.bounded.clear();
        self.unbounded.clear();

        let mut root = Aabb::EMPTY;
        for (i, body) in bodies.iter().enumerate() {
            if !body.handle.is_valid() || body.shapes().is_empty() {
                continue;
            }
            let aabb = body.aabb();
            if aabb.is_bounded() {
                root = root.union(aabb);
                self.bounded.push(i);
            } else if aabb.is_valid() {
                self.unbounded.push(i);
            } else {
                warn!("body {:?} has a non-finite AABB and is left out of the broadphase", body.handle);
            }
        }

        self.tree.reset(root);
        for &i in &self.bounded {
            self.tree.insert(bodies[i].aabb(), i);
        }
    }
}

impl Broadphase for OctreeBroadphase {
    fn collision_pairs(&mut self, bodies: &[RigidBody], pairs: &mut Vec<(BodyHandle, BodyHandle)>) {
        self.rebuild(bodies);

        for &i in &self.bounded {
            let a = &bodies[i];
            self.candidates.clear();
            self.tree.aabb_query(a.aabb(), &mut self.candidates);
            for &j in &self.candidates {
                let b = &bodies[j];
                if j > i && need_broadphase_collision(a, b) && intersection_test(a, b, self.use_bounding_sphere) {
                    pairs.push((a.handle, b.handle));
                }
            }
        }

        for (k, &i) in self.unbounded.iter().enumerate() {
            let a = &bodies[i];
            let others = self.bounded.iter().chain(&self.unbounded[k + 1..]);
            for &j in others {
                let b = &bodies[j];
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
    use super::super::NaiveBroadphase;
    use super::*;
    use crate::math::Vec3;

    #[test]
    fn test_matches_naive_pairs() {
        let mut bodies: Vec<_> = (0..27)
            .map(|i| {
                let p = Vec3::new((i % 3) as f32, ((i / 3) % 3) as f32, (i / 9) as f32 + 1.0);
                sphere_at(i as u32, p * 0.9)
            })
            .collect();
        bodies.push(ground(27));

        let mut naive = Vec::new();
        NaiveBroadphase::new().collision_pairs(&bodies, &mut naive);
        let mut octree = Vec::new();
        OctreeBroadphase::default().collision_pairs(&bodies, &mut octree);

        assert!(!naive.is_empty());
        assert_eq!(sorted(octree), sorted(naive));
    }

    #[test]
    fn test_distant_bodies_are_not_paired() {
        let bodies = vec![
            sphere_at(0, Vec3::ZERO),
            sphere_at(1, Vec3::new(10.0, 0.0, 0.0)),
            sphere_at(2, Vec3::new(10.5, 0.0, 0.0)),
        ];

        let mut pairs = Vec::new();
        OctreeBroadphase::default().collision_pairs(&bodies, &mut pairs);
        assert_eq!(sorted(pairs), vec![(1, 2)]);
    }
}
