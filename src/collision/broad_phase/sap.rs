use log::warn;
use serde::{Deserialize, Serialize};

use super::{intersection_test, need_broadphase_collision, Broadphase};
use crate::collision::contact::BodyHandle;
use crate::dynamics::RigidBody;

/// Axis a [`SapBroadphase`] sorts along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SapAxis {
    #[default]
    X,
    Y,
    Z,
    /// Re-picked every step as the axis along which body positions spread the most
    Auto,
}

impl SapAxis {
    fn index(self) -> Option<usize> {
        match self {
            SapAxis::X => Some(0),
            SapAxis::Y => Some(1),
            SapAxis::Z => Some(2),
            SapAxis::Auto => None,
        }
    }
}

/// Sweep and prune along one axis.
///
/// Bodies are kept sorted by the lower bound of their AABB. The order persists
/// between steps, so insertion sort only has a few swaps to do while the scene
/// stays coherent.
#[derive(Debug, Clone, Default)]
pub struct SapBroadphase {
    pub use_bounding_sphere: bool,
    pub axis: SapAxis,
    order: Vec<usize>,
    listed: Vec<bool>,
}

impl SapBroadphase {
    pub fn new(axis: SapAxis) -> Self {
        Self {
            axis,
            ..Self::default()
        }
    }

    /// Axis actually swept this step
    fn sweep_axis(&self, bodies: &[RigidBody]) -> usize {
        self.axis.index().unwrap_or_else(|| widest_axis(bodies, &self.order))
    }

    fn refresh(&mut self, bodies: &[RigidBody]) {
        let usable = |body: &RigidBody| body.handle.is_valid() && !body.shapes().is_empty();

        self.order
            .retain(|&i| i < bodies.len() && usable(&bodies[i]) && bodies[i].aabb().is_valid());
        self.listed.clear();
        self.listed.resize(bodies.len(), false);
        for &i in &self.order {
            self.listed[i] = true;
        }

        for (i, body) in bodies.iter().enumerate() {
            if self.listed[i] || !usable(body) {
                continue;
            }
            if body.aabb().is_valid() {
                self.order.push(i);
            } else {
                warn!("body {:?} has a non-finite AABB and is left out of the broadphase", body.handle);
            }
        }
    }
}

impl Broadphase for SapBroadphase {
    fn collision_pairs(&mut self, bodies: &[RigidBody], pairs: &mut Vec<(BodyHandle, BodyHandle)>) {
        self.refresh(bodies);
        let axis = self.sweep_axis(bodies);
        insertion_sort(&mut self.order, |i| bodies[i].aabb().min[axis]);

        for (k, &i) in self.order.iter().enumerate() {
            let a = &bodies[i];
            let reach = a.aabb().max[axis];
            for &j in &self.order[k + 1..] {
                let b = &bodies[j];
                if b.aabb().min[axis] > reach {
                    break;
                }
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

fn insertion_sort<F>(order: &mut [usize], key: F)
where
    F: Fn(usize) -> f32,
{
    for i in 1..order.len() {
        let item = order[i];
        let value = key(item);
        let mut j = i;
        while j > 0 && key(order[j - 1]) > value {
            order[j] = order[j - 1];
            j -= 1;
        }
        order[j] = item;
    }
}

/// Axis with the largest variance of body positions
fn widest_axis(bodies: &[RigidBody], order: &[usize]) -> usize {
    if order.is_empty() {
        return 0;
    }
    let n = order.len() as f32;
    let mut sum = [0.0_f32; 3];
    let mut sum_sq = [0.0_f32; 3];
    for &i in order {
        let p = bodies[i].position;
        for axis in 0..3 {
            sum[axis] += p[axis];
            sum_sq[axis] += p[axis] * p[axis];
        }
    }

    let variance = |axis: usize| sum_sq[axis] - sum[axis] * sum[axis] / n;
    (0..3)
        .max_by(|&x, &y| variance(x).total_cmp(&variance(y)))
        .unwrap_or(0)
}
