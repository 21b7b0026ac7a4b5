use crate::collision::BodyHandle;
use crate::math::Vec3;

use super::rigid_body::RigidBody;

/// Handle to a spring registered in a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpringHandle(pub u32);

impl SpringHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A damped spring between two anchor points, applied as a force pair before
/// every step.
///
/// Anchors are stored in the body frames, so they follow the bodies around.
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Length at which the spring pulls with no force
    pub rest_length: f32,
    pub stiffness: f32,
    /// Resists the rate of stretching along the spring
    pub damping: f32,
    pub local_anchor_a: Vec3,
    pub local_anchor_b: Vec3,
}

impl Spring {
    /// A spring between the two centres of mass with rest length 1, stiffness 100
    /// and damping 1
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            rest_length: 1.0,
            stiffness: 100.0,
            damping: 1.0,
            local_anchor_a: Vec3::ZERO,
            local_anchor_b: Vec3::ZERO,
        }
    }

    pub fn with_rest_length(mut self, rest_length: f32) -> Self {
        self.rest_length = rest_length;
        self
    }

    pub fn with_stiffness(mut self, stiffness: f32) -> Self {
        self.stiffness = stiffness;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_local_anchors(mut self, anchor_a: Vec3, anchor_b: Vec3) -> Self {
        self.local_anchor_a = anchor_a;
        self.local_anchor_b = anchor_b;
        self
    }

    /// Anchors A at `world_point`, stored relative to the current pose of `body`
    pub fn set_world_anchor_a(&mut self, body: &RigidBody, world_point: Vec3) {
        self.local_anchor_a = body.point_to_local_frame(world_point);
    }

    pub fn set_world_anchor_b(&mut self, body: &RigidBody, world_point: Vec3) {
        self.local_anchor_b = body.point_to_local_frame(world_point);
    }

    pub fn world_anchor_a(&self, body: &RigidBody) -> Vec3 {
        body.point_to_world_frame(self.local_anchor_a)
    }

    pub fn world_anchor_b(&self, body: &RigidBody) -> Vec3 {
        body.point_to_world_frame(self.local_anchor_b)
    }

    /// Adds the spring force to both bodies: `b` is pulled toward `a` when stretched
    /// and pushed away when compressed.
    pub fn apply_force(&self, a: &mut RigidBody, b: &mut RigidBody) {
        let anchor_a = self.world_anchor_a(a);
        let anchor_b = self.world_anchor_b(b);
        let Some((direction, length)) = (anchor_b - anchor_a).normalize_with_length() else {
            return;
        };

        let relative_velocity = b.velocity_at_world_point(anchor_b) - a.velocity_at_world_point(anchor_a);
        let magnitude = -self.stiffness * (length - self.rest_length) - self.damping * relative_velocity.dot(direction);
        let force = direction * magnitude;

        a.apply_force(-force, anchor_a - a.position);
        b.apply_force(force, anchor_b - b.position);
    }
}
