use serde::{Deserialize, Serialize};

use crate::collision::{BodyHandle, ShapeId};
use crate::geometry::{combined_inertia, Aabb, Shape};
use crate::material::MaterialId;
use crate::math::{Mat3, Quat, Transform, Vec3};

/// The type of rigid body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyType {
    /// Dynamic bodies are affected by forces and collisions
    #[default]
    Dynamic,
    /// Static bodies never move
    Static,
    /// Kinematic bodies move according to their velocity but aren't affected by forces
    Kinematic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SleepState {
    #[default]
    Awake,
    Sleepy,
    Sleeping,
}

/// State change reported by [`RigidBody::sleep_tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepTransition {
    Sleepy,
    Sleep,
}

/// A shape attached to a body, posed in the body frame
#[derive(Debug, Clone, PartialEq)]
pub struct BodyShape {
    pub shape: Shape,
    pub offset: Vec3,
    pub orientation: Quat,
    /// Overrides the body material for contacts of this shape
    pub material: Option<MaterialId>,
    /// Assigned when the body joins a world
    pub id: ShapeId,
    pub collision_response: bool,
}

impl BodyShape {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            material: None,
            id: ShapeId(u32::MAX),
            collision_response: true,
        }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    /// A sensor shape reports overlaps but never pushes back
    pub fn with_collision_response(mut self, response: bool) -> Self {
        self.collision_response = response;
        self
    }

    #[inline]
    pub fn local_transform(&self) -> Transform {
        Transform::new(self.offset, self.orientation)
    }
}

/// A rigid body in the physics simulation
#[derive(Debug, Clone)]
pub struct RigidBody {
    /// Body handle for identification
    pub handle: BodyHandle,
    body_type: BodyType,

    /// Position in world space
    pub position: Vec3,
    /// Rotation as quaternion
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    /// Angular velocity (in radians per second)
    pub angular_velocity: Vec3,

    /// Accumulated force, cleared after every step
    pub force: Vec3,
    /// Accumulated torque, cleared after every step
    pub torque: Vec3,

    pub previous_position: Vec3,
    pub previous_rotation: Quat,
    /// Pose blended between the last two steps by the sub-stepping accumulator
    pub interpolated_position: Vec3,
    pub interpolated_rotation: Quat,

    mass: f32,
    inv_mass: f32,
    inertia: Mat3,
    inv_inertia: Mat3,
    inv_inertia_world: Mat3,
    inv_mass_solve: f32,
    inv_inertia_world_solve: Mat3,

    pub linear_damping: f32,
    pub angular_damping: f32,
    pub linear_factor: Vec3,
    pub angular_factor: Vec3,
    fixed_rotation: bool,

    pub collision_filter_group: u32,
    pub collision_filter_mask: u32,
    /// When false the body only reports overlaps
    pub collision_response: bool,

    shapes: Vec<BodyShape>,
    pub material: Option<MaterialId>,

    pub allow_sleep: bool,
    sleep_state: SleepState,
    pub sleep_speed_limit: f32,
    pub sleep_time_limit: f32,
    time_last_sleepy: f32,
    pub(crate) wake_up_after_narrowphase: bool,

    aabb: Aabb,
    bounding_radius: f32,

    // Velocity deltas accumulated by the solver
    pub(crate) vlambda: Vec3,
    pub(crate) wlambda: Vec3,

    pub user_data: u64,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            handle: BodyHandle::INVALID,
            body_type: BodyType::Static,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            previous_position: Vec3::ZERO,
            previous_rotation: Quat::IDENTITY,
            interpolated_position: Vec3::ZERO,
            interpolated_rotation: Quat::IDENTITY,
            mass: 0.0,
            inv_mass: 0.0,
            inertia: Mat3::ZERO,
            inv_inertia: Mat3::ZERO,
            inv_inertia_world: Mat3::ZERO,
            inv_mass_solve: 0.0,
            inv_inertia_world_solve: Mat3::ZERO,
            linear_damping: 0.01,
            angular_damping: 0.01,
            linear_factor: Vec3::ONE,
            angular_factor: Vec3::ONE,
            fixed_rotation: false,
            collision_filter_group: 1,
            collision_filter_mask: u32::MAX,
            collision_response: true,
            shapes: Vec::new(),
            material: None,
            allow_sleep: true,
            sleep_state: SleepState::Awake,
            sleep_speed_limit: 0.1,
            sleep_time_limit: 1.0,
            time_last_sleepy: 0.0,
            wake_up_after_narrowphase: false,
            aabb: Aabb::EMPTY,
            bounding_radius: 0.0,
            vlambda: Vec3::ZERO,
            wlambda: Vec3::ZERO,
            user_data: 0,
        }
    }
}

impl RigidBody {
    /// Builds a body from its description; shape ids are left as given.
    pub fn new(handle: BodyHandle, desc: RigidBodyDesc) -> Self {
        let body_type = match desc.body_type {
            BodyType::Dynamic if desc.mass <= 0.0 => BodyType::Static,
            other => other,
        };
        let mass = if body_type == BodyType::Dynamic { desc.mass } else { 0.0 };
        let rotation = desc.rotation.normalize();

        let mut body = Self {
            handle,
            body_type,
            position: desc.position,
            rotation,
            linear_velocity: desc.linear_velocity,
            angular_velocity: desc.angular_velocity,
            previous_position: desc.position,
            previous_rotation: rotation,
            interpolated_position: desc.position,
            interpolated_rotation: rotation,
            mass,
            linear_damping: desc.linear_damping,
            angular_damping: desc.angular_damping,
            linear_factor: desc.linear_factor,
            angular_factor: desc.angular_factor,
            fixed_rotation: desc.fixed_rotation,
            collision_filter_group: desc.collision_filter_group,
            collision_filter_mask: desc.collision_filter_mask,
            collision_response: desc.collision_response,
            shapes: desc.shapes,
            material: desc.material,
            allow_sleep: desc.allow_sleep,
            sleep_speed_limit: desc.sleep_speed_limit,
            sleep_time_limit: desc.sleep_time_limit,
            user_data: desc.user_data,
            ..Self::default()
        };
        if body.body_type == BodyType::Static {
            body.linear_velocity = Vec3::ZERO;
            body.angular_velocity = Vec3::ZERO;
        }
        body.update_mass_properties();
        body.update_bounding_radius();
        body.compute_aabb();
        body
    }

    /// Returns the transform of this body
    #[inline]
    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.rotation)
    }

    #[inline]
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Returns true if this is a dynamic body
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    /// Returns true if this is a static body
    #[inline]
    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    /// Returns true if this is a kinematic body
    #[inline]
    pub fn is_kinematic(&self) -> bool {
        self.body_type == BodyType::Kinematic
    }

    /// Changes the motion type; non-dynamic bodies lose their mass
    pub fn set_body_type(&mut self, body_type: BodyType) {
        self.body_type = body_type;
        if body_type != BodyType::Dynamic {
            self.mass = 0.0;
        }
        if body_type == BodyType::Static {
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
        }
        self.update_mass_properties();
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Sets the mass; zero turns a dynamic body static
    pub fn set_mass(&mut self, mass: f32) {
        if mass <= 0.0 && self.body_type == BodyType::Dynamic {
            self.body_type = BodyType::Static;
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
        }
        self.mass = if self.body_type == BodyType::Dynamic { mass } else { 0.0 };
        self.update_mass_properties();
    }

    /// Body-frame inertia tensor
    #[inline]
    pub fn inertia(&self) -> Mat3 {
        self.inertia
    }

    #[inline]
    pub fn inv_inertia(&self) -> Mat3 {
        self.inv_inertia
    }

    #[inline]
    pub fn inv_inertia_world(&self) -> Mat3 {
        self.inv_inertia_world
    }

    /// Inverse mass seen by the solver; zero while sleeping or kinematic
    #[inline]
    pub fn inv_mass_solve(&self) -> f32 {
        self.inv_mass_solve
    }

    #[inline]
    pub fn inv_inertia_world_solve(&self) -> Mat3 {
        self.inv_inertia_world_solve
    }

    #[inline]
    pub fn fixed_rotation(&self) -> bool {
        self.fixed_rotation
    }

    pub fn set_fixed_rotation(&mut self, fixed: bool) {
        self.fixed_rotation = fixed;
        self.update_mass_properties();
    }

    /// Recomputes mass, inertia and their inverses from the attached shapes
    pub fn update_mass_properties(&mut self) {
        self.inv_mass = if self.is_dynamic() && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        };

        let parts: Vec<_> = self
            .shapes
            .iter()
            .map(|s| (&s.shape, s.offset, s.orientation))
            .collect();
        self.inertia = combined_inertia(&parts, self.mass);

        self.inv_inertia = if self.is_dynamic() && !self.fixed_rotation {
            self.inertia.try_inverse().unwrap_or(Mat3::ZERO)
        } else {
            Mat3::ZERO
        };
        self.update_inertia_world();
        self.update_solve_mass_properties();
    }

    /// Rotates the inverse inertia into world space
    pub fn update_inertia_world(&mut self) {
        self.inv_inertia_world = self.inv_inertia.rotated(self.rotation);
    }

    pub fn update_solve_mass_properties(&mut self) {
        if self.sleep_state == SleepState::Sleeping || self.is_kinematic() {
            self.inv_mass_solve = 0.0;
            self.inv_inertia_world_solve = Mat3::ZERO;
        } else {
            self.inv_mass_solve = self.inv_mass;
            self.inv_inertia_world_solve = self.inv_inertia_world;
        }
    }

    pub fn shapes(&self) -> &[BodyShape] {
        &self.shapes
    }

    pub(crate) fn shapes_mut(&mut self) -> &mut [BodyShape] {
        &mut self.shapes
    }

    /// Attaches another shape and refreshes mass and bounds
    pub fn add_shape(&mut self, shape: BodyShape) {
        self.shapes.push(shape);
        self.update_mass_properties();
        self.update_bounding_radius();
        self.compute_aabb();
    }

    /// World pose of an attached shape
    #[inline]
    pub fn shape_transform(&self, shape: &BodyShape) -> Transform {
        self.transform().compose(shape.local_transform())
    }

    pub fn update_bounding_radius(&mut self) {
        self.bounding_radius = self
            .shapes
            .iter()
            .map(|s| s.offset.length() + s.shape.bounding_radius())
            .fold(0.0, f32::max);
    }

    #[inline]
    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    /// Recomputes the cached world AABB from the shapes
    pub fn compute_aabb(&mut self) {
        let transform = self.transform();
        self.aabb = self.shapes.iter().fold(Aabb::EMPTY, |aabb, s| {
            aabb.union(s.shape.world_aabb(&transform.compose(s.local_transform())))
        });
    }

    #[inline]
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// Adds a world-space force acting at `relative_point` from the centre of mass
    pub fn apply_force(&mut self, force: Vec3, relative_point: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.force += force;
        self.torque += relative_point.cross(force);
    }

    /// Force and point both given in the body frame
    pub fn apply_local_force(&mut self, local_force: Vec3, local_point: Vec3) {
        let force = self.vector_to_world_frame(local_force);
        let relative_point = self.vector_to_world_frame(local_point);
        self.apply_force(force, relative_point);
    }

    pub fn apply_torque(&mut self, torque: Vec3) {
        if self.is_dynamic() {
            self.torque += torque;
        }
    }

    /// Instant velocity change from an impulse at `relative_point` from the centre of mass
    pub fn apply_impulse(&mut self, impulse: Vec3, relative_point: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia_world * relative_point.cross(impulse);
    }

    pub fn apply_local_impulse(&mut self, local_impulse: Vec3, local_point: Vec3) {
        let impulse = self.vector_to_world_frame(local_impulse);
        let relative_point = self.vector_to_world_frame(local_point);
        self.apply_impulse(impulse, relative_point);
    }

    /// Velocity of the material point currently at `world_point`
    pub fn velocity_at_world_point(&self, world_point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(world_point - self.position)
    }

    #[inline]
    pub fn point_to_local_frame(&self, world_point: Vec3) -> Vec3 {
        self.transform().inverse_transform_point(world_point)
    }

    #[inline]
    pub fn point_to_world_frame(&self, local_point: Vec3) -> Vec3 {
        self.transform().transform_point(local_point)
    }

    #[inline]
    pub fn vector_to_local_frame(&self, world_vector: Vec3) -> Vec3 {
        self.rotation.inverse_rotate_vec(world_vector)
    }

    #[inline]
    pub fn vector_to_world_frame(&self, local_vector: Vec3) -> Vec3 {
        self.rotation.rotate_vec(local_vector)
    }

    /// Clears accumulated forces
    pub fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    #[inline]
    pub fn sleep_state(&self) -> SleepState {
        self.sleep_state
    }

    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.sleep_state == SleepState::Sleeping
    }

    /// Wakes the body; returns true if it was asleep
    pub fn wake_up(&mut self) -> bool {
        let was_sleeping = self.sleep_state == SleepState::Sleeping;
        self.sleep_state = SleepState::Awake;
        self.wake_up_after_narrowphase = false;
        if was_sleeping {
            self.update_solve_mass_properties();
        }
        was_sleeping
    }

    /// Puts the body to sleep and zeroes its velocities
    pub fn sleep(&mut self) {
        self.sleep_state = SleepState::Sleeping;
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.wake_up_after_narrowphase = false;
        self.update_solve_mass_properties();
    }

    /// Advances the sleep state machine at simulation time `time`
    pub fn sleep_tick(&mut self, time: f32) -> Option<SleepTransition> {
        if !self.allow_sleep || !self.is_dynamic() {
            return None;
        }

        let speed_sq = self.linear_velocity.length_squared() + self.angular_velocity.length_squared();
        let limit_sq = self.sleep_speed_limit * self.sleep_speed_limit;

        match self.sleep_state {
            SleepState::Awake if speed_sq < limit_sq => {
                self.sleep_state = SleepState::Sleepy;
                self.time_last_sleepy = time;
                Some(SleepTransition::Sleepy)
            }
            SleepState::Sleepy if speed_sq > limit_sq => {
                self.wake_up();
                None
            }
            SleepState::Sleepy if time - self.time_last_sleepy > self.sleep_time_limit => {
                self.sleep();
                Some(SleepTransition::Sleep)
            }
            _ => None,
        }
    }
}

/// Description for creating a rigid body
#[derive(Debug, Clone)]
pub struct RigidBodyDesc {
    pub body_type: BodyType,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Zero mass makes a dynamic description static
    pub mass: f32,
    pub shapes: Vec<BodyShape>,
    pub material: Option<MaterialId>,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub linear_factor: Vec3,
    pub angular_factor: Vec3,
    pub fixed_rotation: bool,
    pub collision_filter_group: u32,
    pub collision_filter_mask: u32,
    pub collision_response: bool,
    pub allow_sleep: bool,
    pub sleep_speed_limit: f32,
    pub sleep_time_limit: f32,
    pub user_data: u64,
}

impl Default for RigidBodyDesc {
    fn default() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 1.0,
            shapes: Vec::new(),
            material: None,
            linear_damping: 0.01,
            angular_damping: 0.01,
            linear_factor: Vec3::ONE,
            angular_factor: Vec3::ONE,
            fixed_rotation: false,
            collision_filter_group: 1,
            collision_filter_mask: u32::MAX,
            collision_response: true,
            allow_sleep: true,
            sleep_speed_limit: 0.1,
            sleep_time_limit: 1.0,
            user_data: 0,
        }
    }
}

impl RigidBodyDesc {
    /// Creates a new dynamic body description
    pub fn dynamic() -> Self {
        Self::default()
    }

    /// Creates a new static body description
    pub fn fixed() -> Self {
        Self {
            body_type: BodyType::Static,
            mass: 0.0,
            ..Self::default()
        }
    }

    /// Creates a new kinematic body description
    pub fn kinematic() -> Self {
        Self {
            body_type: BodyType::Kinematic,
            mass: 0.0,
            ..Self::default()
        }
    }

    /// Sets the position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the mass
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_linear_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, velocity: Vec3) -> Self {
        self.angular_velocity = velocity;
        self
    }

    /// Attaches a shape at the body origin
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shapes.push(BodyShape::new(shape));
        self
    }

    pub fn with_body_shape(mut self, shape: BodyShape) -> Self {
        self.shapes.push(shape);
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    /// Sets linear damping
    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping.clamp(0.0, 1.0);
        self
    }

    /// Sets angular damping
    pub fn with_angular_damping(mut self, damping: f32) -> Self {
        self.angular_damping = damping.clamp(0.0, 1.0);
        self
    }

    pub fn with_linear_factor(mut self, factor: Vec3) -> Self {
        self.linear_factor = factor;
        self
    }

    pub fn with_angular_factor(mut self, factor: Vec3) -> Self {
        self.angular_factor = factor;
        self
    }

    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self
    }

    pub fn with_collision_filter(mut self, group: u32, mask: u32) -> Self {
        self.collision_filter_group = group;
        self.collision_filter_mask = mask;
        self
    }

    /// A body without response is a trigger: overlaps are reported, nothing is pushed
    pub fn with_collision_response(mut self, response: bool) -> Self {
        self.collision_response = response;
        self
    }

    pub fn with_sleep(mut self, allow: bool) -> Self {
        self.allow_sleep = allow;
        self
    }

    pub fn with_sleep_limits(mut self, speed_limit: f32, time_limit: f32) -> Self {
        self.sleep_speed_limit = speed_limit;
        self.sleep_time_limit = time_limit;
        self
    }

    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn vec3_approx_eq(a: Vec3, b: Vec3) -> bool {
        a.distance_squared(b) < EPSILON * EPSILON
    }

    fn ball(mass: f32) -> RigidBody {
        RigidBody::new(
            BodyHandle::new(0),
            RigidBodyDesc::dynamic().with_mass(mass).with_shape(Shape::sphere(1.0)),
        )
    }

    #[test]
    fn test_body_creation() {
        let body = RigidBody::new(
            BodyHandle::new(3),
            RigidBodyDesc::dynamic()
                .with_position(Vec3::new(1.0, 2.0, 3.0))
                .with_mass(2.0),
        );

        assert_eq!(body.position, Vec3::new(1.0, 2.0, 3.0));
        assert!((body.inv_mass() - 0.5).abs() < 0.0001);
        assert_eq!(body.handle, BodyHandle::new(3));
    }

    #[test]
    fn test_zero_mass_means_static() {
        let body = RigidBody::new(BodyHandle::new(0), RigidBodyDesc::dynamic().with_mass(0.0));
        assert!(body.is_static());
        assert_eq!(body.mass(), 0.0);
        assert_eq!(body.inv_mass(), 0.0);

        let kinematic = RigidBody::new(BodyHandle::new(1), RigidBodyDesc::kinematic().with_mass(5.0));
        assert!(kinematic.is_kinematic());
        assert_eq!(kinematic.mass(), 0.0);
        assert_eq!(kinematic.inv_mass(), 0.0);
        assert_eq!(kinematic.inv_inertia_world(), Mat3::ZERO);
    }

    #[test]
    fn test_mass_invariant_after_changes() {
        let mut body = ball(2.0);
        assert!(body.mass() > 0.0 && body.inv_mass() > 0.0);

        body.set_mass(0.0);
        assert!(body.is_static());
        assert_eq!(body.inv_mass(), 0.0);

        body.set_body_type(BodyType::Dynamic);
        body.set_mass(4.0);
        assert!((body.inv_mass() - 0.25).abs() < EPSILON);

        body.set_body_type(BodyType::Kinematic);
        assert_eq!((body.mass(), body.inv_mass()), (0.0, 0.0));
    }

    #[test]
    fn test_center_impulse_has_no_spin() {
        let mut body = ball(2.0);
        let dt = 1.0 / 60.0;
        let f = 12.0;

        body.apply_impulse(Vec3::new(f * dt, 0.0, 0.0), Vec3::ZERO);

        assert_eq!(body.linear_velocity, Vec3::new(f * dt * 0.5, 0.0, 0.0));
        assert_eq!(body.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_unit_mass_impulse_is_exact() {
        let mut body = ball(1.0);
        let impulse = Vec3::new(10.0 / 60.0, 0.0, 0.0);
        body.apply_impulse(impulse, Vec3::ZERO);
        assert_eq!(body.linear_velocity, impulse);
        assert_eq!(body.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_offset_impulse_spins() {
        let mut body = ball(1.0);
        body.apply_impulse(Vec3::X, Vec3::Y);
        // Y × X = -Z, scaled by the inverse sphere inertia 1/(0.4)
        assert!(vec3_approx_eq(body.angular_velocity, Vec3::new(0.0, 0.0, -2.5)));
    }

    #[test]
    fn test_force_accumulates_torque() {
        let mut body = ball(1.0);
        body.apply_force(Vec3::new(0.0, 2.0, 0.0), Vec3::X);
        assert_eq!(body.force, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(body.torque, Vec3::new(0.0, 0.0, 2.0));

        let mut fixed = RigidBody::new(BodyHandle::new(1), RigidBodyDesc::fixed());
        fixed.apply_force(Vec3::X, Vec3::ZERO);
        assert_eq!(fixed.force, Vec3::ZERO);
    }

    #[test]
    fn test_local_force_and_impulse_follow_rotation() {
        let mut body = ball(1.0);
        body.rotation = Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2);

        // Local X is world Y, local Y is world -X
        body.apply_local_force(Vec3::new(2.0, 0.0, 0.0), Vec3::Y);
        assert!(vec3_approx_eq(body.force, Vec3::new(0.0, 2.0, 0.0)));
        assert!(vec3_approx_eq(body.torque, Vec3::new(0.0, 0.0, -2.0)));

        body.apply_local_impulse(Vec3::X, Vec3::Y);
        assert!(vec3_approx_eq(body.linear_velocity, Vec3::Y));
        assert!(vec3_approx_eq(body.angular_velocity, Vec3::new(0.0, 0.0, -2.5)));
    }

    #[test]
    fn test_velocity_at_world_point() {
        let mut body = ball(1.0);
        body.linear_velocity = Vec3::new(1.0, 0.0, 0.0);
        body.angular_velocity = Vec3::new(0.0, 0.0, 1.0);

        // (0, 0, 1) × (0, 1, 0) = (-1, 0, 0) cancels the linear part
        let vel = body.velocity_at_world_point(Vec3::new(0.0, 1.0, 0.0));
        assert!(vec3_approx_eq(vel, Vec3::ZERO));
    }

    #[test]
    fn test_frame_conversions() {
        let mut body = ball(1.0);
        body.position = Vec3::new(1.0, 0.0, 0.0);
        body.rotation = Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2);

        let world = body.point_to_world_frame(Vec3::X);
        assert!(vec3_approx_eq(world, Vec3::new(1.0, 1.0, 0.0)));
        assert!(vec3_approx_eq(body.point_to_local_frame(world), Vec3::X));
        assert!(vec3_approx_eq(body.vector_to_world_frame(Vec3::X), Vec3::Y));
        assert!(vec3_approx_eq(body.vector_to_local_frame(Vec3::Y), Vec3::X));
    }

    #[test]
    fn test_fixed_rotation_zeroes_inverse_inertia() {
        let mut body = ball(1.0);
        assert_ne!(body.inv_inertia(), Mat3::ZERO);
        body.set_fixed_rotation(true);
        assert_eq!(body.inv_inertia(), Mat3::ZERO);
        assert_eq!(body.inv_inertia_world(), Mat3::ZERO);
    }

    #[test]
    fn test_aabb_and_radius_follow_shapes() {
        let mut body = RigidBody::new(
            BodyHandle::new(0),
            RigidBodyDesc::dynamic()
                .with_position(Vec3::new(1.0, 0.0, 0.0))
                .with_shape(Shape::cuboid(Vec3::ONE)),
        );
        assert_eq!(body.aabb().min, Vec3::new(0.0, -1.0, -1.0));
        assert_eq!(body.aabb().max, Vec3::new(2.0, 1.0, 1.0));

        body.add_shape(BodyShape::new(Shape::sphere(0.5)).with_offset(Vec3::new(0.0, 3.0, 0.0)));
        assert!((body.bounding_radius() - 3.5).abs() < EPSILON);
        assert_eq!(body.aabb().max.y, 3.5);
    }

    #[test]
    fn test_sleep_transitions() {
        let mut body = ball(1.0);
        body.linear_velocity = Vec3::new(0.01, 0.0, 0.0);

        assert_eq!(body.sleep_tick(0.0), Some(SleepTransition::Sleepy));
        assert_eq!(body.sleep_tick(0.5), None);
        assert_eq!(body.sleep_tick(1.5), Some(SleepTransition::Sleep));
        assert!(body.is_sleeping());
        assert_eq!(body.linear_velocity, Vec3::ZERO);
        assert_eq!(body.inv_mass_solve(), 0.0);

        assert!(body.wake_up());
        assert_eq!(body.sleep_state(), SleepState::Awake);
        assert!((body.inv_mass_solve() - 1.0).abs() < EPSILON);
        assert!(!body.wake_up());
    }

    #[test]
    fn test_sleepy_body_wakes_when_fast() {
        let mut body = ball(1.0);
        assert_eq!(body.sleep_tick(0.0), Some(SleepTransition::Sleepy));
        body.linear_velocity = Vec3::new(5.0, 0.0, 0.0);
        assert_eq!(body.sleep_tick(0.1), None);
        assert_eq!(body.sleep_state(), SleepState::Awake);
    }
}
