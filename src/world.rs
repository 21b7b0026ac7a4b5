use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::collision::{
    ray_shape, BodyHandle, Broadphase, CachedImpulse, ContactCache, ContactRecord, NaiveBroadphase, Narrowphase,
    NarrowphaseOutput, OctreeBroadphase, OverlapKeeper, Ray, RayMode, RayOptions, SapAxis, SapBroadphase, ShapeId,
    MAX_OVERLAP_ID,
};
use crate::constraints::{ConstraintHandle, Equation, EquationSet};
use crate::dynamics::{
    apply_damping, integrate, BodyShape, QuatNormalization, RigidBody, RigidBodyDesc, SleepState, SleepTransition,
    Spring, SpringHandle,
};
use crate::error::{PhysicsError, PhysicsResult};
use crate::geometry::{Aabb, OctreeConfig};
use crate::material::{ContactMaterial, Material, MaterialId, MaterialRegistry};
use crate::math::{Quat, Vec3};
use crate::solver::{get_two_mut, GsSolver, SolverConfig};

/// Most bodies (and shapes) a world holds: ids must fit one half of an overlap key
pub const MAX_BODIES: usize = MAX_OVERLAP_ID as usize;

/// Which broadphase a world builds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum BroadphaseKind {
    /// Tests every body pair
    #[default]
    Naive,
    /// Octree over the body AABBs, rebuilt every step
    Octree { max_depth: usize, min_cell_size: f32 },
    /// Sweep and prune along one axis
    Sap { axis: SapAxis },
}

impl BroadphaseKind {
    fn build(self) -> Box<dyn Broadphase> {
        match self {
            BroadphaseKind::Naive => Box::new(NaiveBroadphase::new()),
            BroadphaseKind::Octree {
                max_depth,
                min_cell_size,
            } => Box::new(OctreeBroadphase::new(OctreeConfig {
                max_depth,
                min_cell_size,
            })),
            BroadphaseKind::Sap { axis } => Box::new(SapBroadphase::new(axis)),
        }
    }
}

/// Configuration for the physics world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: Vec3,
    pub solver: SolverConfig,
    pub broadphase: BroadphaseKind,
    /// Lets bodies fall asleep when they stay slow long enough
    pub allow_sleep: bool,
    /// Orientations are renormalized every `quat_normalize_skip + 1` steps
    pub quat_normalize_skip: u32,
    /// Use the first-order normalization instead of the exact one
    pub quat_normalize_fast: bool,
    /// Contact parameters for material pairs without their own entry
    pub default_contact_material: ContactMaterial,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, 0.0, -9.81),
            solver: SolverConfig::default(),
            broadphase: BroadphaseKind::default(),
            allow_sleep: false,
            quat_normalize_skip: 0,
            quat_normalize_fast: false,
            default_contact_material: ContactMaterial::default(),
        }
    }
}

/// Contact data attached to a [`WorldEvent::Collide`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInfo {
    pub shape_a: ShapeId,
    pub shape_b: ShapeId,
    /// Contact normal, pointing from A to B
    pub normal: Vec3,
    pub point_a: Vec3,
    pub point_b: Vec3,
    pub depth: f32,
}

impl From<&ContactRecord> for ContactInfo {
    fn from(record: &ContactRecord) -> Self {
        Self {
            shape_a: record.key.shape_a,
            shape_b: record.key.shape_b,
            normal: record.point.normal,
            point_a: record.point.point_a,
            point_b: record.point.point_b,
            depth: record.point.depth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldEvent {
    BeginContact {
        body_a: BodyHandle,
        body_b: BodyHandle,
    },
    EndContact {
        body_a: BodyHandle,
        body_b: BodyHandle,
    },
    BeginShapeContact {
        body_a: BodyHandle,
        body_b: BodyHandle,
        shape_a: ShapeId,
        shape_b: ShapeId,
    },
    EndShapeContact {
        body_a: BodyHandle,
        body_b: BodyHandle,
        shape_a: ShapeId,
        shape_b: ShapeId,
    },
    /// First contact of a body pair in a step
    Collide {
        body_a: BodyHandle,
        body_b: BodyHandle,
        contact: ContactInfo,
    },
    Sleepy {
        body: BodyHandle,
    },
    Sleep {
        body: BodyHandle,
    },
    WakeUp {
        body: BodyHandle,
    },
}

/// Everything that happened during a call to [`World::step`], in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepEvents {
    pub events: Vec<WorldEvent>,
}

impl StepEvents {
    pub fn iter(&self) -> impl Iterator<Item = &WorldEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl IntoIterator for StepEvents {
    type Item = WorldEvent;
    type IntoIter = std::vec::IntoIter<WorldEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

/// Result of a ray cast query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastHit {
    /// Body that was hit
    pub body: BodyHandle,
    pub shape: ShapeId,
    /// World space hit point
    pub point: Vec3,
    /// World space surface normal at the hit
    pub normal: Vec3,
    /// Distance from ray origin
    pub distance: f32,
}

/// The main physics world containing all bodies and managing simulation
pub struct World {
    config: WorldConfig,
    /// Body slots; free slots hold a default body with an invalid handle
    bodies: Vec<RigidBody>,
    free_bodies: Vec<usize>,
    /// Owner of every allocated shape id
    shape_owners: Vec<BodyHandle>,
    free_shapes: Vec<u32>,
    constraints: Vec<Option<EquationSet>>,
    springs: Vec<Option<Spring>>,

    broadphase: Box<dyn Broadphase>,
    narrowphase: Narrowphase,
    solver: GsSolver,
    materials: MaterialRegistry,

    body_overlaps: OverlapKeeper,
    shape_overlaps: OverlapKeeper,
    contact_cache: ContactCache,

    // Per-step scratch, cleared rather than reallocated
    pairs: Vec<(BodyHandle, BodyHandle)>,
    contacts: NarrowphaseOutput,
    equations: Vec<Equation>,
    joint_rows: Vec<(usize, usize)>,
    additions: Vec<(u32, u32)>,
    removals: Vec<(u32, u32)>,
    /// Events raised between steps, reported with the next step
    pending_events: Vec<WorldEvent>,

    accumulator: f32,
    time: f32,
    step_number: u64,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("bodies", &self.num_bodies())
            .field("constraints", &self.constraints.iter().flatten().count())
            .field("springs", &self.springs.iter().flatten().count())
            .field("time", &self.time)
            .finish()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl World {
    /// Creates a new physics world with the given configuration
    pub fn new(config: WorldConfig) -> Self {
        Self {
            broadphase: config.broadphase.build(),
            narrowphase: Narrowphase::new(),
            solver: GsSolver::new(config.solver),
            materials: MaterialRegistry::new(config.default_contact_material),
            config,
            bodies: Vec::new(),
            free_bodies: Vec::new(),
            shape_owners: Vec::new(),
            free_shapes: Vec::new(),
            constraints: Vec::new(),
            springs: Vec::new(),
            body_overlaps: OverlapKeeper::new(),
            shape_overlaps: OverlapKeeper::new(),
            contact_cache: ContactCache::new(),
            pairs: Vec::new(),
            contacts: NarrowphaseOutput::default(),
            equations: Vec::new(),
            joint_rows: Vec::new(),
            additions: Vec::new(),
            removals: Vec::new(),
            pending_events: Vec::new(),
            accumulator: 0.0,
            time: 0.0,
            step_number: 0,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Replaces the broadphase; the next step uses it
    pub fn set_broadphase(&mut self, kind: BroadphaseKind) {
        self.config.broadphase = kind;
        self.broadphase = kind.build();
    }

    pub fn solver_config_mut(&mut self) -> &mut SolverConfig {
        self.solver.config_mut()
    }

    fn free_shape_capacity(&self) -> usize {
        self.free_shapes.len() + (MAX_BODIES - self.shape_owners.len())
    }

    fn allocate_shape_id(&mut self, owner: BodyHandle) -> PhysicsResult<ShapeId> {
        if let Some(id) = self.free_shapes.pop() {
            self.shape_owners[id as usize] = owner;
            return Ok(ShapeId(id));
        }
        if self.shape_owners.len() >= MAX_BODIES {
            return Err(PhysicsError::TooManyShapes { max: MAX_BODIES });
        }
        self.shape_owners.push(owner);
        Ok(ShapeId((self.shape_owners.len() - 1) as u32))
    }

    /// Creates a body from its description and returns its handle
    pub fn add_body(&mut self, desc: RigidBodyDesc) -> PhysicsResult<BodyHandle> {
        if desc.shapes.len() > self.free_shape_capacity() {
            return Err(PhysicsError::TooManyShapes { max: MAX_BODIES });
        }

        let index = match self.free_bodies.pop() {
            Some(index) => index,
            None if self.bodies.len() >= MAX_BODIES => {
                return Err(PhysicsError::TooManyBodies { max: MAX_BODIES });
            }
            None => {
                self.bodies.push(RigidBody::default());
                self.bodies.len() - 1
            }
        };

        let handle = BodyHandle::new(index as u32);
        let mut body = RigidBody::new(handle, desc);
        for k in 0..body.shapes().len() {
            let id = self.allocate_shape_id(handle)?;
            body.shapes_mut()[k].id = id;
        }
        self.bodies[index] = body;
        Ok(handle)
    }

    /// Attaches another shape to an existing body
    pub fn add_shape(&mut self, handle: BodyHandle, mut shape: BodyShape) -> PhysicsResult<ShapeId> {
        self.check_body(handle)?;
        let id = self.allocate_shape_id(handle)?;
        shape.id = id;
        self.bodies[handle.index()].add_shape(shape);
        Ok(id)
    }

    /// Removes a body, the joints attached to it and its contact state
    pub fn remove_body(&mut self, handle: BodyHandle) -> PhysicsResult<RigidBody> {
        self.check_body(handle)?;
        let body = std::mem::take(&mut self.bodies[handle.index()]);
        self.free_bodies.push(handle.index());

        for shape in body.shapes() {
            self.shape_overlaps.remove_id(shape.id.0);
            if let Some(owner) = self.shape_owners.get_mut(shape.id.index()) {
                *owner = BodyHandle::INVALID;
                self.free_shapes.push(shape.id.0);
            }
        }
        self.body_overlaps.remove_id(handle.0);
        self.contact_cache.remove_body(handle);

        for (index, slot) in self.constraints.iter_mut().enumerate() {
            if slot.as_ref().is_some_and(|set| set.involves(handle)) {
                debug!("Removing constraint {} attached to removed body {:?}", index, handle);
                *slot = None;
            }
        }
        for (index, slot) in self.springs.iter_mut().enumerate() {
            if slot.as_ref().is_some_and(|s| s.body_a == handle || s.body_b == handle) {
                debug!("Removing spring {} attached to removed body {:?}", index, handle);
                *slot = None;
            }
        }
        Ok(body)
    }

    fn check_body(&self, handle: BodyHandle) -> PhysicsResult<()> {
        match self.bodies.get(handle.index()) {
            Some(body) if handle.is_valid() && body.handle == handle => Ok(()),
            _ => Err(PhysicsError::BodyNotFound(handle)),
        }
    }

    /// Gets a reference to a body
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.index()).filter(|b| handle.is_valid() && b.handle == handle)
    }

    /// Gets a mutable reference to a body
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies
            .get_mut(handle.index())
            .filter(|b| handle.is_valid() && b.handle == handle)
    }

    fn body_or_err(&mut self, handle: BodyHandle) -> PhysicsResult<&mut RigidBody> {
        self.check_body(handle)?;
        Ok(&mut self.bodies[handle.index()])
    }

    /// Iterates over the live bodies
    pub fn bodies(&self) -> impl Iterator<Item = &RigidBody> + '_ {
        self.bodies.iter().filter(|b| b.handle.is_valid())
    }

    /// Returns the number of bodies in the world
    pub fn num_bodies(&self) -> usize {
        self.bodies.len() - self.free_bodies.len()
    }

    /// Wakes a sleeping body; the `WakeUp` event is reported by the next step
    pub fn wake_up(&mut self, handle: BodyHandle) -> PhysicsResult<()> {
        if self.body_or_err(handle)?.wake_up() {
            self.pending_events.push(WorldEvent::WakeUp { body: handle });
        }
        Ok(())
    }

    /// Teleports a body; the interpolated pose jumps along with it
    pub fn set_body_position(&mut self, handle: BodyHandle, position: Vec3) -> PhysicsResult<()> {
        let body = self.body_or_err(handle)?;
        body.position = position;
        body.previous_position = position;
        body.interpolated_position = position;
        body.compute_aabb();
        self.wake_up(handle)
    }

    pub fn set_body_rotation(&mut self, handle: BodyHandle, rotation: Quat) -> PhysicsResult<()> {
        let body = self.body_or_err(handle)?;
        let rotation = rotation.normalize();
        body.rotation = rotation;
        body.previous_rotation = rotation;
        body.interpolated_rotation = rotation;
        body.update_inertia_world();
        body.update_solve_mass_properties();
        body.compute_aabb();
        self.wake_up(handle)
    }

    /// Sets the linear velocity; static bodies keep a zero velocity
    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> PhysicsResult<()> {
        let body = self.body_or_err(handle)?;
        if body.is_static() {
            return Ok(());
        }
        body.linear_velocity = velocity;
        self.wake_up(handle)
    }

    /// Sets the angular velocity; static bodies keep a zero velocity
    pub fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> PhysicsResult<()> {
        let body = self.body_or_err(handle)?;
        if body.is_static() {
            return Ok(());
        }
        body.angular_velocity = velocity;
        self.wake_up(handle)
    }

    /// Adds a force for the next step, acting at `relative_point` from the centre of mass
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec3, relative_point: Vec3) -> PhysicsResult<()> {
        self.body_or_err(handle)?.apply_force(force, relative_point);
        Ok(())
    }

    pub fn apply_torque(&mut self, handle: BodyHandle, torque: Vec3) -> PhysicsResult<()> {
        self.body_or_err(handle)?.apply_torque(torque);
        Ok(())
    }

    /// Changes the velocities right away and wakes the body
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3, relative_point: Vec3) -> PhysicsResult<()> {
        self.body_or_err(handle)?.apply_impulse(impulse, relative_point);
        self.wake_up(handle)
    }

    /// Sets the gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
    }

    /// Gets the gravity
    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    /// Returns the current simulation time
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Number of internal steps taken so far
    pub fn step_number(&self) -> u64 {
        self.step_number
    }

    pub fn add_material(&mut self, name: impl Into<String>) -> MaterialId {
        self.materials.add_material(name)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.material_mut(id)
    }

    pub fn add_contact_material(&mut self, cm: ContactMaterial) -> PhysicsResult<()> {
        self.materials.add_contact_material(cm)
    }

    pub fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }

    /// Registers a joint between two live bodies
    pub fn add_constraint(&mut self, mut set: EquationSet) -> PhysicsResult<ConstraintHandle> {
        self.check_body(set.body_a)?;
        self.check_body(set.body_b)?;
        set.update(&self.bodies[set.body_a.index()], &self.bodies[set.body_b.index()]);

        let index = match self.constraints.iter().position(Option::is_none) {
            Some(index) => {
                self.constraints[index] = Some(set);
                index
            }
            None => {
                self.constraints.push(Some(set));
                self.constraints.len() - 1
            }
        };
        Ok(ConstraintHandle(index as u32))
    }

    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> PhysicsResult<EquationSet> {
        self.constraints
            .get_mut(handle.index())
            .and_then(Option::take)
            .ok_or(PhysicsError::ConstraintNotFound(handle))
    }

    pub fn constraint(&self, handle: ConstraintHandle) -> Option<&EquationSet> {
        self.constraints.get(handle.index()).and_then(Option::as_ref)
    }

    pub fn constraint_mut(&mut self, handle: ConstraintHandle) -> Option<&mut EquationSet> {
        self.constraints.get_mut(handle.index()).and_then(Option::as_mut)
    }

    /// Registers a spring between two live bodies
    pub fn add_spring(&mut self, spring: Spring) -> PhysicsResult<SpringHandle> {
        self.check_body(spring.body_a)?;
        self.check_body(spring.body_b)?;

        let index = match self.springs.iter().position(Option::is_none) {
            Some(index) => {
                self.springs[index] = Some(spring);
                index
            }
            None => {
                self.springs.push(Some(spring));
                self.springs.len() - 1
            }
        };
        Ok(SpringHandle(index as u32))
    }

    pub fn remove_spring(&mut self, handle: SpringHandle) -> PhysicsResult<Spring> {
        self.springs
            .get_mut(handle.index())
            .and_then(Option::take)
            .ok_or(PhysicsError::SpringNotFound(handle))
    }

    pub fn spring(&self, handle: SpringHandle) -> Option<&Spring> {
        self.springs.get(handle.index()).and_then(Option::as_ref)
    }

    pub fn spring_mut(&mut self, handle: SpringHandle) -> Option<&mut Spring> {
        self.springs.get_mut(handle.index()).and_then(Option::as_mut)
    }

    /// Contacts produced by the last step
    pub fn contacts(&self) -> &[ContactRecord] {
        &self.contacts.contacts
    }

    /// Equations solved in the last step: contacts with their friction rows, then joint rows
    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    /// Advances the world by one fixed step of `dt`.
    ///
    /// Interpolated poses are set to the new poses.
    pub fn step(&mut self, dt: f32) -> StepEvents {
        let mut events = StepEvents::default();
        if !(dt > 0.0 && dt.is_finite()) {
            return events;
        }

        self.internal_step(dt, &mut events.events);
        for body in self.bodies.iter_mut().filter(|b| b.handle.is_valid()) {
            body.interpolated_position = body.position;
            body.interpolated_rotation = body.rotation;
        }
        events
    }

    /// Takes as many fixed `dt` steps as fit into the accumulated time, up to
    /// `max_sub_steps`, then blends the interpolated poses by the leftover fraction.
    pub fn step_with_substeps(&mut self, dt: f32, time_since_last_called: f32, max_sub_steps: usize) -> StepEvents {
        let mut events = StepEvents::default();
        if !(dt > 0.0 && dt.is_finite()) || !time_since_last_called.is_finite() {
            return events;
        }

        self.accumulator += time_since_last_called.max(0.0);
        let mut substeps = 0;
        while self.accumulator >= dt && substeps < max_sub_steps {
            self.internal_step(dt, &mut events.events);
            self.accumulator -= dt;
            substeps += 1;
        }
        // Time that did not fit into `max_sub_steps` is dropped
        self.accumulator %= dt;

        let t = self.accumulator / dt;
        for body in self.bodies.iter_mut().filter(|b| b.handle.is_valid()) {
            body.interpolated_position = body.previous_position.lerp(body.position, t);
            body.interpolated_rotation = body.previous_rotation.slerp(body.rotation, t).normalize();
        }
        events
    }

    fn internal_step(&mut self, dt: f32, events: &mut Vec<WorldEvent>) {
        events.append(&mut self.pending_events);

        let gravity = self.config.gravity;
        for body in self.bodies.iter_mut().filter(|b| b.handle.is_valid()) {
            if body.is_dynamic() {
                body.force += gravity * body.mass();
            }
            body.compute_aabb();
        }
        for spring in self.springs.iter().flatten() {
            if let Some((a, b)) = get_two_mut(&mut self.bodies, spring.body_a.index(), spring.body_b.index()) {
                spring.apply_force(a, b);
            }
        }

        self.pairs.clear();
        self.broadphase.collision_pairs(&self.bodies, &mut self.pairs);

        for set in self.constraints.iter().flatten() {
            if !set.collide_connected {
                self.pairs.retain(|&(a, b)| {
                    !((a == set.body_a && b == set.body_b) || (a == set.body_b && b == set.body_a))
                });
            }
        }

        self.body_overlaps.tick();
        self.shape_overlaps.tick();

        self.contacts.clear();
        self.narrowphase.get_contacts(
            &self.pairs,
            &self.bodies,
            &self.materials,
            &mut self.contact_cache,
            dt,
            &mut self.contacts,
        );
        trace!(
            "step {}: {} pairs, {} contacts, {} contact equations",
            self.step_number,
            self.pairs.len(),
            self.contacts.contacts.len(),
            self.contacts.equations.len()
        );

        for record in &self.contacts.contacts {
            let (a, b) = (record.key.body_a.index(), record.key.body_b.index());
            if hit_wakes(&self.bodies[a], &self.bodies[b]) {
                self.bodies[a].wake_up_after_narrowphase = true;
            }
            if hit_wakes(&self.bodies[b], &self.bodies[a]) {
                self.bodies[b].wake_up_after_narrowphase = true;
            }
        }

        for overlap in &self.contacts.overlaps {
            self.body_overlaps.set(overlap.body_a.0, overlap.body_b.0);
            self.shape_overlaps.set(overlap.shape_a.0, overlap.shape_b.0);
        }

        let mut last_pair = None;
        for record in &self.contacts.contacts {
            let pair = (record.key.body_a, record.key.body_b);
            if last_pair != Some(pair) {
                last_pair = Some(pair);
                events.push(WorldEvent::Collide {
                    body_a: pair.0,
                    body_b: pair.1,
                    contact: ContactInfo::from(record),
                });
            }
        }

        self.emit_overlap_events(events);

        for body in self.bodies.iter_mut().filter(|b| b.wake_up_after_narrowphase) {
            if body.wake_up() {
                events.push(WorldEvent::WakeUp { body: body.handle });
            }
        }

        self.assemble_equations(dt);
        self.solver.solve(dt, &mut self.equations, &mut self.bodies);
        self.store_impulses();

        let normalization = if self.step_number % (u64::from(self.config.quat_normalize_skip) + 1) == 0 {
            if self.config.quat_normalize_fast {
                QuatNormalization::Fast
            } else {
                QuatNormalization::Exact
            }
        } else {
            QuatNormalization::None
        };

        for body in self.bodies.iter_mut().filter(|b| b.handle.is_valid()) {
            body.previous_position = body.position;
            body.previous_rotation = body.rotation;
            apply_damping(body, dt);
            integrate(body, dt, normalization);
            body.clear_forces();
            body.compute_aabb();
        }

        self.time += dt;
        self.step_number += 1;

        if self.config.allow_sleep {
            let time = self.time;
            for body in self.bodies.iter_mut().filter(|b| b.handle.is_valid()) {
                match body.sleep_tick(time) {
                    Some(SleepTransition::Sleepy) => events.push(WorldEvent::Sleepy { body: body.handle }),
                    Some(SleepTransition::Sleep) => events.push(WorldEvent::Sleep { body: body.handle }),
                    None => {}
                }
            }
        }
    }

    fn emit_overlap_events(&mut self, events: &mut Vec<WorldEvent>) {
        self.body_overlaps.get_diff(&mut self.additions, &mut self.removals);
        for &(a, b) in &self.additions {
            events.push(WorldEvent::BeginContact {
                body_a: BodyHandle(a),
                body_b: BodyHandle(b),
            });
        }
        for &(a, b) in &self.removals {
            events.push(WorldEvent::EndContact {
                body_a: BodyHandle(a),
                body_b: BodyHandle(b),
            });
        }

        self.shape_overlaps.get_diff(&mut self.additions, &mut self.removals);
        let owner = |id: u32| self.shape_owners.get(id as usize).copied().unwrap_or(BodyHandle::INVALID);
        for &(a, b) in &self.additions {
            events.push(WorldEvent::BeginShapeContact {
                body_a: owner(a),
                body_b: owner(b),
                shape_a: ShapeId(a),
                shape_b: ShapeId(b),
            });
        }
        for &(a, b) in &self.removals {
            events.push(WorldEvent::EndShapeContact {
                body_a: owner(a),
                body_b: owner(b),
                shape_a: ShapeId(a),
                shape_b: ShapeId(b),
            });
        }
    }

    /// Contact rows from the narrowphase followed by the rows of every joint
    fn assemble_equations(&mut self, dt: f32) {
        self.equations.clear();
        self.equations.append(&mut self.contacts.equations);
        self.joint_rows.clear();

        for (index, slot) in self.constraints.iter_mut().enumerate() {
            let Some(set) = slot else {
                continue;
            };
            let (Some(a), Some(b)) = (self.bodies.get(set.body_a.index()), self.bodies.get(set.body_b.index())) else {
                continue;
            };
            set.update(a, b);
            for eq in set.equations_mut() {
                eq.set_spook_params(eq.stiffness, eq.relaxation, dt);
            }
            self.joint_rows.push((index, self.equations.len()));
            self.equations.extend(set.equations().iter().cloned());
        }
    }

    /// Saves contact impulses for warm starting and copies joint impulses back
    fn store_impulses(&mut self) {
        let equations = &self.equations;
        let impulse = |index: usize| equations.get(index).map_or(0.0, |eq| eq.accumulated_impulse);

        for record in &self.contacts.contacts {
            let [t1, t2] = record.friction.map_or([0.0, 0.0], |[i, j]| [impulse(i), impulse(j)]);
            self.contact_cache.store(
                record.key,
                CachedImpulse {
                    local_point_a: record.local_point_a,
                    normal_impulse: impulse(record.contact),
                    tangent_impulse_1: t1,
                    tangent_impulse_2: t2,
                },
            );
        }
        self.contact_cache.advance();

        for &(index, start) in &self.joint_rows {
            if let Some(set) = self.constraints[index].as_mut() {
                for (row, solved) in set.equations_mut().iter_mut().zip(&equations[start..]) {
                    row.accumulated_impulse = solved.accumulated_impulse;
                    row.multiplier = solved.multiplier;
                }
            }
        }
    }

    /// Closest hit within `max_distance` of `origin` along `direction`, with default options
    pub fn ray_cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayCastHit> {
        let direction = direction.try_normalize()?;
        self.raycast_closest(origin, origin + direction * max_distance, &RayOptions::default())
    }

    /// Nearest hit on the segment from `from` to `to`
    pub fn raycast_closest(&self, from: Vec3, to: Vec3, options: &RayOptions) -> Option<RayCastHit> {
        self.raycast(&Ray::new(from, to), RayMode::Closest, options).pop()
    }

    /// Some hit on the segment, whichever is found first
    pub fn raycast_any(&self, from: Vec3, to: Vec3, options: &RayOptions) -> Option<RayCastHit> {
        self.raycast(&Ray::new(from, to), RayMode::Any, options).pop()
    }

    /// Every hit on the segment, nearest first. A closed shape crossed by the
    /// segment is reported both where the ray enters and where it leaves, unless
    /// `options.skip_backfaces` is set.
    pub fn raycast_all(&self, from: Vec3, to: Vec3, options: &RayOptions) -> Vec<RayCastHit> {
        self.raycast(&Ray::new(from, to), RayMode::All, options)
    }

    fn raycast(&self, ray: &Ray, mode: RayMode, options: &RayOptions) -> Vec<RayCastHit> {
        let mut result: Vec<RayCastHit> = Vec::new();
        let Some(direction) = ray.direction() else {
            return result;
        };
        let length = ray.length();
        let mut hits = Vec::new();

        for body in self.bodies() {
            if (options.collision_filter_group & body.collision_filter_mask) == 0
                || (body.collision_filter_group & options.collision_filter_mask) == 0
                || (options.check_collision_response && !body.collision_response)
            {
                continue;
            }
            match body.aabb().ray_intersection(ray.from, direction) {
                Some((t, _)) if t <= length => {}
                _ => continue,
            }

            for shape in body.shapes() {
                if options.check_collision_response && !shape.collision_response {
                    continue;
                }
                let transform = body.shape_transform(shape);
                if !ray.passes_near(transform.position, shape.shape.bounding_radius()) {
                    continue;
                }

                hits.clear();
                ray_shape(&shape.shape, &transform, ray, options.skip_backfaces, &mut hits);
                for hit in &hits {
                    let found = RayCastHit {
                        body: body.handle,
                        shape: shape.id,
                        point: hit.point,
                        normal: hit.normal,
                        distance: hit.distance,
                    };
                    match mode {
                        RayMode::Any => return vec![found],
                        RayMode::All => result.push(found),
                        RayMode::Closest => {
                            if result.first().map_or(true, |best| found.distance < best.distance) {
                                result.clear();
                                result.push(found);
                            }
                        }
                    }
                }
            }
        }

        result.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        result
    }

    /// Bodies whose AABB overlaps `aabb`.
    ///
    /// Uses the boxes cached by the last step, `add_body` and the pose setters.
    pub fn query_aabb(&self, aabb: Aabb) -> Vec<BodyHandle> {
        let mut result = Vec::new();
        self.broadphase.aabb_query(&self.bodies, aabb, &mut result);
        result
    }
}

/// Whether a contact with `other` should wake the sleeping `body`
fn hit_wakes(body: &RigidBody, other: &RigidBody) -> bool {
    if !(body.allow_sleep && body.is_dynamic() && body.is_sleeping()) {
        return false;
    }
    if other.sleep_state() != SleepState::Awake || other.is_static() {
        return false;
    }
    let speed_sq = other.linear_velocity.length_squared() + other.angular_velocity.length_squared();
    speed_sq >= 2.0 * other.sleep_speed_limit * other.sleep_speed_limit
}
