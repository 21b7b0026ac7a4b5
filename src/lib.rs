//! # rigid3d
//!
//! A real-time 3D rigid body physics engine.
//!
//! ## Features
//!
//! - **Rigid Body Dynamics**: dynamic, static and kinematic bodies with damping, per-axis factors and sleeping
//! - **Collision Shapes**: spheres, boxes, planes, cylinders, convex hulls, particles, heightfields, triangle meshes and compounds
//! - **Broad Phase**: brute-force pairs, sweep and prune, or an octree over body AABBs
//! - **Narrow Phase**: contact routines dispatched per shape pair, SAT and face clipping for hulls
//! - **Constraint Solver**: SPOOK-regularized equations solved by Gauss-Seidel iteration
//! - **Joints**: point-to-point, hinge (with motor), cone-twist, lock and distance
//! - **Springs**: damped springs between body anchor points
//! - **Contact Caching**: warm starting from the previous step's impulses
//! - **Ray Casting**: exact per-shape hits in closest, any or all mode
//!
//! ## Quick Start
//!
//! ```rust
//! use rigid3d::prelude::*;
//!
//! // Create a physics world; planes face +Z so gravity points down Z
//! let mut world = World::default();
//!
//! // Create a static floor
//! world.add_body(RigidBodyDesc::fixed().with_shape(Shape::plane())).unwrap();
//!
//! // Create a dynamic ball
//! let ball = world
//!     .add_body(
//!         RigidBodyDesc::dynamic()
//!             .with_position(Vec3::new(0.0, 0.0, 5.0))
//!             .with_shape(Shape::sphere(0.5))
//!             .with_mass(1.0),
//!     )
//!     .unwrap();
//!
//! // Simulation loop
//! let dt = 1.0 / 60.0;
//! for _ in 0..600 {
//!     for event in world.step(dt) {
//!         if let WorldEvent::BeginContact { .. } = event {
//!             println!("Ball landed");
//!         }
//!     }
//! }
//! let pos = world.body(ball).unwrap().position;
//! assert!(pos.z > 0.4 && pos.z < 0.6);
//! ```

pub mod collision;
pub mod constraints;
pub mod dynamics;
pub mod error;
pub mod geometry;
pub mod material;
pub mod math;
pub mod snapshot;
pub mod solver;
mod world;

pub use error::{PhysicsError, PhysicsResult};
pub use world::{BroadphaseKind, ContactInfo, RayCastHit, StepEvents, World, WorldConfig, WorldEvent, MAX_BODIES};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::collision::{BodyHandle, ContactPoint, RayMode, RayOptions, SapAxis, ShapeId};
    pub use crate::constraints::{ConstraintHandle, EquationSet, Joint};
    pub use crate::dynamics::{BodyShape, BodyType, RigidBody, RigidBodyDesc, Spring, SpringHandle};
    pub use crate::error::{PhysicsError, PhysicsResult};
    pub use crate::geometry::{Aabb, CompoundChild, Shape, ShapeType};
    pub use crate::material::{ContactMaterial, MaterialId};
    pub use crate::math::{Mat3, Quat, Transform, Vec3};
    pub use crate::snapshot::WorldSnapshot;
    pub use crate::solver::SolverConfig;
    pub use crate::world::{BroadphaseKind, RayCastHit, StepEvents, World, WorldConfig, WorldEvent};
}
