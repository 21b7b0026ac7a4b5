mod integrator;
mod rigid_body;
mod spring;

pub use integrator::{apply_damping, integrate, QuatNormalization};
pub use rigid_body::{BodyShape, BodyType, RigidBody, RigidBodyDesc, SleepState, SleepTransition};
pub use spring::{Spring, SpringHandle};
