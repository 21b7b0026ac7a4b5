//! Velocity equations and the joints assembled from them.

mod equation;
mod joints;

pub use equation::{Equation, EquationKind, JacobianElement, DEFAULT_RELAXATION, DEFAULT_STIFFNESS};
pub use joints::{ConstraintHandle, EquationSet, Joint};
