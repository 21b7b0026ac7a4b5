//! Error types for configuration mistakes made at the call site.
//!
//! Numerical degeneracies inside a step never surface here: a contact that cannot
//! be built is simply not produced.

use thiserror::Error;

use crate::collision::BodyHandle;
use crate::constraints::ConstraintHandle;
use crate::dynamics::SpringHandle;
use crate::material::MaterialId;

/// Result alias used across the crate
pub type PhysicsResult<T> = Result<T, PhysicsError>;

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("face {face} references vertex {index}, but the hull has {vertex_count} vertices")]
    InvalidShapeIndex {
        face: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("invalid convex hull: {0}")]
    InvalidConvexHull(String),

    #[error("invalid heightfield: {0}")]
    InvalidHeightfield(String),

    #[error("invalid trimesh: {0}")]
    InvalidTrimesh(String),

    #[error("heightfield index ({xi}, {yi}) is outside the {size_x}x{size_y} grid")]
    HeightfieldIndexOutOfRange {
        xi: usize,
        yi: usize,
        size_x: usize,
        size_y: usize,
    },

    #[error("body {0:?} is not registered in this world")]
    BodyNotFound(BodyHandle),

    #[error("constraint {0:?} is not registered in this world")]
    ConstraintNotFound(ConstraintHandle),

    #[error("spring {0:?} is not registered in this world")]
    SpringNotFound(SpringHandle),

    #[error("material {0:?} is not registered in this world")]
    MaterialNotFound(MaterialId),

    #[error("world is full: at most {max} bodies fit the 16-bit overlap keys")]
    TooManyBodies { max: usize },

    #[error("world is full: at most {max} shapes fit the 16-bit overlap keys")]
    TooManyShapes { max: usize },

    #[error("world snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}
