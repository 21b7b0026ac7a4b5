mod mat3;
mod quat;
mod transform;
mod vec3;

pub use mat3::Mat3;
pub use quat::Quat;
pub use transform::Transform;
pub use vec3::Vec3;

/// Common math constants
pub mod consts {
    /// A small epsilon value for floating point comparisons
    pub const EPSILON: f32 = 1e-6;

    /// Default force bound of a constraint equation
    pub const DEFAULT_MAX_FORCE: f32 = 1e6;
}
