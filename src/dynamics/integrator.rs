use super::rigid_body::RigidBody;

/// How orientations are renormalized after integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuatNormalization {
    /// Skip renormalization this step
    None,
    /// Exact normalization
    #[default]
    Exact,
    /// First-order approximation, valid while the quaternion stays close to unit length
    Fast,
}

/// Scales velocities by `(1 - damping)^dt`
pub fn apply_damping(body: &mut RigidBody, dt: f32) {
    if !body.is_dynamic() {
        return;
    }
    body.linear_velocity *= (1.0 - body.linear_damping).powf(dt);
    body.angular_velocity *= (1.0 - body.angular_damping).powf(dt);
}

/// Semi-implicit Euler step: forces into velocities, then velocities into the pose.
///
/// Static and sleeping bodies are left untouched. Kinematic bodies skip the force
/// terms and move with their assigned velocities.
pub fn integrate(body: &mut RigidBody, dt: f32, normalization: QuatNormalization) {
    if body.is_static() || body.is_sleeping() {
        return;
    }

    body.previous_position = body.position;
    body.previous_rotation = body.rotation;

    if body.is_dynamic() {
        let inv_mass_dt = body.inv_mass() * dt;
        body.linear_velocity += (body.force * inv_mass_dt).component_mul(body.linear_factor);

        let torque = body.torque.component_mul(body.angular_factor);
        body.angular_velocity += body.inv_inertia_world() * torque * dt;
    }

    body.position += body.linear_velocity * dt;
    body.rotation = body
        .rotation
        .integrate(body.angular_velocity.component_mul(body.angular_factor), dt);

    body.rotation = match normalization {
        QuatNormalization::None => body.rotation,
        QuatNormalization::Exact => body.rotation.normalize(),
        QuatNormalization::Fast => body.rotation.normalize_fast(),
    };

    body.update_inertia_world();
    body.update_solve_mass_properties();
}
