use crate::collision::BodyHandle;
use crate::dynamics::RigidBody;
use crate::math::consts::DEFAULT_MAX_FORCE;
use crate::math::Vec3;

/// Default SPOOK stiffness
pub const DEFAULT_STIFFNESS: f32 = 1e7;
/// Default SPOOK relaxation, in time steps
pub const DEFAULT_RELAXATION: f32 = 4.0;

const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// One body's half of an equation Jacobian
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JacobianElement {
    pub spatial: Vec3,
    pub rotational: Vec3,
}

impl JacobianElement {
    pub fn new(spatial: Vec3, rotational: Vec3) -> Self {
        Self { spatial, rotational }
    }

    #[inline]
    pub fn multiply_vectors(&self, spatial: Vec3, rotational: Vec3) -> f32 {
        self.spatial.dot(spatial) + self.rotational.dot(rotational)
    }
}

/// What an equation constrains, with the world-space data its Jacobian is built from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EquationKind {
    /// Non-penetration along `ni` (pointing from A to B)
    Contact {
        ri: Vec3,
        rj: Vec3,
        ni: Vec3,
        restitution: f32,
    },
    /// Tangential friction. With a paired contact the bounds follow
    /// `±coefficient·λ` of that contact.
    Friction {
        ri: Vec3,
        rj: Vec3,
        t: Vec3,
        coefficient: f32,
        /// Index of the paired contact equation in the same equation list
        contact: Option<usize>,
    },
    /// Keeps the angle between two world axes at `max_angle`
    Rotational {
        axis_a: Vec3,
        axis_b: Vec3,
        max_angle: f32,
    },
    /// Limits the angle between two world axes to `angle`
    Cone { axis_a: Vec3, axis_b: Vec3, angle: f32 },
    /// Drives the relative angular velocity about the axes to `target_velocity`
    RotationalMotor {
        axis_a: Vec3,
        axis_b: Vec3,
        target_velocity: f32,
    },
}

/// A scalar velocity constraint `G·W = target` between two bodies, softened with SPOOK.
#[derive(Debug, Clone)]
pub struct Equation {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub jacobian_a: JacobianElement,
    pub jacobian_b: JacobianElement,
    pub min_force: f32,
    pub max_force: f32,
    pub a: f32,
    pub b: f32,
    pub eps: f32,
    pub stiffness: f32,
    pub relaxation: f32,
    pub enabled: bool,
    /// Last solved `λ/h`
    pub multiplier: f32,
    /// Last solved `λ`, the warm start of the next solve
    pub accumulated_impulse: f32,
    pub kind: EquationKind,
}

impl Equation {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, kind: EquationKind, min_force: f32, max_force: f32) -> Self {
        let mut equation = Self {
            body_a,
            body_b,
            jacobian_a: JacobianElement::default(),
            jacobian_b: JacobianElement::default(),
            min_force,
            max_force,
            a: 0.0,
            b: 0.0,
            eps: 0.0,
            stiffness: DEFAULT_STIFFNESS,
            relaxation: DEFAULT_RELAXATION,
            enabled: true,
            multiplier: 0.0,
            accumulated_impulse: 0.0,
            kind,
        };
        equation.set_spook_params(DEFAULT_STIFFNESS, DEFAULT_RELAXATION, DEFAULT_TIME_STEP);
        equation.update_jacobians();
        equation
    }

    /// Unilateral contact row with bounds `[0, 1e6]`
    pub fn contact(body_a: BodyHandle, body_b: BodyHandle, ri: Vec3, rj: Vec3, ni: Vec3, restitution: f32) -> Self {
        Self::new(
            body_a,
            body_b,
            EquationKind::Contact { ri, rj, ni, restitution },
            0.0,
            DEFAULT_MAX_FORCE,
        )
    }

    /// Friction row along `t`.
    ///
    /// Bounds start at zero; the solver derives them from the paired contact. Rows
    /// without one need their bounds set by the caller.
    pub fn friction(
        body_a: BodyHandle,
        body_b: BodyHandle,
        ri: Vec3,
        rj: Vec3,
        t: Vec3,
        coefficient: f32,
        contact: Option<usize>,
    ) -> Self {
        Self::new(
            body_a,
            body_b,
            EquationKind::Friction {
                ri,
                rj,
                t,
                coefficient,
                contact,
            },
            0.0,
            0.0,
        )
    }

    pub fn rotational(
        body_a: BodyHandle,
        body_b: BodyHandle,
        axis_a: Vec3,
        axis_b: Vec3,
        max_angle: f32,
        max_force: f32,
    ) -> Self {
        Self::new(
            body_a,
            body_b,
            EquationKind::Rotational {
                axis_a,
                axis_b,
                max_angle,
            },
            -max_force,
            max_force,
        )
    }

    /// Cone limit; only pushes the axes back together, so the bounds are `[-max_force, 0]`
    pub fn cone(body_a: BodyHandle, body_b: BodyHandle, axis_a: Vec3, axis_b: Vec3, angle: f32, max_force: f32) -> Self {
        Self::new(
            body_a,
            body_b,
            EquationKind::Cone { axis_a, axis_b, angle },
            -max_force,
            0.0,
        )
    }

    pub fn rotational_motor(
        body_a: BodyHandle,
        body_b: BodyHandle,
        axis_a: Vec3,
        axis_b: Vec3,
        target_velocity: f32,
        max_force: f32,
    ) -> Self {
        Self::new(
            body_a,
            body_b,
            EquationKind::RotationalMotor {
                axis_a,
                axis_b,
                target_velocity,
            },
            -max_force,
            max_force,
        )
    }

    /// Recomputes `a`, `b` and `eps` from stiffness `k`, relaxation `d` and step `h`
    pub fn set_spook_params(&mut self, stiffness: f32, relaxation: f32, h: f32) {
        let (k, d) = (stiffness, relaxation);
        self.stiffness = k;
        self.relaxation = d;
        self.a = 4.0 / (h * (1.0 + 4.0 * d));
        self.b = (4.0 * d) / (1.0 + 4.0 * d);
        self.eps = 4.0 / (h * h * k * (1.0 + 4.0 * d));
    }

    /// Rebuilds both Jacobian halves from the current kind data
    pub fn update_jacobians(&mut self) {
        let (ga, gb) = match self.kind {
            EquationKind::Contact { ri, rj, ni, .. } => (
                JacobianElement::new(-ni, -ri.cross(ni)),
                JacobianElement::new(ni, rj.cross(ni)),
            ),
            EquationKind::Friction { ri, rj, t, .. } => (
                JacobianElement::new(-t, -ri.cross(t)),
                JacobianElement::new(t, rj.cross(t)),
            ),
            EquationKind::Rotational { axis_a, axis_b, .. } | EquationKind::Cone { axis_a, axis_b, .. } => (
                JacobianElement::new(Vec3::ZERO, axis_b.cross(axis_a)),
                JacobianElement::new(Vec3::ZERO, axis_a.cross(axis_b)),
            ),
            EquationKind::RotationalMotor { axis_a, axis_b, .. } => (
                JacobianElement::new(Vec3::ZERO, axis_a),
                JacobianElement::new(Vec3::ZERO, -axis_b),
            ),
        };
        self.jacobian_a = ga;
        self.jacobian_b = gb;
    }

    /// Right-hand side `B = -g·a - GW·b - h·GiMf`
    pub fn compute_b(&self, h: f32, bi: &RigidBody, bj: &RigidBody) -> f32 {
        let gimf = self.compute_gimf(bi, bj);

        match self.kind {
            EquationKind::Contact {
                ri,
                rj,
                ni,
                restitution,
            } => {
                let g = (bj.position + rj - bi.position - ri).dot(ni);
                let e1 = restitution + 1.0;
                let gw = e1 * bj.linear_velocity.dot(ni) - e1 * bi.linear_velocity.dot(ni)
                    + bj.angular_velocity.dot(rj.cross(ni))
                    - bi.angular_velocity.dot(ri.cross(ni));
                -g * self.a - gw * self.b - h * gimf
            }
            EquationKind::Friction { .. } => -self.compute_gw(bi, bj) * self.b - h * gimf,
            EquationKind::Rotational {
                axis_a,
                axis_b,
                max_angle,
            } => {
                let g = max_angle.cos() - axis_a.dot(axis_b);
                -g * self.a - self.compute_gw(bi, bj) * self.b - h * gimf
            }
            EquationKind::Cone { axis_a, axis_b, angle } => {
                let g = angle.cos() - axis_a.dot(axis_b);
                -g * self.a - self.compute_gw(bi, bj) * self.b - h * gimf
            }
            EquationKind::RotationalMotor { target_velocity, .. } => {
                -(self.compute_gw(bi, bj) - target_velocity) * self.b - h * gimf
            }
        }
    }

    /// Relative velocity along the Jacobian
    pub fn compute_gw(&self, bi: &RigidBody, bj: &RigidBody) -> f32 {
        self.jacobian_a.multiply_vectors(bi.linear_velocity, bi.angular_velocity)
            + self.jacobian_b.multiply_vectors(bj.linear_velocity, bj.angular_velocity)
    }

    /// Relative velocity along the Jacobian from the solver's velocity deltas
    pub fn compute_gw_lambda(&self, bi: &RigidBody, bj: &RigidBody) -> f32 {
        self.jacobian_a.multiply_vectors(bi.vlambda, bi.wlambda)
            + self.jacobian_b.multiply_vectors(bj.vlambda, bj.wlambda)
    }

    /// `G·M⁻¹·f` for the external forces and torques
    pub fn compute_gimf(&self, bi: &RigidBody, bj: &RigidBody) -> f32 {
        let (ga, gb) = (&self.jacobian_a, &self.jacobian_b);
        ga.spatial.dot(bi.force * bi.inv_mass_solve())
            + ga.rotational.dot(bi.inv_inertia_world_solve() * bi.torque)
            + gb.spatial.dot(bj.force * bj.inv_mass_solve())
            + gb.rotational.dot(bj.inv_inertia_world_solve() * bj.torque)
    }

    /// `G·M⁻¹·Gᵀ`
    pub fn compute_gimgt(&self, bi: &RigidBody, bj: &RigidBody) -> f32 {
        let (ga, gb) = (&self.jacobian_a, &self.jacobian_b);
        bi.inv_mass_solve() * ga.spatial.length_squared()
            + bj.inv_mass_solve() * gb.spatial.length_squared()
            + ga.rotational.dot(bi.inv_inertia_world_solve() * ga.rotational)
            + gb.rotational.dot(bj.inv_inertia_world_solve() * gb.rotational)
    }

    /// Effective mass denominator `G·M⁻¹·Gᵀ + eps`
    pub fn compute_c(&self, bi: &RigidBody, bj: &RigidBody) -> f32 {
        self.compute_gimgt(bi, bj) + self.eps
    }

    /// Applies an impulse change to both bodies' solver velocity deltas
    pub fn add_to_wlambda(&self, delta_lambda: f32, bi: &mut RigidBody, bj: &mut RigidBody) {
        let (ga, gb) = (&self.jacobian_a, &self.jacobian_b);

        bi.vlambda += ga.spatial * (bi.inv_mass_solve() * delta_lambda);
        bi.wlambda += bi.inv_inertia_world_solve() * ga.rotational * delta_lambda;

        bj.vlambda += gb.spatial * (bj.inv_mass_solve() * delta_lambda);
        bj.wlambda += bj.inv_inertia_world_solve() * gb.rotational * delta_lambda;
    }

    /// Friction coefficient and paired contact index, if this is a coupled friction row
    pub(crate) fn friction_coupling(&self) -> Option<(f32, usize)> {
        match self.kind {
            EquationKind::Friction {
                coefficient,
                contact: Some(contact),
                ..
            } => Some((coefficient, contact)),
            _ => None,
        }
    }
}
