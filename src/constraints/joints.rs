use std::f32::consts::FRAC_PI_2;

use crate::collision::BodyHandle;
use crate::dynamics::RigidBody;
use crate::math::{Quat, Vec3};

use super::equation::{Equation, EquationKind};

/// Handle of an [`EquationSet`] registered in a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintHandle(pub u32);

impl ConstraintHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Body-frame description of a joint. [`EquationSet::update`] turns it into
/// world-space equation data every step.
#[derive(Debug, Clone, PartialEq)]
pub enum Joint {
    PointToPoint {
        pivot_a: Vec3,
        pivot_b: Vec3,
    },
    Hinge {
        pivot_a: Vec3,
        pivot_b: Vec3,
        axis_a: Vec3,
        axis_b: Vec3,
    },
    ConeTwist {
        pivot_a: Vec3,
        pivot_b: Vec3,
        axis_a: Vec3,
        axis_b: Vec3,
        angle: f32,
        twist_angle: f32,
    },
    /// Local X, Y and Z of the common frame, as seen from each body
    Lock {
        pivot_a: Vec3,
        pivot_b: Vec3,
        axes_a: [Vec3; 3],
        axes_b: [Vec3; 3],
    },
    Distance {
        distance: f32,
    },
}

// Row layout inside `equations`
const POINT_ROWS: usize = 3;
const HINGE_MOTOR_ROW: usize = 5;

/// A joint between two bodies, expressed as a group of primitive equations.
///
/// Joint rows persist across steps, so their last impulses warm start the next solve.
#[derive(Debug, Clone)]
pub struct EquationSet {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Whether the two bodies still collide with each other
    pub collide_connected: bool,
    joint: Joint,
    equations: Vec<Equation>,
}

fn contact_row(a: BodyHandle, b: BodyHandle, axis: Vec3, max_force: f32) -> Equation {
    let mut eq = Equation::contact(a, b, Vec3::ZERO, Vec3::ZERO, axis, 0.0);
    eq.min_force = -max_force;
    eq.max_force = max_force;
    eq
}

fn point_rows(a: BodyHandle, b: BodyHandle, max_force: f32) -> Vec<Equation> {
    [Vec3::X, Vec3::Y, Vec3::Z]
        .into_iter()
        .map(|axis| contact_row(a, b, axis, max_force))
        .collect()
}

fn update_point_rows(rows: &mut [Equation], pivot_a: Vec3, pivot_b: Vec3, qa: Quat, qb: Quat) {
    let (wa, wb) = (qa.rotate_vec(pivot_a), qb.rotate_vec(pivot_b));
    for eq in rows.iter_mut().take(POINT_ROWS) {
        if let EquationKind::Contact { ri, rj, .. } = &mut eq.kind {
            *ri = wa;
            *rj = wb;
        }
    }
}

fn set_axes(eq: &mut Equation, world_a: Vec3, world_b: Vec3) {
    match &mut eq.kind {
        EquationKind::Rotational { axis_a, axis_b, .. }
        | EquationKind::Cone { axis_a, axis_b, .. }
        | EquationKind::RotationalMotor { axis_a, axis_b, .. } => {
            *axis_a = world_a;
            *axis_b = world_b;
        }
        _ => {}
    }
}

impl EquationSet {
    /// Connects `pivot_a` (in A's frame) to `pivot_b` (in B's frame)
    pub fn point_to_point(body_a: BodyHandle, pivot_a: Vec3, body_b: BodyHandle, pivot_b: Vec3, max_force: f32) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: true,
            joint: Joint::PointToPoint { pivot_a, pivot_b },
            equations: point_rows(body_a, body_b, max_force),
        }
    }

    /// Point-to-point plus two rows keeping `axis_a` and `axis_b` aligned, with a
    /// rotational motor about the axis that starts disabled.
    #[allow(clippy::too_many_arguments)]
    pub fn hinge(
        body_a: BodyHandle,
        pivot_a: Vec3,
        axis_a: Vec3,
        body_b: BodyHandle,
        pivot_b: Vec3,
        axis_b: Vec3,
        max_force: f32,
    ) -> Self {
        let (axis_a, axis_b) = (axis_a.normalize(), axis_b.normalize());
        let mut equations = point_rows(body_a, body_b, max_force);
        equations.push(Equation::rotational(body_a, body_b, Vec3::X, Vec3::Y, FRAC_PI_2, max_force));
        equations.push(Equation::rotational(body_a, body_b, Vec3::X, Vec3::Y, FRAC_PI_2, max_force));

        let mut motor = Equation::rotational_motor(body_a, body_b, axis_a, axis_b, 0.0, max_force);
        motor.enabled = false;
        equations.push(motor);

        Self {
            body_a,
            body_b,
            collide_connected: true,
            joint: Joint::Hinge {
                pivot_a,
                pivot_b,
                axis_a,
                axis_b,
            },
            equations,
        }
    }

    /// Point-to-point plus a cone limit of `angle` between the axes and a twist
    /// limit of `twist_angle` about them.
    #[allow(clippy::too_many_arguments)]
    pub fn cone_twist(
        body_a: BodyHandle,
        pivot_a: Vec3,
        axis_a: Vec3,
        body_b: BodyHandle,
        pivot_b: Vec3,
        axis_b: Vec3,
        angle: f32,
        twist_angle: f32,
        max_force: f32,
    ) -> Self {
        let (axis_a, axis_b) = (axis_a.normalize(), axis_b.normalize());
        let mut equations = point_rows(body_a, body_b, max_force);
        equations.push(Equation::cone(body_a, body_b, axis_a, axis_b, angle, max_force));

        let mut twist = Equation::rotational(body_a, body_b, Vec3::X, Vec3::Y, twist_angle, max_force);
        twist.max_force = 0.0;
        equations.push(twist);

        Self {
            body_a,
            body_b,
            collide_connected: true,
            joint: Joint::ConeTwist {
                pivot_a,
                pivot_b,
                axis_a,
                axis_b,
                angle,
                twist_angle,
            },
            equations,
        }
    }

    /// Freezes the current relative pose of two bodies
    pub fn lock(a: &RigidBody, b: &RigidBody, max_force: f32) -> Self {
        let half_way = (a.position + b.position) * 0.5;
        let pivot_a = a.point_to_local_frame(half_way);
        let pivot_b = b.point_to_local_frame(half_way);
        let axes_a = [Vec3::X, Vec3::Y, Vec3::Z].map(|axis| a.vector_to_local_frame(axis));
        let axes_b = [Vec3::X, Vec3::Y, Vec3::Z].map(|axis| b.vector_to_local_frame(axis));

        let mut equations = point_rows(a.handle, b.handle, max_force);
        for _ in 0..3 {
            equations.push(Equation::rotational(a.handle, b.handle, Vec3::X, Vec3::Y, FRAC_PI_2, max_force));
        }

        let mut set = Self {
            body_a: a.handle,
            body_b: b.handle,
            collide_connected: true,
            joint: Joint::Lock {
                pivot_a,
                pivot_b,
                axes_a,
                axes_b,
            },
            equations,
        };
        set.update(a, b);
        set
    }

    /// Keeps the centres of two bodies `distance` apart; `None` keeps the current distance
    pub fn distance(a: &RigidBody, b: &RigidBody, distance: Option<f32>, max_force: f32) -> Self {
        let distance = distance.unwrap_or_else(|| a.position.distance(b.position));
        let mut set = Self {
            body_a: a.handle,
            body_b: b.handle,
            collide_connected: true,
            joint: Joint::Distance { distance },
            equations: vec![contact_row(a.handle, b.handle, Vec3::X, max_force)],
        };
        set.update(a, b);
        set
    }

    pub fn with_collide_connected(mut self, collide: bool) -> Self {
        self.collide_connected = collide;
        self
    }

    pub fn joint(&self) -> &Joint {
        &self.joint
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn equations_mut(&mut self) -> &mut [Equation] {
        &mut self.equations
    }

    pub fn involves(&self, handle: BodyHandle) -> bool {
        self.body_a == handle || self.body_b == handle
    }

    /// Recomputes the world-space data of every row from the two body poses
    pub fn update(&mut self, a: &RigidBody, b: &RigidBody) {
        let (qa, qb) = (a.rotation, b.rotation);
        let rows = &mut self.equations;

        match self.joint {
            Joint::PointToPoint { pivot_a, pivot_b } => update_point_rows(rows, pivot_a, pivot_b, qa, qb),
            Joint::Hinge {
                pivot_a,
                pivot_b,
                axis_a,
                axis_b,
            } => {
                update_point_rows(rows, pivot_a, pivot_b, qa, qb);
                let world_a = qa.rotate_vec(axis_a);
                let world_b = qb.rotate_vec(axis_b);
                let (t1, t2) = axis_a.tangents();
                set_axes(&mut rows[3], qa.rotate_vec(t1), world_b);
                set_axes(&mut rows[4], qa.rotate_vec(t2), world_b);
                set_axes(&mut rows[HINGE_MOTOR_ROW], world_a, world_b);
            }
            Joint::ConeTwist {
                pivot_a,
                pivot_b,
                axis_a,
                axis_b,
                angle,
                twist_angle,
            } => {
                update_point_rows(rows, pivot_a, pivot_b, qa, qb);
                set_axes(&mut rows[3], qa.rotate_vec(axis_a), qb.rotate_vec(axis_b));
                if let EquationKind::Cone { angle: a, .. } = &mut rows[3].kind {
                    *a = angle;
                }

                let (twist_a, _) = axis_a.tangents();
                let (twist_b, _) = axis_b.tangents();
                set_axes(&mut rows[4], qa.rotate_vec(twist_a), qb.rotate_vec(twist_b));
                if let EquationKind::Rotational { max_angle, .. } = &mut rows[4].kind {
                    *max_angle = twist_angle;
                }
            }
            Joint::Lock {
                pivot_a,
                pivot_b,
                axes_a,
                axes_b,
            } => {
                update_point_rows(rows, pivot_a, pivot_b, qa, qb);
                // (xA, yB), (yA, zB), (zA, xB)
                for k in 0..3 {
                    let world_a = qa.rotate_vec(axes_a[k]);
                    let world_b = qb.rotate_vec(axes_b[(k + 1) % 3]);
                    set_axes(&mut rows[POINT_ROWS + k], world_a, world_b);
                }
            }
            Joint::Distance { distance } => {
                let normal = (b.position - a.position).try_normalize().unwrap_or(Vec3::X);
                let half = distance * 0.5;
                if let EquationKind::Contact { ri, rj, ni, .. } = &mut rows[0].kind {
                    *ni = normal;
                    *ri = normal * half;
                    *rj = normal * -half;
                }
            }
        }

        for eq in rows.iter_mut() {
            eq.update_jacobians();
        }
    }

    /// Enables every row, the hinge motor included
    pub fn enable(&mut self) {
        for eq in &mut self.equations {
            eq.enabled = true;
        }
    }

    pub fn disable(&mut self) {
        for eq in &mut self.equations {
            eq.enabled = false;
        }
    }

    /// Sets `±max_force` on every bilateral row; one-sided limits keep their zero side
    pub fn set_max_force(&mut self, max_force: f32) {
        for eq in &mut self.equations {
            if eq.min_force < 0.0 {
                eq.min_force = -max_force;
            }
            if eq.max_force > 0.0 {
                eq.max_force = max_force;
            }
        }
    }

    /// Applies SPOOK parameters to every row for a step of length `h`
    pub fn set_spook_params(&mut self, stiffness: f32, relaxation: f32, h: f32) {
        for eq in &mut self.equations {
            eq.set_spook_params(stiffness, relaxation, h);
        }
    }

    fn motor_mut(&mut self) -> Option<&mut Equation> {
        match self.joint {
            Joint::Hinge { .. } => self.equations.get_mut(HINGE_MOTOR_ROW),
            _ => None,
        }
    }

    /// The hinge motor row; `None` for other joints
    pub fn motor(&self) -> Option<&Equation> {
        match self.joint {
            Joint::Hinge { .. } => self.equations.get(HINGE_MOTOR_ROW),
            _ => None,
        }
    }

    /// Enables the hinge motor. Returns false when the joint has none.
    pub fn enable_motor(&mut self) -> bool {
        self.motor_mut().map(|motor| motor.enabled = true).is_some()
    }

    pub fn disable_motor(&mut self) -> bool {
        self.motor_mut().map(|motor| motor.enabled = false).is_some()
    }

    pub fn set_motor_speed(&mut self, speed: f32) -> bool {
        self.motor_mut()
            .map(|motor| {
                if let EquationKind::RotationalMotor { target_velocity, .. } = &mut motor.kind {
                    *target_velocity = speed;
                }
            })
            .is_some()
    }

    pub fn set_motor_max_force(&mut self, max_force: f32) -> bool {
        self.motor_mut()
            .map(|motor| {
                motor.min_force = -max_force;
                motor.max_force = max_force;
            })
            .is_some()
    }
}
