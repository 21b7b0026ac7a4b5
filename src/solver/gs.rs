use serde::{Deserialize, Serialize};

use crate::constraints::Equation;
use crate::dynamics::RigidBody;
use crate::math::Vec3;

/// Configuration for the constraint solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Gauss-Seidel sweeps per step
    pub iterations: usize,
    /// Scale applied to last step's impulses when seeding this step
    pub warm_start_factor: f32,
    pub warm_starting: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            warm_start_factor: 1.0,
            warm_starting: true,
        }
    }
}

/// Projected Gauss-Seidel solver over SPOOK equations
#[derive(Debug, Default)]
pub struct GsSolver {
    config: SolverConfig,
    b: Vec<f32>,
    inv_c: Vec<f32>,
    lambda: Vec<f32>,
}

/// Mutable access to two distinct bodies
pub(crate) fn get_two_mut(bodies: &mut [RigidBody], i: usize, j: usize) -> Option<(&mut RigidBody, &mut RigidBody)> {
    if i == j || i >= bodies.len() || j >= bodies.len() {
        return None;
    }
    if i < j {
        let (head, tail) = bodies.split_at_mut(j);
        Some((&mut head[i], &mut tail[0]))
    } else {
        let (head, tail) = bodies.split_at_mut(i);
        Some((&mut tail[0], &mut head[j]))
    }
}

impl GsSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SolverConfig {
        &mut self.config
    }

    /// Solves the equations for a step of length `h` and adds the resulting velocity
    /// changes to the bodies. Returns the number of sweeps performed.
    pub fn solve(&mut self, h: f32, equations: &mut [Equation], bodies: &mut [RigidBody]) -> usize {
        if equations.is_empty() {
            return 0;
        }

        for body in bodies.iter_mut() {
            body.vlambda = Vec3::ZERO;
            body.wlambda = Vec3::ZERO;
        }

        self.b.clear();
        self.inv_c.clear();
        self.lambda.clear();

        for eq in equations.iter_mut() {
            eq.update_jacobians();
            let (bi, bj) = (bodies.get(eq.body_a.index()), bodies.get(eq.body_b.index()));
            let (b, inv_c) = match (bi, bj) {
                (Some(bi), Some(bj)) if eq.enabled && eq.body_a != eq.body_b => {
                    let c = eq.compute_c(bi, bj);
                    let inv_c = if c > 0.0 { 1.0 / c } else { 0.0 };
                    (eq.compute_b(h, bi, bj), inv_c)
                }
                _ => (0.0, 0.0),
            };
            self.b.push(b);
            self.inv_c.push(inv_c);
            self.lambda.push(0.0);
        }

        if self.config.warm_starting {
            for i in 0..equations.len() {
                let eq = &mut equations[i];
                if !eq.enabled {
                    continue;
                }
                if let Some((coefficient, contact)) = eq.friction_coupling() {
                    let normal = self.lambda.get(contact).copied().unwrap_or(0.0);
                    eq.min_force = -coefficient * normal;
                    eq.max_force = coefficient * normal;
                }

                let seeded = (eq.accumulated_impulse * self.config.warm_start_factor)
                    .max(eq.min_force)
                    .min(eq.max_force);
                if let Some((bi, bj)) = get_two_mut(bodies, eq.body_a.index(), eq.body_b.index()) {
                    self.lambda[i] = seeded;
                    eq.add_to_wlambda(seeded, bi, bj);
                }
            }
        }

        for _ in 0..self.config.iterations {
            for i in 0..equations.len() {
                let eq = &mut equations[i];
                if !eq.enabled {
                    continue;
                }
                if let Some((coefficient, contact)) = eq.friction_coupling() {
                    let normal = self.lambda.get(contact).copied().unwrap_or(0.0);
                    eq.min_force = -coefficient * normal;
                    eq.max_force = coefficient * normal;
                }

                let Some((bi, bj)) = get_two_mut(bodies, eq.body_a.index(), eq.body_b.index()) else {
                    continue;
                };

                let lambda = self.lambda[i];
                let gw_lambda = eq.compute_gw_lambda(bi, bj);
                let mut delta = self.inv_c[i] * (self.b[i] - gw_lambda - eq.eps * lambda);

                if lambda + delta < eq.min_force {
                    delta = eq.min_force - lambda;
                } else if lambda + delta > eq.max_force {
                    delta = eq.max_force - lambda;
                }

                self.lambda[i] += delta;
                eq.add_to_wlambda(delta, bi, bj);
            }
        }

        for body in bodies.iter_mut() {
            body.linear_velocity += body.vlambda.component_mul(body.linear_factor);
            body.angular_velocity += body.wlambda.component_mul(body.angular_factor);
        }

        for (eq, &lambda) in equations.iter_mut().zip(&self.lambda) {
            eq.accumulated_impulse = lambda;
            eq.multiplier = lambda / h;
        }

        self.config.iterations
    }
}
