//! Exact contact generation between shape pairs, and the driver that turns the
//! resulting contacts into solver equations.

mod convex;
mod heightfield;
mod particle;
mod sphere;
mod trimesh;

use std::collections::HashSet;

use log::debug;
use thiserror::Error;

pub use convex::{convex_convex, plane_convex};
pub use heightfield::{convex_heightfield, sphere_heightfield};
pub use particle::{convex_particle, plane_particle, sphere_particle};
pub use sphere::{sphere_convex, sphere_plane, sphere_sphere};
pub use trimesh::{plane_trimesh, sphere_trimesh};

use crate::collision::contact::{BodyHandle, ContactCache, ContactKey, ContactManifold, ContactPoint, ShapeId};
use crate::constraints::Equation;
use crate::dynamics::RigidBody;
use crate::geometry::{Shape, ShapeType};
use crate::material::MaterialRegistry;
use crate::math::{Transform, Vec3};

/// Contact routine for one canonical shape pair (lower [`ShapeType`] first).
///
/// Normals of the produced points point from the first shape to the second.
pub type PairFn = fn(&Shape, &Transform, &Shape, &Transform, &mut ContactManifold);

/// No contact routine exists for this pair of shape types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no contact routine for {0:?} against {1:?}")]
pub struct UnsupportedPair(pub ShapeType, pub ShapeType);

/// Looks up the routine for a pair already in canonical order
pub fn pair_fn(a: ShapeType, b: ShapeType) -> Option<PairFn> {
    use ShapeType::*;

    let f: PairFn = match (a, b) {
        (Sphere, Sphere) => sphere_sphere,
        (Sphere, Plane) => sphere_plane,
        (Sphere, Box) | (Sphere, ConvexHull) => sphere_convex,
        (Sphere, Heightfield) => sphere_heightfield,
        (Sphere, Particle) => sphere_particle,
        (Sphere, Trimesh) => sphere_trimesh,
        (Plane, Box) | (Plane, ConvexHull) => plane_convex,
        (Plane, Particle) => plane_particle,
        (Plane, Trimesh) => plane_trimesh,
        (Box, Box) | (Box, ConvexHull) | (ConvexHull, ConvexHull) => convex_convex,
        (Box, Heightfield) | (ConvexHull, Heightfield) => convex_heightfield,
        (Box, Particle) | (ConvexHull, Particle) => convex_particle,
        _ => return None,
    };
    Some(f)
}

/// Appends the contacts between two posed shapes to `manifold`.
///
/// Compounds are expanded into their children. Pairs given in non-canonical
/// order are evaluated swapped and flipped back, so every added point has its
/// normal pointing from `a` to `b`.
pub fn collide_shapes(
    a: &Shape,
    ta: &Transform,
    b: &Shape,
    tb: &Transform,
    manifold: &mut ContactManifold,
) -> Result<(), UnsupportedPair> {
    if let Shape::Compound(compound) = a {
        let mut result = Ok(());
        for child in &compound.children {
            let child_transform = ta.compose(child.local_transform());
            let outcome = collide_shapes(&child.shape, &child_transform, b, tb, manifold);
            result = result.and(outcome);
        }
        return result;
    }
    if let Shape::Compound(compound) = b {
        let mut result = Ok(());
        for child in &compound.children {
            let child_transform = tb.compose(child.local_transform());
            let outcome = collide_shapes(a, ta, &child.shape, &child_transform, manifold);
            result = result.and(outcome);
        }
        return result;
    }

    let (type_a, type_b) = (a.shape_type(), b.shape_type());
    if type_a <= type_b {
        let f = pair_fn(type_a, type_b).ok_or(UnsupportedPair(type_a, type_b))?;
        f(a, ta, b, tb, manifold);
    } else {
        let f = pair_fn(type_b, type_a).ok_or(UnsupportedPair(type_b, type_a))?;
        let start = manifold.len();
        f(b, tb, a, ta, manifold);
        manifold.flip_from(start);
    }
    Ok(())
}

/// Bookkeeping for one contact point turned into equations
#[derive(Debug, Clone, Copy)]
pub struct ContactRecord {
    pub key: ContactKey,
    /// Index of the contact equation in [`NarrowphaseOutput::equations`]
    pub contact: usize,
    /// Indices of the two friction equations, absent when the friction coefficient is zero
    pub friction: Option<[usize; 2]>,
    /// Contact point in the local frame of body A, used to match warm-start impulses
    pub local_point_a: Vec3,
    pub point: ContactPoint,
}

/// Two shapes found touching, whether or not they respond to the contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeOverlap {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub shape_a: ShapeId,
    pub shape_b: ShapeId,
}

#[derive(Debug, Default)]
pub struct NarrowphaseOutput {
    pub equations: Vec<Equation>,
    pub contacts: Vec<ContactRecord>,
    pub overlaps: Vec<ShapeOverlap>,
}

impl NarrowphaseOutput {
    pub fn clear(&mut self) {
        self.equations.clear();
        self.contacts.clear();
        self.overlaps.clear();
    }
}

/// Generates contacts for the candidate pairs of a step
#[derive(Debug, Default)]
pub struct Narrowphase {
    manifold: ContactManifold,
    reported: HashSet<(ShapeType, ShapeType)>,
}

impl Narrowphase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tests every shape of every pair and appends contact and friction equations.
    ///
    /// Contact equations are followed directly by their friction equations. Bodies
    /// or shapes without collision response only produce overlap records.
    pub fn get_contacts(
        &mut self,
        pairs: &[(BodyHandle, BodyHandle)],
        bodies: &[RigidBody],
        materials: &MaterialRegistry,
        cache: &mut ContactCache,
        dt: f32,
        output: &mut NarrowphaseOutput,
    ) {
        for &(first, second) in pairs {
            let (ha, hb) = if first <= second { (first, second) } else { (second, first) };
            let (Some(body_a), Some(body_b)) = (bodies.get(ha.index()), bodies.get(hb.index())) else {
                continue;
            };
            self.collide_bodies(body_a, body_b, materials, cache, dt, output);
        }
    }

    fn collide_bodies(
        &mut self,
        body_a: &RigidBody,
        body_b: &RigidBody,
        materials: &MaterialRegistry,
        cache: &mut ContactCache,
        dt: f32,
        output: &mut NarrowphaseOutput,
    ) {
        for shape_a in body_a.shapes() {
            let ta = body_a.shape_transform(shape_a);
            for shape_b in body_b.shapes() {
                let tb = body_b.shape_transform(shape_b);

                let reach = shape_a.shape.bounding_radius() + shape_b.shape.bounding_radius();
                if ta.position.distance(tb.position) > reach {
                    continue;
                }

                self.manifold.clear();
                if let Err(UnsupportedPair(x, y)) =
                    collide_shapes(&shape_a.shape, &ta, &shape_b.shape, &tb, &mut self.manifold)
                {
                    if self.reported.insert((x, y)) {
                        debug!("No contact routine for {:?} against {:?}, pair skipped", x, y);
                    }
                }
                if self.manifold.is_empty() {
                    continue;
                }

                output.overlaps.push(ShapeOverlap {
                    body_a: body_a.handle,
                    body_b: body_b.handle,
                    shape_a: shape_a.id,
                    shape_b: shape_b.id,
                });

                let responds = body_a.collision_response
                    && body_b.collision_response
                    && shape_a.collision_response
                    && shape_b.collision_response;
                if !responds {
                    continue;
                }

                let cm = materials.resolve(
                    shape_a.material.or(body_a.material),
                    shape_b.material.or(body_b.material),
                );
                let key = ContactKey {
                    body_a: body_a.handle,
                    body_b: body_b.handle,
                    shape_a: shape_a.id,
                    shape_b: shape_b.id,
                };

                for &point in self.manifold.iter() {
                    let ri = point.point_a - body_a.position;
                    let rj = point.point_b - body_b.position;
                    let local_point_a = body_a.point_to_local_frame(point.point_a);
                    let cached = cache.take(&key, local_point_a);

                    let mut contact =
                        Equation::contact(body_a.handle, body_b.handle, ri, rj, point.normal, cm.restitution);
                    contact.set_spook_params(cm.contact_equation_stiffness, cm.contact_equation_relaxation, dt);
                    contact.accumulated_impulse = cached.map_or(0.0, |c| c.normal_impulse);

                    let contact_index = output.equations.len();
                    output.equations.push(contact);

                    let friction = (cm.friction > 0.0).then(|| {
                        let (t1, t2) = point.normal.tangents();
                        let warm = cached.map_or([0.0, 0.0], |c| [c.tangent_impulse_1, c.tangent_impulse_2]);
                        for (tangent, impulse) in [(t1, warm[0]), (t2, warm[1])] {
                            let mut eq = Equation::friction(
                                body_a.handle,
                                body_b.handle,
                                ri,
                                rj,
                                tangent,
                                cm.friction,
                                Some(contact_index),
                            );
                            eq.set_spook_params(
                                cm.friction_equation_stiffness,
                                cm.friction_equation_relaxation,
                                dt,
                            );
                            eq.accumulated_impulse = impulse;
                            output.equations.push(eq);
                        }
                        [contact_index + 1, contact_index + 2]
                    });

                    output.contacts.push(ContactRecord {
                        key,
                        contact: contact_index,
                        friction,
                        local_point_a,
                        point,
                    });
                }
            }
        }
    }
}
