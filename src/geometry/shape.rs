use std::f32::consts::PI;

use crate::error::PhysicsResult;
use crate::math::{Mat3, Quat, Transform, Vec3};

use super::aabb::Aabb;
use super::convex::{box_inertia, ConvexPolyhedron};
use super::heightfield::Heightfield;
use super::trimesh::Trimesh;

/// The type of collision shape.
///
/// The declaration order is the canonical order of narrowphase pairs: a pair is
/// always handled with the lower type first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeType {
    Sphere,
    Plane,
    Box,
    Compound,
    ConvexHull,
    Heightfield,
    Particle,
    Trimesh,
}

/// A collision shape that can be attached to rigid bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A sphere defined by its radius
    Sphere(Sphere),
    /// A box (cuboid) defined by half-extents
    Box(BoxShape),
    /// An infinite plane through the local origin with normal +Z
    Plane(Plane),
    ConvexHull(ConvexPolyhedron),
    Heightfield(Heightfield),
    /// A point with no extent; collides with spheres, planes, boxes and hulls
    Particle(Particle),
    Trimesh(Trimesh),
    /// Child shapes posed relative to the compound origin
    Compound(Compound),
}

impl Shape {
    /// Creates a sphere shape
    #[inline]
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere(Sphere::new(radius))
    }

    /// Creates a box shape from half-extents
    #[inline]
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::Box(BoxShape::new(half_extents))
    }

    #[inline]
    pub fn plane() -> Self {
        Self::Plane(Plane)
    }

    pub fn convex(vertices: Vec<Vec3>, faces: Vec<Vec<usize>>) -> PhysicsResult<Self> {
        Ok(Self::ConvexHull(ConvexPolyhedron::new(vertices, faces)?))
    }

    /// A cylinder along local Z as a hull with `segments` side faces
    pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, segments: usize) -> PhysicsResult<Self> {
        Ok(Self::ConvexHull(ConvexPolyhedron::cylinder(
            radius_top,
            radius_bottom,
            height,
            segments,
        )?))
    }

    #[inline]
    pub fn particle() -> Self {
        Self::Particle(Particle)
    }

    /// A triangle mesh from vertices and three indices per triangle
    pub fn trimesh(vertices: Vec<Vec3>, indices: Vec<usize>) -> PhysicsResult<Self> {
        Ok(Self::Trimesh(Trimesh::new(vertices, indices)?))
    }

    pub fn heightfield(data: Vec<Vec<f32>>, element_size: f32) -> PhysicsResult<Self> {
        Ok(Self::Heightfield(Heightfield::new(data, element_size)?))
    }

    pub fn compound(children: Vec<CompoundChild>) -> Self {
        Self::Compound(Compound { children })
    }

    /// Returns the shape type
    #[inline]
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Sphere(_) => ShapeType::Sphere,
            Shape::Box(_) => ShapeType::Box,
            Shape::Plane(_) => ShapeType::Plane,
            Shape::ConvexHull(_) => ShapeType::ConvexHull,
            Shape::Heightfield(_) => ShapeType::Heightfield,
            Shape::Particle(_) => ShapeType::Particle,
            Shape::Trimesh(_) => ShapeType::Trimesh,
            Shape::Compound(_) => ShapeType::Compound,
        }
    }

    /// Polyhedral form of boxes and hulls
    #[inline]
    pub fn as_convex(&self) -> Option<&ConvexPolyhedron> {
        match self {
            Shape::Box(b) => Some(&b.convex),
            Shape::ConvexHull(hull) => Some(hull),
            _ => None,
        }
    }

    /// Enclosed volume; infinite for planes and heightfields, zero for particles
    pub fn volume(&self) -> f32 {
        match self {
            Shape::Sphere(s) => s.volume(),
            Shape::Box(b) => b.volume(),
            Shape::Plane(_) | Shape::Heightfield(_) => f32::INFINITY,
            Shape::ConvexHull(hull) => hull.volume(),
            Shape::Particle(_) => 0.0,
            Shape::Trimesh(mesh) => mesh.volume(),
            Shape::Compound(c) => c.children.iter().map(|child| child.shape.volume()).sum(),
        }
    }

    /// Principal moments of inertia for the given mass
    pub fn local_inertia(&self, mass: f32) -> Vec3 {
        self.inertia_tensor(mass).diagonal()
    }

    /// Inertia tensor about the local origin for the given mass
    pub fn inertia_tensor(&self, mass: f32) -> Mat3 {
        match self {
            Shape::Sphere(s) => Mat3::from_diagonal(Vec3::splat(0.4 * mass * s.radius * s.radius)),
            Shape::Box(b) => Mat3::from_diagonal(box_inertia(b.half_extents, mass)),
            Shape::Plane(_) | Shape::Heightfield(_) | Shape::Particle(_) => Mat3::ZERO,
            Shape::ConvexHull(hull) => hull.inertia_tensor(mass),
            Shape::Trimesh(mesh) => Mat3::from_diagonal(mesh.local_inertia(mass)),
            Shape::Compound(c) => {
                let parts: Vec<_> = c
                    .children
                    .iter()
                    .map(|child| (&child.shape, child.offset, child.orientation))
                    .collect();
                combined_inertia(&parts, mass)
            }
        }
    }

    /// Radius of a sphere around the local origin enclosing the shape
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Shape::Sphere(s) => s.radius,
            Shape::Box(b) => b.half_extents.length(),
            Shape::Plane(_) => f32::MAX,
            Shape::ConvexHull(hull) => hull.bounding_radius(),
            Shape::Heightfield(field) => field.bounding_radius(),
            Shape::Particle(_) => 0.0,
            Shape::Trimesh(mesh) => mesh.bounding_radius(),
            Shape::Compound(c) => c
                .children
                .iter()
                .map(|child| child.offset.length() + child.shape.bounding_radius())
                .fold(0.0, f32::max),
        }
    }

    /// Computes the AABB of this shape given a world transform
    pub fn world_aabb(&self, transform: &Transform) -> Aabb {
        match self {
            Shape::Sphere(s) => Aabb::from_center_half_extents(transform.position, Vec3::splat(s.radius)),
            Shape::Box(b) => b.world_aabb(transform),
            Shape::Plane(p) => p.world_aabb(transform),
            Shape::ConvexHull(hull) => hull.world_aabb(transform),
            Shape::Heightfield(field) => field.world_aabb(transform),
            Shape::Particle(_) => Aabb::new(transform.position, transform.position),
            Shape::Trimesh(mesh) => mesh.world_aabb(transform),
            Shape::Compound(c) => c.children.iter().fold(Aabb::EMPTY, |aabb, child| {
                aabb.union(child.shape.world_aabb(&transform.compose(child.local_transform())))
            }),
        }
    }
}

/// Inertia of several posed shapes sharing `mass`, about their common origin.
///
/// The mass is split in proportion to each part's finite volume. If no part has a
/// finite volume the split is even. Offsets enter through the parallel-axis theorem.
pub fn combined_inertia(parts: &[(&Shape, Vec3, Quat)], mass: f32) -> Mat3 {
    if parts.is_empty() {
        return Mat3::ZERO;
    }

    let volumes: Vec<f32> = parts
        .iter()
        .map(|(shape, _, _)| {
            let v = shape.volume();
            if v.is_finite() && v > 0.0 {
                v
            } else {
                0.0
            }
        })
        .collect();
    let total: f32 = volumes.iter().sum();

    let mut inertia = Mat3::ZERO;
    for ((shape, offset, orientation), volume) in parts.iter().zip(&volumes) {
        let part_mass = if total > 0.0 {
            mass * volume / total
        } else {
            mass / parts.len() as f32
        };
        inertia += shape.inertia_tensor(part_mass).rotated(*orientation);
        inertia += (Mat3::IDENTITY.scale(offset.length_squared()) - Mat3::outer_product(*offset, *offset))
            .scale(part_mass);
    }
    inertia
}

/// A sphere collision shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere with the given radius
    #[inline]
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        (4.0 / 3.0) * PI * self.radius * self.radius * self.radius
    }
}

/// A box (cuboid) collision shape
#[derive(Debug, Clone, PartialEq)]
pub struct BoxShape {
    /// Half-extents (half the size in each dimension)
    pub half_extents: Vec3,
    /// The same box as a hull, used by the polyhedral collision routines
    pub convex: ConvexPolyhedron,
}

impl BoxShape {
    pub fn new(half_extents: Vec3) -> Self {
        Self {
            half_extents,
            convex: ConvexPolyhedron::cuboid(half_extents),
        }
    }

    /// Returns the full size of the box
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.half_extents * 2.0
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        8.0 * self.half_extents.x * self.half_extents.y * self.half_extents.z
    }

    pub fn world_aabb(&self, transform: &Transform) -> Aabb {
        let h = self.half_extents;
        let r = transform.rotation;
        // Sum of the absolute rotated half axes
        let world_half_extents = r.rotate_vec(Vec3::X * h.x).abs()
            + r.rotate_vec(Vec3::Y * h.y).abs()
            + r.rotate_vec(Vec3::Z * h.z).abs();
        Aabb::from_center_half_extents(transform.position, world_half_extents)
    }
}

/// Infinite plane; the solid half-space lies below the local XY plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Plane;

impl Plane {
    #[inline]
    pub fn world_normal(&self, rotation: Quat) -> Vec3 {
        rotation.rotate_vec(Vec3::Z)
    }

    /// A half-space box when the normal is axis-aligned, unbounded otherwise
    pub fn world_aabb(&self, transform: &Transform) -> Aabb {
        const AXIS_TOLERANCE: f32 = 1e-6;
        let normal = self.world_normal(transform.rotation);
        let mut aabb = Aabb::INFINITE;

        for axis in 0..3 {
            if (normal[axis] - 1.0).abs() < AXIS_TOLERANCE {
                aabb.max[axis] = transform.position[axis];
            } else if (normal[axis] + 1.0).abs() < AXIS_TOLERANCE {
                aabb.min[axis] = transform.position[axis];
            }
        }
        aabb
    }
}

/// A point shape; all of its body's mass sits at the shape origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Particle;

/// A child of a compound shape
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundChild {
    pub shape: Shape,
    pub offset: Vec3,
    pub orientation: Quat,
}

impl CompoundChild {
    pub fn new(shape: Shape, offset: Vec3, orientation: Quat) -> Self {
        Self {
            shape,
            offset,
            orientation,
        }
    }

    #[inline]
    pub fn local_transform(&self) -> Transform {
        Transform::new(self.offset, self.orientation)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compound {
    pub children: Vec<CompoundChild>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_shape_type_order() {
        assert!(ShapeType::Sphere < ShapeType::Plane);
        assert!(ShapeType::Plane < ShapeType::Box);
        assert!(ShapeType::Box < ShapeType::Compound);
        assert!(ShapeType::Compound < ShapeType::ConvexHull);
        assert!(ShapeType::ConvexHull < ShapeType::Heightfield);
        assert!(ShapeType::Heightfield < ShapeType::Particle);
        assert!(ShapeType::Particle < ShapeType::Trimesh);

        assert_eq!(Shape::plane().shape_type(), ShapeType::Plane);
        assert_eq!(Shape::cuboid(Vec3::ONE).shape_type(), ShapeType::Box);
    }

    #[test]
    fn test_sphere_inertia() {
        let sphere = Shape::sphere(2.0);
        let inertia = sphere.local_inertia(5.0);
        assert!(approx_eq(inertia.x, 0.4 * 5.0 * 4.0));
        assert!(approx_eq(inertia.y, inertia.z));
    }

    #[test]
    fn test_box_inertia_and_volume() {
        let b = Shape::cuboid(Vec3::new(1.0, 2.0, 3.0));
        assert!(approx_eq(b.volume(), 48.0));

        // m/12 * (ey² + ez²) with full extents (2, 4, 6)
        let inertia = b.local_inertia(12.0);
        assert!(approx_eq(inertia.x, 16.0 + 36.0));
        assert!(approx_eq(inertia.y, 4.0 + 36.0));
        assert!(approx_eq(inertia.z, 4.0 + 16.0));
    }

    #[test]
    fn test_box_world_aabb() {
        let b = Shape::cuboid(Vec3::ONE);

        let t = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let aabb = b.world_aabb(&t);
        assert_eq!(aabb.min, Vec3::new(0.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vec3::new(2.0, 1.0, 1.0));

        // 45 degree rotation around Z widens X and Y to sqrt(2)
        let t = Transform::new(Vec3::ZERO, Quat::from_axis_angle(Vec3::Z, PI / 4.0));
        let aabb = b.world_aabb(&t);
        assert!(approx_eq(aabb.max.x, 2.0f32.sqrt()));
        assert!(approx_eq(aabb.max.y, 2.0f32.sqrt()));
        assert!(approx_eq(aabb.max.z, 1.0));
    }

    #[test]
    fn test_plane_aabb() {
        let plane = Shape::plane();

        let upright = plane.world_aabb(&Transform::from_position(Vec3::new(0.0, 0.0, -2.0)));
        assert_eq!(upright.max.z, -2.0);
        assert_eq!(upright.min.z, -f32::MAX);
        assert_eq!(upright.max.x, f32::MAX);

        let tilted = Transform::new(Vec3::ZERO, Quat::from_axis_angle(Vec3::X, 0.3));
        assert_eq!(plane.world_aabb(&tilted), Aabb::INFINITE);
        assert!(plane.volume().is_infinite());
        assert_eq!(plane.inertia_tensor(10.0), Mat3::ZERO);
    }

    #[test]
    fn test_compound_parallel_axis() {
        let compound = Shape::compound(vec![
            CompoundChild::new(Shape::sphere(1.0), Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY),
            CompoundChild::new(Shape::sphere(1.0), Vec3::new(-2.0, 0.0, 0.0), Quat::IDENTITY),
        ]);

        // Two unit spheres of mass 1 each, two units from the origin along X
        let inertia = compound.local_inertia(2.0);
        let own = 2.0 * 0.4;
        assert!(approx_eq(inertia.x, own));
        assert!(approx_eq(inertia.y, own + 2.0 * 4.0));
        assert!(approx_eq(inertia.z, own + 2.0 * 4.0));

        assert!(approx_eq(compound.bounding_radius(), 3.0));
        let aabb = compound.world_aabb(&Transform::IDENTITY);
        assert_eq!(aabb.min, Vec3::new(-3.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vec3::new(3.0, 1.0, 1.0));
    }

    #[test]
    fn test_particle_is_a_point() {
        let particle = Shape::particle();
        assert_eq!(particle.shape_type(), ShapeType::Particle);
        assert_eq!(particle.volume(), 0.0);
        assert_eq!(particle.bounding_radius(), 0.0);
        assert_eq!(particle.inertia_tensor(3.0), Mat3::ZERO);

        let p = Vec3::new(1.0, 2.0, 3.0);
        let aabb = particle.world_aabb(&Transform::from_position(p));
        assert_eq!((aabb.min, aabb.max), (p, p));
    }

    #[test]
    fn test_cylinder_and_trimesh_shapes() {
        let cylinder = Shape::cylinder(0.5, 0.5, 2.0, 16).unwrap();
        assert_eq!(cylinder.shape_type(), ShapeType::ConvexHull);
        assert!(cylinder.as_convex().is_some());
        assert!(Shape::cylinder(0.5, 0.5, -1.0, 16).is_err());

        let mesh = Shape::trimesh(
            vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 0.0, 2.0)],
            vec![0, 2, 1, 0, 1, 3],
        )
        .unwrap();
        assert_eq!(mesh.shape_type(), ShapeType::Trimesh);
        assert!(approx_eq(mesh.volume(), 8.0));
        assert!(approx_eq(mesh.bounding_radius(), 2.0));
        // Inertia of the 2x2x2 bounding box
        assert!(approx_eq(mesh.local_inertia(3.0).x, 3.0 / 12.0 * 8.0));
    }

    #[test]
    fn test_mass_split_ignores_infinite_parts() {
        let plane = Shape::plane();
        let sphere = Shape::sphere(1.0);
        let parts = [(&plane, Vec3::ZERO, Quat::IDENTITY), (&sphere, Vec3::ZERO, Quat::IDENTITY)];

        // The whole mass goes to the sphere
        let inertia = combined_inertia(&parts, 3.0);
        assert!(approx_eq(inertia.diagonal().x, 0.4 * 3.0));
    }
}
