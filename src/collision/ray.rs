//! Exact segment queries against posed shapes.
//!
//! Every shape is tested in its own frame. Hits are reported with their world
//! point, world normal and the distance from the segment start.

use crate::geometry::{ray_triangle, triangle_contains, triangle_normal, Aabb, ConvexPolyhedron, Heightfield, Shape, Trimesh};
use crate::math::{Transform, Vec3};

/// Direction cosines below this count as parallel to a plane or face
const PARALLEL_TOLERANCE: f32 = 1e-4;

/// How a world ray cast collects hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RayMode {
    /// Only the nearest hit
    #[default]
    Closest,
    /// Stop at the first hit found, in no particular order
    Any,
    /// Every hit, sorted by distance
    All,
}

/// Filtering applied to a ray cast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayOptions {
    /// Ignore faces whose normal points along the ray
    pub skip_backfaces: bool,
    pub collision_filter_group: u32,
    pub collision_filter_mask: u32,
    /// Ignore bodies and shapes that do not take part in contact response
    pub check_collision_response: bool,
}

impl Default for RayOptions {
    fn default() -> Self {
        Self {
            skip_backfaces: false,
            collision_filter_group: u32::MAX,
            collision_filter_mask: u32::MAX,
            check_collision_response: true,
        }
    }
}

/// A segment from `from` to `to`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub from: Vec3,
    pub to: Vec3,
}

/// One point where a ray crosses a shape surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    /// Surface normal at the hit, in world space
    pub normal: Vec3,
    /// Distance from the ray start
    pub distance: f32,
}

impl Ray {
    pub fn new(from: Vec3, to: Vec3) -> Self {
        Self { from, to }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.from.distance(self.to)
    }

    /// Unit direction; `None` for a zero-length ray
    #[inline]
    pub fn direction(&self) -> Option<Vec3> {
        (self.to - self.from).try_normalize()
    }

    /// Whether the infinite line through the ray passes within `radius` of `center`
    pub fn passes_near(&self, center: Vec3, radius: f32) -> bool {
        let Some(direction) = self.direction() else {
            return false;
        };
        let offset = center - self.from;
        let along = offset.dot(direction);
        (offset - direction * along).length_squared() <= radius * radius
    }
}

/// Appends every hit of `ray` on `shape` posed at `transform`
pub fn ray_shape(shape: &Shape, transform: &Transform, ray: &Ray, skip_backfaces: bool, hits: &mut Vec<RayHit>) {
    let Some(direction) = ray.direction() else {
        return;
    };
    let local = LocalRay {
        origin: transform.inverse_transform_point(ray.from),
        direction: transform.inverse_transform_vector(direction),
        length: ray.length(),
        skip_backfaces,
    };

    let start = hits.len();
    match shape {
        Shape::Sphere(sphere) => local.sphere(sphere.radius, hits),
        Shape::Plane(_) => local.plane(hits),
        Shape::Box(_) | Shape::ConvexHull(_) => {
            if let Some(hull) = shape.as_convex() {
                local.convex(hull, hits);
            }
        }
        Shape::Heightfield(field) => local.heightfield(field, hits),
        Shape::Trimesh(mesh) => local.trimesh(mesh, hits),
        Shape::Particle(_) => {}
        Shape::Compound(compound) => {
            for child in &compound.children {
                ray_shape(&child.shape, &transform.compose(child.local_transform()), ray, skip_backfaces, hits);
            }
            return;
        }
    }

    for hit in &mut hits[start..] {
        hit.point = transform.transform_point(hit.point);
        hit.normal = transform.rotation.rotate_vec(hit.normal);
    }
}

/// A ray in a shape's frame; hits are pushed in that frame too
struct LocalRay {
    origin: Vec3,
    direction: Vec3,
    length: f32,
    skip_backfaces: bool,
}

impl LocalRay {
    fn report(&self, distance: f32, normal: Vec3, hits: &mut Vec<RayHit>) {
        if distance < 0.0 || distance > self.length {
            return;
        }
        if self.skip_backfaces && normal.dot(self.direction) > 0.0 {
            return;
        }
        hits.push(RayHit {
            point: self.origin + self.direction * distance,
            normal,
            distance,
        });
    }

    fn sphere(&self, radius: f32, hits: &mut Vec<RayHit>) {
        let b = self.origin.dot(self.direction);
        let c = self.origin.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return;
        }

        let root = discriminant.sqrt();
        let mut report = |t: f32| {
            if let Some(normal) = (self.origin + self.direction * t).try_normalize() {
                self.report(t, normal, hits);
            }
        };
        report(-b - root);
        if root > 0.0 {
            report(-b + root);
        }
    }

    fn plane(&self, hits: &mut Vec<RayHit>) {
        let start = self.origin.z;
        let end = start + self.direction.z * self.length;
        if start * end > 0.0 || self.direction.z.abs() < PARALLEL_TOLERANCE {
            return;
        }
        self.report(-start / self.direction.z, Vec3::Z, hits);
    }

    fn convex(&self, hull: &ConvexPolyhedron, hits: &mut Vec<RayHit>) {
        let vertices = hull.vertices();
        for (face, &normal) in hull.faces().iter().zip(hull.face_normals()) {
            let along = normal.dot(self.direction);
            if along.abs() < PARALLEL_TOLERANCE {
                continue;
            }
            let t = normal.dot(vertices[face[0]] - self.origin) / along;
            if t < 0.0 || t > self.length {
                continue;
            }

            let point = self.origin + self.direction * t;
            let inside = face.windows(2).skip(1).any(|pair| {
                triangle_contains(&[vertices[face[0]], vertices[pair[0]], vertices[pair[1]]], point)
            });
            if inside {
                self.report(t, normal, hits);
            }
        }
    }

    fn heightfield(&self, field: &Heightfield, hits: &mut Vec<RayHit>) {
        let end = self.origin + self.direction * self.length;
        let bounds = Aabb::from_points([self.origin, end]);
        let w = field.element_size();
        let last_x = field.size_x() as i64 - 2;
        let last_y = field.size_y() as i64 - 2;

        let min_x = ((bounds.min.x / w).floor() as i64).max(0);
        let max_x = ((bounds.max.x / w).floor() as i64).min(last_x);
        let min_y = ((bounds.min.y / w).floor() as i64).max(0);
        let max_y = ((bounds.max.y / w).floor() as i64).min(last_y);
        if min_x > max_x || min_y > max_y {
            return;
        }

        for xi in min_x as usize..=max_x as usize {
            for yi in min_y as usize..=max_y as usize {
                for upper in [false, true] {
                    self.triangle(&field.triangle(xi, yi, upper), hits);
                }
            }
        }
    }

    fn trimesh(&self, mesh: &Trimesh, hits: &mut Vec<RayHit>) {
        let end = self.origin + self.direction * self.length;
        let mut nearby = Vec::new();
        mesh.triangles_in_aabb(Aabb::from_points([self.origin, end]), &mut nearby);
        for index in nearby {
            self.triangle(&mesh.triangle(index), hits);
        }
    }

    fn triangle(&self, tri: &[Vec3; 3], hits: &mut Vec<RayHit>) {
        let Some(t) = ray_triangle(self.origin, self.direction, tri, self.skip_backfaces) else {
            return;
        };
        if let Some(normal) = triangle_normal(tri) {
            self.report(t, normal, hits);
        }
    }
}
