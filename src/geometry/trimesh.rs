use std::f32::consts::PI;

use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Transform, Vec3};

use super::aabb::Aabb;
use super::convex::box_inertia;
use super::octree::{Octree, OctreeConfig};
use super::triangle::triangle_normal;

/// A triangle soup, used for static level geometry.
///
/// Triangles are counter-clockwise seen from the side their normal points to.
/// An octree over the triangle boxes narrows down contact and ray queries.
#[derive(Debug, Clone)]
pub struct Trimesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[usize; 3]>,
    normals: Vec<Vec3>,
    local_aabb: Aabb,
    bounding_radius: f32,
    tree: Octree<usize>,
}

impl PartialEq for Trimesh {
    fn eq(&self, other: &Self) -> bool {
        self.vertices == other.vertices && self.triangles == other.triangles
    }
}

impl Trimesh {
    /// Builds a mesh from vertices and a flat index list, three indices per triangle
    pub fn new(vertices: Vec<Vec3>, indices: Vec<usize>) -> PhysicsResult<Self> {
        if indices.is_empty() || indices.len() % 3 != 0 {
            return Err(PhysicsError::InvalidTrimesh(format!(
                "index count must be a positive multiple of 3, got {}",
                indices.len()
            )));
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(PhysicsError::InvalidTrimesh("vertices must be finite".into()));
        }
        if let Some(position) = indices.iter().position(|&i| i >= vertices.len()) {
            return Err(PhysicsError::InvalidShapeIndex {
                face: position / 3,
                index: indices[position],
                vertex_count: vertices.len(),
            });
        }

        let triangles: Vec<[usize; 3]> = indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();
        let local_aabb = Aabb::from_points(vertices.iter().copied());
        let bounding_radius = vertices.iter().map(|v| v.length()).fold(0.0_f32, f32::max);

        let mut mesh = Self {
            vertices,
            triangles,
            normals: Vec::new(),
            local_aabb,
            bounding_radius,
            tree: Octree::new(local_aabb, OctreeConfig::default()),
        };
        mesh.normals = (0..mesh.triangles.len())
            .map(|i| triangle_normal(&mesh.triangle(i)).unwrap_or(Vec3::ZERO))
            .collect();
        for i in 0..mesh.triangles.len() {
            let aabb = Aabb::from_points(mesh.triangle(i));
            mesh.tree.insert(aabb, i);
        }
        Ok(mesh)
    }

    /// A torus around the local Z axis.
    ///
    /// `arc` below `2π` leaves the ring open.
    pub fn torus(radius: f32, tube: f32, radial_segments: usize, tubular_segments: usize, arc: f32) -> PhysicsResult<Self> {
        if radial_segments < 3 || tubular_segments < 3 {
            return Err(PhysicsError::InvalidTrimesh(format!(
                "a torus needs at least 3 segments each way, got {}x{}",
                radial_segments, tubular_segments
            )));
        }

        let mut vertices = Vec::with_capacity((radial_segments + 1) * (tubular_segments + 1));
        for j in 0..=radial_segments {
            for i in 0..=tubular_segments {
                let u = i as f32 / tubular_segments as f32 * arc;
                let v = j as f32 / radial_segments as f32 * PI * 2.0;
                let ring = radius + tube * v.cos();
                vertices.push(Vec3::new(ring * u.cos(), ring * u.sin(), tube * v.sin()));
            }
        }

        let row = tubular_segments + 1;
        let mut indices = Vec::with_capacity(radial_segments * tubular_segments * 6);
        for j in 1..=radial_segments {
            for i in 1..=tubular_segments {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        Self::new(vertices, indices)
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    #[inline]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Flat index list, three per triangle
    pub fn indices(&self) -> Vec<usize> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Corner positions of triangle `index`
    #[inline]
    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[index];
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// Unit normal of triangle `index`; zero for degenerate triangles
    #[inline]
    pub fn normal(&self, index: usize) -> Vec3 {
        self.normals[index]
    }

    /// Appends the triangles whose boxes overlap the local box `aabb`
    pub fn triangles_in_aabb(&self, aabb: Aabb, result: &mut Vec<usize>) {
        self.tree.aabb_query(aabb, result);
    }

    #[inline]
    pub fn local_aabb(&self) -> Aabb {
        self.local_aabb
    }

    pub fn world_aabb(&self, transform: &Transform) -> Aabb {
        self.local_aabb.to_world_frame(transform)
    }

    #[inline]
    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    /// Volume of the local bounding box; a triangle soup encloses no volume of its own
    pub fn volume(&self) -> f32 {
        let size = self.local_aabb.size();
        size.x * size.y * size.z
    }

    /// Principal moments of the solid bounding box for the given mass
    pub fn local_inertia(&self, mass: f32) -> Vec3 {
        box_inertia(self.local_aabb.half_extents(), mass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Trimesh {
        let vertices = vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        Trimesh::new(vertices, vec![0, 1, 2, 0, 2, 3]).unwrap()
    }

    #[test]
    fn test_rejects_bad_indices() {
        let vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        assert!(matches!(
            Trimesh::new(vertices.clone(), vec![0, 1]),
            Err(PhysicsError::InvalidTrimesh(_))
        ));
        assert!(matches!(
            Trimesh::new(vertices.clone(), vec![]),
            Err(PhysicsError::InvalidTrimesh(_))
        ));
        assert!(matches!(
            Trimesh::new(vertices, vec![0, 1, 2, 2, 1, 7]),
            Err(PhysicsError::InvalidShapeIndex { face: 1, index: 7, vertex_count: 3 })
        ));
    }

    #[test]
    fn test_normals_and_bounds() {
        let mesh = quad();
        assert_eq!(mesh.triangles().len(), 2);
        assert!(mesh.normal(0).almost_equals(Vec3::Z, 1e-6));
        assert!(mesh.normal(1).almost_equals(Vec3::Z, 1e-6));
        assert!((mesh.bounding_radius() - 2.0f32.sqrt()).abs() < 1e-6);
        assert_eq!(mesh.local_aabb(), Aabb::new(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 0.0)));
        assert_eq!(mesh.indices(), vec![0, 1, 2, 0, 2, 3]);

        let moved = mesh.world_aabb(&Transform::from_position(Vec3::new(0.0, 0.0, 3.0)));
        assert_eq!(moved.min.z, 3.0);
        assert_eq!(moved.max.x, 1.0);
    }

    #[test]
    fn test_triangle_query() {
        let vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(3.0, 1.0, 0.0),
        ];
        let mesh = Trimesh::new(vertices, vec![0, 1, 2, 3, 4, 5]).unwrap();

        let mut found = Vec::new();
        mesh.triangles_in_aabb(Aabb::from_center_half_extents(Vec3::new(3.5, 0.2, 0.0), Vec3::splat(0.1)), &mut found);
        assert_eq!(found, vec![1]);

        found.clear();
        mesh.triangles_in_aabb(Aabb::from_center_half_extents(Vec3::new(2.0, 0.5, 0.0), Vec3::splat(0.1)), &mut found);
        assert!(found.is_empty());
    }

    #[test]
    fn test_torus() {
        let torus = Trimesh::torus(1.0, 0.25, 8, 12, 2.0 * PI).unwrap();
        assert_eq!(torus.vertices().len(), 9 * 13);
        assert_eq!(torus.triangles().len(), 8 * 12 * 2);
        assert!((torus.bounding_radius() - 1.25).abs() < 1e-4);
        assert!((torus.local_aabb().max.z - 0.25).abs() < 1e-3);
        assert!(Trimesh::torus(1.0, 0.25, 2, 12, PI).is_err());
    }
}
