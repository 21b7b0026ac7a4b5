use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Mat3, Transform, Vec3};

use super::aabb::Aabb;

/// Parallel-direction tolerance used when deduplicating edges and axes
const PARALLEL_EPSILON: f32 = 1e-6;

/// A point produced by clipping one hull face against another hull
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPoint {
    /// World position on the incident face
    pub point: Vec3,
    /// World normal of the reference face it was clipped against
    pub normal: Vec3,
    /// Signed distance to the reference face plane, `<= 0` when penetrating
    pub depth: f32,
}

/// A convex polyhedron given by vertices and polygonal faces.
///
/// Face normals are computed on construction and always point away from the
/// hull centroid, so face winding does not matter.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolyhedron {
    vertices: Vec<Vec3>,
    faces: Vec<Vec<usize>>,
    face_normals: Vec<Vec3>,
    unique_edges: Vec<Vec3>,
    unique_axes: Vec<Vec3>,
    bounding_radius: f32,
}

impl ConvexPolyhedron {
    /// Builds a hull, validating that every face index refers to a vertex.
    pub fn new(vertices: Vec<Vec3>, faces: Vec<Vec<usize>>) -> PhysicsResult<Self> {
        if vertices.len() < 4 {
            return Err(PhysicsError::InvalidConvexHull(format!(
                "a hull needs at least 4 vertices, got {}",
                vertices.len()
            )));
        }

        for (face_index, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(PhysicsError::InvalidConvexHull(format!(
                    "face {} has only {} vertices",
                    face_index,
                    face.len()
                )));
            }
            if let Some(&index) = face.iter().find(|&&i| i >= vertices.len()) {
                return Err(PhysicsError::InvalidShapeIndex {
                    face: face_index,
                    index,
                    vertex_count: vertices.len(),
                });
            }
        }

        let centroid = vertices.iter().fold(Vec3::ZERO, |acc, &v| acc + v) / vertices.len() as f32;

        let mut face_normals = Vec::with_capacity(faces.len());
        for (face_index, face) in faces.iter().enumerate() {
            let normal = newell_normal(&vertices, face).ok_or_else(|| {
                PhysicsError::InvalidConvexHull(format!("face {} is degenerate", face_index))
            })?;
            let face_center = face_center(&vertices, face);
            if normal.dot(face_center - centroid) < 0.0 {
                face_normals.push(-normal);
            } else {
                face_normals.push(normal);
            }
        }

        let mut unique_edges = Vec::new();
        for face in &faces {
            for k in 0..face.len() {
                let a = vertices[face[k]];
                let b = vertices[face[(k + 1) % face.len()]];
                if let Some(edge) = (b - a).try_normalize() {
                    push_unique_direction(&mut unique_edges, edge);
                }
            }
        }

        let mut unique_axes = Vec::new();
        for &normal in &face_normals {
            push_unique_direction(&mut unique_axes, normal);
        }

        let bounding_radius = vertices
            .iter()
            .map(|v| v.length())
            .fold(0.0_f32, f32::max);

        Ok(Self {
            vertices,
            faces,
            face_normals,
            unique_edges,
            unique_axes,
            bounding_radius,
        })
    }

    /// Cylinder (or truncated cone) along local Z, centred on the origin, with
    /// `segments` side faces.
    pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, segments: usize) -> PhysicsResult<Self> {
        if segments < 3 {
            return Err(PhysicsError::InvalidConvexHull(format!(
                "a cylinder needs at least 3 segments, got {}",
                segments
            )));
        }
        if !(radius_top > 0.0 && radius_bottom > 0.0 && height > 0.0) {
            return Err(PhysicsError::InvalidConvexHull(format!(
                "cylinder radii and height must be positive, got {}, {} and {}",
                radius_top, radius_bottom, height
            )));
        }

        // Bottom and top rim vertices alternate: 2i on the bottom, 2i + 1 on top
        let half = height * 0.5;
        let mut vertices = Vec::with_capacity(2 * segments);
        for i in 0..segments {
            let theta = 2.0 * std::f32::consts::PI * i as f32 / segments as f32;
            let (sin, cos) = theta.sin_cos();
            vertices.push(Vec3::new(radius_bottom * cos, radius_bottom * sin, -half));
            vertices.push(Vec3::new(radius_top * cos, radius_top * sin, half));
        }

        let mut faces: Vec<Vec<usize>> = (0..segments)
            .map(|i| {
                let next = (i + 1) % segments;
                vec![2 * next, 2 * next + 1, 2 * i + 1, 2 * i]
            })
            .collect();
        faces.push((0..segments).map(|i| 2 * i + 1).collect());
        faces.push((0..segments).rev().map(|i| 2 * i).collect());

        Self::new(vertices, faces)
    }

    /// Axis-aligned box hull centred on the origin
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let vertices = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let faces = vec![
            vec![3, 2, 1, 0], // -z
            vec![4, 5, 6, 7], // +z
            vec![5, 4, 0, 1], // -y
            vec![2, 3, 7, 6], // +y
            vec![0, 4, 7, 3], // -x
            vec![1, 2, 6, 5], // +x
        ];
        let normals = vec![-Vec3::Z, Vec3::Z, -Vec3::Y, Vec3::Y, -Vec3::X, Vec3::X];
        let edges = vec![Vec3::X, Vec3::Y, Vec3::Z];

        Self {
            bounding_radius: h.length(),
            vertices,
            faces,
            face_normals: normals,
            unique_edges: edges.clone(),
            unique_axes: edges,
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    #[inline]
    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    #[inline]
    pub fn face_normals(&self) -> &[Vec3] {
        &self.face_normals
    }

    #[inline]
    pub fn unique_edges(&self) -> &[Vec3] {
        &self.unique_edges
    }

    /// Radius of the sphere around the local origin enclosing all vertices
    #[inline]
    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    pub fn local_aabb(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().copied())
    }

    pub fn world_aabb(&self, transform: &Transform) -> Aabb {
        Aabb::from_points(self.vertices.iter().map(|&v| transform.transform_point(v)))
    }

    /// Enclosed volume, summed over tetrahedra fanned from the centroid
    pub fn volume(&self) -> f32 {
        let centroid =
            self.vertices.iter().fold(Vec3::ZERO, |acc, &v| acc + v) / self.vertices.len() as f32;
        let mut volume = 0.0;
        for face in &self.faces {
            let a = self.vertices[face[0]] - centroid;
            for k in 1..face.len() - 1 {
                let b = self.vertices[face[k]] - centroid;
                let c = self.vertices[face[k + 1]] - centroid;
                volume += a.dot(b.cross(c)).abs() / 6.0;
            }
        }
        volume
    }

    /// Inertia approximated by the solid box spanning the local AABB
    pub fn inertia_tensor(&self, mass: f32) -> Mat3 {
        let size = self.local_aabb().size();
        Mat3::from_diagonal(box_inertia(size * 0.5, mass))
    }

    /// Projects the posed hull onto a world axis, returning `(min, max)`
    pub fn project(&self, axis: Vec3, transform: &Transform) -> (f32, f32) {
        let local_axis = transform.inverse_transform_vector(axis);
        let offset = transform.position.dot(axis);

        let mut min = f32::MAX;
        let mut max = -f32::MAX;
        for v in &self.vertices {
            let d = v.dot(local_axis);
            min = min.min(d);
            max = max.max(d);
        }
        (min + offset, max + offset)
    }

    /// Overlap of both hulls along `axis`, or `None` if the axis separates them
    pub fn test_sep_axis(
        &self,
        axis: Vec3,
        other: &ConvexPolyhedron,
        transform_a: &Transform,
        transform_b: &Transform,
    ) -> Option<f32> {
        let (min_a, max_a) = self.project(axis, transform_a);
        let (min_b, max_b) = other.project(axis, transform_b);

        if max_a < min_b || max_b < min_a {
            return None;
        }

        let d0 = max_a - min_b;
        let d1 = max_b - min_a;
        Some(d0.min(d1))
    }

    /// Finds the axis of least penetration between two posed hulls.
    ///
    /// Tests the face normals of both hulls and the cross products of their edges.
    /// Returns `None` as soon as a separating axis is found. The returned axis points
    /// from `other` towards `self`.
    pub fn find_separating_axis(
        &self,
        transform_a: &Transform,
        other: &ConvexPolyhedron,
        transform_b: &Transform,
    ) -> Option<Vec3> {
        let mut best_depth = f32::MAX;
        let mut best_axis = Vec3::ZERO;

        let mut consider = |axis: Vec3| -> Option<()> {
            let depth = self.test_sep_axis(axis, other, transform_a, transform_b)?;
            if depth < best_depth {
                best_depth = depth;
                best_axis = axis;
            }
            Some(())
        };

        for &normal in &self.unique_axes {
            consider(transform_a.transform_vector(normal))?;
        }
        for &normal in &other.unique_axes {
            consider(transform_b.transform_vector(normal))?;
        }

        for &edge_a in &self.unique_edges {
            let world_a = transform_a.transform_vector(edge_a);
            for &edge_b in &other.unique_edges {
                let world_b = transform_b.transform_vector(edge_b);
                if let Some(axis) = world_a.cross(world_b).try_normalize() {
                    consider(axis)?;
                }
            }
        }

        if best_axis == Vec3::ZERO {
            return None;
        }

        if (transform_b.position - transform_a.position).dot(best_axis) > 0.0 {
            best_axis = -best_axis;
        }
        Some(best_axis)
    }

    /// Clips the face of `other` most aligned with `sep_normal` against this hull.
    ///
    /// `sep_normal` must point from `other` towards `self`, as returned by
    /// [`find_separating_axis`](Self::find_separating_axis).
    pub fn clip_against_hull(
        &self,
        transform_a: &Transform,
        other: &ConvexPolyhedron,
        transform_b: &Transform,
        sep_normal: Vec3,
        min_dist: f32,
        max_dist: f32,
    ) -> Vec<ClipPoint> {
        let incident = other
            .face_normals
            .iter()
            .enumerate()
            .map(|(i, &n)| (i, transform_b.transform_vector(n).dot(sep_normal)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);

        let Some(incident) = incident else {
            return Vec::new();
        };

        let world_face: Vec<Vec3> = other.faces[incident]
            .iter()
            .map(|&i| transform_b.transform_point(other.vertices[i]))
            .collect();

        self.clip_face_against_hull(sep_normal, transform_a, &world_face, min_dist, max_dist)
    }

    /// Clips a world-space polygon against the side planes of this hull's reference
    /// face (the face most opposed to `sep_normal`) and keeps the points behind it.
    pub fn clip_face_against_hull(
        &self,
        sep_normal: Vec3,
        transform_a: &Transform,
        world_face: &[Vec3],
        min_dist: f32,
        max_dist: f32,
    ) -> Vec<ClipPoint> {
        let reference = self
            .face_normals
            .iter()
            .enumerate()
            .map(|(i, &n)| (i, transform_a.transform_vector(n).dot(sep_normal)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);

        let Some(reference) = reference else {
            return Vec::new();
        };

        let ref_normal = transform_a.transform_vector(self.face_normals[reference]);
        let ref_polygon: Vec<Vec3> = self.faces[reference]
            .iter()
            .map(|&i| transform_a.transform_point(self.vertices[i]))
            .collect();
        let ref_center = ref_polygon.iter().fold(Vec3::ZERO, |acc, &v| acc + v) / ref_polygon.len() as f32;

        let mut polygon = world_face.to_vec();
        for k in 0..ref_polygon.len() {
            let a = ref_polygon[k];
            let b = ref_polygon[(k + 1) % ref_polygon.len()];
            let Some(mut side_normal) = (b - a).cross(ref_normal).try_normalize() else {
                continue;
            };
            if side_normal.dot(ref_center - a) > 0.0 {
                side_normal = -side_normal;
            }
            polygon = clip_face_against_plane(&polygon, side_normal, -side_normal.dot(a));
            if polygon.is_empty() {
                return Vec::new();
            }
        }

        let ref_constant = ref_normal.dot(ref_polygon[0]);
        polygon
            .into_iter()
            .filter_map(|point| {
                let depth = (ref_normal.dot(point) - ref_constant).max(min_dist);
                (depth <= max_dist && depth <= 0.0).then_some(ClipPoint {
                    point,
                    normal: ref_normal,
                    depth,
                })
            })
            .collect()
    }
}

/// Sutherland-Hodgman clip of a polygon, keeping the part where
/// `plane_normal · p + plane_constant < 0`.
pub fn clip_face_against_plane(polygon: &[Vec3], plane_normal: Vec3, plane_constant: f32) -> Vec<Vec3> {
    let Some(&last) = polygon.last() else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(polygon.len() + 1);
    let mut first = last;
    let mut dist_first = plane_normal.dot(first) + plane_constant;

    for &next in polygon {
        let dist_next = plane_normal.dot(next) + plane_constant;
        if dist_first < 0.0 {
            if dist_next < 0.0 {
                out.push(next);
            } else {
                out.push(first.lerp(next, dist_first / (dist_first - dist_next)));
            }
        } else if dist_next < 0.0 {
            out.push(first.lerp(next, dist_first / (dist_first - dist_next)));
            out.push(next);
        }
        first = next;
        dist_first = dist_next;
    }
    out
}

/// True if `point` lies inside the convex polygon `vertices` with face normal `normal`
pub fn point_in_polygon(vertices: &[Vec3], normal: Vec3, point: Vec3) -> bool {
    let mut side: Option<bool> = None;
    for k in 0..vertices.len() {
        let v = vertices[k];
        let edge = vertices[(k + 1) % vertices.len()] - v;
        let r = edge.cross(normal).dot(point - v);
        match side {
            None => side = Some(r > 0.0),
            Some(positive) if positive == (r > 0.0) => {}
            Some(_) => return false,
        }
    }
    true
}

/// Principal moments of a solid box with the given half extents
pub(crate) fn box_inertia(half_extents: Vec3, mass: f32) -> Vec3 {
    let e = half_extents * 2.0;
    Vec3::new(
        mass / 12.0 * (e.y * e.y + e.z * e.z),
        mass / 12.0 * (e.x * e.x + e.z * e.z),
        mass / 12.0 * (e.x * e.x + e.y * e.y),
    )
}

fn newell_normal(vertices: &[Vec3], face: &[usize]) -> Option<Vec3> {
    let mut normal = Vec3::ZERO;
    for k in 0..face.len() {
        let a = vertices[face[k]];
        let b = vertices[face[(k + 1) % face.len()]];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal.try_normalize()
}

fn face_center(vertices: &[Vec3], face: &[usize]) -> Vec3 {
    face.iter().fold(Vec3::ZERO, |acc, &i| acc + vertices[i]) / face.len() as f32
}

fn push_unique_direction(directions: &mut Vec<Vec3>, candidate: Vec3) {
    let parallel = directions
        .iter()
        .any(|d| d.dot(candidate).abs() > 1.0 - PARALLEL_EPSILON);
    if !parallel {
        directions.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quat;
    use std::f32::consts::PI;

    const EPSILON: f32 = 1e-4;

    fn tetrahedron() -> ConvexPolyhedron {
        ConvexPolyhedron::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            vec![vec![0, 2, 1], vec![0, 1, 3], vec![0, 3, 2], vec![1, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_cylinder() {
        let cylinder = ConvexPolyhedron::cylinder(1.0, 1.0, 2.0, 32).unwrap();
        assert_eq!(cylinder.vertices().len(), 64);
        assert_eq!(cylinder.faces().len(), 34);
        assert!(cylinder.face_normals()[32].almost_equals(Vec3::Z, 1e-5));
        assert!(cylinder.face_normals()[33].almost_equals(-Vec3::Z, 1e-5));

        // A 32-gon prism holds a bit less than the round cylinder
        let volume = cylinder.volume();
        assert!(volume < 2.0 * PI && volume > 0.98 * 2.0 * PI, "volume = {}", volume);

        let aabb = cylinder.local_aabb();
        assert!((aabb.max.z - 1.0).abs() < EPSILON && (aabb.min.z + 1.0).abs() < EPSILON);
        assert!((aabb.max.x - 1.0).abs() < EPSILON);

        assert!(ConvexPolyhedron::cylinder(1.0, 1.0, 2.0, 2).is_err());
        assert!(ConvexPolyhedron::cylinder(0.0, 1.0, 2.0, 8).is_err());
    }

    #[test]
    fn test_invalid_face_index_is_reported() {
        let err = ConvexPolyhedron::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            vec![vec![0, 1, 2], vec![0, 1, 7]],
        )
        .unwrap_err();

        match err {
            PhysicsError::InvalidShapeIndex { face, index, vertex_count } => {
                assert_eq!((face, index, vertex_count), (1, 7, 4));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_normals_point_outward_regardless_of_winding() {
        let hull = tetrahedron();
        let centroid = Vec3::splat(0.25);
        for (face, normal) in hull.faces().iter().zip(hull.face_normals()) {
            let on_face = hull.vertices()[face[0]];
            assert!(normal.dot(on_face - centroid) > 0.0);
        }
        // The slanted face normal is (1,1,1)/sqrt(3)
        assert!(hull.face_normals()[3].almost_equals(Vec3::ONE.normalize(), EPSILON));
    }

    #[test]
    fn test_volume() {
        assert!((tetrahedron().volume() - 1.0 / 6.0).abs() < EPSILON);
        assert!((ConvexPolyhedron::cuboid(Vec3::new(1.0, 2.0, 3.0)).volume() - 48.0).abs() < EPSILON);
    }

    #[test]
    fn test_separating_axis_for_stacked_boxes() {
        let hull = ConvexPolyhedron::cuboid(Vec3::ONE);
        let lower = Transform::IDENTITY;
        let upper = Transform::from_position(Vec3::new(0.0, 0.0, 1.9));

        let axis = hull.find_separating_axis(&upper, &hull, &lower).unwrap();
        // Points from the lower box towards the upper one
        assert!(axis.almost_equals(Vec3::Z, EPSILON), "axis = {:?}", axis);

        let apart = Transform::from_position(Vec3::new(0.0, 0.0, 2.1));
        assert!(hull.find_separating_axis(&apart, &hull, &lower).is_none());
    }

    #[test]
    fn test_clip_face_against_hull_produces_four_corners() {
        let hull = ConvexPolyhedron::cuboid(Vec3::ONE);
        let a = Transform::IDENTITY;
        let b = Transform::new(Vec3::new(0.0, 0.0, 1.9), Quat::from_axis_angle(Vec3::Z, PI / 4.0));

        let axis = hull.find_separating_axis(&a, &hull, &b).unwrap();
        assert!(axis.almost_equals(-Vec3::Z, EPSILON));

        let points = hull.clip_against_hull(&a, &hull, &b, axis, -100.0, 100.0);
        // The rotated bottom face of B clipped by the square top face of A is an octagon
        assert_eq!(points.len(), 8);
        for p in &points {
            assert!((p.depth + 0.1).abs() < EPSILON);
            assert!(p.normal.almost_equals(Vec3::Z, EPSILON));
            assert!(p.point.x.abs() <= 1.0 + EPSILON && p.point.y.abs() <= 1.0 + EPSILON);
        }
    }

    #[test]
    fn test_clip_face_against_plane() {
        let square = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        // Keep x < 0.5
        let clipped = clip_face_against_plane(&square, Vec3::X, -0.5);
        assert_eq!(clipped.len(), 4);
        assert!(clipped.iter().all(|p| p.x <= 0.5 + EPSILON));

        assert!(clip_face_against_plane(&square, Vec3::X, 2.0).is_empty());
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        assert!(point_in_polygon(&square, Vec3::Z, Vec3::new(0.2, -0.3, 5.0)));
        assert!(!point_in_polygon(&square, Vec3::Z, Vec3::new(1.5, 0.0, 0.0)));
    }
}
