use crate::collision::contact::{ContactManifold, ContactPoint};
use crate::geometry::{closest_point_on_triangle, Aabb, Shape, TriangleFeature};
use crate::math::{Transform, Vec3};

/// A closest point on one edge or vertex that also lies on a nearer triangle is hidden by it
const SHARED_FEATURE_DISTANCE: f32 = 1e-5;

/// Contacts closer than this to an earlier one are dropped
const DUPLICATE_DISTANCE_SQ: f32 = 1e-8;

struct Candidate {
    point: Vec3,
    out: Vec3,
    dist: f32,
    triangle: usize,
    on_face: bool,
}

/// Sphere A against the triangles of mesh B.
///
/// Triangles are two-sided. An edge or vertex hit is dropped when a closer
/// triangle contains the same point, so seams between coplanar triangles stay
/// invisible.
pub fn sphere_trimesh(
    a: &Shape,
    ta: &Transform,
    b: &Shape,
    tb: &Transform,
    manifold: &mut ContactManifold,
) {
    let (Shape::Sphere(sphere), Shape::Trimesh(mesh)) = (a, b) else {
        return;
    };
    let radius = sphere.radius;
    let center = tb.inverse_transform_point(ta.position);

    let mut nearby = Vec::new();
    mesh.triangles_in_aabb(Aabb::from_center_half_extents(center, Vec3::splat(radius)), &mut nearby);

    let mut candidates = Vec::with_capacity(nearby.len());
    for index in nearby {
        let normal = mesh.normal(index);
        if normal == Vec3::ZERO {
            continue;
        }
        let tri = mesh.triangle(index);
        let (point, feature) = closest_point_on_triangle(&tri, center);
        let (out, dist) = match (center - point).normalize_with_length() {
            Some(found) => found,
            None => (normal, 0.0),
        };
        if dist >= radius {
            continue;
        }
        candidates.push(Candidate {
            point,
            out,
            dist,
            triangle: index,
            on_face: feature == TriangleFeature::Face,
        });
    }

    let start = manifold.len();
    for candidate in &candidates {
        if !candidate.on_face {
            let hidden = candidates.iter().any(|other| {
                other.triangle != candidate.triangle
                    && other.dist < candidate.dist - SHARED_FEATURE_DISTANCE
                    && closest_point_on_triangle(&mesh.triangle(other.triangle), candidate.point)
                        .0
                        .distance(candidate.point)
                        < SHARED_FEATURE_DISTANCE
            });
            if hidden {
                continue;
            }
        }

        let point_b = tb.transform_point(candidate.point);
        let duplicate = manifold.points()[start..]
            .iter()
            .any(|p| p.point_b.distance_squared(point_b) < DUPLICATE_DISTANCE_SQ);
        if duplicate {
            continue;
        }

        let normal = -tb.rotation.rotate_vec(candidate.out);
        manifold.add_point(ContactPoint::new(
            normal,
            ta.position + normal * radius,
            point_b,
            radius - candidate.dist,
        ));
    }
}

/// Plane A against every vertex of mesh B that lies below it
pub fn plane_trimesh(
    _a: &Shape,
    ta: &Transform,
    b: &Shape,
    tb: &Transform,
    manifold: &mut ContactManifold,
) {
    let Shape::Trimesh(mesh) = b else {
        return;
    };
    let normal = ta.rotation.rotate_vec(Vec3::Z);

    for &local in mesh.vertices() {
        let vertex = tb.transform_point(local);
        let dist = (vertex - ta.position).dot(normal);
        if dist <= 0.0 {
            manifold.add_point(ContactPoint::new(normal, vertex - normal * dist, vertex, -dist));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Shape {
        let vertices = vec![
            Vec3::new(-2.0, -2.0, 0.0),
            Vec3::new(2.0, -2.0, 0.0),
            Vec3::new(2.0, 2.0, 0.0),
            Vec3::new(-2.0, 2.0, 0.0),
        ];
        Shape::trimesh(vertices, vec![0, 1, 2, 0, 2, 3]).unwrap()
    }

    #[test]
    fn test_sphere_over_diagonal_gets_one_contact() {
        let mut manifold = ContactManifold::new();
        sphere_trimesh(
            &Shape::sphere(0.5),
            &Transform::from_position(Vec3::new(0.05, 0.0, 0.45)),
            &quad(),
            &Transform::IDENTITY,
            &mut manifold,
        );

        assert_eq!(manifold.len(), 1);
        let contact = manifold.points()[0];
        assert!(contact.normal.almost_equals(-Vec3::Z, 1e-5));
        assert!(contact.point_b.almost_equals(Vec3::new(0.05, 0.0, 0.0), 1e-5));
        assert!((contact.depth - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_beside_mesh_touches_edge() {
        let mut manifold = ContactManifold::new();
        sphere_trimesh(
            &Shape::sphere(0.5),
            &Transform::from_position(Vec3::new(2.3, 0.5, 0.0)),
            &quad(),
            &Transform::IDENTITY,
            &mut manifold,
        );

        assert_eq!(manifold.len(), 1);
        let contact = manifold.points()[0];
        assert!(contact.normal.almost_equals(-Vec3::X, 1e-5));
        assert!(contact.point_b.almost_equals(Vec3::new(2.0, 0.5, 0.0), 1e-5));
        assert!((contact.depth - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_mesh_is_two_sided() {
        let mut manifold = ContactManifold::new();
        sphere_trimesh(
            &Shape::sphere(0.5),
            &Transform::from_position(Vec3::new(1.0, -1.0, -0.4)),
            &quad(),
            &Transform::IDENTITY,
            &mut manifold,
        );

        assert_eq!(manifold.len(), 1);
        assert!(manifold.points()[0].normal.almost_equals(Vec3::Z, 1e-5));
    }

    #[test]
    fn test_sphere_far_from_mesh() {
        let mut manifold = ContactManifold::new();
        sphere_trimesh(
            &Shape::sphere(0.5),
            &Transform::from_position(Vec3::new(0.0, 0.0, 2.0)),
            &quad(),
            &Transform::IDENTITY,
            &mut manifold,
        );
        assert!(manifold.is_empty());
    }

    #[test]
    fn test_plane_against_mesh_vertices() {
        let mesh = Shape::trimesh(
            vec![Vec3::new(0.0, 0.0, -0.2), Vec3::new(1.0, 0.0, 0.3), Vec3::new(0.0, 1.0, -0.1)],
            vec![0, 1, 2],
        )
        .unwrap();

        let mut manifold = ContactManifold::new();
        plane_trimesh(&Shape::plane(), &Transform::IDENTITY, &mesh, &Transform::IDENTITY, &mut manifold);

        assert_eq!(manifold.len(), 2);
        let deepest = manifold.points()[0];
        assert_eq!(deepest.normal, Vec3::Z);
        assert!((deepest.depth - 0.2).abs() < 1e-6);
        assert!(deepest.point_a.almost_equals(Vec3::ZERO, 1e-6));
        assert!((manifold.points()[1].depth - 0.1).abs() < 1e-6);
    }
}
