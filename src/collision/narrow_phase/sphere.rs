use crate::collision::contact::{ContactManifold, ContactPoint};
use crate::geometry::{point_in_polygon, ConvexPolyhedron, Shape};
use crate::math::{consts::EPSILON, Transform, Vec3};

fn radius_of(shape: &Shape) -> f32 {
    match shape {
        Shape::Sphere(sphere) => sphere.radius,
        _ => 0.0,
    }
}

pub fn sphere_sphere(
    a: &Shape,
    ta: &Transform,
    b: &Shape,
    tb: &Transform,
    manifold: &mut ContactManifold,
) {
    let (ra, rb) = (radius_of(a), radius_of(b));
    let delta = tb.position - ta.position;
    let dist = delta.length();
    if dist >= ra + rb || dist < EPSILON {
        return;
    }

    let normal = delta / dist;
    manifold.add_point(ContactPoint::new(
        normal,
        ta.position + normal * ra,
        tb.position - normal * rb,
        ra + rb - dist,
    ));
}

/// Sphere A against the half-space of plane B
pub fn sphere_plane(
    a: &Shape,
    ta: &Transform,
    _b: &Shape,
    tb: &Transform,
    manifold: &mut ContactManifold,
) {
    let radius = radius_of(a);
    let plane_normal = tb.rotation.rotate_vec(Vec3::Z);
    let dist = (ta.position - tb.position).dot(plane_normal);
    if dist > radius {
        return;
    }

    manifold.add_point(ContactPoint::new(
        -plane_normal,
        ta.position - plane_normal * radius,
        ta.position - plane_normal * dist,
        radius - dist,
    ));
}

pub fn sphere_convex(
    a: &Shape,
    ta: &Transform,
    b: &Shape,
    tb: &Transform,
    manifold: &mut ContactManifold,
) {
    if let Some(hull) = b.as_convex() {
        sphere_hull(radius_of(a), ta.position, hull, tb, manifold);
    }
}

/// Sphere at `center` against a posed hull. Vertices are tried first, then faces,
/// then the edges of the faces the center lies above. Emits at most one contact.
pub(crate) fn sphere_hull(
    radius: f32,
    center: Vec3,
    hull: &ConvexPolyhedron,
    th: &Transform,
    manifold: &mut ContactManifold,
) {
    let world_vertices: Vec<Vec3> = hull.vertices().iter().map(|&v| th.transform_point(v)).collect();

    for &vertex in &world_vertices {
        let to_vertex = vertex - center;
        if to_vertex.length_squared() < radius * radius {
            let Some((normal, dist)) = to_vertex.normalize_with_length() else {
                continue;
            };
            manifold.add_point(ContactPoint::new(normal, center + normal * radius, vertex, radius - dist));
            return;
        }
    }

    for (face, &local_normal) in hull.faces().iter().zip(hull.face_normals()) {
        let normal = th.transform_vector(local_normal);
        let v0 = world_vertices[face[0]];

        let penetration = (center - normal * radius - v0).dot(normal);
        if penetration >= 0.0 || (center - v0).dot(normal) <= 0.0 {
            continue;
        }

        let polygon: Vec<Vec3> = face.iter().map(|&i| world_vertices[i]).collect();
        if point_in_polygon(&polygon, normal, center) {
            let point_a = center - normal * radius;
            manifold.add_point(ContactPoint::new(
                -normal,
                point_a,
                point_a - normal * penetration,
                -penetration,
            ));
            return;
        }

        for (k, &start) in polygon.iter().enumerate() {
            let end = polygon[(k + 1) % polygon.len()];
            let closest = closest_point_on_segment(start, end, center);
            let to_edge = closest - center;
            if to_edge.length_squared() < radius * radius {
                let Some((normal, dist)) = to_edge.normalize_with_length() else {
                    continue;
                };
                manifold.add_point(ContactPoint::new(normal, center + normal * radius, closest, radius - dist));
                return;
            }
        }
    }
}

fn closest_point_on_segment(start: Vec3, end: Vec3, point: Vec3) -> Vec3 {
    let edge = end - start;
    let len_sq = edge.length_squared();
    if len_sq < EPSILON * EPSILON {
        return start;
    }
    let t = ((point - start).dot(edge) / len_sq).clamp(0.0, 1.0);
    start + edge * t
}
