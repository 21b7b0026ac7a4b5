use crate::collision::contact::{ContactManifold, ContactPoint};
use crate::geometry::{closest_point_on_triangle, triangle_normal, ConvexPolyhedron, Heightfield, Shape, TriangleFeature};
use crate::math::{Transform, Vec3};

use super::convex::hull_hull;

/// Normals closer than this are treated as one flat surface
const COPLANAR_DOT: f32 = 1.0 - 1e-6;

/// Contacts closer than this to an earlier one are dropped
const DUPLICATE_DISTANCE_SQ: f32 = 1e-8;

/// Sphere A against the surface triangles of heightfield B.
///
/// Edges and vertices inside a flat patch are skipped so that a sphere resting on
/// a level grid only sees the face below it.
pub fn sphere_heightfield(
    a: &Shape,
    ta: &Transform,
    b: &Shape,
    tb: &Transform,
    manifold: &mut ContactManifold,
) {
    let (Shape::Sphere(sphere), Shape::Heightfield(field)) = (a, b) else {
        return;
    };
    let radius = sphere.radius;
    let center = tb.inverse_transform_point(ta.position);
    let Some((min_x, min_y, max_x, max_y)) = cell_range(field, center, radius) else {
        return;
    };

    let start = manifold.len();
    for xi in min_x..max_x {
        for yi in min_y..max_y {
            for upper in [false, true] {
                let tri = field.triangle(xi, yi, upper);
                let Some(normal) = triangle_normal(&tri) else {
                    continue;
                };
                let height = (center - tri[0]).dot(normal);
                let (closest, feature) = closest_point_on_triangle(&tri, center);

                let (out, depth) = match feature {
                    TriangleFeature::Face => {
                        if height >= radius || height <= -radius {
                            continue;
                        }
                        (normal, radius - height)
                    }
                    TriangleFeature::Edge(_) | TriangleFeature::Vertex(_) => {
                        let flat = match feature {
                            TriangleFeature::Edge(edge) => flat_across_edge(field, xi, yi, upper, edge, normal),
                            TriangleFeature::Vertex(k) => flat_around_vertex(field, xi, yi, upper, k, normal),
                            TriangleFeature::Face => false,
                        };
                        if height < 0.0 || flat {
                            continue;
                        }
                        match (center - closest).normalize_with_length() {
                            Some((out, dist)) if dist < radius => (out, radius - dist),
                            _ => continue,
                        }
                    }
                };

                let point_b = tb.transform_point(closest);
                let duplicate = manifold.points()[start..]
                    .iter()
                    .any(|p| p.point_b.distance_squared(point_b) < DUPLICATE_DISTANCE_SQ);
                if duplicate {
                    continue;
                }

                let normal = -tb.rotation.rotate_vec(out);
                manifold.add_point(ContactPoint::new(
                    normal,
                    ta.position + normal * radius,
                    point_b,
                    depth,
                ));
            }
        }
    }
}

fn flat_across_edge(field: &Heightfield, xi: usize, yi: usize, upper: bool, edge: usize, normal: Vec3) -> bool {
    field
        .edge_neighbour(xi, yi, upper, edge)
        .and_then(|(nx, ny, nu)| triangle_normal(&field.triangle(nx, ny, nu)))
        .is_some_and(|other| other.dot(normal) > COPLANAR_DOT)
}

fn flat_around_vertex(field: &Heightfield, xi: usize, yi: usize, upper: bool, k: usize, normal: Vec3) -> bool {
    let (i, j) = Heightfield::triangle_vertex_index(xi, yi, upper, k);
    field.triangles_around(i, j).is_some_and(|around| {
        around.iter().all(|&(nx, ny, nu)| {
            triangle_normal(&field.triangle(nx, ny, nu)).is_some_and(|other| other.dot(normal) > COPLANAR_DOT)
        })
    })
}

pub fn convex_heightfield(
    a: &Shape,
    ta: &Transform,
    b: &Shape,
    tb: &Transform,
    manifold: &mut ContactManifold,
) {
    let (Some(hull), Shape::Heightfield(field)) = (a.as_convex(), b) else {
        return;
    };
    for_each_pillar(field, tb, ta.position, hull.bounding_radius(), |pillar, pillar_transform| {
        hull_hull(hull, ta, pillar, pillar_transform, manifold);
    });
}

/// Cells (as half-open index ranges) that a sphere of `radius` around the local
/// point `center` may touch, or `None` when it misses the grid or its height span.
fn cell_range(field: &Heightfield, center: Vec3, radius: f32) -> Option<(usize, usize, usize, usize)> {
    let w = field.element_size();

    let min_x = ((center.x - radius) / w).floor() as i64 - 1;
    let max_x = ((center.x + radius) / w).ceil() as i64 + 1;
    let min_y = ((center.y - radius) / w).floor() as i64 - 1;
    let max_y = ((center.y + radius) / w).ceil() as i64 + 1;

    let (size_x, size_y) = (field.size_x() as i64, field.size_y() as i64);
    if max_x < 0 || max_y < 0 || min_x >= size_x || min_y >= size_y {
        return None;
    }

    let min_x = min_x.max(0) as usize;
    let min_y = min_y.max(0) as usize;
    let max_x = max_x.min(size_x - 1) as usize;
    let max_y = max_y.min(size_y - 1) as usize;

    let (lowest, highest) = field.rect_min_max(min_x, min_y, max_x, max_y);
    if center.z - radius > highest || center.z + radius < lowest {
        return None;
    }
    Some((min_x, min_y, max_x, max_y))
}

/// Visits the triangle pillars whose bounding sphere reaches a sphere of `radius`
/// around `center`, with their world transform.
fn for_each_pillar<F>(field: &Heightfield, tf: &Transform, center: Vec3, radius: f32, mut visit: F)
where
    F: FnMut(&ConvexPolyhedron, &Transform),
{
    let local = tf.inverse_transform_point(center);
    let Some((min_x, min_y, max_x, max_y)) = cell_range(field, local, radius) else {
        return;
    };

    for xi in min_x..max_x {
        for yi in min_y..max_y {
            for upper in [false, true] {
                let Ok((pillar, offset)) = field.convex_triangle_pillar(xi, yi, upper) else {
                    continue;
                };
                let pillar_transform = tf.compose(Transform::from_position(offset));
                if pillar_transform.position.distance(center) < pillar.bounding_radius() + radius {
                    visit(&pillar, &pillar_transform);
                }
            }
        }
    }
}
