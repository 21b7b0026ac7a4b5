//! Point and ray queries against single triangles, shared by the heightfield and
//! trimesh routines.

use crate::math::Vec3;

/// Barycentric slack under which a point on a triangle border still counts as inside
const INSIDE_TOLERANCE: f32 = 1e-5;

/// Part of a triangle a closest point lies on.
///
/// `Edge(k)` runs from vertex `k` to vertex `(k + 1) % 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangleFeature {
    Face,
    Edge(usize),
    Vertex(usize),
}

/// Unit normal of the counter-clockwise triangle `[a, b, c]`; `None` if degenerate
pub fn triangle_normal(triangle: &[Vec3; 3]) -> Option<Vec3> {
    let [a, b, c] = *triangle;
    (b - a).cross(c - a).try_normalize()
}

/// Whether `point`, assumed to lie in the triangle's plane, is inside it or on its border
pub fn triangle_contains(triangle: &[Vec3; 3], point: Vec3) -> bool {
    let [a, b, c] = *triangle;
    let (v0, v1, v2) = (c - a, b - a, point - a);
    let (d00, d01, d02) = (v0.dot(v0), v0.dot(v1), v0.dot(v2));
    let (d11, d12) = (v1.dot(v1), v1.dot(v2));

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-12 {
        return false;
    }
    let u = (d11 * d02 - d01 * d12) / denom;
    let v = (d00 * d12 - d01 * d02) / denom;
    u >= -INSIDE_TOLERANCE && v >= -INSIDE_TOLERANCE && u + v <= 1.0 + INSIDE_TOLERANCE
}

/// Closest point of the triangle to `point` and the feature it lies on.
///
/// Points whose projection falls inside the triangle, borders included, report
/// [`TriangleFeature::Face`].
pub fn closest_point_on_triangle(triangle: &[Vec3; 3], point: Vec3) -> (Vec3, TriangleFeature) {
    let [a, b, c] = *triangle;

    if let Some(normal) = triangle_normal(triangle) {
        let projected = point - normal * (point - a).dot(normal);
        if triangle_contains(triangle, projected) {
            return (projected, TriangleFeature::Face);
        }
    }

    let ab = b - a;
    let ac = c - a;
    let ap = point - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, TriangleFeature::Vertex(0));
    }

    let bp = point - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (b, TriangleFeature::Vertex(1));
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (a + ab * v, TriangleFeature::Edge(0));
    }

    let cp = point - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (c, TriangleFeature::Vertex(2));
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (a + ac * w, TriangleFeature::Edge(2));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, TriangleFeature::Edge(1));
    }

    // Degenerate triangle with the point over its interior
    let denom = 1.0 / (va + vb + vc);
    (a + ab * (vb * denom) + ac * (vc * denom), TriangleFeature::Face)
}

/// Ray parameter `t` (in units of `direction`) where the ray enters the triangle.
///
/// With `skip_backfaces`, triangles seen from behind are ignored.
pub fn ray_triangle(origin: Vec3, direction: Vec3, triangle: &[Vec3; 3], skip_backfaces: bool) -> Option<f32> {
    let normal = triangle_normal(triangle)?;
    let n_dot_dir = normal.dot(direction);
    if n_dot_dir.abs() < 1e-8 || (skip_backfaces && n_dot_dir > 0.0) {
        return None;
    }

    let t = (triangle[0] - origin).dot(normal) / n_dot_dir;
    if t < 0.0 {
        return None;
    }
    triangle_contains(triangle, origin + direction * t).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn unit() -> [Vec3; 3] {
        [Vec3::ZERO, Vec3::X, Vec3::Y]
    }

    #[test]
    fn test_closest_point_regions() {
        let tri = unit();

        let (p, feature) = closest_point_on_triangle(&tri, Vec3::new(0.2, 0.2, 1.0));
        assert_eq!(feature, TriangleFeature::Face);
        assert!(p.almost_equals(Vec3::new(0.2, 0.2, 0.0), EPSILON));

        let (p, feature) = closest_point_on_triangle(&tri, Vec3::new(0.5, -1.0, 0.3));
        assert_eq!(feature, TriangleFeature::Edge(0));
        assert!(p.almost_equals(Vec3::new(0.5, 0.0, 0.0), EPSILON));

        let (p, feature) = closest_point_on_triangle(&tri, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(feature, TriangleFeature::Edge(1));
        assert!(p.almost_equals(Vec3::new(0.5, 0.5, 0.0), EPSILON));

        let (_, feature) = closest_point_on_triangle(&tri, Vec3::new(-1.0, 0.5, 0.0));
        assert_eq!(feature, TriangleFeature::Edge(2));

        let (p, feature) = closest_point_on_triangle(&tri, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(feature, TriangleFeature::Vertex(0));
        assert_eq!(p, Vec3::ZERO);

        let (_, feature) = closest_point_on_triangle(&tri, Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(feature, TriangleFeature::Vertex(2));
    }

    #[test]
    fn test_border_projection_counts_as_face() {
        let (p, feature) = closest_point_on_triangle(&unit(), Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(feature, TriangleFeature::Face);
        assert_eq!(p, Vec3::ZERO);
    }

    #[test]
    fn test_ray_triangle() {
        let tri = unit();
        let t = ray_triangle(Vec3::new(0.25, 0.25, 2.0), -Vec3::Z, &tri, true).unwrap();
        assert!((t - 2.0).abs() < EPSILON);

        assert!(ray_triangle(Vec3::new(0.25, 0.25, -2.0), Vec3::Z, &tri, true).is_none());
        assert!(ray_triangle(Vec3::new(0.25, 0.25, -2.0), Vec3::Z, &tri, false).is_some());
        assert!(ray_triangle(Vec3::new(2.0, 2.0, 2.0), -Vec3::Z, &tri, false).is_none());
        assert!(ray_triangle(Vec3::new(0.25, 0.25, 2.0), Vec3::Z, &tri, false).is_none());
    }
}
