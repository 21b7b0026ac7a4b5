use crate::collision::contact::{ContactManifold, ContactPoint};
use crate::geometry::{ConvexPolyhedron, Shape};
use crate::math::{Transform, Vec3};

/// Clip distances passed to the face clipper; deeper points are clamped
const CLIP_MIN_DIST: f32 = -100.0;
const CLIP_MAX_DIST: f32 = 100.0;

/// Plane A against the vertices of hull B
pub fn plane_convex(
    _a: &Shape,
    ta: &Transform,
    b: &Shape,
    tb: &Transform,
    manifold: &mut ContactManifold,
) {
    let Some(hull) = b.as_convex() else {
        return;
    };
    let normal = ta.rotation.rotate_vec(Vec3::Z);

    for &local in hull.vertices() {
        let vertex = tb.transform_point(local);
        let dist = (vertex - ta.position).dot(normal);
        if dist <= 0.0 {
            manifold.add_point(ContactPoint::new(normal, vertex - normal * dist, vertex, -dist));
        }
    }
}

pub fn convex_convex(
    a: &Shape,
    ta: &Transform,
    b: &Shape,
    tb: &Transform,
    manifold: &mut ContactManifold,
) {
    if let (Some(hull_a), Some(hull_b)) = (a.as_convex(), b.as_convex()) {
        hull_hull(hull_a, ta, hull_b, tb, manifold);
    }
}

/// Separating-axis test followed by clipping of B's incident face against A
pub(crate) fn hull_hull(
    hull_a: &ConvexPolyhedron,
    ta: &Transform,
    hull_b: &ConvexPolyhedron,
    tb: &Transform,
    manifold: &mut ContactManifold,
) {
    let Some(sep) = hull_a.find_separating_axis(ta, hull_b, tb) else {
        return;
    };

    for clip in hull_a.clip_against_hull(ta, hull_b, tb, sep, CLIP_MIN_DIST, CLIP_MAX_DIST) {
        manifold.add_point(ContactPoint::new(
            -sep,
            clip.point - clip.normal * clip.depth,
            clip.point,
            -clip.depth,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quat;

    #[test]
    fn test_box_resting_on_plane() {
        let mut manifold = ContactManifold::new();
        plane_convex(
            &Shape::plane(),
            &Transform::IDENTITY,
            &Shape::cuboid(Vec3::splat(0.5)),
            &Transform::from_position(Vec3::new(0.0, 0.0, 0.45)),
            &mut manifold,
        );

        // The four bottom corners
        assert_eq!(manifold.len(), 4);
        for contact in manifold.iter() {
            assert_eq!(contact.normal, Vec3::Z);
            assert!((contact.depth - 0.05).abs() < 1e-5);
            assert!(contact.point_a.z.abs() < 1e-6);
        }
    }

    #[test]
    fn test_box_above_plane() {
        let mut manifold = ContactManifold::new();
        plane_convex(
            &Shape::plane(),
            &Transform::IDENTITY,
            &Shape::cuboid(Vec3::splat(0.5)),
            &Transform::from_position(Vec3::new(0.0, 0.0, 0.6)),
            &mut manifold,
        );
        assert!(manifold.is_empty());
    }

    #[test]
    fn test_stacked_boxes() {
        let mut manifold = ContactManifold::new();
        convex_convex(
            &Shape::cuboid(Vec3::ONE),
            &Transform::IDENTITY,
            &Shape::cuboid(Vec3::ONE),
            &Transform::from_position(Vec3::new(0.0, 0.0, 1.9)),
            &mut manifold,
        );

        assert_eq!(manifold.len(), 4);
        for contact in manifold.iter() {
            assert!(contact.normal.almost_equals(Vec3::Z, 1e-5));
            assert!((contact.depth - 0.1).abs() < 1e-4);
            // A's points lie on its top face, B's on its bottom face
            assert!((contact.point_a.z - 1.0).abs() < 1e-4);
            assert!((contact.point_b.z - 0.9).abs() < 1e-4);
        }
    }

    #[test]
    fn test_rotated_box_on_box() {
        let rotation = Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_4);
        let mut manifold = ContactManifold::new();
        convex_convex(
            &Shape::cuboid(Vec3::ONE),
            &Transform::IDENTITY,
            &Shape::cuboid(Vec3::splat(0.5)),
            &Transform::new(Vec3::new(0.0, 0.0, 1.45), rotation),
            &mut manifold,
        );

        assert!(!manifold.is_empty());
        for contact in manifold.iter() {
            assert!(contact.normal.almost_equals(Vec3::Z, 1e-4));
        }
    }

    #[test]
    fn test_separated_boxes() {
        let mut manifold = ContactManifold::new();
        convex_convex(
            &Shape::cuboid(Vec3::ONE),
            &Transform::IDENTITY,
            &Shape::cuboid(Vec3::ONE),
            &Transform::from_position(Vec3::new(2.5, 0.0, 0.0)),
            &mut manifold,
        );
        assert!(manifold.is_empty());
    }
}
