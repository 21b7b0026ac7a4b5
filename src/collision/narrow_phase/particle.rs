use crate::collision::contact::{ContactManifold, ContactPoint};
use crate::geometry::Shape;
use crate::math::{Transform, Vec3};

/// Sphere A containing particle B pushes the particle out radially
pub fn sphere_particle(
    a: &Shape,
    ta: &Transform,
    _b: &Shape,
    tb: &Transform,
    manifold: &mut ContactManifold,
) {
    let Shape::Sphere(sphere) = a else {
        return;
    };
    let Some((normal, dist)) = (tb.position - ta.position).normalize_with_length() else {
        return;
    };
    if dist > sphere.radius {
        return;
    }

    manifold.add_point(ContactPoint::new(
        normal,
        ta.position + normal * sphere.radius,
        tb.position,
        sphere.radius - dist,
    ));
}

/// Particle B below plane A
pub fn plane_particle(
    _a: &Shape,
    ta: &Transform,
    _b: &Shape,
    tb: &Transform,
    manifold: &mut ContactManifold,
) {
    let normal = ta.rotation.rotate_vec(Vec3::Z);
    let dist = (tb.position - ta.position).dot(normal);
    if dist > 0.0 {
        return;
    }

    manifold.add_point(ContactPoint::new(normal, tb.position - normal * dist, tb.position, -dist));
}

/// Particle B inside hull A leaves through the face it penetrates least
pub fn convex_particle(
    a: &Shape,
    ta: &Transform,
    _b: &Shape,
    tb: &Transform,
    manifold: &mut ContactManifold,
) {
    let Some(hull) = a.as_convex() else {
        return;
    };
    let local = ta.inverse_transform_point(tb.position);

    let mut best: Option<(f32, usize)> = None;
    for (index, (face, &normal)) in hull.faces().iter().zip(hull.face_normals()).enumerate() {
        let penetration = -normal.dot(local - hull.vertices()[face[0]]);
        if penetration < 0.0 {
            return;
        }
        if best.map_or(true, |(depth, _)| penetration < depth) {
            best = Some((penetration, index));
        }
    }

    let Some((depth, index)) = best else {
        return;
    };
    let normal = ta.rotation.rotate_vec(hull.face_normals()[index]);
    manifold.add_point(ContactPoint::new(normal, tb.position + normal * depth, tb.position, depth));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_inside_sphere() {
        let mut manifold = ContactManifold::new();
        sphere_particle(
            &Shape::sphere(1.0),
            &Transform::IDENTITY,
            &Shape::particle(),
            &Transform::from_position(Vec3::new(0.0, 0.0, 0.75)),
            &mut manifold,
        );

        assert_eq!(manifold.len(), 1);
        let contact = manifold.points()[0];
        assert!(contact.normal.almost_equals(Vec3::Z, 1e-6));
        assert!(contact.point_a.almost_equals(Vec3::Z, 1e-6));
        assert!((contact.depth - 0.25).abs() < 1e-6);

        manifold.clear();
        sphere_particle(
            &Shape::sphere(1.0),
            &Transform::IDENTITY,
            &Shape::particle(),
            &Transform::from_position(Vec3::new(0.0, 2.0, 0.0)),
            &mut manifold,
        );
        assert!(manifold.is_empty());
    }

    #[test]
    fn test_particle_below_plane() {
        let mut manifold = ContactManifold::new();
        plane_particle(
            &Shape::plane(),
            &Transform::IDENTITY,
            &Shape::particle(),
            &Transform::from_position(Vec3::new(1.0, 2.0, -0.1)),
            &mut manifold,
        );

        assert_eq!(manifold.len(), 1);
        let contact = manifold.points()[0];
        assert_eq!(contact.normal, Vec3::Z);
        assert!(contact.point_a.almost_equals(Vec3::new(1.0, 2.0, 0.0), 1e-6));
        assert!((contact.depth - 0.1).abs() < 1e-6);

        manifold.clear();
        plane_particle(
            &Shape::plane(),
            &Transform::IDENTITY,
            &Shape::particle(),
            &Transform::from_position(Vec3::new(0.0, 0.0, 0.1)),
            &mut manifold,
        );
        assert!(manifold.is_empty());
    }

    #[test]
    fn test_particle_inside_box_leaves_through_nearest_face() {
        let mut manifold = ContactManifold::new();
        convex_particle(
            &Shape::cuboid(Vec3::ONE),
            &Transform::IDENTITY,
            &Shape::particle(),
            &Transform::from_position(Vec3::new(0.2, 0.1, 0.9)),
            &mut manifold,
        );

        assert_eq!(manifold.len(), 1);
        let contact = manifold.points()[0];
        assert!(contact.normal.almost_equals(Vec3::Z, 1e-6));
        assert!((contact.depth - 0.1).abs() < 1e-5);
        assert!(contact.point_a.almost_equals(Vec3::new(0.2, 0.1, 1.0), 1e-5));

        manifold.clear();
        convex_particle(
            &Shape::cuboid(Vec3::ONE),
            &Transform::IDENTITY,
            &Shape::particle(),
            &Transform::from_position(Vec3::new(0.2, 0.1, 1.5)),
            &mut manifold,
        );
        assert!(manifold.is_empty());
    }
}
