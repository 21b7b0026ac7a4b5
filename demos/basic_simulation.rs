//! Basic physics simulation example
//!
//! A ball and a box fall onto a ground plane; a pendulum swings from a hinge.
//! Contact events are printed as they happen.

use rigid3d::prelude::*;

fn main() -> PhysicsResult<()> {
    env_logger::init();

    println!("rigid3d - Basic Simulation Example");
    println!("==================================\n");

    // Create physics world with sleeping enabled
    let mut world = World::new(WorldConfig {
        allow_sleep: true,
        ..WorldConfig::default()
    });

    // Static ground plane through the origin, facing +Z
    let floor = world.add_body(RigidBodyDesc::fixed().with_shape(Shape::plane()))?;
    println!("Created ground plane at Z=0");

    let ball = world.add_body(
        RigidBodyDesc::dynamic()
            .with_position(Vec3::new(0.0, 0.0, 5.0))
            .with_shape(Shape::sphere(0.5))
            .with_mass(1.0),
    )?;
    println!("Created ball at Z=5.0 (radius=0.5)");

    let crate_box = world.add_body(
        RigidBodyDesc::dynamic()
            .with_position(Vec3::new(2.0, 0.0, 3.0))
            .with_rotation(Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0).normalize(), 0.4))
            .with_shape(Shape::cuboid(Vec3::splat(0.5)))
            .with_mass(2.0),
    )?;
    println!("Created tilted box at Z=3.0");

    // Pendulum: a fixed anchor and a bob hanging from a hinge around Y
    let anchor = world.add_body(RigidBodyDesc::fixed().with_position(Vec3::new(-3.0, 0.0, 4.0)))?;
    let bob = world.add_body(
        RigidBodyDesc::dynamic()
            .with_position(Vec3::new(-1.5, 0.0, 4.0))
            .with_shape(Shape::sphere(0.25))
            .with_mass(0.5),
    )?;
    world.add_constraint(EquationSet::hinge(
        anchor,
        Vec3::ZERO,
        Vec3::Y,
        bob,
        Vec3::new(-1.5, 0.0, 0.0),
        Vec3::Y,
        1e6,
    ))?;
    println!("Created pendulum of length 1.5 hinged at (-3, 0, 4)\n");

    // Simulation parameters
    let dt = 1.0 / 60.0;
    let total_time = 4.0;
    let steps = (total_time / dt) as usize;

    println!("Simulating {} seconds ({} steps at {}Hz)...\n", total_time, steps, 1.0 / dt);

    for i in 0..steps {
        for event in world.step(dt) {
            match event {
                WorldEvent::BeginContact { body_a, body_b } => {
                    println!("t={:.2}s: contact begins between {:?} and {:?}", world.time(), body_a, body_b)
                }
                WorldEvent::Sleep { body } => println!("t={:.2}s: {:?} fell asleep", world.time(), body),
                _ => {}
            }
        }

        // Print positions every 30 frames (0.5 seconds)
        if i % 30 == 0 {
            for (name, handle) in [("ball", ball), ("box", crate_box), ("bob", bob)] {
                if let Some(body) = world.body(handle) {
                    let pos = body.position;
                    println!("t={:.2}s: {:<4} position=({:.3}, {:.3}, {:.3})", world.time(), name, pos.x, pos.y, pos.z);
                }
            }
        }
    }

    if let Some(hit) = world.ray_cast(Vec3::new(0.0, 0.0, 10.0), -Vec3::Z, 20.0) {
        println!("\nRay from above hits {:?} at distance {:.3}", hit.body, hit.distance);
    }
    let options = RayOptions {
        skip_backfaces: true,
        ..RayOptions::default()
    };
    for hit in world.raycast_all(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0), &options) {
        println!("  surface of {:?} at z = {:.3}", hit.body, hit.point.z);
    }

    let snapshot = WorldSnapshot::capture(&world).to_json()?;
    println!("Snapshot is {} bytes of JSON", snapshot.len());
    println!("Ground is {:?}; expected resting height of the ball ~0.5", floor);
    Ok(())
}
