//! End-to-end scenes stepped through the public API

use rigid3d::prelude::*;

const DT: f32 = 1.0 / 60.0;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn world_with_ground(config: WorldConfig) -> (World, BodyHandle) {
    let mut world = World::new(config);
    let ground = world.add_body(RigidBodyDesc::fixed().with_shape(Shape::plane())).unwrap();
    (world, ground)
}

fn ball(position: Vec3, radius: f32) -> RigidBodyDesc {
    RigidBodyDesc::dynamic()
        .with_position(position)
        .with_shape(Shape::sphere(radius))
        .with_mass(1.0)
}

#[test]
fn test_ball_lands_and_rests() {
    init_logging();
    let (mut world, ground) = world_with_ground(WorldConfig::default());
    let b = world.add_body(ball(Vec3::new(0.0, 0.0, 3.0), 0.5)).unwrap();

    let mut landed_at = None;
    for step in 0..240 {
        let events = world.step(DT);
        let begins = events
            .iter()
            .any(|e| *e == WorldEvent::BeginContact { body_a: ground, body_b: b });
        if begins && landed_at.is_none() {
            landed_at = Some(step);
        }
    }

    // Free fall of 2.5 takes about 0.71 s
    let landed_at = landed_at.expect("ball never touched the ground");
    assert!((38..=46).contains(&landed_at), "landed at step {}", landed_at);

    let body = world.body(b).unwrap();
    assert!((body.position.z - 0.5).abs() < 0.02, "z = {}", body.position.z);
    assert!(body.linear_velocity.length() < 0.05);
}

#[test]
fn test_sphere_stack_holds() {
    let (mut world, _) = world_with_ground(WorldConfig::default());
    let stack: Vec<_> = (0..3)
        .map(|i| world.add_body(ball(Vec3::new(0.0, 0.0, 0.5 + i as f32), 0.5)).unwrap())
        .collect();

    for _ in 0..200 {
        world.step(DT);
    }

    for (i, &handle) in stack.iter().enumerate() {
        let pos = world.body(handle).unwrap().position;
        let expected = 0.5 + i as f32;
        assert!((pos.z - expected).abs() < 0.05, "sphere {} at z = {}", i, pos.z);
        assert!(pos.x.abs() < 1e-3 && pos.y.abs() < 1e-3);
    }
}

#[test]
fn test_box_stack_settles() {
    let (mut world, _) = world_with_ground(WorldConfig::default());
    let stack: Vec<_> = (0..3)
        .map(|i| {
            world
                .add_body(
                    RigidBodyDesc::dynamic()
                        .with_position(Vec3::new(0.0, 0.0, 0.5 + i as f32))
                        .with_shape(Shape::cuboid(Vec3::splat(0.5)))
                        .with_mass(1.0),
                )
                .unwrap()
        })
        .collect();

    for _ in 0..300 {
        world.step(DT);
    }

    for (i, &handle) in stack.iter().enumerate() {
        let body = world.body(handle).unwrap();
        let expected = 0.5 + i as f32;
        assert!((body.position.z - expected).abs() < 0.1, "box {} at z = {}", i, body.position.z);
        assert!(body.position.x.abs() < 0.1 && body.position.y.abs() < 0.1, "box {} drifted to {:?}", i, body.position);
        assert!(body.linear_velocity.length() < 0.3, "box {} v = {:?}", i, body.linear_velocity);
        assert!(body.angular_velocity.length() < 0.5, "box {} w = {:?}", i, body.angular_velocity);
    }
}

#[test]
fn test_sphere_rests_on_flat_heightfield() {
    let mut world = World::default();
    world
        .add_body(RigidBodyDesc::fixed().with_shape(Shape::heightfield(vec![vec![0.0; 6]; 6], 1.0).unwrap()))
        .unwrap();
    let b = world.add_body(ball(Vec3::new(2.05, 2.0, 0.6), 0.5)).unwrap();

    for _ in 0..200 {
        world.step(DT);
    }

    let body = world.body(b).unwrap();
    assert!((body.position.x - 2.05).abs() < 0.01, "x = {}", body.position.x);
    assert!((body.position.y - 2.0).abs() < 0.01, "y = {}", body.position.y);
    assert!(body.linear_velocity.x.abs() < 0.01, "vx = {}", body.linear_velocity.x);
    assert!((body.position.z - 0.5).abs() < 0.02, "z = {}", body.position.z);
}

#[test]
fn test_box_slides_to_a_stop() {
    let (mut world, _) = world_with_ground(WorldConfig::default());
    let cube = world
        .add_body(
            RigidBodyDesc::dynamic()
                .with_position(Vec3::new(0.0, 0.0, 0.5))
                .with_shape(Shape::cuboid(Vec3::splat(0.5)))
                .with_linear_velocity(Vec3::new(2.0, 0.0, 0.0)),
        )
        .unwrap();

    for _ in 0..180 {
        world.step(DT);
    }

    // Friction 0.3 stops a 2 m/s slide after about 0.7 m
    let body = world.body(cube).unwrap();
    assert!(body.linear_velocity.x.abs() < 0.05);
    assert!(body.position.x > 0.4 && body.position.x < 1.0, "x = {}", body.position.x);
    assert!(body.position.z > 0.45);
}

#[test]
fn test_material_pair_controls_friction() {
    let (mut world, ground) = world_with_ground(WorldConfig::default());
    let ice = world.add_material("ice");
    let floor_material = world.add_material("floor");
    world
        .add_contact_material(ContactMaterial::new(ice, floor_material, 0.0, 0.0))
        .unwrap();
    world.body_mut(ground).unwrap().material = Some(floor_material);

    let cube = world
        .add_body(
            RigidBodyDesc::dynamic()
                .with_position(Vec3::new(0.0, 0.0, 0.5))
                .with_shape(Shape::cuboid(Vec3::splat(0.5)))
                .with_linear_velocity(Vec3::new(2.0, 0.0, 0.0))
                .with_linear_damping(0.0)
                .with_material(ice),
        )
        .unwrap();

    for _ in 0..60 {
        world.step(DT);
    }

    let body = world.body(cube).unwrap();
    assert!((body.linear_velocity.x - 2.0).abs() < 0.05);
    assert!((body.position.x - 2.0).abs() < 0.05);
}

#[test]
fn test_hinge_pendulum_keeps_length() {
    let mut world = World::default();
    let anchor = world
        .add_body(RigidBodyDesc::fixed().with_position(Vec3::new(0.0, 0.0, 5.0)))
        .unwrap();
    let bob = world.add_body(ball(Vec3::new(1.0, 0.0, 5.0), 0.1)).unwrap();
    world
        .add_constraint(EquationSet::hinge(
            anchor,
            Vec3::ZERO,
            Vec3::Y,
            bob,
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::Y,
            1e6,
        ))
        .unwrap();

    let mut lowest = f32::MAX;
    for _ in 0..120 {
        world.step(DT);
        let pos = world.body(bob).unwrap().position;
        lowest = lowest.min(pos.z);
        let length = pos.distance(Vec3::new(0.0, 0.0, 5.0));
        assert!((length - 1.0).abs() < 0.05, "length = {}", length);
        assert!(pos.y.abs() < 1e-3);
    }
    // It swung through the bottom of the arc
    assert!(lowest < 4.1);
}

#[test]
fn test_hinge_motor_spins_body() {
    let mut world = World::new(WorldConfig {
        gravity: Vec3::ZERO,
        ..WorldConfig::default()
    });
    let base = world.add_body(RigidBodyDesc::fixed()).unwrap();
    let wheel = world
        .add_body(RigidBodyDesc::dynamic().with_shape(Shape::cuboid(Vec3::new(1.0, 0.2, 0.2))))
        .unwrap();

    let mut hinge = EquationSet::hinge(base, Vec3::ZERO, Vec3::Z, wheel, Vec3::ZERO, Vec3::Z, 1e6);
    assert!(hinge.enable_motor());
    assert!(hinge.set_motor_speed(2.0));
    let joint = world.add_constraint(hinge).unwrap();

    for _ in 0..60 {
        world.step(DT);
    }

    let w = world.body(wheel).unwrap().angular_velocity;
    assert!((w.z.abs() - 2.0).abs() < 0.05, "w = {:?}", w);
    assert!(w.x.abs() < 1e-3 && w.y.abs() < 1e-3);
    assert!(world.constraint(joint).unwrap().motor().unwrap().enabled);
}

#[test]
fn test_lock_keeps_relative_pose() {
    let mut world = World::default();
    let a = world
        .add_body(
            RigidBodyDesc::dynamic()
                .with_position(Vec3::new(0.0, 0.0, 5.0))
                .with_shape(Shape::cuboid(Vec3::splat(0.5))),
        )
        .unwrap();
    let b = world
        .add_body(
            RigidBodyDesc::dynamic()
                .with_position(Vec3::new(1.5, 0.0, 5.0))
                .with_shape(Shape::cuboid(Vec3::splat(0.5))),
        )
        .unwrap();
    let lock = EquationSet::lock(world.body(a).unwrap(), world.body(b).unwrap(), 1e6);
    world.add_constraint(lock).unwrap();
    world.apply_impulse(a, Vec3::new(0.0, 0.0, 1.0), Vec3::new(-0.5, 0.0, 0.0)).unwrap();

    for _ in 0..30 {
        world.step(DT);
    }

    let (pa, pb) = (world.body(a).unwrap().position, world.body(b).unwrap().position);
    assert!((pa.distance(pb) - 1.5).abs() < 0.02);
    let (qa, qb) = (world.body(a).unwrap().rotation, world.body(b).unwrap().rotation);
    assert!(qa.dot(qb).abs() > 0.999);
}

#[test]
fn test_octree_matches_naive() {
    let scene = |kind: BroadphaseKind| {
        let (mut world, _) = world_with_ground(WorldConfig {
            broadphase: kind,
            ..WorldConfig::default()
        });
        let balls: Vec<_> = (0..9)
            .map(|i| {
                let p = Vec3::new((i % 3) as f32 * 2.0, (i / 3) as f32 * 2.0, 1.0 + i as f32 * 0.3);
                world.add_body(ball(p, 0.5)).unwrap()
            })
            .collect();
        for _ in 0..90 {
            world.step(DT);
        }
        balls
            .iter()
            .map(|&h| world.body(h).unwrap().position)
            .collect::<Vec<_>>()
    };

    let naive = scene(BroadphaseKind::Naive);
    let octree = scene(BroadphaseKind::Octree {
        max_depth: 5,
        min_cell_size: 0.5,
    });
    for (a, b) in naive.iter().zip(&octree) {
        assert!(a.almost_equals(*b, 1e-5), "{:?} vs {:?}", a, b);
    }
}

#[test]
fn test_collision_filter_lets_bodies_pass() {
    let (mut world, _) = world_with_ground(WorldConfig::default());
    let ghost = world
        .add_body(ball(Vec3::new(0.0, 0.0, 1.0), 0.5).with_collision_filter(2, !1))
        .unwrap();

    for _ in 0..60 {
        world.step(DT);
    }
    assert!(world.body(ghost).unwrap().position.z < 0.0);
}

#[test]
fn test_sleeping_body_is_woken_by_impact() {
    let config = WorldConfig {
        allow_sleep: true,
        ..WorldConfig::default()
    };
    let (mut world, _) = world_with_ground(config);
    let sleeper = world.add_body(ball(Vec3::new(0.0, 0.0, 0.5), 0.5)).unwrap();

    let mut fell_asleep = false;
    for _ in 0..180 {
        for event in world.step(DT) {
            if event == (WorldEvent::Sleep { body: sleeper }) {
                fell_asleep = true;
            }
        }
    }
    assert!(fell_asleep);
    assert!(world.body(sleeper).unwrap().is_sleeping());

    // Dropped from above: hits the sleeper while moving fast
    let hammer = world.add_body(ball(Vec3::new(0.0, 0.0, 3.0), 0.5)).unwrap();
    let mut woke = false;
    for _ in 0..60 {
        for event in world.step(DT) {
            if event == (WorldEvent::WakeUp { body: sleeper }) {
                woke = true;
            }
        }
    }
    assert!(woke);
    assert!(world.body(hammer).unwrap().position.z > 1.3);
}

#[test]
fn test_substeps_track_real_time() {
    let mut world = World::new(WorldConfig {
        gravity: Vec3::ZERO,
        ..WorldConfig::default()
    });
    let mover = world
        .add_body(
            ball(Vec3::ZERO, 0.5)
                .with_linear_velocity(Vec3::new(1.0, 0.0, 0.0))
                .with_linear_damping(0.0),
        )
        .unwrap();

    // Frames of 1/45 s against a 1/60 s internal step
    for _ in 0..45 {
        world.step_with_substeps(DT, 1.0 / 45.0, 5);
    }

    assert!((world.time() - 1.0).abs() < 2.0 * DT);
    let body = world.body(mover).unwrap();
    // The blended pose trails real time by one internal step
    assert!((body.interpolated_position.x - (1.0 - DT)).abs() < 1e-2);
    assert!(body.interpolated_position.x <= body.position.x + 1e-6);
}

#[test]
fn test_snapshot_restores_a_running_scene() {
    let (mut world, _) = world_with_ground(WorldConfig::default());
    world.add_body(ball(Vec3::new(0.0, 0.0, 2.0), 0.5)).unwrap();
    for _ in 0..20 {
        world.step(DT);
    }

    let json = WorldSnapshot::capture(&world).to_json().unwrap();
    let mut restored = WorldSnapshot::from_json(&json).unwrap().restore().unwrap();

    for _ in 0..10 {
        world.step(DT);
        restored.step(DT);
    }
    let original: Vec<_> = world.bodies().map(|b| b.position).collect();
    let copy: Vec<_> = restored.bodies().map(|b| b.position).collect();
    for (a, b) in original.iter().zip(&copy) {
        assert!(a.almost_equals(*b, 1e-3), "{:?} vs {:?}", a, b);
    }
}

#[test]
fn test_particle_lands_on_plane() {
    let (mut world, _) = world_with_ground(WorldConfig::default());
    let dot = world
        .add_body(
            RigidBodyDesc::dynamic()
                .with_position(Vec3::new(1.0, -1.0, 1.0))
                .with_shape(Shape::particle())
                .with_mass(0.1),
        )
        .unwrap();

    for _ in 0..180 {
        world.step(DT);
    }

    let body = world.body(dot).unwrap();
    assert!(body.position.z.abs() < 0.02, "z = {}", body.position.z);
    assert!(body.linear_velocity.length() < 0.05);
}

#[test]
fn test_ball_rests_on_mesh_floor() {
    let mut world = World::new(WorldConfig::default());
    let floor = Shape::trimesh(
        vec![
            Vec3::new(-3.0, -3.0, 0.0),
            Vec3::new(3.0, -3.0, 0.0),
            Vec3::new(3.0, 3.0, 0.0),
            Vec3::new(-3.0, 3.0, 0.0),
        ],
        vec![0, 1, 2, 0, 2, 3],
    )
    .unwrap();
    world.add_body(RigidBodyDesc::fixed().with_shape(floor)).unwrap();
    // Right above the diagonal seam of the two triangles
    let b = world.add_body(ball(Vec3::new(0.5, 0.5, 1.0), 0.5)).unwrap();

    for _ in 0..200 {
        world.step(DT);
    }

    let body = world.body(b).unwrap();
    assert!((body.position.z - 0.5).abs() < 0.02, "z = {}", body.position.z);
    assert!((body.position.x - 0.5).abs() < 0.01 && (body.position.y - 0.5).abs() < 0.01);
    assert!(body.linear_velocity.length() < 0.05);
}
