//! JSON snapshots of a world's bodies and shapes.
//!
//! A snapshot keeps poses, velocities, damping and geometry. Materials, joints,
//! contact caches and sleep state are not part of it, and restored bodies get
//! fresh handles in capture order.

use serde::{Deserialize, Serialize};

use crate::dynamics::{BodyShape, BodyType, RigidBody, RigidBodyDesc};
use crate::error::PhysicsResult;
use crate::geometry::{Compound, CompoundChild, Shape};
use crate::math::{Quat, Vec3};
use crate::world::{World, WorldConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ShapeSnapshot {
    Sphere {
        radius: f32,
    },
    Box {
        half_extents: Vec3,
    },
    Plane,
    ConvexHull {
        vertices: Vec<Vec3>,
        faces: Vec<Vec<usize>>,
    },
    Heightfield {
        data: Vec<Vec<f32>>,
        element_size: f32,
    },
    Particle,
    Trimesh {
        vertices: Vec<Vec3>,
        indices: Vec<usize>,
    },
    Compound {
        children: Vec<BodyShapeSnapshot>,
    },
}

impl ShapeSnapshot {
    pub fn capture(shape: &Shape) -> Self {
        match shape {
            Shape::Sphere(s) => ShapeSnapshot::Sphere { radius: s.radius },
            Shape::Box(b) => ShapeSnapshot::Box {
                half_extents: b.half_extents,
            },
            Shape::Plane(_) => ShapeSnapshot::Plane,
            Shape::ConvexHull(hull) => ShapeSnapshot::ConvexHull {
                vertices: hull.vertices().to_vec(),
                faces: hull.faces().to_vec(),
            },
            Shape::Heightfield(field) => ShapeSnapshot::Heightfield {
                data: field.data().to_vec(),
                element_size: field.element_size(),
            },
            Shape::Particle(_) => ShapeSnapshot::Particle,
            Shape::Trimesh(mesh) => ShapeSnapshot::Trimesh {
                vertices: mesh.vertices().to_vec(),
                indices: mesh.indices(),
            },
            Shape::Compound(compound) => ShapeSnapshot::Compound {
                children: compound
                    .children
                    .iter()
                    .map(|child| BodyShapeSnapshot {
                        shape: ShapeSnapshot::capture(&child.shape),
                        offset: child.offset,
                        orientation: child.orientation,
                    })
                    .collect(),
            },
        }
    }

    /// Rebuilds the shape, validating hulls, meshes and heightfields again
    pub fn to_shape(&self) -> PhysicsResult<Shape> {
        Ok(match self {
            ShapeSnapshot::Sphere { radius } => Shape::sphere(*radius),
            ShapeSnapshot::Box { half_extents } => Shape::cuboid(*half_extents),
            ShapeSnapshot::Plane => Shape::plane(),
            ShapeSnapshot::ConvexHull { vertices, faces } => Shape::convex(vertices.clone(), faces.clone())?,
            ShapeSnapshot::Heightfield { data, element_size } => Shape::heightfield(data.clone(), *element_size)?,
            ShapeSnapshot::Particle => Shape::particle(),
            ShapeSnapshot::Trimesh { vertices, indices } => Shape::trimesh(vertices.clone(), indices.clone())?,
            ShapeSnapshot::Compound { children } => {
                let children = children
                    .iter()
                    .map(|child| Ok(CompoundChild::new(child.shape.to_shape()?, child.offset, child.orientation)))
                    .collect::<PhysicsResult<Vec<_>>>()?;
                Shape::Compound(Compound { children })
            }
        })
    }
}

/// A shape with its pose in the parent frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyShapeSnapshot {
    pub shape: ShapeSnapshot,
    #[serde(default)]
    pub offset: Vec3,
    #[serde(default)]
    pub orientation: Quat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub mass: f32,
    #[serde(rename = "type")]
    pub body_type: BodyType,
    pub position: Vec3,
    pub quaternion: Quat,
    #[serde(default)]
    pub velocity: Vec3,
    #[serde(default)]
    pub angular_velocity: Vec3,
    #[serde(default = "default_damping")]
    pub linear_damping: f32,
    #[serde(default = "default_damping")]
    pub angular_damping: f32,
    #[serde(default)]
    pub shapes: Vec<BodyShapeSnapshot>,
}

fn default_damping() -> f32 {
    0.01
}

impl BodySnapshot {
    pub fn capture(body: &RigidBody) -> Self {
        Self {
            mass: body.mass(),
            body_type: body.body_type(),
            position: body.position,
            quaternion: body.rotation,
            velocity: body.linear_velocity,
            angular_velocity: body.angular_velocity,
            linear_damping: body.linear_damping,
            angular_damping: body.angular_damping,
            shapes: body
                .shapes()
                .iter()
                .map(|s| BodyShapeSnapshot {
                    shape: ShapeSnapshot::capture(&s.shape),
                    offset: s.offset,
                    orientation: s.orientation,
                })
                .collect(),
        }
    }

    pub fn to_desc(&self) -> PhysicsResult<RigidBodyDesc> {
        let mut desc = RigidBodyDesc {
            body_type: self.body_type,
            mass: self.mass,
            ..RigidBodyDesc::default()
        }
        .with_position(self.position)
        .with_rotation(self.quaternion)
        .with_linear_velocity(self.velocity)
        .with_angular_velocity(self.angular_velocity)
        .with_linear_damping(self.linear_damping)
        .with_angular_damping(self.angular_damping);

        for shape in &self.shapes {
            desc = desc.with_body_shape(
                BodyShape::new(shape.shape.to_shape()?)
                    .with_offset(shape.offset)
                    .with_orientation(shape.orientation),
            );
        }
        Ok(desc)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default)]
    pub config: WorldConfig,
    pub bodies: Vec<BodySnapshot>,
}

impl WorldSnapshot {
    pub fn capture(world: &World) -> Self {
        Self {
            config: world.config().clone(),
            bodies: world.bodies().map(BodySnapshot::capture).collect(),
        }
    }

    pub fn to_json(&self) -> PhysicsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> PhysicsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds a new world holding the captured bodies
    pub fn restore(&self) -> PhysicsResult<World> {
        let mut world = World::new(self.config.clone());
        for body in &self.bodies {
            world.add_body(body.to_desc()?)?;
        }
        Ok(world)
    }
}
