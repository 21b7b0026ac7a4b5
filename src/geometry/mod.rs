mod aabb;
mod convex;
mod heightfield;
mod octree;
mod shape;
mod triangle;
mod trimesh;

pub use aabb::Aabb;
pub use convex::{clip_face_against_plane, point_in_polygon, ClipPoint, ConvexPolyhedron};
pub use heightfield::Heightfield;
pub use octree::{Octree, OctreeConfig};
pub use shape::{combined_inertia, BoxShape, Compound, CompoundChild, Particle, Plane, Shape, ShapeType, Sphere};
pub use triangle::{closest_point_on_triangle, ray_triangle, triangle_contains, triangle_normal, TriangleFeature};
pub use trimesh::Trimesh;
