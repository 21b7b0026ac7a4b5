pub mod broad_phase;
pub mod contact;
pub mod narrow_phase;
pub mod overlap_keeper;
pub mod ray;

pub use broad_phase::{Broadphase, NaiveBroadphase, OctreeBroadphase, SapAxis, SapBroadphase};
pub use contact::{
    BodyHandle, CachedImpulse, ContactCache, ContactKey, ContactManifold, ContactPoint, ShapeId,
};
pub use narrow_phase::{
    collide_shapes, ContactRecord, Narrowphase, NarrowphaseOutput, ShapeOverlap, UnsupportedPair,
};
pub use overlap_keeper::{OverlapKeeper, MAX_OVERLAP_ID};
pub use ray::{ray_shape, Ray, RayHit, RayMode, RayOptions};
