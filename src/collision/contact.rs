use std::collections::HashMap;

use crate::math::Vec3;

/// Squared distance under which a new contact inherits a cached impulse
const WARM_START_MATCH_DISTANCE_SQ: f32 = 0.01;

/// A handle to a body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

impl BodyHandle {
    /// Invalid/null body handle
    pub const INVALID: Self = Self(u32::MAX);

    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the index of this handle
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns true if this handle is valid
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for BodyHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// World-unique id of a shape attached to a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

impl ShapeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single contact between two shapes, in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// Contact normal (pointing from A to B)
    pub normal: Vec3,
    /// Deepest point of A inside B
    pub point_a: Vec3,
    /// Deepest point of B inside A
    pub point_b: Vec3,
    /// Penetration depth (non-negative)
    pub depth: f32,
}

impl ContactPoint {
    pub fn new(normal: Vec3, point_a: Vec3, point_b: Vec3, depth: f32) -> Self {
        Self {
            normal,
            point_a,
            point_b,
            depth,
        }
    }

    /// The same contact seen from the other shape
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            point_a: self.point_b,
            point_b: self.point_a,
            depth: self.depth,
        }
    }

    fn is_usable(&self) -> bool {
        self.normal.is_finite()
            && !self.normal.is_near_zero(1e-12)
            && self.point_a.is_finite()
            && self.point_b.is_finite()
            && self.depth.is_finite()
    }
}

/// Contact points produced by one shape pair
#[derive(Debug, Clone, Default)]
pub struct ContactManifold {
    points: Vec<ContactPoint>,
}

impl ContactManifold {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all contact points
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Adds a contact point; degenerate points are dropped
    pub fn add_point(&mut self, point: ContactPoint) {
        if point.is_usable() {
            self.points.push(point);
        }
    }

    /// Swaps the roles of A and B for every point from `start` on
    pub fn flip_from(&mut self, start: usize) {
        for point in self.points.iter_mut().skip(start) {
            *point = point.flipped();
        }
    }

    /// Iterates over contact points
    pub fn iter(&self) -> impl Iterator<Item = &ContactPoint> {
        self.points.iter()
    }

    pub fn points(&self) -> &[ContactPoint] {
        &self.points
    }

    /// Returns the number of contact points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the manifold has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Identifies the shape pair a contact came from, in narrowphase order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContactKey {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub shape_a: ShapeId,
    pub shape_b: ShapeId,
}

/// Solved impulses of one contact, kept for warm starting the next step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedImpulse {
    /// Contact point in the local frame of body A
    pub local_point_a: Vec3,
    pub normal_impulse: f32,
    pub tangent_impulse_1: f32,
    pub tangent_impulse_2: f32,
}

/// Contact impulses of the previous step keyed by shape pair.
///
/// New contacts find their predecessor by proximity of the body-local contact point.
#[derive(Debug, Clone, Default)]
pub struct ContactCache {
    previous: HashMap<ContactKey, Vec<CachedImpulse>>,
    current: HashMap<ContactKey, Vec<CachedImpulse>>,
}

impl ContactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the closest matching contact from the previous step.
    ///
    /// A cached impulse is handed out at most once per step.
    pub fn take(&mut self, key: &ContactKey, local_point_a: Vec3) -> Option<CachedImpulse> {
        let entries = self.previous.get_mut(key)?;
        let (index, _) = entries
            .iter()
            .map(|old| old.local_point_a.distance_squared(local_point_a))
            .enumerate()
            .filter(|&(_, d)| d < WARM_START_MATCH_DISTANCE_SQ)
            .min_by(|(_, x), (_, y)| x.total_cmp(y))?;
        Some(entries.swap_remove(index))
    }

    pub fn store(&mut self, key: ContactKey, impulse: CachedImpulse) {
        self.current.entry(key).or_default().push(impulse);
    }

    /// Makes this step's impulses the lookup source of the next step
    pub fn advance(&mut self) {
        std::mem::swap(&mut self.previous, &mut self.current);
        self.current.clear();
    }

    /// Forgets every contact involving `handle`
    pub fn remove_body(&mut self, handle: BodyHandle) {
        let keep = |key: &ContactKey, _: &mut Vec<CachedImpulse>| key.body_a != handle && key.body_b != handle;
        self.previous.retain(keep);
        self.current.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.previous.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
