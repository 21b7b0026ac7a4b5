use super::aabb::Aabb;

/// Subdivision limits of an [`Octree`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeConfig {
    pub max_depth: usize,
    /// Nodes are not split once their largest half extent drops below this
    pub min_cell_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            min_cell_size: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
struct OctreeNode<T> {
    aabb: Aabb,
    data: Vec<(Aabb, T)>,
    children: Vec<OctreeNode<T>>,
}

impl<T> OctreeNode<T> {
    fn new(aabb: Aabb) -> Self {
        Self {
            aabb,
            data: Vec::new(),
            children: Vec::new(),
        }
    }

    fn insert(&mut self, aabb: Aabb, item: T, level: usize, config: &OctreeConfig) -> bool {
        if !self.aabb.contains_aabb(aabb) {
            return false;
        }

        let mut just_subdivided = false;
        if self.children.is_empty() && level < config.max_depth && self.can_subdivide(config) {
            self.subdivide();
            just_subdivided = true;
        }

        if let Some(child) = self.children.iter_mut().find(|c| c.aabb.contains_aabb(aabb)) {
            return child.insert(aabb, item, level + 1, config);
        }

        // Straddles the octants; keep it here
        if just_subdivided {
            self.children.clear();
        }
        self.data.push((aabb, item));
        true
    }

    fn can_subdivide(&self, config: &OctreeConfig) -> bool {
        self.aabb.half_extents().max_element() >= config.min_cell_size
    }

    fn subdivide(&mut self) {
        let min = self.aabb.min;
        let half = self.aabb.half_extents();
        self.children = (0..8)
            .map(|octant| {
                let mut offset = half;
                offset.x *= (octant & 1) as f32;
                offset.y *= ((octant >> 1) & 1) as f32;
                offset.z *= ((octant >> 2) & 1) as f32;
                let child_min = min + offset;
                OctreeNode::new(Aabb::new(child_min, child_min + half))
            })
            .collect();
    }

    fn remove_empty_nodes(&mut self) {
        for child in &mut self.children {
            child.remove_empty_nodes();
        }
        self.children
            .retain(|child| !child.data.is_empty() || !child.children.is_empty());
    }

    fn count(&self) -> usize {
        self.data.len() + self.children.iter().map(OctreeNode::count).sum::<usize>()
    }
}

/// Bounded-depth octree over items with bounding boxes.
///
/// Items live in the deepest node that fully contains them.
#[derive(Debug, Clone)]
pub struct Octree<T> {
    root: OctreeNode<T>,
    config: OctreeConfig,
}

impl<T> Octree<T> {
    pub fn new(aabb: Aabb, config: OctreeConfig) -> Self {
        Self {
            root: OctreeNode::new(aabb),
            config,
        }
    }

    #[inline]
    pub fn aabb(&self) -> Aabb {
        self.root.aabb
    }

    /// Drops all items and resizes the root cell
    pub fn reset(&mut self, aabb: Aabb) {
        self.root = OctreeNode::new(aabb);
    }

    /// Inserts an item; returns false when it lies outside the root cell.
    pub fn insert(&mut self, aabb: Aabb, item: T) -> bool {
        self.root.insert(aabb, item, 0, &self.config)
    }

    /// Prunes child nodes that hold no items
    pub fn remove_empty_nodes(&mut self) {
        self.root.remove_empty_nodes();
    }

    pub fn len(&self) -> usize {
        self.root.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn depth_of(node: &OctreeNode<T>) -> usize {
        1 + node.children.iter().map(Self::depth_of).max().unwrap_or(0)
    }

    /// Number of node levels currently allocated
    pub fn depth(&self) -> usize {
        Self::depth_of(&self.root)
    }
}

impl<T: Clone> Octree<T> {
    /// Appends every item whose box overlaps `aabb` to `result`
    pub fn aabb_query(&self, aabb: Aabb, result: &mut Vec<T>) {
        let mut queue = vec![&self.root];
        while let Some(node) = queue.pop() {
            if !node.aabb.overlaps(aabb) {
                continue;
            }
            result.extend(
                node.data
                    .iter()
                    .filter(|(item_aabb, _)| item_aabb.overlaps(aabb))
                    .map(|(_, item)| item.clone()),
            );
            queue.extend(node.children.iter());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn cube(center: Vec3, half: f32) -> Aabb {
        Aabb::from_center_half_extents(center, Vec3::splat(half))
    }

    fn world() -> Octree<usize> {
        Octree::new(Aabb::new(Vec3::splat(-8.0), Vec3::splat(8.0)), OctreeConfig::default())
    }

    #[test]
    fn test_insert_outside_root_fails() {
        let mut tree = world();
        assert!(!tree.insert(cube(Vec3::splat(10.0), 1.0), 0));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_small_items_sink_into_children() {
        let mut tree = world();
        assert!(tree.insert(cube(Vec3::splat(5.0), 0.1), 0));
        assert!(tree.depth() > 1);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_straddling_item_stays_in_root() {
        let mut tree = world();
        assert!(tree.insert(cube(Vec3::ZERO, 1.0), 7));
        // The fresh subdivision was undone
        assert_eq!(tree.depth(), 1);

        let mut found = Vec::new();
        tree.aabb_query(cube(Vec3::new(0.5, 0.5, 0.5), 0.1), &mut found);
        assert_eq!(found, vec![7]);
    }

    #[test]
    fn test_query_finds_only_overlapping_items() {
        let mut tree = world();
        tree.insert(cube(Vec3::splat(-5.0), 0.5), 0);
        tree.insert(cube(Vec3::splat(5.0), 0.5), 1);
        tree.insert(cube(Vec3::new(5.0, 5.0, 4.2), 0.5), 2);

        let mut found = Vec::new();
        tree.aabb_query(cube(Vec3::splat(5.0), 0.5), &mut found);
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);

        found.clear();
        tree.aabb_query(cube(Vec3::new(-5.0, 5.0, 0.0), 1.0), &mut found);
        assert!(found.is_empty());
    }

    #[test]
    fn test_flat_root_still_subdivides() {
        // Thin on z, wide on x and y
        let root = Aabb::new(Vec3::new(-8.0, -8.0, -0.1), Vec3::new(8.0, 8.0, 0.1));
        let mut tree = Octree::new(root, OctreeConfig::default());
        assert!(tree.insert(Aabb::new(Vec3::new(5.0, 5.0, 0.0), Vec3::new(5.2, 5.2, 0.05)), 0));
        assert!(tree.depth() > 1);

        let mut found = Vec::new();
        tree.aabb_query(cube(Vec3::new(5.1, 5.1, 0.0), 0.2), &mut found);
        assert_eq!(found, vec![0]);
    }

    #[test]
    fn test_remove_empty_nodes() {
        let mut tree = world();
        tree.insert(cube(Vec3::splat(5.0), 0.1), 0);
        let before = tree.depth();

        tree.remove_empty_nodes();
        assert_eq!(tree.depth(), before);
        assert_eq!(tree.len(), 1);

        tree.reset(tree.aabb());
        tree.remove_empty_nodes();
        assert_eq!(tree.depth(), 1);
    }
}
