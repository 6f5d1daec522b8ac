//! Explicit memoization of inside/outside classification per octree leaf.
//!
//! The original motivation: classifying many points against a closed surface
//! repeats a full nearest-shape query per point, yet every point inside an
//! *empty* leaf octant must lie on the same side of the surface (no surface
//! geometry passes through it). The cache records that per leaf slot.
//!
//! Invalidation is explicit: the cache stores the octree generation it was
//! filled against and clears itself whenever the tree has mutated since.

use std::collections::HashMap;

use crate::octree::{ChildRef, Octree};
use crate::traits::shape::ShapeSet;
use crate::types::{Point3, RealScalar, VolumeType};

/// Caller-owned memo table for [`Octree::find_inside`] results, keyed by
/// leaf slot (node id and octant).
#[derive(Debug, Clone, Default)]
pub struct VolumeCache {
    generation: Option<u64>,
    entries: HashMap<u64, VolumeType>,
}

impl VolumeCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of memoized leaf slots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is memoized yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Classify `point`, reusing a memoized answer when its leaf octant is
    /// known to lie entirely on one side of the surface.
    pub fn classify<T: RealScalar, S: ShapeSet<T>>(
        &mut self,
        tree: &Octree<T, S>,
        point: &Point3<T>,
    ) -> VolumeType {
        if self.generation != Some(tree.generation()) {
            self.entries.clear();
            self.generation = Some(tree.generation());
        }

        if tree.node_count() == 0 || !tree.nodes[0].bb.contains(point) {
            // Out-of-domain points are still classifiable, just not cacheable
            // by leaf slot.
            return tree.find_inside(point);
        }

        let (node_id, oct) = tree.descend_to_leaf(point);
        let key = (node_id as u64) << 3 | oct as u64;
        if let Some(&vt) = self.entries.get(&key) {
            if vt != VolumeType::Mixed {
                return vt;
            }
        } else {
            let vt = tree.find_inside(point);
            // Only an empty octant is guaranteed single-sided; a leaf with
            // contents straddles the surface and stays per-point.
            let slot_empty = matches!(tree.nodes[node_id].children[oct], ChildRef::Empty);
            let memo = if slot_empty && vt != VolumeType::Unknown {
                vt
            } else {
                VolumeType::Mixed
            };
            self.entries.insert(key, memo);
            return vt;
        }
        tree.find_inside(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::shape_sets::TriangleSurface;

    // Unit tetrahedron with outward normals
    fn tet_fixture() -> (Vec<[f64; 3]>, Vec<[usize; 3]>) {
        let points = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let triangles = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
        (points, triangles)
    }

    #[test]
    fn test_cached_classification_matches_direct() {
        let (points, triangles) = tet_fixture();
        let surface = TriangleSurface::new(&points, &triangles);
        let bb = BoundingBox::new([-1.0, -1.0, -1.0], [2.0, 2.0, 2.0]);
        let tree = Octree::new(surface, bb, 4, 2.0, 100.0);

        let mut cache = VolumeCache::new();
        let samples = [
            [0.1, 0.1, 0.1],
            [0.15, 0.12, 0.1],
            [1.5, 1.5, 1.5],
            [-0.5, -0.5, -0.5],
        ];
        for p in &samples {
            let direct = tree.find_inside(p);
            assert_eq!(cache.classify(&tree, p), direct);
            // Second lookup takes the memoized path
            assert_eq!(cache.classify(&tree, p), direct);
        }
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_cache_invalidated_by_mutation() {
        let points = vec![[0.25, 0.25, 0.25], [0.75, 0.75, 0.75]];
        let set = crate::shape_sets::DynamicPointSet::from_points(points);
        let bb = BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let mut tree = Octree::new(set, bb, 4, 1.0, 100.0);

        let mut cache = VolumeCache::new();
        cache.classify(&tree, &[0.1, 0.1, 0.1]);
        let filled = cache.len();
        assert!(filled > 0);

        let idx = tree.shapes_mut().append([0.1, 0.9, 0.1]);
        tree.insert(idx);
        cache.classify(&tree, &[0.1, 0.1, 0.1]);
        // Mutation bumped the generation, so the old entries were dropped
        assert!(cache.len() <= filled + 1);
    }
}
