//! Indexed octree over a [`ShapeSet`].
//!
//! The tree is a flat arena: interior nodes live in one `Vec` and reference
//! each other (and leaf content lists) by tagged index, so the structure is
//! relocatable and serializable without pointer patching. A shape index may
//! appear in several leaves when its geometry straddles octant boundaries;
//! the `max_duplicity` tuning parameter bounds the resulting blowup.

pub mod io;
pub mod node;
pub mod volume;

use std::collections::HashSet;
use std::fmt;

use itertools::Itertools;
use log::warn;

use crate::geometry::primitives::{add, dist_sq, mag_sq, scale, sub};
use crate::geometry::BoundingBox;
use crate::traits::shape::{LineNearest, Nearest, ShapeSet};
use crate::types::{Hit, Point3, RealScalar, VolumeType};

pub use node::{ChildRef, Node};
pub use volume::VolumeCache;

/// Perturbation applied when a segment walk lands exactly on a node
/// boundary, relative to the smallest span of the local leaf box.
pub const PERTURB_TOL: f64 = 1e-6;

/// Hard cap on leaf steps in a segment walk. A well-formed tree never gets
/// close; hitting it indicates corrupt geometry and aborts the walk.
const MAX_LINE_STEPS: usize = 100_000;

/// The indexed octree.
///
/// Built once over a shape set and an overall (pre-inflated) query domain;
/// read queries never mutate. [`Octree::insert`] and [`Octree::remove`]
/// support the dynamic workload and bump an internal generation counter that
/// external memo tables (see [`VolumeCache`]) use for invalidation.
#[derive(Debug, Clone)]
pub struct Octree<T: RealScalar, S: ShapeSet<T>> {
    shapes: S,
    bb: BoundingBox<T>,
    pub(crate) nodes: Vec<Node<T>>,
    pub(crate) contents: Vec<Vec<usize>>,
    pub(crate) max_levels: usize,
    pub(crate) max_leaf_ratio: T,
    pub(crate) max_duplicity: T,
    generation: u64,
}

impl<T: RealScalar, S: ShapeSet<T>> Octree<T, S> {
    /// Build a tree over `shapes` covering the domain `bb`.
    ///
    /// Subdivision proceeds level by level while the depth budget lasts, the
    /// mean leaf occupancy exceeds `max_leaf_ratio` and the mean duplicity
    /// (total leaf entries per shape) stays within `max_duplicity`.
    ///
    /// An empty shape set yields a tree whose queries all miss. A non-empty
    /// shape set with a null domain box is a configuration error and panics.
    pub fn new(
        shapes: S,
        bb: BoundingBox<T>,
        max_levels: usize,
        max_leaf_ratio: T,
        max_duplicity: T,
    ) -> Self {
        assert!(max_levels >= 1, "octree needs at least one level");
        let n_shapes = shapes.size();
        assert!(
            n_shapes == 0 || !bb.is_null(),
            "degenerate overall bounding box for an octree over {} shapes",
            n_shapes
        );

        let mut tree = Self {
            shapes,
            bb,
            nodes: Vec::new(),
            contents: Vec::new(),
            max_levels,
            max_leaf_ratio,
            max_duplicity,
            generation: 0,
        };
        if n_shapes == 0 {
            return tree;
        }

        tree.push_node(bb, None);
        tree.distribute(0, (0..n_shapes).collect());

        loop {
            let stats = tree.statistics();
            if stats.mean_occupancy <= tree.max_leaf_ratio.to_f64().unwrap() {
                break;
            }
            if stats.mean_duplicity > tree.max_duplicity.to_f64().unwrap() {
                break;
            }

            let splittable = tree.overloaded_leaves();
            if splittable.is_empty() {
                break;
            }
            for (node_id, oct) in splittable {
                tree.split_leaf(node_id, oct);
            }
        }

        tree.compact();
        tree
    }

    /// Reassemble a tree from decoded parts (stream reading).
    pub(crate) fn from_parts(
        shapes: S,
        bb: BoundingBox<T>,
        nodes: Vec<Node<T>>,
        contents: Vec<Vec<usize>>,
        max_levels: usize,
        max_leaf_ratio: T,
        max_duplicity: T,
    ) -> Self {
        Self {
            shapes,
            bb,
            nodes,
            contents,
            max_levels,
            max_leaf_ratio,
            max_duplicity,
            generation: 0,
        }
    }

    /// The shape set this tree indexes.
    pub fn shapes(&self) -> &S {
        &self.shapes
    }

    /// Mutable access to the shape set, for growing a dynamic collection
    /// before [`Octree::insert`]. Mutating geometry already indexed without
    /// re-inserting it invalidates the tree.
    pub fn shapes_mut(&mut self) -> &mut S {
        &mut self.shapes
    }

    /// The overall domain box the tree was built with.
    pub fn bounding_box(&self) -> &BoundingBox<T> {
        &self.bb
    }

    /// Number of interior nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Mutation counter; bumped by every [`Octree::insert`]/[`Octree::remove`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Every leaf as (leaf box, contained shape indices), in node order.
    pub fn leaves(&self) -> Vec<(BoundingBox<T>, &[usize])> {
        let mut out = Vec::new();
        for node in &self.nodes {
            for (oct, child) in node.children.iter().enumerate() {
                if let ChildRef::Contents(ci) = child {
                    out.push((node.bb.octant(oct), self.contents[*ci].as_slice()));
                }
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Construction internals
    // ------------------------------------------------------------------

    fn push_node(&mut self, bb: BoundingBox<T>, parent: Option<usize>) -> usize {
        self.nodes.push(Node {
            bb,
            parent,
            children: [ChildRef::Empty; 8],
        });
        self.nodes.len() - 1
    }

    /// Distribute `indices` into the children of `node_id`, filling its
    /// slots. A shape lands in every octant it overlaps; a shape outside the
    /// domain is kept in the octant under its bounds midpoint so no index is
    /// ever lost.
    fn distribute(&mut self, node_id: usize, indices: Vec<usize>) {
        let bb = self.nodes[node_id].bb;
        let octants: Vec<BoundingBox<T>> = (0..8).map(|o| bb.octant(o)).collect();
        let mut buckets: [Vec<usize>; 8] = Default::default();

        for i in indices {
            let mut matched = false;
            for (o, obb) in octants.iter().enumerate() {
                if self.shapes.overlaps_box(i, obb) {
                    buckets[o].push(i);
                    matched = true;
                }
            }
            if !matched {
                let mid = self.shapes.bounds(&[i]).midpoint();
                buckets[bb.octant_containing(&mid)].push(i);
            }
        }

        for (o, bucket) in buckets.into_iter().enumerate() {
            self.nodes[node_id].children[o] = if bucket.is_empty() {
                ChildRef::Empty
            } else {
                self.contents.push(bucket);
                ChildRef::Contents(self.contents.len() - 1)
            };
        }
    }

    /// Leaves above the occupancy threshold with depth budget remaining.
    fn overloaded_leaves(&self) -> Vec<(usize, usize)> {
        let threshold = self.split_threshold();
        let mut out = Vec::new();
        for (n, node) in self.nodes.iter().enumerate() {
            if self.depth(n) + 1 >= self.max_levels {
                continue;
            }
            for (oct, child) in node.children.iter().enumerate() {
                if let ChildRef::Contents(ci) = child {
                    if self.contents[*ci].len() > threshold {
                        out.push((n, oct));
                    }
                }
            }
        }
        out
    }

    fn split_threshold(&self) -> usize {
        (self.max_leaf_ratio.to_f64().unwrap().ceil() as usize).max(1)
    }

    /// Number of parent links from node `n` to the root.
    fn depth(&self, mut n: usize) -> usize {
        let mut d = 0;
        while let Some(p) = self.nodes[n].parent {
            n = p;
            d += 1;
        }
        d
    }

    /// Turn the leaf in octant `oct` of `node_id` into an interior node,
    /// redistributing its contents.
    fn split_leaf(&mut self, node_id: usize, oct: usize) {
        let ChildRef::Contents(ci) = self.nodes[node_id].children[oct] else {
            panic!(
                "split_leaf: slot {} of node {} is not a content reference",
                oct, node_id
            );
        };
        let child_bb = self.nodes[node_id].bb.octant(oct);
        let indices = std::mem::take(&mut self.contents[ci]);
        let new_node = self.push_node(child_bb, Some(node_id));
        self.nodes[node_id].children[oct] = ChildRef::Node(new_node);
        self.distribute(new_node, indices);
    }

    /// Reorder content lists into depth-first node order and drop lists
    /// orphaned by leaf splits, so storage is contiguous in traversal order.
    fn compact(&mut self) {
        if self.nodes.is_empty() {
            self.contents.clear();
            return;
        }
        let mut new_contents = Vec::with_capacity(self.contents.len());
        let mut stack = vec![0usize];
        while let Some(n) = stack.pop() {
            for oct in 0..8 {
                match self.nodes[n].children[oct] {
                    ChildRef::Node(c) => stack.push(c),
                    ChildRef::Contents(ci) => {
                        new_contents.push(std::mem::take(&mut self.contents[ci]));
                        self.nodes[n].children[oct] = ChildRef::Contents(new_contents.len() - 1);
                    }
                    ChildRef::Empty => {}
                }
            }
        }
        self.contents = new_contents;
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Nearest shape to `sample` within `max_dist_sq`, branch-and-bound over
    /// octants in order of increasing box lower-bound distance.
    pub fn find_nearest(&self, sample: &Point3<T>, max_dist_sq: T) -> Hit<T> {
        let mut nearest = Nearest::with_bound(max_dist_sq);
        if !self.nodes.is_empty() {
            self.nearest_descend(0, sample, &mut nearest);
        }
        match nearest.index {
            Some(i) => Hit::hit(i, nearest.point),
            None => Hit::miss(),
        }
    }

    fn nearest_descend(&self, node_id: usize, sample: &Point3<T>, nearest: &mut Nearest<T>) {
        let node = &self.nodes[node_id];
        let order = (0..8)
            .filter(|&o| node.children[o] != ChildRef::Empty)
            .map(|o| (node.bb.octant(o).distance_sq(sample), o))
            .sorted_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

        for (lower_bound, oct) in order {
            if lower_bound >= nearest.dist_sq {
                break;
            }
            match node.children[oct] {
                ChildRef::Node(c) => self.nearest_descend(c, sample, nearest),
                ChildRef::Contents(ci) => {
                    self.shapes.find_nearest(&self.contents[ci], sample, nearest)
                }
                ChildRef::Empty => {}
            }
        }
    }

    /// Nearest shape to the segment `[start, end]`. Descent is pruned by the
    /// tightest box around the segment inflated by the best distance so far.
    pub fn find_nearest_to_line(&self, start: &Point3<T>, end: &Point3<T>) -> LineNearest<T> {
        let mut nearest = LineNearest::unbounded();
        if !self.nodes.is_empty() {
            self.line_nearest_descend(0, start, end, &mut nearest);
        }
        nearest
    }

    fn line_nearest_descend(
        &self,
        node_id: usize,
        start: &Point3<T>,
        end: &Point3<T>,
        nearest: &mut LineNearest<T>,
    ) {
        let node = &self.nodes[node_id];
        for oct in 0..8 {
            if node.children[oct] == ChildRef::Empty {
                continue;
            }
            if nearest.dist_sq.is_finite() {
                let tight =
                    BoundingBox::from_points([start, end]).expanded(nearest.dist_sq.sqrt());
                if !node.bb.octant(oct).overlaps(&tight) {
                    continue;
                }
            }
            match node.children[oct] {
                ChildRef::Node(c) => self.line_nearest_descend(c, start, end, nearest),
                ChildRef::Contents(ci) => {
                    self.shapes
                        .nearest_to_line(&self.contents[ci], start, end, nearest)
                }
                ChildRef::Empty => {}
            }
        }
    }

    /// Nearest intersection of the segment `[start, end]` with any indexed
    /// shape, walking the tree leaf by leaf along the segment.
    pub fn find_line(&self, start: &Point3<T>, end: &Point3<T>) -> Hit<T> {
        self.find_line_impl(start, end, false)
    }

    /// Any intersection of the segment with an indexed shape, first one
    /// found wins. Order-independent, cheaper than [`Octree::find_line`];
    /// intended for visibility tests.
    pub fn find_any_line(&self, start: &Point3<T>, end: &Point3<T>) -> Hit<T> {
        self.find_line_impl(start, end, true)
    }

    fn find_line_impl(&self, start: &Point3<T>, end: &Point3<T>, find_any: bool) -> Hit<T> {
        if self.nodes.is_empty() {
            return Hit::miss();
        }
        let root_bb = self.nodes[0].bb;
        let dir = sub(end, start);
        let dir_len = mag_sq(&dir).sqrt();
        let Some((t_entry, _)) = clip_segment_to_box(start, &dir, &root_bb) else {
            return Hit::miss();
        };
        if dir_len <= T::min_positive_value() {
            // Degenerate segment: test the single leaf under the point
            return self.point_leaf_hit(start, end);
        }

        let perturb = T::from(PERTURB_TOL).unwrap();
        let mut t = t_entry;
        for _ in 0..MAX_LINE_STEPS {
            if t > T::one() {
                break;
            }
            let p = add(start, &scale(&dir, t));
            if !root_bb.contains(&p) {
                break;
            }
            let (node_id, oct) = self.descend_to_leaf(&p);
            let leaf_bb = self.nodes[node_id].bb.octant(oct);

            if let ChildRef::Contents(ci) = self.nodes[node_id].children[oct] {
                let mut best: Option<(T, Point3<T>, usize)> = None;
                for &i in &self.contents[ci] {
                    if let Some(pt) = self.shapes.intersects_line(i, &p, end) {
                        if find_any {
                            return Hit::hit(i, pt);
                        }
                        let d2 = dist_sq(&pt, start);
                        if best.map_or(true, |(b, _, _)| d2 < b) {
                            best = Some((d2, pt, i));
                        }
                    }
                }
                // A hit beyond this leaf's box may be beaten in a later
                // leaf; the shape is duplicated there and retested.
                if let Some((_, pt, i)) = best {
                    let tol = perturb * leaf_bb.min_span();
                    if leaf_bb.expanded(tol).contains(&pt) {
                        return Hit::hit(i, pt);
                    }
                }
            }

            // Step past the exit face of this leaf, nudged forward so a point
            // exactly on the boundary cannot stall the walk.
            let t_exit = exit_param(&leaf_bb, start, &dir);
            let t_step = perturb * leaf_bb.min_span() / dir_len;
            t = t_exit.max(t) + t_step;
        }
        Hit::miss()
    }

    fn point_leaf_hit(&self, start: &Point3<T>, end: &Point3<T>) -> Hit<T> {
        if !self.nodes[0].bb.contains(start) {
            return Hit::miss();
        }
        let (node_id, oct) = self.descend_to_leaf(start);
        if let ChildRef::Contents(ci) = self.nodes[node_id].children[oct] {
            for &i in &self.contents[ci] {
                if let Some(pt) = self.shapes.intersects_line(i, start, end) {
                    return Hit::hit(i, pt);
                }
            }
        }
        Hit::miss()
    }

    /// Leaf slot (node, octant) under `p`; `p` must lie in the root box.
    fn descend_to_leaf(&self, p: &Point3<T>) -> (usize, usize) {
        let mut n = 0;
        loop {
            let oct = self.nodes[n].bb.octant_containing(p);
            match self.nodes[n].children[oct] {
                ChildRef::Node(c) => n = c,
                _ => return (n, oct),
            }
        }
    }

    /// Whether any shape overlaps the region box; early-exits on the first.
    pub fn overlaps_box(&self, region: &BoundingBox<T>) -> bool {
        !self.nodes.is_empty() && self.box_descend(0, region, &mut None)
    }

    /// Collect all shapes overlapping the region box into `out`.
    pub fn find_box(&self, region: &BoundingBox<T>, out: &mut HashSet<usize>) {
        if !self.nodes.is_empty() {
            self.box_descend(0, region, &mut Some(out));
        }
    }

    fn box_descend(
        &self,
        node_id: usize,
        region: &BoundingBox<T>,
        out: &mut Option<&mut HashSet<usize>>,
    ) -> bool {
        let node = &self.nodes[node_id];
        let mut found = false;
        for oct in 0..8 {
            if node.children[oct] == ChildRef::Empty || !node.bb.octant(oct).overlaps(region) {
                continue;
            }
            match node.children[oct] {
                ChildRef::Node(c) => {
                    if self.box_descend(c, region, out) {
                        if out.is_none() {
                            return true;
                        }
                        found = true;
                    }
                }
                ChildRef::Contents(ci) => {
                    for &i in &self.contents[ci] {
                        if self.shapes.overlaps_box(i, region) {
                            match out {
                                Some(set) => {
                                    set.insert(i);
                                    found = true;
                                }
                                None => return true,
                            }
                        }
                    }
                }
                ChildRef::Empty => {}
            }
        }
        found
    }

    /// Whether any shape overlaps the sphere; early-exits on the first.
    pub fn overlaps_sphere(&self, centre: &Point3<T>, radius_sq: T) -> bool {
        !self.nodes.is_empty() && self.sphere_descend(0, centre, radius_sq, &mut None)
    }

    /// Collect all shapes overlapping the sphere into `out`.
    pub fn find_sphere(&self, centre: &Point3<T>, radius_sq: T, out: &mut HashSet<usize>) {
        if !self.nodes.is_empty() {
            self.sphere_descend(0, centre, radius_sq, &mut Some(out));
        }
    }

    fn sphere_descend(
        &self,
        node_id: usize,
        centre: &Point3<T>,
        radius_sq: T,
        out: &mut Option<&mut HashSet<usize>>,
    ) -> bool {
        let node = &self.nodes[node_id];
        let mut found = false;
        for oct in 0..8 {
            if node.children[oct] == ChildRef::Empty
                || !node.bb.octant(oct).overlaps_sphere(centre, radius_sq)
            {
                continue;
            }
            match node.children[oct] {
                ChildRef::Node(c) => {
                    if self.sphere_descend(c, centre, radius_sq, out) {
                        if out.is_none() {
                            return true;
                        }
                        found = true;
                    }
                }
                ChildRef::Contents(ci) => {
                    for &i in &self.contents[ci] {
                        if self.shapes.overlaps_sphere(i, centre, radius_sq) {
                            match out {
                                Some(set) => {
                                    set.insert(i);
                                    found = true;
                                }
                                None => return true,
                            }
                        }
                    }
                }
                ChildRef::Empty => {}
            }
        }
        found
    }

    /// Classify `point` against the indexed (closed) surface: nearest shape
    /// first, then the shape set's side test. Works for points arbitrarily
    /// far from the surface; [`VolumeType::Unknown`] when the shape set
    /// cannot decide or the tree is empty.
    pub fn find_inside(&self, point: &Point3<T>) -> VolumeType {
        let hit = self.find_nearest(point, T::infinity());
        match hit.index {
            Some(i) => self.shapes.volume_type(i, point),
            None => VolumeType::Unknown,
        }
    }

    // ------------------------------------------------------------------
    // Dynamic mutation
    // ------------------------------------------------------------------

    /// Index shape `index` (which must already exist in the shape set),
    /// adding it to every leaf it overlaps and splitting leaves that become
    /// overloaded within the depth budget.
    pub fn insert(&mut self, index: usize) {
        assert!(
            index < self.shapes.size(),
            "insert: shape index {} out of range ({} shapes)",
            index,
            self.shapes.size()
        );
        self.generation += 1;
        if self.nodes.is_empty() {
            assert!(
                !self.bb.is_null(),
                "insert into an octree with a null domain box"
            );
            self.push_node(self.bb, None);
        }
        self.insert_descend(0, index);
    }

    fn insert_descend(&mut self, node_id: usize, index: usize) {
        let bb = self.nodes[node_id].bb;
        let mut matched = false;
        for oct in 0..8 {
            if self.shapes.overlaps_box(index, &bb.octant(oct)) {
                matched = true;
                self.insert_into_slot(node_id, oct, index);
            }
        }
        if !matched {
            let mid = self.shapes.bounds(&[index]).midpoint();
            self.insert_into_slot(node_id, bb.octant_containing(&mid), index);
        }
    }

    fn insert_into_slot(&mut self, node_id: usize, oct: usize, index: usize) {
        match self.nodes[node_id].children[oct] {
            ChildRef::Node(c) => self.insert_descend(c, index),
            ChildRef::Contents(ci) => {
                if !self.contents[ci].contains(&index) {
                    self.contents[ci].push(index);
                }
                if self.contents[ci].len() > self.split_threshold()
                    && self.depth(node_id) + 1 < self.max_levels
                {
                    self.split_leaf(node_id, oct);
                }
            }
            ChildRef::Empty => {
                self.contents.push(vec![index]);
                self.nodes[node_id].children[oct] =
                    ChildRef::Contents(self.contents.len() - 1);
            }
        }
    }

    /// Erase shape `index` from every leaf referencing it. Leaves may become
    /// empty; they are never merged (a rebuild is cheaper than rebalancing
    /// for this workload) and never dangle.
    pub fn remove(&mut self, index: usize) {
        self.generation += 1;
        for list in &mut self.contents {
            list.retain(|&i| i != index);
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Structural counters for this tree.
    pub fn statistics(&self) -> TreeStatistics {
        let mut n_leaves = 0usize;
        let mut n_entries = 0usize;
        let mut max_depth = 0usize;
        for (n, node) in self.nodes.iter().enumerate() {
            let d = self.depth(n);
            max_depth = max_depth.max(d + 1);
            for child in &node.children {
                if let ChildRef::Contents(ci) = child {
                    n_leaves += 1;
                    n_entries += self.contents[*ci].len();
                }
            }
        }
        let n_shapes = self.shapes.size();
        TreeStatistics {
            n_nodes: self.nodes.len(),
            n_leaves,
            n_entries,
            n_shapes,
            max_depth,
            mean_occupancy: n_entries as f64 / n_leaves.max(1) as f64,
            mean_duplicity: n_entries as f64 / n_shapes.max(1) as f64,
        }
    }

    /// Dump every leaf box as an OBJ hexahedron, a side-channel debugging
    /// aid for 3D viewers.
    pub fn write_obj<W: std::io::Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "# octree leaf boxes")?;
        let mut vert = 1usize;
        for (bb, contents) in self.leaves() {
            writeln!(w, "# leaf with {} shapes", contents.len())?;
            for k in 0..8 {
                let c = [
                    if k & 1 != 0 { bb.max[0] } else { bb.min[0] },
                    if k & 2 != 0 { bb.max[1] } else { bb.min[1] },
                    if k & 4 != 0 { bb.max[2] } else { bb.min[2] },
                ];
                writeln!(w, "v {} {} {}", c[0], c[1], c[2])?;
            }
            for quad in [
                [0, 1, 3, 2],
                [4, 5, 7, 6],
                [0, 1, 5, 4],
                [2, 3, 7, 6],
                [0, 2, 6, 4],
                [1, 3, 7, 5],
            ] {
                writeln!(
                    w,
                    "f {} {} {} {}",
                    vert + quad[0],
                    vert + quad[1],
                    vert + quad[2],
                    vert + quad[3]
                )?;
            }
            vert += 8;
        }
        Ok(())
    }
}

/// Structural counters reported by [`Octree::statistics`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeStatistics {
    /// Interior node count.
    pub n_nodes: usize,
    /// Leaf (content-list) count.
    pub n_leaves: usize,
    /// Total entries over all leaves (each duplicate counted).
    pub n_entries: usize,
    /// Shapes in the underlying set.
    pub n_shapes: usize,
    /// Deepest level in use (root node = level 1).
    pub max_depth: usize,
    /// Mean entries per leaf.
    pub mean_occupancy: f64,
    /// Mean leaves referencing the same shape.
    pub mean_duplicity: f64,
}

impl fmt::Display for TreeStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "octree statistics:")?;
        writeln!(f, "  nodes     : {}", self.n_nodes)?;
        writeln!(f, "  leaves    : {}", self.n_leaves)?;
        writeln!(f, "  entries   : {}", self.n_entries)?;
        writeln!(f, "  shapes    : {}", self.n_shapes)?;
        writeln!(f, "  depth     : {}", self.max_depth)?;
        writeln!(f, "  occupancy : {:.3}", self.mean_occupancy)?;
        write!(f, "  duplicity : {:.3}", self.mean_duplicity)
    }
}

/// Clip the parametrised segment `start + t * dir`, `t` in `[0, 1]`, against
/// a box; `None` if the segment misses it entirely.
fn clip_segment_to_box<T: RealScalar>(
    start: &Point3<T>,
    dir: &Point3<T>,
    bb: &BoundingBox<T>,
) -> Option<(T, T)> {
    let mut t0 = T::zero();
    let mut t1 = T::one();
    for d in 0..3 {
        if dir[d].abs() <= T::min_positive_value() {
            if start[d] < bb.min[d] || start[d] > bb.max[d] {
                return None;
            }
        } else {
            let ta = (bb.min[d] - start[d]) / dir[d];
            let tb = (bb.max[d] - start[d]) / dir[d];
            let (lo, hi) = if ta < tb { (ta, tb) } else { (tb, ta) };
            t0 = t0.max(lo);
            t1 = t1.min(hi);
            if t0 > t1 {
                return None;
            }
        }
    }
    Some((t0, t1))
}

/// Smallest parameter at which `start + t * dir` leaves `bb`, assuming the
/// segment currently lies inside it.
fn exit_param<T: RealScalar>(bb: &BoundingBox<T>, start: &Point3<T>, dir: &Point3<T>) -> T {
    let mut t_exit = T::infinity();
    for d in 0..3 {
        let t = if dir[d] > T::zero() {
            (bb.max[d] - start[d]) / dir[d]
        } else if dir[d] < T::zero() {
            (bb.min[d] - start[d]) / dir[d]
        } else {
            continue;
        };
        t_exit = t_exit.min(t);
    }
    if t_exit.is_infinite() {
        warn!("segment walk: zero-direction exit, aborting walk");
        T::infinity()
    } else {
        t_exit
    }
}
