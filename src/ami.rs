//! Arbitrary mesh interface (AMI) interpolation: weighted face-to-face
//! addressing between two independently discretised surface patches.
//!
//! Lifecycle: uninitialized, then [`AmiInterpolation::calculate`] builds the
//! addressing, [`AmiInterpolation::normalise_weights`] scales it, and the
//! result may be coarsened ([`AmiInterpolation::agglomerate`]) or merged
//! with a second interpolation ([`AmiInterpolation::append`]). The tables
//! are immutable between those calls; [`AmiInterpolation::reset`] returns to
//! the uninitialized state.

pub mod io;
pub mod method;

use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use log::warn;
use rayon::prelude::*;

use crate::geometry::primitives::{add, dot, polygon_overlap_area, scale};
use crate::geometry::BoundingBox;
use crate::octree::Octree;
use crate::parallel::{remap_compact, Communicator, DistributionMap};
use crate::patch::SurfacePatch;
use crate::shape_sets::{FaceSet, PointSet, TriangleSurface};
use crate::types::{Point3, RealScalar};

pub use method::AmiMethod;

/// Candidate boxes are inflated by this fraction of their diagonal before
/// the octree box query, so shared-edge neighbours are not missed to
/// round-off.
const CANDIDATE_INFLATION: f64 = 0.01;

/// Octree tuning for the per-calculate candidate trees.
const TREE_MAX_LEVELS: usize = 8;
const TREE_MAX_LEAF_RATIO: f64 = 4.0;
const TREE_MAX_DUPLICITY: f64 = 20.0;

/// Who owns interpolation faces, decided by a collective size query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    /// No partition owns any source faces; nothing to interpolate.
    Empty,
    /// Exactly one partition owns faces; the computation is local to it.
    Local(usize),
    /// Several partitions own faces; geometry must be exchanged.
    Distributed,
}

/// Decide the ownership distribution from each partition's local source
/// face count. Collective: every participating rank must call it.
pub fn calc_distribution<C: Communicator>(n_local_src_faces: usize, comm: &C) -> Distribution {
    let sizes = comm.all_gather_usize(n_local_src_faces);
    let owners: Vec<usize> = sizes
        .iter()
        .enumerate()
        .filter(|(_, &n)| n > 0)
        .map(|(rank, _)| rank)
        .collect();
    match owners.len() {
        0 => Distribution::Empty,
        1 => Distribution::Local(owners[0]),
        _ => Distribution::Distributed,
    }
}

/// One side of the interpolation: per-face address and weight lists plus
/// the cached geometry and the distributed exchange map.
#[derive(Debug, Clone)]
struct Addressing<T> {
    addresses: Vec<Vec<usize>>,
    weights: Vec<Vec<T>>,
    weight_sums: Vec<T>,
    areas: Vec<T>,
    centroids: Vec<Point3<T>>,
    map: DistributionMap,
}

impl<T> Default for Addressing<T> {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            weights: Vec::new(),
            weight_sums: Vec::new(),
            areas: Vec::new(),
            centroids: Vec::new(),
            map: DistributionMap::default(),
        }
    }
}

impl<T: RealScalar> Addressing<T> {
    fn sized(n_faces: usize) -> Self {
        Self {
            addresses: vec![Vec::new(); n_faces],
            weights: vec![Vec::new(); n_faces],
            weight_sums: vec![T::zero(); n_faces],
            areas: vec![T::zero(); n_faces],
            centroids: vec![[T::zero(); 3]; n_faces],
            map: DistributionMap::default(),
        }
    }

    fn n_faces(&self) -> usize {
        self.addresses.len()
    }

    fn cache_geometry(&mut self, patch: &SurfacePatch<T>) {
        for i in 0..patch.n_faces() {
            self.areas[i] = patch.face_area(i);
            self.centroids[i] = patch.face_centre(i);
        }
    }

    fn raw_sums(&mut self) {
        for (i, ws) in self.weights.iter().enumerate() {
            self.weight_sums[i] = ws.iter().fold(T::zero(), |acc, &w| acc + w);
        }
    }

    /// Add `weight` for the pair `(face, other)`, summing onto an existing
    /// entry for the same `other`.
    fn merge_pair(&mut self, face: usize, other: usize, weight: T) {
        match self.addresses[face].iter().position(|&t| t == other) {
            Some(k) => self.weights[face][k] = self.weights[face][k] + weight,
            None => {
                self.addresses[face].push(other);
                self.weights[face].push(weight);
            }
        }
    }
}

/// Face-to-face interpolation weights between a source and a target patch.
#[derive(Debug, Clone)]
pub struct AmiInterpolation<T> {
    method: AmiMethod,
    low_weight_correction: T,
    up_to_date: bool,
    distribution: Distribution,
    src: Addressing<T>,
    tgt: Addressing<T>,
}

impl<T: RealScalar> AmiInterpolation<T> {
    /// Uninitialized interpolation. `low_weight_correction` is the
    /// normalized weight-sum threshold below which a face is reported as
    /// poorly covered; pass zero to disable the diagnostic.
    pub fn new(method: AmiMethod, low_weight_correction: T) -> Self {
        Self {
            method,
            low_weight_correction,
            up_to_date: false,
            distribution: Distribution::Empty,
            src: Addressing::default(),
            tgt: Addressing::default(),
        }
    }

    /// The weight algorithm in use.
    pub fn method(&self) -> AmiMethod {
        self.method
    }

    /// Ownership distribution decided by the last
    /// [`AmiInterpolation::calculate`].
    pub fn distribution(&self) -> Distribution {
        self.distribution
    }

    /// Whether the addressing has been calculated since construction or the
    /// last reset.
    pub fn up_to_date(&self) -> bool {
        self.up_to_date
    }

    /// Per-source-face target address lists.
    pub fn source_addresses(&self) -> &[Vec<usize>] {
        &self.src.addresses
    }

    /// Per-source-face weight lists, parallel to the addresses.
    pub fn source_weights(&self) -> &[Vec<T>] {
        &self.src.weights
    }

    /// Cached per-source-face weight sums.
    pub fn source_weight_sums(&self) -> &[T] {
        &self.src.weight_sums
    }

    /// Per-target-face source address lists.
    pub fn target_addresses(&self) -> &[Vec<usize>] {
        &self.tgt.addresses
    }

    /// Per-target-face weight lists.
    pub fn target_weights(&self) -> &[Vec<T>] {
        &self.tgt.weights
    }

    /// Cached per-target-face weight sums.
    pub fn target_weight_sums(&self) -> &[T] {
        &self.tgt.weight_sums
    }

    /// Build the addressing between `src` and `tgt`. Idempotent once up to
    /// date. An optional projection surface snaps both patches' points onto
    /// a common master surface first (a projection miss panics).
    ///
    /// The collective distribution query runs on every rank; with zero total
    /// source faces no addressing is built and that is not an error. In the
    /// distributed case the geometry exchange is the caller's concern; this
    /// routine computes overlaps for the locally owned faces only.
    pub fn calculate<C: Communicator>(
        &mut self,
        src: &mut SurfacePatch<T>,
        tgt: &mut SurfacePatch<T>,
        projection: Option<&Octree<T, TriangleSurface<'_, T>>>,
        comm: &C,
    ) {
        if self.up_to_date {
            return;
        }

        if let Some(surface) = projection {
            src.project_points_onto(surface, T::infinity());
            tgt.project_points_onto(surface, T::infinity());
        }

        self.distribution = calc_distribution(src.n_faces(), comm);
        self.src = Addressing::sized(src.n_faces());
        self.tgt = Addressing::sized(tgt.n_faces());
        self.src.cache_geometry(src);
        self.tgt.cache_geometry(tgt);

        if self.distribution == Distribution::Empty {
            self.up_to_date = true;
            return;
        }
        if self.distribution == Distribution::Distributed {
            warn!(
                "AMI patches span {} partitions; computing locally owned overlaps only",
                comm.size()
            );
        }

        let pairs = match self.method {
            AmiMethod::FaceAreaWeight => face_area_weight_pairs(src, tgt),
            AmiMethod::MapNearest => map_nearest_pairs(src, tgt),
        };

        for (s, (addrs, ws)) in pairs.into_iter().enumerate() {
            for (&t, &w) in addrs.iter().zip(&ws) {
                self.tgt.addresses[t].push(s);
                self.tgt.weights[t].push(w);
            }
            self.src.addresses[s] = addrs;
            self.src.weights[s] = ws;
        }
        self.src.raw_sums();
        self.tgt.raw_sums();
        self.up_to_date = true;
    }

    /// Normalize both sides' weight lists.
    ///
    /// Conformal patches divide by the face's own area, so well-covered
    /// faces sum to about one; non-conformal patches divide by the raw
    /// overlap sum. Faces whose normalized sum falls below the
    /// low-weight threshold are counted and reported with a warning; the
    /// caller decides whether to apply a correction.
    pub fn normalise_weights(&mut self, conformal: bool) {
        let low = self.low_weight_correction;
        for (side, name) in [(&mut self.src, "source"), (&mut self.tgt, "target")] {
            let mut n_low = 0usize;
            for i in 0..side.n_faces() {
                let raw = side.weights[i].iter().fold(T::zero(), |acc, &w| acc + w);
                let denom = if conformal { side.areas[i] } else { raw };
                if denom > T::zero() {
                    for w in &mut side.weights[i] {
                        *w = *w / denom;
                    }
                }
                let sum = side.weights[i].iter().fold(T::zero(), |acc, &w| acc + w);
                side.weight_sums[i] = sum;
                if low > T::zero() && sum < low {
                    n_low += 1;
                }
            }
            if n_low > 0 {
                warn!(
                    "{} of {} {} faces have weight sum below {}",
                    n_low,
                    side.n_faces(),
                    name,
                    low
                );
            }
        }
    }

    /// Check that source and target addressing are mutually consistent:
    /// every (source, target) pair appears on both sides. Holds for
    /// non-distributed runs; a distributed run only sees its local half.
    pub fn check_symmetry(&self) -> bool {
        for (s, addrs) in self.src.addresses.iter().enumerate() {
            for &t in addrs {
                if !self.tgt.addresses[t].contains(&s) {
                    return false;
                }
            }
        }
        for (t, addrs) in self.tgt.addresses.iter().enumerate() {
            for &s in addrs {
                if !self.src.addresses[s].contains(&t) {
                    return false;
                }
            }
        }
        true
    }

    /// Coarsen `fine` through the given restriction maps (fine face index
    /// to coarse face index), summing the weights of fine pairs that map to
    /// the same coarse pair.
    ///
    /// Panics when a restriction map's length differs from the fine face
    /// count: silent index-shifting would produce wrong answers everywhere
    /// downstream.
    pub fn agglomerate(
        fine: &Self,
        src_restrict: &[usize],
        n_coarse_src: usize,
        tgt_restrict: &[usize],
        n_coarse_tgt: usize,
    ) -> Self {
        assert!(
            src_restrict.len() == fine.src.n_faces(),
            "source restriction maps {} faces, fine interpolation has {}",
            src_restrict.len(),
            fine.src.n_faces()
        );
        assert!(
            tgt_restrict.len() == fine.tgt.n_faces(),
            "target restriction maps {} faces, fine interpolation has {}",
            tgt_restrict.len(),
            fine.tgt.n_faces()
        );

        let mut coarse = Self::new(fine.method, fine.low_weight_correction);
        coarse.distribution = fine.distribution;
        coarse.src = agglomerate_side(&fine.src, src_restrict, n_coarse_src, tgt_restrict);
        coarse.tgt = agglomerate_side(&fine.tgt, tgt_restrict, n_coarse_tgt, src_restrict);
        coarse.up_to_date = true;
        coarse
    }

    /// Merge `other` (an interpolation over the same two patches, typically
    /// covering a disjoint geometric piece) into this one. Duplicate
    /// (source, target) pairs sum their weights; `other`'s distributed map
    /// slots are renumbered past this interpolation's current maximum
    /// before merging so no indices collide.
    pub fn append(&mut self, other: &Self) {
        assert!(
            self.src.n_faces() == other.src.n_faces()
                && self.tgt.n_faces() == other.tgt.n_faces(),
            "append: face counts differ ({}x{} vs {}x{})",
            self.src.n_faces(),
            self.tgt.n_faces(),
            other.src.n_faces(),
            other.tgt.n_faces()
        );

        append_side(&mut self.src, &other.src);
        append_side(&mut self.tgt, &other.tgt);
    }

    /// Discard all state and return to uninitialized.
    pub fn reset(&mut self) {
        self.up_to_date = false;
        self.distribution = Distribution::Empty;
        self.src = Addressing::default();
        self.tgt = Addressing::default();
    }
}

/// Coarsen one side. Slot compaction of the carried distribution map is
/// deterministic (see [`remap_compact`]) so the opposite rank reaches the
/// same numbering without negotiation.
fn agglomerate_side<T: RealScalar>(
    fine: &Addressing<T>,
    restrict: &[usize],
    n_coarse: usize,
    other_restrict: &[usize],
) -> Addressing<T> {
    let mut coarse = Addressing::sized(n_coarse);

    for (f, &c) in restrict.iter().enumerate() {
        assert!(
            c < n_coarse,
            "restriction maps face {} to {} of {} coarse faces",
            f,
            c,
            n_coarse
        );
        coarse.areas[c] = coarse.areas[c] + fine.areas[f];
        coarse.centroids[c] = add(&coarse.centroids[c], &scale(&fine.centroids[f], fine.areas[f]));
    }
    for c in 0..n_coarse {
        if coarse.areas[c] > T::zero() {
            coarse.centroids[c] = scale(&coarse.centroids[c], coarse.areas[c].recip());
        }
    }

    // BTreeMap keeps coarse pair order deterministic
    let mut tables: Vec<BTreeMap<usize, T>> = vec![BTreeMap::new(); n_coarse];
    for (f, &c) in restrict.iter().enumerate() {
        for (&t, &w) in fine.addresses[f].iter().zip(&fine.weights[f]) {
            let ct = other_restrict[t];
            let entry = tables[c].entry(ct).or_insert_with(T::zero);
            *entry = *entry + w;
        }
    }
    for (c, table) in tables.into_iter().enumerate() {
        for (ct, w) in table {
            coarse.addresses[c].push(ct);
            coarse.weights[c].push(w);
        }
    }
    coarse.raw_sums();

    coarse.map = fine.map.clone();
    remap_compact(&mut coarse.map);
    coarse
}

fn append_side<T: RealScalar>(side: &mut Addressing<T>, other: &Addressing<T>) {
    let offset = side.map.max_construct_index().map_or(0, |m| m + 1);
    let mut incoming = other.map.clone();
    incoming.offset_indices(offset);

    let n_parts = side.map.sub_map.len().max(incoming.sub_map.len());
    side.map.sub_map.resize(n_parts, Vec::new());
    side.map.construct_map.resize(n_parts, Vec::new());
    incoming.sub_map.resize(n_parts, Vec::new());
    incoming.construct_map.resize(n_parts, Vec::new());
    for p in 0..n_parts {
        side.map.sub_map[p].extend(&incoming.sub_map[p]);
        side.map.construct_map[p].extend(&incoming.construct_map[p]);
    }
    side.map.construct_size = incoming.construct_size.max(side.map.construct_size);

    for f in 0..side.n_faces() {
        let pairs: Vec<(usize, T)> = other.addresses[f]
            .iter()
            .zip(&other.weights[f])
            .map(|(&t, &w)| (t, w))
            .collect();
        for (t, w) in pairs {
            side.merge_pair(f, t, w);
        }
    }
    side.raw_sums();
}

/// Exact projected overlap: for every source face, octree box query over
/// the target patch prunes candidates, back-facing candidates are culled by
/// normal orientation, and the weight is the clipped polygon area in the
/// source face's plane.
fn face_area_weight_pairs<T: RealScalar>(
    src: &SurfacePatch<T>,
    tgt: &SurfacePatch<T>,
) -> Vec<(Vec<usize>, Vec<T>)> {
    let inflation = T::from(CANDIDATE_INFLATION).unwrap();
    let bb = src.bounds().union(&tgt.bounds()).inflate(inflation);
    let tree = Octree::new(
        FaceSet::new(tgt.points(), tgt.faces()).cache_bounds(),
        bb,
        TREE_MAX_LEVELS,
        T::from(TREE_MAX_LEAF_RATIO).unwrap(),
        T::from(TREE_MAX_DUPLICITY).unwrap(),
    );

    (0..src.n_faces())
        .into_par_iter()
        .map(|s| {
            let face_pts = src.face_points(s);
            let normal = src.face_area_vector(s);
            let sliver = T::from(1e-10).unwrap() * src.face_area(s);

            let mut candidates = HashSet::new();
            tree.find_box(&src.face_bounds(s).inflate(inflation), &mut candidates);

            let mut addrs = Vec::new();
            let mut ws = Vec::new();
            for t in candidates.into_iter().sorted() {
                if dot(&normal, &tgt.face_area_vector(t)) <= T::zero() {
                    continue;
                }
                let area = polygon_overlap_area(&face_pts, &tgt.face_points(t));
                if area > sliver {
                    addrs.push(t);
                    ws.push(area);
                }
            }
            (addrs, ws)
        })
        .collect()
}

/// Nearest-centre mapping: the whole source face weight goes to the target
/// face whose centre is closest.
fn map_nearest_pairs<T: RealScalar>(
    src: &SurfacePatch<T>,
    tgt: &SurfacePatch<T>,
) -> Vec<(Vec<usize>, Vec<T>)> {
    let centres: Vec<Point3<T>> = (0..tgt.n_faces()).map(|t| tgt.face_centre(t)).collect();
    let bb = BoundingBox::from_points(centres.iter())
        .union(&src.bounds())
        .inflate(T::from(CANDIDATE_INFLATION).unwrap());
    let tree = Octree::new(
        PointSet::new(&centres),
        bb,
        TREE_MAX_LEVELS,
        T::from(TREE_MAX_LEAF_RATIO).unwrap(),
        T::from(TREE_MAX_DUPLICITY).unwrap(),
    );

    (0..src.n_faces())
        .into_par_iter()
        .map(|s| {
            let hit = tree.find_nearest(&src.face_centre(s), T::infinity());
            match hit.index {
                Some(t) => (vec![t], vec![src.face_area(s)]),
                None => (Vec::new(), Vec::new()),
            }
        })
        .collect()
}
