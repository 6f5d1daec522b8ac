//! The shape-set contract: a non-owning, read-only view over an externally
//! owned collection of indexable shapes.

use log::warn;

use crate::geometry::BoundingBox;
use crate::types::{Point3, RealScalar, VolumeType};

/// Running best candidate for a nearest-point search.
///
/// Callers pre-seed [`Nearest::dist_sq`] with their current bound so that
/// implementations can prune; an implementation must only overwrite the
/// fields when it finds a strictly closer candidate.
#[derive(Debug, Clone, Copy)]
pub struct Nearest<T> {
    /// Squared distance to the best candidate found so far.
    pub dist_sq: T,
    /// Index of the best shape, `None` until something beats the seed bound.
    pub index: Option<usize>,
    /// Nearest point on the best shape.
    pub point: Point3<T>,
}

impl<T: RealScalar> Nearest<T> {
    /// A search seeded with the given squared-distance bound.
    pub fn with_bound(dist_sq: T) -> Self {
        Self {
            dist_sq,
            index: None,
            point: [T::zero(); 3],
        }
    }

    /// An unbounded search.
    pub fn unbounded() -> Self {
        Self::with_bound(T::infinity())
    }

    /// Accept `candidate` if strictly closer than the current best.
    pub fn update(&mut self, dist_sq: T, index: usize, point: Point3<T>) {
        if dist_sq < self.dist_sq {
            self.dist_sq = dist_sq;
            self.index = Some(index);
            self.point = point;
        }
    }
}

/// Running best candidate for a nearest-to-line search: tracks both the
/// nearest point on the shape and the corresponding point on the line.
#[derive(Debug, Clone, Copy)]
pub struct LineNearest<T> {
    /// Squared distance between the line and the best shape.
    pub dist_sq: T,
    /// Index of the best shape.
    pub index: Option<usize>,
    /// Nearest point on the best shape.
    pub point: Point3<T>,
    /// Nearest point on the line.
    pub line_point: Point3<T>,
}

impl<T: RealScalar> LineNearest<T> {
    /// An unbounded search.
    pub fn unbounded() -> Self {
        Self {
            dist_sq: T::infinity(),
            index: None,
            point: [T::zero(); 3],
            line_point: [T::zero(); 3],
        }
    }
}

/// Read-only geometric view over an indexable shape collection.
///
/// Implementations never own the referenced arrays (except the dynamic point
/// cloud) and have no side effects; the octree is written once against this
/// contract and instantiated per concrete shape set.
pub trait ShapeSet<T: RealScalar> {
    /// Number of indexable shapes.
    fn size(&self) -> usize;

    /// Bounding box covering the given index subset. The null box for an
    /// empty subset.
    fn bounds(&self, indices: &[usize]) -> BoundingBox<T>;

    /// Overlap test between shape `index` and a box. Must be conservative:
    /// false negatives would make the tree skip valid leaves, false positives
    /// only cost duplicate work.
    fn overlaps_box(&self, index: usize, bb: &BoundingBox<T>) -> bool;

    /// Overlap test between shape `index` and a sphere given by centre and
    /// squared radius. Same conservatism requirement as [`Self::overlaps_box`].
    fn overlaps_sphere(&self, index: usize, centre: &Point3<T>, radius_sq: T) -> bool;

    /// Scan `indices` for the shape nearest `sample`, updating `nearest` only
    /// for strictly closer candidates.
    fn find_nearest(&self, indices: &[usize], sample: &Point3<T>, nearest: &mut Nearest<T>);

    /// Intersection of the segment `[start, end]` with shape `index`.
    ///
    /// Default: not supported by this shape kind; logs a warning and reports
    /// no intersection.
    fn intersects_line(
        &self,
        _index: usize,
        _start: &Point3<T>,
        _end: &Point3<T>,
    ) -> Option<Point3<T>> {
        warn!("intersects_line not supported by this shape set");
        None
    }

    /// Scan `indices` for the shape nearest to the segment `[start, end]`.
    ///
    /// Default: not supported by this shape kind; logs a warning and leaves
    /// `nearest` untouched.
    fn nearest_to_line(
        &self,
        _indices: &[usize],
        _start: &Point3<T>,
        _end: &Point3<T>,
        _nearest: &mut LineNearest<T>,
    ) {
        warn!("nearest_to_line not supported by this shape set");
    }

    /// Classify `sample` against shape `index` for closed-manifold
    /// collections. `sample` is expected to be the query point whose nearest
    /// shape is `index`.
    ///
    /// Default: [`VolumeType::Unknown`]; the caller must treat this as
    /// "cannot decide".
    fn volume_type(&self, _index: usize, _sample: &Point3<T>) -> VolumeType {
        VolumeType::Unknown
    }
}
