//! Shape sets over point clouds.

use crate::geometry::primitives::{closest_point_on_segment, dist_sq};
use crate::geometry::BoundingBox;
use crate::traits::shape::{LineNearest, Nearest, ShapeSet};
use crate::types::{Point3, RealScalar};

/// Non-owning view over a point array, optionally restricted to an index
/// subset. Shape index `i` refers to `points[subset[i]]` when a subset is
/// present, `points[i]` otherwise.
#[derive(Debug, Clone)]
pub struct PointSet<'a, T> {
    points: &'a [Point3<T>],
    subset: Option<Vec<usize>>,
}

impl<'a, T: RealScalar> PointSet<'a, T> {
    /// View over all points.
    pub fn new(points: &'a [Point3<T>]) -> Self {
        Self {
            points,
            subset: None,
        }
    }

    /// View over the given subset of points. Panics on an out-of-range
    /// subset entry.
    pub fn with_subset(points: &'a [Point3<T>], subset: Vec<usize>) -> Self {
        for &i in &subset {
            assert!(
                i < points.len(),
                "point subset entry {} out of range ({} points)",
                i,
                points.len()
            );
        }
        Self {
            points,
            subset: Some(subset),
        }
    }

    /// Coordinates of shape `index`.
    pub fn point(&self, index: usize) -> Point3<T> {
        match &self.subset {
            Some(s) => self.points[s[index]],
            None => self.points[index],
        }
    }
}

fn points_nearest<T: RealScalar>(
    point_of: impl Fn(usize) -> Point3<T>,
    indices: &[usize],
    sample: &Point3<T>,
    nearest: &mut Nearest<T>,
) {
    for &i in indices {
        let p = point_of(i);
        nearest.update(dist_sq(&p, sample), i, p);
    }
}

fn points_nearest_to_line<T: RealScalar>(
    point_of: impl Fn(usize) -> Point3<T>,
    indices: &[usize],
    start: &Point3<T>,
    end: &Point3<T>,
    nearest: &mut LineNearest<T>,
) {
    for &i in indices {
        let p = point_of(i);
        let on_line = closest_point_on_segment(start, end, &p);
        let d2 = dist_sq(&p, &on_line);
        if d2 < nearest.dist_sq {
            nearest.dist_sq = d2;
            nearest.index = Some(i);
            nearest.point = p;
            nearest.line_point = on_line;
        }
    }
}

impl<'a, T: RealScalar> ShapeSet<T> for PointSet<'a, T> {
    fn size(&self) -> usize {
        match &self.subset {
            Some(s) => s.len(),
            None => self.points.len(),
        }
    }

    fn bounds(&self, indices: &[usize]) -> BoundingBox<T> {
        let mut bb = BoundingBox::null();
        for &i in indices {
            bb.extend(&self.point(i));
        }
        bb
    }

    fn overlaps_box(&self, index: usize, bb: &BoundingBox<T>) -> bool {
        bb.contains(&self.point(index))
    }

    fn overlaps_sphere(&self, index: usize, centre: &Point3<T>, radius_sq: T) -> bool {
        dist_sq(&self.point(index), centre) <= radius_sq
    }

    fn find_nearest(&self, indices: &[usize], sample: &Point3<T>, nearest: &mut Nearest<T>) {
        points_nearest(|i| self.point(i), indices, sample, nearest);
    }

    fn nearest_to_line(
        &self,
        indices: &[usize],
        start: &Point3<T>,
        end: &Point3<T>,
        nearest: &mut LineNearest<T>,
    ) {
        points_nearest_to_line(|i| self.point(i), indices, start, end, nearest);
    }
}

/// Growable point cloud backing the dynamic octree. Unlike the static views
/// this set owns its points: insertions must be visible to the tree that
/// indexes it.
#[derive(Debug, Clone, Default)]
pub struct DynamicPointSet<T> {
    points: Vec<Point3<T>>,
}

impl<T: RealScalar> DynamicPointSet<T> {
    /// An empty cloud.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Cloud seeded with the given points.
    pub fn from_points(points: Vec<Point3<T>>) -> Self {
        Self { points }
    }

    /// Append a point, returning its shape index.
    pub fn append(&mut self, point: Point3<T>) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    /// Coordinates of shape `index`.
    pub fn point(&self, index: usize) -> Point3<T> {
        self.points[index]
    }
}

impl<T: RealScalar> ShapeSet<T> for DynamicPointSet<T> {
    fn size(&self) -> usize {
        self.points.len()
    }

    fn bounds(&self, indices: &[usize]) -> BoundingBox<T> {
        let mut bb = BoundingBox::null();
        for &i in indices {
            bb.extend(&self.points[i]);
        }
        bb
    }

    fn overlaps_box(&self, index: usize, bb: &BoundingBox<T>) -> bool {
        bb.contains(&self.points[index])
    }

    fn overlaps_sphere(&self, index: usize, centre: &Point3<T>, radius_sq: T) -> bool {
        dist_sq(&self.points[index], centre) <= radius_sq
    }

    fn find_nearest(&self, indices: &[usize], sample: &Point3<T>, nearest: &mut Nearest<T>) {
        points_nearest(|i| self.points[i], indices, sample, nearest);
    }

    fn nearest_to_line(
        &self,
        indices: &[usize],
        start: &Point3<T>,
        end: &Point3<T>,
        nearest: &mut LineNearest<T>,
    ) {
        points_nearest_to_line(|i| self.points[i], indices, start, end, nearest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_indexing() {
        let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        let set = PointSet::with_subset(&points, vec![2, 0]);
        assert_eq!(set.size(), 2);
        assert_eq!(set.point(0), [2.0, 0.0, 0.0]);
        assert_eq!(set.point(1), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_nearest_respects_seed_bound() {
        let points = vec![[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]];
        let set = PointSet::new(&points);
        let mut nearest = Nearest::with_bound(0.5);
        set.find_nearest(&[0, 1], &[2.0, 0.0, 0.0], &mut nearest);
        // Both candidates are further than the seeded bound
        assert!(nearest.index.is_none());

        let mut nearest = Nearest::unbounded();
        set.find_nearest(&[0, 1], &[2.0, 0.0, 0.0], &mut nearest);
        assert_eq!(nearest.index, Some(0));
        assert_eq!(nearest.dist_sq, 4.0);
    }

    #[test]
    fn test_dynamic_append() {
        let mut set = DynamicPointSet::new();
        assert_eq!(set.append([1.0, 2.0, 3.0]), 0);
        assert_eq!(set.append([4.0, 5.0, 6.0]), 1);
        assert_eq!(set.size(), 2);
        assert_eq!(set.point(1), [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_nearest_to_line() {
        let points = vec![[0.0, 1.0, 0.0], [10.0, 5.0, 0.0]];
        let set = PointSet::new(&points);
        let mut nearest = LineNearest::unbounded();
        set.nearest_to_line(
            &[0, 1],
            &[-1.0, 0.0, 0.0],
            &[1.0, 0.0, 0.0],
            &mut nearest,
        );
        assert_eq!(nearest.index, Some(0));
        assert_eq!(nearest.line_point, [0.0, 0.0, 0.0]);
        assert_eq!(nearest.dist_sq, 1.0);
    }
}
