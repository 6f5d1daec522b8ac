//! Shape set over an edge subset of a mesh.

use crate::geometry::primitives::{
    closest_point_on_segment, closest_points_between_segments, dist_sq,
};
use crate::geometry::BoundingBox;
use crate::traits::shape::{LineNearest, Nearest, ShapeSet};
use crate::types::{Point3, RealScalar};

/// Non-owning view over mesh edges: a point array plus 2-tuple connectivity,
/// optionally restricted to an edge subset.
#[derive(Debug, Clone)]
pub struct EdgeSet<'a, T> {
    points: &'a [Point3<T>],
    edges: &'a [[usize; 2]],
    subset: Option<Vec<usize>>,
}

impl<'a, T: RealScalar> EdgeSet<'a, T> {
    /// View over all edges.
    pub fn new(points: &'a [Point3<T>], edges: &'a [[usize; 2]]) -> Self {
        Self {
            points,
            edges,
            subset: None,
        }
    }

    /// View over the given edge subset.
    pub fn with_subset(points: &'a [Point3<T>], edges: &'a [[usize; 2]], subset: Vec<usize>) -> Self {
        for &i in &subset {
            assert!(
                i < edges.len(),
                "edge subset entry {} out of range ({} edges)",
                i,
                edges.len()
            );
        }
        Self {
            points,
            edges,
            subset: Some(subset),
        }
    }

    /// End points of shape `index`.
    pub fn end_points(&self, index: usize) -> (Point3<T>, Point3<T>) {
        let e = match &self.subset {
            Some(s) => self.edges[s[index]],
            None => self.edges[index],
        };
        (self.points[e[0]], self.points[e[1]])
    }
}

impl<'a, T: RealScalar> ShapeSet<T> for EdgeSet<'a, T> {
    fn size(&self) -> usize {
        match &self.subset {
            Some(s) => s.len(),
            None => self.edges.len(),
        }
    }

    fn bounds(&self, indices: &[usize]) -> BoundingBox<T> {
        let mut bb = BoundingBox::null();
        for &i in indices {
            let (a, b) = self.end_points(i);
            bb.extend(&a);
            bb.extend(&b);
        }
        bb
    }

    // Conservative: the edge's own bounding box stands in for the segment.
    fn overlaps_box(&self, index: usize, bb: &BoundingBox<T>) -> bool {
        let (a, b) = self.end_points(index);
        bb.overlaps(&BoundingBox::from_points([&a, &b]))
    }

    fn overlaps_sphere(&self, index: usize, centre: &Point3<T>, radius_sq: T) -> bool {
        let (a, b) = self.end_points(index);
        let nearest = closest_point_on_segment(&a, &b, centre);
        dist_sq(&nearest, centre) <= radius_sq
    }

    fn find_nearest(&self, indices: &[usize], sample: &Point3<T>, nearest: &mut Nearest<T>) {
        for &i in indices {
            let (a, b) = self.end_points(i);
            let p = closest_point_on_segment(&a, &b, sample);
            nearest.update(dist_sq(&p, sample), i, p);
        }
    }

    fn nearest_to_line(
        &self,
        indices: &[usize],
        start: &Point3<T>,
        end: &Point3<T>,
        nearest: &mut LineNearest<T>,
    ) {
        for &i in indices {
            let (a, b) = self.end_points(i);
            let (on_line, on_edge) = closest_points_between_segments(start, end, &a, &b);
            let d2 = dist_sq(&on_line, &on_edge);
            if d2 < nearest.dist_sq {
                nearest.dist_sq = d2;
                nearest.index = Some(i);
                nearest.point = on_edge;
                nearest.line_point = on_line;
            }
        }
    }
}
