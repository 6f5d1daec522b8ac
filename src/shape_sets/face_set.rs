//! Shape set over a polygonal face subset of a mesh.

use crate::geometry::primitives::{
    closest_point_on_triangle, dist_sq, face_centre, segment_triangle_intersection,
};
use crate::geometry::BoundingBox;
use crate::traits::shape::{Nearest, ShapeSet};
use crate::types::{Point3, RealScalar};

/// Non-owning view over polygonal mesh faces: a point array plus per-face
/// vertex lists, optionally restricted to a face subset.
///
/// Faces are treated as fans of triangles around the face centre, which is
/// exact for convex faces and conservative for mildly warped ones. Per-face
/// bounding boxes may optionally be cached up front, trading memory for the
/// repeated gather during tree construction.
#[derive(Debug, Clone)]
pub struct FaceSet<'a, T> {
    points: &'a [Point3<T>],
    faces: &'a [Vec<usize>],
    subset: Option<Vec<usize>>,
    cached_bounds: Option<Vec<BoundingBox<T>>>,
}

impl<'a, T: RealScalar> FaceSet<'a, T> {
    /// View over all faces.
    pub fn new(points: &'a [Point3<T>], faces: &'a [Vec<usize>]) -> Self {
        Self {
            points,
            faces,
            subset: None,
            cached_bounds: None,
        }
    }

    /// View over the given face subset.
    pub fn with_subset(points: &'a [Point3<T>], faces: &'a [Vec<usize>], subset: Vec<usize>) -> Self {
        for &i in &subset {
            assert!(
                i < faces.len(),
                "face subset entry {} out of range ({} faces)",
                i,
                faces.len()
            );
        }
        Self {
            points,
            faces,
            subset: Some(subset),
            cached_bounds: None,
        }
    }

    /// Precompute and cache per-face bounding boxes.
    pub fn cache_bounds(mut self) -> Self {
        let n = self.size();
        let mut bounds = Vec::with_capacity(n);
        for i in 0..n {
            bounds.push(BoundingBox::from_points(
                self.face(i).iter().map(|&v| &self.points[v]),
            ));
        }
        self.cached_bounds = Some(bounds);
        self
    }

    /// Vertex list of shape `index`.
    pub fn face(&self, index: usize) -> &[usize] {
        match &self.subset {
            Some(s) => &self.faces[s[index]],
            None => &self.faces[index],
        }
    }

    /// Vertex coordinates of shape `index`.
    pub fn face_points(&self, index: usize) -> Vec<Point3<T>> {
        self.face(index).iter().map(|&v| self.points[v]).collect()
    }

    fn face_bounds(&self, index: usize) -> BoundingBox<T> {
        match &self.cached_bounds {
            Some(cache) => cache[index],
            None => BoundingBox::from_points(self.face(index).iter().map(|&v| &self.points[v])),
        }
    }

    /// Nearest point on face `index` to `sample`, via the centre fan.
    pub fn nearest_on_face(&self, index: usize, sample: &Point3<T>) -> Point3<T> {
        let pts = self.face_points(index);
        if pts.len() == 3 {
            return closest_point_on_triangle(&pts[0], &pts[1], &pts[2], sample);
        }
        let centre = face_centre(&pts);
        let np = pts.len();
        let mut best = pts[0];
        let mut best_d2 = T::infinity();
        for i in 0..np {
            let p = closest_point_on_triangle(&centre, &pts[i], &pts[(i + 1) % np], sample);
            let d2 = dist_sq(&p, sample);
            if d2 < best_d2 {
                best_d2 = d2;
                best = p;
            }
        }
        best
    }
}

impl<'a, T: RealScalar> ShapeSet<T> for FaceSet<'a, T> {
    fn size(&self) -> usize {
        match &self.subset {
            Some(s) => s.len(),
            None => self.faces.len(),
        }
    }

    fn bounds(&self, indices: &[usize]) -> BoundingBox<T> {
        let mut bb = BoundingBox::null();
        for &i in indices {
            bb = bb.union(&self.face_bounds(i));
        }
        bb
    }

    // Conservative: face bounding box stands in for the polygon.
    fn overlaps_box(&self, index: usize, bb: &BoundingBox<T>) -> bool {
        bb.overlaps(&self.face_bounds(index))
    }

    fn overlaps_sphere(&self, index: usize, centre: &Point3<T>, radius_sq: T) -> bool {
        let nearest = self.nearest_on_face(index, centre);
        dist_sq(&nearest, centre) <= radius_sq
    }

    fn find_nearest(&self, indices: &[usize], sample: &Point3<T>, nearest: &mut Nearest<T>) {
        for &i in indices {
            let p = self.nearest_on_face(i, sample);
            nearest.update(dist_sq(&p, sample), i, p);
        }
    }

    fn intersects_line(
        &self,
        index: usize,
        start: &Point3<T>,
        end: &Point3<T>,
    ) -> Option<Point3<T>> {
        let pts = self.face_points(index);
        let np = pts.len();
        if np == 3 {
            return segment_triangle_intersection(start, end, &pts[0], &pts[1], &pts[2]);
        }
        let centre = face_centre(&pts);
        let mut best: Option<Point3<T>> = None;
        let mut best_d2 = T::infinity();
        for i in 0..np {
            if let Some(p) =
                segment_triangle_intersection(start, end, &centre, &pts[i], &pts[(i + 1) % np])
            {
                let d2 = dist_sq(&p, start);
                if d2 < best_d2 {
                    best_d2 = d2;
                    best = Some(p);
                }
            }
        }
        best
    }
}
