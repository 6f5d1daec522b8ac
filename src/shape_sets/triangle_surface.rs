//! Shape set over a triangulated surface, with inside/outside classification
//! for closed manifolds.

use crate::geometry::primitives::{
    closest_point_on_triangle, cross, dist_sq, dot, mag_sq, sub,
};
use crate::geometry::BoundingBox;
use crate::traits::shape::{Nearest, ShapeSet};
use crate::types::{Point3, RealScalar, VolumeType};

/// Non-owning view over a triangle mesh: a point array plus `[usize; 3]`
/// connectivity. Triangles are right-handed; for a closed surface the normals
/// must point outward for [`ShapeSet::volume_type`] to classify correctly.
#[derive(Debug, Clone)]
pub struct TriangleSurface<'a, T> {
    points: &'a [Point3<T>],
    triangles: &'a [[usize; 3]],
}

impl<'a, T: RealScalar> TriangleSurface<'a, T> {
    /// View over the whole surface.
    pub fn new(points: &'a [Point3<T>], triangles: &'a [[usize; 3]]) -> Self {
        Self { points, triangles }
    }

    /// Vertex coordinates of triangle `index`.
    pub fn triangle(&self, index: usize) -> [Point3<T>; 3] {
        let t = self.triangles[index];
        [self.points[t[0]], self.points[t[1]], self.points[t[2]]]
    }

    /// Non-unit outward normal of triangle `index`.
    pub fn normal(&self, index: usize) -> Point3<T> {
        let [a, b, c] = self.triangle(index);
        cross(&sub(&b, &a), &sub(&c, &a))
    }
}

impl<'a, T: RealScalar> ShapeSet<T> for TriangleSurface<'a, T> {
    fn size(&self) -> usize {
        self.triangles.len()
    }

    fn bounds(&self, indices: &[usize]) -> BoundingBox<T> {
        let mut bb = BoundingBox::null();
        for &i in indices {
            let [a, b, c] = self.triangle(i);
            bb.extend(&a);
            bb.extend(&b);
            bb.extend(&c);
        }
        bb
    }

    // Conservative: triangle bounding box stands in for the triangle.
    fn overlaps_box(&self, index: usize, bb: &BoundingBox<T>) -> bool {
        let [a, b, c] = self.triangle(index);
        bb.overlaps(&BoundingBox::from_points([&a, &b, &c]))
    }

    fn overlaps_sphere(&self, index: usize, centre: &Point3<T>, radius_sq: T) -> bool {
        let [a, b, c] = self.triangle(index);
        let nearest = closest_point_on_triangle(&a, &b, &c, centre);
        dist_sq(&nearest, centre) <= radius_sq
    }

    fn find_nearest(&self, indices: &[usize], sample: &Point3<T>, nearest: &mut Nearest<T>) {
        for &i in indices {
            let [a, b, c] = self.triangle(i);
            let p = closest_point_on_triangle(&a, &b, &c, sample);
            nearest.update(dist_sq(&p, sample), i, p);
        }
    }

    fn intersects_line(
        &self,
        index: usize,
        start: &Point3<T>,
        end: &Point3<T>,
    ) -> Option<Point3<T>> {
        let [a, b, c] = self.triangle(index);
        crate::geometry::primitives::segment_triangle_intersection(start, end, &a, &b, &c)
    }

    /// Side-of-surface test: the sign of the offset from the nearest point on
    /// triangle `index` to `sample` along the triangle normal. Samples in the
    /// surface tolerance band (or against a degenerate triangle) classify as
    /// [`VolumeType::Unknown`].
    fn volume_type(&self, index: usize, sample: &Point3<T>) -> VolumeType {
        let [a, b, c] = self.triangle(index);
        let normal = self.normal(index);
        let n2 = mag_sq(&normal);
        if n2 <= T::min_positive_value() {
            return VolumeType::Unknown;
        }
        let nearest = closest_point_on_triangle(&a, &b, &c, sample);
        let offset = sub(sample, &nearest);
        let side = dot(&offset, &normal);
        // Relative tolerance guards points sitting on (or numerically at) the
        // surface, and points whose nearest feature is an edge or vertex where
        // a single facet normal is ambiguous.
        let tol = T::from(1e-6).unwrap() * (n2 * mag_sq(&offset)).sqrt();
        if side > tol {
            VolumeType::Outside
        } else if side < -tol {
            VolumeType::Inside
        } else {
            VolumeType::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

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
    fn test_volume_type() {
        let (points, triangles) = tet_fixture();
        let surface = TriangleSurface::new(&points, &triangles);

        // Directly below the bottom face (which has normal -z)
        let below = [0.2, 0.2, -0.5];
        assert_eq!(surface.volume_type(0, &below), VolumeType::Outside);

        // Inside the tetrahedron, nearest to the bottom face
        let inside = [0.2, 0.2, 0.1];
        assert_eq!(surface.volume_type(0, &inside), VolumeType::Inside);
    }

    #[test]
    fn test_nearest_triangle() {
        let (points, triangles) = tet_fixture();
        let surface = TriangleSurface::new(&points, &triangles);
        let mut nearest = Nearest::unbounded();
        surface.find_nearest(&[0, 1, 2, 3], &[0.2, 0.2, -1.0], &mut nearest);
        assert_eq!(nearest.index, Some(0));
        assert_relative_eq!(nearest.point[0], 0.2, epsilon = 1e-12);
        assert_relative_eq!(nearest.point[1], 0.2, epsilon = 1e-12);
        assert_relative_eq!(nearest.point[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_line_intersection() {
        let (points, triangles) = tet_fixture();
        let surface = TriangleSurface::new(&points, &triangles);
        let hit = surface
            .intersects_line(0, &[0.2, 0.2, -1.0], &[0.2, 0.2, 1.0])
            .unwrap();
        assert_eq!(hit, [0.2, 0.2, 0.0]);
    }
}
