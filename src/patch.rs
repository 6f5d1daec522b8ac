//! Surface patches: owned point/face geometry with precomputed per-face
//! centres and areas, the input to AMI weight computation.

use crate::geometry::primitives::{face_area_vector, face_centre, mag_sq};
use crate::geometry::BoundingBox;
use crate::octree::Octree;
use crate::shape_sets::TriangleSurface;
use crate::types::{Point3, RealScalar};

/// A polygonal surface patch. Faces index into the patch's own point array;
/// face centres, area vectors and scalar areas are computed once at
/// construction and again after projection.
#[derive(Debug, Clone)]
pub struct SurfacePatch<T> {
    points: Vec<Point3<T>>,
    faces: Vec<Vec<usize>>,
    face_centres: Vec<Point3<T>>,
    face_area_vectors: Vec<Point3<T>>,
    face_areas: Vec<T>,
}

impl<T: RealScalar> SurfacePatch<T> {
    /// Patch from raw geometry. Panics on a face index out of range or a
    /// face with fewer than three vertices.
    pub fn new(points: Vec<Point3<T>>, faces: Vec<Vec<usize>>) -> Self {
        for (f, face) in faces.iter().enumerate() {
            assert!(
                face.len() >= 3,
                "face {} has {} vertices, need at least 3",
                f,
                face.len()
            );
            for &i in face {
                assert!(
                    i < points.len(),
                    "face {} references point {} of {}",
                    f,
                    i,
                    points.len()
                );
            }
        }
        let mut patch = Self {
            points,
            faces,
            face_centres: Vec::new(),
            face_area_vectors: Vec::new(),
            face_areas: Vec::new(),
        };
        patch.update_geometry();
        patch
    }

    fn update_geometry(&mut self) {
        self.face_centres.clear();
        self.face_area_vectors.clear();
        self.face_areas.clear();
        for face in &self.faces {
            let pts: Vec<Point3<T>> = face.iter().map(|&i| self.points[i]).collect();
            let av = face_area_vector(&pts);
            self.face_centres.push(face_centre(&pts));
            self.face_areas.push(mag_sq(&av).sqrt());
            self.face_area_vectors.push(av);
        }
    }

    /// Number of faces.
    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    /// The point array.
    pub fn points(&self) -> &[Point3<T>] {
        &self.points
    }

    /// The face connectivity.
    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    /// Vertex coordinates of face `index`.
    pub fn face_points(&self, index: usize) -> Vec<Point3<T>> {
        self.faces[index].iter().map(|&i| self.points[i]).collect()
    }

    /// Precomputed centre of face `index`.
    pub fn face_centre(&self, index: usize) -> Point3<T> {
        self.face_centres[index]
    }

    /// Precomputed Newell area vector of face `index`; its magnitude is the
    /// face area.
    pub fn face_area_vector(&self, index: usize) -> Point3<T> {
        self.face_area_vectors[index]
    }

    /// Precomputed scalar area of face `index`.
    pub fn face_area(&self, index: usize) -> T {
        self.face_areas[index]
    }

    /// Sum of all face areas.
    pub fn total_area(&self) -> T {
        self.face_areas
            .iter()
            .fold(T::zero(), |acc, &a| acc + a)
    }

    /// Bounding box of face `index`.
    pub fn face_bounds(&self, index: usize) -> BoundingBox<T> {
        let mut bb = BoundingBox::null();
        for &i in &self.faces[index] {
            bb.extend(&self.points[i]);
        }
        bb
    }

    /// Bounding box of the whole patch.
    pub fn bounds(&self) -> BoundingBox<T> {
        BoundingBox::from_points(self.points.iter())
    }

    /// Snap every patch point to its nearest point on the projection
    /// surface, then recompute the face geometry. Panics if any point has no
    /// projection within `max_dist_sq`: a partially projected patch would
    /// silently misplace every downstream overlap weight.
    pub fn project_points_onto(
        &mut self,
        surface: &Octree<T, TriangleSurface<'_, T>>,
        max_dist_sq: T,
    ) {
        for (i, p) in self.points.iter_mut().enumerate() {
            let hit = surface.find_nearest(p, max_dist_sq);
            match hit.index {
                Some(_) => *p = hit.point,
                None => panic!("projection failed for patch point {}", i),
            }
        }
        self.update_geometry();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> SurfacePatch<f64> {
        SurfacePatch::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![vec![0, 1, 2, 3]],
        )
    }

    #[test]
    fn test_face_geometry() {
        let patch = unit_square();
        assert_eq!(patch.n_faces(), 1);
        assert_relative_eq!(patch.face_area(0), 1.0);
        assert_relative_eq!(patch.total_area(), 1.0);
        let c = patch.face_centre(0);
        assert_relative_eq!(c[0], 0.5);
        assert_relative_eq!(c[1], 0.5);
        assert_relative_eq!(c[2], 0.0);
        let av = patch.face_area_vector(0);
        assert_relative_eq!(av[2], 1.0);
    }

    #[test]
    fn test_projection_snaps_points() {
        let tri_points = vec![
            [-1.0, -1.0, 0.0],
            [3.0, -1.0, 0.0],
            [-1.0, 3.0, 0.0],
            [3.0, 3.0, 0.0],
        ];
        let triangles = vec![[0, 1, 2], [1, 3, 2]];
        let surface = TriangleSurface::new(&tri_points, &triangles);
        let bb = BoundingBox::from_points(tri_points.iter());
        let tree = Octree::new(surface, bb, 4, 2.0, 100.0);

        let mut patch = SurfacePatch::new(
            vec![
                [0.0, 0.0, 0.3],
                [1.0, 0.0, -0.2],
                [1.0, 1.0, 0.1],
                [0.0, 1.0, 0.4],
            ],
            vec![vec![0, 1, 2, 3]],
        );
        patch.project_points_onto(&tree, f64::INFINITY);
        for p in patch.points() {
            assert_relative_eq!(p[2], 0.0, epsilon = 1e-12);
        }
        assert_relative_eq!(patch.face_area(0), 1.0, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "projection failed")]
    fn test_projection_miss_is_fatal() {
        let tri_points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let triangles = vec![[0, 1, 2]];
        let surface = TriangleSurface::new(&tri_points, &triangles);
        let bb = BoundingBox::from_points(tri_points.iter());
        let tree = Octree::new(surface, bb, 4, 2.0, 100.0);

        let mut patch = unit_square();
        patch.project_points_onto(&tree, 1e-6);
    }
}
