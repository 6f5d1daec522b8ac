//! Octree build and query properties over randomized and hand-built
//! fixtures.

use std::collections::HashSet;

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use octree_ami::geometry::primitives::{closest_point_on_segment, dist_sq};
use octree_ami::geometry::BoundingBox;
use octree_ami::octree::{Octree, VolumeCache};
use octree_ami::shape_sets::{DynamicPointSet, PointSet, TriangleSurface};
use octree_ami::traits::shape::ShapeSet;
use octree_ami::types::VolumeType;

fn random_points(n: usize, seed: u64) -> Vec<[f64; 3]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| [rng.gen(), rng.gen(), rng.gen()]).collect()
}

fn unit_box() -> BoundingBox<f64> {
    BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])
}

#[test]
fn nearest_matches_brute_force() {
    for seed in 0..5u64 {
        let points = random_points(200, seed);
        let tree = Octree::new(PointSet::new(&points), unit_box(), 6, 2.0, 100.0);

        let mut rng = StdRng::seed_from_u64(1000 + seed);
        for _ in 0..50 {
            let q = [rng.gen(), rng.gen(), rng.gen()];
            let hit = tree.find_nearest(&q, f64::INFINITY);

            let (brute, d2) = points
                .iter()
                .enumerate()
                .map(|(i, p)| (i, dist_sq(p, &q)))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
                .unwrap();
            assert_eq!(hit.index, Some(brute));
            assert_relative_eq!(dist_sq(&hit.point, &q), d2);
        }
    }
}

#[test]
fn completeness_and_containment() {
    let points = random_points(500, 42);
    let set = PointSet::new(&points);
    let tree = Octree::new(set, unit_box(), 8, 1.5, 8.0);

    let mut seen = HashSet::new();
    for (bb, contents) in tree.leaves() {
        for &i in contents {
            seen.insert(i);
            // Containment: the leaf box overlaps the shape's bounds
            let set = PointSet::new(&points);
            assert!(
                bb.overlaps(&set.bounds(&[i])),
                "leaf box does not cover point {}",
                i
            );
        }
    }
    // Completeness: no index lost during construction
    for i in 0..points.len() {
        assert!(seen.contains(&i), "point {} missing from every leaf", i);
    }
}

#[test]
fn six_point_scenario() {
    let points = vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 1.0, 1.0],
        [0.5, 0.5, 0.5],
    ];
    let tree = Octree::new(PointSet::new(&points), unit_box(), 4, 1.0, 100.0);

    let hit = tree.find_nearest(&[0.49, 0.49, 0.49], f64::INFINITY);
    assert_eq!(hit.index, Some(5));
    assert_relative_eq!(hit.point[0], 0.5);
    assert_relative_eq!(
        dist_sq(&hit.point, &[0.49, 0.49, 0.49]),
        3.0 * 0.01 * 0.01,
        epsilon = 1e-12
    );
}

#[test]
fn insert_then_remove_restores_candidate_sets() {
    let points = random_points(100, 7);
    let mut set = DynamicPointSet::new();
    for p in &points {
        set.append(*p);
    }
    let reference = Octree::new(set.clone(), unit_box(), 6, 2.0, 100.0);
    let mut tree = Octree::new(set, unit_box(), 6, 2.0, 100.0);

    let probe = [0.31, 0.64, 0.5];
    let radius_sq = 0.05;

    let idx = tree.shapes_mut().append([0.3, 0.6, 0.5]);
    tree.insert(idx);
    let mut with = HashSet::new();
    tree.find_sphere(&probe, radius_sq, &mut with);
    assert!(with.contains(&idx));

    tree.remove(idx);
    let mut after = HashSet::new();
    tree.find_sphere(&probe, radius_sq, &mut after);
    let mut never = HashSet::new();
    reference.find_sphere(&probe, radius_sq, &mut never);
    assert_eq!(after, never);
}

#[test]
fn round_trip_preserves_queries() {
    let points = random_points(300, 99);
    let tree = Octree::new(PointSet::new(&points), unit_box(), 6, 2.0, 100.0);

    let mut buf = Vec::new();
    tree.write_stream(&mut buf).unwrap();
    let copy = Octree::read_stream(PointSet::new(&points), &mut buf.as_slice()).unwrap();

    assert_eq!(tree.node_count(), copy.node_count());
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..20 {
        let q = [rng.gen(), rng.gen(), rng.gen()];
        assert_eq!(
            tree.find_nearest(&q, f64::INFINITY),
            copy.find_nearest(&q, f64::INFINITY)
        );
    }
}

#[test]
fn box_and_sphere_queries_match_brute_force() {
    let points = random_points(200, 11);
    let tree = Octree::new(PointSet::new(&points), unit_box(), 6, 2.0, 100.0);

    let region = BoundingBox::new([0.2, 0.2, 0.2], [0.6, 0.5, 0.8]);
    let mut found = HashSet::new();
    tree.find_box(&region, &mut found);
    let brute: HashSet<usize> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| region.contains(p))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(found, brute);
    assert_eq!(tree.overlaps_box(&region), !brute.is_empty());

    let centre = [0.5, 0.5, 0.5];
    let radius_sq = 0.04;
    let mut found = HashSet::new();
    tree.find_sphere(&centre, radius_sq, &mut found);
    let brute: HashSet<usize> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| dist_sq(p, &centre) <= radius_sq)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(found, brute);
}

fn tet_surface() -> (Vec<[f64; 3]>, Vec<[usize; 3]>) {
    let points = vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ];
    // Outward-facing windings
    let triangles = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
    (points, triangles)
}

#[test]
fn line_query_hits_closed_surface() {
    let (points, triangles) = tet_surface();
    let surface = TriangleSurface::new(&points, &triangles);
    let bb = BoundingBox::new([-1.0, -1.0, -1.0], [2.0, 2.0, 2.0]);
    let tree = Octree::new(surface, bb, 5, 1.0, 100.0);

    // Ray through the tetrahedron along x at y = z = 0.2
    let hit = tree.find_line(&[-0.5, 0.2, 0.2], &[1.5, 0.2, 0.2]);
    assert!(hit.found());
    // First crossing is the x = 0 face
    assert_relative_eq!(hit.point[0], 0.0, epsilon = 1e-9);

    // A segment missing the surface entirely
    let miss = tree.find_line(&[-0.5, 2.5, 2.5], &[1.5, 2.5, 2.5]);
    assert!(!miss.found());
}

#[test]
fn inside_classification_on_closed_surface() {
    let (points, triangles) = tet_surface();
    let surface = TriangleSurface::new(&points, &triangles);
    let bb = BoundingBox::new([-1.0, -1.0, -1.0], [2.0, 2.0, 2.0]);
    let tree = Octree::new(surface, bb, 5, 1.0, 100.0);

    assert_eq!(tree.find_inside(&[0.1, 0.1, 0.1]), VolumeType::Inside);
    assert_eq!(tree.find_inside(&[1.0, 1.0, 1.0]), VolumeType::Outside);
    assert_eq!(tree.find_inside(&[-0.5, -0.5, -0.5]), VolumeType::Outside);

    // The memoized path agrees with the direct query
    let mut cache = VolumeCache::new();
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..100 {
        let p = [
            rng.gen::<f64>() * 3.0 - 1.0,
            rng.gen::<f64>() * 3.0 - 1.0,
            rng.gen::<f64>() * 3.0 - 1.0,
        ];
        assert_eq!(cache.classify(&tree, &p), tree.find_inside(&p));
    }
}

#[test]
fn nearest_to_line_matches_brute_force() {
    for seed in 0..5u64 {
        let points = random_points(150, seed);
        let tree = Octree::new(PointSet::new(&points), unit_box(), 6, 2.0, 100.0);

        let mut rng = StdRng::seed_from_u64(2000 + seed);
        for _ in 0..20 {
            let start = [rng.gen(), rng.gen(), rng.gen()];
            let end = [rng.gen(), rng.gen(), rng.gen()];
            let nearest = tree.find_nearest_to_line(&start, &end);

            let (brute, d2) = points
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let on_line = closest_point_on_segment(&start, &end, p);
                    (i, dist_sq(p, &on_line))
                })
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
                .unwrap();
            assert_eq!(nearest.index, Some(brute));
            assert_relative_eq!(nearest.dist_sq, d2);
            // The reported line point is on the segment and consistent
            // with the reported distance
            assert_relative_eq!(
                dist_sq(&nearest.point, &nearest.line_point),
                d2,
                epsilon = 1e-12
            );
        }
    }
}

#[test]
fn any_line_query_on_closed_surface() {
    let (points, triangles) = tet_surface();
    let surface = TriangleSurface::new(&points, &triangles);
    let bb = BoundingBox::new([-1.0, -1.0, -1.0], [2.0, 2.0, 2.0]);
    let tree = Octree::new(surface, bb, 5, 1.0, 100.0);

    // Crossing ray: some intersection must be reported, and it must lie on
    // the segment
    let start = [-0.5, 0.2, 0.2];
    let end = [1.5, 0.2, 0.2];
    let hit = tree.find_any_line(&start, &end);
    assert!(hit.found());
    assert_relative_eq!(hit.point[1], 0.2, epsilon = 1e-9);
    assert_relative_eq!(hit.point[2], 0.2, epsilon = 1e-9);
    assert!(hit.point[0] >= start[0] && hit.point[0] <= end[0]);

    let miss = tree.find_any_line(&[-0.5, 2.5, 2.5], &[1.5, 2.5, 2.5]);
    assert!(!miss.found());
}

#[test]
fn obj_dump_lists_leaf_boxes() {
    let points = random_points(100, 31);
    let tree = Octree::new(PointSet::new(&points), unit_box(), 6, 1.5, 8.0);

    let mut buf = Vec::new();
    tree.write_obj(&mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();

    let n_leaves = tree.leaves().len();
    let n_verts = text.lines().filter(|l| l.starts_with("v ")).count();
    let n_faces = text.lines().filter(|l| l.starts_with("f ")).count();
    assert_eq!(n_verts, 8 * n_leaves);
    assert_eq!(n_faces, 6 * n_leaves);
}

#[test]
fn statistics_reflect_build() {
    let points = random_points(400, 23);
    let tree = Octree::new(PointSet::new(&points), unit_box(), 6, 1.5, 8.0);
    let stats = tree.statistics();

    assert_eq!(stats.n_shapes, 400);
    assert!(stats.n_leaves > 1, "tree did not split: {}", stats);
    assert!(stats.max_depth <= 6);
    assert!(stats.n_entries >= 400);
}
