//! AMI interpolation scenarios over conformal unit-square patch pairs.

use approx::assert_relative_eq;

use octree_ami::ami::{calc_distribution, AmiInterpolation, AmiMethod, Distribution};
use octree_ami::geometry::BoundingBox;
use octree_ami::octree::Octree;
use octree_ami::parallel::SerialComm;
use octree_ami::patch::SurfacePatch;
use octree_ami::shape_sets::TriangleSurface;

/// Unit square in the z = 0 plane split into an n x n quad grid.
fn grid_patch(n: usize) -> SurfacePatch<f64> {
    let h = 1.0 / n as f64;
    let mut points = Vec::new();
    for j in 0..=n {
        for i in 0..=n {
            points.push([i as f64 * h, j as f64 * h, 0.0]);
        }
    }
    let mut faces = Vec::new();
    for j in 0..n {
        for i in 0..n {
            let p = j * (n + 1) + i;
            faces.push(vec![p, p + 1, p + n + 2, p + n + 1]);
        }
    }
    SurfacePatch::new(points, faces)
}

#[test]
fn single_face_vs_quadrants() {
    let mut src = grid_patch(1);
    let mut tgt = grid_patch(2);
    let mut ami = AmiInterpolation::new(AmiMethod::FaceAreaWeight, 1e-3);
    ami.calculate(&mut src, &mut tgt, None, &SerialComm);
    ami.normalise_weights(true);

    let addrs = &ami.source_addresses()[0];
    assert_eq!(addrs.len(), 4, "source face must see all 4 quadrants");
    for w in &ami.source_weights()[0] {
        assert_relative_eq!(*w, 0.25, epsilon = 1e-9);
    }
    assert_relative_eq!(ami.source_weight_sums()[0], 1.0, epsilon = 1e-9);
}

#[test]
fn conformal_grids_normalize_to_one() {
    let mut src = grid_patch(2);
    let mut tgt = grid_patch(3);
    let mut ami = AmiInterpolation::new(AmiMethod::FaceAreaWeight, 1e-3);
    ami.calculate(&mut src, &mut tgt, None, &SerialComm);
    ami.normalise_weights(true);

    for (s, &sum) in ami.source_weight_sums().iter().enumerate() {
        assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
        assert!(!ami.source_addresses()[s].is_empty());
    }
    // Total target coverage equals the total source area
    let mut covered = 0.0;
    for t in 0..9 {
        covered += ami.target_weight_sums()[t] * tgt.face_area(t);
    }
    assert_relative_eq!(covered, src.total_area(), epsilon = 1e-6);
    assert!(ami.check_symmetry());
}

#[test]
fn map_nearest_conserves_source_area() {
    let mut src = grid_patch(3);
    let mut tgt = grid_patch(2);
    let mut ami = AmiInterpolation::new(AmiMethod::MapNearest, 0.0);
    ami.calculate(&mut src, &mut tgt, None, &SerialComm);

    // Raw map-nearest weights partition the source area over target faces
    let total: f64 = ami.target_weight_sums().iter().sum();
    assert_relative_eq!(total, src.total_area(), epsilon = 1e-9);
    for addrs in ami.source_addresses() {
        assert_eq!(addrs.len(), 1);
    }
    assert!(ami.check_symmetry());
}

#[test]
fn agglomeration_preserves_weight_totals() {
    let mut src = grid_patch(2);
    let mut tgt = grid_patch(2);
    let mut ami = AmiInterpolation::new(AmiMethod::FaceAreaWeight, 0.0);
    ami.calculate(&mut src, &mut tgt, None, &SerialComm);

    // Coarsen 2x2 to 1x2 columns on both sides
    let restrict = [0, 1, 0, 1];
    let coarse = AmiInterpolation::agglomerate(&ami, &restrict, 2, &restrict, 2);

    let fine_total: f64 = ami.source_weight_sums().iter().sum();
    let coarse_total: f64 = coarse.source_weight_sums().iter().sum();
    assert_relative_eq!(coarse_total, fine_total, epsilon = 1e-9);
    assert!(coarse.check_symmetry());
}

#[test]
fn append_sums_duplicate_pairs() {
    let mut src = grid_patch(2);
    let mut tgt = grid_patch(2);
    let mut first = AmiInterpolation::new(AmiMethod::MapNearest, 0.0);
    first.calculate(&mut src, &mut tgt, None, &SerialComm);
    let mut second = AmiInterpolation::new(AmiMethod::MapNearest, 0.0);
    second.calculate(&mut src, &mut tgt, None, &SerialComm);

    let before: Vec<f64> = first.source_weight_sums().to_vec();
    first.append(&second);
    for (s, &sum) in first.source_weight_sums().iter().enumerate() {
        assert_relative_eq!(sum, 2.0 * before[s], epsilon = 1e-12);
        // Duplicate pairs merged, not duplicated
        assert_eq!(first.source_addresses()[s].len(), 1);
    }
}

#[test]
fn round_trip_preserves_addressing() {
    let mut src = grid_patch(2);
    let mut tgt = grid_patch(3);
    let mut ami = AmiInterpolation::new(AmiMethod::FaceAreaWeight, 1e-3);
    ami.calculate(&mut src, &mut tgt, None, &SerialComm);
    ami.normalise_weights(true);

    let mut buf = Vec::new();
    ami.write_stream(&mut buf).unwrap();
    let copy = AmiInterpolation::<f64>::read_stream(&mut buf.as_slice()).unwrap();

    assert_eq!(copy.source_addresses(), ami.source_addresses());
    assert_eq!(copy.source_weights(), ami.source_weights());
    assert_eq!(copy.target_addresses(), ami.target_addresses());
    assert_eq!(copy.target_weights(), ami.target_weights());
    assert_eq!(copy.distribution(), ami.distribution());
}

#[test]
fn projection_snaps_patches_to_master_surface() {
    // Both patches slightly off the z = 0 master plane
    let mut src = grid_patch(1);
    let mut tgt = grid_patch(2);
    let lift = |patch: &SurfacePatch<f64>, dz: f64| {
        let points = patch
            .points()
            .iter()
            .map(|p| [p[0], p[1], p[2] + dz])
            .collect();
        SurfacePatch::new(points, patch.faces().to_vec())
    };
    src = lift(&src, 0.05);
    tgt = lift(&tgt, -0.03);

    let master_points = vec![
        [-1.0, -1.0, 0.0],
        [2.0, -1.0, 0.0],
        [-1.0, 2.0, 0.0],
        [2.0, 2.0, 0.0],
    ];
    let master_tris = vec![[0, 1, 2], [1, 3, 2]];
    let surface = TriangleSurface::new(&master_points, &master_tris);
    let bb = BoundingBox::from_points(master_points.iter()).expanded(0.5);
    let master = Octree::new(surface, bb, 5, 2.0, 100.0);

    let mut ami = AmiInterpolation::new(AmiMethod::FaceAreaWeight, 1e-3);
    ami.calculate(&mut src, &mut tgt, Some(&master), &SerialComm);
    ami.normalise_weights(true);
    assert_relative_eq!(ami.source_weight_sums()[0], 1.0, epsilon = 1e-9);
}

#[test]
fn distribution_decision() {
    assert_eq!(calc_distribution(0, &SerialComm), Distribution::Empty);
    assert_eq!(calc_distribution(4, &SerialComm), Distribution::Local(0));
}
