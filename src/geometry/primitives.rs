//! Free-function predicates over points, segments, triangles and polygons.
//!
//! All functions are pure and never fail for "normal" negative results (no
//! intersection, zero overlap); degenerate geometry degrades to zero-area or
//! `None` answers.

use crate::types::{Point3, RealScalar};

/// Componentwise difference `a - b`.
pub fn sub<T: RealScalar>(a: &Point3<T>, b: &Point3<T>) -> Point3<T> {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Componentwise sum `a + b`.
pub fn add<T: RealScalar>(a: &Point3<T>, b: &Point3<T>) -> Point3<T> {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// Scale by a scalar.
pub fn scale<T: RealScalar>(a: &Point3<T>, s: T) -> Point3<T> {
    [a[0] * s, a[1] * s, a[2] * s]
}

/// Dot product.
pub fn dot<T: RealScalar>(a: &Point3<T>, b: &Point3<T>) -> T {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product.
pub fn cross<T: RealScalar>(a: &Point3<T>, b: &Point3<T>) -> Point3<T> {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Squared magnitude.
pub fn mag_sq<T: RealScalar>(a: &Point3<T>) -> T {
    dot(a, a)
}

/// Squared distance between two points.
pub fn dist_sq<T: RealScalar>(a: &Point3<T>, b: &Point3<T>) -> T {
    mag_sq(&sub(a, b))
}

/// Unit vector along `a`, or `None` for a (near-)zero vector.
pub fn normalise<T: RealScalar>(a: &Point3<T>) -> Option<Point3<T>> {
    let m2 = mag_sq(a);
    if m2 <= T::min_positive_value() {
        return None;
    }
    Some(scale(a, m2.sqrt().recip()))
}

/// Nearest point on the segment `[a, b]` to `p`.
pub fn closest_point_on_segment<T: RealScalar>(
    a: &Point3<T>,
    b: &Point3<T>,
    p: &Point3<T>,
) -> Point3<T> {
    let ab = sub(b, a);
    let denom = mag_sq(&ab);
    if denom <= T::min_positive_value() {
        return *a;
    }
    let t = (dot(&sub(p, a), &ab) / denom).max(T::zero()).min(T::one());
    add(a, &scale(&ab, t))
}

/// Nearest point on the triangle `(a, b, c)` to `p`, by Voronoi-region
/// classification against the vertices, edges and interior.
pub fn closest_point_on_triangle<T: RealScalar>(
    a: &Point3<T>,
    b: &Point3<T>,
    c: &Point3<T>,
    p: &Point3<T>,
) -> Point3<T> {
    let ab = sub(b, a);
    let ac = sub(c, a);
    let ap = sub(p, a);

    let d1 = dot(&ab, &ap);
    let d2 = dot(&ac, &ap);
    if d1 <= T::zero() && d2 <= T::zero() {
        return *a;
    }

    let bp = sub(p, b);
    let d3 = dot(&ab, &bp);
    let d4 = dot(&ac, &bp);
    if d3 >= T::zero() && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= T::zero() && d1 >= T::zero() && d3 <= T::zero() {
        let denom = d1 - d3;
        if denom > T::zero() {
            return add(a, &scale(&ab, d1 / denom));
        }
        return *a;
    }

    let cp = sub(p, c);
    let d5 = dot(&ab, &cp);
    let d6 = dot(&ac, &cp);
    if d6 >= T::zero() && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= T::zero() && d2 >= T::zero() && d6 <= T::zero() {
        let denom = d2 - d6;
        if denom > T::zero() {
            return add(a, &scale(&ac, d2 / denom));
        }
        return *a;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= T::zero() && (d4 - d3) >= T::zero() && (d5 - d6) >= T::zero() {
        let denom = (d4 - d3) + (d5 - d6);
        if denom > T::zero() {
            let t = (d4 - d3) / denom;
            return add(b, &scale(&sub(c, b), t));
        }
        return *b;
    }

    // Interior: barycentric combination
    let denom = va + vb + vc;
    if denom <= T::min_positive_value() {
        // Degenerate triangle; fall back to the nearest edge
        let e0 = closest_point_on_segment(a, b, p);
        let e1 = closest_point_on_segment(b, c, p);
        let e2 = closest_point_on_segment(c, a, p);
        let mut best = e0;
        if dist_sq(&e1, p) < dist_sq(&best, p) {
            best = e1;
        }
        if dist_sq(&e2, p) < dist_sq(&best, p) {
            best = e2;
        }
        return best;
    }
    let v = vb / denom;
    let w = vc / denom;
    add(&add(a, &scale(&ab, v)), &scale(&ac, w))
}

/// Nearest pair of points between the segments `[p0, p1]` and `[q0, q1]`,
/// returned as (point on first, point on second).
pub fn closest_points_between_segments<T: RealScalar>(
    p0: &Point3<T>,
    p1: &Point3<T>,
    q0: &Point3<T>,
    q1: &Point3<T>,
) -> (Point3<T>, Point3<T>) {
    let d1 = sub(p1, p0);
    let d2 = sub(q1, q0);
    let r = sub(p0, q0);
    let a = mag_sq(&d1);
    let e = mag_sq(&d2);
    let f = dot(&d2, &r);
    let eps = T::min_positive_value();

    let (s, t);
    if a <= eps && e <= eps {
        return (*p0, *q0);
    }
    if a <= eps {
        s = T::zero();
        t = (f / e).max(T::zero()).min(T::one());
    } else {
        let c = dot(&d1, &r);
        if e <= eps {
            t = T::zero();
            s = (-c / a).max(T::zero()).min(T::one());
        } else {
            let b = dot(&d1, &d2);
            let denom = a * e - b * b;
            let mut s_ = if denom > eps {
                ((b * f - c * e) / denom).max(T::zero()).min(T::one())
            } else {
                T::zero()
            };
            let mut t_ = (b * s_ + f) / e;
            if t_ < T::zero() {
                t_ = T::zero();
                s_ = (-c / a).max(T::zero()).min(T::one());
            } else if t_ > T::one() {
                t_ = T::one();
                s_ = ((b - c) / a).max(T::zero()).min(T::one());
            }
            s = s_;
            t = t_;
        }
    }
    (add(p0, &scale(&d1, s)), add(q0, &scale(&d2, t)))
}

/// Intersection of the segment `[start, end]` with the triangle `(a, b, c)`,
/// returned as the intersection point, or `None` if the segment misses.
pub fn segment_triangle_intersection<T: RealScalar>(
    start: &Point3<T>,
    end: &Point3<T>,
    a: &Point3<T>,
    b: &Point3<T>,
    c: &Point3<T>,
) -> Option<Point3<T>> {
    let eps = T::epsilon();
    let dir = sub(end, start);
    let e1 = sub(b, a);
    let e2 = sub(c, a);

    let h = cross(&dir, &e2);
    let det = dot(&e1, &h);
    if det.abs() <= eps {
        return None;
    }
    let inv_det = det.recip();
    let s = sub(start, a);
    let u = dot(&s, &h) * inv_det;
    if u < -eps || u > T::one() + eps {
        return None;
    }
    let q = cross(&s, &e1);
    let v = dot(&dir, &q) * inv_det;
    if v < -eps || u + v > T::one() + eps {
        return None;
    }
    let t = dot(&e2, &q) * inv_det;
    if t < -eps || t > T::one() + eps {
        return None;
    }
    Some(add(start, &scale(&dir, t.max(T::zero()).min(T::one()))))
}

/// Area vector of a (possibly warped) polygon by Newell's method; its
/// magnitude is the polygon area and its direction the right-handed normal.
pub fn face_area_vector<T: RealScalar>(points: &[Point3<T>]) -> Point3<T> {
    let mut n = [T::zero(); 3];
    let np = points.len();
    for i in 0..np {
        let p = &points[i];
        let q = &points[(i + 1) % np];
        n[0] = n[0] + (p[1] - q[1]) * (p[2] + q[2]);
        n[1] = n[1] + (p[2] - q[2]) * (p[0] + q[0]);
        n[2] = n[2] + (p[0] - q[0]) * (p[1] + q[1]);
    }
    scale(&n, T::from(0.5).unwrap())
}

/// Scalar polygon area.
pub fn face_area<T: RealScalar>(points: &[Point3<T>]) -> T {
    mag_sq(&face_area_vector(points)).sqrt()
}

/// Arithmetic-mean face centre. Exact for simplices, adequate for the convex
/// faces this crate indexes.
pub fn face_centre<T: RealScalar>(points: &[Point3<T>]) -> Point3<T> {
    let mut c = [T::zero(); 3];
    for p in points {
        c = add(&c, p);
    }
    scale(&c, T::from(points.len()).unwrap().recip())
}

/// An orthonormal in-plane basis for a plane with the given (non-unit) normal.
pub fn plane_basis<T: RealScalar>(normal: &Point3<T>) -> Option<(Point3<T>, Point3<T>)> {
    let n = normalise(normal)?;
    // Pick the coordinate axis least aligned with the normal
    let axis = if n[0].abs() <= n[1].abs() && n[0].abs() <= n[2].abs() {
        [T::one(), T::zero(), T::zero()]
    } else if n[1].abs() <= n[2].abs() {
        [T::zero(), T::one(), T::zero()]
    } else {
        [T::zero(), T::zero(), T::one()]
    };
    let e1 = normalise(&cross(&n, &axis))?;
    let e2 = cross(&n, &e1);
    Some((e1, e2))
}

/// Signed area of a 2D polygon (positive for counter-clockwise winding).
pub fn polygon_area_2d<T: RealScalar>(points: &[[T; 2]]) -> T {
    let mut a = T::zero();
    let np = points.len();
    for i in 0..np {
        let p = points[i];
        let q = points[(i + 1) % np];
        a = a + p[0] * q[1] - q[0] * p[1];
    }
    a * T::from(0.5).unwrap()
}

/// Clip a polygon against a convex clip polygon (Sutherland–Hodgman). The
/// clip polygon must wind counter-clockwise; the subject may wind either way.
pub fn clip_polygon<T: RealScalar>(subject: &[[T; 2]], clip: &[[T; 2]]) -> Vec<[T; 2]> {
    let mut output: Vec<[T; 2]> = subject.to_vec();
    let nc = clip.len();

    for i in 0..nc {
        if output.is_empty() {
            break;
        }
        let a = clip[i];
        let b = clip[(i + 1) % nc];
        // Inside = left of the directed clip edge a->b
        let inside = |p: &[T; 2]| (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0]);

        let input = std::mem::take(&mut output);
        let n = input.len();
        for j in 0..n {
            let p = input[j];
            let q = input[(j + 1) % n];
            let dp = inside(&p);
            let dq = inside(&q);

            if dp >= T::zero() {
                output.push(p);
                if dq < T::zero() {
                    output.push(edge_intersection(&p, &q, dp, dq));
                }
            } else if dq >= T::zero() {
                output.push(edge_intersection(&p, &q, dp, dq));
            }
        }
    }
    output
}

fn edge_intersection<T: RealScalar>(p: &[T; 2], q: &[T; 2], dp: T, dq: T) -> [T; 2] {
    let t = dp / (dp - dq);
    [p[0] + t * (q[0] - p[0]), p[1] + t * (q[1] - p[1])]
}

/// Overlap area between two planar 3D polygons, measured in the plane of
/// `reference`. Returns zero for degenerate reference faces or disjoint
/// polygons.
pub fn polygon_overlap_area<T: RealScalar>(reference: &[Point3<T>], other: &[Point3<T>]) -> T {
    let normal = face_area_vector(reference);
    let Some((e1, e2)) = plane_basis(&normal) else {
        return T::zero();
    };
    let origin = face_centre(reference);

    let project = |pts: &[Point3<T>]| -> Vec<[T; 2]> {
        pts.iter()
            .map(|p| {
                let r = sub(p, &origin);
                [dot(&r, &e1), dot(&r, &e2)]
            })
            .collect()
    };

    let mut clip = project(reference);
    if polygon_area_2d(&clip) < T::zero() {
        clip.reverse();
    }
    let subject = project(other);

    let clipped = clip_polygon(&subject, &clip);
    if clipped.len() < 3 {
        return T::zero();
    }
    polygon_area_2d(&clipped).abs()
}
