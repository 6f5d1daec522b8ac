//! Axis-aligned bounding box.

use crate::types::{Point3, RealScalar};

/// An axis-aligned box given by its extremal corners.
///
/// The null box (`min = +inf`, `max = -inf`) represents "empty"; any point
/// extends it to a point box. All predicates are pure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox<T> {
    /// Minimum corner.
    pub min: Point3<T>,
    /// Maximum corner.
    pub max: Point3<T>,
}

impl<T: RealScalar> BoundingBox<T> {
    /// Box from two extremal corners. Panics if `min > max` in any component.
    pub fn new(min: Point3<T>, max: Point3<T>) -> Self {
        for d in 0..3 {
            assert!(
                min[d] <= max[d],
                "invalid bounding box: min {} > max {} in component {}",
                min[d],
                max[d],
                d
            );
        }
        Self { min, max }
    }

    /// The explicit empty box.
    pub fn null() -> Self {
        Self {
            min: [T::infinity(); 3],
            max: [T::neg_infinity(); 3],
        }
    }

    /// Whether this is the empty box.
    pub fn is_null(&self) -> bool {
        (0..3).any(|d| self.min[d] > self.max[d])
    }

    /// Min/max reduction over a point set. Empty input yields the null box.
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point3<T>>,
    {
        let mut bb = Self::null();
        for p in points {
            bb.extend(p);
        }
        bb
    }

    /// Grow to cover `point`.
    pub fn extend(&mut self, point: &Point3<T>) {
        for d in 0..3 {
            self.min[d] = self.min[d].min(point[d]);
            self.max[d] = self.max[d].max(point[d]);
        }
    }

    /// The union of two boxes.
    pub fn union(&self, other: &Self) -> Self {
        let mut bb = *self;
        if !other.is_null() {
            bb.extend(&other.min);
            bb.extend(&other.max);
        }
        bb
    }

    /// Symmetric expansion by `fraction` of the diagonal length, used to
    /// avoid exact-boundary degeneracies before indexing.
    pub fn inflate(&self, fraction: T) -> Self {
        let span = self.span();
        let diag = (span[0] * span[0] + span[1] * span[1] + span[2] * span[2]).sqrt();
        let delta = fraction * diag;
        Self {
            min: [
                self.min[0] - delta,
                self.min[1] - delta,
                self.min[2] - delta,
            ],
            max: [
                self.max[0] + delta,
                self.max[1] + delta,
                self.max[2] + delta,
            ],
        }
    }

    /// Expansion by an absolute distance `delta` in every direction.
    pub fn expanded(&self, delta: T) -> Self {
        Self {
            min: [
                self.min[0] - delta,
                self.min[1] - delta,
                self.min[2] - delta,
            ],
            max: [
                self.max[0] + delta,
                self.max[1] + delta,
                self.max[2] + delta,
            ],
        }
    }

    /// Componentwise extent.
    pub fn span(&self) -> Point3<T> {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Centre of the box.
    pub fn midpoint(&self) -> Point3<T> {
        let half = T::from(0.5).unwrap();
        [
            half * (self.min[0] + self.max[0]),
            half * (self.min[1] + self.max[1]),
            half * (self.min[2] + self.max[2]),
        ]
    }

    /// The shortest edge length of the box.
    pub fn min_span(&self) -> T {
        let s = self.span();
        s[0].min(s[1]).min(s[2])
    }

    /// Closed containment test.
    pub fn contains(&self, point: &Point3<T>) -> bool {
        (0..3).all(|d| point[d] >= self.min[d] && point[d] <= self.max[d])
    }

    /// Box/box overlap test (closed, so touching boxes overlap).
    pub fn overlaps(&self, other: &Self) -> bool {
        (0..3).all(|d| self.min[d] <= other.max[d] && self.max[d] >= other.min[d])
    }

    /// Box/sphere overlap test against a sphere given by centre and squared
    /// radius.
    pub fn overlaps_sphere(&self, centre: &Point3<T>, radius_sq: T) -> bool {
        self.distance_sq(centre) <= radius_sq
    }

    /// Squared distance from `point` to the box, zero for contained points.
    /// This is the lower bound used to prune octree descent.
    pub fn distance_sq(&self, point: &Point3<T>) -> T {
        let mut d2 = T::zero();
        for d in 0..3 {
            let v = if point[d] < self.min[d] {
                self.min[d] - point[d]
            } else if point[d] > self.max[d] {
                point[d] - self.max[d]
            } else {
                T::zero()
            };
            d2 = d2 + v * v;
        }
        d2
    }

    /// One of the 8 equal sub-boxes obtained by splitting at the midpoint.
    /// Bit 0 selects the x-high half, bit 1 y-high, bit 2 z-high.
    pub fn octant(&self, i: usize) -> Self {
        debug_assert!(i < 8);
        let mid = self.midpoint();
        let mut min = self.min;
        let mut max = mid;
        for d in 0..3 {
            if i & (1 << d) != 0 {
                min[d] = mid[d];
                max[d] = self.max[d];
            }
        }
        Self { min, max }
    }

    /// Index of the octant the point falls in, midpoint ties resolving to the
    /// high side.
    pub fn octant_containing(&self, point: &Point3<T>) -> usize {
        let mid = self.midpoint();
        let mut oct = 0;
        for d in 0..3 {
            if point[d] >= mid[d] {
                oct |= 1 << d;
            }
        }
        oct
    }
}
