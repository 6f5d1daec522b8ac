//! Types shared across the crate.

/// Scalar type over which geometry is generic.
pub trait RealScalar:
    num::Float + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static
{
}

impl<T: num::Float + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static> RealScalar for T {}

/// A 3D coordinate.
pub type Point3<T> = [T; 3];

/// Result of a spatial query: the index of the shape that was hit (if any)
/// and the associated point (nearest point or intersection point).
///
/// A miss is an ordinary value, not an error; callers branch on [`Hit::found`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit<T> {
    /// Index of the hit shape into the indexed collection, `None` on a miss.
    pub index: Option<usize>,
    /// Nearest or intersection point. Meaningless on a miss.
    pub point: Point3<T>,
}

impl<T: RealScalar> Hit<T> {
    /// A successful hit on shape `index` at `point`.
    pub fn hit(index: usize, point: Point3<T>) -> Self {
        Self {
            index: Some(index),
            point,
        }
    }

    /// A miss.
    pub fn miss() -> Self {
        Self {
            index: None,
            point: [T::zero(); 3],
        }
    }

    /// Whether the query found anything.
    pub fn found(&self) -> bool {
        self.index.is_some()
    }
}

/// Classification of a point relative to a closed shape collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeType {
    /// Point lies inside the closed surface.
    Inside,
    /// Point lies outside the closed surface.
    Outside,
    /// Region straddles the surface (used for per-node classification).
    Mixed,
    /// The collection cannot decide. Callers must never coerce this to
    /// inside or outside.
    Unknown,
}

/// Errors reported by this crate.
///
/// Only recoverable, caller-visible conditions appear here; internal invariant
/// violations (corrupt index tables, mismatched agglomeration inputs) panic,
/// since any continuation would silently produce wrong addressing.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A serialized stream did not decode back to a valid structure.
    #[error("corrupt stream: {0}")]
    Corrupt(String),
    /// An I/O failure while reading or writing a stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// An AMI method name that is not in the closed method set.
    #[error("unknown AMI method {0:?}")]
    UnknownMethod(String),
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
