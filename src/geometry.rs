//! Geometric primitives: axis-aligned boxes, vector helpers and the
//! point/segment/triangle/polygon predicates used by the shape sets and AMI.

pub mod bounding_box;
pub mod primitives;

pub use bounding_box::BoundingBox;
