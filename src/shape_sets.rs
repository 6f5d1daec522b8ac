//! Concrete shape sets: point clouds, edge subsets, polygonal face subsets
//! and triangulated surfaces, all satisfying [`crate::traits::ShapeSet`].

pub mod edge_set;
pub mod face_set;
pub mod point_set;
pub mod triangle_surface;

pub use edge_set::EdgeSet;
pub use face_set::FaceSet;
pub use point_set::{DynamicPointSet, PointSet};
pub use triangle_surface::TriangleSurface;
