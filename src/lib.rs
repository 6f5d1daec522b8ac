//! Indexed octree spatial search and AMI surface-to-surface interpolation.
//!
//! The [`octree`] module indexes an arbitrary shape collection (points, edges,
//! faces, triangles) exposed through the [`traits::shape::ShapeSet`] contract
//! and answers nearest-point, line-intersection and region queries. The
//! [`ami`] module builds on two such trees to compute face-to-face overlap
//! weights between independently discretised surface patches.
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

pub mod ami;
pub mod geometry;
pub mod octree;
pub mod parallel;
pub mod patch;
pub mod shape_sets;
pub mod stream;
pub mod traits;
pub mod types;
