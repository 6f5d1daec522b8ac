//! Trait definitions: the contracts between the spatial index and the
//! externally owned geometry it indexes.

pub mod shape;

pub use shape::{LineNearest, Nearest, ShapeSet};
