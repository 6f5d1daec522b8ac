//! Flat-arena node storage for the indexed octree.

use crate::geometry::BoundingBox;

/// Tagged reference held in a child slot of an interior node.
///
/// Serialized as a signed integer: `0` empty, `n + 1` for `Node(n)`,
/// `-(c + 1)` for `Contents(c)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildRef {
    /// Nothing falls in this octant.
    Empty,
    /// Index of a deeper interior node.
    Node(usize),
    /// Index of a leaf content list.
    Contents(usize),
}

impl ChildRef {
    /// Signed-integer encoding used by the stream format.
    pub fn encode(self) -> i64 {
        match self {
            ChildRef::Empty => 0,
            ChildRef::Node(n) => n as i64 + 1,
            ChildRef::Contents(c) => -(c as i64 + 1),
        }
    }

    /// Inverse of [`ChildRef::encode`].
    pub fn decode(code: i64) -> Self {
        if code == 0 {
            ChildRef::Empty
        } else if code > 0 {
            ChildRef::Node((code - 1) as usize)
        } else {
            ChildRef::Contents((-code - 1) as usize)
        }
    }
}

/// Interior node: a box, a parent link and exactly 8 child slots. Child
/// octant `i` covers the sub-box `bb.octant(i)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    /// Region covered by this node.
    pub bb: BoundingBox<T>,
    /// Index of the parent node, `None` for the root.
    pub parent: Option<usize>,
    /// One tagged reference per octant.
    pub children: [ChildRef; 8],
}
