//! Stream serialization of the octree: node arena, content lists and the
//! adapter-independent metadata, in a fixed token order.
//!
//! Token order per node: box min, box max, parent (`-1` for the root), then
//! the 8 child codes (`0` empty, `n + 1` node, `-(c + 1)` contents). The
//! shape set itself is not serialized; the reader supplies an equivalent set
//! and the recorded shape count guards against a mismatch.

use std::io::{Read, Write};

use crate::geometry::BoundingBox;
use crate::octree::node::{ChildRef, Node};
use crate::octree::Octree;
use crate::stream;
use crate::traits::shape::ShapeSet;
use crate::types::{Error, RealScalar, Result};

const TAG: &[u8; 4] = b"OCT1";

impl<T: RealScalar, S: ShapeSet<T>> Octree<T, S> {
    /// Write the full tree structure to a stream.
    pub fn write_stream<W: Write>(&self, w: &mut W) -> Result<()> {
        stream::write_tag(w, TAG)?;
        stream::write_usize(w, self.max_levels)?;
        stream::write_scalar(w, self.max_leaf_ratio)?;
        stream::write_scalar(w, self.max_duplicity)?;
        stream::write_point(w, &self.bounding_box().min)?;
        stream::write_point(w, &self.bounding_box().max)?;
        stream::write_usize(w, self.shapes().size())?;

        stream::write_usize(w, self.nodes.len())?;
        for node in &self.nodes {
            stream::write_point(w, &node.bb.min)?;
            stream::write_point(w, &node.bb.max)?;
            stream::write_i64(w, node.parent.map_or(-1, |p| p as i64))?;
            for child in &node.children {
                stream::write_i64(w, child.encode())?;
            }
        }

        stream::write_usize(w, self.contents.len())?;
        for list in &self.contents {
            stream::write_index_list(w, list)?;
        }
        Ok(())
    }

    /// Read a tree previously written with [`Octree::write_stream`],
    /// re-attaching it to an equivalent shape set.
    pub fn read_stream<R: Read>(shapes: S, r: &mut R) -> Result<Self> {
        stream::expect_tag(r, TAG)?;
        let max_levels = stream::read_usize(r)?;
        let max_leaf_ratio: T = stream::read_scalar(r)?;
        let max_duplicity: T = stream::read_scalar(r)?;
        let bb = BoundingBox {
            min: stream::read_point(r)?,
            max: stream::read_point(r)?,
        };
        let n_shapes = stream::read_usize(r)?;
        if n_shapes != shapes.size() {
            return Err(Error::Corrupt(format!(
                "stream indexes {} shapes, supplied set has {}",
                n_shapes,
                shapes.size()
            )));
        }

        let n_nodes = stream::read_usize(r)?;
        let mut nodes = Vec::with_capacity(n_nodes.min(1 << 20));
        for i in 0..n_nodes {
            let node_bb = BoundingBox {
                min: stream::read_point(r)?,
                max: stream::read_point(r)?,
            };
            let parent = match stream::read_i64(r)? {
                -1 => None,
                p if p >= 0 && (p as usize) < i => Some(p as usize),
                p => {
                    return Err(Error::Corrupt(format!(
                        "node {} has invalid parent reference {}",
                        i, p
                    )))
                }
            };
            let mut children = [ChildRef::Empty; 8];
            for child in &mut children {
                *child = ChildRef::decode(stream::read_i64(r)?);
            }
            nodes.push(Node {
                bb: node_bb,
                parent,
                children,
            });
        }

        let n_contents = stream::read_usize(r)?;
        let mut contents = Vec::with_capacity(n_contents.min(1 << 20));
        for _ in 0..n_contents {
            let list = stream::read_index_list(r)?;
            for &i in &list {
                if i >= n_shapes {
                    return Err(Error::Corrupt(format!(
                        "leaf references shape {} of {}",
                        i, n_shapes
                    )));
                }
            }
            contents.push(list);
        }

        // Child references must land inside the decoded arenas
        for (i, node) in nodes.iter().enumerate() {
            for child in &node.children {
                match *child {
                    ChildRef::Node(n) if n >= nodes.len() => {
                        return Err(Error::Corrupt(format!(
                            "node {} references node {} of {}",
                            i,
                            n,
                            nodes.len()
                        )))
                    }
                    ChildRef::Contents(c) if c >= contents.len() => {
                        return Err(Error::Corrupt(format!(
                            "node {} references content list {} of {}",
                            i,
                            c,
                            contents.len()
                        )))
                    }
                    _ => {}
                }
            }
        }

        Ok(Self::from_parts(
            shapes,
            bb,
            nodes,
            contents,
            max_levels,
            max_leaf_ratio,
            max_duplicity,
        ))
    }
}
