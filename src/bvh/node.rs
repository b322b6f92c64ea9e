use crate::aabb::Aabb;
use bytemuck::{Pod, Zeroable};

/// A node of the binary hierarchy in the Wald layout (32 bytes).
///
/// A node is a leaf when `tri_count > 0`; `left_first` then is the first entry of
/// its range in the primitive index array. Otherwise `left_first` is the index of
/// the left child and the right child sits right after it. The one exception is
/// the root of an empty hierarchy, which has both fields set to zero.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Node {
    /// Minimum corner of the node's bounds.
    pub min: [f32; 3],

    /// Left child index for interior nodes, first index array entry for leaves.
    pub left_first: u32,

    /// Maximum corner of the node's bounds.
    pub max: [f32; 3],

    /// Number of primitives of a leaf, zero for interior nodes.
    pub tri_count: u32,
}

/// The decoded content of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An interior node and the indices of its two children.
    Interior {
        /// Index of the left child.
        left: u32,
        /// Index of the right child, always `left + 1`.
        right: u32,
    },
    /// A leaf and its range in the primitive index array.
    Leaf {
        /// First entry of the range.
        first: u32,
        /// Number of entries.
        count: u32,
    },
}

impl Node {
    /// Creates an interior node whose children are stored at `left` and `left + 1`.
    pub fn interior(aabb: &Aabb, left: u32) -> Node {
        let (min, max) = aabb.to_arrays();
        Node {
            min,
            left_first: left,
            max,
            tri_count: 0,
        }
    }

    /// Creates a leaf referencing `count` index array entries starting at `first`.
    pub fn leaf(aabb: &Aabb, first: u32, count: u32) -> Node {
        let (min, max) = aabb.to_arrays();
        Node {
            min,
            left_first: first,
            max,
            tri_count: count,
        }
    }

    /// Returns true for leaves, including the empty root.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.tri_count > 0 || self.left_first == 0
    }

    /// Decodes the node content.
    #[inline]
    pub fn kind(&self) -> NodeKind {
        if self.is_leaf() {
            NodeKind::Leaf {
                first: self.left_first,
                count: self.tri_count,
            }
        } else {
            NodeKind::Interior {
                left: self.left_first,
                right: self.left_first + 1,
            }
        }
    }

    /// Returns the node's bounds.
    pub fn aabb(&self) -> Aabb {
        Aabb::from_arrays(self.min, self.max)
    }

    /// Surface area of the node's bounds.
    pub fn surface_area(&self) -> f32 {
        self.aabb().surface_area()
    }
}
