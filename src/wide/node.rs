use crate::aabb::Aabb;
use bytemuck::{Pod, Zeroable};

/// A node of an `N`-wide hierarchy (64 bytes for `N = 4`, 80 bytes for `N = 8`).
///
/// Interior nodes list up to `N` child node indices in `child[..child_count]`.
/// Leaves have `tri_count > 0` and reference `tri_count` entries of the primitive
/// index array starting at `first_tri`. A node with neither children nor
/// primitives is the root of an empty hierarchy.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WideNode<const N: usize> {
    /// Minimum corner of the node's bounds.
    pub min: [f32; 3],
    /// First index array entry of a leaf.
    pub first_tri: u32,
    /// Maximum corner of the node's bounds.
    pub max: [f32; 3],
    /// Number of primitives of a leaf, zero for interior nodes.
    pub tri_count: u32,
    /// Child node indices. Entries past `child_count` are zero.
    pub child: [u32; N],
    /// Number of used child entries.
    pub child_count: u32,
    /// Unused, keeps the node a multiple of 16 bytes.
    pub padding: [u32; 3],
}

/// 4-wide node.
pub type Node4 = WideNode<4>;

/// 8-wide node.
pub type Node8 = WideNode<8>;

// SAFETY: `WideNode` is `repr(C)` and only holds `f32`/`u32` values, which are
// valid for any bit pattern.
unsafe impl<const N: usize> Zeroable for WideNode<N> {}

// SAFETY: with four or eight children the fields add up to 64 and 80 bytes, so
// there is no implicit padding.
unsafe impl Pod for WideNode<4> {}
unsafe impl Pod for WideNode<8> {}

impl<const N: usize> Default for WideNode<N> {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

/// The decoded content of one child slot of a [`WideNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WideSlot {
    /// The slot is unused and never hit.
    Empty,
    /// The slot holds the index of an interior child node.
    Node(u32),
    /// The slot holds a leaf and its range in the primitive index array.
    Leaf {
        /// First entry of the range.
        first: u32,
        /// Number of entries.
        count: u32,
    },
}

impl<const N: usize> WideNode<N> {
    /// Creates a leaf referencing `count` index array entries starting at `first`.
    pub fn leaf(aabb: &Aabb, first: u32, count: u32) -> Self {
        let (min, max) = aabb.to_arrays();
        WideNode {
            min,
            first_tri: first,
            max,
            tri_count: count,
            ..Default::default()
        }
    }

    /// Creates an interior node with the given child node indices.
    pub fn interior(aabb: &Aabb, children: &[u32]) -> Self {
        let (min, max) = aabb.to_arrays();
        let mut child = [0; N];
        child[..children.len()].copy_from_slice(children);
        WideNode {
            min,
            max,
            child,
            child_count: children.len() as u32,
            ..Default::default()
        }
    }

    /// Returns true for leaves, including the root of an empty hierarchy.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.child_count == 0
    }

    /// Returns the node's bounds.
    pub fn aabb(&self) -> Aabb {
        Aabb::from_arrays(self.min, self.max)
    }

    /// Returns the used child node indices.
    pub fn children(&self) -> &[u32] {
        &self.child[..self.child_count as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::{Node4, Node8};
    use crate::aabb::Aabb;
    use std::mem;

    #[test]
    fn test_wide_node_layout() {
        assert_eq!(mem::size_of::<Node4>(), 64);
        assert_eq!(mem::size_of::<Node8>(), 80);
        assert_eq!(mem::offset_of!(Node4, child), 32);
        assert_eq!(mem::offset_of!(Node4, child_count), 48);
        assert_eq!(mem::offset_of!(Node8, child_count), 64);

        let node = Node8::interior(&Aabb::from_arrays([0.0; 3], [1.0; 3]), &[3, 4, 5]);
        let bytes: &[u8] = bytemuck::bytes_of(&node);
        assert_eq!(&bytes[32..36], &3u32.to_ne_bytes());
        assert_eq!(&bytes[64..68], &3u32.to_ne_bytes());
    }

    #[test]
    fn test_wide_node_children() {
        let aabb = Aabb::from_arrays([0.0; 3], [1.0; 3]);
        let node = Node4::interior(&aabb, &[2, 3]);
        assert_eq!(node.children(), &[2, 3]);
        assert_eq!(node.child, [2, 3, 0, 0]);
        assert!(!node.is_leaf());

        let leaf = Node4::leaf(&aabb, 7, 2);
        assert!(leaf.is_leaf());
        assert!(leaf.children().is_empty());
        assert!(Node4::default().is_leaf());
    }
}
