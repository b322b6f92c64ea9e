use crate::aabb::Aabb;
use crate::cwbvh::quantize::{dequantize, scale_from_exponent};
use crate::triangle::Triangle;
use crate::wide::WideSlot;
use bytemuck::{Pod, Zeroable};

/// Size of one block in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Number of 16-byte blocks occupied by one [`NodeCwbvh`].
pub const BLOCKS_PER_NODE: usize = 5;

/// Number of 16-byte blocks occupied by one [`CwbvhTriangle`].
pub const BLOCKS_PER_PRIMITIVE: usize = 3;

/// Largest number of primitives a single leaf slot can reference.
pub const MAX_LEAF_PRIMITIVES: usize = 3;

/// Largest primitive offset (exclusive) relative to `primitive_base_idx`.
pub const MAX_PRIMITIVE_OFFSET: usize = 24;

/// High bits of the meta byte of an interior child.
pub(crate) const INTERIOR_META: u8 = 0b001_00000;

/// A compressed 8-wide node (80 bytes), following "Efficient Incoherent Ray
/// Traversal on GPUs Through Compressed Wide BVHs" (Ylitie et al. 2017).
///
/// Child boxes are stored as 8-bit offsets from `p`, scaled per axis by the power
/// of two encoded in `e`, and always enclose the true child bounds.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct NodeCwbvh {
    /// Quantization origin, the minimum corner of the node's bounds.
    pub p: [f32; 3],
    /// Biased per-axis exponents of the quantization scale.
    pub e: [u8; 3],
    /// Bit `i` is set when slot `i` holds an interior child.
    pub imask: u8,
    /// Index of the first interior child. The others follow in slot order.
    pub child_base_idx: u32,
    /// Index of the first primitive referenced by a leaf slot.
    pub primitive_base_idx: u32,
    /// Per-slot meta: `0` for empty slots, `0b001_00000 | (24 + slot)` for interior
    /// children, unary primitive count in the upper 3 bits and the primitive offset
    /// in the lower 5 bits for leaves.
    pub child_meta: [u8; 8],
    /// Quantized minimum x per slot.
    pub qlo_x: [u8; 8],
    /// Quantized minimum y per slot.
    pub qlo_y: [u8; 8],
    /// Quantized minimum z per slot.
    pub qlo_z: [u8; 8],
    /// Quantized maximum x per slot.
    pub qhi_x: [u8; 8],
    /// Quantized maximum y per slot.
    pub qhi_y: [u8; 8],
    /// Quantized maximum z per slot.
    pub qhi_z: [u8; 8],
}

impl NodeCwbvh {
    /// Returns `true` if no slot holds an interior child.
    pub fn is_leaf(&self) -> bool {
        self.imask == 0
    }

    /// Returns the per-axis quantization scale.
    pub fn scale(&self) -> [f32; 3] {
        self.e.map(scale_from_exponent)
    }

    /// Decodes child slot `slot`.
    pub fn slot(&self, slot: usize) -> WideSlot {
        let meta = self.child_meta[slot];
        if meta == 0 {
            WideSlot::Empty
        } else if self.imask & (1 << slot) != 0 {
            let preceding = self.imask as u32 & ((1u32 << slot) - 1);
            WideSlot::Node(self.child_base_idx + preceding.count_ones())
        } else {
            WideSlot::Leaf {
                first: self.primitive_base_idx + (meta & 0b11111) as u32,
                count: (meta >> 5).count_ones(),
            }
        }
    }

    /// Returns the quantized `(lo, hi)` corners of slot `slot`.
    pub fn quantized_bounds(&self, slot: usize) -> ([u8; 3], [u8; 3]) {
        (
            [self.qlo_x[slot], self.qlo_y[slot], self.qlo_z[slot]],
            [self.qhi_x[slot], self.qhi_y[slot], self.qhi_z[slot]],
        )
    }

    pub(crate) fn set_quantized_bounds(&mut self, slot: usize, lo: [u8; 3], hi: [u8; 3]) {
        self.qlo_x[slot] = lo[0];
        self.qlo_y[slot] = lo[1];
        self.qlo_z[slot] = lo[2];
        self.qhi_x[slot] = hi[0];
        self.qhi_y[slot] = hi[1];
        self.qhi_z[slot] = hi[2];
    }

    /// Decodes the raw corners of slot `slot`.
    #[inline]
    pub fn child_bounds(&self, slot: usize) -> ([f32; 3], [f32; 3]) {
        let scale = self.scale();
        let (lo, hi) = self.quantized_bounds(slot);
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for axis in 0..3 {
            min[axis] = dequantize(self.p[axis], scale[axis], lo[axis]);
            max[axis] = dequantize(self.p[axis], scale[axis], hi[axis]);
        }
        (min, max)
    }

    /// Decodes the box of slot `slot`, or `None` for an empty slot.
    pub fn child_aabb(&self, slot: usize) -> Option<Aabb> {
        if self.child_meta[slot] == 0 {
            return None;
        }
        let (min, max) = self.child_bounds(slot);
        Some(Aabb::from_arrays(min, max))
    }
}

/// Meta byte of a leaf slot referencing `count` primitives at `offset`.
pub(crate) fn leaf_meta(count: usize, offset: usize) -> u8 {
    ((((1u32 << count) - 1) << 5) | offset as u32) as u8
}

/// Meta byte of an interior child in slot `slot`.
pub(crate) fn interior_meta(slot: usize) -> u8 {
    INTERIOR_META | (24 + slot as u8)
}

/// A primitive record of the compressed hierarchy (48 bytes): the triangle in
/// vertex/edge form together with its index in the source geometry.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct CwbvhTriangle {
    /// `b - a`.
    pub edge1: [f32; 3],
    /// Index of the triangle in the geometry the hierarchy was built from.
    pub prim_index: u32,
    /// `c - a`.
    pub edge2: [f32; 3],
    padding_0: u32,
    /// `a`.
    pub vertex0: [f32; 3],
    padding_1: u32,
}

impl CwbvhTriangle {
    /// Stores `triangle` with its index `prim_index`.
    pub fn new(triangle: &Triangle, prim_index: u32) -> CwbvhTriangle {
        let (edge1, edge2) = triangle.edges();
        CwbvhTriangle {
            edge1: edge1.into(),
            prim_index,
            edge2: edge2.into(),
            vertex0: triangle.a.coords.into(),
            ..Default::default()
        }
    }

    /// Reconstructs the three vertices. The second and third vertex may differ
    /// from the source by the rounding error of the stored edges.
    pub fn vertices(&self) -> [[f32; 3]; 3] {
        let v0 = self.vertex0;
        let add = |e: [f32; 3]| [v0[0] + e[0], v0[1] + e[1], v0[2] + e[2]];
        [v0, add(self.edge1), add(self.edge2)]
    }
}

#[cfg(test)]
mod tests {
    use super::{interior_meta, leaf_meta, CwbvhTriangle, NodeCwbvh};
    use crate::triangle::Triangle;
    use crate::wide::WideSlot;
    use std::mem;

    #[test]
    fn test_cwbvh_node_layout() {
        assert_eq!(mem::size_of::<NodeCwbvh>(), 80);
        assert_eq!(mem::offset_of!(NodeCwbvh, p), 0);
        assert_eq!(mem::offset_of!(NodeCwbvh, e), 12);
        assert_eq!(mem::offset_of!(NodeCwbvh, imask), 15);
        assert_eq!(mem::offset_of!(NodeCwbvh, child_base_idx), 16);
        assert_eq!(mem::offset_of!(NodeCwbvh, primitive_base_idx), 20);
        assert_eq!(mem::offset_of!(NodeCwbvh, child_meta), 24);
        assert_eq!(mem::offset_of!(NodeCwbvh, qlo_x), 32);
        assert_eq!(mem::offset_of!(NodeCwbvh, qlo_y), 40);
        assert_eq!(mem::offset_of!(NodeCwbvh, qlo_z), 48);
        assert_eq!(mem::offset_of!(NodeCwbvh, qhi_x), 56);
        assert_eq!(mem::offset_of!(NodeCwbvh, qhi_y), 64);
        assert_eq!(mem::offset_of!(NodeCwbvh, qhi_z), 72);
    }

    #[test]
    fn test_primitive_layout() {
        assert_eq!(mem::size_of::<CwbvhTriangle>(), 48);
        let t = Triangle::from([[1.0, 2.0, 3.0], [2.0, 2.0, 3.0], [1.0, 4.0, 3.0]]);
        let record = CwbvhTriangle::new(&t, 9);
        let words: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&record));
        assert_eq!(&words[0..3], &[1.0, 0.0, 0.0]);
        assert_eq!(words[3].to_bits(), 9);
        assert_eq!(&words[4..7], &[0.0, 2.0, 0.0]);
        assert_eq!(&words[8..11], &[1.0, 2.0, 3.0]);
        assert_eq!(record.vertices()[2], [1.0, 4.0, 3.0]);
    }

    #[test]
    fn test_slot_meta() {
        assert_eq!(leaf_meta(1, 0), 0b001_00000);
        assert_eq!(leaf_meta(3, 5), 0b111_00101);
        assert_eq!(interior_meta(0), 0b001_11000);
        assert_eq!(interior_meta(7), 0b001_11111);

        let mut node = NodeCwbvh {
            child_base_idx: 10,
            primitive_base_idx: 20,
            ..Default::default()
        };
        node.imask = 0b0000_0101;
        node.child_meta[0] = interior_meta(0);
        node.child_meta[1] = leaf_meta(2, 3);
        node.child_meta[2] = interior_meta(2);

        assert_eq!(node.slot(0), WideSlot::Node(10));
        assert_eq!(node.slot(1), WideSlot::Leaf { first: 23, count: 2 });
        assert_eq!(node.slot(2), WideSlot::Node(11));
        assert_eq!(node.slot(3), WideSlot::Empty);
        assert!(node.child_aabb(3).is_none());
    }
}
