//! Compression of an 8-wide hierarchy into the quantized CWBVH format.

use std::collections::VecDeque;

use crate::aabb::Aabb;
use crate::bvh::Bvh;
use crate::config::BuildConfig;
use crate::cwbvh::node::{
    interior_meta, leaf_meta, CwbvhTriangle, NodeCwbvh, BLOCKS_PER_NODE, BLOCK_SIZE,
    MAX_LEAF_PRIMITIVES, MAX_PRIMITIVE_OFFSET,
};
use crate::cwbvh::quantize::Quantizer;
use crate::error::{BvhError, Result};
use crate::triangle::Triangle;
use crate::wide::{Bvh8, Node8, WideSlot};

/// A compressed 8-wide hierarchy.
///
/// Nodes are stored in breadth-first order with the root at index 0. Unlike the
/// other layouts it owns a copy of its primitives in [`CwbvhTriangle`] form, so it
/// does not borrow the geometry it was built from.
#[derive(Debug, Clone)]
pub struct Cwbvh {
    nodes: Vec<NodeCwbvh>,
    primitives: Vec<CwbvhTriangle>,
}

impl Cwbvh {
    /// Compresses an 8-wide hierarchy.
    ///
    /// Every leaf of `bvh8` must hold at most three primitives, see
    /// [`Bvh::split_leaves`]. Larger leaves return
    /// [`BvhError::CapacityOverflow`].
    ///
    /// # Examples
    /// ```
    /// use bvh_layouts::bvh::Bvh;
    /// use bvh_layouts::cwbvh::{Cwbvh, BLOCKS_PER_NODE};
    /// use bvh_layouts::triangle::Triangle;
    /// use bvh_layouts::wide::Bvh8;
    ///
    /// let triangles = [
    ///     Triangle::from([[-2.0, 1.0, -1.0], [-1.0, 1.0, -1.0], [-2.0, 0.0, -1.0]]),
    ///     Triangle::from([[2.0, 1.0, -1.0], [2.0, 0.0, -1.0], [1.0, 0.0, -1.0]]),
    /// ];
    /// let bvh = Bvh::build(&triangles).unwrap();
    /// let cwbvh = Cwbvh::new(&Bvh8::new(&bvh)).unwrap();
    ///
    /// assert_eq!(cwbvh.node_count(), 1);
    /// assert_eq!(cwbvh.block_count(), BLOCKS_PER_NODE);
    /// assert_eq!(cwbvh.primitive_count(), 2);
    /// ```
    pub fn new(bvh8: &Bvh8) -> Result<Cwbvh> {
        let mut compressor = Compressor {
            source: bvh8,
            nodes: vec![NodeCwbvh::default()],
            primitives: Vec::with_capacity(bvh8.primitive_count()),
            queue: VecDeque::new(),
        };
        if bvh8.primitive_count() > 0 {
            compressor.queue.push_back((0, 0));
        }
        while let Some((wide_index, cw_index)) = compressor.queue.pop_front() {
            compressor.compress_node(wide_index, cw_index)?;
        }

        let cwbvh = Cwbvh {
            nodes: compressor.nodes,
            primitives: compressor.primitives,
        };
        log::debug!(
            "compressed {} 8-wide nodes into {} CWBVH nodes ({} blocks, {} primitives)",
            bvh8.node_count(),
            cwbvh.node_count(),
            cwbvh.block_count(),
            cwbvh.primitive_count()
        );
        Ok(cwbvh)
    }

    /// Builds a binary hierarchy over `triangles`, limits its leaves to three
    /// primitives, collapses it to 8-wide and compresses it.
    pub fn build(triangles: &[Triangle], config: BuildConfig) -> Result<Cwbvh> {
        let bvh = Bvh::build_with_config(triangles, config)?;
        let bvh = bvh.split_leaves(MAX_LEAF_PRIMITIVES)?;
        Cwbvh::new(&Bvh8::new(&bvh))
    }

    /// Returns the node array.
    pub fn nodes(&self) -> &[NodeCwbvh] {
        &self.nodes
    }

    /// Returns the node array as raw bytes, five 16-byte blocks per node.
    pub fn node_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// Returns the number of 16-byte blocks of the node array.
    pub fn block_count(&self) -> usize {
        self.node_bytes().len() / BLOCK_SIZE
    }

    /// Returns the number of nodes, `block_count() / BLOCKS_PER_NODE`.
    pub fn node_count(&self) -> usize {
        self.block_count() / BLOCKS_PER_NODE
    }

    /// Returns the primitive records in the order the leaves reference them.
    pub fn primitives(&self) -> &[CwbvhTriangle] {
        &self.primitives
    }

    /// Returns the primitive records as raw bytes, three 16-byte blocks each.
    pub fn primitive_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.primitives)
    }

    /// Returns the number of primitive records.
    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Returns the source index of each primitive record.
    pub fn primitive_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.primitives.iter().map(|p| p.prim_index)
    }

    /// Returns the root node.
    pub fn root(&self) -> &NodeCwbvh {
        &self.nodes[0]
    }

    /// Checks that every decoded child box encloses all primitives below it,
    /// that every child and primitive reference is in range and that each
    /// primitive record is referenced exactly once.
    pub fn validate(&self) -> bool {
        let mut referenced = vec![false; self.primitives.len()];
        let mut visited = vec![false; self.nodes.len()];
        if self.primitives.is_empty() {
            return self.nodes.len() == 1 && self.nodes[0] == NodeCwbvh::default();
        }

        let mut stack = vec![0usize];
        while let Some(node_index) = stack.pop() {
            if visited[node_index] {
                return false;
            }
            visited[node_index] = true;
            let node = &self.nodes[node_index];
            for slot in 0..8 {
                let Some(aabb) = node.child_aabb(slot) else {
                    continue;
                };
                match node.slot(slot) {
                    WideSlot::Empty => {}
                    WideSlot::Node(child) => {
                        if child as usize >= self.nodes.len() {
                            return false;
                        }
                        if !self.subtree_within(child as usize, &aabb) {
                            return false;
                        }
                        stack.push(child as usize);
                    }
                    WideSlot::Leaf { first, count } => {
                        let range = first as usize..(first + count) as usize;
                        if range.end > self.primitives.len() {
                            return false;
                        }
                        for prim in range {
                            if referenced[prim] || !primitive_within(&self.primitives[prim], &aabb)
                            {
                                return false;
                            }
                            referenced[prim] = true;
                        }
                    }
                }
            }
        }
        referenced.iter().all(|r| *r) && visited.iter().all(|v| *v)
    }

    /// Returns true if every primitive below node `node_index` lies in `aabb`.
    fn subtree_within(&self, node_index: usize, aabb: &Aabb) -> bool {
        let mut stack = vec![node_index];
        while let Some(index) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                return false;
            };
            for slot in 0..8 {
                match node.slot(slot) {
                    WideSlot::Empty => {}
                    WideSlot::Node(child) => stack.push(child as usize),
                    WideSlot::Leaf { first, count } => {
                        let range = first as usize..(first + count) as usize;
                        let Some(prims) = self.primitives.get(range) else {
                            return false;
                        };
                        if !prims.iter().all(|p| primitive_within(p, aabb)) {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}

/// Allows for the reconstruction error of the stored edges.
fn primitive_within(primitive: &CwbvhTriangle, aabb: &Aabb) -> bool {
    primitive.vertices().iter().all(|v| {
        let magnitude = v.iter().fold(1.0f32, |m, c| m.max(c.abs()));
        let tolerance = 4.0 * f32::EPSILON * magnitude;
        aabb.approx_contains_eps(&(*v).into(), tolerance)
    })
}

/// Breadth-first emission state.
struct Compressor<'s, 'a> {
    source: &'s Bvh8<'a>,
    nodes: Vec<NodeCwbvh>,
    primitives: Vec<CwbvhTriangle>,
    /// Pending `(8-wide index, compressed index)` pairs.
    queue: VecDeque<(u32, usize)>,
}

impl Compressor<'_, '_> {
    fn compress_node(&mut self, wide_index: u32, cw_index: usize) -> Result<()> {
        let source = self.source;
        let wide_nodes = source.nodes();
        let wide = &wide_nodes[wide_index as usize];
        // A leaf root becomes the single child of a compressed root.
        let children: Vec<u32> = if wide.is_leaf() {
            vec![wide_index]
        } else {
            wide.children().to_vec()
        };

        let aabb = wide.aabb();
        let quantizer = Quantizer::new(&aabb)?;
        let child_aabbs: Vec<Aabb> = children
            .iter()
            .map(|&c| wide_nodes[c as usize].aabb())
            .collect();
        let slots = assign_slots(&aabb, &child_aabbs);

        let mut node = NodeCwbvh {
            p: quantizer.p,
            e: quantizer.e,
            child_base_idx: self.nodes.len() as u32,
            primitive_base_idx: self.primitives.len() as u32,
            ..Default::default()
        };
        let mut next_child = self.nodes.len();
        for (slot, assigned) in slots.iter().enumerate() {
            let Some(i) = *assigned else {
                continue;
            };
            let (lo, hi) = quantizer.quantize(&child_aabbs[i])?;
            node.set_quantized_bounds(slot, lo, hi);

            let child: &Node8 = &wide_nodes[children[i] as usize];
            if child.is_leaf() {
                node.child_meta[slot] = self.emit_leaf(child, node.primitive_base_idx)?;
            } else {
                node.imask |= 1 << slot;
                node.child_meta[slot] = interior_meta(slot);
                self.queue.push_back((children[i], next_child));
                next_child += 1;
            }
        }

        if next_child > u32::MAX as usize {
            return Err(BvhError::CapacityOverflow {
                what: "CWBVH nodes",
                value: next_child as u64,
                limit: u32::MAX as u64,
            });
        }
        self.nodes.resize(next_child, NodeCwbvh::default());
        self.nodes[cw_index] = node;
        Ok(())
    }

    /// Appends the primitives of `leaf` and returns the slot's meta byte.
    fn emit_leaf(&mut self, leaf: &Node8, primitive_base: u32) -> Result<u8> {
        let count = leaf.tri_count as usize;
        if count > MAX_LEAF_PRIMITIVES {
            return Err(BvhError::CapacityOverflow {
                what: "primitives in a CWBVH leaf",
                value: count as u64,
                limit: MAX_LEAF_PRIMITIVES as u64,
            });
        }
        let offset = self.primitives.len() - primitive_base as usize;
        if offset >= MAX_PRIMITIVE_OFFSET {
            return Err(BvhError::CapacityOverflow {
                what: "CWBVH primitive offset",
                value: offset as u64,
                limit: MAX_PRIMITIVE_OFFSET as u64 - 1,
            });
        }

        let source = self.source;
        let first = leaf.first_tri as usize;
        let triangles = source.triangles();
        for &prim in &source.indices()[first..first + count] {
            self.primitives
                .push(CwbvhTriangle::new(&triangles[prim as usize], prim));
        }
        Ok(leaf_meta(count, offset))
    }
}

/// Assigns children to the eight slots so that slot `s` holds the child lying
/// furthest in octant direction `s` (bit 2: -x, bit 1: -y, bit 0: -z). Greedy:
/// repeatedly takes the cheapest free (child, slot) pair, lower child and then
/// lower slot winning ties.
fn assign_slots(parent: &Aabb, children: &[Aabb]) -> [Option<usize>; 8] {
    let center = parent.center();
    let mut cost = [[0.0f32; 8]; 8];
    for (i, child) in children.iter().enumerate() {
        let d = child.center() - center;
        for (s, c) in cost[i].iter_mut().enumerate() {
            let sign = |bit: usize| if s & bit != 0 { -1.0 } else { 1.0 };
            *c = sign(4) * d.x + sign(2) * d.y + sign(1) * d.z;
        }
    }

    let mut slots = [None; 8];
    let mut assigned = [false; 8];
    for _ in 0..children.len() {
        let mut best: Option<(usize, usize, f32)> = None;
        for (i, row) in cost.iter().enumerate().take(children.len()) {
            if assigned[i] {
                continue;
            }
            for (s, &c) in row.iter().enumerate() {
                if slots[s].is_some() {
                    continue;
                }
                if best.map_or(true, |(_, _, b)| c < b) {
                    best = Some((i, s, c));
                }
            }
        }
        if let Some((i, s, _)) = best {
            assigned[i] = true;
            slots[s] = Some(i);
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::{assign_slots, Cwbvh};
    use crate::aabb::Aabb;
    use crate::bvh::Bvh;
    use crate::config::BuildConfig;
    use crate::cwbvh::BLOCKS_PER_NODE;
    use crate::error::BvhError;
    use crate::testbase::{create_n_cubes, scene_bounds, split_triangles, triangles_strategy};
    use crate::triangle::Triangle;
    use crate::wide::{Bvh8, WideSlot};
    use proptest::prelude::*;

    #[test]
    fn test_compress_split_triangles() {
        let triangles = split_triangles();
        let bvh = Bvh::build(&triangles).unwrap();
        let cwbvh = Cwbvh::new(&Bvh8::new(&bvh)).unwrap();

        assert_eq!(cwbvh.node_count(), 1);
        assert_eq!(cwbvh.block_count(), BLOCKS_PER_NODE);
        assert_eq!(cwbvh.node_bytes().len(), 80);
        assert_eq!(cwbvh.primitive_bytes().len(), 96);

        let root = cwbvh.root();
        assert!(root.is_leaf());
        assert_eq!(root.p, [-2.0, 0.0, -1.0]);

        let mut leaves: Vec<_> = (0..8)
            .filter_map(|s| match root.slot(s) {
                WideSlot::Leaf { first, count } => Some((first, count)),
                _ => None,
            })
            .collect();
        leaves.sort();
        assert_eq!(leaves, vec![(0, 1), (1, 1)]);

        let mut indices: Vec<u32> = cwbvh.primitive_indices().collect();
        indices.sort();
        assert_eq!(indices, vec![0, 1]);
        assert!(cwbvh.validate());
    }

    #[test]
    fn test_compress_empty() {
        let triangles: Vec<Triangle> = Vec::new();
        let cwbvh = Cwbvh::build(&triangles, BuildConfig::default()).unwrap();
        assert_eq!(cwbvh.node_count(), 1);
        assert_eq!(cwbvh.primitive_count(), 0);
        assert_eq!(cwbvh.root().child_meta, [0; 8]);
        assert!(cwbvh.validate());
    }

    #[test]
    fn test_compress_single_triangle() {
        let triangles = vec![Triangle::from([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])];
        let cwbvh = Cwbvh::build(&triangles, BuildConfig::default()).unwrap();
        assert_eq!(cwbvh.node_count(), 1);
        assert_eq!(cwbvh.primitive_indices().collect::<Vec<_>>(), vec![0]);
        let slots: Vec<_> = (0..8).map(|s| cwbvh.root().slot(s)).collect();
        assert_eq!(
            slots.iter().filter(|s| **s != WideSlot::Empty).count(),
            1
        );
        assert!(slots.contains(&WideSlot::Leaf { first: 0, count: 1 }));
        assert!(cwbvh.validate());
    }

    #[test]
    fn test_compress_rejects_large_leaves() {
        let triangles = create_n_cubes(1, &scene_bounds());
        let config = BuildConfig::default()
            .with_min_leaf_size(12)
            .with_max_leaf_size(12);
        let bvh = Bvh::build_with_config(&triangles, config).unwrap();
        let result = Cwbvh::new(&Bvh8::new(&bvh));
        assert!(matches!(
            result,
            Err(BvhError::CapacityOverflow { value: 12, limit: 3, .. })
        ));
    }

    #[test]
    fn test_compress_cubes() {
        let triangles = create_n_cubes(200, &scene_bounds());
        let cwbvh = Cwbvh::build(&triangles, BuildConfig::default()).unwrap();
        assert!(cwbvh.node_count() > 1);
        assert_eq!(cwbvh.node_count() * BLOCKS_PER_NODE, cwbvh.block_count());
        assert_eq!(cwbvh.primitive_count(), triangles.len());
        assert!(cwbvh.validate());

        // Interior children are consecutive and follow their parent.
        for (index, node) in cwbvh.nodes().iter().enumerate() {
            let children: Vec<u32> = (0..8)
                .filter_map(|s| match node.slot(s) {
                    WideSlot::Node(child) => Some(child),
                    _ => None,
                })
                .collect();
            for (k, child) in children.iter().enumerate() {
                assert_eq!(*child, node.child_base_idx + k as u32);
                assert!(*child as usize > index);
            }
        }
    }

    #[test]
    fn test_decoded_boxes_enclose_source() {
        let triangles = create_n_cubes(50, &scene_bounds());
        let bvh = Bvh::build(&triangles).unwrap().split_leaves(3).unwrap();
        let cwbvh = Cwbvh::new(&Bvh8::new(&bvh)).unwrap();

        for node in cwbvh.nodes() {
            for slot in 0..8 {
                if let WideSlot::Leaf { first, count } = node.slot(slot) {
                    let aabb = node.child_aabb(slot).unwrap();
                    for record in &cwbvh.primitives()[first as usize..(first + count) as usize] {
                        let source = &triangles[record.prim_index as usize];
                        for v in source.vertices() {
                            assert!(aabb.contains(&v));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_assign_slots_octants() {
        let parent = Aabb::from_arrays([-1.0; 3], [1.0; 3]);
        let children = [
            Aabb::from_arrays([-1.0; 3], [0.0; 3]),
            Aabb::from_arrays([0.0; 3], [1.0; 3]),
        ];
        let slots = assign_slots(&parent, &children);
        // The child at the positive corner is cheapest in the all-negative
        // direction, and the other one takes the all-positive slot.
        assert_eq!(slots[7], Some(1));
        assert_eq!(slots[0], Some(0));
        assert_eq!(slots.iter().filter(|s| s.is_some()).count(), 2);
    }

    proptest! {
        #[test]
        fn test_compress_random(triangles in triangles_strategy(100)) {
            let cwbvh = Cwbvh::build(&triangles, BuildConfig::default()).unwrap();
            assert!(cwbvh.validate());
            assert_eq!(cwbvh.primitive_count(), triangles.len());
            let mut indices: Vec<u32> = cwbvh.primitive_indices().collect();
            indices.sort();
            assert_eq!(indices, (0..triangles.len() as u32).collect::<Vec<_>>());
        }
    }
}

#[cfg(all(feature = "bench", test))]
mod bench {
    use crate::config::BuildConfig;
    use crate::cwbvh::Cwbvh;
    use crate::testbase::{bench_build, bench_intersect, create_n_cubes, default_bounds};

    #[bench]
    /// Benchmark the full pipeline up to a [`Cwbvh`] with 12,000 triangles.
    fn bench_build_12k_triangles_cwbvh(b: &mut ::test::Bencher) {
        bench_build(1_000, b, |t| {
            Cwbvh::build(t, BuildConfig::default())
                .map(|cwbvh| cwbvh.node_count())
                .unwrap_or(0)
        });
    }

    #[bench]
    /// Benchmark intersecting 12,000 triangles using the [`Cwbvh`].
    fn bench_intersect_12k_triangles_cwbvh(b: &mut ::test::Bencher) {
        let triangles = create_n_cubes(1_000, &default_bounds());
        let cwbvh = Cwbvh::build(&triangles, BuildConfig::default()).unwrap();
        bench_intersect(&cwbvh, b);
    }
}
