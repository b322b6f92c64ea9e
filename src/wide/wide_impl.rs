//! Collapsing a binary hierarchy into a 4-wide or 8-wide one.

use crate::aabb::{Aabb, Bounded};
use crate::bvh::{Bvh, NodeKind};
use crate::config::BuildConfig;
use crate::error::Result;
use crate::triangle::Triangle;
use crate::wide::{WideNode, WideSlot};
use crate::EPSILON;

/// A hierarchy whose interior nodes have up to `N` children, converted from a [`Bvh`].
///
/// The conversion keeps the primitive index array and the leaves of the binary
/// hierarchy as they are; only interior nodes are merged. Like the [`Bvh`] it
/// borrows the geometry for its whole lifetime, but it does not borrow the [`Bvh`]
/// it was converted from.
#[derive(Debug, Clone)]
pub struct WideBvh<'a, const N: usize> {
    triangles: &'a [Triangle],
    nodes: Vec<WideNode<N>>,
    indices: Vec<u32>,
}

/// 4-wide hierarchy.
pub type Bvh4<'a> = WideBvh<'a, 4>;

/// 8-wide hierarchy.
pub type Bvh8<'a> = WideBvh<'a, 8>;

impl<'a, const N: usize> WideBvh<'a, N> {
    const AT_LEAST_TWO_CHILDREN: () = assert!(N >= 2, "wide nodes need at least two children");

    /// Converts a binary hierarchy.
    ///
    /// # Examples
    /// ```
    /// use bvh_layouts::bvh::Bvh;
    /// use bvh_layouts::triangle::Triangle;
    /// use bvh_layouts::wide::{Bvh4, WideSlot};
    ///
    /// let triangles = [
    ///     Triangle::from([[-2.0, 1.0, -1.0], [-1.0, 1.0, -1.0], [-2.0, 0.0, -1.0]]),
    ///     Triangle::from([[2.0, 1.0, -1.0], [2.0, 0.0, -1.0], [1.0, 0.0, -1.0]]),
    /// ];
    /// let bvh = Bvh::build(&triangles).unwrap();
    /// let bvh4 = Bvh4::new(&bvh);
    ///
    /// assert_eq!(bvh4.nodes()[0].child, [2, 3, 0, 0]);
    /// assert_eq!(bvh4.slot(0, 0), WideSlot::Leaf { first: 0, count: 1 });
    /// assert_eq!(bvh4.slot(0, 2), WideSlot::Empty);
    /// ```
    pub fn new(bvh: &Bvh<'a>) -> WideBvh<'a, N> {
        #[allow(clippy::let_unit_value)]
        let () = Self::AT_LEAST_TWO_CHILDREN;

        let mut nodes = Vec::with_capacity(bvh.nodes().len());
        nodes.push(WideNode::default());
        if !bvh.root().is_leaf() {
            // Slot 1 stays unused, as in the binary layout.
            nodes.push(WideNode::default());
        }
        emit(bvh, 0, 0, &mut nodes);

        let wide = WideBvh {
            triangles: bvh.triangles(),
            nodes,
            indices: bvh.indices().to_vec(),
        };
        log::debug!(
            "collapsed {} binary nodes into {} {}-wide nodes",
            bvh.node_count(),
            wide.node_count(),
            N
        );
        wide
    }

    /// Builds a binary hierarchy over `triangles` and converts it.
    pub fn build(triangles: &'a [Triangle], config: BuildConfig) -> Result<WideBvh<'a, N>> {
        let bvh = Bvh::build_with_config(triangles, config)?;
        Ok(WideBvh::new(&bvh))
    }

    /// Returns the whole node array, including the unused slot 1 of an interior root.
    pub fn nodes(&self) -> &[WideNode<N>] {
        &self.nodes
    }

    /// Returns the number of nodes reachable from the root.
    pub fn node_count(&self) -> usize {
        if self.nodes[0].is_leaf() {
            self.nodes.len()
        } else {
            self.nodes.len() - 1
        }
    }

    /// Returns the primitive index array shared with the source [`Bvh`].
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Returns the number of primitives referenced by the hierarchy.
    pub fn primitive_count(&self) -> usize {
        self.indices.len()
    }

    /// Returns the geometry this hierarchy was built from.
    pub fn triangles(&self) -> &'a [Triangle] {
        self.triangles
    }

    /// Returns the root node.
    pub fn root(&self) -> &WideNode<N> {
        &self.nodes[0]
    }

    /// Decodes child slot `slot` of node `node_index`.
    pub fn slot(&self, node_index: usize, slot: usize) -> WideSlot {
        let node = &self.nodes[node_index];
        if slot >= node.child_count as usize {
            return WideSlot::Empty;
        }
        let index = node.child[slot];
        let child = &self.nodes[index as usize];
        if child.is_leaf() {
            WideSlot::Leaf {
                first: child.first_tri,
                count: child.tri_count,
            }
        } else {
            WideSlot::Node(index)
        }
    }

    /// Decodes all child slots of node `node_index`.
    pub fn slots(&self, node_index: usize) -> [WideSlot; N] {
        let mut slots = [WideSlot::Empty; N];
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = self.slot(node_index, i);
        }
        slots
    }

    /// Returns the `(first, count)` index array ranges of all leaves in depth-first order.
    pub fn leaf_ranges(&self) -> Vec<(u32, u32)> {
        let mut ranges = Vec::new();
        let mut stack = vec![0u32];
        while let Some(node_index) = stack.pop() {
            let node = &self.nodes[node_index as usize];
            if node.is_leaf() {
                ranges.push((node.first_tri, node.tri_count));
            } else {
                stack.extend(node.children().iter().rev());
            }
        }
        ranges
    }

    /// Checks that every child lies inside its parent's bounds, every primitive
    /// inside its leaf's bounds, and that the leaves reference every primitive once.
    pub fn is_consistent(&self) -> bool {
        let n = self.triangles.len();
        let mut seen = vec![false; n];
        let mut visited = 0;
        let mut stack = vec![0usize];
        while let Some(node_index) = stack.pop() {
            visited += 1;
            let node = &self.nodes[node_index];
            let aabb = node.aabb();
            if node.child_count as usize > N {
                return false;
            }
            for &child in node.children() {
                let Some(child_node) = self.nodes.get(child as usize) else {
                    return false;
                };
                if !aabb.approx_contains_aabb_eps(&child_node.aabb(), EPSILON) {
                    return false;
                }
                stack.push(child as usize);
            }
            let end = node.first_tri as usize + node.tri_count as usize;
            if end > self.indices.len() {
                return false;
            }
            for &prim in &self.indices[node.first_tri as usize..end] {
                let prim = prim as usize;
                if prim >= n || seen[prim] {
                    return false;
                }
                seen[prim] = true;
                if !aabb.approx_contains_aabb_eps(&self.triangles[prim].aabb(), EPSILON) {
                    return false;
                }
            }
        }
        visited == self.node_count() && seen.iter().all(|s| *s)
    }

    /// Returns the bounds of the whole hierarchy. Empty for empty geometry.
    pub fn aabb(&self) -> Aabb {
        if self.indices.is_empty() {
            Aabb::empty()
        } else {
            self.root().aabb()
        }
    }
}

/// Greedily replaces the interior child with the largest surface area by its two
/// children until `N` slots are used or only leaves remain. Ties go to the lower
/// slot. Returns binary node indices.
fn collapse<const N: usize>(bvh: &Bvh, node_index: u32) -> Vec<u32> {
    let nodes = bvh.nodes();
    let mut children = Vec::with_capacity(N);
    if let NodeKind::Interior { left, right } = nodes[node_index as usize].kind() {
        children.push(left);
        children.push(right);
    }

    while children.len() < N {
        let mut best: Option<(usize, f32)> = None;
        for (slot, &child) in children.iter().enumerate() {
            let node = &nodes[child as usize];
            if node.is_leaf() {
                continue;
            }
            let area = node.surface_area();
            if best.map_or(true, |(_, best_area)| area > best_area) {
                best = Some((slot, area));
            }
        }
        let Some((slot, _)) = best else {
            break;
        };
        if let NodeKind::Interior { left, right } = nodes[children[slot] as usize].kind() {
            children[slot] = left;
            children.push(right);
        }
    }
    children
}

/// Writes the wide counterpart of binary node `binary_index` to `wide_index`.
/// The children of every wide node are allocated contiguously, subtrees follow
/// in depth-first order.
fn emit<const N: usize>(bvh: &Bvh, binary_index: u32, wide_index: usize, nodes: &mut Vec<WideNode<N>>) {
    let node = &bvh.nodes()[binary_index as usize];
    match node.kind() {
        NodeKind::Leaf { first, count } => {
            nodes[wide_index] = WideNode::leaf(&node.aabb(), first, count);
        }
        NodeKind::Interior { .. } => {
            let children = collapse::<N>(bvh, binary_index);
            let base = nodes.len();
            let child_indices: Vec<u32> = (0..children.len()).map(|i| (base + i) as u32).collect();
            nodes.resize(base + children.len(), WideNode::default());
            nodes[wide_index] = WideNode::interior(&node.aabb(), &child_indices);
            for (i, child) in children.into_iter().enumerate() {
                emit(bvh, child, base + i, nodes);
            }
        }
    }
}


#[cfg(all(feature = "bench", test))]
mod bench {
    use crate::bvh::Bvh;
    use crate::testbase::{bench_intersect, create_n_cubes, default_bounds};
    use crate::wide::{Bvh4, Bvh8};

    #[bench]
    /// Benchmark collapsing a [`Bvh`] over 12,000 triangles into a [`Bvh8`].
    fn bench_collapse_12k_triangles_bvh8(b: &mut ::test::Bencher) {
        let triangles = create_n_cubes(1_000, &default_bounds());
        let bvh = Bvh::build(&triangles).unwrap();
        b.iter(|| Bvh8::new(&bvh).node_count());
    }

    #[bench]
    /// Benchmark intersecting 12,000 triangles using the [`Bvh4`].
    fn bench_intersect_12k_triangles_bvh4(b: &mut ::test::Bencher) {
        let triangles = create_n_cubes(1_000, &default_bounds());
        let bvh4 = Bvh4::new(&Bvh::build(&triangles).unwrap());
        bench_intersect(&bvh4, b);
    }
}
