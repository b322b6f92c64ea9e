//! This module defines [`Bvh`], the binary hierarchy every other layout is derived from.

use crate::aabb::{Aabb, Bounded};
use crate::bvh::build::{flatten, BuildInput};
use crate::bvh::iter::Leaves;
use crate::bvh::node::{Node, NodeKind};
use crate::config::BuildConfig;
use crate::error::{BvhError, Result};
use crate::triangle::{validate_triangles, Triangle};
use crate::utils::joint_aabb_of_shapes;
use crate::EPSILON;

/// The binary bounding volume hierarchy in the Wald layout.
///
/// The hierarchy references the triangles it was built from by index, so it
/// borrows them for its whole lifetime. Once built it is immutable; use
/// [`Bvh::rebuild`] to construct a new hierarchy for changed geometry.
///
/// # Examples
/// ```
/// use bvh_layouts::bvh::{Bvh, NodeKind};
/// use bvh_layouts::triangle::Triangle;
///
/// let triangles = [
///     Triangle::from([[-2.0, 1.0, -1.0], [-1.0, 1.0, -1.0], [-2.0, 0.0, -1.0]]),
///     Triangle::from([[2.0, 1.0, -1.0], [2.0, 0.0, -1.0], [1.0, 0.0, -1.0]]),
/// ];
/// let bvh = Bvh::build(&triangles).unwrap();
///
/// assert_eq!(bvh.node_count(), 3);
/// assert_eq!(bvh.nodes()[0].kind(), NodeKind::Interior { left: 2, right: 3 });
/// assert_eq!(bvh.indices(), &[0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct Bvh<'a> {
    triangles: &'a [Triangle],
    nodes: Vec<Node>,
    indices: Vec<u32>,
    config: BuildConfig,
}

impl<'a> Bvh<'a> {
    /// Builds a hierarchy over `triangles` with the default [`BuildConfig`].
    pub fn build(triangles: &'a [Triangle]) -> Result<Bvh<'a>> {
        Bvh::build_with_config(triangles, BuildConfig::default())
    }

    /// Builds a hierarchy over `triangles` using binned SAH splits.
    ///
    /// Empty input yields a single empty root leaf. Geometry with NaN or infinite
    /// coordinates is rejected.
    pub fn build_with_config(triangles: &'a [Triangle], config: BuildConfig) -> Result<Bvh<'a>> {
        Bvh::build_into(triangles, config, Vec::new(), Vec::new())
    }

    /// Builds a new hierarchy for `triangles` with the configuration of `self`,
    /// reusing its allocations.
    pub fn rebuild<'b>(self, triangles: &'b [Triangle]) -> Result<Bvh<'b>> {
        Bvh::build_into(triangles, self.config, self.nodes, self.indices)
    }

    fn build_into<'b>(
        triangles: &'b [Triangle],
        config: BuildConfig,
        mut nodes: Vec<Node>,
        mut indices: Vec<u32>,
    ) -> Result<Bvh<'b>> {
        config.validate()?;
        validate_triangles(triangles)?;
        let max_nodes = 2 * triangles.len() as u64 + 1;
        if max_nodes > u32::MAX as u64 {
            return Err(BvhError::CapacityOverflow {
                what: "node count",
                value: max_nodes,
                limit: u32::MAX as u64,
            });
        }

        indices.clear();
        indices.extend(0..triangles.len() as u32);
        if triangles.is_empty() {
            nodes.clear();
            nodes.push(Node::default());
        } else {
            let input = BuildInput::new(triangles, &config);
            let aabb = input.bounds(&indices);
            let root = input.build(&mut indices, 0, aabb);
            flatten(&root, &mut nodes);
        }

        let bvh = Bvh {
            triangles,
            nodes,
            indices,
            config,
        };
        log::debug!(
            "built binary hierarchy over {} primitives: {} nodes",
            bvh.primitive_count(),
            bvh.node_count()
        );
        Ok(bvh)
    }

    /// Returns the whole node array, including the unused slot 1 of an interior root.
    pub fn nodes(&self) -> &[Node] {
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

    /// Returns the primitive index array. Every leaf references a contiguous range of it.
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

    /// Returns the configuration used to build this hierarchy.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Returns the root node.
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Returns the bounds of the whole hierarchy. Empty for empty geometry.
    pub fn aabb(&self) -> Aabb {
        if self.indices.is_empty() {
            Aabb::empty()
        } else {
            self.root().aabb()
        }
    }

    /// Returns an iterator over all leaves and their primitive index ranges.
    pub fn leaves(&self) -> Leaves<'_, 'a> {
        Leaves::new(self)
    }

    /// Returns the number of primitives referenced below `node_index`.
    pub fn subtree_primitive_count(&self, node_index: usize) -> usize {
        Leaves::from_node(self, node_index as u32)
            .map(|(_, range)| range.len())
            .sum()
    }

    /// Returns the SAH cost of the subtree below `node_index`: the expected cost of
    /// intersecting a ray that is known to hit the node's bounds.
    pub fn sah_cost(&self, node_index: usize) -> f32 {
        let node = &self.nodes[node_index];
        match node.kind() {
            NodeKind::Leaf { count, .. } => self.config.intersection_cost * count as f32,
            NodeKind::Interior { left, right } => {
                let area = node.surface_area();
                let weight = |child: u32| {
                    if area > 0.0 {
                        self.nodes[child as usize].surface_area() / area
                    } else {
                        1.0
                    }
                };
                self.config.traversal_cost
                    + weight(left) * self.sah_cost(left as usize)
                    + weight(right) * self.sah_cost(right as usize)
            }
        }
    }

    /// Returns a new hierarchy in which no leaf holds more than `max_primitives`
    /// primitives. Oversized leaves are split at the median centroid along their
    /// largest axis until they fit.
    ///
    /// The result references the same primitives; only the order within the
    /// split leaf ranges changes.
    pub fn split_leaves(&self, max_primitives: usize) -> Result<Bvh<'a>> {
        if max_primitives == 0 {
            return Err(BvhError::InvalidConfig {
                message: "leaves must hold at least one primitive".to_string(),
            });
        }

        let mut result = self.clone();
        let centroid = |prim: u32| self.triangles[prim as usize].aabb().center();
        let mut stack = vec![0u32];
        while let Some(node_index) = stack.pop() {
            match result.nodes[node_index as usize].kind() {
                NodeKind::Interior { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
                NodeKind::Leaf { first, count } if count as usize > max_primitives => {
                    let half = count / 2;
                    let range = &mut result.indices[first as usize..(first + count) as usize];
                    let centroid_bounds = range
                        .iter()
                        .fold(Aabb::empty(), |b, &prim| b.grow(&centroid(prim)));
                    let axis = centroid_bounds.largest_axis();
                    range.sort_by(|a, b| centroid(*a)[axis].total_cmp(&centroid(*b)[axis]));

                    let left_aabb = joint_aabb_of_shapes(&range[..half as usize], self.triangles);
                    let right_aabb = joint_aabb_of_shapes(&range[half as usize..], self.triangles);

                    if node_index == 0 {
                        // Keep sibling pairs aligned behind an interior root.
                        result.nodes.push(Node::default());
                    }
                    let left = result.nodes.len() as u32;
                    result.nodes.push(Node::leaf(&left_aabb, first, half));
                    result.nodes.push(Node::leaf(&right_aabb, first + half, count - half));
                    let node = &mut result.nodes[node_index as usize];
                    node.left_first = left;
                    node.tri_count = 0;

                    stack.push(left + 1);
                    stack.push(left);
                }
                NodeKind::Leaf { .. } => {}
            }
        }

        log::debug!(
            "split leaves to at most {} primitives: {} -> {} nodes",
            max_primitives,
            self.node_count(),
            result.node_count()
        );
        Ok(result)
    }

    /// Checks the structural invariants of the hierarchy: every node is reachable
    /// from the root, children lie inside their parent's bounds, every primitive
    /// lies inside its leaf's bounds, and the leaves partition the index array
    /// into a permutation of all primitives.
    pub fn is_consistent(&self) -> bool {
        let n = self.triangles.len();
        if self.indices.len() != n || self.nodes.is_empty() {
            return false;
        }

        let mut seen = vec![false; n];
        let mut visited = 0;
        let mut stack = vec![0usize];
        while let Some(node_index) = stack.pop() {
            visited += 1;
            let node = &self.nodes[node_index];
            let aabb = node.aabb();
            match node.kind() {
                NodeKind::Interior { left, right } => {
                    if right as usize >= self.nodes.len() {
                        return false;
                    }
                    for child in [left, right] {
                        let child_aabb = self.nodes[child as usize].aabb();
                        if !aabb.approx_contains_aabb_eps(&child_aabb, EPSILON) {
                            return false;
                        }
                        stack.push(child as usize);
                    }
                }
                NodeKind::Leaf { first, count } => {
                    let end = first as usize + count as usize;
                    if end > n {
                        return false;
                    }
                    for &prim in &self.indices[first as usize..end] {
                        let prim = prim as usize;
                        if prim >= n || seen[prim] {
                            return false;
                        }
                        seen[prim] = true;
                        let prim_aabb = self.triangles[prim].aabb();
                        if !aabb.approx_contains_aabb_eps(&prim_aabb, EPSILON) {
                            return false;
                        }
                    }
                }
            }
        }
        visited == self.node_count() && seen.iter().all(|s| *s)
    }

    /// Prints the hierarchy, one node per line, indented by depth.
    pub fn pretty_print(&self) {
        self.print_node(0, 0);
    }

    fn print_node(&self, node_index: usize, depth: usize) {
        let node = &self.nodes[node_index];
        let padding = " ".repeat(depth);
        match node.kind() {
            NodeKind::Interior { left, right } => {
                println!("{}node={} {}", padding, node_index, node.aabb());
                self.print_node(left as usize, depth + 1);
                self.print_node(right as usize, depth + 1);
            }
            NodeKind::Leaf { first, count } => {
                println!(
                    "{}leaf={} first={} count={} {}",
                    padding,
                    node_index,
                    first,
                    count,
                    node.aabb()
                );
            }
        }
    }
}


#[cfg(all(feature = "bench", test))]
mod bench {
    use crate::bvh::Bvh;
    use crate::testbase::{bench_build, bench_intersect, create_n_cubes, default_bounds};

    #[bench]
    /// Benchmark the construction of a [`Bvh`] with 1,200 triangles.
    fn bench_build_1200_triangles_bvh(b: &mut ::test::Bencher) {
        bench_build(100, b, |t| Bvh::build(t).map(|bvh| bvh.node_count()).unwrap_or(0));
    }

    #[bench]
    /// Benchmark the construction of a [`Bvh`] with 12,000 triangles.
    fn bench_build_12k_triangles_bvh(b: &mut ::test::Bencher) {
        bench_build(1_000, b, |t| Bvh::build(t).map(|bvh| bvh.node_count()).unwrap_or(0));
    }

    #[bench]
    /// Benchmark intersecting 12,000 triangles using the [`Bvh`].
    fn bench_intersect_12k_triangles_bvh(b: &mut ::test::Bencher) {
        let triangles = create_n_cubes(1_000, &default_bounds());
        let bvh = Bvh::build(&triangles).unwrap();
        bench_intersect(&bvh, b);
    }
}
