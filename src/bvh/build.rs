//! Top-down binned SAH construction of the binary hierarchy.

use crate::aabb::{Aabb, Bounded};
use crate::axis::Axis;
use crate::bvh::node::Node;
use crate::config::{BuildConfig, MAX_BINS};
use crate::triangle::Triangle;
use crate::utils::{joint_aabb_of_shapes, Bucket};
use nalgebra::Point3;

/// Subtrees holding at most this many primitives are built on the calling thread.
#[cfg(feature = "rayon")]
const PARALLEL_THRESHOLD: usize = 64;

/// Per-primitive data shared by all build tasks.
pub(crate) struct BuildInput<'c> {
    aabbs: Vec<Aabb>,
    centroids: Vec<Point3<f32>>,
    config: &'c BuildConfig,
}

/// The intermediate tree produced by the recursive build. Flattened into the
/// Wald layout by [`flatten`] once complete.
#[derive(Debug)]
pub(crate) enum BuildNode {
    Leaf {
        aabb: Aabb,
        first: usize,
        count: usize,
    },
    Interior {
        aabb: Aabb,
        children: Box<[BuildNode; 2]>,
    },
}

/// The cheapest split plane found by the binning pass. Primitives whose bin is
/// lower than `bin` go left.
#[derive(Debug, Clone, Copy)]
struct Split {
    axis: Axis,
    bin: usize,
    scale: f32,
    cost: f32,
}

impl<'c> BuildInput<'c> {
    pub(crate) fn new(triangles: &[Triangle], config: &'c BuildConfig) -> BuildInput<'c> {
        let aabbs: Vec<Aabb> = triangles.iter().map(Bounded::aabb).collect();
        let centroids = aabbs.iter().map(Aabb::center).collect();
        BuildInput {
            aabbs,
            centroids,
            config,
        }
    }

    /// Returns the joint bounds of the given primitives.
    pub(crate) fn bounds(&self, indices: &[u32]) -> Aabb {
        joint_aabb_of_shapes(indices, &self.aabbs)
    }

    #[inline]
    fn bin_of(&self, index: u32, axis: Axis, centroid_bounds: &Aabb, scale: f32) -> usize {
        let offset = self.centroids[index as usize][axis] - centroid_bounds.min[axis];
        ((offset * scale) as usize).min(self.config.bins - 1)
    }

    /// Builds the subtree over `indices`, which start at `offset` in the full
    /// index array. `indices` is reordered so that every leaf range is contiguous.
    pub(crate) fn build(&self, indices: &mut [u32], offset: usize, aabb: Aabb) -> BuildNode {
        let count = indices.len();
        if count <= self.config.min_leaf_size {
            return BuildNode::Leaf {
                aabb,
                first: offset,
                count,
            };
        }

        let centroid_bounds = indices
            .iter()
            .fold(Aabb::empty(), |b, &i| b.grow(&self.centroids[i as usize]));
        let leaf_cost = self.config.intersection_cost * count as f32;
        let must_split = count > self.config.max_leaf_size;

        let left_count = match self.find_split(indices, &aabb, &centroid_bounds) {
            Some(split) if split.cost < leaf_cost || must_split => {
                self.partition(indices, &split, &centroid_bounds)
            }
            None if must_split => {
                log::trace!(
                    "no split plane for {} primitives at offset {}, splitting at the median",
                    count,
                    offset
                );
                self.median_split(indices, &centroid_bounds)
            }
            _ => {
                return BuildNode::Leaf {
                    aabb,
                    first: offset,
                    count,
                }
            }
        };

        let (left, right) = indices.split_at_mut(left_count);
        let left_aabb = self.bounds(left);
        let right_aabb = self.bounds(right);
        let (l, r) = self.build_pair(
            (left, offset, left_aabb),
            (right, offset + left_count, right_aabb),
        );
        BuildNode::Interior {
            aabb,
            children: Box::new([l, r]),
        }
    }

    fn build_pair(
        &self,
        left: (&mut [u32], usize, Aabb),
        right: (&mut [u32], usize, Aabb),
    ) -> (BuildNode, BuildNode) {
        #[cfg(feature = "rayon")]
        {
            if left.0.len() + right.0.len() > PARALLEL_THRESHOLD {
                return rayon::join(
                    || self.build(left.0, left.1, left.2),
                    || self.build(right.0, right.1, right.2),
                );
            }
        }
        (
            self.build(left.0, left.1, left.2),
            self.build(right.0, right.1, right.2),
        )
    }

    /// Evaluates `bins - 1` split planes per axis and returns the cheapest one.
    /// Only splits that leave primitives on both sides are considered; ties go to
    /// the lower axis, then the lower bin.
    fn find_split(&self, indices: &[u32], aabb: &Aabb, centroid_bounds: &Aabb) -> Option<Split> {
        let bins = self.config.bins;
        let parent_area = aabb.surface_area();
        let inv_area = if parent_area > 0.0 {
            1.0 / parent_area
        } else {
            0.0
        };

        let mut best: Option<Split> = None;
        for axis in Axis::ALL {
            let extent = centroid_bounds.max[axis] - centroid_bounds.min[axis];
            if extent <= 0.0 {
                continue;
            }
            let scale = bins as f32 / extent;

            let mut buckets = [Bucket::empty(); MAX_BINS];
            for &index in indices {
                let bin = self.bin_of(index, axis, centroid_bounds, scale);
                buckets[bin].add_aabb(&self.aabbs[index as usize]);
            }

            // Sweep from the right to collect the right-hand side of every plane.
            let mut right_weight = [0.0f32; MAX_BINS];
            let mut right_size = [0usize; MAX_BINS];
            let mut right = Bucket::empty();
            for bin in (1..bins).rev() {
                right = Bucket::join_bucket(right, &buckets[bin]);
                right_weight[bin] = right.sah_weight();
                right_size[bin] = right.size;
            }

            let mut left = Bucket::empty();
            for bin in 1..bins {
                left = Bucket::join_bucket(left, &buckets[bin - 1]);
                if left.size == 0 || right_size[bin] == 0 {
                    continue;
                }
                let cost = self.config.traversal_cost
                    + self.config.intersection_cost
                        * (left.sah_weight() + right_weight[bin])
                        * inv_area;
                if best.map_or(true, |b| cost < b.cost) {
                    best = Some(Split {
                        axis,
                        bin,
                        scale,
                        cost,
                    });
                }
            }
        }
        best
    }

    /// Moves the primitives left of the split plane to the front of `indices`
    /// and returns their number.
    fn partition(&self, indices: &mut [u32], split: &Split, centroid_bounds: &Aabb) -> usize {
        let mut i = 0;
        let mut j = indices.len();
        while i < j {
            if self.bin_of(indices[i], split.axis, centroid_bounds, split.scale) < split.bin {
                i += 1;
            } else {
                j -= 1;
                indices.swap(i, j);
            }
        }
        i
    }

    /// Splits at the median centroid along the largest axis of the centroid bounds.
    fn median_split(&self, indices: &mut [u32], centroid_bounds: &Aabb) -> usize {
        let axis = centroid_bounds.largest_axis();
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |a, b| {
            self.centroids[*a as usize][axis].total_cmp(&self.centroids[*b as usize][axis])
        });
        mid
    }
}

/// Writes `root` into `nodes` in the Wald layout: the root at index 0, an unused
/// slot at index 1 when the root is interior, then sibling pairs in depth-first order.
pub(crate) fn flatten(root: &BuildNode, nodes: &mut Vec<Node>) {
    nodes.clear();
    nodes.push(Node::default());
    if let BuildNode::Interior { .. } = root {
        nodes.push(Node::default());
    }
    write_node(root, 0, nodes);
}

fn write_node(node: &BuildNode, index: usize, nodes: &mut Vec<Node>) {
    match node {
        BuildNode::Leaf { aabb, first, count } => {
            nodes[index] = Node::leaf(aabb, *first as u32, *count as u32);
        }
        BuildNode::Interior { aabb, children } => {
            let left = nodes.len();
            nodes.push(Node::default());
            nodes.push(Node::default());
            nodes[index] = Node::interior(aabb, left as u32);
            write_node(&children[0], left, nodes);
            write_node(&children[1], left + 1, nodes);
        }
    }
}
