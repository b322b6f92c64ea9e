use crate::bvh::{Bvh, NodeKind};
use crate::ray::Ray;
use crate::traversal::Intersector;
use crate::INFINITE;

impl Intersector for Bvh<'_> {
    /// Depth-first traversal that descends into the nearer child first and keeps
    /// the farther one on a stack.
    fn intersect(&self, ray: &mut Ray) -> u32 {
        if self.primitive_count() == 0 {
            return 0;
        }

        let nodes = self.nodes();
        let triangles = self.triangles();
        let mut stack: Vec<u32> = Vec::with_capacity(64);
        let mut node_index = 0u32;
        let mut steps = 0;
        loop {
            steps += 1;
            match nodes[node_index as usize].kind() {
                NodeKind::Leaf { first, count } => {
                    let first = first as usize;
                    for &prim in &self.indices()[first..first + count as usize] {
                        let triangle = &triangles[prim as usize];
                        let (edge1, edge2) = triangle.edges();
                        ray.intersect_triangle_mut(&triangle.a, &edge1, &edge2, prim);
                    }
                }
                NodeKind::Interior { left, right } => {
                    let (l, r) = (&nodes[left as usize], &nodes[right as usize]);
                    let mut near = (left, ray.aabb_entry_distance(&l.min, &l.max));
                    let mut far = (right, ray.aabb_entry_distance(&r.min, &r.max));
                    if near.1 > far.1 {
                        std::mem::swap(&mut near, &mut far);
                    }
                    if near.1 < INFINITE {
                        if far.1 < INFINITE {
                            stack.push(far.0);
                        }
                        node_index = near.0;
                        continue;
                    }
                }
            }
            match stack.pop() {
                Some(next) => node_index = next,
                None => break,
            }
        }
        steps
    }
}
