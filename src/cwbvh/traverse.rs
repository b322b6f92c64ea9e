use crate::cwbvh::Cwbvh;
use crate::ray::Ray;
use crate::traversal::Intersector;
use crate::wide::WideSlot;
use crate::INFINITE;

impl Intersector for Cwbvh {
    /// Depth-first traversal over the decoded child boxes. Leaf slots are tested
    /// as soon as their box is hit; interior children are visited nearest first.
    /// Every compressed node visited counts as one step.
    fn intersect(&self, ray: &mut Ray) -> u32 {
        if self.primitive_count() == 0 {
            return 0;
        }

        let nodes = self.nodes();
        let primitives = self.primitives();
        let mut stack: Vec<u32> = Vec::with_capacity(64);
        let mut node_index = 0u32;
        let mut steps = 0;
        loop {
            steps += 1;
            let node = &nodes[node_index as usize];
            let mut hits = [(0u32, 0.0f32); 8];
            let mut hit_count = 0;
            for slot in 0..8 {
                if node.child_meta[slot] == 0 {
                    continue;
                }
                let (min, max) = node.child_bounds(slot);
                let dist = ray.aabb_entry_distance(&min, &max);
                if dist >= INFINITE {
                    continue;
                }
                match node.slot(slot) {
                    WideSlot::Empty => {}
                    WideSlot::Leaf { first, count } => {
                        for p in &primitives[first as usize..(first + count) as usize] {
                            ray.intersect_triangle_mut(
                                &p.vertex0.into(),
                                &p.edge1.into(),
                                &p.edge2.into(),
                                p.prim_index,
                            );
                        }
                    }
                    WideSlot::Node(child) => {
                        let mut i = hit_count;
                        while i > 0 && hits[i - 1].1 > dist {
                            hits[i] = hits[i - 1];
                            i -= 1;
                        }
                        hits[i] = (child, dist);
                        hit_count += 1;
                    }
                }
            }

            if hit_count > 0 {
                stack.extend(hits[1..hit_count].iter().rev().map(|(child, _)| *child));
                node_index = hits[0].0;
                continue;
            }
            match stack.pop() {
                Some(next) => node_index = next,
                None => break,
            }
        }
        steps
    }
}
