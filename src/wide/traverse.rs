use crate::ray::Ray;
use crate::traversal::Intersector;
use crate::wide::WideBvh;
use crate::INFINITE;

impl<const N: usize> Intersector for WideBvh<'_, N> {
    /// Depth-first traversal that visits the hit children of a node in order of
    /// their entry distance.
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
            let node = &nodes[node_index as usize];
            if node.is_leaf() {
                let first = node.first_tri as usize;
                for &prim in &self.indices()[first..first + node.tri_count as usize] {
                    let triangle = &triangles[prim as usize];
                    let (edge1, edge2) = triangle.edges();
                    ray.intersect_triangle_mut(&triangle.a, &edge1, &edge2, prim);
                }
            } else {
                // Insertion sort of the hit children by entry distance.
                let mut hits = [(0u32, 0.0f32); N];
                let mut hit_count = 0;
                for &child in node.children() {
                    let c = &nodes[child as usize];
                    let dist = ray.aabb_entry_distance(&c.min, &c.max);
                    if dist >= INFINITE {
                        continue;
                    }
                    let mut i = hit_count;
                    while i > 0 && hits[i - 1].1 > dist {
                        hits[i] = hits[i - 1];
                        i -= 1;
                    }
                    hits[i] = (child, dist);
                    hit_count += 1;
                }
                if hit_count > 0 {
                    stack.extend(hits[1..hit_count].iter().rev().map(|(child, _)| *child));
                    node_index = hits[0].0;
                    continue;
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

#[cfg(test)]
mod tests {
    use crate::bvh::Bvh;
    use crate::config::BuildConfig;
    use crate::ray::make_ray;
    use crate::testbase::{
        assert_agrees_with_brute_force, create_n_cubes, scene_bounds, split_triangles,
        triangles_strategy,
    };
    use crate::traversal::Intersector;
    use crate::wide::{Bvh4, Bvh8};
    use crate::INFINITE;
    use float_eq::assert_float_eq;
    use proptest::prelude::*;

    #[test]
    fn test_intersect_bvh4() {
        let triangles = split_triangles();
        let bvh = Bvh::build(&triangles).unwrap();
        let bvh4 = Bvh4::new(&bvh);

        let mut ray = make_ray([0.0, 0.0, 0.0], [0.0, 0.0, -1.0]);
        assert_eq!(bvh4.intersect(&mut ray), 1);
        assert_eq!(ray.hit.t, INFINITE);

        let mut ray = make_ray([-1.5, 0.5, 0.0], [0.0, 0.0, -1.0]);
        assert_eq!(bvh4.intersect(&mut ray), 2);
        assert_float_eq!(ray.hit.t, 1.0, rmax <= 1e-5);
        assert_eq!(ray.hit.prim, 0);

        let mut ray = make_ray([1.5, 0.45, 0.0], [0.0, 0.0, -1.0]);
        assert_eq!(bvh4.intersect(&mut ray), 2);
        assert_float_eq!(ray.hit.t, 1.0, rmax <= 1e-5);
        assert_eq!(ray.hit.prim, 1);
    }

    #[test]
    fn test_intersect_empty() {
        let bvh = Bvh::build(&[]).unwrap();
        let bvh8 = Bvh8::new(&bvh);
        let mut ray = make_ray([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        assert_eq!(bvh8.intersect(&mut ray), 0);
        assert_eq!(ray.hit.t, INFINITE);
    }

    #[test]
    /// Binary, 4-wide and 8-wide traversal report the same closest hits.
    fn test_wide_matches_binary() {
        let bounds = scene_bounds();
        let triangles = create_n_cubes(40, &bounds);
        let bvh = Bvh::build_with_config(&triangles, BuildConfig::default()).unwrap();
        let bvh4 = Bvh4::new(&bvh);
        let bvh8 = Bvh8::new(&bvh);

        assert!(assert_agrees_with_brute_force(&bvh4, &triangles, &bounds, 500) > 0);
        assert!(assert_agrees_with_brute_force(&bvh8, &triangles, &bounds, 500) > 0);

        let mut seed = 3;
        for _ in 0..200 {
            let ray = crate::testbase::create_ray(&mut seed, &bounds);
            let (mut r2, mut r8) = (ray, ray);
            bvh.intersect(&mut r2);
            bvh8.intersect(&mut r8);
            assert_eq!(r2.hit.t, r8.hit.t);
        }
    }

    proptest! {
        #[test]
        fn test_intersect_random_geometry(triangles in triangles_strategy(48)) {
            let bvh = Bvh::build(&triangles).unwrap();
            assert_agrees_with_brute_force(&Bvh4::new(&bvh), &triangles, &scene_bounds(), 32);
            assert_agrees_with_brute_force(&Bvh8::new(&bvh), &triangles, &scene_bounds(), 32);
        }
    }
}
