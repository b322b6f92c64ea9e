#![no_main]
use std::fmt::{self, Debug, Formatter};

use arbitrary::Arbitrary;
use bvh_layouts::bvh::Bvh;
use bvh_layouts::config::BuildConfig;
use bvh_layouts::cwbvh::{Cwbvh, BLOCKS_PER_NODE};
use bvh_layouts::ray::Ray;
use bvh_layouts::traversal::Intersector;
use bvh_layouts::triangle::Triangle;
use bvh_layouts::wide::{Bvh4, Bvh8};
use libfuzzer_sys::fuzz_target;
use nalgebra::{Point3, Vector3};
use ordered_float::NotNan;

const LIMIT: f32 = 1_000_000.0;

fuzz_target!(|workload: Workload| {
    workload.fuzz();
});

#[derive(Arbitrary)]
struct ArbitraryPoint {
    coordinates: [NotNan<f32>; 3],
}

impl ArbitraryPoint {
    fn point(&self) -> Point3<f32> {
        Point3::from(self.coordinates.map(|f| f.into_inner().clamp(-LIMIT, LIMIT)))
    }
}

#[derive(Arbitrary)]
struct ArbitraryTriangle {
    a: ArbitraryPoint,
    b: ArbitraryPoint,
    c: ArbitraryPoint,
}

impl ArbitraryTriangle {
    fn triangle(&self) -> Triangle {
        Triangle::new(self.a.point(), self.b.point(), self.c.point())
    }
}

impl Debug for ArbitraryTriangle {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.triangle(), f)
    }
}

#[derive(Arbitrary)]
struct ArbitraryRay {
    origin: ArbitraryPoint,
    destination: ArbitraryPoint,
}

impl Debug for ArbitraryRay {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.ray(), f)
    }
}

impl ArbitraryRay {
    fn ray(&self) -> Ray {
        let mut direction: Vector3<f32> = self.destination.point() - self.origin.point();
        // Ensure no degenerate direction.
        if direction.magnitude() < 1e-3 {
            direction = Vector3::new(1.0, 1.0, 1.0);
        }
        Ray::new(self.origin.point(), direction.normalize())
    }
}

#[derive(Debug, Arbitrary)]
struct Workload {
    triangles: Vec<ArbitraryTriangle>,
    rays: Vec<ArbitraryRay>,
    bins: u8,
    max_leaf_size: u8,
}

impl Workload {
    fn fuzz(self) {
        let triangles: Vec<Triangle> = self.triangles.iter().map(|t| t.triangle()).collect();
        let config = BuildConfig::default()
            .with_bins(2 + self.bins as usize % 63)
            .with_max_leaf_size(1 + self.max_leaf_size as usize % 16);

        let bvh = Bvh::build_with_config(&triangles, config).unwrap();
        assert!(bvh.is_consistent());
        let bvh4 = Bvh4::new(&bvh);
        let bvh8 = Bvh8::new(&bvh);
        assert!(bvh4.is_consistent());
        assert!(bvh8.is_consistent());

        let cwbvh = Cwbvh::new(&Bvh8::new(&bvh.split_leaves(3).unwrap())).unwrap();
        assert!(cwbvh.validate());
        assert_eq!(cwbvh.node_count() * BLOCKS_PER_NODE, cwbvh.block_count());
        assert_eq!(cwbvh.primitive_count(), triangles.len());

        let layouts: [&dyn Intersector; 4] = [&bvh, &bvh4, &bvh8, &cwbvh];
        for ray in self.rays.iter().map(|r| r.ray()) {
            // Axis-parallel rays on a box face only graze primitives and may be culled.
            let grazing = ray.direction.iter().any(|d| *d == 0.0);
            let mut expected = ray;
            for (prim, t) in triangles.iter().enumerate() {
                let (e1, e2) = t.edges();
                expected.intersect_triangle_mut(&t.a, &e1, &e2, prim as u32);
            }

            for layout in layouts {
                let mut actual = ray;
                layout.intersect(&mut actual);
                // No layout may report a hit the brute force test did not find.
                assert!(actual.hit.t >= expected.hit.t);
                if expected.hit.t < bvh_layouts::INFINITE && !grazing {
                    let tolerance = 1e-5 * expected.hit.t.max(1.0);
                    assert!(
                        (actual.hit.t - expected.hit.t).abs() <= tolerance,
                        "expected t = {}, got {}",
                        expected.hit.t,
                        actual.hit.t
                    );
                }
                if actual.hit.t < bvh_layouts::INFINITE {
                    let t = &triangles[actual.hit.prim as usize];
                    let (e1, e2) = t.edges();
                    assert!(ray.intersects_triangle(&t.a, &e1, &e2).is_some());
                }
            }
        }
    }
}
