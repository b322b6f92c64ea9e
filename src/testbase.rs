//! Common utilities shared by unit tests.
#![cfg(test)]

use nalgebra::{Point3, Vector3};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::aabb::{Aabb, Bounded};
use crate::ray::{Intersection, Ray};
use crate::traversal::Intersector;
use crate::triangle::Triangle;

/// A vector represented as a tuple
pub type TupleVec = (f32, f32, f32);

/// Generate a `TupleVec` for [`proptest::strategy::Strategy`] from -10e10 to 10e10
/// A small enough range to prevent most fp32 errors from breaking certain tests
/// Tests which rely on this strategy should probably be rewritten
pub fn tuplevec_small_strategy() -> impl Strategy<Value = TupleVec> {
    (
        -10e10_f32..10e10_f32,
        -10e10_f32..10e10_f32,
        -10e10_f32..10e10_f32,
    )
}

/// Generate a `TupleVec` inside the cube used by [`scene_bounds`].
pub fn tuplevec_scene_strategy() -> impl Strategy<Value = TupleVec> {
    (-10.0_f32..10.0_f32, -10.0_f32..10.0_f32, -10.0_f32..10.0_f32)
}

/// Generate a list of up to `max` random triangles inside the cube used by [`scene_bounds`].
pub fn triangles_strategy(max: usize) -> impl Strategy<Value = Vec<Triangle>> {
    prop::collection::vec(
        (
            tuplevec_scene_strategy(),
            tuplevec_scene_strategy(),
            tuplevec_scene_strategy(),
        ),
        0..max,
    )
    .prop_map(|tuples| {
        tuples
            .iter()
            .map(|(a, b, c)| Triangle::new(tuple_to_point(a), tuple_to_point(b), tuple_to_point(c)))
            .collect()
    })
}

/// Convert a `TupleVec` to a [`Point3`].
pub fn tuple_to_point(tpl: &TupleVec) -> Point3<f32> {
    Point3::new(tpl.0, tpl.1, tpl.2)
}

/// Two triangles in the plane `z = -1`, one left and one right of the origin.
pub fn split_triangles() -> Vec<Triangle> {
    vec![
        Triangle::from([[-2.0, 1.0, -1.0], [-1.0, 1.0, -1.0], [-2.0, 0.0, -1.0]]),
        Triangle::from([[2.0, 1.0, -1.0], [2.0, 0.0, -1.0], [1.0, 0.0, -1.0]]),
    ]
}

/// Two triangles forming the unit square in the plane `z = 0`.
pub fn unit_square() -> Vec<Triangle> {
    vec![
        Triangle::from([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]]),
        Triangle::from([[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
    ]
}

/// Creates a unit size cube centered at `pos` and pushes the triangles to `shapes`.
fn push_cube(pos: Point3<f32>, shapes: &mut Vec<Triangle>) {
    let top_front_right = pos + Vector3::new(0.5, 0.5, -0.5);
    let top_back_right = pos + Vector3::new(0.5, 0.5, 0.5);
    let top_back_left = pos + Vector3::new(-0.5, 0.5, 0.5);
    let top_front_left = pos + Vector3::new(-0.5, 0.5, -0.5);
    let bottom_front_right = pos + Vector3::new(0.5, -0.5, -0.5);
    let bottom_back_right = pos + Vector3::new(0.5, -0.5, 0.5);
    let bottom_back_left = pos + Vector3::new(-0.5, -0.5, 0.5);
    let bottom_front_left = pos + Vector3::new(-0.5, -0.5, -0.5);

    let faces = [
        (top_back_right, top_front_right, top_front_left),
        (top_front_left, top_back_left, top_back_right),
        (bottom_front_left, bottom_front_right, bottom_back_right),
        (bottom_back_right, bottom_back_left, bottom_front_left),
        (top_back_left, top_front_left, bottom_front_left),
        (bottom_front_left, bottom_back_left, top_back_left),
        (bottom_front_right, top_front_right, top_back_right),
        (top_back_right, bottom_back_right, bottom_front_right),
        (top_front_left, top_front_right, bottom_front_right),
        (bottom_front_right, bottom_front_left, top_front_left),
        (bottom_back_right, top_back_right, top_back_left),
        (top_back_left, bottom_back_left, bottom_back_right),
    ];
    shapes.extend(faces.iter().map(|&(a, b, c)| Triangle::new(a, b, c)));
}

/// Implementation of splitmix64.
/// For reference see: http://xoroshiro.di.unimi.it/splitmix64.c
fn splitmix64(x: &mut u64) -> u64 {
    *x = x.wrapping_add(0x9E3779B97F4A7C15u64);
    let mut z = *x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9u64);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EBu64);
    z ^ (z >> 31)
}

/// Generates a new `i32` triple. Mutates the seed.
pub fn next_point3_raw(seed: &mut u64) -> (i32, i32, i32) {
    let u = splitmix64(seed);
    let a = ((u >> 32) & 0xFFFFFFFF) as i64 - 0x80000000;
    let b = (u & 0xFFFFFFFF) as i64 - 0x80000000;
    let c = a ^ b.rotate_left(6);
    (a as i32, b as i32, c as i32)
}

/// Generates a new `Point3`, which will lie inside the given `aabb`. Mutates the seed.
pub fn next_point3(seed: &mut u64, aabb: &Aabb) -> Point3<f32> {
    let (a, b, c) = next_point3_raw(seed);
    let float_vector = Vector3::new(
        (a as f32 / i32::MAX as f32) + 1.0,
        (b as f32 / i32::MAX as f32) + 1.0,
        (c as f32 / i32::MAX as f32) + 1.0,
    ) * 0.5;

    assert!(float_vector.x >= 0.0 && float_vector.x <= 1.0);
    assert!(float_vector.y >= 0.0 && float_vector.y <= 1.0);
    assert!(float_vector.z >= 0.0 && float_vector.z <= 1.0);

    let size = aabb.size();
    aabb.min + size.component_mul(&float_vector)
}

/// Returns an `Aabb` which defines the default testing space bounds.
pub fn default_bounds() -> Aabb {
    Aabb::with_bounds(
        Point3::new(-100_000.0, -100_000.0, -100_000.0),
        Point3::new(100_000.0, 100_000.0, 100_000.0),
    )
}

/// Returns a small testing space, dense enough for random rays to hit unit cubes.
pub fn scene_bounds() -> Aabb {
    Aabb::with_bounds(Point3::new(-10.0, -10.0, -10.0), Point3::new(10.0, 10.0, 10.0))
}

/// Creates `n` deterministic random cubes. Returns the `Vec` of surface `Triangle`s.
pub fn create_n_cubes(n: usize, bounds: &Aabb) -> Vec<Triangle> {
    let mut vec = Vec::new();
    let mut seed = 0;
    for _ in 0..n {
        push_cube(next_point3(&mut seed, bounds), &mut vec);
    }
    vec
}

/// Moves `amount` randomly chosen triangles of `triangles` to a new random position
/// inside `bounds`.
pub fn randomly_transform_scene(
    triangles: &mut [Triangle],
    amount: usize,
    bounds: &Aabb,
    seed: &mut u64,
) {
    let mut indices: Vec<usize> = (0..triangles.len()).collect();
    let mut rng = StdRng::seed_from_u64(*seed);
    indices.shuffle(&mut rng);
    indices.truncate(amount);

    for index in indices {
        let triangle = &mut triangles[index];
        let offset = next_point3(seed, bounds) - triangle.aabb().center();
        *triangle = Triangle::new(
            triangle.a + offset,
            triangle.b + offset,
            triangle.c + offset,
        );
    }
}

/// Creates a `Ray` from the random `seed`. Mutates the `seed`.
/// The Ray origin will be inside the `bounds` and point to some other point inside this
/// `bounds`.
pub fn create_ray(seed: &mut u64, bounds: &Aabb) -> Ray {
    let origin = next_point3(seed, bounds);
    let target = next_point3(seed, bounds);
    Ray::new(origin, target - origin)
}

/// Intersects the ray with every triangle. The reference for all traversal tests.
pub fn brute_force_intersect(triangles: &[Triangle], ray: &Ray) -> Intersection {
    let mut ray = *ray;
    for (prim, t) in triangles.iter().enumerate() {
        let (e1, e2) = t.edges();
        ray.intersect_triangle_mut(&t.a, &e1, &e2, prim as u32);
    }
    ray.hit
}

/// Shoots `count` random rays through `bounds` and checks that `bh` finds the
/// same closest distance as the brute force reference. Returns the number of hits.
pub fn assert_agrees_with_brute_force<I: Intersector>(
    bh: &I,
    triangles: &[Triangle],
    bounds: &Aabb,
    count: usize,
) -> usize {
    let mut seed = 0x5eed;
    let mut hits = 0;
    for _ in 0..count {
        let ray = create_ray(&mut seed, bounds);
        let expected = brute_force_intersect(triangles, &ray);

        let mut actual = ray;
        bh.intersect(&mut actual);

        if expected.t < crate::INFINITE {
            hits += 1;
            let tolerance = 1e-5 * expected.t.max(1.0);
            assert!(
                (actual.hit.t - expected.t).abs() <= tolerance,
                "expected t = {}, got {}",
                expected.t,
                actual.hit.t
            );
            if actual.hit.prim != expected.prim {
                // Equidistant primitives may legally win in either order.
                let (e1, e2) = triangles[actual.hit.prim as usize].edges();
                let t = ray.intersects_triangle(&triangles[actual.hit.prim as usize].a, &e1, &e2);
                assert!(t.is_some());
            }
        } else {
            assert_eq!(actual.hit.t, crate::INFINITE);
        }
    }
    hits
}

/// Benchmark the construction of a hierarchy over `n` cubes.
#[cfg(feature = "bench")]
pub fn bench_build(n: usize, b: &mut ::test::Bencher, build: impl Fn(&[Triangle]) -> usize) {
    let triangles = create_n_cubes(n, &default_bounds());
    b.iter(|| build(&triangles));
}

/// Benchmark closest-hit traversal of `bh` over `n` cubes.
#[cfg(feature = "bench")]
pub fn bench_intersect<I: Intersector>(bh: &I, b: &mut ::test::Bencher) {
    let bounds = default_bounds();
    let mut seed = 0;
    b.iter(|| {
        let mut ray = create_ray(&mut seed, &bounds);
        bh.intersect(&mut ray)
    });
}
