#![cfg_attr(feature = "bench", feature(test))]
//! A crate which builds bounding volume hierarchies over triangles and exports
//! them in several node layouts.
//!
//! ## About
//!
//! A binary hierarchy is built with the binned surface area heuristic and stored
//! in the 32-byte "Wald" layout. It can be collapsed into 4-wide or 8-wide
//! hierarchies, and an 8-wide hierarchy can be compressed into the 80-byte CWBVH
//! format, whose child boxes are quantized to 8 bits per axis. Every layout is an
//! independent, immutable snapshot with its own node array, and every layout can
//! be traversed with the same [`Intersector`](traversal::Intersector) interface.
//!
//! ## Example
//!
//! ```
//! use bvh_layouts::bvh::Bvh;
//! use bvh_layouts::cwbvh::Cwbvh;
//! use bvh_layouts::ray::make_ray;
//! use bvh_layouts::traversal::Intersector;
//! use bvh_layouts::triangle::Triangle;
//! use bvh_layouts::wide::Bvh8;
//!
//! let triangles: Vec<Triangle> = (0..100)
//!     .map(|i| {
//!         let x = i as f32;
//!         Triangle::from([[x, 0.0, 0.0], [x + 0.5, 0.0, 0.0], [x, 1.0, 0.0]])
//!     })
//!     .collect();
//!
//! let bvh = Bvh::build(&triangles).unwrap();
//! let bvh8 = Bvh8::new(&bvh);
//! let cwbvh = Cwbvh::new(&Bvh8::new(&bvh.split_leaves(3).unwrap())).unwrap();
//!
//! for layout in [&bvh as &dyn Intersector, &bvh8, &cwbvh] {
//!     let mut ray = make_ray([42.1, 0.1, 1.0], [0.0, 0.0, -1.0]);
//!     layout.intersect(&mut ray);
//!     assert_eq!(ray.hit.prim, 42);
//!     assert!((ray.hit.t - 1.0).abs() < 1e-6);
//! }
//! ```
//!
//! ## Features
//!
//! - `rayon` (default **enabled**) - builds large subtrees in parallel
//! - `simd` (default **disabled**) - ray/box slab test with the `wide` crate
//! - `serde` (default **disabled**) - adds `Serialize` and `Deserialize` implementations for
//!   [`BuildConfig`](config::BuildConfig)
//! - `bench` (default **disabled**) - nightly benchmarks
//!

#[cfg(all(feature = "bench", test))]
extern crate test;

/// Distance reported for rays that hit nothing.
pub const INFINITE: f32 = 1e30;

/// A minimal floating value used as a lower bound.
pub const EPSILON: f32 = 0.00001;

pub mod aabb;
pub mod axis;
pub mod bvh;
pub mod config;
pub mod cwbvh;
pub mod error;
pub mod ray;
pub mod traversal;
pub mod triangle;
pub mod wide;
mod utils;

#[cfg(test)]
mod testbase;

pub use crate::error::{BvhError, Result};

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
