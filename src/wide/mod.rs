//! 4-wide and 8-wide hierarchies, collapsed from the binary [`Bvh`].
//!
//! [`Bvh`]: ../bvh/struct.Bvh.html

mod node;
mod traverse;
mod wide_impl;

pub use self::node::*;
pub use self::wide_impl::*;
