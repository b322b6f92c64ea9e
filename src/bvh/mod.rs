//! The binary hierarchy in the Wald layout, its binned SAH builder and traversal.

mod build;
mod bvh_impl;
mod iter;
mod node;
mod traverse;

pub use self::bvh_impl::*;
pub use self::iter::*;
pub use self::node::*;
