//! Compressed wide hierarchies (CWBVH): 8-wide nodes with child boxes quantized
//! to 8 bits per axis, packed into 80-byte records.

mod cwbvh_impl;
mod node;
pub mod quantize;
mod traverse;

pub use self::cwbvh_impl::*;
pub use self::node::*;
