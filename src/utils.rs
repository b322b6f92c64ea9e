//! Utilities module.

use crate::aabb::{Aabb, Bounded};

/// Fast floating point minimum.  This function matches the semantics of
///
/// ```no_compile
/// if x < y { x } else { y }
/// ```
///
/// which has efficient instruction sequences on many platforms (1 instruction on x86).  For most
/// values, it matches the semantics of `x.min(y)`; the special cases are:
///
/// ```text
/// min(-0.0, +0.0); +0.0
/// min(+0.0, -0.0): -0.0
/// min( NaN,  1.0):  1.0
/// min( 1.0,  NaN):  NaN
/// ```
///
/// Note: This exists because [`std::cmp::min`] requires Ord which floating point types do not satisfy
#[inline(always)]
pub fn fast_min(x: f32, y: f32) -> f32 {
    if x < y {
        x
    } else {
        y
    }
}

/// Fast floating point maximum.  This function matches the semantics of
///
/// ```no_compile
/// if x > y { x } else { y }
/// ```
///
/// which has efficient instruction sequences on many platforms (1 instruction on x86).  For most
/// values, it matches the semantics of `x.max(y)`; the special cases are:
///
/// ```text
/// max(-0.0, +0.0); +0.0
/// max(+0.0, -0.0): -0.0
/// max( NaN,  1.0):  1.0
/// max( 1.0,  NaN):  NaN
/// ```
///
/// Note: This exists because [`std::cmp::max`] requires Ord which floating point types do not satisfy
#[inline(always)]
pub fn fast_max(x: f32, y: f32) -> f32 {
    if x > y {
        x
    } else {
        y
    }
}

/// Defines a Bucket utility object. Used to store the properties of primitive
/// partitions while the builder evaluates the SAH.
#[derive(Clone, Copy, Debug)]
pub struct Bucket {
    /// The number of primitives in this `Bucket`.
    pub size: usize,

    /// The joint [`Aabb`] of the primitives in this [`Bucket`].
    pub aabb: Aabb,
}

impl Bucket {
    /// Returns an empty bucket.
    pub fn empty() -> Bucket {
        Bucket {
            size: 0,
            aabb: Aabb::empty(),
        }
    }

    /// Extend this [`Bucket`] by a primitive with the given [`Aabb`].
    pub fn add_aabb(&mut self, aabb: &Aabb) {
        self.size += 1;
        self.aabb.join_mut(aabb);
    }

    /// Join the contents of two [`Bucket`]'s.
    pub fn join_bucket(a: Bucket, b: &Bucket) -> Bucket {
        Bucket {
            size: a.size + b.size,
            aabb: a.aabb.join(&b.aabb),
        }
    }

    /// Weighted area term of the SAH: surface area times primitive count.
    pub fn sah_weight(&self) -> f32 {
        if self.size == 0 {
            0.0
        } else {
            self.aabb.surface_area() * self.size as f32
        }
    }
}

/// Returns the joint [`Aabb`] of the primitives at the given `indices`.
pub fn joint_aabb_of_shapes<Shape: Bounded>(indices: &[u32], shapes: &[Shape]) -> Aabb {
    let mut aabb = Aabb::empty();
    for index in indices {
        aabb.join_mut(&shapes[*index as usize].aabb());
    }
    aabb
}
