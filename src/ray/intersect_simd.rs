//! This file contains the SIMD implementation of [`RayIntersection`]
//! for any architectures supported by the `wide` crate.

use ::wide::f32x4;

use super::intersect_default::{slab_result, RayIntersection};
use super::Ray;
use crate::utils::{fast_max, fast_min};

/// Loads a triple into a register, repeating the z lane in the unused slot so the
/// horizontal reductions are not disturbed.
#[inline(always)]
fn to_register(v: [f32; 3]) -> f32x4 {
    f32x4::new([v[2], v[2], v[1], v[0]])
}

/// Compute the horizontal maximum of the SIMD vector
#[inline(always)]
fn max_elem_f32x4(v: f32x4) -> f32 {
    let a = v.to_array();
    fast_max(fast_max(a[0], a[1]), fast_max(a[2], a[3]))
}

/// Compute the horizontal minimum of the SIMD vector
#[inline(always)]
fn min_elem_f32x4(v: f32x4) -> f32 {
    let a = v.to_array();
    fast_min(fast_min(a[0], a[1]), fast_min(a[2], a[3]))
}

impl RayIntersection for Ray {
    #[inline(always)]
    fn slab(&self, min: &[f32; 3], max: &[f32; 3]) -> f32 {
        let origin = to_register(self.origin.coords.into());
        let inv_direction = to_register(self.inv_direction.into());

        let t1 = (to_register(*min) - origin) * inv_direction;
        let t2 = (to_register(*max) - origin) * inv_direction;

        let tmin = max_elem_f32x4(t1.min(t2));
        let tmax = min_elem_f32x4(t1.max(t2));
        slab_result(tmin, tmax, self.hit.t)
    }
}
