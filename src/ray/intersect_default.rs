//! This file contains the scalar implementation of [`RayIntersection`].

use super::Ray;
use crate::utils::{fast_max, fast_min};
use crate::INFINITE;

/// The [`RayIntersection`] trait hides whether the slab test runs on scalars or
/// on SIMD registers.
pub trait RayIntersection {
    /// Returns the entry distance of the ray into the box `min`..`max`, or
    /// [`INFINITE`] if the box is missed or lies beyond the ray's distance bound.
    fn slab(&self, min: &[f32; 3], max: &[f32; 3]) -> f32;
}

#[cfg(not(feature = "simd"))]
impl RayIntersection for Ray {
    #[inline(always)]
    fn slab(&self, min: &[f32; 3], max: &[f32; 3]) -> f32 {
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        for axis in 0..3 {
            let t1 = (min[axis] - self.origin[axis]) * self.inv_direction[axis];
            let t2 = (max[axis] - self.origin[axis]) * self.inv_direction[axis];
            tmin = fast_max(tmin, fast_min(t1, t2));
            tmax = fast_min(tmax, fast_max(t1, t2));
        }
        slab_result(tmin, tmax, self.hit.t)
    }
}

/// Turns the slab interval into an entry distance.
#[inline(always)]
pub(crate) fn slab_result(tmin: f32, tmax: f32, t_bound: f32) -> f32 {
    if tmax >= tmin && tmin < t_bound && tmax >= 0.0 {
        tmin
    } else {
        INFINITE
    }
}
