//! Closest-hit queries shared by every hierarchy layout.

use crate::ray::Ray;

/// A structure that can answer ray queries against the geometry it was built from.
///
/// # Examples
/// ```
/// use bvh_layouts::bvh::Bvh;
/// use bvh_layouts::ray::make_ray;
/// use bvh_layouts::traversal::Intersector;
/// use bvh_layouts::triangle::Triangle;
///
/// let triangles = [Triangle::from([[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [0.0, 1.0, -1.0]])];
/// let bvh = Bvh::build(&triangles).unwrap();
///
/// let mut ray = make_ray([0.0, 0.0, 0.0], [0.0, 0.0, -1.0]);
/// assert!(bvh.is_occluded(&ray));
/// bvh.intersect(&mut ray);
/// assert_eq!(ray.hit.prim, 0);
/// assert!((ray.hit.t - 1.0).abs() < 1e-6);
/// ```
pub trait Intersector {
    /// Finds the closest primitive hit along `ray` that lies closer than
    /// `ray.hit.t`, and stores it in `ray.hit`. Leaves `ray.hit` untouched on a miss.
    ///
    /// Returns the number of traversal steps, i.e. the number of nodes visited.
    fn intersect(&self, ray: &mut Ray) -> u32;

    /// Returns true if any primitive lies along `ray` closer than `ray.hit.t`.
    fn is_occluded(&self, ray: &Ray) -> bool {
        let mut shadow = *ray;
        self.intersect(&mut shadow);
        shadow.hit.t < ray.hit.t
    }
}
