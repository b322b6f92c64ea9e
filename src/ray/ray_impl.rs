//! This module defines a Ray structure and intersection algorithms
//! for axis aligned bounding boxes and triangles.

use crate::aabb::Aabb;
use crate::INFINITE;
use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector3};

use super::intersect_default::RayIntersection;

/// Direction components with a smaller magnitude get [`INFINITE`] as reciprocal.
pub const RECIPROCAL_EPSILON: f32 = 1e-12;

/// Triangles seen edge-on (|det| below this value) are never hit.
pub const DETERMINANT_EPSILON: f32 = 1e-7;

/// The closest hit found so far along a [`Ray`].
///
/// `t` doubles as the distance bound of the ray: traversal only accepts hits
/// closer than `t`, so it shrinks while closer primitives are found.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Intersection {
    /// Distance along the ray, in units of the direction vector's length.
    /// [`INFINITE`] while nothing has been hit.
    pub t: f32,

    /// First barycentric coordinate of the hit point.
    pub u: f32,

    /// Second barycentric coordinate of the hit point.
    pub v: f32,

    /// Index of the hit primitive in the geometry handed to the builder.
    pub prim: u32,
}

impl Default for Intersection {
    fn default() -> Intersection {
        Intersection {
            t: INFINITE,
            u: 0.0,
            v: 0.0,
            prim: 0,
        }
    }
}

/// A traversal query: origin, direction, the cached reciprocal direction used by
/// slab tests and the closest [`Intersection`] found so far.
///
/// The layout is 64 bytes, 16-byte aligned, so rays can be uploaded as is.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Ray {
    /// The ray origin.
    pub origin: Point3<f32>,
    padding_0: u32,

    /// The ray direction. Not normalized.
    pub direction: Vector3<f32>,
    padding_1: u32,

    /// Reciprocal (1/x) ray direction. Cached for use in [`Aabb`] intersections.
    pub inv_direction: Vector3<f32>,
    padding_2: u32,

    /// The closest hit so far.
    pub hit: Intersection,
}

/// Reciprocal that stays finite: near-zero inputs map to [`INFINITE`] instead of
/// producing an infinity (or NaN in the slab test).
///
/// Zero components map to `+INFINITE`. A ray with a zero direction component
/// whose origin lies exactly on the upper face of a box along that axis gets the
/// slab distance `0 * INFINITE = 0` for that face, so the box is clipped to
/// `tmax = 0` and missed. Such rays only graze edges or vertices of the
/// primitives inside, which brute force intersection may still report.
#[inline(always)]
pub fn safe_reciprocal(x: f32) -> f32 {
    if x > RECIPROCAL_EPSILON || x < -RECIPROCAL_EPSILON {
        1.0 / x
    } else {
        INFINITE
    }
}

/// Creates a traversal-ready [`Ray`] from raw coordinate triples.
///
/// The direction is stored verbatim and is *not* normalized. Distances reported
/// in [`Intersection::t`] are therefore measured in multiples of the direction
/// vector's length, not in world units; callers who want world units must pass
/// a unit direction.
///
/// # Examples
/// ```
/// use bvh_layouts::ray::make_ray;
/// use bvh_layouts::INFINITE;
///
/// let ray = make_ray([0.0, 0.0, 0.0], [0.0, 0.0, -2.0]);
/// assert_eq!(ray.direction.z, -2.0);
/// assert_eq!(ray.inv_direction.z, -0.5);
/// assert_eq!(ray.inv_direction.x, INFINITE);
/// assert_eq!(ray.hit.t, INFINITE);
/// ```
pub fn make_ray(origin: [f32; 3], direction: [f32; 3]) -> Ray {
    Ray::new(Point3::from(origin), Vector3::from(direction))
}

impl Ray {
    /// Creates a new [`Ray`] from an `origin` and a `direction`.
    /// `direction` is kept as given; see [`make_ray`] for the distance contract.
    ///
    /// # Examples
    /// ```
    /// use bvh_layouts::ray::Ray;
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let origin = Point3::new(0.0, 0.0, 0.0);
    /// let direction = Vector3::new(1.0, 0.0, 0.0);
    /// let ray = Ray::new(origin, direction);
    ///
    /// assert_eq!(ray.origin, origin);
    /// assert_eq!(ray.direction, direction);
    /// ```
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Ray {
        Ray {
            origin,
            direction,
            inv_direction: direction.map(safe_reciprocal),
            hit: Intersection::default(),
            ..Zeroable::zeroed()
        }
    }

    /// Limits the ray to hits closer than `t_max`.
    pub fn with_max_distance(mut self, t_max: f32) -> Ray {
        self.hit.t = t_max;
        self
    }

    /// Returns the current distance bound.
    pub fn t_max(&self) -> f32 {
        self.hit.t
    }

    /// Returns the point at distance `t` along the ray.
    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Tests the intersection of a [`Ray`] with an [`Aabb`] using the slab test,
    /// taking the current distance bound into account.
    ///
    /// # Examples
    /// ```
    /// use bvh_layouts::aabb::Aabb;
    /// use bvh_layouts::ray::Ray;
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
    ///
    /// let point1 = Point3::new(99.9, -1.0, -1.0);
    /// let point2 = Point3::new(100.1, 1.0, 1.0);
    /// let aabb = Aabb::with_bounds(point1, point2);
    ///
    /// assert!(ray.intersects_aabb(&aabb));
    /// assert!(!ray.with_max_distance(50.0).intersects_aabb(&aabb));
    /// ```
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        if aabb.is_empty() {
            return false;
        }
        let (min, max) = aabb.to_arrays();
        self.slab(&min, &max) < INFINITE
    }

    /// Returns the distance at which the ray enters the box given by its raw
    /// corners, or [`INFINITE`] if the box is missed or lies beyond the current
    /// distance bound. The distance is negative when the origin is inside.
    #[inline(always)]
    pub fn aabb_entry_distance(&self, min: &[f32; 3], max: &[f32; 3]) -> f32 {
        self.slab(min, max)
    }

    /// Two-sided implementation of the
    /// [Möller-Trumbore triangle/ray intersection algorithm](https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm)
    /// for a triangle given as `vertex0` and the edges `edge1 = b - a`, `edge2 = c - a`.
    ///
    /// Returns `(t, u, v)` if the ray hits the triangle closer than the current
    /// distance bound, `None` otherwise. The ray is not modified.
    #[allow(clippy::many_single_char_names)]
    pub fn intersects_triangle(
        &self,
        vertex0: &Point3<f32>,
        edge1: &Vector3<f32>,
        edge2: &Vector3<f32>,
    ) -> Option<(f32, f32, f32)> {
        // If the determinant is near zero, the ray lies in the plane of the triangle.
        let h = self.direction.cross(edge2);
        let det = edge1.dot(&h);
        if det.abs() < DETERMINANT_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - vertex0;

        let u = s.dot(&h) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = self.direction.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(&q) * inv_det;
        if t > 0.0 && t < self.hit.t {
            Some((t, u, v))
        } else {
            None
        }
    }

    /// Tests a triangle and records it as the new closest hit if it is closer.
    /// Returns `true` if the hit record changed.
    pub fn intersect_triangle_mut(
        &mut self,
        vertex0: &Point3<f32>,
        edge1: &Vector3<f32>,
        edge2: &Vector3<f32>,
        prim: u32,
    ) -> bool {
        match self.intersects_triangle(vertex0, edge1, edge2) {
            Some((t, u, v)) => {
                self.hit = Intersection { t, u, v, prim };
                true
            }
            None => false,
        }
    }
}
