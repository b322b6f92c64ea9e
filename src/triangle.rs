//! The geometry handed to the builders: an ordered list of triangles.

use crate::aabb::{Aabb, Bounded};
use crate::error::{BvhError, Result};
use nalgebra::{Point3, Vector3};

/// A triangle given by three vertices.
///
/// The hierarchies reference triangles by their position in the input slice,
/// so the slice must stay unchanged while a hierarchy borrowing it is alive.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Triangle {
    /// First vertex.
    pub a: Point3<f32>,
    /// Second vertex.
    pub b: Point3<f32>,
    /// Third vertex.
    pub c: Point3<f32>,
}

impl Triangle {
    /// Creates a new triangle from three vertices.
    pub fn new(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Triangle {
        Triangle { a, b, c }
    }

    /// Returns the three vertices in order.
    pub fn vertices(&self) -> [Point3<f32>; 3] {
        [self.a, self.b, self.c]
    }

    /// Returns the edges `b - a` and `c - a`.
    pub fn edges(&self) -> (Vector3<f32>, Vector3<f32>) {
        (self.b - self.a, self.c - self.a)
    }

    /// Returns the index of the first vertex holding a NaN or infinite coordinate.
    pub fn first_non_finite_vertex(&self) -> Option<usize> {
        self.vertices()
            .iter()
            .position(|v| !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()))
    }
}

impl From<[[f32; 3]; 3]> for Triangle {
    fn from(v: [[f32; 3]; 3]) -> Triangle {
        Triangle::new(Point3::from(v[0]), Point3::from(v[1]), Point3::from(v[2]))
    }
}

impl Bounded for Triangle {
    fn aabb(&self) -> Aabb {
        Aabb::empty().grow(&self.a).grow(&self.b).grow(&self.c)
    }
}

/// Rejects geometry holding NaN or infinite coordinates, which would otherwise
/// silently poison every bounding box above it.
pub fn validate_triangles(triangles: &[Triangle]) -> Result<()> {
    for (triangle, t) in triangles.iter().enumerate() {
        if let Some(vertex) = t.first_non_finite_vertex() {
            log::warn!(
                "rejecting geometry: triangle {} vertex {} is not finite",
                triangle,
                vertex
            );
            return Err(BvhError::NonFiniteVertex { triangle, vertex });
        }
    }
    if triangles.len() as u64 > u32::MAX as u64 {
        return Err(BvhError::CapacityOverflow {
            what: "triangle count",
            value: triangles.len() as u64,
            limit: u32::MAX as u64,
        });
    }
    Ok(())
}
