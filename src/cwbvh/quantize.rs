//! Conservative 8-bit quantization of child boxes relative to their parent.

use crate::aabb::Aabb;
use crate::error::{BvhError, Result};

/// Smallest unbiased exponent, also used for flat axes.
pub const MIN_EXPONENT: i32 = -126;

/// Largest unbiased exponent.
pub const MAX_EXPONENT: i32 = 127;

const QUANT_MAX: f32 = 255.0;

/// Returns `2^(e - 127)` for a biased exponent byte.
#[inline]
pub fn scale_from_exponent(e: u8) -> f32 {
    f32::from_bits((e as u32) << 23)
}

/// Decodes a quantized coordinate. Construction and traversal both go through
/// this function, so both see bit-identical boxes.
#[inline]
pub fn dequantize(p: f32, scale: f32, q: u8) -> f32 {
    p + q as f32 * scale
}

fn scale_of(exponent: i32) -> f32 {
    scale_from_exponent((exponent + 127) as u8)
}

/// Picks the smallest exponent whose 255 steps from `min` reach `max`.
fn exponent(min: f32, max: f32) -> Result<i32> {
    let extent = max - min;
    let mut e = if extent > 0.0 {
        ((extent / QUANT_MAX).log2().ceil() as i32).max(MIN_EXPONENT)
    } else {
        MIN_EXPONENT
    };
    while e <= MAX_EXPONENT && min + QUANT_MAX * scale_of(e) < max {
        e += 1;
    }
    if e > MAX_EXPONENT {
        return Err(BvhError::CapacityOverflow {
            what: "quantization exponent",
            value: e as u64,
            limit: MAX_EXPONENT as u64,
        });
    }
    Ok(e)
}

/// The quantization frame of one compressed node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    /// Origin of the frame.
    pub p: [f32; 3],
    /// Biased exponents.
    pub e: [u8; 3],
    scale: [f32; 3],
}

impl Quantizer {
    /// Creates a frame covering `aabb`.
    pub fn new(aabb: &Aabb) -> Result<Quantizer> {
        let (min, max) = aabb.to_arrays();
        let mut e = [0u8; 3];
        let mut scale = [0.0; 3];
        for axis in 0..3 {
            let exp = exponent(min[axis], max[axis])?;
            e[axis] = (exp + 127) as u8;
            scale[axis] = scale_of(exp);
        }
        Ok(Quantizer { p: min, e, scale })
    }

    /// Quantizes `child` so that the decoded box encloses it.
    pub fn quantize(&self, child: &Aabb) -> Result<([u8; 3], [u8; 3])> {
        let (cmin, cmax) = child.to_arrays();
        let mut lo = [0u8; 3];
        let mut hi = [0u8; 3];
        for axis in 0..3 {
            let (p, s) = (self.p[axis], self.scale[axis]);

            let mut qlo = ((cmin[axis] - p) / s).floor().clamp(0.0, QUANT_MAX) as u8;
            while qlo > 0 && dequantize(p, s, qlo) > cmin[axis] {
                qlo -= 1;
            }

            let mut qhi = ((cmax[axis] - p) / s).ceil().clamp(0.0, QUANT_MAX) as u8;
            while qhi < u8::MAX && dequantize(p, s, qhi) < cmax[axis] {
                qhi += 1;
            }
            if dequantize(p, s, qhi) < cmax[axis] || dequantize(p, s, qlo) > cmin[axis] {
                return Err(BvhError::CapacityOverflow {
                    what: "quantized child bound",
                    value: 256,
                    limit: 255,
                });
            }

            lo[axis] = qlo;
            hi[axis] = qhi;
        }
        Ok((lo, hi))
    }
}
