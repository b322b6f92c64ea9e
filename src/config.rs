//! Parameters of the binned SAH builder.

use crate::error::{BvhError, Result};

/// Largest number of SAH bins per axis accepted by [`BuildConfig::validate`].
pub const MAX_BINS: usize = 64;

/// Parameters for [`Bvh::build_with_config`].
///
/// # Examples
/// ```
/// use bvh_layouts::config::BuildConfig;
///
/// let config = BuildConfig::default().with_bins(16).with_max_leaf_size(2);
/// assert!(config.validate().is_ok());
/// assert!(BuildConfig::default().with_bins(1).validate().is_err());
/// ```
///
/// [`Bvh::build_with_config`]: ../bvh/struct.Bvh.html#method.build_with_config
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BuildConfig {
    /// Number of bins evaluated per axis when searching for a split plane.
    pub bins: usize,

    /// Estimated cost of visiting an interior node.
    pub traversal_cost: f32,

    /// Estimated cost of intersecting a single primitive.
    pub intersection_cost: f32,

    /// Nodes holding at most this many primitives are never split.
    pub min_leaf_size: usize,

    /// Nodes holding more than this many primitives are always split,
    /// even if the SAH would rather make them a leaf.
    pub max_leaf_size: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            bins: 8,
            traversal_cost: 1.0,
            intersection_cost: 1.0,
            min_leaf_size: 1,
            max_leaf_size: 4,
        }
    }
}

impl BuildConfig {
    /// Sets the number of bins per axis.
    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins;
        self
    }

    /// Sets the traversal and intersection cost constants of the SAH.
    pub fn with_costs(mut self, traversal_cost: f32, intersection_cost: f32) -> Self {
        self.traversal_cost = traversal_cost;
        self.intersection_cost = intersection_cost;
        self
    }

    /// Sets the size under which nodes are never split.
    pub fn with_min_leaf_size(mut self, min_leaf_size: usize) -> Self {
        self.min_leaf_size = min_leaf_size;
        self
    }

    /// Sets the size over which nodes are always split.
    pub fn with_max_leaf_size(mut self, max_leaf_size: usize) -> Self {
        self.max_leaf_size = max_leaf_size;
        self
    }

    /// Checks that every parameter lies within its valid range.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(BvhError::InvalidConfig { message });

        if self.bins < 2 || self.bins > MAX_BINS {
            return invalid(format!("bins must lie in 2..={}, got {}", MAX_BINS, self.bins));
        }
        if !(self.traversal_cost.is_finite() && self.traversal_cost >= 0.0) {
            return invalid(format!(
                "traversal_cost must be finite and non-negative, got {}",
                self.traversal_cost
            ));
        }
        if !(self.intersection_cost.is_finite() && self.intersection_cost > 0.0) {
            return invalid(format!(
                "intersection_cost must be finite and strictly positive, got {}",
                self.intersection_cost
            ));
        }
        if self.min_leaf_size == 0 {
            return invalid("min_leaf_size must be at least 1".to_string());
        }
        if self.max_leaf_size < self.min_leaf_size {
            return invalid(format!(
                "max_leaf_size ({}) must not be smaller than min_leaf_size ({})",
                self.max_leaf_size, self.min_leaf_size
            ));
        }
        Ok(())
    }
}
