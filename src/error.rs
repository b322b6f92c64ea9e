//! Error types returned by the build and conversion procedures.

use thiserror::Error;

/// Errors that can occur while building or converting a hierarchy.
///
/// A failed build or conversion never yields a hierarchy object, so no partially
/// written node array is ever observable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BvhError {
    /// A triangle vertex holds a NaN or infinite coordinate.
    #[error("triangle {triangle} has a non-finite coordinate in vertex {vertex}")]
    NonFiniteVertex {
        /// Index of the offending triangle in the input slice.
        triangle: usize,
        /// Vertex (0, 1 or 2) holding the non-finite value.
        vertex: usize,
    },

    /// The [`BuildConfig`] holds values outside of their valid range.
    ///
    /// [`BuildConfig`]: ../config/struct.BuildConfig.html
    #[error("invalid build configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// A value does not fit into the fixed-size encoding of a node layout.
    #[error("{what} is {value}, which exceeds the encoding limit of {limit}")]
    CapacityOverflow {
        /// What overflowed.
        what: &'static str,
        /// The value that had to be encoded.
        value: u64,
        /// The largest encodable value.
        limit: u64,
    },
}

/// Result type for build and conversion operations.
pub type Result<T> = std::result::Result<T, BvhError>;
