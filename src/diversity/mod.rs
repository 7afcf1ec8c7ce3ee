//! Distance-based diversity scoring engine.
//!
//! This module measures how isolated each sample of a batch is relative to
//! the rest of the batch. It is a pure computation: it takes sample
//! matrices and a metric, and returns matrices or vectors. It performs no
//! I/O and holds no state between calls.
//!
//! # Overview
//!
//! Two layers:
//!
//! 1. **Distance kernel** ([`distance`]) - all-pairs distances between two
//!    sample sets under [`Metric::Euclidean`], [`Metric::Cosine`] or
//!    [`Metric::Mahalanobis`]. The result for `a` (`N` rows) and `b` (`M`
//!    rows) is `M x N`, addressed `[row-of-b, row-of-a]`.
//! 2. **Diversity aggregator** ([`diversity`]) - reduces the self-distance
//!    matrix of a batch to one closeness-weighted score per sample.
//!
//! [`fuse`] multiplies a score vector with externally computed per-sample
//! probabilities, which is how the evaluation pipeline consumes the engine.
//!
//! # Usage
//!
//! ```rust
//! use eda_score::diversity::{diversity, fuse, Metric};
//! use ndarray::array;
//!
//! let batch = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
//! let scores = diversity(&batch, Metric::Euclidean).unwrap();
//!
//! let probability = array![0.9, 0.5, 0.1];
//! let fused = fuse(&scores, &probability).unwrap();
//! assert_eq!(fused.len(), 3);
//! ```
//!
//! # Failure modes
//!
//! - Mismatched widths or empty inputs give `ShapeMismatch`.
//! - A Mahalanobis pooled sample whose covariance cannot be inverted gives
//!   `SingularCovariance`. There is no pseudo-inverse fallback.
//! - Batches of one sample, or samples with zero total distance to the
//!   batch, give `DegenerateBatch` instead of infinite scores.

pub mod aggregate;
pub mod distance;
pub mod linalg;
pub mod metric;

// Re-export main types for convenience
pub use aggregate::{closeness, diversity, fuse};
pub use distance::{cosine_distance, distance, euclidean_distance, mahalanobis_distance};
pub use metric::Metric;
