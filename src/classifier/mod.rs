//! Probabilistic classifiers used to weight diversity scores.
//!
//! The pipeline trains a Gaussian Naive Bayes model on a labeled training
//! batch and uses its posterior for the background class as the per-sample
//! probability that gets fused with diversity.

pub mod naive_bayes;

pub use naive_bayes::{GaussianNaiveBayes, DEFAULT_VAR_SMOOTHING};
