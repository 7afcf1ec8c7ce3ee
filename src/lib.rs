//! eda-score: distance-based diversity scoring for streaming batches.
//!
//! The core is a pairwise distance kernel (Euclidean, cosine, Mahalanobis)
//! and an aggregator that turns a batch's distance matrix into one
//! closeness-weighted diversity score per sample. Around it sit dataset
//! preparation, a Gaussian Naive Bayes classifier and a resampling
//! pipeline that fuses the classifier posterior with the diversity score.

// Core modules
pub mod classifier;
pub mod dataset;
pub mod diversity;
pub mod error;
pub mod pipeline;

// Re-export commonly used error types
pub use error::{ClassifierError, DatasetError, DiversityError, PipelineError};
