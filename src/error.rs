//! Error types for eda-score operations.
//!
//! Defines error types for each subsystem:
//! - Distance kernel and diversity aggregation
//! - Dataset loading, normalization and splitting
//! - Gaussian Naive Bayes training and prediction
//! - The iteration pipeline that ties them together

use thiserror::Error;

use crate::pipeline::config::ConfigError;

/// Errors that can occur while computing distances or diversity scores.
#[derive(Debug, Error)]
pub enum DiversityError {
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("Singular covariance matrix: {0}")]
    SingularCovariance(String),

    #[error("Degenerate batch: {0}")]
    DegenerateBatch(String),

    #[error("Unknown metric '{0}': must be 'euclidean', 'cosine', or 'mahalanobis'")]
    UnknownMetric(String),

    #[error("Non-finite input: {0}")]
    NonFiniteInput(String),
}

impl DiversityError {
    pub(crate) fn shape(
        context: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Errors that can occur while loading or reshaping sample data.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid numeric value '{value}' at line {line}, column {column}")]
    Parse {
        line: usize,
        column: usize,
        value: String,
    },

    #[error("Row at line {line} has {actual} columns, expected {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Dataset is empty: {0}")]
    Empty(String),

    #[error("Cannot stack matrices with {top} and {bottom} columns")]
    ShapeMismatch { top: usize, bottom: usize },

    #[error("Invalid split: {0}")]
    InvalidSplit(String),
}

/// Errors that can occur while training or querying the classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier has not been fitted")]
    NotFitted,

    #[error("Invalid priors: {0}")]
    InvalidPriors(String),

    #[error("Variance smoothing must be positive and finite, got {0}")]
    InvalidSmoothing(f64),

    #[error("Class {0} has no training samples")]
    EmptyClass(usize),

    #[error("Label {label} is out of range for {classes} classes")]
    LabelOutOfRange { label: usize, classes: usize },

    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors that can occur while running the evaluation pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Diversity error: {0}")]
    Diversity(#[from] DiversityError),

    #[error("Sink rejected report: {0}")]
    Sink(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
