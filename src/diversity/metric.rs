//! Distance metric selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DiversityError;

/// Metric used by the distance kernel.
///
/// The selector fixes both the per-pair formula and any auxiliary
/// structure built once per call (the inverse covariance for
/// [`Metric::Mahalanobis`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// L2 norm of the row difference.
    Euclidean,
    /// One minus the cosine similarity of the two rows.
    Cosine,
    /// Distance under the inverse covariance of the pooled sample.
    Mahalanobis,
}

impl Metric {
    /// All supported metrics, in the order the pipeline evaluates them.
    pub const ALL: [Metric; 3] = [Metric::Euclidean, Metric::Cosine, Metric::Mahalanobis];

    /// Returns the lowercase tag for this metric.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Cosine => "cosine",
            Metric::Mahalanobis => "mahalanobis",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = DiversityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "euclidean" => Ok(Metric::Euclidean),
            "cosine" => Ok(Metric::Cosine),
            "mahalanobis" => Ok(Metric::Mahalanobis),
            _ => Err(DiversityError::UnknownMetric(s.to_string())),
        }
    }
}
