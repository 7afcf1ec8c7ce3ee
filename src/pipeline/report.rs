//! Per-iteration results of the scoring pipeline and the sink they are
//! handed to.

use serde::{Deserialize, Serialize};

use crate::diversity::Metric;
use crate::error::PipelineError;

/// Prior belief used when training the classifier for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorScenario {
    /// Priors `[background_fraction, 1 - background_fraction]`, trained on
    /// the imbalanced training batch.
    Imbalanced,
    /// Priors `[0.5, 0.5]`, trained on a batch with as many signal rows as
    /// background rows.
    Balanced,
}

/// Diversity and fused scores of one metric over the streaming batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub metric: Metric,
    /// Raw diversity score per streaming sample.
    pub diversity: Vec<f64>,
    /// `probability * diversity` per streaming sample.
    pub fused: Vec<f64>,
}

/// Classifier posterior and metric scores under one prior scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: PriorScenario,
    /// Class priors the classifier was trained with.
    pub priors: Vec<f64>,
    /// Background rows in this scenario's training batch.
    pub training_background_rows: usize,
    /// Signal rows in this scenario's training batch.
    pub training_signal_rows: usize,
    /// Posterior probability of the background class per streaming sample.
    pub probability: Vec<f64>,
    /// One entry per successfully scored metric, in configured order.
    pub scores: Vec<MetricScore>,
}

impl ScenarioReport {
    /// Background prior as a whole percentage, e.g. `"99"` or `"50"`.
    pub fn tag(&self) -> String {
        let background = self.priors.first().copied().unwrap_or_default();
        format!("{:.0}", background * 100.0)
    }

    /// Returns the score entry for `metric`, if it was computed.
    pub fn score(&self, metric: Metric) -> Option<&MetricScore> {
        self.scores.iter().find(|s| s.metric == metric)
    }
}

/// Everything one resampling iteration produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationReport {
    /// Zero-based iteration index.
    pub iteration: usize,
    pub streaming_background_rows: usize,
    pub streaming_signal_rows: usize,
    pub scenarios: Vec<ScenarioReport>,
}

impl IterationReport {
    /// Total rows in the streaming batch.
    pub fn streaming_rows(&self) -> usize {
        self.streaming_background_rows + self.streaming_signal_rows
    }

    /// Returns the report for `scenario`, if present.
    pub fn scenario(&self, scenario: PriorScenario) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.scenario == scenario)
    }

    /// Serializes the report as JSON.
    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Destination for iteration reports.
///
/// The pipeline calls [`record`](ScoreSink::record) once per iteration,
/// in order. Returning an error stops the run.
pub trait ScoreSink {
    fn record(&mut self, report: &IterationReport) -> Result<(), PipelineError>;
}

impl ScoreSink for Vec<IterationReport> {
    fn record(&mut self, report: &IterationReport) -> Result<(), PipelineError> {
        self.push(report.clone());
        Ok(())
    }
}
