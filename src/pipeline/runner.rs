//! Resampling loop that scores streaming batches.
//!
//! This module provides the `ScoringPipeline` which, once per iteration,
//! draws a training batch and a streaming batch from the background and
//! signal populations, trains the classifier under both prior scenarios
//! and fuses its posterior with the diversity score of every configured
//! metric.

use std::time::Instant;

use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::classifier::GaussianNaiveBayes;
use crate::dataset::{labels, normalize_max, stack_rows, take_fraction, train_test_split};
use crate::diversity::{diversity, fuse, Metric};
use crate::error::{DatasetError, PipelineError};

use super::config::{ConfigError, EvaluationConfig};
use super::report::{IterationReport, MetricScore, PriorScenario, ScenarioReport, ScoreSink};

/// Class index of background rows.
const BACKGROUND_CLASS: usize = 0;

/// Training and streaming batches drawn for one iteration.
struct IterationBatches {
    seed: Array2<f64>,
    training_signal: Array2<f64>,
    streaming_background_rows: usize,
    streaming_signal_rows: usize,
    streaming: Array2<f64>,
}

/// Runs the resampling loop described by an [`EvaluationConfig`].
///
/// # Example
///
/// ```no_run
/// use eda_score::dataset::load_csv;
/// use eda_score::pipeline::{EvaluationConfig, IterationReport, ScoringPipeline};
///
/// let background = load_csv("background.csv", true).unwrap();
/// let signal = load_csv("signal.csv", true).unwrap();
///
/// let pipeline = ScoringPipeline::new(EvaluationConfig::new().with_seed(7)).unwrap();
/// let mut reports: Vec<IterationReport> = Vec::new();
/// pipeline.run(&background, &signal, &mut reports).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ScoringPipeline {
    config: EvaluationConfig,
}

impl ScoringPipeline {
    /// Creates a pipeline after validating `config`.
    pub fn new(config: EvaluationConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Runs every configured iteration and hands each report to `sink`.
    ///
    /// # Arguments
    ///
    /// * `background` - Full background population (class 0).
    /// * `signal` - Full signal population (class 1).
    /// * `sink` - Receives one report per iteration, in order.
    ///
    /// # Returns
    ///
    /// The number of iterations completed.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if:
    /// - The populations are empty or differ in width
    /// - `total_events` is not below the background row count
    /// - A resampling step leaves an empty side
    /// - The classifier cannot be trained
    /// - A metric fails and `skip_failed_metrics` is off
    /// - The sink rejects a report
    pub fn run<S>(
        &self,
        background: &Array2<f64>,
        signal: &Array2<f64>,
        sink: &mut S,
    ) -> Result<usize, PipelineError>
    where
        S: ScoreSink + ?Sized,
    {
        self.validate_populations(background, signal)?;

        info!(
            iterations = self.config.iterations,
            background_rows = background.nrows(),
            signal_rows = signal.nrows(),
            features = background.ncols(),
            "Starting scoring pipeline"
        );

        let start_time = Instant::now();
        for iteration in 0..self.config.iterations {
            let report = self.run_iteration(iteration, background, signal)?;
            sink.record(&report)?;
        }

        info!(
            iterations = self.config.iterations,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Scoring pipeline finished"
        );

        Ok(self.config.iterations)
    }

    /// Runs a single iteration with the RNG derived for `iteration`.
    ///
    /// Iterations are independent, so calling this for `0..iterations`
    /// in any order yields the same reports as [`run`](Self::run) when a
    /// seed is configured.
    pub fn run_iteration(
        &self,
        iteration: usize,
        background: &Array2<f64>,
        signal: &Array2<f64>,
    ) -> Result<IterationReport, PipelineError> {
        self.validate_populations(background, signal)?;
        info!(iteration, "Running iteration");

        let mut rng = self.rng_for(iteration);
        let batches = self.draw_batches(background, signal, &mut rng)?;

        let bf = self.config.background_fraction;
        let imbalanced = self.score_scenario(
            PriorScenario::Imbalanced,
            vec![bf, 1.0 - bf],
            &batches.seed,
            &batches.training_signal,
            &batches.streaming,
        )?;

        let balanced_fraction = batches.seed.nrows() as f64 / signal.nrows() as f64;
        let balanced_signal = take_fraction(signal, balanced_fraction, &mut rng)?;
        let balanced = self.score_scenario(
            PriorScenario::Balanced,
            vec![0.5, 0.5],
            &batches.seed,
            &balanced_signal,
            &batches.streaming,
        )?;

        Ok(IterationReport {
            iteration,
            streaming_background_rows: batches.streaming_background_rows,
            streaming_signal_rows: batches.streaming_signal_rows,
            scenarios: vec![imbalanced, balanced],
        })
    }

    fn rng_for(&self, iteration: usize) -> ChaCha8Rng {
        match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(iteration as u64)),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }

    fn validate_populations(
        &self,
        background: &Array2<f64>,
        signal: &Array2<f64>,
    ) -> Result<(), PipelineError> {
        if background.nrows() == 0 {
            return Err(DatasetError::Empty("background population has no rows".to_string()).into());
        }
        if signal.nrows() == 0 {
            return Err(DatasetError::Empty("signal population has no rows".to_string()).into());
        }
        if background.ncols() != signal.ncols() {
            return Err(DatasetError::ShapeMismatch {
                top: background.ncols(),
                bottom: signal.ncols(),
            }
            .into());
        }
        if self.config.total_events >= background.nrows() {
            return Err(ConfigError::ValidationFailed(format!(
                "total_events ({}) must be less than the background row count ({})",
                self.config.total_events,
                background.nrows()
            ))
            .into());
        }
        Ok(())
    }

    fn draw_batches(
        &self,
        background: &Array2<f64>,
        signal: &Array2<f64>,
        rng: &mut ChaCha8Rng,
    ) -> Result<IterationBatches, PipelineError> {
        let bf = self.config.background_fraction;
        let signal_rows = signal.nrows() as f64;

        let reduced_fraction = self.config.total_events as f64 / background.nrows() as f64;
        let reduced = take_fraction(background, reduced_fraction, rng)?;
        let (seed, streaming_background) = train_test_split(&reduced, self.config.test_size, rng)?;

        let seed = take_fraction(&seed, bf, rng)?;
        let training_signal_fraction = seed.nrows() as f64 * (1.0 - bf) / signal_rows;
        let training_signal = take_fraction(signal, training_signal_fraction, rng)?;

        let streaming_background = take_fraction(&streaming_background, bf, rng)?;
        let streaming_signal_fraction =
            streaming_background.nrows() as f64 * (1.0 - bf) / signal_rows;
        let streaming_signal = take_fraction(signal, streaming_signal_fraction, rng)?;

        debug!(
            reduced_rows = reduced.nrows(),
            training_background_rows = seed.nrows(),
            training_signal_rows = training_signal.nrows(),
            streaming_background_rows = streaming_background.nrows(),
            streaming_signal_rows = streaming_signal.nrows(),
            "Drew iteration batches"
        );

        let streaming = normalize_max(&stack_rows(&streaming_background, &streaming_signal)?);

        Ok(IterationBatches {
            streaming_background_rows: streaming_background.nrows(),
            streaming_signal_rows: streaming_signal.nrows(),
            seed,
            training_signal,
            streaming,
        })
    }

    fn score_scenario(
        &self,
        scenario: PriorScenario,
        priors: Vec<f64>,
        training_background: &Array2<f64>,
        training_signal: &Array2<f64>,
        streaming: &Array2<f64>,
    ) -> Result<ScenarioReport, PipelineError> {
        let training = normalize_max(&stack_rows(training_background, training_signal)?);
        let training_labels = labels(training_background.nrows(), training_signal.nrows());

        let mut model =
            GaussianNaiveBayes::new(priors).with_var_smoothing(self.config.var_smoothing);
        model.fit(&training, &training_labels)?;
        let probability = model.class_probability(streaming, BACKGROUND_CLASS)?;

        let mut scores = Vec::with_capacity(self.config.metrics.len());
        for &metric in &self.config.metrics {
            match score_metric(streaming, &probability, metric) {
                Ok(score) => scores.push(score),
                Err(e) if self.config.skip_failed_metrics => {
                    warn!(
                        scenario = ?scenario,
                        metric = %metric,
                        error = %e,
                        "Skipping failed metric"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(ScenarioReport {
            scenario,
            priors: model.priors().to_vec(),
            training_background_rows: training_background.nrows(),
            training_signal_rows: training_signal.nrows(),
            probability: probability.to_vec(),
            scores,
        })
    }
}

fn score_metric(
    streaming: &Array2<f64>,
    probability: &Array1<f64>,
    metric: Metric,
) -> Result<MetricScore, PipelineError> {
    let start_time = Instant::now();
    let scores = diversity(streaming, metric)?;
    let fused = fuse(&scores, probability)?;

    debug!(
        metric = %metric,
        samples = scores.len(),
        elapsed_us = start_time.elapsed().as_micros() as u64,
        "Scored metric"
    );

    Ok(MetricScore {
        metric,
        diversity: scores.to_vec(),
        fused: fused.to_vec(),
    })
}
