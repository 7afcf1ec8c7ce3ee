//! Evaluation pipeline built on top of the diversity engine.
//!
//! Each iteration resamples a training batch and a streaming batch from
//! the background and signal populations, trains a Gaussian Naive Bayes
//! classifier and fuses its background posterior with the diversity score
//! of every configured metric.
//!
//! # Pipeline Flow
//!
//! 1. **Reduction**: keep `total_events` rows of the background population
//! 2. **Split**: hold out `test_size` of them as the streaming background
//! 3. **Mixing**: top up training and streaming batches with signal rows so
//!    background makes up `background_fraction` of each
//! 4. **Normalization**: scale every column by its maximum absolute value
//! 5. **Imbalanced pass**: priors `[bf, 1 - bf]`, then score each metric
//! 6. **Balanced pass**: as many signal rows as background rows, priors
//!    `[0.5, 0.5]`, same streaming batch
//! 7. **Report**: hand the `IterationReport` to the caller's `ScoreSink`
//!
//! # Example
//!
//! ```rust,ignore
//! use eda_score::pipeline::{EvaluationConfig, IterationReport, ScoringPipeline};
//!
//! // Via builder pattern
//! let config = EvaluationConfig::new()
//!     .with_iterations(10)
//!     .with_seed(42);
//!
//! // Via environment variables
//! let config = EvaluationConfig::from_env()?;
//!
//! let pipeline = ScoringPipeline::new(config)?;
//! let mut reports: Vec<IterationReport> = Vec::new();
//! pipeline.run(&background, &signal, &mut reports)?;
//!
//! for report in &reports {
//!     println!("{}", report.to_json()?);
//! }
//! ```

pub mod config;
pub mod report;
pub mod runner;

// Re-export main types for convenience
pub use config::{ConfigError, EvaluationConfig};
pub use report::{IterationReport, MetricScore, PriorScenario, ScenarioReport, ScoreSink};
pub use runner::ScoringPipeline;
