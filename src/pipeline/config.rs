//! Evaluation configuration for the scoring pipeline.
//!
//! This module provides the knobs of the resampling loop: how many
//! iterations to run, how large the reduced background population is,
//! the background/signal mix, the train/test split, which metrics to
//! score and how the classifier is smoothed.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::DEFAULT_VAR_SMOOTHING;
use crate::diversity::Metric;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error while parsing a configuration file.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration for the evaluation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    /// Number of resampling iterations.
    pub iterations: usize,
    /// Number of background rows kept from the full background population
    /// before splitting.
    pub total_events: usize,
    /// Share of background rows in both training and streaming batches.
    /// Also the background prior of the imbalanced scenario.
    pub background_fraction: f64,
    /// Share of the reduced background held out for streaming.
    pub test_size: f64,
    /// Metrics to score, in order.
    pub metrics: Vec<Metric>,
    /// Seed for reproducible runs (None = entropy seeded).
    pub seed: Option<u64>,
    /// Naive Bayes variance smoothing factor.
    pub var_smoothing: f64,
    /// Log and skip metrics that fail instead of aborting the run.
    pub skip_failed_metrics: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            iterations: 33,
            total_events: 1000,
            background_fraction: 0.99,
            test_size: 0.3,
            metrics: Metric::ALL.to_vec(),
            seed: None,
            var_smoothing: DEFAULT_VAR_SMOOTHING,
            skip_failed_metrics: false,
        }
    }
}

impl EvaluationConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EDA_ITERATIONS`: Number of iterations (default: 33)
    /// - `EDA_TOTAL_EVENTS`: Reduced background size (default: 1000)
    /// - `EDA_BACKGROUND_FRACTION`: Background share (default: 0.99)
    /// - `EDA_TEST_SIZE`: Streaming share of the reduced background (default: 0.3)
    /// - `EDA_METRICS`: Comma-separated metric tags (default: all three)
    /// - `EDA_SEED`: Random seed (default: unset)
    /// - `EDA_VAR_SMOOTHING`: Naive Bayes variance smoothing (default: 1e-9)
    /// - `EDA_SKIP_FAILED_METRICS`: Skip failing metrics (default: false)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value or the
    /// resulting configuration fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from a YAML file. Missing fields take their
    /// default values.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parses configuration from a YAML string and validates it.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("EDA_ITERATIONS") {
            config.iterations = parse_env_value(&val, "EDA_ITERATIONS")?;
        }

        if let Some(val) = lookup("EDA_TOTAL_EVENTS") {
            config.total_events = parse_env_value(&val, "EDA_TOTAL_EVENTS")?;
        }

        if let Some(val) = lookup("EDA_BACKGROUND_FRACTION") {
            config.background_fraction = parse_env_value(&val, "EDA_BACKGROUND_FRACTION")?;
        }

        if let Some(val) = lookup("EDA_TEST_SIZE") {
            config.test_size = parse_env_value(&val, "EDA_TEST_SIZE")?;
        }

        if let Some(val) = lookup("EDA_METRICS") {
            config.metrics = val
                .split(',')
                .filter(|tag| !tag.trim().is_empty())
                .map(|tag| parse_env_value(tag, "EDA_METRICS"))
                .collect::<Result<Vec<Metric>, _>>()?;
        }

        if let Some(val) = lookup("EDA_SEED") {
            config.seed = Some(parse_env_value(&val, "EDA_SEED")?);
        }

        if let Some(val) = lookup("EDA_VAR_SMOOTHING") {
            config.var_smoothing = parse_env_value(&val, "EDA_VAR_SMOOTHING")?;
        }

        if let Some(val) = lookup("EDA_SKIP_FAILED_METRICS") {
            config.skip_failed_metrics = parse_env_bool(&val, "EDA_SKIP_FAILED_METRICS")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::ValidationFailed(
                "iterations must be greater than 0".to_string(),
            ));
        }

        if self.total_events == 0 {
            return Err(ConfigError::ValidationFailed(
                "total_events must be greater than 0".to_string(),
            ));
        }

        if !(self.background_fraction > 0.0 && self.background_fraction < 1.0) {
            return Err(ConfigError::ValidationFailed(
                "background_fraction must be strictly between 0.0 and 1.0".to_string(),
            ));
        }

        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ConfigError::ValidationFailed(
                "test_size must be strictly between 0.0 and 1.0".to_string(),
            ));
        }

        if self.metrics.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "metrics cannot be empty".to_string(),
            ));
        }

        for (i, metric) in self.metrics.iter().enumerate() {
            if self.metrics[..i].contains(metric) {
                return Err(ConfigError::ValidationFailed(format!(
                    "metrics contains '{}' more than once",
                    metric
                )));
            }
        }

        if !(self.var_smoothing > 0.0 && self.var_smoothing.is_finite()) {
            return Err(ConfigError::ValidationFailed(
                "var_smoothing must be positive and finite".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the number of iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Builder method to set the reduced background size.
    pub fn with_total_events(mut self, total: usize) -> Self {
        self.total_events = total;
        self
    }

    /// Builder method to set the background fraction.
    pub fn with_background_fraction(mut self, fraction: f64) -> Self {
        self.background_fraction = fraction;
        self
    }

    /// Builder method to set the streaming split size.
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Builder method to set the metrics to score.
    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Builder method to set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method to set Naive Bayes variance smoothing.
    pub fn with_var_smoothing(mut self, var_smoothing: f64) -> Self {
        self.var_smoothing = var_smoothing;
        self
    }

    /// Builder method to skip failing metrics instead of aborting.
    pub fn with_skip_failed_metrics(mut self, skip: bool) -> Self {
        self.skip_failed_metrics = skip;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}
