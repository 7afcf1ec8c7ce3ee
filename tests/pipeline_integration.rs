//! Integration tests for the scoring pipeline.
//!
//! Background and signal populations are drawn from seeded Gaussians so
//! every run is deterministic.

use std::io::Write;

use eda_score::dataset::load_csv;
use eda_score::diversity::Metric;
use eda_score::pipeline::{
    EvaluationConfig, IterationReport, PriorScenario, ScoreSink, ScoringPipeline,
};
use eda_score::PipelineError;
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

const FEATURES: usize = 4;

fn gaussian(rows: usize, mean: f64, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let normal = Normal::new(mean, 1.0).expect("valid normal");
    Array2::from_shape_fn((rows, FEATURES), |_| normal.sample(&mut rng))
}

fn populations() -> (Array2<f64>, Array2<f64>) {
    (gaussian(600, 0.0, 11), gaussian(400, 4.0, 12))
}

fn test_config() -> EvaluationConfig {
    EvaluationConfig::new()
        .with_iterations(4)
        .with_total_events(300)
        .with_background_fraction(0.95)
        .with_test_size(0.3)
        .with_seed(2024)
}

/// Sink that writes one JSON document per line.
struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> ScoreSink for JsonLinesSink<W> {
    fn record(&mut self, report: &IterationReport) -> Result<(), PipelineError> {
        let line = report.to_json()?;
        writeln!(self.writer, "{}", line).map_err(|e| PipelineError::Sink(e.to_string()))
    }
}

#[test]
fn test_pipeline_produces_two_scenarios_per_iteration() {
    let (background, signal) = populations();
    let pipeline = ScoringPipeline::new(test_config()).expect("valid config");

    let mut reports: Vec<IterationReport> = Vec::new();
    let completed = pipeline
        .run(&background, &signal, &mut reports)
        .expect("pipeline should run");

    assert_eq!(completed, 4);
    let scenarios: usize = reports.iter().map(|r| r.scenarios.len()).sum();
    assert_eq!(scenarios, 4 * 2);

    for report in &reports {
        assert!(report.streaming_background_rows > report.streaming_signal_rows);

        let imbalanced = report
            .scenario(PriorScenario::Imbalanced)
            .expect("imbalanced scenario");
        assert!(imbalanced.training_background_rows > imbalanced.training_signal_rows);

        let balanced = report
            .scenario(PriorScenario::Balanced)
            .expect("balanced scenario");
        assert_eq!(
            balanced.training_background_rows,
            imbalanced.training_background_rows
        );
        assert!(balanced.training_signal_rows > imbalanced.training_signal_rows);
    }
}

#[test]
fn test_fused_scores_are_probability_times_diversity() {
    let (background, signal) = populations();
    let pipeline = ScoringPipeline::new(test_config()).expect("valid config");

    let mut reports: Vec<IterationReport> = Vec::new();
    pipeline
        .run(&background, &signal, &mut reports)
        .expect("pipeline should run");

    for report in &reports {
        for scenario in &report.scenarios {
            assert_eq!(scenario.probability.len(), report.streaming_rows());
            assert!(scenario
                .probability
                .iter()
                .all(|p| (0.0..=1.0).contains(p)));

            let metrics: Vec<Metric> = scenario.scores.iter().map(|s| s.metric).collect();
            assert_eq!(metrics, Metric::ALL.to_vec());

            for score in &scenario.scores {
                assert_eq!(score.diversity.len(), report.streaming_rows());
                for (i, fused) in score.fused.iter().enumerate() {
                    let expected = scenario.probability[i] * score.diversity[i];
                    assert!(
                        (fused - expected).abs() < 1e-12,
                        "fused score {} differs from {} for {}",
                        fused,
                        expected,
                        score.metric
                    );
                }
            }
        }
    }
}

#[test]
fn test_signal_rows_get_low_background_probability() {
    let (background, signal) = populations();
    let pipeline = ScoringPipeline::new(test_config()).expect("valid config");
    let report = pipeline
        .run_iteration(0, &background, &signal)
        .expect("iteration should run");

    let bg_rows = report.streaming_background_rows;
    for scenario in &report.scenarios {
        let (bg, sig) = scenario.probability.split_at(bg_rows);
        let bg_mean = bg.iter().sum::<f64>() / bg.len() as f64;
        let sig_mean = sig.iter().sum::<f64>() / sig.len() as f64;
        assert!(
            bg_mean > 0.9 && sig_mean < 0.1,
            "{:?}: background mean {}, signal mean {}",
            scenario.scenario,
            bg_mean,
            sig_mean
        );
    }
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let (background, signal) = populations();

    let mut first: Vec<IterationReport> = Vec::new();
    ScoringPipeline::new(test_config())
        .expect("valid config")
        .run(&background, &signal, &mut first)
        .expect("first run");

    let mut second: Vec<IterationReport> = Vec::new();
    ScoringPipeline::new(test_config())
        .expect("valid config")
        .run(&background, &signal, &mut second)
        .expect("second run");

    assert_eq!(first, second);

    // Iterations draw from different streams.
    assert_ne!(first[0].scenarios[0].probability, first[1].scenarios[0].probability);
}

#[test]
fn test_json_lines_sink() {
    let (background, signal) = populations();
    let pipeline =
        ScoringPipeline::new(test_config().with_iterations(2)).expect("valid config");

    let mut sink = JsonLinesSink { writer: Vec::new() };
    pipeline
        .run(&background, &signal, &mut sink)
        .expect("pipeline should run");

    let output = String::from_utf8(sink.writer).expect("utf8 output");
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);

    let parsed: IterationReport = serde_json::from_str(lines[1]).expect("valid report JSON");
    assert_eq!(parsed.iteration, 1);
    assert_eq!(parsed.scenarios.len(), 2);
}

#[test]
fn test_pipeline_from_files() {
    let (background, signal) = populations();
    let dir = tempfile::tempdir().expect("temp dir");

    let write_csv = |name: &str, data: &Array2<f64>| {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create csv");
        writeln!(file, "f0,f1,f2,f3").expect("write header");
        for row in data.rows() {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(file, "{}", cells.join(",")).expect("write row");
        }
        path
    };
    let background_path = write_csv("background.csv", &background);
    let signal_path = write_csv("signal.csv", &signal);

    let config_path = dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        "iterations: 1\ntotal_events: 300\nbackground_fraction: 0.95\ntest_size: 0.3\nseed: 2024\nmetrics: [euclidean, cosine]\n",
    )
    .expect("write config");

    let config = EvaluationConfig::from_yaml_file(&config_path).expect("config loads");
    let loaded_background = load_csv(&background_path, true).expect("background loads");
    let loaded_signal = load_csv(&signal_path, true).expect("signal loads");
    assert_eq!(loaded_background, background);

    let mut reports: Vec<IterationReport> = Vec::new();
    ScoringPipeline::new(config)
        .expect("valid config")
        .run(&loaded_background, &loaded_signal, &mut reports)
        .expect("pipeline should run");

    assert_eq!(reports.len(), 1);
    for scenario in &reports[0].scenarios {
        assert_eq!(scenario.scores.len(), 2);
        assert!(scenario.score(Metric::Mahalanobis).is_none());
    }
}
