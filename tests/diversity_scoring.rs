//! Integration tests for the distance kernel and diversity aggregator.
//!
//! These exercise the public API only, on hand-built matrices and seeded
//! Gaussian samples.

use eda_score::diversity::{closeness, distance, diversity, fuse, Metric};
use eda_score::DiversityError;
use ndarray::{array, Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

fn gaussian(rows: usize, cols: usize, mean: f64, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let normal = Normal::new(mean, 1.0).expect("valid normal");
    Array2::from_shape_fn((rows, cols), |_| normal.sample(&mut rng))
}

#[test]
fn test_distance_shape_and_sign_for_every_metric() {
    let a = gaussian(12, 3, 0.0, 1);
    let b = gaussian(7, 3, 0.5, 2);

    for metric in Metric::ALL {
        let dist = distance(&a, &b, metric).expect("distance should succeed");
        assert_eq!(dist.dim(), (7, 12), "{} layout is B rows by A rows", metric);
        assert!(
            dist.iter().all(|d| *d >= 0.0 && d.is_finite()),
            "{} produced a negative or non-finite distance",
            metric
        );
    }
}

#[test]
fn test_self_distance_has_zero_diagonal() {
    let a = gaussian(10, 4, 0.0, 3);

    for metric in Metric::ALL {
        let dist = distance(&a, &a, metric).expect("distance should succeed");
        for i in 0..a.nrows() {
            assert!(
                dist[[i, i]].abs() < 1e-9,
                "{} diagonal entry {} is {}",
                metric,
                i,
                dist[[i, i]]
            );
        }
    }
}

#[test]
fn test_euclidean_swap_symmetry() {
    let a = gaussian(6, 2, 0.0, 4);
    let b = gaussian(9, 2, 1.0, 5);

    let ab = distance(&a, &b, Metric::Euclidean).expect("a to b");
    let ba = distance(&b, &a, Metric::Euclidean).expect("b to a");

    for j in 0..b.nrows() {
        for i in 0..a.nrows() {
            assert_eq!(ab[[j, i]], ba[[i, j]]);
        }
    }
}

#[test]
fn test_cosine_reference_angles() {
    let a = array![[1.0, 0.0]];
    let b = array![[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0]];

    let dist = distance(&a, &b, Metric::Cosine).expect("cosine distance");
    assert!(dist[[0, 0]].abs() < 1e-12);
    assert!((dist[[1, 0]] - 1.0).abs() < 1e-12);
    assert!((dist[[2, 0]] - 2.0).abs() < 1e-12);
}

#[test]
fn test_mahalanobis_matches_euclidean_under_identity_covariance() {
    // Pooling this set with itself gives eight rows whose unbiased
    // covariance is the identity.
    let s = 7.0_f64.sqrt() / 2.0;
    let x = array![[s, 0.0], [-s, 0.0], [0.0, s], [0.0, -s]];

    let mahalanobis = distance(&x, &x, Metric::Mahalanobis).expect("mahalanobis");
    let euclidean = distance(&x, &x, Metric::Euclidean).expect("euclidean");

    for (m, e) in mahalanobis.iter().zip(euclidean.iter()) {
        assert!((m - e).abs() < 1e-9, "mahalanobis {} vs euclidean {}", m, e);
    }
}

#[test]
fn test_right_triangle_scores() {
    let a = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];

    let dist = distance(&a, &a, Metric::Euclidean).expect("distance");
    let cp = closeness(&dist).expect("closeness");
    assert!((cp[0] - 0.5).abs() < 1e-12);
    let corner = 1.0 / (1.0 + 2.0_f64.sqrt());
    assert!((cp[1] - corner).abs() < 1e-12);
    assert!((cp[2] - corner).abs() < 1e-12);

    let scores = diversity(&a, Metric::Euclidean).expect("diversity");
    assert!(scores[0] < scores[1]);
    assert!((scores[1] - scores[2]).abs() < 1e-12);
}

#[test]
fn test_outlier_is_most_diverse() {
    let mut data = gaussian(30, 3, 0.0, 6);
    data.row_mut(17).fill(25.0);

    for metric in [Metric::Euclidean, Metric::Mahalanobis] {
        let scores = diversity(&data, metric).expect("diversity");
        let (argmax, _) = scores
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, s)| if *s > best.1 { (i, *s) } else { best });
        assert_eq!(argmax, 17, "{} should rank the outlier highest", metric);
    }
}

#[test]
fn test_metric_tags_drive_diversity() {
    let data = gaussian(8, 2, 1.0, 7);

    for tag in ["euclidean", "Cosine", " MAHALANOBIS "] {
        let metric: Metric = tag.parse().expect("known tag");
        let scores = diversity(&data, metric).expect("diversity");
        assert_eq!(scores.len(), 8);
        assert!(scores.iter().all(|s| *s > 0.0 && s.is_finite()));
    }

    let err = "manhattan".parse::<Metric>().unwrap_err();
    assert!(matches!(err, DiversityError::UnknownMetric(tag) if tag == "manhattan"));
}

#[test]
fn test_engine_error_cases() {
    let single = array![[1.0, 2.0]];
    assert!(matches!(
        diversity(&single, Metric::Euclidean),
        Err(DiversityError::DegenerateBatch(_))
    ));

    let duplicates = Array2::<f64>::ones((4, 2));
    assert!(matches!(
        diversity(&duplicates, Metric::Euclidean),
        Err(DiversityError::DegenerateBatch(_))
    ));

    let narrow = Array2::<f64>::ones((3, 1));
    let wide = Array2::<f64>::ones((3, 2));
    assert!(matches!(
        distance(&narrow, &wide, Metric::Cosine),
        Err(DiversityError::ShapeMismatch { .. })
    ));

    // Two pooled rows cannot support a two-feature covariance.
    let tiny = array![[0.0, 1.0]];
    let other = array![[1.0, 0.0]];
    assert!(matches!(
        distance(&tiny, &other, Metric::Mahalanobis),
        Err(DiversityError::SingularCovariance(_))
    ));
}

#[test]
fn test_fuse_scales_diversity() {
    let data = gaussian(5, 2, 0.0, 8);
    let scores = diversity(&data, Metric::Euclidean).expect("diversity");
    let probability = Array1::from(vec![1.0, 0.5, 0.0, 0.25, 1.0]);

    let fused = fuse(&scores, &probability).expect("fuse");
    for i in 0..5 {
        assert!((fused[i] - scores[i] * probability[i]).abs() < 1e-12);
    }

    let short = Array1::from(vec![1.0, 1.0]);
    assert!(matches!(
        fuse(&scores, &short),
        Err(DiversityError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_mahalanobis_is_unit_invariant() {
    // Rescaling one feature by 1e-7 must not change Mahalanobis scores
    let data = gaussian(20, 2, 0.0, 9);
    let mut rescaled = data.clone();
    rescaled.column_mut(1).mapv_inplace(|v| v * 1e-7);

    let original = diversity(&data, Metric::Mahalanobis).expect("original scale");
    let scaled = diversity(&rescaled, Metric::Mahalanobis).expect("mixed scale");
    for (a, b) in original.iter().zip(scaled.iter()) {
        assert!((a - b).abs() < 1e-9 * a.abs(), "{} vs {}", a, b);
    }
}

#[test]
fn test_non_finite_samples_are_rejected() {
    let data = array![[0.0, 1.0], [1.0, 0.0], [2.0, 2.0], [f64::NAN, 3.0]];
    for metric in Metric::ALL {
        assert!(matches!(
            diversity(&data, metric),
            Err(DiversityError::NonFiniteInput(_))
        ));
    }
}
