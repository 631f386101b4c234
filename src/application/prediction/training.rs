//! Model trainer
//!
//! Fits charges against the six encoded features by ordinary least squares
//! with an intercept, scores R² on a held-out part and produces the
//! artifact. Runs from the CLI only.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use super::model::{ModelArtifact, ModelMetrics};
use crate::application::dashboard::Dataset;
use crate::domain::insurance::FEATURE_NAMES;
use crate::domain::{FeatureVector, RegionEncoding};
use crate::shared::AppError;

#[derive(Debug, Clone, Copy)]
pub struct TrainingOptions {
    pub test_fraction: f64,
    pub seed: u64,
    pub region_encoding: RegionEncoding,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 2,
            region_encoding: RegionEncoding::Alphabetical,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearFit {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

/// Shuffle `0..n` with a seeded RNG and cut off the test part.
/// The test part has `ceil(n * test_fraction)` rows.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);

    let n_test = ((n as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let train = idx.split_off(n_test.min(n));
    (train, idx)
}

/// Least squares with intercept via the normal equations `XᵀX w = Xᵀy`.
pub fn fit_ols(rows: &[Vec<f64>], targets: &[f64]) -> Result<LinearFit, AppError> {
    let Some(width) = rows.first().map(|r| r.len()) else {
        return Err(AppError::Model("no training rows".to_string()));
    };
    if rows.len() != targets.len() {
        return Err(AppError::Model(format!(
            "{} rows but {} targets",
            rows.len(),
            targets.len()
        )));
    }
    if rows.len() <= width {
        return Err(AppError::Model(format!(
            "need more than {} rows to fit {} features",
            width, width
        )));
    }

    // Column 0 of the design matrix is the constant 1.
    let dim = width + 1;
    let mut xtx = vec![vec![0.0; dim]; dim];
    let mut xty = vec![0.0; dim];
    for (row, y) in rows.iter().zip(targets) {
        let x: Vec<f64> = std::iter::once(1.0).chain(row.iter().copied()).collect();
        for i in 0..dim {
            xty[i] += x[i] * y;
            for j in 0..dim {
                xtx[i][j] += x[i] * x[j];
            }
        }
    }

    let weights = solve(xtx, xty)?;
    Ok(LinearFit {
        intercept: weights[0],
        coefficients: weights[1..].to_vec(),
    })
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, AppError> {
    let n = b.len();
    let scale = a
        .iter()
        .flatten()
        .fold(0.0f64, |m, v| m.max(v.abs()))
        .max(1.0);

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if a[pivot][col].abs() <= scale * 1e-12 {
            return Err(AppError::Model(
                "singular system: features are linearly dependent".to_string(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

/// Coefficient of determination. A constant target scores 0.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}

/// Fit the model on `dataset` and describe it as an artifact.
pub fn train(dataset: &Dataset, options: TrainingOptions) -> Result<ModelArtifact, AppError> {
    let rows: Vec<Vec<f64>> = dataset
        .records()
        .iter()
        .map(|r| {
            FeatureVector::encode(
                r.age,
                r.sex,
                r.bmi,
                r.children,
                r.smoker,
                r.region,
                options.region_encoding,
            )
            .as_row()
            .to_vec()
        })
        .collect();
    let targets = dataset.charges();

    let (train_idx, test_idx) = split_indices(rows.len(), options.test_fraction, options.seed);
    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
        idx.iter().map(|&i| (rows[i].clone(), targets[i])).unzip()
    };
    let (train_x, train_y) = pick(&train_idx);
    let (test_x, test_y) = pick(&test_idx);
    debug!(train = train_x.len(), test = test_x.len(), seed = options.seed, "Dataset split");

    let fit = fit_ols(&train_x, &train_y)?;
    let score = |xs: &[Vec<f64>], ys: &[f64]| {
        let predicted: Vec<f64> = xs.iter().map(|x| fit.predict_row(x)).collect();
        r2_score(ys, &predicted)
    };
    let metrics = ModelMetrics {
        r2_train: score(&train_x, &train_y),
        r2_test: score(&test_x, &test_y),
        train_rows: train_x.len(),
        test_rows: test_x.len(),
    };
    info!(
        r2_train = metrics.r2_train,
        r2_test = metrics.r2_test,
        "Linear regression fitted"
    );

    Ok(ModelArtifact {
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        intercept: fit.intercept,
        coefficients: fit.coefficients,
        region_encoding: options.region_encoding,
        metrics,
        dataset_sha256: dataset.sha256().to_string(),
        trained_at: Utc::now(),
    })
}
