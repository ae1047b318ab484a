//! Conversions and numeric helpers shared by the estimator shims.

use ndarray::{Array2, ArrayView1};
use smartcore::error::Failed;
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{ClassifierError, Result};

/// Copy an ndarray matrix into smartcore's row-major `DenseMatrix`.
pub fn to_dense(x: &Array2<f64>) -> std::result::Result<DenseMatrix<f64>, Failed> {
    let (nrows, ncols) = x.dim();
    DenseMatrix::new(nrows, ncols, x.iter().copied().collect(), false)
}

/// Copy a smartcore matrix back into ndarray.
pub fn from_dense(m: &DenseMatrix<f64>) -> Array2<f64> {
    let (nrows, ncols) = m.shape();
    Array2::from_shape_fn((nrows, ncols), |(r, c)| *m.get((r, c)))
}

/// Seed for a fit: the configured one, or a fresh draw.
pub fn resolve_seed(random_state: Option<u64>) -> u64 {
    random_state.unwrap_or_else(rand::random)
}

/// Shared checks every shim runs before handing data to smartcore.
pub fn check_fit_input(model: &'static str, x: &Array2<f64>, y: &[u32]) -> Result<usize> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ClassifierError::invalid_input(format!(
            "{} needs a non-empty feature matrix, got {:?}",
            model,
            x.dim()
        )));
    }
    if x.nrows() != y.len() {
        return Err(ClassifierError::invalid_input(format!(
            "{}: {} samples but {} labels",
            model,
            x.nrows(),
            y.len()
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(ClassifierError::invalid_input(format!(
            "{} received non-finite feature values",
            model
        )));
    }
    let n_classes = y.iter().copied().max().map_or(0, |m| m as usize + 1);
    if n_classes < 2 {
        return Err(ClassifierError::invalid_input(format!(
            "{} needs at least two classes",
            model
        )));
    }
    Ok(n_classes)
}

pub fn check_n_features(model: &'static str, expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(ClassifierError::invalid_input(format!(
            "{} was fitted on {} features, got {}",
            model,
            expected,
            x.ncols()
        )));
    }
    Ok(())
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Numerically stable softmax over one row of scores.
pub fn softmax(scores: ArrayView1<f64>) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Scale every row to sum to one; all-zero rows become uniform.
pub fn normalize_rows(p: &mut Array2<f64>) {
    let k = p.ncols() as f64;
    for mut row in p.rows_mut() {
        row.mapv_inplace(|v| v.max(0.0));
        let total = row.sum();
        if total > 0.0 {
            row.mapv_inplace(|v| v / total);
        } else {
            row.fill(1.0 / k);
        }
    }
}

/// Index of the largest entry of each row.
pub fn argmax_rows(p: &Array2<f64>) -> Vec<u32> {
    p.rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (i, v) in row.iter().enumerate() {
                if *v > row[best] {
                    best = i;
                }
            }
            best as u32
        })
        .collect()
}
